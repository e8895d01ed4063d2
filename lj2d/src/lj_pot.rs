// file: `lj2d/src/lj_pot.rs`
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::MdError;

/// Rectangular periodic domain `[0, Lx) x [0, Ly)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicBox {
    lx: f64,
    ly: f64,
}

impl PeriodicBox {
    pub fn new(lx: f64, ly: f64) -> Self {
        PeriodicBox { lx, ly }
    }

    pub fn lx(&self) -> f64 {
        self.lx
    }

    pub fn ly(&self) -> f64 {
        self.ly
    }

    pub fn area(&self) -> f64 {
        self.lx * self.ly
    }

    pub(crate) fn scale(&mut self, factor: f64) {
        self.lx *= factor;
        self.ly *= factor;
    }

    /// Apply minimum-image convention, so that `|dx| <= Lx/2` and `|dy| <= Ly/2`
    pub fn separation(&self, d: Vector2<f64>) -> Vector2<f64> {
        Vector2::new(minimum_image(d.x, self.lx), minimum_image(d.y, self.ly))
    }

    /// Fold a position back into the box
    pub fn wrap(&self, p: Vector2<f64>) -> Vector2<f64> {
        Vector2::new(wrap_coord(p.x, self.lx), wrap_coord(p.y, self.ly))
    }
}

fn minimum_image(d: f64, l: f64) -> f64 {
    if d.abs() > 0.5 * l {
        d - l * (d / l).round()
    } else {
        d
    }
}

fn wrap_coord(x: f64, l: f64) -> f64 {
    if (0.0..l).contains(&x) {
        return x;
    }
    let w = x.rem_euclid(l);
    // rem_euclid of a tiny negative value rounds up to l
    if w >= l {
        0.0
    } else {
        w
    }
}

/// Minimum-image displacement `r_i - r_j` and its length, rejecting coincident pairs
pub(crate) fn pair_vector(
    cell: &PeriodicBox,
    positions: &[Vector2<f64>],
    i: usize,
    j: usize,
) -> Result<(Vector2<f64>, f64), MdError> {
    let d = cell.separation(positions[i] - positions[j]);
    let r = d.norm();
    if !(r > 0.0) || !r.is_finite() {
        return Err(MdError::NumericalInstability { i, j, r });
    }
    Ok((d, r))
}

/// Accelerations and potential energy produced by one force pass
#[derive(Debug, Clone)]
pub struct ForceEvaluation {
    pub accelerations: Vec<Vector2<f64>>,
    pub potential_energy: f64,
}

impl ForceEvaluation {
    /// Reject an evaluation that does not hold one acceleration per particle
    pub(crate) fn check_len(self, n: usize) -> Result<Self, MdError> {
        if self.accelerations.len() != n {
            return Err(MdError::config(format!(
                "force provider returned {} accelerations for {} particles",
                self.accelerations.len(),
                n
            )));
        }
        Ok(self)
    }
}

pub trait ForceProvider {
    /// Evaluate accelerations (unit mass) at `positions` inside `cell`
    fn compute_accelerations(
        &self,
        cell: &PeriodicBox,
        positions: &[Vector2<f64>],
    ) -> Result<ForceEvaluation, MdError>;

    /// Radial force factor `f(r) / r` for a pair at distance `r`
    fn force_factor(&self, r: f64) -> Result<f64, MdError>;
}

/// Lennard-Jones 12-6 potential in reduced units (epsilon = sigma = mass = 1)
#[derive(Debug, Clone, Copy, Default)]
pub struct LennardJones;

impl LennardJones {
    /// Returns `(force_factor, potential)` for a pair at distance `r`.
    ///
    /// The force on the first particle is `force_factor * (dx, dy)`.
    pub fn pair_potential_force(&self, r: f64) -> Result<(f64, f64), MdError> {
        if !(r > 0.0) {
            return Err(MdError::ZeroSeparation(r));
        }
        let ri = 1.0 / r;
        let ri3 = ri * ri * ri;
        let ri6 = ri3 * ri3;
        let g = 24.0 * ri * ri6 * (2.0 * ri6 - 1.0);
        let potential = 4.0 * ri6 * (ri6 - 1.0);
        Ok((g / r, potential))
    }
}

impl ForceProvider for LennardJones {
    fn compute_accelerations(
        &self,
        cell: &PeriodicBox,
        positions: &[Vector2<f64>],
    ) -> Result<ForceEvaluation, MdError> {
        let n = positions.len();
        let mut accelerations = vec![Vector2::zeros(); n];
        let mut pe = 0.0;

        for i in 0..n.saturating_sub(1) {
            for j in (i + 1)..n {
                let (d, r) = pair_vector(cell, positions, i, j)?;
                let (force, potential) = self
                    .pair_potential_force(r)
                    .map_err(|_| MdError::NumericalInstability { i, j, r })?;
                let fij = d * force;

                // Newton's third law: one evaluation per unordered pair
                accelerations[i] += fij;
                accelerations[j] -= fij;
                pe += potential;
            }
        }

        Ok(ForceEvaluation {
            accelerations,
            potential_energy: pe,
        })
    }

    fn force_factor(&self, r: f64) -> Result<f64, MdError> {
        self.pair_potential_force(r).map(|(force, _)| force)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_potential_zero_at_sigma() {
        let (force, potential) = LennardJones.pair_potential_force(1.0).unwrap();
        assert_abs_diff_eq!(potential, 0.0, epsilon = 1e-14);
        // repulsive at r = sigma
        assert_relative_eq!(force, 24.0, epsilon = 1e-12);
    }

    #[test]
    fn test_force_vanishes_at_minimum() {
        let r_min = 2f64.powf(1.0 / 6.0);
        let (force, potential) = LennardJones.pair_potential_force(r_min).unwrap();
        assert_abs_diff_eq!(force, 0.0, epsilon = 1e-12);
        assert_relative_eq!(potential, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_attractive_beyond_minimum() {
        let (force, potential) = LennardJones.pair_potential_force(1.5).unwrap();
        assert!(force < 0.0);
        assert!(potential < 0.0);
    }

    #[test]
    fn test_zero_separation_is_error() {
        assert!(matches!(
            LennardJones.pair_potential_force(0.0),
            Err(MdError::ZeroSeparation(_))
        ));
        assert!(LennardJones.pair_potential_force(f64::NAN).is_err());
    }

    #[test]
    fn test_minimum_image_bound() {
        let cell = PeriodicBox::new(4.0, 2.0 * 3f64.sqrt());
        for ix in -40..=40 {
            for iy in -40..=40 {
                let d = Vector2::new(ix as f64 * 0.37, iy as f64 * 0.29);
                let s = cell.separation(d);
                assert!(s.x.abs() <= 0.5 * cell.lx() + 1e-12, "dx = {}", d.x);
                assert!(s.y.abs() <= 0.5 * cell.ly() + 1e-12, "dy = {}", d.y);
            }
        }
    }

    #[test]
    fn test_minimum_image_keeps_short_displacements() {
        let cell = PeriodicBox::new(4.0, 4.0);
        let d = Vector2::new(1.5, -2.0);
        assert_eq!(cell.separation(d), d);
        let s = cell.separation(Vector2::new(3.0, -3.5));
        assert_relative_eq!(s.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(s.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_idempotent_inside_box() {
        let cell = PeriodicBox::new(4.0, 3.0);
        let p = Vector2::new(3.999, 0.0);
        assert_eq!(cell.wrap(p), p);
        for k in -5..=5 {
            let shifted = Vector2::new(1.25 + k as f64 * 4.0, 2.5 + k as f64 * 3.0);
            let w = cell.wrap(shifted);
            assert_relative_eq!(w.x, 1.25, epsilon = 1e-12);
            assert_relative_eq!(w.y, 2.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_wrap_tiny_negative_stays_in_range() {
        let cell = PeriodicBox::new(4.0, 3.0);
        let w = cell.wrap(Vector2::new(-1e-18, -1e-18));
        assert!(w.x >= 0.0 && w.x < cell.lx());
        assert!(w.y >= 0.0 && w.y < cell.ly());
    }

    #[test]
    fn test_pair_forces_antisymmetric() {
        let cell = PeriodicBox::new(10.0, 10.0);
        let positions = vec![Vector2::new(1.0, 1.0), Vector2::new(2.1, 1.4)];
        let eval = LennardJones.compute_accelerations(&cell, &positions).unwrap();
        assert_eq!(eval.accelerations[0], -eval.accelerations[1]);
        let r = (positions[1] - positions[0]).norm();
        let (_, potential) = LennardJones.pair_potential_force(r).unwrap();
        assert_relative_eq!(eval.potential_energy, potential, epsilon = 1e-14);
    }

    #[test]
    fn test_forces_across_boundary() {
        let cell = PeriodicBox::new(5.0, 5.0);
        // 1.0 apart through the x boundary
        let positions = vec![Vector2::new(0.4, 2.0), Vector2::new(4.4, 2.0)];
        let eval = LennardJones.compute_accelerations(&cell, &positions).unwrap();
        // repulsive: particle 0 pushed towards +x, away from its image at -0.6
        assert!(eval.accelerations[0].x > 0.0);
        assert_relative_eq!(eval.accelerations[0].x, 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_coincident_particles_reported() {
        let cell = PeriodicBox::new(5.0, 5.0);
        let positions = vec![
            Vector2::new(1.0, 1.0),
            Vector2::new(3.0, 3.0),
            Vector2::new(1.0, 1.0),
        ];
        match LennardJones.compute_accelerations(&cell, &positions) {
            Err(MdError::NumericalInstability { i, j, .. }) => assert_eq!((i, j), (0, 2)),
            other => panic!("expected instability, got {:?}", other),
        }
    }
}
