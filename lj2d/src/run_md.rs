use itertools::izip;
use nalgebra::Vector2;
use tracing::debug;

use crate::error::MdError;
use crate::lj_pot::{ForceProvider, LennardJones};
use crate::system::ParticleSystem;

pub trait Integrator {
    /// Advance the system by one timestep
    fn step(&mut self, system: &mut ParticleSystem) -> Result<(), MdError>;

    /// Advance the system by `steps` timesteps, stopping at the first error
    fn run(&mut self, system: &mut ParticleSystem, steps: usize) -> Result<(), MdError> {
        for _ in 0..steps {
            self.step(system)?;
        }
        Ok(())
    }
}

/// Velocity-Verlet with unit masses.
///
/// Each step drifts positions with the old acceleration, half-kicks with the old
/// acceleration, re-evaluates forces at the new positions, then half-kicks with the
/// new acceleration. The system is only modified once the force pass has succeeded.
pub struct VelocityVerlet<F: ForceProvider> {
    provider: F,
}

impl<F: ForceProvider> VelocityVerlet<F> {
    pub fn new(provider: F) -> Self {
        VelocityVerlet { provider }
    }

    pub fn provider(&self) -> &F {
        &self.provider
    }
}

impl Default for VelocityVerlet<LennardJones> {
    fn default() -> Self {
        VelocityVerlet::new(LennardJones)
    }
}

impl<F: ForceProvider> Integrator for VelocityVerlet<F> {
    fn step(&mut self, system: &mut ParticleSystem) -> Result<(), MdError> {
        if !system.forces_current {
            debug!("forces stale, evaluating before step");
            system.accel_with(&self.provider)?;
        }

        let dt = system.dt();
        let half_dt = 0.5 * dt;
        let half_dt2 = 0.5 * system.dt2();
        let cell = system.cell;

        // Update positions (full step, old acceleration)
        let positions: Vec<Vector2<f64>> =
            izip!(&system.positions, &system.velocities, &system.accelerations)
                .map(|(&x, &v, &a)| cell.wrap(x + v * dt + a * half_dt2))
                .collect();

        // Update velocities (first half-step, old acceleration)
        let mut velocities: Vec<Vector2<f64>> = system
            .velocities
            .iter()
            .zip(&system.accelerations)
            .map(|(&v, &a)| v + a * half_dt)
            .collect();

        // Recompute forces
        let eval = self
            .provider
            .compute_accelerations(&cell, &positions)?
            .check_len(positions.len())?;

        // Update velocities (second half-step, new acceleration)
        let mut ke = 0.0;
        for (v, &a_new) in velocities.iter_mut().zip(&eval.accelerations) {
            *v += a_new * half_dt;
            ke += 0.5 * v.dot(v);
        }

        system.positions = positions;
        system.velocities = velocities;
        system.accelerations = eval.accelerations;
        system.pe = eval.potential_energy;
        system.ke = ke;
        system.forces_current = true;
        system.step_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lj_pot::{ForceEvaluation, PeriodicBox};
    use approx::assert_relative_eq;

    /// Uniform field, useful to check the update sequence in closed form
    struct ConstantField(Vector2<f64>);

    impl ForceProvider for ConstantField {
        fn compute_accelerations(
            &self,
            _cell: &PeriodicBox,
            positions: &[Vector2<f64>],
        ) -> Result<ForceEvaluation, MdError> {
            Ok(ForceEvaluation {
                accelerations: vec![self.0; positions.len()],
                potential_energy: 0.0,
            })
        }

        fn force_factor(&self, _r: f64) -> Result<f64, MdError> {
            Ok(0.0)
        }
    }

    struct Exploding;

    impl ForceProvider for Exploding {
        fn compute_accelerations(
            &self,
            _cell: &PeriodicBox,
            _positions: &[Vector2<f64>],
        ) -> Result<ForceEvaluation, MdError> {
            Err(MdError::NumericalInstability { i: 0, j: 1, r: 0.0 })
        }

        fn force_factor(&self, r: f64) -> Result<f64, MdError> {
            Err(MdError::ZeroSeparation(r))
        }
    }

    /// Drops the last particle from every evaluation
    struct Truncated;

    impl ForceProvider for Truncated {
        fn compute_accelerations(
            &self,
            _cell: &PeriodicBox,
            positions: &[Vector2<f64>],
        ) -> Result<ForceEvaluation, MdError> {
            Ok(ForceEvaluation {
                accelerations: vec![Vector2::new(1.0, 0.0); positions.len().saturating_sub(1)],
                potential_energy: 0.0,
            })
        }

        fn force_factor(&self, _r: f64) -> Result<f64, MdError> {
            Ok(0.0)
        }
    }

    fn single_particle(v: Vector2<f64>) -> ParticleSystem {
        let mut system = ParticleSystem::new(1, 10.0, 10.0, 0.0, 0.1).unwrap();
        let p = Vector2::new(5.0, 5.0);
        system.bulk_set_state(vec![p], vec![v]).unwrap();
        system
    }

    #[test]
    fn test_step_matches_closed_form() {
        let g = Vector2::new(0.0, -1.0);
        let v0 = Vector2::new(1.0, 0.5);
        let mut system = single_particle(v0);
        let mut verlet = VelocityVerlet::new(ConstantField(g));
        verlet.step(&mut system).unwrap();

        let dt = 0.1;
        let x = Vector2::new(5.0, 5.0) + v0 * dt + g * (0.5 * dt * dt);
        let v = v0 + g * dt;
        assert_relative_eq!(system.positions()[0].x, x.x, epsilon = 1e-12);
        assert_relative_eq!(system.positions()[0].y, x.y, epsilon = 1e-12);
        assert_relative_eq!(system.velocities()[0].x, v.x, epsilon = 1e-12);
        assert_relative_eq!(system.velocities()[0].y, v.y, epsilon = 1e-12);
        assert_relative_eq!(system.ke(), 0.5 * v.dot(&v), epsilon = 1e-12);
        assert_eq!(system.step_count(), 1);
    }

    #[test]
    fn test_step_wraps_positions() {
        let mut system = single_particle(Vector2::new(60.0, -70.0));
        let mut verlet = VelocityVerlet::new(ConstantField(Vector2::zeros()));
        verlet.step(&mut system).unwrap();
        let p = system.positions()[0];
        assert!(p.x >= 0.0 && p.x < 10.0);
        assert!(p.y >= 0.0 && p.y < 10.0);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_step_evaluates_stale_forces_first() {
        let mut system = ParticleSystem::new(16, 4.0, 2.0 * 3f64.sqrt(), 0.2, 0.01).unwrap();
        assert!(!system.forces_current());
        let mut lazy = system.clone();

        system.accel().unwrap();
        system.step().unwrap();
        lazy.step().unwrap();

        assert_eq!(system.positions(), lazy.positions());
        assert_eq!(system.velocities(), lazy.velocities());
        assert_eq!(system.pe(), lazy.pe());
    }

    #[test]
    fn test_failed_step_leaves_state_untouched() {
        let mut system = single_particle(Vector2::new(1.0, 0.0));
        system.accel_with(&ConstantField(Vector2::zeros())).unwrap();
        let before = system.clone();

        let mut verlet = VelocityVerlet::new(Exploding);
        assert!(verlet.step(&mut system).is_err());
        assert_eq!(system.positions(), before.positions());
        assert_eq!(system.velocities(), before.velocities());
        assert_eq!(system.step_count(), 0);
    }

    #[test]
    fn test_short_force_evaluation_is_rejected() {
        let mut system = ParticleSystem::new(4, 4.0, 4.0, 0.0, 0.01).unwrap();
        assert!(matches!(
            system.accel_with(&Truncated),
            Err(MdError::Configuration(_))
        ));
        assert!(!system.forces_current());
        assert_eq!(system.accelerations().len(), 4);

        system.accel().unwrap();
        let before = system.clone();
        let mut verlet = VelocityVerlet::new(Truncated);
        assert!(matches!(
            verlet.step(&mut system),
            Err(MdError::Configuration(_))
        ));
        assert_eq!(system.positions(), before.positions());
        assert_eq!(system.velocities(), before.velocities());
        assert_eq!(system.accelerations().len(), 4);
        assert_eq!(system.step_count(), 0);
    }

    #[test]
    fn test_run_counts_steps() {
        let mut system = ParticleSystem::new(9, 3.0, 3.0, 0.2, 0.005).unwrap();
        let mut verlet = VelocityVerlet::default();
        verlet.run(&mut system, 25).unwrap();
        assert_eq!(system.step_count(), 25);
    }
}
