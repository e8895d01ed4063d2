use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use tracing::debug;

use crate::error::MdError;
use crate::lattice;
use crate::lj_pot::{ForceProvider, LennardJones, PeriodicBox};
use crate::run_md::{Integrator, VelocityVerlet};

/// State of N unit-mass particles in a periodic 2D box
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pub(crate) positions: Vec<Vector2<f64>>,
    pub(crate) velocities: Vec<Vector2<f64>>,
    pub(crate) accelerations: Vec<Vector2<f64>>,
    pub(crate) cell: PeriodicBox,
    vmax: f64,
    dt: f64,
    dt2: f64,
    pub(crate) pe: f64,
    pub(crate) ke: f64,
    pub(crate) step_count: u64,
    /// accelerations and `pe` belong to the current positions
    pub(crate) forces_current: bool,
}

impl ParticleSystem {
    /// Place `n` particles on a brick lattice with zero net momentum.
    ///
    /// `vmax` is stored for drivers and [`ParticleSystem::randomize_velocities`];
    /// the lattice itself starts at rest.
    pub fn new(n: usize, lx: f64, ly: f64, vmax: f64, dt: f64) -> Result<Self, MdError> {
        if n == 0 {
            return Err(MdError::config("particle count must be positive"));
        }
        if !(lx > 0.0) || !(ly > 0.0) || !lx.is_finite() || !ly.is_finite() {
            return Err(MdError::config(format!(
                "box extents must be positive and finite, got {} x {}",
                lx, ly
            )));
        }
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(MdError::config(format!("timestep must be positive, got {}", dt)));
        }

        let cell = PeriodicBox::new(lx, ly);
        let positions = lattice::brick_lattice(n, &cell);

        let mut system = ParticleSystem {
            positions,
            velocities: vec![Vector2::zeros(); n],
            accelerations: vec![Vector2::zeros(); n],
            cell,
            vmax,
            dt,
            dt2: dt * dt,
            pe: 0.0,
            ke: 0.0,
            step_count: 0,
            forces_current: false,
        };
        system.remove_drift();
        debug!(n, lx, ly, dt, "constructed particle system");
        Ok(system)
    }

    /// Draw every velocity component uniformly from `[-vmax, vmax]`, then remove the
    /// centre-of-mass motion. `ke` is refreshed to match.
    pub fn randomize_velocities(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        if self.vmax > 0.0 {
            let dist = Uniform::new_inclusive(-self.vmax, self.vmax);
            for v in &mut self.velocities {
                *v = Vector2::new(dist.sample(&mut rng), dist.sample(&mut rng));
            }
        }
        self.remove_drift();
        self.ke = self.kinetic_energy();
    }

    fn remove_drift(&mut self) {
        let n = self.velocities.len() as f64;
        let v_cm: Vector2<f64> = self.velocities.iter().sum::<Vector2<f64>>() / n;
        for v in &mut self.velocities {
            *v -= v_cm;
        }
    }

    pub(crate) fn kinetic_energy(&self) -> f64 {
        self.velocities.iter().map(|v| 0.5 * v.dot(v)).sum()
    }

    /// Replace positions and velocities wholesale.
    ///
    /// Both slices must hold exactly N entries; nothing is changed otherwise.
    /// `pe`, `ke` and the step counter are left untouched.
    pub fn bulk_set_state(
        &mut self,
        positions: Vec<Vector2<f64>>,
        velocities: Vec<Vector2<f64>>,
    ) -> Result<(), MdError> {
        let n = self.n();
        if positions.len() != n || velocities.len() != n {
            return Err(MdError::config(format!(
                "state replacement needs {} positions and velocities, got {} and {}",
                n,
                positions.len(),
                velocities.len()
            )));
        }
        self.positions = positions;
        self.velocities = velocities;
        self.forces_current = false;
        Ok(())
    }

    /// Scale the box extents and every position by `factor`
    pub fn rescale_box(&mut self, factor: f64) -> Result<(), MdError> {
        if !(factor > 0.0) || !factor.is_finite() {
            return Err(MdError::config(format!(
                "rescale factor must be positive, got {}",
                factor
            )));
        }
        self.cell.scale(factor);
        for p in &mut self.positions {
            *p *= factor;
        }
        self.forces_current = false;
        debug!(factor, lx = self.cell.lx(), ly = self.cell.ly(), "rescaled box");
        Ok(())
    }

    /// Recompute accelerations and `pe` at the current positions
    pub fn accel(&mut self) -> Result<(), MdError> {
        self.accel_with(&LennardJones)
    }

    pub fn accel_with<F: ForceProvider>(&mut self, provider: &F) -> Result<(), MdError> {
        let eval = provider
            .compute_accelerations(&self.cell, &self.positions)?
            .check_len(self.n())?;
        self.accelerations = eval.accelerations;
        self.pe = eval.potential_energy;
        self.forces_current = true;
        Ok(())
    }

    /// Advance one velocity-Verlet step with the Lennard-Jones force field
    pub fn step(&mut self) -> Result<(), MdError> {
        VelocityVerlet::new(LennardJones).step(self)
    }

    pub fn reset_step_count(&mut self) {
        self.step_count = 0;
    }

    // Getters
    pub fn n(&self) -> usize {
        self.positions.len()
    }
    pub fn positions(&self) -> &[Vector2<f64>] {
        &self.positions
    }
    pub fn velocities(&self) -> &[Vector2<f64>] {
        &self.velocities
    }
    pub fn accelerations(&self) -> &[Vector2<f64>] {
        &self.accelerations
    }
    pub fn cell(&self) -> &PeriodicBox {
        &self.cell
    }
    pub fn lx(&self) -> f64 {
        self.cell.lx()
    }
    pub fn ly(&self) -> f64 {
        self.cell.ly()
    }
    pub fn vmax(&self) -> f64 {
        self.vmax
    }
    pub fn dt(&self) -> f64 {
        self.dt
    }
    pub fn dt2(&self) -> f64 {
        self.dt2
    }
    /// Potential energy from the latest force evaluation
    pub fn pe(&self) -> f64 {
        self.pe
    }
    /// Kinetic energy after the latest full velocity update
    pub fn ke(&self) -> f64 {
        self.ke
    }
    pub fn total_energy(&self) -> f64 {
        self.pe + self.ke
    }
    pub fn step_count(&self) -> u64 {
        self.step_count
    }
    pub fn forces_current(&self) -> bool {
        self.forces_current
    }
}
