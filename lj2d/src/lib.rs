//! Two-dimensional Lennard-Jones molecular dynamics in a periodic box.
//!
//! [`ParticleSystem`] owns the particle state. [`lj_pot`] evaluates pair forces under
//! the minimum-image convention. [`run_md`] advances the state with velocity-Verlet.
//! [`observables`] and [`phase`] derive temperature, pressure, the radial
//! distribution function and a solid/not-solid verdict.

pub mod config;
pub mod error;
pub mod io;
pub mod lattice;
pub mod lj_pot;
pub mod observables;
pub mod phase;
pub mod run_md;
pub mod system;

pub use config::{MdConfig, VelocityInit};
pub use error::MdError;
pub use lj_pot::{ForceEvaluation, ForceProvider, LennardJones, PeriodicBox};
pub use observables::{Rdf, ShellNormalization, ThermoAverages, ThermoSample};
pub use phase::{PhaseCriteria, PhaseReport};
pub use run_md::{Integrator, VelocityVerlet};
pub use system::ParticleSystem;
