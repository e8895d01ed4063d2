use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MdError;
use crate::phase::PhaseCriteria;
use crate::system::ParticleSystem;

/// Configuration for a 2D Lennard-Jones run
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct MdConfig {
    /// Particle count, box and integration parameters
    #[serde(default)]
    pub system: SystemConfig,
    /// Phase lengths of the driver
    #[serde(default)]
    pub run: RunConfig,
    /// Phase classification thresholds
    #[serde(default)]
    pub phase: PhaseCriteria,
    /// Optional output files
    #[serde(default)]
    pub output: OutputConfig,
}

/// System setup configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    #[serde(default = "default_box_width")]
    pub box_width: f64,
    #[serde(default = "default_box_height")]
    pub box_height: f64,
    /// Maximum initial speed component
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_timestep")]
    pub timestep: f64,
    #[serde(default)]
    pub velocity_init: VelocityInit,
}

/// Initial velocity options
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum VelocityInit {
    /// Lattice at rest
    #[serde(rename = "zero")]
    #[default]
    Zero,
    /// Uniform components in `[-max_speed, max_speed]`, drift removed
    #[serde(rename = "random")]
    Random {
        #[serde(default)]
        seed: u64,
    },
}

/// Driver phase lengths
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RunConfig {
    /// Integration steps between two samples (one frame)
    #[serde(default = "default_substeps_per_frame")]
    pub substeps_per_frame: usize,
    #[serde(default = "default_equilibration_steps")]
    pub equilibration_steps: usize,
    #[serde(default = "default_averaging_steps")]
    pub averaging_steps: usize,
    /// Box scale factor applied between equilibration and averaging
    #[serde(default)]
    pub rescale_factor: Option<f64>,
}

/// Output configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct OutputConfig {
    /// Where to write the final `x y vx vy` records
    #[serde(default)]
    pub equilibrium_out: Option<PathBuf>,
    /// Where to write sampled observables as CSV
    #[serde(default)]
    pub observables_csv: Option<PathBuf>,
}

// Default value functions
fn default_particle_count() -> usize {
    16
}
fn default_box_width() -> f64 {
    4.0
}
fn default_box_height() -> f64 {
    2.0 * 3f64.sqrt()
}
fn default_max_speed() -> f64 {
    0.2
}
fn default_timestep() -> f64 {
    0.01
}
fn default_substeps_per_frame() -> usize {
    5
}
fn default_equilibration_steps() -> usize {
    1000
}
fn default_averaging_steps() -> usize {
    5000
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            particle_count: default_particle_count(),
            box_width: default_box_width(),
            box_height: default_box_height(),
            max_speed: default_max_speed(),
            timestep: default_timestep(),
            velocity_init: VelocityInit::default(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            substeps_per_frame: default_substeps_per_frame(),
            equilibration_steps: default_equilibration_steps(),
            averaging_steps: default_averaging_steps(),
            rescale_factor: None,
        }
    }
}

impl MdConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MdError> {
        let content = fs::read_to_string(path)?;
        let config: MdConfig = serde_yml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MdError> {
        let content = serde_yml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), MdError> {
        let system = &self.system;
        if system.particle_count == 0 {
            return Err(MdError::config("particle_count must be positive"));
        }
        if system.box_width <= 0.0 || system.box_height <= 0.0 {
            return Err(MdError::config("box dimensions must be positive"));
        }
        if system.timestep <= 0.0 {
            return Err(MdError::config("timestep must be positive"));
        }
        if system.max_speed < 0.0 {
            return Err(MdError::config("max_speed must not be negative"));
        }

        if self.run.substeps_per_frame == 0 {
            return Err(MdError::config("substeps_per_frame must be positive"));
        }
        if let Some(factor) = self.run.rescale_factor {
            if factor <= 0.0 {
                return Err(MdError::config("rescale_factor must be positive"));
            }
        }

        if self.phase.rdf_bins == 0 {
            return Err(MdError::config("rdf_bins must be positive"));
        }
        if self.phase.rdf_r_max <= 0.0 {
            return Err(MdError::config("rdf_r_max must be positive"));
        }

        Ok(())
    }

    /// Construct the particle system described by `system`
    pub fn build_system(&self) -> Result<ParticleSystem, MdError> {
        let s = &self.system;
        let mut system =
            ParticleSystem::new(s.particle_count, s.box_width, s.box_height, s.max_speed, s.timestep)?;
        if let VelocityInit::Random { seed } = s.velocity_init {
            system.randomize_velocities(seed);
        }
        Ok(system)
    }
}
