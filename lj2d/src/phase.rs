use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MdError;
use crate::observables::ShellNormalization;
use crate::system::ParticleSystem;

/// Thresholds and RDF binning used to call a configuration solid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseCriteria {
    /// Upper bound on the mean kinetic energy per particle
    #[serde(default = "default_threshold_velocity")]
    pub threshold_velocity: f64,
    /// Lower bound on the RDF peak height
    #[serde(default = "default_rdf_threshold")]
    pub rdf_threshold: f64,
    #[serde(default = "default_rdf_r_max")]
    pub rdf_r_max: f64,
    #[serde(default = "default_rdf_bins")]
    pub rdf_bins: usize,
    #[serde(default)]
    pub shell: ShellNormalization,
}

fn default_threshold_velocity() -> f64 {
    0.5
}
fn default_rdf_threshold() -> f64 {
    3.0
}
fn default_rdf_r_max() -> f64 {
    2.5
}
fn default_rdf_bins() -> usize {
    50
}

impl Default for PhaseCriteria {
    fn default() -> Self {
        PhaseCriteria {
            threshold_velocity: default_threshold_velocity(),
            rdf_threshold: default_rdf_threshold(),
            rdf_r_max: default_rdf_r_max(),
            rdf_bins: default_rdf_bins(),
            shell: ShellNormalization::default(),
        }
    }
}

/// Inputs and verdict of one phase classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseReport {
    pub mean_kinetic_energy: f64,
    pub rdf_peak: f64,
    pub solid: bool,
}

impl ParticleSystem {
    pub fn assess_phase(&self, criteria: &PhaseCriteria) -> Result<PhaseReport, MdError> {
        let mean_kinetic_energy = self.ke() / self.n() as f64;
        let rdf_peak = self
            .rdf_with(criteria.rdf_r_max, criteria.rdf_bins, criteria.shell)?
            .peak();
        let solid =
            !(rdf_peak < criteria.rdf_threshold || mean_kinetic_energy > criteria.threshold_velocity);
        debug!(mean_kinetic_energy, rdf_peak, solid, "phase assessed");
        Ok(PhaseReport {
            mean_kinetic_energy,
            rdf_peak,
            solid,
        })
    }

    /// Solid when the RDF peak reaches `rdf_threshold` and `ke / N` stays within
    /// `threshold_velocity`
    pub fn is_solid(&self, criteria: &PhaseCriteria) -> Result<bool, MdError> {
        Ok(self.assess_phase(criteria)?.solid)
    }
}
