//! Thermodynamic and structural observables.
//!
//! Every quantity here is a read-only pass over a [`ParticleSystem`]. The pairwise
//! passes fan out over rows `i` with rayon; the per-row results are combined in index
//! order, so a value never depends on the number of worker threads.

use std::f64::consts::PI;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::MdError;
use crate::lj_pot::{pair_vector, ForceProvider, LennardJones};
use crate::system::ParticleSystem;

/// Normalisation of the RDF histogram shells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellNormalization {
    /// Circular annulus `pi (r2^2 - r1^2)`
    #[default]
    Annulus,
    /// Spherical shell `4/3 pi (r2^3 - r1^3)`, kept for comparison with older 3D-style runs
    SphericalShell,
}

impl ShellNormalization {
    fn measure(&self, r_lo: f64, r_hi: f64) -> f64 {
        match self {
            ShellNormalization::Annulus => PI * (r_hi * r_hi - r_lo * r_lo),
            ShellNormalization::SphericalShell => {
                4.0 / 3.0 * PI * (r_hi * r_hi * r_hi - r_lo * r_lo * r_lo)
            }
        }
    }
}

/// Radial distribution function sampled at bin centres
#[derive(Debug, Clone, PartialEq)]
pub struct Rdf {
    pub distances: Vec<f64>,
    pub g_values: Vec<f64>,
}

impl Rdf {
    /// Largest `g(r)` over all bins
    pub fn peak(&self) -> f64 {
        self.g_values.iter().copied().fold(0.0, f64::max)
    }

    /// Distance of the highest bin
    pub fn peak_position(&self) -> Option<f64> {
        self.g_values
            .iter()
            .zip(&self.distances)
            .max_by(|a, b| a.0.total_cmp(b.0))
            .map(|(_, &r)| r)
    }
}

impl ParticleSystem {
    /// `ke / (1.5 N)`.
    ///
    /// NOTE: 1.5 is the 3D equipartition factor; a 2D system would use `ke / N`.
    pub fn temperature(&self) -> f64 {
        self.ke / (1.5 * self.n() as f64)
    }

    /// Pair virial `sum_{i<j} force_factor(r_ij) * r_ij` over minimum-image separations
    pub fn virial(&self) -> Result<f64, MdError> {
        self.virial_with(&LennardJones)
    }

    pub fn virial_with<F: ForceProvider + Sync>(&self, provider: &F) -> Result<f64, MdError> {
        let n = self.n();
        let rows = (0..n)
            .into_par_iter()
            .map(|i| -> Result<f64, MdError> {
                let mut w = 0.0;
                for j in (i + 1)..n {
                    let (_, r) = pair_vector(&self.cell, &self.positions, i, j)?;
                    let force = provider
                        .force_factor(r)
                        .map_err(|_| MdError::NumericalInstability { i, j, r })?;
                    w += force * r;
                }
                Ok(w)
            })
            .collect::<Result<Vec<f64>, MdError>>()?;
        Ok(rows.iter().sum())
    }

    /// `N T + W / (2 Lx Ly)`
    pub fn pressure(&self) -> Result<f64, MdError> {
        let virial = self.virial()?;
        Ok(self.n() as f64 * self.temperature() + virial / (2.0 * self.cell.area()))
    }

    /// RDF over `num_bins` shells of width `r_max / num_bins`, annulus normalisation
    pub fn rdf(&self, r_max: f64, num_bins: usize) -> Result<Rdf, MdError> {
        self.rdf_with(r_max, num_bins, ShellNormalization::Annulus)
    }

    pub fn rdf_with(
        &self,
        r_max: f64,
        num_bins: usize,
        shell: ShellNormalization,
    ) -> Result<Rdf, MdError> {
        if num_bins == 0 {
            return Err(MdError::config("rdf needs at least one bin"));
        }
        if !(r_max > 0.0) || !r_max.is_finite() {
            return Err(MdError::config(format!("rdf r_max must be positive, got {}", r_max)));
        }

        let n = self.n();
        let dr = r_max / num_bins as f64;

        // integer counts: the reduction order cannot change the histogram
        let histogram = (0..n)
            .into_par_iter()
            .try_fold(
                || vec![0u64; num_bins],
                |mut hist, i| {
                    for j in (i + 1)..n {
                        let (_, r) = pair_vector(&self.cell, &self.positions, i, j)?;
                        if r < r_max {
                            let bin = ((r / dr) as usize).min(num_bins - 1);
                            hist[bin] += 2;
                        }
                    }
                    Ok::<_, MdError>(hist)
                },
            )
            .try_reduce(
                || vec![0u64; num_bins],
                |mut a, b| {
                    for (x, y) in a.iter_mut().zip(&b) {
                        *x += y;
                    }
                    Ok(a)
                },
            )?;

        let density = n as f64 / self.cell.area();
        let mut distances = Vec::with_capacity(num_bins);
        let mut g_values = Vec::with_capacity(num_bins);
        for (k, &count) in histogram.iter().enumerate() {
            let r_lo = k as f64 * dr;
            let r_hi = r_lo + dr;
            let ideal = n as f64 * density * shell.measure(r_lo, r_hi);
            distances.push(r_lo + 0.5 * dr);
            g_values.push(count as f64 / ideal);
        }

        Ok(Rdf {
            distances,
            g_values,
        })
    }
}

/// One row of observables, as sampled by a driver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermoSample {
    pub step: u64,
    pub temperature: f64,
    pub pressure: f64,
    pub pe: f64,
    pub ke: f64,
    pub total_energy: f64,
}

impl ThermoSample {
    pub fn capture(system: &ParticleSystem) -> Result<Self, MdError> {
        Ok(ThermoSample {
            step: system.step_count(),
            temperature: system.temperature(),
            pressure: system.pressure()?,
            pe: system.pe(),
            ke: system.ke(),
            total_energy: system.total_energy(),
        })
    }
}

/// Running means of sampled observables, held outside the particle system
#[derive(Debug, Clone, Default)]
pub struct ThermoAverages {
    samples: usize,
    temperature: f64,
    pressure: f64,
    pe: f64,
    ke: f64,
}

impl ThermoAverages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: &ThermoSample) {
        self.samples += 1;
        self.temperature += sample.temperature;
        self.pressure += sample.pressure;
        self.pe += sample.pe;
        self.ke += sample.ke;
    }

    /// Drop all accumulated samples, e.g. after a box rescale
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    fn mean(&self, sum: f64) -> Option<f64> {
        (self.samples > 0).then(|| sum / self.samples as f64)
    }

    pub fn mean_temperature(&self) -> Option<f64> {
        self.mean(self.temperature)
    }
    pub fn mean_pressure(&self) -> Option<f64> {
        self.mean(self.pressure)
    }
    pub fn mean_pe(&self) -> Option<f64> {
        self.mean(self.pe)
    }
    pub fn mean_ke(&self) -> Option<f64> {
        self.mean(self.ke)
    }
}
