//! File collaborators: equilibrium records and observable logs.
//!
//! An equilibrium record holds one particle per line as four whitespace-separated
//! floats `x y vx vy`. Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Vector2;
use tracing::info;

use crate::error::MdError;
use crate::observables::ThermoSample;
use crate::system::ParticleSystem;

/// Positions and velocities read from an equilibrium record
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecords {
    pub positions: Vec<Vector2<f64>>,
    pub velocities: Vec<Vector2<f64>>,
}

/// Parse a whole record stream; any malformed line fails the read
pub fn read_state<R: BufRead>(reader: R) -> Result<StateRecords, MdError> {
    let mut positions = Vec::new();
    let mut velocities = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(MdError::Parse {
                line: line_no,
                message: format!("expected 4 fields `x y vx vy`, found {}", fields.len()),
            });
        }
        let mut values = [0.0; 4];
        for (value, token) in values.iter_mut().zip(&fields) {
            *value = token.parse::<f64>().map_err(|e| MdError::Parse {
                line: line_no,
                message: format!("invalid number `{}`: {}", token, e),
            })?;
            if !value.is_finite() {
                return Err(MdError::Parse {
                    line: line_no,
                    message: format!("non-finite value `{}`", token),
                });
            }
        }
        positions.push(Vector2::new(values[0], values[1]));
        velocities.push(Vector2::new(values[2], values[3]));
    }

    Ok(StateRecords {
        positions,
        velocities,
    })
}

pub fn write_state<W: Write>(mut writer: W, system: &ParticleSystem) -> Result<(), MdError> {
    for (p, v) in system.positions().iter().zip(system.velocities()) {
        writeln!(writer, "{} {} {} {}", p.x, p.y, v.x, v.y)?;
    }
    writer.flush()?;
    Ok(())
}

/// Replace the system state with the records in `path`.
///
/// The file is fully parsed and its length checked before the system is touched.
pub fn load_state<P: AsRef<Path>>(system: &mut ParticleSystem, path: P) -> Result<(), MdError> {
    let path = path.as_ref();
    let records = read_state(BufReader::new(File::open(path)?))?;
    system.bulk_set_state(records.positions, records.velocities)?;
    info!(path = %path.display(), n = system.n(), "loaded equilibrium state");
    Ok(())
}

pub fn save_state<P: AsRef<Path>>(system: &ParticleSystem, path: P) -> Result<(), MdError> {
    let path = path.as_ref();
    write_state(BufWriter::new(File::create(path)?), system)?;
    info!(path = %path.display(), n = system.n(), "saved equilibrium state");
    Ok(())
}

/// CSV sink for sampled observables
pub struct ObservableLog<W: Write> {
    writer: csv::Writer<W>,
}

impl ObservableLog<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, MdError> {
        Ok(ObservableLog {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> ObservableLog<W> {
    pub fn from_writer(writer: W) -> Self {
        ObservableLog {
            writer: csv::Writer::from_writer(writer),
        }
    }

    pub fn record(&mut self, sample: &ThermoSample) -> Result<(), MdError> {
        self.writer.serialize(sample)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), MdError> {
        self.writer.flush()?;
        Ok(())
    }
}
