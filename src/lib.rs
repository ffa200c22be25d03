//! Data model for processed detector-readout maps ("PMaps") of a
//! time-projection-chamber experiment.
//!
//! Raw per-sensor waveforms are grouped into [`SensorResponses`], a pair of
//! those (PMTs and SiPMs) over a common time axis forms a [`Peak`] ([`S1`]
//! for prompt scintillation, [`S2`] for delayed ionization), and the peaks
//! of one event form a [`PMap`]. Data flows strictly upward through those
//! layers; every value is immutable after construction and all derived
//! quantities (threshold-integrated energy, charge, width, rms, per-SiPM
//! charge reconstruction) are pure functions of the stored arrays.
//!
//! Sensor geometry, calibration and noise models live outside this crate;
//! the core only consumes sensor-id lists and a per-sensor
//! [`SignalToNoise`] lookup.

use thiserror::Error as ThisError;

/// Detected pulses and their threshold-integrated quantities.
pub mod peak;
/// Per-sensor waveform containers.
pub mod sensors;
/// Small statistical helpers shared by the peak quantities.
pub mod statistics;

pub use peak::{Ionization, Peak, PeakKind, Scintillation, SiPMCharge, SignalToNoise, S1, S2};
pub use sensors::{SensorId, SensorResponses};

/// The error type for constructing and querying the readout data model.
///
/// Construction fails atomically; no partially-built value is observable.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Declared id/time counts do not match the array dimensions.
    #[error("shape mismatch: expected {what}, {expected} != {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Sensor ids must be strictly increasing.
    #[error("sensor ids are not strictly increasing")]
    NonMonotonicIds,
    /// A peak needs at least one time sample.
    #[error("peak has an empty time axis")]
    EmptyTimeAxis,
    /// Lookup of a sensor id that is not part of the responses.
    #[error("no sensor with id {0}")]
    UnknownSensor(SensorId),
}

/// The processed map of one event: its S1 and S2 peaks in detection order.
///
/// A pure aggregate; no cross-peak invariant is enforced, as peaks may use
/// different sensor-id subsets. Owns its peaks exclusively.
#[derive(Clone, Debug, PartialEq)]
pub struct PMap {
    s1s: Vec<S1>,
    s2s: Vec<S2>,
}

impl PMap {
    pub fn new(s1s: Vec<S1>, s2s: Vec<S2>) -> Self {
        Self { s1s, s2s }
    }

    /// The S1 peaks, in detection order.
    pub fn s1s(&self) -> &[S1] {
        &self.s1s
    }

    /// The S2 peaks, in detection order.
    pub fn s2s(&self) -> &[S2] {
        &self.s2s
    }

    /// Returns `true` if the event produced no peaks at all.
    pub fn is_empty(&self) -> bool {
        self.s1s.is_empty() && self.s2s.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use ndarray::Array2;

    fn responses(first_id: SensorId, n_sensors: usize, amplitude: f64) -> Result<SensorResponses> {
        let ids = (first_id..first_id + n_sensors as SensorId).collect();
        let wfs = Array2::from_elem((n_sensors, 3), amplitude);
        Ok(SensorResponses::new(ids, wfs)?)
    }

    fn s1(amplitude: f64) -> Result<S1> {
        Ok(S1::builder()
            .times(vec![0.0, 1.0, 2.0])
            .bin_widths(vec![1.0; 3])
            .pmts(responses(0, 2, amplitude)?)
            .sipms(SensorResponses::build_empty_instance())
            .build()?)
    }

    fn s2(amplitude: f64) -> Result<S2> {
        Ok(S2::builder()
            .times(vec![10.0, 11.0, 12.0])
            .bin_widths(vec![1.0; 3])
            .pmts(responses(0, 2, amplitude)?)
            .sipms(responses(1000, 4, amplitude / 10.0)?)
            .build()?)
    }

    #[test]
    fn pmap_keeps_lengths_and_order() -> Result<()> {
        let s1s = vec![s1(1.0)?, s1(2.0)?, s1(3.0)?];
        let s2s = vec![s2(10.0)?, s2(20.0)?];
        let pmap = PMap::new(s1s.clone(), s2s.clone());

        assert_eq!(pmap.s1s().len(), 3);
        assert_eq!(pmap.s2s().len(), 2);
        for (kept, original) in pmap.s1s().iter().zip(&s1s) {
            assert_eq!(kept, original);
        }
        for (kept, original) in pmap.s2s().iter().zip(&s2s) {
            assert_eq!(kept, original);
        }
        Ok(())
    }

    #[test]
    fn pmap_allows_either_side_to_be_empty() -> Result<()> {
        let only_s2 = PMap::new(Vec::new(), vec![s2(10.0)?]);
        assert_eq!(only_s2.s1s().len(), 0);
        assert_eq!(only_s2.s2s().len(), 1);
        assert!(!only_s2.is_empty());

        let empty = PMap::new(Vec::new(), Vec::new());
        assert!(empty.is_empty());
        Ok(())
    }

    #[test]
    fn errors_render_their_context() {
        let err = Error::ShapeMismatch {
            what: "one waveform row per sensor id",
            expected: 2,
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "shape mismatch: expected one waveform row per sensor id, 2 != 3"
        );
        assert_eq!(Error::UnknownSensor(7).to_string(), "no sensor with id 7");
    }
}
