use crate::sensors::{SensorId, SensorResponses};
use crate::statistics::weighted_mean_and_std;
use crate::Error;
use bon::bon;
use ndarray::{Array1, Array2};
use std::fmt;
use std::marker::PhantomData;

mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the two classes of detected pulse. Sealed; the only
/// implementors are [`Scintillation`] and [`Ionization`].
pub trait PeakKind: sealed::Sealed + 'static {
    /// Conventional label of this pulse class.
    const LABEL: &'static str;
}

/// Prompt scintillation pulse class (S1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scintillation {}

/// Delayed ionization pulse class (S2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ionization {}

impl sealed::Sealed for Scintillation {}
impl PeakKind for Scintillation {
    const LABEL: &'static str = "S1";
}

impl sealed::Sealed for Ionization {}
impl PeakKind for Ionization {
    const LABEL: &'static str = "S2";
}

/// A prompt scintillation peak.
pub type S1 = Peak<Scintillation>;
/// A delayed ionization peak. The only kind with a meaningful SiPM
/// charge-array reconstruction.
pub type S2 = Peak<Ionization>;

/// One detected pulse: a time axis, per-bin durations, and the PMT and SiPM
/// responses recorded over that axis.
///
/// S1 and S2 share all of this structure; they differ only in the kind tag
/// `K` and in which downstream operations are exposed
/// ([`sipm_charge_array`](S2::sipm_charge_array) exists on [`S2`] only).
///
/// Immutable after construction; every derived quantity below is a pure
/// function of the stored arrays.
#[derive(Clone, PartialEq)]
pub struct Peak<K> {
    times: Vec<f64>,
    bin_widths: Vec<f64>,
    pmts: SensorResponses,
    sipms: SensorResponses,
    _kind: PhantomData<K>,
}

#[bon]
impl<K: PeakKind> Peak<K> {
    /// Builds a peak from a finished pair of sensor responses.
    ///
    /// `times`, `bin_widths` and the PMT sample axis must all have the same
    /// length, and so must the SiPM sample axis unless `sipms` is the empty
    /// instance. Mismatches fail with [`Error::ShapeMismatch`]; a peak with
    /// no time samples at all fails with [`Error::EmptyTimeAxis`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ndarray::Array2;
    /// use pmaps::{SensorResponses, S1};
    ///
    /// let pmts = SensorResponses::new(vec![0, 1], Array2::from_elem((2, 3), 1.0))?;
    /// let s1 = S1::builder()
    ///     .times(vec![0.0, 1.0, 2.0])
    ///     .bin_widths(vec![1.0; 3])
    ///     .pmts(pmts)
    ///     .sipms(SensorResponses::build_empty_instance())
    ///     .build()?;
    /// assert_eq!(s1.total_energy(), 6.0);
    /// # Ok::<(), pmaps::Error>(())
    /// ```
    #[builder]
    pub fn new(
        times: Vec<f64>,
        bin_widths: Vec<f64>,
        pmts: SensorResponses,
        sipms: SensorResponses,
    ) -> Result<Self, Error> {
        let n = times.len();
        if n == 0 {
            return Err(Error::EmptyTimeAxis);
        }
        if bin_widths.len() != n {
            return Err(Error::ShapeMismatch {
                what: "one bin width per time sample",
                expected: n,
                found: bin_widths.len(),
            });
        }
        if pmts.n_samples() != n {
            return Err(Error::ShapeMismatch {
                what: "one PMT sample per time bin",
                expected: n,
                found: pmts.n_samples(),
            });
        }
        if !sipms.is_empty() && sipms.n_samples() != n {
            return Err(Error::ShapeMismatch {
                what: "one SiPM sample per time bin",
                expected: n,
                found: sipms.n_samples(),
            });
        }

        Ok(Self {
            times,
            bin_widths,
            pmts,
            sipms,
            _kind: PhantomData,
        })
    }
}

impl<K: PeakKind> Peak<K> {
    /// The time axis, strictly increasing.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// The duration covered by each time bin.
    pub fn bin_widths(&self) -> &[f64] {
        &self.bin_widths
    }

    pub fn pmts(&self) -> &SensorResponses {
        &self.pmts
    }

    pub fn sipms(&self) -> &SensorResponses {
        &self.sipms
    }

    /// PMT-summed amplitude per time bin.
    pub fn energies(&self) -> Array1<f64> {
        self.pmts.sum_over_sensors()
    }

    /// SiPM-summed amplitude per time bin.
    pub fn charges(&self) -> Array1<f64> {
        self.sipms.sum_over_sensors()
    }

    /// Sum of all PMT samples over all sensors and times.
    pub fn total_energy(&self) -> f64 {
        self.pmts.all_waveforms().sum()
    }

    /// Sum of all SiPM samples over all sensors and times.
    pub fn total_charge(&self) -> f64 {
        self.sipms.all_waveforms().sum()
    }

    /// Maximum of the PMT-summed amplitude across time bins.
    pub fn height(&self) -> f64 {
        self.energies().iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// The timestamp at which the PMT-summed amplitude is maximal.
    /// First occurrence wins on ties.
    pub fn time_at_max_energy(&self) -> f64 {
        let energies = self.energies();
        let (index, _) = energies.iter().enumerate().fold(
            (0, f64::NEG_INFINITY),
            |(best_i, best_e), (i, &e)| {
                if e > best_e {
                    (i, e)
                } else {
                    (best_i, best_e)
                }
            },
        );
        self.times[index]
    }

    /// Total width of the peak: the sum of all bin widths.
    ///
    /// Note that this is the summed bin coverage, not the time span
    /// `times[last] - times[0]`. With unit-spaced unit-width bins it equals
    /// the number of time samples, which is one sample-width more than the
    /// span. Downstream users expecting the span definition should compute
    /// it from [`times`](Self::times) directly.
    pub fn width(&self) -> f64 {
        self.width_above_threshold(f64::NEG_INFINITY)
    }

    /// Weighted spread of the full peak; equal to
    /// [`rms_above_threshold`](Self::rms_above_threshold) with every bin
    /// included.
    pub fn rms(&self) -> f64 {
        self.rms_above_threshold(f64::NEG_INFINITY)
    }

    /// Sum of the PMT-summed amplitudes strictly above `thr`.
    ///
    /// A threshold at or above [`height`](Self::height) selects nothing and
    /// yields 0; a threshold below the minimum selects every bin and yields
    /// [`total_energy`](Self::total_energy).
    pub fn energy_above_threshold(&self, thr: f64) -> f64 {
        self.energies().iter().filter(|&&e| e > thr).sum()
    }

    /// Summed bin widths of the time bins whose PMT-summed amplitude is
    /// strictly above `thr`; 0 if no bin qualifies.
    pub fn width_above_threshold(&self, thr: f64) -> f64 {
        self.energies()
            .iter()
            .zip(&self.bin_widths)
            .filter(|(&e, _)| e > thr)
            .map(|(_, &w)| w)
            .sum()
    }

    /// Summed SiPM charge over the time bins whose PMT-summed amplitude is
    /// strictly above `thr`.
    ///
    /// The threshold is applied to the PMT energy; the charge is read off
    /// the same index set. 0 if this peak carries no SiPM information.
    pub fn charge_above_threshold(&self, thr: f64) -> f64 {
        if self.sipms.is_empty() {
            return 0.0;
        }
        self.energies()
            .iter()
            .zip(self.charges())
            .filter(|(&e, _)| e > thr)
            .map(|(_, q)| q)
            .sum()
    }

    /// Weighted standard deviation of the timestamps whose PMT-summed
    /// amplitude is strictly above `thr`, weighted by that amplitude.
    ///
    /// Returns 0 when fewer than two bins qualify or the qualifying weights
    /// do not sum to a positive value.
    pub fn rms_above_threshold(&self, thr: f64) -> f64 {
        let mut times = Vec::new();
        let mut weights = Vec::new();
        for (i, &e) in self.energies().iter().enumerate() {
            if e > thr {
                times.push(self.times[i]);
                weights.push(e);
            }
        }
        if times.len() < 2 || weights.iter().sum::<f64>() <= 0.0 {
            return 0.0;
        }

        weighted_mean_and_std(&times, &weights).1
    }
}

impl<K: PeakKind> fmt::Debug for Peak<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(K::LABEL)
            .field("times", &self.times)
            .field("bin_widths", &self.bin_widths)
            .field("pmts", &self.pmts)
            .field("sipms", &self.sipms)
            .finish()
    }
}

/// Per-SiPM charge-reconstruction mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiPMCharge {
    /// The raw waveform value, passed through unchanged.
    Raw,
    /// The raw value scaled by the sensor's signal-to-noise ratio.
    SignalToNoise,
}

impl SiPMCharge {
    /// Every reconstruction mode, for parametrized sweeps.
    pub const MODES: [SiPMCharge; 2] = [SiPMCharge::Raw, SiPMCharge::SignalToNoise];
}

/// Per-sensor signal-to-noise model, supplied by the calibration machinery.
///
/// [`ratio`](Self::ratio) must return a positive, finite value for any
/// non-zero charge; the charge-array reconstruction relies on that to keep
/// non-zero samples non-zero. Implemented for any
/// `Fn(SensorId, f64) -> f64` closure.
pub trait SignalToNoise {
    /// Signal-to-noise ratio of `sensor` at the given observed charge.
    fn ratio(&self, sensor: SensorId, charge: f64) -> f64;
}

impl<F> SignalToNoise for F
where
    F: Fn(SensorId, f64) -> f64,
{
    fn ratio(&self, sensor: SensorId, charge: f64) -> f64 {
        self(sensor, charge)
    }
}

fn reconstruct(model: &impl SignalToNoise, mode: SiPMCharge, sensor: SensorId, charge: f64) -> f64 {
    // A raw value of exactly zero reconstructs to exactly zero in every
    // mode, so non-zero counts are preserved through reconstruction.
    if charge == 0.0 {
        return 0.0;
    }
    match mode {
        SiPMCharge::Raw => charge,
        SiPMCharge::SignalToNoise => charge * model.ratio(sensor, charge),
    }
}

impl Peak<Ionization> {
    /// Reconstructs a charge value for every SiPM and time sample.
    ///
    /// The result has shape `(n_samples, n_sensors)`, the SiPM waveform
    /// array transposed, with each sample mapped through the `mode` formula.
    pub fn sipm_charge_array(&self, model: &impl SignalToNoise, mode: SiPMCharge) -> Array2<f64> {
        let wfs = self.sipms.all_waveforms();
        let ids = self.sipms.ids();
        Array2::from_shape_fn((wfs.ncols(), wfs.nrows()), |(t, s)| {
            reconstruct(model, mode, ids[s], wfs[[s, t]])
        })
    }

    /// Reconstructs one aggregate charge value per SiPM, from each sensor's
    /// summed waveform. The result has shape `(n_sensors,)`.
    pub fn sipm_charge_array_single_point(
        &self,
        model: &impl SignalToNoise,
        mode: SiPMCharge,
    ) -> Array1<f64> {
        let totals = self.sipms.sum_over_times();
        let ids = self.sipms.ids();
        Array1::from_iter(
            totals
                .iter()
                .zip(ids)
                .map(|(&q, &id)| reconstruct(model, mode, id, q)),
        )
    }
}
