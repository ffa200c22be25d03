use crate::Error;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Identifier of a single readout sensor (PMT or SiPM channel).
pub type SensorId = u32;

/// Waveforms recorded by a group of sensors over a common time axis.
///
/// Row `i` of [`all_waveforms`](Self::all_waveforms) holds the samples of
/// sensor `ids[i]`; columns are time bins. The container is immutable after
/// construction, so every derived quantity is a pure function of the stored
/// arrays.
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use pmaps::SensorResponses;
///
/// let sr = SensorResponses::new(vec![3, 7], array![[1.0, 2.0], [4.0, 8.0]])?;
/// assert_eq!(sr.sum_over_times()[1], 12.0);
/// assert_eq!(sr.sum_over_sensors()[0], 5.0);
/// # Ok::<(), pmaps::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SensorResponses {
    ids: Vec<SensorId>,
    all_waveforms: Array2<f64>,
}

impl SensorResponses {
    /// Creates a new response container from sensor ids and their waveform
    /// matrix of shape `(n_sensors, n_samples)`.
    ///
    /// Fails with [`Error::ShapeMismatch`] if the number of ids does not
    /// match the number of rows, and with [`Error::NonMonotonicIds`] if the
    /// ids are not strictly increasing. Sorted ids are an invariant rather
    /// than a precondition: [`waveform`](Self::waveform) looks rows up by
    /// binary search.
    pub fn new(ids: Vec<SensorId>, all_waveforms: Array2<f64>) -> Result<Self, Error> {
        if ids.len() != all_waveforms.nrows() {
            return Err(Error::ShapeMismatch {
                what: "one waveform row per sensor id",
                expected: ids.len(),
                found: all_waveforms.nrows(),
            });
        }
        if !ids.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(Error::NonMonotonicIds);
        }

        Ok(Self { ids, all_waveforms })
    }

    /// Returns the canonical empty instance (zero sensors, zero samples).
    ///
    /// Used wherever a `SensorResponses` is expected but no data exists,
    /// e.g. the SiPM side of an S1 peak. A zero-by-zero array allocates
    /// nothing, so the value is cheap to build anywhere it is needed.
    pub fn build_empty_instance() -> Self {
        Self {
            ids: Vec::new(),
            all_waveforms: Array2::zeros((0, 0)),
        }
    }

    /// The sensor ids, strictly increasing.
    pub fn ids(&self) -> &[SensorId] {
        &self.ids
    }

    /// The full waveform matrix, shape `(n_sensors, n_samples)`.
    pub fn all_waveforms(&self) -> &Array2<f64> {
        &self.all_waveforms
    }

    pub fn n_sensors(&self) -> usize {
        self.ids.len()
    }

    pub fn n_samples(&self) -> usize {
        self.all_waveforms.ncols()
    }

    /// Returns `true` if this instance carries no sensors at all.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The waveform of a single sensor.
    ///
    /// Fails with [`Error::UnknownSensor`] if `sensor` is not present.
    pub fn waveform(&self, sensor: SensorId) -> Result<ArrayView1<'_, f64>, Error> {
        let row = self
            .ids
            .binary_search(&sensor)
            .map_err(|_| Error::UnknownSensor(sensor))?;
        Ok(self.all_waveforms.row(row))
    }

    /// The samples of all sensors at time bin `i`.
    ///
    /// Panics if `i` is out of range, as with any ndarray indexing.
    pub fn time_slice(&self, i: usize) -> ArrayView1<'_, f64> {
        self.all_waveforms.column(i)
    }

    /// Per-sensor totals (row sums).
    pub fn sum_over_times(&self) -> Array1<f64> {
        self.all_waveforms.sum_axis(Axis(1))
    }

    /// Per-time-bin totals over all sensors (column sums).
    pub fn sum_over_sensors(&self) -> Array1<f64> {
        self.all_waveforms.sum_axis(Axis(0))
    }
}
