use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ForcingError {
    #[error("forcing series contains no records")]
    Empty,

    #[error("non-monotonic time at record {index}")]
    NonMonotonic { index: usize },

    #[error("non-finite boundary value at record {index}")]
    NonFinite { index: usize },
}

// Boundary forcing of one record
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForcingRecord {
    pub time: f64,   // Timestamp at the end of the record [s]
    pub top: f64,    // Top boundary value: head [m] or inflow [m/s]
    pub bottom: f64, // Bottom boundary value: head [m] or inflow [m/s]
    pub save: bool,  // Whether the output sink should keep this record
}

impl ForcingRecord {
    pub fn new(time: f64, top: f64, bottom: f64) -> Self {
        ForcingRecord {
            time,
            top,
            bottom,
            save: true,
        }
    }

    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }
}

// Ordered, finite sequence of boundary forcing records
#[derive(Clone, Debug, PartialEq)]
pub struct ForcingSeries {
    records: Vec<ForcingRecord>,
}

impl ForcingSeries {
    // Records must be non-empty, finite and strictly increasing in time
    pub fn from_records(records: Vec<ForcingRecord>) -> Result<Self, ForcingError> {
        if records.is_empty() {
            return Err(ForcingError::Empty);
        }
        for (index, record) in records.iter().enumerate() {
            if !(record.time.is_finite() && record.top.is_finite() && record.bottom.is_finite()) {
                return Err(ForcingError::NonFinite { index });
            }
            if index > 0 && record.time <= records[index - 1].time {
                return Err(ForcingError::NonMonotonic { index });
            }
        }
        Ok(ForcingSeries { records })
    }

    // Constant forcing repeated `count` times every `time_step` seconds,
    // starting one step after `start`
    pub fn constant(start: f64, time_step: f64, count: usize, top: f64, bottom: f64) -> Result<Self, ForcingError> {
        let records = (1..=count)
            .map(|k| ForcingRecord::new(start + k as f64 * time_step, top, bottom))
            .collect();
        Self::from_records(records)
    }

    // Mark every `frequency`-th record (and the last one) as saved
    pub fn save_every(mut self, frequency: usize) -> Self {
        let last = self.records.len() - 1;
        for (i, record) in self.records.iter_mut().enumerate() {
            record.save = frequency > 0 && ((i + 1) % frequency == 0 || i == last);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForcingRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a ForcingSeries {
    type Item = &'a ForcingRecord;
    type IntoIter = std::slice::Iter<'a, ForcingRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_is_evenly_spaced() {
        let series = ForcingSeries::constant(0.0, 60.0, 5, 1e-6, 0.0).unwrap();
        assert_eq!(series.len(), 5);
        let times: Vec<f64> = series.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![60.0, 120.0, 180.0, 240.0, 300.0]);
    }

    #[test]
    fn rejects_bad_records() {
        assert_eq!(ForcingSeries::from_records(vec![]), Err(ForcingError::Empty));
        let records = vec![ForcingRecord::new(60.0, 0.0, 0.0), ForcingRecord::new(60.0, 0.0, 0.0)];
        assert_eq!(
            ForcingSeries::from_records(records),
            Err(ForcingError::NonMonotonic { index: 1 })
        );
        let records = vec![ForcingRecord::new(60.0, f64::NAN, 0.0)];
        assert_eq!(
            ForcingSeries::from_records(records),
            Err(ForcingError::NonFinite { index: 0 })
        );
    }

    #[test]
    fn save_every_marks_batches_and_last() {
        let series = ForcingSeries::constant(0.0, 1.0, 7, 0.0, 0.0)
            .unwrap()
            .save_every(3);
        let saved: Vec<bool> = series.iter().map(|r| r.save).collect();
        assert_eq!(saved, vec![false, false, true, false, false, true, true]);
    }
}
