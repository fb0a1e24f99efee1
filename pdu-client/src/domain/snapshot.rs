use crate::domain::OutletReading;

/// All outlet readings captured by one polling attempt.
///
/// `timestamp` is in Unix seconds and shared by every reading. Readings are
/// ordered by outlet id, which starts at 0 and is contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: i64,
    pub readings: Vec<OutletReading>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// True when outlet ids run `0..len` in order.
    pub fn has_contiguous_outlets(&self) -> bool {
        self.readings
            .iter()
            .enumerate()
            .all(|(idx, r)| r.outlet_id as usize == idx)
    }
}
