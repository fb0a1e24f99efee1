use crate::domain::Measurement;

/// One outlet's measurement within a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct OutletReading {
    pub outlet_id: u32,
    /// Volts.
    pub voltage: Measurement,
    /// Amps.
    pub current: Measurement,
    /// Watts.
    pub active_power: Measurement,
    pub power_factor: Measurement,
}
