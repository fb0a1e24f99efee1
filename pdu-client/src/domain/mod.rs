mod measurement;
mod outlet_reading;
mod snapshot;

pub use measurement::Measurement;
pub use outlet_reading::OutletReading;
pub use snapshot::Snapshot;
