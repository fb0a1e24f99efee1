pub mod error;
pub mod status_client;
pub mod status_layout;

pub use error::{ClientError, FetchError, ParseError};
pub use status_client::{PduStatusClient, StatusFetcher, FETCH_TIMEOUT, STATUS_PATH};
pub use status_layout::{extract_snapshot, SensorSlot, SLOTS_PER_OUTLET};
