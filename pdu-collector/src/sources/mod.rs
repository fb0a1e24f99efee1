pub mod pdu_poll;

pub use pdu_poll::{Clock, PduPollSource, SystemClock, TIMESTAMP_SKEW_SECS};
