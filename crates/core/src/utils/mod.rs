pub mod clock;
pub mod time_utils;

pub use clock::{Clock, ManualClock, SystemClock};
