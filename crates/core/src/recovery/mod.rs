//! Recovery module - out-of-band return of rate-limited keys to service.

mod recovery_sweeper;

pub use recovery_sweeper::{RecoverySweeper, SweepReport};
