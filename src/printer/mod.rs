//! Thermal cat printer driver.
//!
//! [`PrintJob`] runs the command conversation over any
//! [`Transport`](crate::bluetooth::Transport).

pub mod job;
pub mod protocol;
pub mod recognition;
pub mod target;

pub use job::{PrintJob, PrintReport, receive_exact, send_all};
pub use protocol::{JobState, ProtocolError};
pub use target::PrintTarget;
