//! Bluetooth RFCOMM driver for thermal cat printers.
//!
//! Discovery runs `BluetoothManager -> Adapter -> Device`, a device opens
//! an RFCOMM [`Transport`](bluetooth::Transport), and a
//! [`PrintJob`](printer::PrintJob) drives the printer conversation over it.
//! Every layer is a trait with a BlueZ provider and an in-memory one.

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod event;
pub mod ffi;
pub mod printer;

pub use error::{CatPrintError, ErrorKind, Result};
