//! Cat printer command protocol.
//!
//! A print is a fixed conversation: reset, read the 38-byte status block,
//! read the 21-byte serial block, then stream the raster between the
//! start and end markers.

use thiserror::Error;

use crate::bluetooth::{address::MacAddress, transport::ConnectPolicy};

/// Resets the printer.
pub const CMD_INIT: &[u8] = &[0x1b, 0x40];
/// Requests the status block.
pub const CMD_QUERY_STATUS: &[u8] = &[0x1e, 0x47, 0x03];
/// Requests the serial block.
pub const CMD_QUERY_SERIAL: &[u8] = &[0x1d, 0x67, 0x39];
/// Precedes the raster payload.
pub const CMD_START_PRINT: &[u8] = &[0x1d, 0x49, 0xf0, 0x19];
/// Feeds the paper out after the raster.
pub const CMD_END_PRINT: &[u8] = &[0x0a, 0x0a, 0x0a, 0x0a];

pub const STATUS_LEN: usize = 38;
pub const SERIAL_LEN: usize = 21;

pub const DEFAULT_CHANNEL: u8 = 2;
pub const DEFAULT_POLICY: ConnectPolicy = ConnectPolicy::Unbounded;
pub const DEFAULT_PRINTER_ADDRESS: MacAddress =
   MacAddress::new([0x24, 0x00, 0x28, 0x00, 0x1e, 0x5b]);
pub const DEFAULT_PRINTER_NAME: &str = "Cat Printer";

/// Step of a print job. Steps only ever advance, in declaration order.
#[derive(
   Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
   Init,
   StatusQuery,
   SerialQuery,
   Printing,
   Terminated,
}

/// The printer conversation went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
   #[error("Short {what} read: expected {expected} bytes, got {received}")]
   ShortRead {
      what: &'static str,
      expected: usize,
      received: usize,
   },

   #[error("Incomplete {what} send: {sent} of {total} bytes")]
   IncompleteSend {
      what: &'static str,
      sent: usize,
      total: usize,
   },

   #[error("Print job already ran")]
   AlreadyRun,
}
