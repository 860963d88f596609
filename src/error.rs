//! Error types for the printer driver.
//!
//! Every failure the transport, discovery and printer layers can produce is
//! a variant of [`CatPrintError`]. [`CatPrintError::kind`] groups them into
//! the coarse categories callers branch on.

use std::{io, time::Duration};

use thiserror::Error;

use crate::{bluetooth::transport::TransportState, printer::protocol::ProtocolError};

/// Main error type for the printer driver.
#[derive(Error, Debug)]
pub enum CatPrintError {
   #[error("Invalid RFCOMM channel {0} (must be 1-30)")]
   InvalidChannel(u8),

   #[error("Invalid Bluetooth address: {0:?}")]
   InvalidAddress(String),

   #[error("Transport is not idle (state: {0})")]
   AlreadyConnected(TransportState),

   #[error("Transport not connected")]
   NotConnected,

   #[error("Connection failed: {0}")]
   ConnectFailed(#[source] io::Error),

   #[error("Connection timed out after {0:?}")]
   Timeout(Duration),

   #[error("I/O error: {0}")]
   Io(#[from] io::Error),

   #[error("Protocol error: {0}")]
   Protocol(#[from] ProtocolError),

   #[error("Bluetooth radio unavailable: {0}")]
   RadioUnavailable(String),

   #[error("Device enumeration failed: {0}")]
   EnumerationFailed(String),

   #[error("No Bluetooth adapter available")]
   NoAdapter,

   #[error("Device not found: {0}")]
   DeviceNotFound(String),

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),

   #[error("JSON serialization error: {0}")]
   Json(#[from] serde_json::Error),

   #[error("Buffer pointer is null")]
   NullBuffer,

   #[error("Declared length {length} exceeds buffer capacity {capacity}")]
   BufferOverrun { length: usize, capacity: usize },
}

/// Coarse failure category of a [`CatPrintError`].
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
   /// Bad input detected before any I/O. Never worth retrying.
   Configuration = 1,
   /// Could not establish the stream. Retry with a fresh transport.
   Connection = 2,
   /// The established stream failed or was closed.
   Io = 3,
   /// The printer conversation went wrong.
   Protocol = 4,
   /// Radio or paired-device discovery failed.
   Enumeration = 5,
   /// The host handed over an unusable buffer.
   Host = 6,
}

impl ErrorKind {
   /// Negative status code reported across the C boundary.
   pub const fn status_code(self) -> i32 {
      -(self as i32)
   }
}

impl CatPrintError {
   pub const fn kind(&self) -> ErrorKind {
      match self {
         Self::InvalidChannel(_)
         | Self::InvalidAddress(_)
         | Self::ConfigDirNotFound
         | Self::TomlParse(_)
         | Self::TomlSerialize(_)
         | Self::Json(_) => ErrorKind::Configuration,
         Self::ConnectFailed(_) | Self::Timeout(_) => ErrorKind::Connection,
         Self::AlreadyConnected(_) | Self::NotConnected | Self::Io(_) => ErrorKind::Io,
         Self::Protocol(_) => ErrorKind::Protocol,
         Self::RadioUnavailable(_)
         | Self::EnumerationFailed(_)
         | Self::NoAdapter
         | Self::DeviceNotFound(_) => ErrorKind::Enumeration,
         Self::NullBuffer | Self::BufferOverrun { .. } => ErrorKind::Host,
      }
   }

   /// Whether building a new transport and trying again can help.
   pub const fn is_retryable(&self) -> bool {
      matches!(self.kind(), ErrorKind::Connection)
   }
}

/// Convenience type alias for Results with `CatPrintError`.
pub type Result<T> = std::result::Result<T, CatPrintError>;
