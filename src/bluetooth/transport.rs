//! Transport contract for a connection-oriented RFCOMM byte stream.
//!
//! [`Transport`] is what the printer protocol talks to. [`Connector`] and
//! [`RawSocket`] are the seam underneath it: the OS-backed provider lives in
//! [`super::bluez`], the in-memory one in [`super::loopback`].

use std::{io, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
   bluetooth::address::MacAddress,
   error::{CatPrintError, Result},
};

/// An RFCOMM channel number, always within `1..=30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
   pub const MIN: u8 = 1;
   pub const MAX: u8 = 30;

   pub fn new(channel: u8) -> Result<Self> {
      if (Self::MIN..=Self::MAX).contains(&channel) {
         Ok(Self(channel))
      } else {
         Err(CatPrintError::InvalidChannel(channel))
      }
   }

   pub const fn get(self) -> u8 {
      self.0
   }
}

impl TryFrom<u8> for Channel {
   type Error = CatPrintError;

   fn try_from(value: u8) -> Result<Self> {
      Self::new(value)
   }
}

impl std::fmt::Display for Channel {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      self.0.fmt(f)
   }
}

/// How long `connect` may wait before giving up.
///
/// The bound applies to connection establishment only, never to later
/// sends or receives.
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Serialize,
   Deserialize,
   strum::Display,
   strum::EnumString,
   strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectPolicy {
   /// Wait for the OS connect to complete or fail.
   #[serde(alias = "none")]
   #[strum(to_string = "unbounded", serialize = "none")]
   Unbounded,
   /// Give up after [`ConnectPolicy::DEFAULT_TIMEOUT`].
   #[strum(serialize = "default")]
   Default,
   /// Give up after [`ConnectPolicy::LONG_TIMEOUT`].
   #[strum(serialize = "long")]
   Long,
}

impl ConnectPolicy {
   pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
   pub const LONG_TIMEOUT: Duration = Duration::from_secs(30);

   /// Upper bound on the connect wait, `None` when unbounded.
   pub const fn limit(self) -> Option<Duration> {
      match self {
         Self::Unbounded => None,
         Self::Default => Some(Self::DEFAULT_TIMEOUT),
         Self::Long => Some(Self::LONG_TIMEOUT),
      }
   }
}

/// Lifecycle of a transport.
///
/// `Idle -> Connecting -> Connected -> Closed`, with a failed connect
/// falling back to `Idle`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransportState {
   Idle,
   Connecting,
   Connected,
   Closed,
}

/// A byte stream to one remote address and channel.
///
/// Not safe for concurrent use: every method takes the transport by
/// exclusive reference or is a non-blocking query.
#[allow(async_fn_in_trait)]
pub trait Transport {
   fn state(&self) -> TransportState;

   /// Establishes the stream. Only valid from `Idle`.
   async fn connect(&mut self, policy: ConnectPolicy) -> Result<()>;

   /// Sends a prefix of `bytes`, returning how many were accepted.
   async fn send(&mut self, bytes: &[u8]) -> Result<usize>;

   /// Reads up to `buf.len()` bytes. `Ok(0)` for a non-empty buffer means
   /// the peer closed the stream and the transport is now `Closed`.
   async fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;

   /// Whether a byte can be read without blocking. `false` when not
   /// connected.
   fn available(&self) -> bool;

   /// Releases the stream. Idempotent.
   fn close(&mut self);
}

/// An open OS-level stream socket. Dropping it releases the handle.
#[allow(async_fn_in_trait)]
pub trait RawSocket {
   async fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

   async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

   /// Non-blocking readability check.
   fn readable(&self) -> io::Result<bool>;
}

/// Opens raw sockets keyed by `(address, channel)`.
#[allow(async_fn_in_trait)]
pub trait Connector {
   type Socket: RawSocket;

   async fn connect(&self, address: MacAddress, channel: Channel) -> io::Result<Self::Socket>;
}
