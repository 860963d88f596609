//! Event notifications for transport lifecycle and traffic.
//!
//! A transport with an attached [`EventBus`] reports connection, received
//! data, peer shutdown, local close and failures as they happen.

use std::sync::Arc;

use crossbeam::queue::SegQueue;
use log::{debug, info, warn};
use smallvec::SmallVec;
use smol_str::SmolStr;

use crate::bluetooth::{address::MacAddress, transport::Channel};

pub type Packet = SmallVec<[u8; 32]>;

/// Events emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
   Connected { channel: Channel },
   DataReceived(Packet),
   /// The peer closed the stream.
   Disconnected,
   /// The local side released the stream.
   Closed,
   Error(SmolStr),
}

/// Trait for implementing event emission.
pub trait EventBus: Send + Sync {
   /// Emits an event for the transport bound to `address`.
   fn emit(&self, address: MacAddress, event: TransportEvent);
}

/// Type alias for a thread-safe event sender.
pub type EventSender = Arc<dyn EventBus>;

/// Bus that writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBus;

impl EventBus for LogBus {
   fn emit(&self, address: MacAddress, event: TransportEvent) {
      match event {
         TransportEvent::Connected { channel } => info!("{address}: connected on channel {channel}"),
         TransportEvent::DataReceived(bytes) => {
            debug!("{address}: received {} bytes", bytes.len());
         },
         TransportEvent::Disconnected => info!("{address}: peer closed the stream"),
         TransportEvent::Closed => debug!("{address}: closed"),
         TransportEvent::Error(message) => warn!("{address}: {message}"),
      }
   }
}

/// Bus that keeps every event for later inspection.
#[derive(Debug, Default)]
pub struct EventLog {
   queue: SegQueue<(MacAddress, TransportEvent)>,
}

impl EventLog {
   pub fn new() -> Arc<Self> {
      Arc::new(Self::default())
   }

   /// Removes and returns all events recorded so far, oldest first.
   pub fn drain(&self) -> Vec<(MacAddress, TransportEvent)> {
      let mut events = Vec::with_capacity(self.queue.len());
      while let Some(event) = self.queue.pop() {
         events.push(event);
      }
      events
   }
}

impl EventBus for EventLog {
   fn emit(&self, address: MacAddress, event: TransportEvent) {
      self.queue.push((address, event));
   }
}
