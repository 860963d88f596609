//! In-memory providers for every layer.
//!
//! A [`LoopbackPeer`] plays the remote side of one simulated link: it
//! records what was written, answers scripted triggers, can throttle
//! transfers, refuse or stall connects, and counts socket releases.
//! [`MemoryAdapter`] and [`MemoryBackend`] build the discovery layers on
//! top of it.

use std::{collections::VecDeque, io, sync::Arc};

use parking_lot::Mutex;

use crate::{
   bluetooth::{
      adapter::{Adapter, AdapterInfo, RadioBackend},
      address::MacAddress,
      device::{DeviceInfo, RemoteDevice},
      transport::{Channel, Connector, RawSocket},
   },
   error::{CatPrintError, Result},
   event::EventSender,
};

/// Observable traffic on a loopback link, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
   Connected { address: MacAddress, channel: u8 },
   Sent(Vec<u8>),
   Received(Vec<u8>),
   Released,
}

#[derive(Debug, Default)]
struct PeerState {
   inbound: VecDeque<u8>,
   outbound: Vec<u8>,
   replies: VecDeque<(Vec<u8>, Vec<u8>)>,
   log: Vec<WireEvent>,
   max_send_chunk: Option<usize>,
   max_recv_chunk: Option<usize>,
   refuse: bool,
   stall: bool,
   broken: bool,
   connects: usize,
   send_calls: usize,
   releases: usize,
}

impl PeerState {
   /// Queues the reply of every leading trigger the outbound stream now
   /// ends with.
   fn fire_replies(&mut self) {
      while self
         .replies
         .front()
         .is_some_and(|(trigger, _)| self.outbound.ends_with(trigger))
      {
         if let Some((_, reply)) = self.replies.pop_front() {
            self.inbound.extend(reply);
         }
      }
   }
}

/// Remote end of a simulated link. Clones share the same link.
#[derive(Debug, Clone, Default)]
pub struct LoopbackPeer(Arc<Mutex<PeerState>>);

impl LoopbackPeer {
   pub fn new() -> Self {
      Self::default()
   }

   pub fn connector(&self) -> LoopbackConnector {
      LoopbackConnector(self.clone())
   }

   /// Makes `bytes` readable right away.
   pub fn queue_inbound(&self, bytes: &[u8]) {
      self.0.lock().inbound.extend(bytes);
   }

   /// Makes `reply` readable once everything written so far ends with
   /// `trigger`. Replies fire in registration order.
   pub fn respond_to(&self, trigger: &[u8], reply: &[u8]) {
      self
         .0
         .lock()
         .replies
         .push_back((trigger.to_vec(), reply.to_vec()));
   }

   /// Caps how many bytes one `send` call accepts.
   pub fn set_max_send_chunk(&self, limit: Option<usize>) {
      self.0.lock().max_send_chunk = limit;
   }

   /// Caps how many bytes one `recv` call returns.
   pub fn set_max_recv_chunk(&self, limit: Option<usize>) {
      self.0.lock().max_recv_chunk = limit;
   }

   pub fn refuse_connections(&self, refuse: bool) {
      self.0.lock().refuse = refuse;
   }

   /// Connects never complete while set.
   pub fn stall_connections(&self, stall: bool) {
      self.0.lock().stall = stall;
   }

   /// Fails every later transfer on open sockets.
   pub fn break_stream(&self) {
      self.0.lock().broken = true;
   }

   pub fn written(&self) -> Vec<u8> {
      self.0.lock().outbound.clone()
   }

   pub fn wire_log(&self) -> Vec<WireEvent> {
      self.0.lock().log.clone()
   }

   pub fn connects(&self) -> usize {
      self.0.lock().connects
   }

   pub fn send_calls(&self) -> usize {
      self.0.lock().send_calls
   }

   pub fn releases(&self) -> usize {
      self.0.lock().releases
   }
}

/// Opens [`LoopbackSocket`]s to its peer.
#[derive(Debug, Clone)]
pub struct LoopbackConnector(LoopbackPeer);

impl Connector for LoopbackConnector {
   type Socket = LoopbackSocket;

   async fn connect(&self, address: MacAddress, channel: Channel) -> io::Result<LoopbackSocket> {
      let (refuse, stall) = {
         let state = self.0.0.lock();
         (state.refuse, state.stall)
      };
      if stall {
         futures::future::pending::<()>().await;
      }
      if refuse {
         return Err(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
         ));
      }

      let mut state = self.0.0.lock();
      state.connects += 1;
      state.log.push(WireEvent::Connected {
         address,
         channel: channel.get(),
      });
      Ok(LoopbackSocket {
         peer: self.0.clone(),
      })
   }
}

/// Local end of a loopback link.
#[derive(Debug)]
pub struct LoopbackSocket {
   peer: LoopbackPeer,
}

fn broken_pipe() -> io::Error {
   io::Error::new(io::ErrorKind::BrokenPipe, "loopback stream broken")
}

impl RawSocket for LoopbackSocket {
   async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
      let mut guard = self.peer.0.lock();
      let state = &mut *guard;
      if state.broken {
         return Err(broken_pipe());
      }
      state.send_calls += 1;

      let n = state.max_send_chunk.map_or(buf.len(), |max| buf.len().min(max));
      state.outbound.extend_from_slice(&buf[..n]);
      state.log.push(WireEvent::Sent(buf[..n].to_vec()));
      state.fire_replies();
      Ok(n)
   }

   async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      let mut guard = self.peer.0.lock();
      let state = &mut *guard;
      if state.broken {
         return Err(broken_pipe());
      }

      let limit = state.max_recv_chunk.unwrap_or(usize::MAX);
      let n = buf.len().min(state.inbound.len()).min(limit);
      for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
         *slot = byte;
      }
      if n > 0 {
         state.log.push(WireEvent::Received(buf[..n].to_vec()));
      }
      Ok(n)
   }

   fn readable(&self) -> io::Result<bool> {
      let state = self.peer.0.lock();
      if state.broken {
         return Err(broken_pipe());
      }
      Ok(!state.inbound.is_empty())
   }
}

impl Drop for LoopbackSocket {
   fn drop(&mut self) {
      let mut state = self.peer.0.lock();
      state.releases += 1;
      state.log.push(WireEvent::Released);
   }
}

/// An adapter whose paired devices all reach the same loopback peer.
#[derive(Clone)]
pub struct MemoryAdapter {
   info: AdapterInfo,
   devices: Vec<DeviceInfo>,
   peer: LoopbackPeer,
   radio_present: bool,
   enumeration_fails: bool,
   events: Option<EventSender>,
}

impl MemoryAdapter {
   pub fn new(info: AdapterInfo, peer: LoopbackPeer) -> Self {
      Self {
         info,
         devices: Vec::new(),
         peer,
         radio_present: true,
         enumeration_fails: false,
         events: None,
      }
   }

   pub fn with_device(mut self, device: DeviceInfo) -> Self {
      self.devices.push(device);
      self
   }

   pub fn with_events(mut self, events: EventSender) -> Self {
      self.events = Some(events);
      self
   }

   /// Simulates the radio disappearing.
   pub fn without_radio(mut self) -> Self {
      self.radio_present = false;
      self
   }

   /// Simulates the paired-device query failing.
   pub fn failing_enumeration(mut self) -> Self {
      self.enumeration_fails = true;
      self
   }
}

impl Adapter for MemoryAdapter {
   type Device = RemoteDevice<LoopbackConnector>;

   async fn info(&self) -> Result<AdapterInfo> {
      if !self.radio_present {
         return Err(CatPrintError::RadioUnavailable(format!(
            "{} removed",
            self.info.name
         )));
      }
      Ok(self.info.clone())
   }

   async fn paired_devices(&self) -> Result<Vec<Self::Device>> {
      if self.enumeration_fails {
         return Err(CatPrintError::EnumerationFailed(format!(
            "{} refused the device query",
            self.info.name
         )));
      }
      Ok(self
         .devices
         .iter()
         .map(|info| self.device(info.clone()))
         .collect())
   }

   fn device(&self, info: DeviceInfo) -> Self::Device {
      let mut device = RemoteDevice::new(info, self.peer.connector());
      device.set_events(self.events.clone());
      device
   }
}

/// A fixed set of in-memory radios.
#[derive(Clone, Default)]
pub struct MemoryBackend {
   adapters: Vec<MemoryAdapter>,
   fails: bool,
}

impl MemoryBackend {
   pub fn new(adapters: Vec<MemoryAdapter>) -> Self {
      Self {
         adapters,
         fails: false,
      }
   }

   /// A backend whose radio query itself fails.
   pub fn failing() -> Self {
      Self {
         adapters: Vec::new(),
         fails: true,
      }
   }
}

impl RadioBackend for MemoryBackend {
   type Adapter = MemoryAdapter;

   async fn adapters(&self) -> Result<Vec<MemoryAdapter>> {
      if self.fails {
         return Err(CatPrintError::EnumerationFailed(
            "radio query failed".to_owned(),
         ));
      }
      Ok(self.adapters.clone())
   }
}
