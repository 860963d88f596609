//! RFCOMM stream transport.
//!
//! [`RfcommChannel`] owns one raw socket and enforces the transport
//! lifecycle on top of it: bounded connects, partial transfers, peer
//! shutdown detection and release-once close.

use log::{debug, warn};
use tokio::time;

use crate::{
   bluetooth::{
      address::MacAddress,
      transport::{Channel, ConnectPolicy, Connector, RawSocket, Transport, TransportState},
   },
   error::{CatPrintError, Result},
   event::{EventSender, Packet, TransportEvent},
};

/// Transport bound to one remote address and channel.
///
/// The socket is present exactly while the state is `Connected`.
pub struct RfcommChannel<C: Connector> {
   connector: C,
   address: MacAddress,
   channel: Channel,
   state: TransportState,
   socket: Option<C::Socket>,
   events: Option<EventSender>,
}

impl<C: Connector> RfcommChannel<C> {
   pub const fn new(connector: C, address: MacAddress, channel: Channel) -> Self {
      Self {
         connector,
         address,
         channel,
         state: TransportState::Idle,
         socket: None,
         events: None,
      }
   }

   pub fn with_events(mut self, events: EventSender) -> Self {
      self.events = Some(events);
      self
   }

   pub const fn address(&self) -> MacAddress {
      self.address
   }

   pub const fn channel(&self) -> Channel {
      self.channel
   }

   fn emit(&self, event: TransportEvent) {
      if let Some(events) = &self.events {
         events.emit(self.address, event);
      }
   }

   /// Drops the socket after an I/O failure.
   fn fail(&mut self, error: &std::io::Error) {
      warn!("{}:{}: {error}", self.address, self.channel);
      self.emit(TransportEvent::Error(error.to_string().into()));
      self.close();
   }
}

impl<C: Connector> Transport for RfcommChannel<C> {
   fn state(&self) -> TransportState {
      self.state
   }

   async fn connect(&mut self, policy: ConnectPolicy) -> Result<()> {
      if self.state != TransportState::Idle {
         return Err(CatPrintError::AlreadyConnected(self.state));
      }

      debug!("Connecting to {}:{} ({policy})", self.address, self.channel);
      self.state = TransportState::Connecting;

      let attempt = self.connector.connect(self.address, self.channel);
      let outcome = match policy.limit() {
         None => attempt.await.map_err(CatPrintError::ConnectFailed),
         Some(limit) => match time::timeout(limit, attempt).await {
            Ok(result) => result.map_err(CatPrintError::ConnectFailed),
            Err(_) => Err(CatPrintError::Timeout(limit)),
         },
      };

      match outcome {
         Ok(socket) => {
            self.socket = Some(socket);
            self.state = TransportState::Connected;
            debug!("Connected to {}:{}", self.address, self.channel);
            self.emit(TransportEvent::Connected {
               channel: self.channel,
            });
            Ok(())
         },
         Err(e) => {
            warn!("Connection to {}:{} failed: {e}", self.address, self.channel);
            self.state = TransportState::Idle;
            self.emit(TransportEvent::Error(e.to_string().into()));
            Err(e)
         },
      }
   }

   async fn send(&mut self, bytes: &[u8]) -> Result<usize> {
      let Some(socket) = self.socket.as_mut() else {
         return Err(CatPrintError::NotConnected);
      };

      match socket.send(bytes).await {
         Ok(n) => {
            // Never report more than was offered.
            let n = n.min(bytes.len());
            debug!("→ {}: {}", self.address, hex::encode(&bytes[..n]));
            Ok(n)
         },
         Err(e) => {
            self.fail(&e);
            Err(CatPrintError::Io(e))
         },
      }
   }

   async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
      let Some(socket) = self.socket.as_mut() else {
         return Err(CatPrintError::NotConnected);
      };
      if buf.is_empty() {
         return Ok(0);
      }

      match socket.recv(buf).await {
         Ok(0) => {
            debug!("{}: peer closed the stream", self.address);
            self.emit(TransportEvent::Disconnected);
            self.close();
            Ok(0)
         },
         Ok(n) => {
            let received = &buf[..n];
            debug!("← {}: {}", self.address, hex::encode(received));
            self.emit(TransportEvent::DataReceived(Packet::from_slice(received)));
            Ok(n)
         },
         Err(e) => {
            self.fail(&e);
            Err(CatPrintError::Io(e))
         },
      }
   }

   fn available(&self) -> bool {
      self
         .socket
         .as_ref()
         .is_some_and(|socket| socket.readable().unwrap_or(false))
   }

   fn close(&mut self) {
      if let Some(socket) = self.socket.take() {
         drop(socket);
         debug!("Closed {}:{}", self.address, self.channel);
         self.emit(TransportEvent::Closed);
      }
      self.state = TransportState::Closed;
   }
}

impl<C: Connector> Drop for RfcommChannel<C> {
   fn drop(&mut self) {
      self.close();
   }
}

#[cfg(test)]
mod tests {
   use std::time::Duration;

   use super::*;
   use crate::{
      bluetooth::loopback::{LoopbackConnector, LoopbackPeer, WireEvent},
      event::EventLog,
   };

   const ADDR: MacAddress = MacAddress::new([0x24, 0x00, 0x28, 0x00, 0x1e, 0x5b]);

   fn channel_to(peer: &LoopbackPeer) -> RfcommChannel<LoopbackConnector> {
      RfcommChannel::new(peer.connector(), ADDR, Channel::new(2).unwrap())
   }

   #[tokio::test]
   async fn test_connect_then_transfer() {
      let peer = LoopbackPeer::new();
      peer.queue_inbound(&[1, 2, 3]);
      let mut transport = channel_to(&peer);
      assert_eq!(transport.state(), TransportState::Idle);

      transport.connect(ConnectPolicy::Unbounded).await.unwrap();
      assert_eq!(transport.state(), TransportState::Connected);
      assert!(transport.available());

      assert_eq!(transport.send(&[0xaa, 0xbb]).await.unwrap(), 2);
      let mut buf = [0u8; 8];
      assert_eq!(transport.receive(&mut buf).await.unwrap(), 3);
      assert_eq!(&buf[..3], &[1, 2, 3]);
      assert!(!transport.available());
      assert_eq!(peer.written(), vec![0xaa, 0xbb]);
   }

   #[tokio::test]
   async fn test_connect_twice_is_rejected() {
      let peer = LoopbackPeer::new();
      let mut transport = channel_to(&peer);
      transport.connect(ConnectPolicy::Default).await.unwrap();

      let err = transport.connect(ConnectPolicy::Default).await.unwrap_err();
      assert!(matches!(
         err,
         CatPrintError::AlreadyConnected(TransportState::Connected)
      ));
      assert_eq!(peer.connects(), 1);
   }

   #[tokio::test]
   async fn test_refused_connect_returns_to_idle() {
      let peer = LoopbackPeer::new();
      peer.refuse_connections(true);
      let mut transport = channel_to(&peer);

      let err = transport.connect(ConnectPolicy::Unbounded).await.unwrap_err();
      assert!(matches!(err, CatPrintError::ConnectFailed(_)));
      assert_eq!(transport.state(), TransportState::Idle);

      // Idle again, so a retry on the same transport is allowed.
      peer.refuse_connections(false);
      transport.connect(ConnectPolicy::Unbounded).await.unwrap();
      assert_eq!(transport.state(), TransportState::Connected);
   }

   #[tokio::test(start_paused = true)]
   async fn test_default_policy_times_out_after_five_seconds() {
      let peer = LoopbackPeer::new();
      peer.stall_connections(true);
      let mut transport = channel_to(&peer);

      let started = time::Instant::now();
      let err = transport.connect(ConnectPolicy::Default).await.unwrap_err();
      assert!(matches!(err, CatPrintError::Timeout(d) if d == Duration::from_secs(5)));
      assert!(started.elapsed() >= Duration::from_secs(5));
      assert_eq!(transport.state(), TransportState::Idle);
   }

   #[tokio::test(start_paused = true)]
   async fn test_long_policy_times_out_after_thirty_seconds() {
      let peer = LoopbackPeer::new();
      peer.stall_connections(true);
      let mut transport = channel_to(&peer);

      let started = time::Instant::now();
      let err = transport.connect(ConnectPolicy::Long).await.unwrap_err();
      assert!(matches!(err, CatPrintError::Timeout(d) if d == Duration::from_secs(30)));
      assert!(started.elapsed() >= Duration::from_secs(30));
   }

   #[tokio::test]
   async fn test_io_before_connect_is_rejected() {
      let peer = LoopbackPeer::new();
      let mut transport = channel_to(&peer);

      assert!(matches!(
         transport.send(&[1]).await,
         Err(CatPrintError::NotConnected)
      ));
      let mut buf = [0u8; 1];
      assert!(matches!(
         transport.receive(&mut buf).await,
         Err(CatPrintError::NotConnected)
      ));
      assert!(!transport.available());
   }

   #[tokio::test]
   async fn test_partial_send_reports_accepted_count() {
      let peer = LoopbackPeer::new();
      peer.set_max_send_chunk(Some(3));
      let mut transport = channel_to(&peer);
      transport.connect(ConnectPolicy::Unbounded).await.unwrap();

      assert_eq!(transport.send(&[1, 2, 3, 4, 5]).await.unwrap(), 3);
      assert_eq!(peer.written(), vec![1, 2, 3]);
   }

   /// Claims every send accepted twice the bytes it was given.
   #[derive(Clone)]
   struct OverreportingConnector;

   struct OverreportingSocket;

   impl RawSocket for OverreportingSocket {
      async fn send(&mut self, buf: &[u8]) -> std::io::Result<usize> {
         Ok(buf.len() * 2)
      }

      async fn recv(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
         Ok(0)
      }

      fn readable(&self) -> std::io::Result<bool> {
         Ok(false)
      }
   }

   impl Connector for OverreportingConnector {
      type Socket = OverreportingSocket;

      async fn connect(
         &self,
         _address: MacAddress,
         _channel: Channel,
      ) -> std::io::Result<OverreportingSocket> {
         Ok(OverreportingSocket)
      }
   }

   #[tokio::test]
   async fn test_overreported_send_is_clamped() {
      let mut transport =
         RfcommChannel::new(OverreportingConnector, ADDR, Channel::new(2).unwrap());
      transport.connect(ConnectPolicy::Unbounded).await.unwrap();

      assert_eq!(transport.send(&[1, 2, 3]).await.unwrap(), 3);
      assert_eq!(transport.state(), TransportState::Connected);
   }

   #[tokio::test]
   async fn test_zero_read_closes_transport() {
      let peer = LoopbackPeer::new();
      let mut transport = channel_to(&peer);
      transport.connect(ConnectPolicy::Unbounded).await.unwrap();

      let mut buf = [0u8; 4];
      assert_eq!(transport.receive(&mut buf).await.unwrap(), 0);
      assert_eq!(transport.state(), TransportState::Closed);
      assert_eq!(peer.releases(), 1);
      assert!(matches!(
         transport.send(&[1]).await,
         Err(CatPrintError::NotConnected)
      ));
   }

   #[tokio::test]
   async fn test_empty_receive_buffer_keeps_stream_open() {
      let peer = LoopbackPeer::new();
      let mut transport = channel_to(&peer);
      transport.connect(ConnectPolicy::Unbounded).await.unwrap();

      assert_eq!(transport.receive(&mut []).await.unwrap(), 0);
      assert_eq!(transport.state(), TransportState::Connected);
   }

   #[tokio::test]
   async fn test_io_error_forces_closed() {
      let peer = LoopbackPeer::new();
      let mut transport = channel_to(&peer);
      transport.connect(ConnectPolicy::Unbounded).await.unwrap();
      peer.break_stream();

      assert!(matches!(
         transport.send(&[1]).await,
         Err(CatPrintError::Io(_))
      ));
      assert_eq!(transport.state(), TransportState::Closed);
      assert_eq!(peer.releases(), 1);
   }

   #[tokio::test]
   async fn test_close_releases_once() {
      let peer = LoopbackPeer::new();
      let mut transport = channel_to(&peer);
      transport.connect(ConnectPolicy::Unbounded).await.unwrap();

      transport.close();
      transport.close();
      drop(transport);

      assert_eq!(peer.releases(), 1);
      let released = peer
         .wire_log()
         .into_iter()
         .filter(|e| matches!(e, WireEvent::Released))
         .count();
      assert_eq!(released, 1);
   }

   #[tokio::test]
   async fn test_closed_is_terminal() {
      let peer = LoopbackPeer::new();
      let mut transport = channel_to(&peer);
      transport.close();
      assert_eq!(transport.state(), TransportState::Closed);
      assert_eq!(peer.releases(), 0);

      let err = transport.connect(ConnectPolicy::Unbounded).await.unwrap_err();
      assert!(matches!(
         err,
         CatPrintError::AlreadyConnected(TransportState::Closed)
      ));
      assert_eq!(peer.connects(), 0);
   }

   #[tokio::test]
   async fn test_events_follow_lifecycle() {
      let peer = LoopbackPeer::new();
      peer.queue_inbound(&[7]);
      let log = EventLog::new();
      let mut transport = channel_to(&peer).with_events(log.clone());

      transport.connect(ConnectPolicy::Unbounded).await.unwrap();
      let mut buf = [0u8; 2];
      transport.receive(&mut buf).await.unwrap();
      transport.receive(&mut buf).await.unwrap();

      let events: Vec<_> = log.drain().into_iter().map(|(_, e)| e).collect();
      assert_eq!(
         events,
         vec![
            TransportEvent::Connected {
               channel: Channel::new(2).unwrap()
            },
            TransportEvent::DataReceived(Packet::from_slice(&[7])),
            TransportEvent::Disconnected,
            TransportEvent::Closed,
         ]
      );
   }
}
