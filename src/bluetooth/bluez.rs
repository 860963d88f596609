//! BlueZ-backed providers.
//!
//! These talk to `bluetoothd` over D-Bus for discovery and open RFCOMM
//! sockets through the kernel for transports.

use std::io;

use bluer::{
   Address, Session,
   rfcomm::{SocketAddr, Stream},
};
use futures::FutureExt;
use log::{debug, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

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

impl From<Address> for MacAddress {
   fn from(address: Address) -> Self {
      Self::new(address.0)
   }
}

impl From<MacAddress> for Address {
   fn from(address: MacAddress) -> Self {
      Self::new(address.octets())
   }
}

/// Opens kernel RFCOMM streams.
#[derive(Debug, Clone, Copy, Default)]
pub struct BluezConnector;

impl Connector for BluezConnector {
   type Socket = Stream;

   async fn connect(&self, address: MacAddress, channel: Channel) -> io::Result<Stream> {
      Stream::connect(SocketAddr::new(address.into(), channel.get())).await
   }
}

impl RawSocket for Stream {
   async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
      self.write(buf).await
   }

   async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
      self.read(buf).await
   }

   fn readable(&self) -> io::Result<bool> {
      let mut probe = [0u8; 1];
      match self.peek(&mut probe).now_or_never() {
         Some(Ok(n)) => Ok(n > 0),
         Some(Err(e)) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
         Some(Err(e)) => Err(e),
         None => Ok(false),
      }
   }
}

/// A radio managed by `bluetoothd`.
#[derive(Clone)]
pub struct BluezAdapter {
   adapter: bluer::Adapter,
   events: Option<EventSender>,
}

impl BluezAdapter {
   pub const fn new(adapter: bluer::Adapter) -> Self {
      Self {
         adapter,
         events: None,
      }
   }

   /// Attaches `events` to every device this adapter hands out.
   pub fn with_events(mut self, events: EventSender) -> Self {
      self.events = Some(events);
      self
   }

   pub fn name(&self) -> &str {
      self.adapter.name()
   }
}

impl Adapter for BluezAdapter {
   type Device = RemoteDevice<BluezConnector>;

   async fn info(&self) -> Result<AdapterInfo> {
      let unavailable = |e: bluer::Error| {
         CatPrintError::RadioUnavailable(format!("{}: {e}", self.adapter.name()))
      };
      let address = self.adapter.address().await.map_err(unavailable)?;
      let alias = self.adapter.alias().await.map_err(unavailable)?;
      Ok(AdapterInfo::new(address.into(), alias))
   }

   async fn paired_devices(&self) -> Result<Vec<Self::Device>> {
      let failed = |e: bluer::Error| {
         CatPrintError::EnumerationFailed(format!("{}: {e}", self.adapter.name()))
      };

      let mut devices = Vec::new();
      for addr in self.adapter.device_addresses().await.map_err(failed)? {
         let device = self.adapter.device(addr).map_err(failed)?;
         if !device.is_paired().await.unwrap_or(false) {
            continue;
         }

         let name = match device.name().await.ok().flatten() {
            Some(name) => name,
            None => device.alias().await.unwrap_or_else(|_| addr.to_string()),
         };
         debug!("{}: paired with {name} ({addr})", self.adapter.name());

         devices.push(self.device(DeviceInfo::new(addr.into(), name)));
      }
      Ok(devices)
   }

   fn device(&self, info: DeviceInfo) -> Self::Device {
      let mut device = RemoteDevice::new(info, BluezConnector);
      device.set_events(self.events.clone());
      device
   }
}

/// Discovers radios through a `bluetoothd` session.
pub struct BluezBackend {
   session: Session,
   events: Option<EventSender>,
}

impl BluezBackend {
   pub async fn new() -> Result<Self> {
      let session = Session::new()
         .await
         .map_err(|e| CatPrintError::RadioUnavailable(format!("bluetoothd: {e}")))?;
      Ok(Self {
         session,
         events: None,
      })
   }

   pub fn with_events(mut self, events: EventSender) -> Self {
      self.events = Some(events);
      self
   }
}

impl RadioBackend for BluezBackend {
   type Adapter = BluezAdapter;

   async fn adapters(&self) -> Result<Vec<BluezAdapter>> {
      let names = self
         .session
         .adapter_names()
         .await
         .map_err(|e| CatPrintError::EnumerationFailed(format!("adapter names: {e}")))?;

      let mut adapters = Vec::with_capacity(names.len());
      for name in names {
         let adapter = match self.session.adapter(&name) {
            Ok(adapter) => adapter,
            Err(e) => {
               warn!("Skipping adapter {name}: {e}");
               continue;
            },
         };

         // Paired-device queries and connects need the radio up.
         if let Ok(powered) = adapter.is_powered().await
            && !powered
         {
            match adapter.set_powered(true).await {
               Ok(()) => info!("Powered on adapter: {name}"),
               Err(e) => warn!("Failed to power on adapter {name}: {e}"),
            }
         }

         let mut adapter = BluezAdapter::new(adapter);
         if let Some(events) = &self.events {
            adapter = adapter.with_events(events.clone());
         }
         adapters.push(adapter);
      }
      Ok(adapters)
   }
}
