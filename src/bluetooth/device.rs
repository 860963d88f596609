//! Remote paired devices.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
   bluetooth::{
      address::MacAddress,
      rfcomm::RfcommChannel,
      transport::{Channel, ConnectPolicy, Connector, Transport},
   },
   error::Result,
   event::EventSender,
};

/// Identity of a remote device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
   pub address: MacAddress,
   pub name: SmolStr,
}

impl DeviceInfo {
   pub fn new(address: MacAddress, name: impl Into<SmolStr>) -> Self {
      Self {
         address,
         name: name.into(),
      }
   }
}

/// A remote device that can open transports to itself.
#[allow(async_fn_in_trait)]
pub trait Device {
   type Transport: Transport;

   fn info(&self) -> &DeviceInfo;

   /// Validates `channel`, then creates and connects a fresh transport
   /// under `policy`. The caller owns the returned transport.
   async fn create_transport(&self, channel: u8, policy: ConnectPolicy)
   -> Result<Self::Transport>;
}

/// A device reached through a socket [`Connector`].
#[derive(Clone)]
pub struct RemoteDevice<C> {
   info: DeviceInfo,
   connector: C,
   events: Option<EventSender>,
}

impl<C> RemoteDevice<C> {
   pub const fn new(info: DeviceInfo, connector: C) -> Self {
      Self {
         info,
         connector,
         events: None,
      }
   }

   /// Attaches `events` to every transport this device creates.
   pub fn with_events(mut self, events: EventSender) -> Self {
      self.events = Some(events);
      self
   }

   pub(crate) fn set_events(&mut self, events: Option<EventSender>) {
      self.events = events;
   }
}

impl<C: Connector + Clone> Device for RemoteDevice<C> {
   type Transport = RfcommChannel<C>;

   fn info(&self) -> &DeviceInfo {
      &self.info
   }

   async fn create_transport(
      &self,
      channel: u8,
      policy: ConnectPolicy,
   ) -> Result<RfcommChannel<C>> {
      let channel = Channel::new(channel)?;
      let mut transport = RfcommChannel::new(self.connector.clone(), self.info.address, channel);
      if let Some(events) = &self.events {
         transport = transport.with_events(events.clone());
      }
      transport.connect(policy).await?;
      Ok(transport)
   }
}
