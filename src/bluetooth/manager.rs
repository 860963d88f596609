//! Registry of local Bluetooth adapters.
//!
//! The manager snapshots the radios of a [`RadioBackend`] once at
//! initialization and serves lookups until it is shut down. Lookups
//! borrow the manager shared and shutdown borrows it exclusively, so the
//! two can never overlap.

use log::{debug, info};

use crate::{
   bluetooth::{
      adapter::{Adapter, AdapterInfo, RadioBackend},
      address::MacAddress,
   },
   error::Result,
};

/// Process-wide view of the local radios.
///
/// After [`shutdown`](Self::shutdown) every lookup answers as if no radio
/// were present.
pub struct BluetoothManager<A> {
   adapters: Vec<A>,
   shut_down: bool,
}

impl<A: Adapter> BluetoothManager<A> {
   /// Enumerates the radios of `backend`. Finding none is not an error.
   pub async fn init<B>(backend: &B) -> Result<Self>
   where
      B: RadioBackend<Adapter = A>,
   {
      let adapters = backend.adapters().await?;
      info!("Bluetooth manager ready with {} adapter(s)", adapters.len());
      Ok(Self::from_adapters(adapters))
   }

   pub const fn from_adapters(adapters: Vec<A>) -> Self {
      Self {
         adapters,
         shut_down: false,
      }
   }

   /// All registered adapters, in enumeration order.
   pub fn adapters(&self) -> &[A] {
      if self.shut_down { &[] } else { &self.adapters }
   }

   /// Identity snapshot of every registered adapter. No radio is an empty
   /// list, not an error.
   pub async fn list_adapters(&self) -> Result<Vec<AdapterInfo>> {
      let mut infos = Vec::with_capacity(self.adapters().len());
      for adapter in self.adapters() {
         infos.push(adapter.info().await?);
      }
      Ok(infos)
   }

   /// The first registered adapter.
   pub fn default_adapter(&self) -> Option<&A> {
      self.adapters().first()
   }

   /// Finds the adapter whose radio has `address`.
   ///
   /// Fails when a registered radio cannot report its identity.
   pub async fn adapter(&self, address: MacAddress) -> Result<Option<&A>> {
      for adapter in self.adapters() {
         if adapter.info().await?.address == address {
            return Ok(Some(adapter));
         }
      }
      debug!("No adapter with address {address}");
      Ok(None)
   }

   /// Releases the registry. Safe to call more than once.
   pub fn shutdown(&mut self) {
      if self.shut_down {
         return;
      }
      self.shut_down = true;
      self.adapters.clear();
      info!("Bluetooth manager shut down");
   }

   pub const fn is_shut_down(&self) -> bool {
      self.shut_down
   }
}

impl<A> Drop for BluetoothManager<A> {
   fn drop(&mut self) {
      if !self.shut_down {
         debug!("Bluetooth manager dropped without shutdown");
      }
   }
}
