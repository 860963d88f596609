//! Local Bluetooth adapters.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
   bluetooth::{
      address::MacAddress,
      device::{Device, DeviceInfo},
   },
   error::Result,
};

/// Identity of a local radio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
   pub address: MacAddress,
   pub name: SmolStr,
}

impl AdapterInfo {
   pub fn new(address: MacAddress, name: impl Into<SmolStr>) -> Self {
      Self {
         address,
         name: name.into(),
      }
   }
}

/// A local radio and the devices paired with it.
#[allow(async_fn_in_trait)]
pub trait Adapter {
   type Device: Device;

   /// Fails with `RadioUnavailable` when the radio is gone.
   async fn info(&self) -> Result<AdapterInfo>;

   /// Snapshot of the currently paired devices. No paired devices is an
   /// empty list, not an error.
   async fn paired_devices(&self) -> Result<Vec<Self::Device>>;

   /// A device to dial directly, paired or not.
   fn device(&self, info: DeviceInfo) -> Self::Device;
}

/// Source of the local radios a manager is built from.
#[allow(async_fn_in_trait)]
pub trait RadioBackend {
   type Adapter: Adapter;

   /// Every radio present. No radio is an empty list, not an error.
   async fn adapters(&self) -> Result<Vec<Self::Adapter>>;
}
