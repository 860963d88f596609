//! Resolving which adapter and device a print goes to, then printing.

use log::info;

use crate::{
   bluetooth::{
      adapter::Adapter,
      address::MacAddress,
      device::{Device, DeviceInfo},
      manager::BluetoothManager,
      transport::ConnectPolicy,
   },
   config::Config,
   error::{CatPrintError, Result},
   printer::{
      job::{PrintJob, PrintReport},
      recognition,
   },
};

/// Where a print goes and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintTarget {
   /// Local radio. The default adapter when unset.
   pub adapter: Option<MacAddress>,
   /// Remote printer. Picked among paired devices when unset.
   pub device: Option<MacAddress>,
   pub channel: u8,
   pub policy: ConnectPolicy,
}

impl PrintTarget {
   pub fn from_config(config: &Config) -> Self {
      Self {
         adapter: config.adapter,
         device: None,
         channel: config.printer.channel,
         policy: config.printer.connect_policy,
      }
   }
}

/// Finds the adapter `target` names, or the default one.
pub async fn select_adapter<'a, A: Adapter>(
   manager: &'a BluetoothManager<A>,
   target: &PrintTarget,
) -> Result<&'a A> {
   match target.adapter {
      Some(address) => manager
         .adapter(address)
         .await?
         .ok_or_else(|| CatPrintError::DeviceNotFound(format!("adapter {address}"))),
      None => manager.default_adapter().ok_or(CatPrintError::NoAdapter),
   }
}

/// Prints `image` on the device `target` resolves to.
///
/// An explicit device is used whether paired or not. Otherwise the
/// configured printer is used when paired, else the first paired device
/// that looks like a printer, else the configured address is dialled.
pub async fn print<A: Adapter>(
   manager: &BluetoothManager<A>,
   config: &Config,
   target: &PrintTarget,
   image: &[u8],
) -> Result<PrintReport> {
   let adapter = select_adapter(manager, target).await?;
   let paired = adapter.paired_devices().await?;

   let label = |address: MacAddress| {
      config
         .known_printer(address)
         .map_or_else(|| address.to_string(), str::to_owned)
   };

   let found = match target.device {
      Some(address) => paired.iter().find(|d| d.info().address == address),
      None => recognition::pick_printer(&paired, config.printer.address, &config.known_addresses()),
   };
   let dialled;
   let device = match found {
      Some(device) => device,
      None => {
         let address = target.device.unwrap_or(config.printer.address);
         dialled = adapter.device(DeviceInfo::new(address, label(address)));
         &dialled
      },
   };

   info!(
      "Printing {} bytes on {} ({}) channel {}",
      image.len(),
      device.info().name,
      device.info().address,
      target.channel
   );
   let mut job = PrintJob::connect(device, target.channel, target.policy).await?;
   job.run(image).await
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{
      bluetooth::{
         adapter::AdapterInfo,
         loopback::{LoopbackPeer, MemoryAdapter, WireEvent},
      },
      printer::protocol::{
         CMD_QUERY_SERIAL, CMD_QUERY_STATUS, DEFAULT_PRINTER_ADDRESS, SERIAL_LEN, STATUS_LEN,
      },
   };

   fn radio_mac(last: u8) -> MacAddress {
      MacAddress::new([0, 0x1a, 0x7d, 0xda, 0x71, last])
   }

   fn answering_peer() -> LoopbackPeer {
      let peer = LoopbackPeer::new();
      peer.respond_to(CMD_QUERY_STATUS, &[0u8; STATUS_LEN]);
      peer.respond_to(CMD_QUERY_SERIAL, &[0u8; SERIAL_LEN]);
      peer
   }

   fn dialled(peer: &LoopbackPeer) -> Option<MacAddress> {
      peer.wire_log().into_iter().find_map(|e| match e {
         WireEvent::Connected { address, .. } => Some(address),
         _ => None,
      })
   }

   #[tokio::test]
   async fn test_recognized_printer_is_used() {
      let peer = answering_peer();
      let printer = MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
      let adapter = MemoryAdapter::new(AdapterInfo::new(radio_mac(1), "hci0"), peer.clone())
         .with_device(DeviceInfo::new(
            MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x00]),
            "Headphones",
         ))
         .with_device(DeviceInfo::new(printer, "GB02"));
      let manager = BluetoothManager::from_adapters(vec![adapter]);
      let config = Config::default();

      print(&manager, &config, &PrintTarget::from_config(&config), &[1, 2])
         .await
         .unwrap();
      assert_eq!(dialled(&peer), Some(printer));
   }

   #[tokio::test]
   async fn test_lookalike_name_does_not_steal_the_print() {
      let peer = answering_peer();
      let adapter = MemoryAdapter::new(AdapterInfo::new(radio_mac(1), "hci0"), peer.clone())
         .with_device(DeviceInfo::new(
            MacAddress::new([0xd0, 0x11, 0x22, 0x33, 0x44, 0x55]),
            "MX Master 3S",
         ));
      let manager = BluetoothManager::from_adapters(vec![adapter]);
      let config = Config::default();

      print(&manager, &config, &PrintTarget::from_config(&config), &[1])
         .await
         .unwrap();
      assert_eq!(dialled(&peer), Some(DEFAULT_PRINTER_ADDRESS));
   }

   #[tokio::test]
   async fn test_configured_address_dialled_when_unpaired() {
      let peer = answering_peer();
      let adapter = MemoryAdapter::new(AdapterInfo::new(radio_mac(1), "hci0"), peer.clone());
      let manager = BluetoothManager::from_adapters(vec![adapter]);
      let config = Config::default();

      print(&manager, &config, &PrintTarget::from_config(&config), &[1])
         .await
         .unwrap();
      assert_eq!(dialled(&peer), Some(DEFAULT_PRINTER_ADDRESS));
   }

   #[tokio::test]
   async fn test_explicit_adapter_and_device() {
      let first = answering_peer();
      let second = answering_peer();
      let device = MacAddress::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
      let manager = BluetoothManager::from_adapters(vec![
         MemoryAdapter::new(AdapterInfo::new(radio_mac(1), "hci0"), first.clone()),
         MemoryAdapter::new(AdapterInfo::new(radio_mac(2), "hci1"), second.clone()),
      ]);
      let config = Config::default();
      let target = PrintTarget {
         adapter: Some(radio_mac(2)),
         device: Some(device),
         channel: 5,
         policy: ConnectPolicy::Default,
      };

      print(&manager, &config, &target, &[1]).await.unwrap();
      assert_eq!(first.connects(), 0);
      assert_eq!(second.wire_log()[0], WireEvent::Connected {
         address: device,
         channel: 5
      });
   }

   #[tokio::test]
   async fn test_missing_adapter() {
      let config = Config::default();
      let empty = BluetoothManager::<MemoryAdapter>::from_adapters(Vec::new());
      assert!(matches!(
         print(&empty, &config, &PrintTarget::from_config(&config), &[1]).await,
         Err(CatPrintError::NoAdapter)
      ));

      let manager = BluetoothManager::from_adapters(vec![MemoryAdapter::new(
         AdapterInfo::new(radio_mac(1), "hci0"),
         LoopbackPeer::new(),
      )]);
      let target = PrintTarget {
         adapter: Some(radio_mac(9)),
         ..PrintTarget::from_config(&config)
      };
      assert!(matches!(
         print(&manager, &config, &target, &[1]).await,
         Err(CatPrintError::DeviceNotFound(_))
      ));
   }
}
