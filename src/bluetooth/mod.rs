//! Bluetooth communication layer.
//!
//! Transports, remote devices, local adapters and the manager that
//! registers them, with BlueZ and in-memory providers for each.

pub mod adapter;
pub mod address;
pub mod bluez;
pub mod device;
pub mod loopback;
pub mod manager;
pub mod rfcomm;
pub mod transport;

pub use adapter::{Adapter, AdapterInfo, RadioBackend};
pub use address::MacAddress;
pub use device::{Device, DeviceInfo, RemoteDevice};
pub use manager::BluetoothManager;
pub use rfcomm::RfcommChannel;
pub use transport::{Channel, ConnectPolicy, Transport, TransportState};
