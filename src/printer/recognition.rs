//! Picking the printer among paired devices.

use log::debug;

use crate::bluetooth::{
   address::MacAddress,
   device::{Device, DeviceInfo},
};

/// Model prefixes cat printers advertise (case-insensitive). Never bare
/// `mx` or `cat`: those match mice and keyboards.
const PRINTER_PATTERNS: &[&str] = &["cat printer", "yhk", "gb0", "mx0", "mx1"];

pub fn name_matches(name: &str) -> bool {
   let name = name.to_lowercase();
   PRINTER_PATTERNS.iter().any(|pattern| name.contains(pattern))
}

/// Known by address, or named like a printer.
pub fn is_printer(info: &DeviceInfo, known: &[MacAddress]) -> bool {
   known.contains(&info.address) || name_matches(&info.name)
}

/// Chooses the device to print on: `preferred` when it is paired, else
/// the first recognized printer.
pub fn pick_printer<'a, D: Device>(
   devices: &'a [D],
   preferred: MacAddress,
   known: &[MacAddress],
) -> Option<&'a D> {
   if let Some(device) = devices.iter().find(|d| d.info().address == preferred) {
      return Some(device);
   }
   let found = devices.iter().find(|d| is_printer(d.info(), known));
   if let Some(device) = found {
      debug!(
         "Recognized {} ({}) as a printer",
         device.info().name,
         device.info().address
      );
   }
   found
}
