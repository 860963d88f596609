//! Bluetooth device addresses.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{CatPrintError, Result};

/// A 6-byte Bluetooth device address.
///
/// Parses `XX:XX:XX:XX:XX:XX` in either case and always formats as
/// lowercase, zero-padded octets, most significant first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress([u8; 6]);

impl MacAddress {
   pub const fn new(octets: [u8; 6]) -> Self {
      Self(octets)
   }

   pub const fn octets(self) -> [u8; 6] {
      self.0
   }

   /// Parses the textual form, rejecting anything that is not exactly six
   /// two-digit hex octets separated by `:`.
   pub fn parse(text: &str) -> Result<Self> {
      let invalid = || CatPrintError::InvalidAddress(text.to_owned());

      let mut octets = [0u8; 6];
      let mut parts = text.split(':');
      for octet in &mut octets {
         let part = parts.next().ok_or_else(invalid)?;
         if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
         }
         *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
      }
      if parts.next().is_some() {
         return Err(invalid());
      }
      Ok(Self(octets))
   }
}

impl FromStr for MacAddress {
   type Err = CatPrintError;

   fn from_str(s: &str) -> Result<Self> {
      Self::parse(s)
   }
}

impl TryFrom<String> for MacAddress {
   type Error = CatPrintError;

   fn try_from(value: String) -> Result<Self> {
      Self::parse(&value)
   }
}

impl From<MacAddress> for String {
   fn from(value: MacAddress) -> Self {
      value.to_string()
   }
}

impl From<[u8; 6]> for MacAddress {
   fn from(octets: [u8; 6]) -> Self {
      Self(octets)
   }
}

impl fmt::Display for MacAddress {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let [a, b, c, d, e, g] = self.0;
      write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
   }
}

impl fmt::Debug for MacAddress {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "MacAddress({self})")
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_parse_printer_address() {
      let addr = MacAddress::parse("24:00:28:00:1e:5b").unwrap();
      assert_eq!(addr.octets(), [0x24, 0x00, 0x28, 0x00, 0x1e, 0x5b]);
      assert_eq!(addr.to_string(), "24:00:28:00:1e:5b");
   }

   #[test]
   fn test_parse_is_case_insensitive_and_formats_lowercase() {
      let upper = MacAddress::parse("AA:BB:CC:DD:EE:FF").unwrap();
      let lower = MacAddress::parse("aa:bb:cc:dd:ee:ff").unwrap();
      assert_eq!(upper, lower);
      assert_eq!(upper.to_string(), "aa:bb:cc:dd:ee:ff");
   }

   #[test]
   fn test_format_zero_pads() {
      let addr = MacAddress::new([0, 1, 2, 0x0a, 0x0b, 0xff]);
      assert_eq!(addr.to_string(), "00:01:02:0a:0b:ff");
   }

   #[test]
   fn test_round_trip_every_octet_value() {
      let base = [0x24, 0x00, 0x28, 0x00, 0x1e, 0x5b];
      for position in 0..6 {
         for value in 0..=u8::MAX {
            let mut octets = base;
            octets[position] = value;
            let addr = MacAddress::new(octets);
            let text = addr.to_string();
            assert_eq!(text.len(), 17);
            assert_eq!(MacAddress::parse(&text).unwrap(), addr);
            assert_eq!(MacAddress::parse(&text.to_uppercase()).unwrap(), addr);
         }
      }
   }

   #[test]
   fn test_rejects_malformed() {
      for text in [
         "",
         "00:11:22:33:44",        // too few
         "00:11:22:33:44:55:66",  // too many
         "00-11-22-33-44-55",     // wrong separator
         "GG:HH:II:JJ:KK:LL",     // not hex
         "0:11:22:33:44:55",      // short octet
         "000:11:22:33:44:55",    // long octet
         "00:11:22:33:44:55:",    // trailing separator
         " 00:11:22:33:44:55",    // padding
         "+0:11:22:33:44:55",     // sign
      ] {
         let err = MacAddress::parse(text).unwrap_err();
         assert!(
            matches!(err, CatPrintError::InvalidAddress(_)),
            "{text:?} gave {err:?}"
         );
      }
   }

   #[test]
   fn test_serde_uses_text_form() {
      #[derive(Serialize, Deserialize)]
      struct Wrapper {
         address: MacAddress,
      }

      let parsed: Wrapper = toml::from_str("address = \"24:00:28:00:1E:5B\"").unwrap();
      assert_eq!(parsed.address.to_string(), "24:00:28:00:1e:5b");
      assert!(toml::from_str::<Wrapper>("address = \"nope\"").is_err());
   }
}
