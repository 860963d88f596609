//! Configuration management for the printer driver.
//!
//! This module handles loading and saving configuration from disk,
//! including the target printer and the printers known by address.

use std::{
   env, fs,
   path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{
   bluetooth::{address::MacAddress, transport::ConnectPolicy},
   error::{CatPrintError, Result},
   printer::protocol::{
      DEFAULT_CHANNEL, DEFAULT_POLICY, DEFAULT_PRINTER_ADDRESS, DEFAULT_PRINTER_NAME,
   },
};

/// Main configuration structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
   /// Local radio to use. The first one when unset.
   #[serde(default, skip_serializing_if = "Option::is_none")]
   pub adapter: Option<MacAddress>,

   #[serde(default)]
   pub printer: PrinterConfig,

   #[serde(default)]
   pub known_printers: Vec<KnownPrinter>,
}

/// Where and how to reach the printer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
   #[serde(default = "default_address")]
   pub address: MacAddress,

   #[serde(default = "default_name")]
   pub name: SmolStr,

   #[serde(default = "default_channel")]
   pub channel: u8,

   #[serde(default = "default_policy")]
   pub connect_policy: ConnectPolicy,
}

/// A printer recognized by address.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KnownPrinter {
   pub address: MacAddress,
   pub name: SmolStr,
}

const fn default_address() -> MacAddress {
   DEFAULT_PRINTER_ADDRESS
}

fn default_name() -> SmolStr {
   SmolStr::new_static(DEFAULT_PRINTER_NAME)
}

const fn default_channel() -> u8 {
   DEFAULT_CHANNEL
}

const fn default_policy() -> ConnectPolicy {
   DEFAULT_POLICY
}

impl Default for PrinterConfig {
   fn default() -> Self {
      Self {
         address: default_address(),
         name: default_name(),
         channel: default_channel(),
         connect_policy: default_policy(),
      }
   }
}

impl Default for Config {
   fn default() -> Self {
      Self {
         adapter: None,
         printer: PrinterConfig::default(),
         known_printers: vec![KnownPrinter {
            address: default_address(),
            name: default_name(),
         }],
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      Self::load_from(&Self::config_path()?)
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      self.save_to(&Self::config_path()?)
   }

   pub fn load_from(path: &Path) -> Result<Self> {
      if path.exists() {
         let contents = fs::read_to_string(path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         let config = Self::default();
         config.save_to(path)?;
         Ok(config)
      }
   }

   pub fn save_to(&self, path: &Path) -> Result<()> {
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(path, contents)?;

      Ok(())
   }

   pub fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(home) = env::var("CATPRINT_HOME") {
         PathBuf::from(home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Some(dir) = dirs::config_dir() {
         dir
      } else {
         return Err(CatPrintError::ConfigDirNotFound);
      };

      Ok(config_dir.join("catprint").join("config.toml"))
   }

   /// Name of the known printer at `address`, if any.
   pub fn known_printer(&self, address: MacAddress) -> Option<&str> {
      self
         .known_printers
         .iter()
         .find(|p| p.address == address)
         .map(|p| p.name.as_str())
   }

   /// Addresses recognized as printers regardless of their name.
   pub fn known_addresses(&self) -> Vec<MacAddress> {
      self.known_printers.iter().map(|p| p.address).collect()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_defaults() {
      let config = Config::default();
      assert_eq!(config.printer.address.to_string(), "24:00:28:00:1e:5b");
      assert_eq!(config.printer.name, "Cat Printer");
      assert_eq!(config.printer.channel, 2);
      assert_eq!(config.printer.connect_policy, ConnectPolicy::Unbounded);
      assert_eq!(config.known_printer(DEFAULT_PRINTER_ADDRESS), Some("Cat Printer"));
   }

   #[test]
   fn test_missing_file_writes_defaults() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("catprint").join("config.toml");

      let config = Config::load_from(&path).unwrap();
      assert_eq!(config, Config::default());
      assert!(path.exists());
      assert_eq!(Config::load_from(&path).unwrap(), config);
   }

   #[test]
   fn test_round_trip_keeps_custom_values() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");

      let mut config = Config::default();
      config.adapter = Some(MacAddress::new([0, 0x1a, 0x7d, 0xda, 0x71, 0x13]));
      config.printer.channel = 4;
      config.printer.connect_policy = ConnectPolicy::Long;
      config.save_to(&path).unwrap();

      assert_eq!(Config::load_from(&path).unwrap(), config);
   }

   #[test]
   fn test_partial_file_fills_defaults() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      fs::write(
         &path,
         "[printer]\naddress = \"aa:bb:cc:dd:ee:ff\"\nconnect_policy = \"none\"\n",
      )
      .unwrap();

      let config = Config::load_from(&path).unwrap();
      assert_eq!(config.printer.address.to_string(), "aa:bb:cc:dd:ee:ff");
      assert_eq!(config.printer.channel, DEFAULT_CHANNEL);
      assert_eq!(config.printer.connect_policy, ConnectPolicy::Unbounded);
      assert!(config.known_printers.is_empty());
   }

   #[test]
   fn test_bad_address_is_rejected() {
      let dir = tempfile::tempdir().unwrap();
      let path = dir.path().join("config.toml");
      fs::write(&path, "[printer]\naddress = \"not-an-address\"\n").unwrap();

      assert!(matches!(
         Config::load_from(&path),
         Err(CatPrintError::TomlParse(_))
      ));
   }
}
