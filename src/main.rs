//! Command-line front end for the cat printer driver.
//!
//! ```text
//! catprint adapters
//! catprint devices --adapter 00:1a:7d:da:71:13
//! catprint print raster.bin --device 24:00:28:00:1e:5b --policy long
//! ```

use std::{fs, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use catprint::{
   Result,
   bluetooth::{
      Adapter, BluetoothManager, ConnectPolicy, Device, DeviceInfo, MacAddress,
      bluez::BluezBackend,
   },
   config::Config,
   event::LogBus,
   printer::{PrintTarget, recognition, target},
};

/// Thermal cat printer driver over Bluetooth RFCOMM
#[derive(Parser, Debug)]
#[command(name = "catprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
   /// Print listings and reports as JSON
   #[arg(long, global = true)]
   json: bool,

   #[command(subcommand)]
   command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
   /// List local Bluetooth adapters
   Adapters,

   /// List devices paired with an adapter
   Devices {
      /// Adapter address (defaults to the configured or first adapter)
      #[arg(long)]
      adapter: Option<MacAddress>,
   },

   /// Send an already-encoded raster buffer to the printer
   Print {
      /// File holding the raster bytes
      file: PathBuf,

      /// Printer address (defaults to the configured or a recognized printer)
      #[arg(long)]
      device: Option<MacAddress>,

      /// Adapter address
      #[arg(long)]
      adapter: Option<MacAddress>,

      /// RFCOMM channel (1-30)
      #[arg(long)]
      channel: Option<u8>,

      /// Connect policy: unbounded, default (5s) or long (30s)
      #[arg(long)]
      policy: Option<ConnectPolicy>,
   },
}

#[derive(Serialize)]
struct DeviceRow {
   #[serde(flatten)]
   info: DeviceInfo,
   printer: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   let cli = Cli::parse();
   let config = Config::load()?;

   let backend = BluezBackend::new().await?.with_events(Arc::new(LogBus));
   let mut manager = BluetoothManager::init(&backend).await?;
   let outcome = run(&cli, &config, &manager).await;
   manager.shutdown();
   outcome
}

async fn run<A: Adapter>(cli: &Cli, config: &Config, manager: &BluetoothManager<A>) -> Result<()> {
   match &cli.command {
      Commands::Adapters => {
         let adapters = manager.list_adapters().await?;
         if cli.json {
            println!("{}", serde_json::to_string_pretty(&adapters)?);
         } else if adapters.is_empty() {
            println!("No Bluetooth adapters found");
         } else {
            for info in &adapters {
               println!("{}  {}", info.address, info.name);
            }
         }
      },
      Commands::Devices { adapter } => {
         let target = PrintTarget {
            adapter: adapter.or(config.adapter),
            ..PrintTarget::from_config(config)
         };
         let adapter = target::select_adapter(manager, &target).await?;
         let known = config.known_addresses();
         let rows: Vec<DeviceRow> = adapter
            .paired_devices()
            .await?
            .iter()
            .map(|device| DeviceRow {
               info: device.info().clone(),
               printer: recognition::is_printer(device.info(), &known),
            })
            .collect();

         if cli.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
         } else if rows.is_empty() {
            println!("No paired devices");
         } else {
            for row in &rows {
               let mark = if row.printer { "*" } else { " " };
               println!("{mark} {}  {}", row.info.address, row.info.name);
            }
         }
      },
      Commands::Print {
         file,
         device,
         adapter,
         channel,
         policy,
      } => {
         let image = fs::read(file)?;
         let defaults = PrintTarget::from_config(config);
         let target = PrintTarget {
            adapter: adapter.or(defaults.adapter),
            device: *device,
            channel: channel.unwrap_or(defaults.channel),
            policy: policy.unwrap_or(defaults.policy),
         };

         let report = target::print(manager, config, &target, &image).await?;
         if cli.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
         } else {
            info!("Printer serial block: {}", report.serial_hex());
            println!("Printed {} bytes", report.bytes_sent);
         }
      },
   }
   Ok(())
}
