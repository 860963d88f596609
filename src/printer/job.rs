//! One print over one transport.

use log::{debug, info, warn};
use serde::{Serialize, Serializer};

use crate::{
   bluetooth::{
      device::Device,
      transport::{ConnectPolicy, Transport},
   },
   error::{CatPrintError, Result},
   printer::protocol::{
      CMD_END_PRINT, CMD_INIT, CMD_QUERY_SERIAL, CMD_QUERY_STATUS, CMD_START_PRINT, JobState,
      ProtocolError, SERIAL_LEN, STATUS_LEN,
   },
};

/// Writes all of `bytes`, looping over partial sends.
///
/// A stream that stops accepting bytes before the end is an
/// `IncompleteSend` named after `what`.
pub async fn send_all<T: Transport>(
   transport: &mut T,
   bytes: &[u8],
   what: &'static str,
) -> Result<usize> {
   let mut sent = 0;
   while sent < bytes.len() {
      match transport.send(&bytes[sent..]).await {
         Ok(0) | Err(CatPrintError::NotConnected) => {
            return Err(
               ProtocolError::IncompleteSend {
                  what,
                  sent,
                  total: bytes.len(),
               }
               .into(),
            );
         },
         Ok(n) => sent += n,
         Err(e) => return Err(e),
      }
   }
   Ok(sent)
}

/// Fills `buf` completely, looping over partial reads.
///
/// The peer closing the stream first is a `ShortRead` named after `what`.
pub async fn receive_exact<T: Transport>(
   transport: &mut T,
   buf: &mut [u8],
   what: &'static str,
) -> Result<()> {
   let mut received = 0;
   while received < buf.len() {
      match transport.receive(&mut buf[received..]).await {
         Ok(0) | Err(CatPrintError::NotConnected) => {
            return Err(
               ProtocolError::ShortRead {
                  what,
                  expected: buf.len(),
                  received,
               }
               .into(),
            );
         },
         Ok(n) => received += n,
         Err(e) => return Err(e),
      }
   }
   Ok(())
}

fn as_hex<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
   serializer.serialize_str(&hex::encode(bytes))
}

/// What the printer reported during a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintReport {
   #[serde(serialize_with = "as_hex")]
   pub status: [u8; STATUS_LEN],
   #[serde(serialize_with = "as_hex")]
   pub serial: [u8; SERIAL_LEN],
   /// Bytes written while printing, markers included.
   pub bytes_sent: usize,
}

impl PrintReport {
   pub fn status_hex(&self) -> String {
      hex::encode(self.status)
   }

   pub fn serial_hex(&self) -> String {
      hex::encode(self.serial)
   }
}

/// Drives the print conversation over a transport it owns.
///
/// A job runs at most once and always leaves its transport closed.
pub struct PrintJob<T: Transport> {
   transport: T,
   state: JobState,
}

impl<T: Transport> PrintJob<T> {
   pub const fn new(transport: T) -> Self {
      Self {
         transport,
         state: JobState::Init,
      }
   }

   /// Opens a transport to `device` and wraps it in a job.
   pub async fn connect<D>(device: &D, channel: u8, policy: ConnectPolicy) -> Result<Self>
   where
      D: Device<Transport = T>,
   {
      let transport = device.create_transport(channel, policy).await?;
      Ok(Self::new(transport))
   }

   pub const fn state(&self) -> JobState {
      self.state
   }

   pub const fn transport(&self) -> &T {
      &self.transport
   }

   /// Prints `image`, an already-encoded raster opaque to this layer.
   ///
   /// Closes the transport whether or not the conversation succeeds.
   pub async fn run(&mut self, image: &[u8]) -> Result<PrintReport> {
      if self.state != JobState::Init {
         return Err(ProtocolError::AlreadyRun.into());
      }

      let outcome = self.converse(image).await;
      self.transport.close();
      self.advance(JobState::Terminated);

      match &outcome {
         Ok(report) => info!("Printed {} bytes", report.bytes_sent),
         Err(e) => warn!("Print job failed: {e}"),
      }
      outcome
   }

   async fn converse(&mut self, image: &[u8]) -> Result<PrintReport> {
      send_all(&mut self.transport, CMD_INIT, "init").await?;

      self.advance(JobState::StatusQuery);
      send_all(&mut self.transport, CMD_QUERY_STATUS, "status query").await?;
      let mut status = [0u8; STATUS_LEN];
      receive_exact(&mut self.transport, &mut status, "status").await?;

      self.advance(JobState::SerialQuery);
      send_all(&mut self.transport, CMD_QUERY_SERIAL, "serial query").await?;
      let mut serial = [0u8; SERIAL_LEN];
      receive_exact(&mut self.transport, &mut serial, "serial").await?;

      self.advance(JobState::Printing);
      let mut bytes_sent = send_all(&mut self.transport, CMD_START_PRINT, "print start").await?;
      bytes_sent += send_all(&mut self.transport, image, "image").await?;
      bytes_sent += send_all(&mut self.transport, CMD_END_PRINT, "print end").await?;

      Ok(PrintReport {
         status,
         serial,
         bytes_sent,
      })
   }

   fn advance(&mut self, next: JobState) {
      debug!("Print job: {} -> {next}", self.state);
      self.state = next;
   }
}
