//! C ABI entry point for host applications.
//!
//! The host owns the raster buffer. It is borrowed for the duration of one
//! call and never retained, so the host frees it exactly once, after the
//! call returns.

use std::slice;

use log::warn;

use crate::{
   bluetooth::{bluez::BluezBackend, manager::BluetoothManager},
   config::Config,
   error::{CatPrintError, Result},
   printer::{PrintReport, PrintTarget, target},
};

/// Prints an already-encoded raster buffer on the configured printer.
///
/// Returns 0 on success or the negative status code of the failure kind.
///
/// # Safety
///
/// `data` must be null or point to at least `capacity` readable bytes that
/// stay valid and unmodified until this function returns.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn catprint_print_buffer(
   data: *const u8,
   length: usize,
   capacity: usize,
) -> i32 {
   // SAFETY: the caller guarantees `data` covers `capacity` bytes.
   let result = unsafe { checked_payload(data, length, capacity) }.and_then(print_blocking);
   match result {
      Ok(_) => 0,
      Err(e) => {
         warn!("catprint_print_buffer: {e}");
         e.kind().status_code()
      },
   }
}

/// Validates the host buffer before any of it is read.
///
/// # Safety
///
/// When non-null, `data` must point to at least `capacity` readable bytes
/// that outlive `'a`.
unsafe fn checked_payload<'a>(data: *const u8, length: usize, capacity: usize) -> Result<&'a [u8]> {
   if data.is_null() {
      return Err(CatPrintError::NullBuffer);
   }
   if length > capacity {
      return Err(CatPrintError::BufferOverrun { length, capacity });
   }
   // SAFETY: non-null and `length <= capacity`, which the caller guarantees
   // is readable.
   Ok(unsafe { slice::from_raw_parts(data, length) })
}

fn print_blocking(image: &[u8]) -> Result<PrintReport> {
   let config = Config::load()?;
   let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()?;
   runtime.block_on(async {
      let backend = BluezBackend::new().await?;
      let mut manager = BluetoothManager::init(&backend).await?;
      let outcome = target::print(&manager, &config, &PrintTarget::from_config(&config), image).await;
      manager.shutdown();
      outcome
   })
}
