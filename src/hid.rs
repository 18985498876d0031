//! Controller acquisition and report reading over hidapi
//!
//! A dedicated thread waits for the controller, reads input reports with a
//! short timeout and offers each one to the report gate. When a read fails
//! the engine is told the controller is gone and the thread goes back to
//! waiting for it.

use hidapi::{HidApi, HidDevice};
use ps3pie_core::gate::{Input, Offer, ReportGate};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Identification of the supported controller
pub mod device {
    pub const VENDOR_ID: u16 = 0x054C;
    pub const PRODUCT_ID: u16 = 0x0268;
    pub const MANUFACTURER: &str = "Sony";
    pub const PRODUCT: &str = "PLAYSTATION(R)3 Controller";
}

/// Errors while looking for or opening the controller
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("HID error: {0}")]
    Hid(String),

    #[error("HID permission denied: {0} (check the udev rule for /dev/hidraw*)")]
    PermissionDenied(String),

    #[error("Failed to spawn reader thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Shutdown requested")]
    Shutdown,
}

impl From<hidapi::HidError> for AcquireError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            AcquireError::PermissionDenied(msg)
        } else {
            AcquireError::Hid(msg)
        }
    }
}

/// Whether a HID device is the supported controller
pub fn is_controller(
    vendor_id: u16,
    product_id: u16,
    manufacturer: Option<&str>,
    product: Option<&str>,
) -> bool {
    (vendor_id == device::VENDOR_ID && product_id == device::PRODUCT_ID)
        || (manufacturer == Some(device::MANUFACTURER) && product == Some(device::PRODUCT))
}

/// Timing of the reader thread
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Read timeout in milliseconds (how often the shutdown flag is checked)
    pub read_timeout_ms: i32,
    /// Delay between acquisition attempts
    pub retry: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 50,
            retry: Duration::from_secs(1),
        }
    }
}

/// Open the controller if it is connected
fn open_controller(api: &mut HidApi) -> Result<Option<HidDevice>, AcquireError> {
    api.refresh_devices()?;
    let found = api
        .device_list()
        .find(|d| {
            is_controller(
                d.vendor_id(),
                d.product_id(),
                d.manufacturer_string(),
                d.product_string(),
            )
        })
        .cloned();

    match found {
        Some(info) => Ok(Some(info.open_device(api)?)),
        None => Ok(None),
    }
}

/// Block until the controller can be opened or shutdown is requested
pub fn wait_for_controller(
    api: &mut HidApi,
    shutdown: &AtomicBool,
    config: &ReaderConfig,
) -> Result<HidDevice, AcquireError> {
    let mut waiting = false;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Err(AcquireError::Shutdown);
        }
        match open_controller(api) {
            Ok(Some(device)) => {
                info!("Controller acquired");
                return Ok(device);
            }
            Ok(None) => {
                if !waiting {
                    waiting = true;
                    info!("Waiting for controller...");
                }
            }
            Err(e) => {
                error!("Failed to open controller: {e}; will try again");
            }
        }
        std::thread::sleep(config.retry);
    }
}

/// Background thread feeding controller reports into the gate
pub struct ControllerReader {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ControllerReader {
    /// Spawn the reader thread
    pub fn spawn(gate: ReportGate, config: ReaderConfig) -> Result<Self, AcquireError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let handle = std::thread::Builder::new()
            .name("controller-reader".into())
            .spawn(move || match HidApi::new() {
                Ok(mut api) => run_reader_loop(&mut api, gate, &shutdown_clone, &config),
                Err(e) => error!("Failed to initialize hidapi: {}", AcquireError::from(e)),
            })
            .map_err(AcquireError::Spawn)?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Controller reader thread panicked");
            }
        }
    }
}

impl Drop for ControllerReader {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_reader_loop(api: &mut HidApi, gate: ReportGate, shutdown: &AtomicBool, config: &ReaderConfig) {
    debug!("Controller reader thread started");
    let mut buf = [0u8; 64];

    'acquire: while !shutdown.load(Ordering::Relaxed) {
        let device = match wait_for_controller(api, shutdown, config) {
            Ok(device) => device,
            Err(AcquireError::Shutdown) => break,
            Err(e) => {
                error!("{e}");
                std::thread::sleep(config.retry);
                continue;
            }
        };

        while !shutdown.load(Ordering::Relaxed) {
            match device.read_timeout(&mut buf, config.read_timeout_ms) {
                Ok(len) if len > 0 => {
                    if gate.offer(Input::Report(buf[..len].to_vec())) == Offer::Closed {
                        break 'acquire;
                    }
                }
                Ok(_) => {
                    // Timeout, no data
                }
                Err(e) => {
                    warn!("Controller read error: {e}");
                    info!("Trying again to acquire controller...");
                    if gate.deliver_blocking(Input::Disconnected) == Offer::Closed {
                        break 'acquire;
                    }
                    continue 'acquire;
                }
            }
        }
    }

    debug!("Controller reader thread exiting");
}
