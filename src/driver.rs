//! Flow sensor driver: construction, the sampling loop, and consumption.
//!
//! [`FlowSensorDriver::connect`] validates the configuration, opens the RTU
//! transport, and spawns the sampling task. The task is the sole producer
//! into the shared sample buffer; any number of callers may drain it through
//! [`FlowSensorDriver::get_measurement`] without ever blocking against the
//! producer. The buffer lock is held only for the O(1) push or pop, never
//! across a transport read or a decode.
//!
//! Each loop iteration polls the sensor, decodes and publishes on success,
//! logs and skips on any transport failure, then waits out the sampling
//! period unconditionally. Shutdown is cooperative and observed at the wait
//! boundary.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::SampleBuffer;
use crate::config::DriverConfig;
use crate::error::FlowResult;
use crate::registers::{SensorReading, REGISTER_COUNT};
use crate::transport::{ModbusTransport, RtuTransport};

/// Background driver for the D6F-D010A32 flow sensor.
///
/// Owns the sampling task; dropping the driver signals the task to stop.
pub struct FlowSensorDriver {
    samples: Arc<Mutex<SampleBuffer>>,
    poll_task: Option<JoinHandle<()>>,
    poll_shutdown: Option<oneshot::Sender<()>>,
}

impl FlowSensorDriver {
    /// Validate the configuration, open the serial transport, and start
    /// sampling.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidConfig`](crate::FlowError::InvalidConfig)
    /// listing every failed check if the configuration is invalid (the
    /// sampling loop is never started), or a serial error if the port
    /// cannot be opened.
    pub async fn connect(config: DriverConfig) -> FlowResult<Self> {
        config.validate()?;
        let transport = RtuTransport::open(&config)?;
        info!(
            port = %config.port,
            slave = config.slave_address,
            period = ?config.sampling_period,
            "flow sensor driver connected"
        );
        Ok(Self::spawn(&config, Box::new(transport)))
    }

    /// Start sampling over an injected transport (tests, simulators).
    ///
    /// The wire-level parameters (baud rate, slave address) are still
    /// validated; the port-exists check is skipped because no device node
    /// backs an injected transport.
    pub fn with_transport(
        config: DriverConfig,
        transport: Box<dyn ModbusTransport>,
    ) -> FlowResult<Self> {
        config.validate_wire()?;
        Ok(Self::spawn(&config, transport))
    }

    fn spawn(config: &DriverConfig, transport: Box<dyn ModbusTransport>) -> Self {
        let samples = Arc::new(Mutex::new(SampleBuffer::new()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // The sensor's own convention: the read starts at slave_address - 1.
        let start_address = u16::from(config.slave_address - 1);

        let task = tokio::spawn(sample_loop(
            transport,
            Arc::clone(&samples),
            start_address,
            config.sampling_period,
            shutdown_rx,
        ));

        Self {
            samples,
            poll_task: Some(task),
            poll_shutdown: Some(shutdown_tx),
        }
    }

    /// Remove and return the oldest buffered reading, or `None` when the
    /// buffer is empty. Never blocks, never errors.
    pub fn get_measurement(&self) -> Option<SensorReading> {
        self.samples.lock().pop_oldest()
    }

    /// Number of readings currently buffered.
    pub fn buffered(&self) -> usize {
        self.samples.lock().len()
    }

    /// Signal the sampling task to stop and wait for it to exit.
    ///
    /// The task observes the signal at the wait boundary between polls; an
    /// in-flight register read is allowed to finish (it is bounded by the
    /// transport read timeout).
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.poll_shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.poll_task.take() {
            if task.await.is_err() {
                warn!("sampling task ended abnormally during shutdown");
            }
        }
    }
}

impl Drop for FlowSensorDriver {
    fn drop(&mut self) {
        if let Some(tx) = self.poll_shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

/// The sampling loop: poll, decode, publish, wait; forever.
///
/// Transport failures (I/O errors, timeouts, short responses) are logged and
/// skipped; the wait between polls happens unconditionally so the schedule
/// holds through sustained failure. Consumers see gaps, never a crash.
async fn sample_loop(
    mut transport: Box<dyn ModbusTransport>,
    samples: Arc<Mutex<SampleBuffer>>,
    start_address: u16,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        match transport
            .read_registers(start_address, REGISTER_COUNT as u16)
            .await
        {
            Ok(words) => match <&[u16; REGISTER_COUNT]>::try_from(words.as_slice()) {
                Ok(block) => {
                    let reading = SensorReading::from_registers(block);
                    samples.lock().push(reading);
                    debug!(start_address, "published sensor reading");
                }
                Err(_) => warn!(
                    expected = REGISTER_COUNT,
                    received = words.len(),
                    "register response has wrong length, skipping sample"
                ),
            },
            Err(err) => warn!(error = %err, "register poll failed, skipping sample"),
        }

        // The wait runs regardless of how the poll went; shutdown is
        // observed here. A completed or dropped sender both stop the loop.
        tokio::select! {
            _ = &mut shutdown_rx => break,
            () = tokio::time::sleep(period) => {}
        }
    }
    debug!("sampling loop stopped");
}
