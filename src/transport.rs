//! Modbus transport seam.
//!
//! [`ModbusTransport`] is the single I/O boundary of the driver: one "read
//! holding registers" request per poll. The production backend,
//! [`RtuTransport`], drives a Modbus RTU client over an async serial port;
//! tests substitute scripted implementations of the trait. Framing and CRC
//! are delegated to `tokio-modbus` entirely.

use std::time::Duration;

use async_trait::async_trait;
use tokio_modbus::client::{rtu, Context, Reader};
use tokio_modbus::Slave;
use tokio_serial::SerialPortBuilderExt;
use tracing::debug;

use crate::config::DriverConfig;
use crate::error::{FlowError, FlowResult};

/// Serial framing used by the sensor: 8 data bits, 1 stop bit, no parity.
pub const DATA_BITS: tokio_serial::DataBits = tokio_serial::DataBits::Eight;
/// Stop bit setting for the sensor's serial link.
pub const STOP_BITS: tokio_serial::StopBits = tokio_serial::StopBits::One;
/// Per-request read timeout.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Asynchronous Modbus register reader.
///
/// Exactly one owner drives a transport at a time; the driver moves it into
/// the sampling task on construction.
#[async_trait]
pub trait ModbusTransport: Send {
    /// Read `count` holding registers starting at `address` (function
    /// code 3).
    async fn read_registers(&mut self, address: u16, count: u16) -> FlowResult<Vec<u16>>;
}

/// Modbus RTU client over a local serial port.
pub struct RtuTransport {
    ctx: Context,
    timeout: Duration,
}

impl RtuTransport {
    /// Open the serial port named by the configuration and attach a Modbus
    /// RTU client addressing the configured slave.
    pub fn open(config: &DriverConfig) -> FlowResult<Self> {
        let builder = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(DATA_BITS)
            .parity(tokio_serial::Parity::None)
            .stop_bits(STOP_BITS);
        let stream = builder.open_native_async()?;
        debug!(
            port = %config.port,
            baud_rate = config.baud_rate,
            slave = config.slave_address,
            "opened serial port for Modbus RTU"
        );

        Ok(Self {
            ctx: rtu::attach_slave(stream, Slave(config.slave_address)),
            timeout: READ_TIMEOUT,
        })
    }
}

#[async_trait]
impl ModbusTransport for RtuTransport {
    async fn read_registers(&mut self, address: u16, count: u16) -> FlowResult<Vec<u16>> {
        let words = tokio::time::timeout(
            self.timeout,
            self.ctx.read_holding_registers(address, count),
        )
        .await
        .map_err(|_| FlowError::Timeout(self.timeout))?
        .map_err(|err| FlowError::Transport(err.to_string()))?
        .map_err(|exception| FlowError::Transport(format!("modbus exception: {exception}")))?;

        Ok(words)
    }
}
