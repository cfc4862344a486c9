//! # d6f-flow
//!
//! Background driver for the Omron D6F-D010A32 air flow sensor over Modbus
//! RTU. The driver opens a serial connection, validates its configuration,
//! polls the sensor's 14-register data block on a fixed schedule, decodes
//! the raw words into physical units, and publishes readings through a
//! bounded drop-oldest buffer that consumers drain without blocking.
//!
//! ```rust,ignore
//! use d6f_flow::{DriverConfig, FlowSensorDriver};
//!
//! let config = DriverConfig::new("/dev/ttyUSB0", 1, 38400);
//! let driver = FlowSensorDriver::connect(config).await?;
//!
//! loop {
//!     if let Some(reading) = driver.get_measurement() {
//!         println!("{} {}", reading.ins_velocity, reading.velocity_unit);
//!     }
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//! }
//! ```
//!
//! ## Modules
//!
//! - **`config`**: [`DriverConfig`] and validation (run-all-checks, typed
//!   failures).
//! - **`registers`**: the sensor's register map and pure decoding into
//!   [`SensorReading`].
//! - **`buffer`**: the capacity-20 drop-oldest [`SampleBuffer`].
//! - **`transport`**: the [`ModbusTransport`] seam and the RTU backend.
//! - **`driver`**: [`FlowSensorDriver`] with its background sampling task.
//! - **`error`**: [`FlowError`] and the configuration issue taxonomy.

pub mod buffer;
pub mod config;
pub mod driver;
pub mod error;
pub mod registers;
pub mod transport;

pub use buffer::SampleBuffer;
pub use config::{BaudRate, DriverConfig, SLAVE_ADDRESS_MAX, SLAVE_ADDRESS_MIN};
pub use driver::FlowSensorDriver;
pub use error::{ConfigIssue, FlowError, FlowResult};
pub use registers::{decode_signed, SensorReading, ANGLE_UNIT, REGISTER_COUNT, VELOCITY_UNIT};
pub use transport::{ModbusTransport, RtuTransport};
