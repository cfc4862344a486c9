//! Driver configuration and validation.
//!
//! [`DriverConfig`] is created once from caller input (directly or
//! deserialized from TOML), validated once, and never mutated afterwards.
//! Validation runs every check even after an earlier failure so that all
//! problems are reported together; any failure is fatal to construction.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::{ConfigIssue, FlowError, FlowResult};

/// Lowest valid Modbus slave address for the sensor.
pub const SLAVE_ADDRESS_MIN: u8 = 1;
/// Highest valid Modbus slave address for the sensor.
pub const SLAVE_ADDRESS_MAX: u8 = 32;

/// The closed set of baud rates the sensor supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudRate {
    /// 9600 bits per second.
    Bps9600,
    /// 38400 bits per second.
    Bps38400,
}

impl BaudRate {
    /// Map a raw baud rate to the closed set, or `None` if unsupported.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            9600 => Some(Self::Bps9600),
            38400 => Some(Self::Bps38400),
            _ => None,
        }
    }

    /// The numeric rate handed to the serial port.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Bps9600 => 9600,
            Self::Bps38400 => 38400,
        }
    }
}

fn default_sampling_period() -> Duration {
    Duration::from_secs(1)
}

/// Configuration for the flow sensor driver.
///
/// ```toml
/// port = "/dev/ttyUSB0"
/// slave_address = 1
/// baud_rate = 38400
/// sampling_period = "1s"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Serial device path (e.g. `/dev/ttyUSB0`). Must exist at validation
    /// time.
    pub port: String,
    /// Modbus unit identifier, 1-32. The register read starts at
    /// `slave_address - 1`, matching the sensor's indexing convention.
    pub slave_address: u8,
    /// Serial link speed; 9600 or 38400 (8 data bits, 1 stop bit, no
    /// parity).
    pub baud_rate: u32,
    /// Delay between successive polls (default 1s).
    #[serde(with = "humantime_serde", default = "default_sampling_period")]
    pub sampling_period: Duration,
}

impl DriverConfig {
    /// Create a configuration with the default 1s sampling period.
    pub fn new(port: impl Into<String>, slave_address: u8, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            slave_address,
            baud_rate,
            sampling_period: default_sampling_period(),
        }
    }

    /// Replace the sampling period.
    pub fn with_sampling_period(mut self, period: Duration) -> Self {
        self.sampling_period = period;
        self
    }

    /// Run every configuration check (port exists, baud rate in set, slave
    /// address in range) and report all failures at once.
    pub fn validate(&self) -> FlowResult<()> {
        self.check(true)
    }

    /// Validate only the wire-level parameters (baud rate and slave
    /// address). Used when a transport is injected and no device node backs
    /// the port path.
    pub fn validate_wire(&self) -> FlowResult<()> {
        self.check(false)
    }

    fn check(&self, require_port: bool) -> FlowResult<()> {
        let mut issues = Vec::new();

        if require_port && !Path::new(&self.port).exists() {
            issues.push(ConfigIssue::PortNotFound(self.port.clone()));
        }
        if BaudRate::from_raw(self.baud_rate).is_none() {
            issues.push(ConfigIssue::UnsupportedBaudRate(self.baud_rate));
        }
        if !(SLAVE_ADDRESS_MIN..=SLAVE_ADDRESS_MAX).contains(&self.slave_address) {
            issues.push(ConfigIssue::SlaveAddressOutOfRange(self.slave_address));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            for issue in &issues {
                warn!(%issue, "configuration check failed");
            }
            Err(FlowError::InvalidConfig(issues))
        }
    }
}
