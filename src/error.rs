//! Error types for the flow sensor driver.
//!
//! The driver distinguishes two failure classes:
//!
//! - **Configuration errors** are detected once, before any I/O, and are
//!   fatal to construction. Every failed check is reported, not just the
//!   first, so a caller can fix the whole configuration in one pass.
//! - **Transport errors** (timeouts, serial I/O failures, malformed or short
//!   responses) occur per poll and are recoverable: the sampling loop logs
//!   them and continues on schedule. They never reach
//!   [`get_measurement`](crate::FlowSensorDriver::get_measurement) callers.
//!
//! Decode errors do not exist: decoding is total over any 14-word register
//! block, and a response of any other length is a transport error.

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type FlowResult<T> = std::result::Result<T, FlowError>;

/// A single failed configuration check.
///
/// Each variant names the offending field, carries the rejected value, and
/// renders the valid set or range in its `Display` output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    /// The serial device path does not exist at validation time.
    #[error("serial port '{0}' is not connected")]
    PortNotFound(String),

    /// The baud rate is not one of the two rates the sensor supports.
    #[error("baud rate {0} is not supported (valid rates: 9600, 38400)")]
    UnsupportedBaudRate(u32),

    /// The Modbus slave address lies outside the sensor's address range.
    #[error("slave address {0} is out of range (valid range: 1-32)")]
    SlaveAddressOutOfRange(u8),
}

/// Primary error type for the flow sensor driver.
#[derive(Error, Debug)]
pub enum FlowError {
    /// One or more configuration checks failed. Construction must not
    /// proceed; the caller decides whether to abort or retry with a
    /// corrected configuration.
    #[error("invalid driver configuration: {}", format_issues(.0))]
    InvalidConfig(Vec<ConfigIssue>),

    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// A Modbus read failed: I/O error, exception response, or a response
    /// that was not exactly the expected register count.
    #[error("transport error: {0}")]
    Transport(String),

    /// A Modbus read did not complete within the configured read timeout.
    #[error("register read timed out after {0:?}")]
    Timeout(Duration),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
