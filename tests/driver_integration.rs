//! End-to-end driver tests against a scripted Modbus transport.
//!
//! The mock stands in for the serial collaborator: it records every request
//! and replays a queue of scripted responses, so the sampling loop, the
//! decoder, and the sample buffer are exercised together without hardware.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use d6f_flow::{
    ConfigIssue, DriverConfig, FlowError, FlowSensorDriver, ModbusTransport, SensorReading,
    REGISTER_COUNT,
};

type Script = VecDeque<Result<Vec<u16>, FlowError>>;

/// Transport that replays scripted responses and records requests.
#[derive(Clone)]
struct ScriptedTransport {
    responses: Arc<Mutex<Script>>,
    requests: Arc<Mutex<Vec<(u16, u16)>>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push_ok(&self, words: Vec<u16>) {
        self.responses.lock().push_back(Ok(words));
    }

    fn push_err(&self, message: &str) {
        self.responses
            .lock()
            .push_back(Err(FlowError::Transport(message.to_string())));
    }

    fn requests(&self) -> Vec<(u16, u16)> {
        self.requests.lock().clone()
    }

    fn boxed(&self) -> Box<dyn ModbusTransport> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl ModbusTransport for ScriptedTransport {
    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, FlowError> {
        self.requests.lock().push((address, count));
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FlowError::Transport("script exhausted".into())))
    }
}

fn fast_config(slave_address: u8) -> DriverConfig {
    DriverConfig::new("/dev/ttyMOCK", slave_address, 38400)
        .with_sampling_period(Duration::from_millis(10))
}

/// Poll `get_measurement` until a reading arrives or the deadline passes.
async fn wait_for_reading(driver: &FlowSensorDriver) -> SensorReading {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(reading) = driver.get_measurement() {
            return reading;
        }
        assert!(Instant::now() < deadline, "no reading within deadline");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn sensor_words() -> Vec<u16> {
    vec![100, 0xFFCE, 0, 0, 0, 0, 0, 0, 1000, 9000, 500, 4500, 2000, 100]
}

#[tokio::test]
async fn decodes_a_polled_register_block_end_to_end() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_ok(sensor_words());

    let mut driver = FlowSensorDriver::with_transport(fast_config(3), transport.boxed())?;
    let reading = wait_for_reading(&driver).await;

    assert_eq!(reading.ins_velocity_x, 0.1);
    assert_eq!(reading.ins_velocity_y, -0.049);
    assert_eq!(reading.ins_velocity, 1.0);
    assert_eq!(reading.ins_angle, 90.0);
    assert_eq!(reading.velocity_unit, "m/s");
    assert_eq!(reading.angle_unit, "degrees");

    // One read of 14 registers, starting at slave_address - 1.
    let requests = transport.requests();
    assert!(!requests.is_empty());
    assert_eq!(requests[0], (2, REGISTER_COUNT as u16));

    driver.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn survives_transport_errors_and_keeps_polling() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_err("read timeout");
    transport.push_err("malformed response");
    transport.push_ok(sensor_words());

    let mut driver = FlowSensorDriver::with_transport(fast_config(1), transport.boxed())?;
    let reading = wait_for_reading(&driver).await;
    assert_eq!(reading.ins_velocity, 1.0);

    // The failed polls produced gaps, not readings.
    assert!(transport.requests().len() >= 3);

    driver.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn short_register_responses_are_skipped() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_ok(vec![1, 2, 3]); // wrong length, must not decode
    transport.push_ok(sensor_words());

    let mut driver = FlowSensorDriver::with_transport(fast_config(1), transport.boxed())?;
    let reading = wait_for_reading(&driver).await;

    // Only the full-length block became a reading.
    assert_eq!(reading.ins_velocity, 1.0);

    driver.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn delivers_readings_in_production_order() -> Result<()> {
    let transport = ScriptedTransport::new();
    for magnitude in [1000u16, 2000, 3000] {
        let mut words = vec![0u16; REGISTER_COUNT];
        words[8] = magnitude;
        transport.push_ok(words);
    }

    let mut driver = FlowSensorDriver::with_transport(fast_config(1), transport.boxed())?;

    let mut magnitudes = Vec::new();
    while magnitudes.len() < 3 {
        let reading = wait_for_reading(&driver).await;
        magnitudes.push(reading.ins_velocity);
    }
    assert_eq!(magnitudes, vec![1.0, 2.0, 3.0]);

    driver.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn get_measurement_on_empty_buffer_is_none_and_nonblocking() -> Result<()> {
    let transport = ScriptedTransport::new(); // script exhausted from the start

    let mut driver = FlowSensorDriver::with_transport(fast_config(1), transport.boxed())?;
    assert!(driver.get_measurement().is_none());
    assert_eq!(driver.buffered(), 0);

    driver.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_the_sampling_task() -> Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_ok(sensor_words());

    let mut driver = FlowSensorDriver::with_transport(fast_config(1), transport.boxed())?;
    wait_for_reading(&driver).await;

    driver.shutdown().await;
    let polls_after_shutdown = transport.requests().len();

    // No further polls once the task has exited.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.requests().len(), polls_after_shutdown);
    Ok(())
}

#[tokio::test]
async fn rejects_invalid_wire_parameters_before_starting() {
    let transport = ScriptedTransport::new();
    let config = DriverConfig::new("/dev/ttyMOCK", 0, 19200);

    match FlowSensorDriver::with_transport(config, transport.boxed()) {
        Err(FlowError::InvalidConfig(issues)) => {
            assert!(issues.contains(&ConfigIssue::UnsupportedBaudRate(19200)));
            assert!(issues.contains(&ConfigIssue::SlaveAddressOutOfRange(0)));
        }
        other => panic!("expected InvalidConfig, got {:?}", other.map(|_| ())),
    }

    // The loop never started, so nothing was polled.
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn connect_refuses_nonexistent_port_without_polling() {
    let config = DriverConfig::new("/dev/ttyDOESNOTEXIST", 1, 9600);
    match FlowSensorDriver::connect(config).await {
        Err(FlowError::InvalidConfig(issues)) => {
            assert_eq!(
                issues,
                vec![ConfigIssue::PortNotFound("/dev/ttyDOESNOTEXIST".into())]
            );
        }
        other => panic!("expected InvalidConfig, got {:?}", other.map(|_| ())),
    }
}
