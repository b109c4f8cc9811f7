//! Opening a module on a serial port.

use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::config::ConnectionConfig;
use crate::error::LcdResult;
use crate::module::Module;

/// Open the serial port named in `config` (8N1, no flow control) and connect
/// to the module on it.
///
/// The port's read timeout is `read_poll_ms`, which lets the read pipeline
/// notice [`Module::close`] promptly.
pub fn open(config: &ConnectionConfig) -> LcdResult<Module> {
    config.validate()?;
    let port = serialport::new(config.port.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(config.read_poll())
        .open()?;
    let reader = port.try_clone()?;
    log::info!("opened {} at {} baud", config.port, config.baud_rate);

    Module::connect_with_config(reader, port, config)
}
