//! Asynchronous reports sent by the module.

use crate::constants::*;
use crate::error::ReportError;
use crate::packet::Packet;

/// A keypad button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Enter (check mark).
    Enter,
    /// Exit (cross).
    Exit,
}

impl Key {
    /// All keys in wire order.
    pub const ALL: [Key; 6] = [Key::Up, Key::Down, Key::Left, Key::Right, Key::Enter, Key::Exit];

    /// Key number 1..=6 as used on the wire.
    pub fn number(self) -> u8 {
        match self {
            Key::Up => 1,
            Key::Down => 2,
            Key::Left => 3,
            Key::Right => 4,
            Key::Enter => 5,
            Key::Exit => 6,
        }
    }

    /// Look up a key by its number 1..=6.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1..=6 => Some(Key::ALL[n as usize - 1]),
            _ => None,
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Key::Up => "up",
            Key::Down => "down",
            Key::Left => "left",
            Key::Right => "right",
            Key::Enter => "enter",
            Key::Exit => "exit",
        };
        f.write_str(name)
    }
}

/// A key was pressed or released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyActivity {
    /// Key that changed.
    pub key: Key,
    /// `true` on press, `false` on release.
    pub pressed: bool,
}

impl KeyActivity {
    /// Decode the single data byte of a key activity report.
    ///
    /// Codes 1..=6 are presses of keys 1..=6, codes 7..=12 are releases.
    pub fn from_code(code: u8) -> Result<Self, ReportError> {
        match code {
            1..=6 => Ok(KeyActivity {
                key: Key::ALL[code as usize - 1],
                pressed: true,
            }),
            7..=12 => Ok(KeyActivity {
                key: Key::ALL[code as usize - 7],
                pressed: false,
            }),
            _ => Err(ReportError::UnknownKey(code)),
        }
    }
}

/// Fan tachometer reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanSpeed {
    /// Fan index.
    pub sensor: u8,
    /// Tachometer cycles counted during the measurement window.
    pub tach_cycles: u8,
    /// Length of the measurement window in timer ticks.
    pub timer_ticks: u16,
}

/// Temperature sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    /// Sensor index.
    pub sensor: u8,
    /// Temperature in degrees Celsius, 1/16 degree resolution.
    pub celsius: f64,
}

/// A decoded report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    /// Keypad press or release (0x80).
    KeyActivity(KeyActivity),
    /// Fan tachometer reading (0x81).
    FanSpeed(FanSpeed),
    /// Temperature sensor reading (0x82).
    Temperature(Temperature),
}

impl Report {
    /// Decode a packet from the report class.
    pub fn decode(packet: &Packet) -> Result<Self, ReportError> {
        let data = &packet.data;
        let need = |n: usize| {
            if data.len() < n {
                Err(ReportError::Truncated {
                    kind: packet.kind,
                    len: data.len(),
                })
            } else {
                Ok(())
            }
        };

        match packet.kind {
            REPORT_KEY_ACTIVITY => {
                need(1)?;
                KeyActivity::from_code(data[0]).map(Report::KeyActivity)
            }
            REPORT_FAN_SPEED => {
                need(4)?;
                let (sensor, tach_cycles) = (data[0], data[1]);
                if tach_cycles == 0 && data[2] == 0 && data[3] == 0 {
                    return Err(ReportError::FanModuleAbsent { sensor });
                }
                Ok(Report::FanSpeed(FanSpeed {
                    sensor,
                    tach_cycles,
                    timer_ticks: u16::from_be_bytes([data[2], data[3]]),
                }))
            }
            REPORT_TEMPERATURE => {
                need(4)?;
                let sensor = data[0];
                if data[3] == 0 {
                    return Err(ReportError::SensorFault { sensor });
                }
                let raw = u16::from_be_bytes([data[1], data[2]]);
                Ok(Report::Temperature(Temperature {
                    sensor,
                    celsius: f64::from(raw) / 16.0,
                }))
            }
            other => Err(ReportError::UnknownReportType(other)),
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::KeyActivity(a) => {
                let action = if a.pressed { "pressed" } else { "released" };
                write!(f, "key {} {}", a.key, action)
            }
            Report::FanSpeed(s) => write!(
                f,
                "fan {}: {} cycles in {} ticks",
                s.sensor, s.tach_cycles, s.timer_ticks
            ),
            Report::Temperature(t) => write!(f, "sensor {}: {:.4} °C", t.sensor, t.celsius),
        }
    }
}
