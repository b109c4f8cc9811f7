//! `lcdctl`: drive a CFA635 module from the command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cfa635_driver::{serial, ConnectionConfig, LcdError, LcdResult, Module};
use cfa635_protocol::{transliterate, Sprite, SPRITE_HEIGHT};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lcdctl")]
#[command(about = "Control a Crystalfontz CFA635 LCD module", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML connection config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port, overriding the config
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overriding the config
    #[arg(short, long)]
    baud: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the module answers
    Ping {
        /// Text to echo, at most 16 bytes
        #[arg(default_value = "lcdctl")]
        payload: String,
    },
    /// Clear the display
    Clear,
    /// Write text at a position
    Write {
        /// Column, 0..=19
        #[arg(long, default_value_t = 0)]
        col: usize,
        /// Row, 0..=3
        #[arg(long, default_value_t = 0)]
        row: usize,
        /// Continue on following rows instead of truncating
        #[arg(long)]
        wrap: bool,
        text: String,
    },
    /// Set backlight brightness, 0..=100
    Backlight {
        lcd: u8,
        /// Keypad brightness; defaults to the LCD level
        keypad: Option<u8>,
    },
    /// Set one color of a status LED
    Led {
        /// LED, 0..=3 from the top
        index: usize,
        color: LedColor,
        /// Duty cycle, 0..=100
        duty: u8,
    },
    /// Load a custom character into slot 0..=7
    Sprite {
        index: usize,
        /// Eight pixel rows, top first; decimal, 0x or 0b
        #[arg(num_args = SPRITE_HEIGHT, value_parser = parse_byte)]
        rows: Vec<u8>,
    },
    /// Print reports until interrupted
    Reports,
}

#[derive(Clone, Copy, ValueEnum)]
enum LedColor {
    Green,
    Red,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b") {
        u8::from_str_radix(bin, 2)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid byte '{s}': {e}"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> LcdResult<()> {
    let mut config = match &cli.config {
        Some(path) => ConnectionConfig::load(path)?,
        None => ConnectionConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }

    let module = serial::open(&config)?;

    match cli.command {
        Commands::Ping { payload } => {
            module.ping(payload.as_bytes())?;
            tracing::info!("module on {} answered", config.port);
        }
        Commands::Clear => module.clear()?,
        Commands::Write { col, row, wrap, text } => {
            let data = transliterate(&text);
            if wrap {
                module.write_wrapped(col, row, &data)?;
            } else {
                module.write(col, row, &data)?;
            }
        }
        Commands::Backlight { lcd, keypad } => module.set_backlight(lcd, keypad.unwrap_or(lcd))?,
        Commands::Led { index, color, duty } => {
            module.set_led(index, matches!(color, LedColor::Green), duty)?
        }
        Commands::Sprite { index, rows } => {
            let sprite: Sprite = rows
                .as_slice()
                .try_into()
                .map_err(|_| LcdError::Config(format!("sprite needs {SPRITE_HEIGHT} rows")))?;
            module.set_sprite(index, &sprite)?;
        }
        Commands::Reports => print_reports(&module)?,
    }

    module.close()
}

fn print_reports(module: &Module) -> LcdResult<()> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .map_err(|e| LcdError::Config(format!("failed to install Ctrl-C handler: {e}")))?;

    tracing::info!("waiting for reports, Ctrl-C to stop");
    while running.load(Ordering::SeqCst) {
        match module.read_report_timeout(Duration::from_millis(200)) {
            Ok(report) => println!("{}", report),
            Err(LcdError::Timeout) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
