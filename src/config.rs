use std::env;
use std::error::Error;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::info;

const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
const DEFAULT_BAUD_RATE: u32 = 9600;
const DEFAULT_COMM_GAP_MS: u64 = 300;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const DEFAULT_STATIC_DIR: &str = "static";

/// Timing and retention policy for the serial link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSettings {
    /// Idle time after which a partial frame is discarded
    pub inactivity_gap: Duration,
    /// Wait between failed attempts to open the port
    pub retry_delay: Duration,
    /// Silence on an open port that counts as a lost link, `None` to wait forever
    pub read_timeout: Option<Duration>,
    /// Drop the last snapshot when the link goes down instead of keeping it
    pub clear_on_disconnect: bool,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            inactivity_gap: Duration::from_millis(DEFAULT_COMM_GAP_MS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            read_timeout: Some(Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS)),
            clear_on_disconnect: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub serial_port: String,
    pub baud_rate: u32,
    pub http_bind: SocketAddr,
    pub static_dir: PathBuf,
    pub link: LinkSettings,
}

impl MonitorConfig {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let serial_port = lookup("BMS_SERIAL_PORT")
            .map(|port| port.trim().to_string())
            .filter(|port| !port.is_empty())
            .unwrap_or_else(|| DEFAULT_SERIAL_PORT.to_string());

        let baud_rate: u32 = parse_or(&lookup, "BMS_BAUD_RATE", DEFAULT_BAUD_RATE)?;
        if baud_rate == 0 {
            return Err("BMS_BAUD_RATE must be greater than zero".into());
        }

        let gap_ms: u64 = parse_or(&lookup, "BMS_COMM_GAP_MS", DEFAULT_COMM_GAP_MS)?;
        if gap_ms == 0 {
            return Err("BMS_COMM_GAP_MS must be greater than zero".into());
        }

        let retry_secs: u64 = parse_or(&lookup, "BMS_RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY_SECS)?;
        if retry_secs == 0 {
            return Err("BMS_RETRY_DELAY_SECS must be greater than zero".into());
        }

        // Zero disables the silence check
        let read_timeout_secs: u64 =
            parse_or(&lookup, "BMS_READ_TIMEOUT_SECS", DEFAULT_READ_TIMEOUT_SECS)?;
        let read_timeout = match read_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let clear_on_disconnect = parse_flag(&lookup, "BMS_CLEAR_ON_DISCONNECT", false)?;

        let http_bind: SocketAddr = match lookup("HTTP_BIND") {
            Some(raw) => parse_value("HTTP_BIND", &raw)?,
            None => parse_value("HTTP_BIND", DEFAULT_HTTP_BIND)?,
        };

        let static_dir = lookup("STATIC_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let config = MonitorConfig {
            serial_port,
            baud_rate,
            http_bind,
            static_dir,
            link: LinkSettings {
                inactivity_gap: Duration::from_millis(gap_ms),
                retry_delay: Duration::from_secs(retry_secs),
                read_timeout,
                clear_on_disconnect,
            },
        };

        info!(
            "BMS port {} at {} baud, HTTP on {}",
            config.serial_port, config.baud_rate, config.http_bind
        );

        Ok(config)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| -> Box<dyn Error> { format!("Invalid value for {}: '{}' ({})", key, raw, e).into() })
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> Result<bool, Box<dyn Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("Invalid value for {}: '{}' (expected true or false)", key, raw).into()),
    }
}
