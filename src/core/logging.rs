//! Logger initialisation
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use anyhow::Result;
use log::Level;
use std::io::Write;
use std::str::FromStr;

/// Output style for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// env_logger's human-readable format
    Pretty,
    /// One JSON object per line: `{"l": level, "t": unix_ms, "d": message}`
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "fancy" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("Unknown log format `{other}`")),
        }
    }
}

/// Install the global logger; `RUST_LOG` still overrides `default_level`
pub fn init(default_level: &str, format: LogFormat) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if format == LogFormat::Json {
        builder.format(|buf, record| {
            let line = json_line(
                record.level(),
                chrono::Utc::now().timestamp_millis(),
                &record.args().to_string(),
            );
            writeln!(buf, "{line}")
        });
    }

    // A second init (tests, embedding applications) keeps the existing logger
    let _ = builder.try_init();
}

pub fn json_line(level: Level, timestamp_ms: i64, message: &str) -> String {
    serde_json::json!({
        "l": level.as_str(),
        "t": timestamp_ms,
        "d": message,
    })
    .to_string()
}
