use crate::alerting::AlertSink;
use crate::models::CheckAlert;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Output handler for check alerts
pub struct OutputHandler {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            _ => OutputFormat::Jsonl, // Default
        }
    }
}

impl OutputHandler {
    /// Create a new output handler; without a file everything goes to stdout
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> Result<Self, OutputError> {
        let writer: Option<Box<dyn Write + Send + Sync>> = match (&format, file_path) {
            (OutputFormat::Console, _) => None,
            (_, Some(path)) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            (_, None) => None,
        };

        Ok(OutputHandler { format, writer })
    }

    /// Write a check alert
    pub fn write_alert(&mut self, alert: &CheckAlert) -> Result<(), OutputError> {
        let output = match self.format {
            OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(alert)?),
            OutputFormat::Jsonl => format!("{}\n", serde_json::to_string(alert)?),
            OutputFormat::Console => format!("{}\n", console_line(alert)),
        };
        self.write_output(&output)
    }

    fn write_output(&mut self, data: &str) -> Result<(), OutputError> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", data);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

/// One-line human readable rendering of an alert
pub fn console_line(alert: &CheckAlert) -> String {
    let mut line = format!(
        "[{}{}] {} failed {} ({}/{})",
        alert.check_name,
        if alert.experimental { "*" } else { "" },
        alert.player_name,
        alert.description,
        alert.violations,
        alert.max_violations,
    );
    if !alert.evidence.is_empty() {
        line.push_str(" - ");
        line.push_str(&alert.evidence.to_string());
    }
    if alert.punish {
        line.push_str(" [PUNISH]");
    }
    line
}

/// Alert sink that writes synchronously, used for offline replay
pub struct OutputSink {
    handler: Mutex<OutputHandler>,
}

impl OutputSink {
    pub fn new(handler: OutputHandler) -> Self {
        OutputSink {
            handler: Mutex::new(handler),
        }
    }
}

impl AlertSink for OutputSink {
    fn dispatch(&self, alert: CheckAlert) {
        if let Err(e) = self.handler.lock().write_alert(&alert) {
            log::error!("Failed to write alert: {}", e);
        }
    }
}
