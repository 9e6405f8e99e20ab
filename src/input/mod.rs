//! Recorded event input
//!
//! Events arrive as JSON lines, one [`RecordedEvent`] per line. Blank lines
//! and lines starting with `#` are ignored.

pub mod event_stream;

pub use event_stream::{AsyncEventTailer, EventReader};

use crate::models::RecordedEvent;
use thiserror::Error;

/// Errors raised while reading an event stream
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse one line of an event stream, `None` for blank and comment lines
pub fn parse_line(line: &str, line_number: usize) -> Option<Result<RecordedEvent, InputError>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    Some(
        serde_json::from_str(trimmed).map_err(|source| InputError::Parse {
            line: line_number,
            source,
        }),
    )
}
