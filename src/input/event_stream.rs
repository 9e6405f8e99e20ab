use super::{parse_line, InputError};
use crate::models::RecordedEvent;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reads a recorded event stream from start to end
pub struct EventReader<R: BufRead = BufReader<File>> {
    reader: R,
    line_number: usize,
}

impl EventReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> EventReader<R> {
    pub fn from_reader(reader: R) -> Self {
        EventReader {
            reader,
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<RecordedEvent, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    if let Some(result) = parse_line(&line, self.line_number) {
                        return Some(result);
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

// ============================================
// Async Event Tailer
// ============================================

use tokio::fs::File as AsyncFile;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader as AsyncBufReader};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Follows a growing event file and forwards each event over a channel
pub struct AsyncEventTailer {
    file_path: PathBuf,
    start_at_end: bool,
}

impl AsyncEventTailer {
    /// Tail from the start of the file
    pub fn new(file_path: PathBuf) -> Self {
        AsyncEventTailer {
            file_path,
            start_at_end: false,
        }
    }

    /// Skip events already in the file
    pub fn from_end(mut self) -> Self {
        self.start_at_end = true;
        self
    }

    /// Run until the receiving side is dropped
    ///
    /// With `follow` unset the tailer stops at end of file. Malformed lines
    /// are logged and skipped.
    pub async fn run(&self, tx: mpsc::Sender<RecordedEvent>, follow: bool) -> Result<(), InputError> {
        let file = AsyncFile::open(&self.file_path).await?;
        let mut reader = AsyncBufReader::new(file);

        if self.start_at_end {
            reader.seek(std::io::SeekFrom::End(0)).await?;
        }

        log::info!("Event tailer started for {:?}", self.file_path);

        let mut line_number = 0usize;
        let mut pending = String::new();

        loop {
            match reader.read_line(&mut pending).await {
                Ok(0) => {
                    if !follow {
                        break;
                    }
                    sleep(Duration::from_millis(100)).await;
                }
                // Partial line, wait for the writer to finish it
                Ok(_) if !pending.ends_with('\n') && follow => {}
                Ok(_) => {
                    line_number += 1;
                    let line = std::mem::take(&mut pending);
                    match parse_line(&line, line_number) {
                        Some(Ok(event)) => {
                            if tx.send(event).await.is_err() {
                                log::info!("Channel closed, stopping event tailer");
                                break;
                            }
                        }
                        Some(Err(e)) => log::warn!("Skipping event: {}", e),
                        None => {}
                    }
                }
                Err(e) => {
                    log::error!("Error reading event file: {}", e);
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }

        Ok(())
    }
}
