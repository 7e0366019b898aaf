use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 256;
const OPEN_ATTEMPTS: u32 = 5;
const BACKOFF_INITIAL: Duration = Duration::from_millis(500);
const BACKOFF_MAX: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open serial device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn transport reader thread: {0}")]
    Spawn(std::io::Error),
}

/// Line source over a serial device path.
///
/// A dedicated reader thread pulls newline-terminated lines off the device
/// and feeds them into a bounded channel; the monitor loop consumes the
/// receiver. Opening the device at startup is fatal after a bounded number
/// of attempts, while mid-stream failures reconnect with capped backoff.
/// Line discipline (baud and friends) is configured out of band.
pub struct LineTransport {
    rx: mpsc::Receiver<String>,
}

impl LineTransport {
    pub fn connect(path: &Path) -> Result<Self, TransportError> {
        let reader = open_with_retry(path, OPEN_ATTEMPTS)?;
        info!("connected to {}", path.display());

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let device = path.to_path_buf();
        thread::Builder::new()
            .name("ppewatch-transport".into())
            .spawn(move || read_loop(&device, reader, &tx))
            .map_err(TransportError::Spawn)?;

        Ok(Self { rx })
    }

    pub fn into_receiver(self) -> mpsc::Receiver<String> {
        self.rx
    }
}

fn open_with_retry(path: &Path, attempts: u32) -> Result<BufReader<File>, TransportError> {
    let mut backoff = BACKOFF_INITIAL;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match File::open(path) {
            Ok(file) => return Ok(BufReader::new(file)),
            Err(err) => {
                if attempt >= attempts {
                    return Err(TransportError::Open {
                        path: path.to_path_buf(),
                        source: err,
                    });
                }
                warn!(
                    "open {} failed (attempt {attempt}/{attempts}): {err}",
                    path.display()
                );
                thread::sleep(backoff);
                backoff = (backoff * 2).min(BACKOFF_MAX);
            }
        }
    }
}

fn read_loop(device: &Path, mut reader: BufReader<File>, tx: &mpsc::Sender<String>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                warn!("{} reached end of stream, reconnecting", device.display());
                match reopen(device, tx) {
                    Some(next) => reader = next,
                    None => break,
                }
            }
            Ok(_) => {
                let line = decode_line(&buf);
                if line.is_empty() {
                    continue;
                }
                // Receiver gone means the monitor stopped; shut down.
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(err) => {
                error!("read error on {}: {err}", device.display());
                match reopen(device, tx) {
                    Some(next) => reader = next,
                    None => break,
                }
            }
        }
    }
    info!("transport reader for {} shutting down", device.display());
}

fn reopen(device: &Path, tx: &mpsc::Sender<String>) -> Option<BufReader<File>> {
    let mut backoff = BACKOFF_INITIAL;
    loop {
        if tx.is_closed() {
            return None;
        }
        thread::sleep(backoff);
        backoff = (backoff * 2).min(BACKOFF_MAX);
        match File::open(device) {
            Ok(file) => {
                info!("reconnected to {}", device.display());
                return Some(BufReader::new(file));
            }
            Err(err) => warn!("reconnect to {} failed: {err}", device.display()),
        }
    }
}

/// Invalid bytes are dropped rather than failing the line, and surrounding
/// whitespace is trimmed.
fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}
