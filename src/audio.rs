use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use anyhow::{anyhow, Context, Result};
use log::error;
use rodio::{Decoder, OutputStream, Sink};

enum BuzzerCommand {
    Play(PathBuf),
}

/// One-shot playback of the alarm sound.
///
/// A dedicated thread owns the non-Send audio objects; callers only push
/// commands. The thread is spawned lazily on the first play and playback
/// errors are logged there, since by then the caller has moved on.
pub struct BuzzerHandle {
    tx: Arc<Mutex<Option<Sender<BuzzerCommand>>>>,
}

impl BuzzerHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    pub fn play(&self, path: PathBuf) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(BuzzerCommand::Play(path))
            .map_err(|err| anyhow!("buzzer thread is gone: {err}"))
    }

    fn ensure_thread(&self) -> Result<Sender<BuzzerCommand>> {
        let mut guard = self
            .tx
            .lock()
            .map_err(|err| anyhow!("buzzer handle poisoned: {err}"))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<BuzzerCommand>();
        thread::Builder::new()
            .name("ppewatch-buzzer".to_string())
            .spawn(move || {
                while let Ok(command) = rx.recv() {
                    match command {
                        BuzzerCommand::Play(path) => {
                            if let Err(err) = play_file(&path) {
                                error!("buzzer playback failed: {err:#}");
                            }
                        }
                    }
                }
            })
            .context("failed to spawn buzzer thread")?;

        let tx_clone = tx.clone();
        *guard = Some(tx);
        Ok(tx_clone)
    }
}

impl Default for BuzzerHandle {
    fn default() -> Self {
        Self::new()
    }
}

fn play_file(path: &Path) -> Result<()> {
    let (_stream, handle) =
        OutputStream::try_default().context("failed to open audio output stream")?;
    let sink = Sink::try_new(&handle).context("failed to create audio sink")?;
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let source =
        Decoder::new(BufReader::new(file)).context("failed to decode buzzer sound")?;
    sink.append(source);
    // Blocks the buzzer thread only; the sound plays to completion.
    sink.sleep_until_end();
    Ok(())
}
