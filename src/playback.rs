// src/playback.rs - External media player control
use crate::config::PlaybackConfig;
use crate::gesture::GestureSymbol;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait PlaybackController {
    /// Starts playback for a gesture without waiting for it to end.
    fn start(&mut self, gesture: GestureSymbol) -> Result<(), PlaybackError>;

    /// Best-effort stop of the active playback, if any.
    fn abort(&mut self);

    /// Polled once per tick.
    fn is_finished(&self) -> bool;
}

/// Runs the configured player as a child process on the tokio runtime.
pub struct ProcessPlayer {
    config: PlaybackConfig,
    finished: Arc<AtomicBool>,
    abort_tx: Option<oneshot::Sender<()>>,
}

impl ProcessPlayer {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            finished: Arc::new(AtomicBool::new(true)),
            abort_tx: None,
        }
    }
}

impl PlaybackController for ProcessPlayer {
    fn start(&mut self, gesture: GestureSymbol) -> Result<(), PlaybackError> {
        self.abort();
        // Fresh flag per run so a late exit of an aborted child cannot mark this one done.
        self.finished = Arc::new(AtomicBool::new(false));

        let media = self.config.media_for(gesture).to_path_buf();
        let spawned = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(&media)
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(source) => {
                // Nothing is playing; let the session fall back to Ready.
                self.finished = Arc::new(AtomicBool::new(true));
                return Err(PlaybackError::Spawn {
                    program: self.config.program.clone(),
                    source,
                });
            }
        };

        info!(%gesture, media = %media.display(), "playback started");

        let (abort_tx, abort_rx) = oneshot::channel();
        self.abort_tx = Some(abort_tx);
        let finished = Arc::clone(&self.finished);

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => info!("playback completed"),
                    Ok(status) => warn!(%status, "player exited with failure"),
                    Err(e) => error!(error = %e, "failed waiting on player"),
                },
                _ = abort_rx => {
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "failed to stop player");
                    }
                    info!("playback aborted");
                }
            }
            finished.store(true, Ordering::Release);
        });

        Ok(())
    }

    fn abort(&mut self) {
        if let Some(tx) = self.abort_tx.take() {
            // The task may already have finished and dropped the receiver.
            let _ = tx.send(());
        }
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}
