// src/recorder.rs - CSV log of session activity
use crate::gesture::GestureSymbol;
use crate::session::{SessionEffect, TickOutcome};
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    timestamp: String,
    tick: u64,
    event: &'a str,
    from: &'a str,
    to: &'a str,
    gesture: Option<&'a str>,
}

pub struct SessionRecorder {
    path: PathBuf,
    writer: Writer<File>,
    rows: usize,
}

impl SessionRecorder {
    /// Creates `session_<timestamp>_<uuid>.csv` inside `output_dir`.
    pub fn create(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating {}", output_dir.display()))?;

        let name = format!(
            "session_{}_{}.csv",
            Local::now().format("%Y%m%d_%H%M%S"),
            Uuid::new_v4().simple()
        );
        let path = output_dir.join(name);
        let file =
            File::create(&path).with_context(|| format!("creating {}", path.display()))?;

        Ok(Self::from_file(path, file))
    }

    /// Wraps an already opened file; `path` is only used for reporting.
    pub fn from_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            writer: Writer::from_writer(file),
            rows: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Writes one row per confirmed gesture, transition and effect of the tick.
    pub fn record(&mut self, outcome: &TickOutcome) -> Result<()> {
        let from = outcome.previous.as_str();
        let to = outcome.state.as_str();
        let timestamp = Local::now().to_rfc3339();

        let mut rows = Vec::new();
        if outcome.gesture != GestureSymbol::None {
            rows.push(("gesture", Some(outcome.gesture.as_str())));
        }
        if outcome.transitioned() {
            rows.push(("transition", None));
        }
        for effect in &outcome.effects {
            rows.push(match effect {
                SessionEffect::ClearRecognition => ("clear-recognition", None),
                SessionEffect::StartPlayback(g) => ("start-playback", Some(g.as_str())),
                SessionEffect::AbortPlayback => ("abort-playback", None),
            });
        }

        for (event, gesture) in rows {
            self.writer.serialize(EventRecord {
                timestamp: timestamp.clone(),
                tick: outcome.tick,
                event,
                from,
                to,
                gesture,
            })?;
            self.rows += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
