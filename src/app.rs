// src/app.rs - Tick loop wiring the tracker, session and collaborators together
use crate::config::AppConfig;
use crate::dispatcher::GestureDispatcher;
use crate::gesture::GestureSymbol;
use crate::playback::PlaybackController;
use crate::recorder::SessionRecorder;
use crate::session::{Session, SessionEffect, SessionState, TickInput, TickOutcome};
use crate::tracking::{TrackedFrame, TrackingSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub skipped: u64,
    pub gestures: Vec<(u64, GestureSymbol)>,
    pub playbacks: u32,
    pub aborts: u32,
}

pub struct PosePlayerApp<P: PlaybackController> {
    session: Session,
    source: TrackingSource,
    playback: P,
    recorder: Option<SessionRecorder>,
    tick_period: Duration,
    quit: Arc<AtomicBool>,
    summary: RunSummary,
}

impl<P: PlaybackController> PosePlayerApp<P> {
    pub fn new(config: &AppConfig, source: TrackingSource, playback: P) -> Self {
        let dispatcher = GestureDispatcher::from_config(&config.gestures);
        Self {
            session: Session::new(dispatcher),
            source,
            playback,
            recorder: None,
            tick_period: Duration::from_secs_f64(1.0 / f64::from(config.runtime.tick_rate_hz)),
            quit: Arc::new(AtomicBool::new(false)),
            summary: RunSummary::default(),
        }
    }

    pub fn with_recorder(mut self, recorder: SessionRecorder) -> Self {
        info!(path = %recorder.path().display(), "recording session events");
        self.recorder = Some(recorder);
        self
    }

    /// Flag checked once per tick boundary; set it to stop the loop.
    pub fn quit_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn playback(&self) -> &P {
        &self.playback
    }

    /// Ticks until the source is exhausted or quit is requested, then shuts down.
    pub async fn run(&mut self) -> RunSummary {
        let mut ticker = interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if self.quit.load(Ordering::Acquire) {
                info!("quit requested");
                break;
            }
            if !self.step() {
                info!("tracking source exhausted");
                break;
            }
        }

        self.shutdown();
        self.summary.clone()
    }

    /// Runs one tick. Returns false once the tracking source has no more frames.
    pub fn step(&mut self) -> bool {
        let frame = match self.source.next_frame() {
            None => return false,
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                warn!(error = %e, "tracker failed to process frame, skipping tick");
                self.summary.skipped += 1;
                return true;
            }
        };

        let input = self.tick_input(&frame);
        match self.session.tick(&input) {
            Ok(outcome) => self.apply(&outcome),
            Err(e) => {
                warn!(error = %e, "invalid joint frame, skipping tick");
                self.summary.skipped += 1;
            }
        }
        self.summary.ticks += 1;
        true
    }

    fn tick_input(&self, frame: &TrackedFrame) -> TickInput {
        TickInput {
            tracked_count: frame.tracked_count(),
            person_id: frame.sole_person().map(|p| p.id),
            joints: frame.sole_person().map(|p| p.joints.clone()),
            playback_finished: self.playback.is_finished(),
        }
    }

    fn apply(&mut self, outcome: &TickOutcome) {
        if outcome.gesture != GestureSymbol::None {
            self.summary.gestures.push((outcome.tick, outcome.gesture));
        }

        for effect in &outcome.effects {
            match *effect {
                SessionEffect::ClearRecognition => self.source.clear_recognition(),
                SessionEffect::StartPlayback(gesture) => {
                    self.summary.playbacks += 1;
                    if let Err(e) = self.playback.start(gesture) {
                        error!(error = %e, %gesture, "could not start playback");
                    }
                }
                SessionEffect::AbortPlayback => {
                    self.summary.aborts += 1;
                    self.playback.abort();
                }
            }
        }

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(outcome) {
                warn!(
                    error = %e,
                    path = %recorder.path().display(),
                    "session log failed, recording disabled"
                );
                self.recorder = None;
            }
        }
    }

    fn shutdown(&mut self) {
        if !self.playback.is_finished() {
            info!("stopping active playback");
            self.playback.abort();
        }
        if let Some(mut recorder) = self.recorder.take() {
            match recorder.flush() {
                Ok(()) => info!(
                    rows = recorder.rows(),
                    path = %recorder.path().display(),
                    "session log written"
                ),
                Err(e) => warn!(error = %e, "failed to flush session log"),
            }
        }
        info!(
            ticks = self.summary.ticks,
            skipped = self.summary.skipped,
            playbacks = self.summary.playbacks,
            "session loop stopped"
        );
    }
}
