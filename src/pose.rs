// src/pose.rs - Per-pose hysteresis state machines
use crate::envelope::PoseEnvelope;
use crate::features::OffsetFeatures;
use crate::gesture::GestureSymbol;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosePhase {
    Init,
    Detecting,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoseState {
    pub phase: PosePhase,
    /// Consecutive matching ticks in the current `Detecting` run.
    pub detecting_ticks: u32,
    /// Consecutive non-matching ticks since entering `Lost`.
    pub lost_ticks: u32,
}

impl Default for PoseState {
    fn default() -> Self {
        Self {
            phase: PosePhase::Init,
            detecting_ticks: 0,
            lost_ticks: 0,
        }
    }
}

/// Dwell and dropout limits shared by every static pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldTiming {
    pub detect_confirm_ticks: u32,
    pub lost_reset_ticks: u32,
}

/// Static pose held for a dwell, with a `Lost` buffer for short dropouts.
#[derive(Debug, Clone)]
pub struct PoseMachine {
    symbol: GestureSymbol,
    envelope: PoseEnvelope,
    timing: HoldTiming,
    state: PoseState,
}

impl PoseMachine {
    pub fn new(symbol: GestureSymbol, envelope: PoseEnvelope, timing: HoldTiming) -> Self {
        Self {
            symbol,
            envelope,
            timing,
            state: PoseState::default(),
        }
    }

    pub fn symbol(&self) -> GestureSymbol {
        self.symbol
    }

    pub fn state(&self) -> PoseState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = PoseState::default();
    }

    /// Steps the machine by one tick. Returns true on the tick the pose is confirmed.
    pub fn advance(&mut self, features: &OffsetFeatures) -> bool {
        let matched = self.envelope.matches(features);

        match self.state.phase {
            PosePhase::Init => {
                if matched {
                    debug!(pose = %self.symbol, "detecting");
                    self.state.phase = PosePhase::Detecting;
                    self.state.detecting_ticks = 0;
                    return self.count_match();
                }
                false
            }
            PosePhase::Detecting => {
                if matched {
                    return self.count_match();
                }
                debug!(pose = %self.symbol, ticks = self.state.detecting_ticks, "detection lost");
                self.state.phase = PosePhase::Lost;
                self.state.lost_ticks = 0;
                false
            }
            PosePhase::Lost => {
                if matched {
                    // Dwell restarts from this tick; earlier progress is not restored.
                    self.state.phase = PosePhase::Detecting;
                    self.state.lost_ticks = 0;
                    self.state.detecting_ticks = 0;
                    return self.count_match();
                }
                if self.state.lost_ticks >= self.timing.lost_reset_ticks {
                    debug!(pose = %self.symbol, "lost timeout, back to init");
                    self.reset();
                } else {
                    self.state.lost_ticks += 1;
                }
                false
            }
        }
    }

    fn count_match(&mut self) -> bool {
        self.state.detecting_ticks += 1;
        debug!(pose = %self.symbol, ticks = self.state.detecting_ticks, "holding");

        if self.state.detecting_ticks >= self.timing.detect_confirm_ticks {
            self.reset();
            return true;
        }
        false
    }
}

/// One stage of a movement sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub name: String,
    pub envelope: PoseEnvelope,
}

/// A pose made of consecutive envelopes, e.g. arms-down, arms-up, arms-down.
///
/// The machine waits on one step at a time. The first step waits indefinitely;
/// every later step must match within `step_timeout_ticks` of the previous one
/// or the machine falls back to the first step.
#[derive(Debug, Clone)]
pub struct SequenceMachine {
    symbol: GestureSymbol,
    steps: Vec<SequenceStep>,
    step_timeout_ticks: u32,
    step: usize,
    ticks_in_step: u32,
}

impl SequenceMachine {
    pub fn new(symbol: GestureSymbol, steps: Vec<SequenceStep>, step_timeout_ticks: u32) -> Self {
        Self {
            symbol,
            steps,
            step_timeout_ticks,
            step: 0,
            ticks_in_step: 0,
        }
    }

    pub fn symbol(&self) -> GestureSymbol {
        self.symbol
    }

    /// Index of the step currently awaited.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn step_name(&self) -> &str {
        self.steps
            .get(self.step)
            .map(|s| s.name.as_str())
            .unwrap_or("")
    }

    pub fn ticks_in_step(&self) -> u32 {
        self.ticks_in_step
    }

    pub fn reset(&mut self) {
        self.step = 0;
        self.ticks_in_step = 0;
    }

    pub fn advance(&mut self, features: &OffsetFeatures) -> bool {
        let Some(current) = self.steps.get(self.step) else {
            return false;
        };

        if current.envelope.matches(features) {
            if self.step + 1 == self.steps.len() {
                self.reset();
                return true;
            }
            self.step += 1;
            self.ticks_in_step = 0;
            debug!(pose = %self.symbol, step = self.step_name(), "sequence advanced");
        } else if self.step > 0 {
            if self.ticks_in_step >= self.step_timeout_ticks {
                debug!(pose = %self.symbol, step = self.step_name(), "sequence timed out");
                self.reset();
            } else {
                self.ticks_in_step += 1;
            }
        }
        false
    }
}

/// Any pose recognizer the dispatcher can drive.
#[derive(Debug, Clone)]
pub enum Recognizer {
    Hold(PoseMachine),
    Sequence(SequenceMachine),
}

impl Recognizer {
    pub fn symbol(&self) -> GestureSymbol {
        match self {
            Self::Hold(m) => m.symbol(),
            Self::Sequence(m) => m.symbol(),
        }
    }

    pub fn advance(&mut self, features: &OffsetFeatures) -> bool {
        match self {
            Self::Hold(m) => m.advance(features),
            Self::Sequence(m) => m.advance(features),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Hold(m) => m.reset(),
            Self::Sequence(m) => m.reset(),
        }
    }

    /// True when the recognizer holds no partial progress.
    pub fn is_idle(&self) -> bool {
        match self {
            Self::Hold(m) => m.state() == PoseState::default(),
            Self::Sequence(m) => m.step() == 0 && m.ticks_in_step() == 0,
        }
    }
}
