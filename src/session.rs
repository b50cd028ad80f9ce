// src/session.rs - Top-level occupant/playback state machine
use crate::dispatcher::GestureDispatcher;
use crate::features::{FeatureError, JointFrame, OffsetFeatures};
use crate::gesture::GestureSymbol;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ready,
    PlaybackStart,
    PlaybackUnderway,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::PlaybackStart => "playback-start",
            Self::PlaybackUnderway => "playback-underway",
        }
    }
}

/// Everything the session consumes in one tick.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub tracked_count: usize,
    /// Recognition id of the tracked person; 0 means a fresh occupant.
    pub person_id: Option<u32>,
    /// Joints of the tracked person; only consulted when exactly one person is tracked.
    pub joints: Option<JointFrame>,
    pub playback_finished: bool,
}

/// Side effects for the collaborators, executed by the caller in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEffect {
    ClearRecognition,
    StartPlayback(GestureSymbol),
    AbortPlayback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    pub previous: SessionState,
    pub state: SessionState,
    pub gesture: GestureSymbol,
    pub effects: Vec<SessionEffect>,
}

impl TickOutcome {
    pub fn transitioned(&self) -> bool {
        self.previous != self.state
    }
}

pub struct Session {
    state: SessionState,
    dispatcher: GestureDispatcher,
    pending: GestureSymbol,
    ticks: u64,
}

impl Session {
    pub fn new(dispatcher: GestureDispatcher) -> Self {
        Self {
            state: SessionState::Idle,
            dispatcher,
            pending: GestureSymbol::None,
            ticks: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dispatcher(&self) -> &GestureDispatcher {
        &self.dispatcher
    }

    /// Advances the session by one tick.
    ///
    /// An `Err` means the tick was skipped because the joint frame could not
    /// be used: no gesture was evaluated and the session state is unchanged.
    pub fn tick(&mut self, input: &TickInput) -> Result<TickOutcome, FeatureError> {
        self.ticks += 1;
        let previous = self.state;
        let mut gesture = GestureSymbol::None;
        let mut effects = Vec::new();

        match self.state {
            SessionState::Idle => {
                if input.tracked_count == 1 {
                    effects.push(SessionEffect::ClearRecognition);
                    self.dispatcher.reset_all();
                    // A stale id waits for the clear to take effect on a later frame.
                    if input.person_id == Some(0) {
                        self.state = SessionState::Ready;
                    }
                }
            }
            SessionState::Ready => {
                if input.tracked_count != 1 {
                    self.enter_idle();
                } else {
                    gesture = self.evaluate(input)?;
                    if gesture.is_playable() {
                        self.pending = gesture;
                        self.state = SessionState::PlaybackStart;
                    }
                }
            }
            SessionState::PlaybackStart => {
                effects.push(SessionEffect::StartPlayback(self.pending));
                self.state = SessionState::PlaybackUnderway;
            }
            SessionState::PlaybackUnderway => {
                if input.tracked_count == 1 {
                    gesture = self.evaluate(input)?;
                    if gesture == GestureSymbol::Cancel {
                        info!("cancel gesture during playback");
                        effects.push(SessionEffect::AbortPlayback);
                    }
                }
                if input.playback_finished {
                    self.pending = GestureSymbol::None;
                    self.state = SessionState::Ready;
                }
            }
        }

        if previous != self.state {
            info!(
                tick = self.ticks,
                from = previous.as_str(),
                to = self.state.as_str(),
                "session transition"
            );
        }

        Ok(TickOutcome {
            tick: self.ticks,
            previous,
            state: self.state,
            gesture,
            effects,
        })
    }

    fn evaluate(&mut self, input: &TickInput) -> Result<GestureSymbol, FeatureError> {
        let joints = input
            .joints
            .as_ref()
            .ok_or(FeatureError::NoFrame)?;
        let features = OffsetFeatures::extract(joints)?;
        Ok(self.dispatcher.advance(&features))
    }

    fn enter_idle(&mut self) {
        self.dispatcher.reset_all();
        self.pending = GestureSymbol::None;
        self.state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GestureConfig;
    use crate::pose::{PosePhase, Recognizer};

    fn session() -> Session {
        Session::new(GestureDispatcher::from_config(&GestureConfig::default()))
    }

    fn ready_session() -> Session {
        let mut s = session();
        let out = s.tick(&present(OffsetFeatures::new(0, 0, 0, 0))).unwrap();
        assert_eq!(out.state, SessionState::Ready);
        s
    }

    fn present(features: OffsetFeatures) -> TickInput {
        TickInput {
            tracked_count: 1,
            person_id: Some(0),
            joints: Some(JointFrame::from_offsets(features)),
            playback_finished: false,
        }
    }

    fn absent(count: usize) -> TickInput {
        TickInput {
            tracked_count: count,
            person_id: None,
            joints: None,
            playback_finished: false,
        }
    }

    fn power_pose() -> OffsetFeatures {
        OffsetFeatures::new(20, 20, -20, 20)
    }

    fn miss() -> OffsetFeatures {
        OffsetFeatures::new(999, 20, -20, 20)
    }

    fn cancel_pose() -> OffsetFeatures {
        OffsetFeatures::new(0, 60, 5, 60)
    }

    fn power_phase(s: &Session) -> PosePhase {
        match s.dispatcher().find(GestureSymbol::PowerPose) {
            Some(Recognizer::Hold(m)) => m.state().phase,
            _ => panic!("power pose recognizer missing"),
        }
    }

    #[test]
    fn test_idle_to_ready_clears_recognition() {
        let mut s = session();
        let out = s.tick(&absent(0)).unwrap();
        assert_eq!(out.state, SessionState::Idle);
        assert!(out.effects.is_empty());

        let out = s.tick(&absent(2)).unwrap();
        assert_eq!(out.state, SessionState::Idle);

        let out = s.tick(&present(power_pose())).unwrap();
        assert_eq!(out.previous, SessionState::Idle);
        assert_eq!(out.state, SessionState::Ready);
        assert_eq!(out.effects, vec![SessionEffect::ClearRecognition]);
        // Entry tick does not evaluate gestures.
        assert!(s.dispatcher().is_idle());
    }

    #[test]
    fn test_stale_identity_waits_for_clear() {
        let mut s = session();
        let mut returning = present(power_pose());
        returning.person_id = Some(3);

        let out = s.tick(&returning).unwrap();
        assert_eq!(out.state, SessionState::Idle);
        assert_eq!(out.effects, vec![SessionEffect::ClearRecognition]);

        let out = s.tick(&present(power_pose())).unwrap();
        assert_eq!(out.state, SessionState::Ready);
    }

    #[test]
    fn test_scenario_power_pose_hold_starts_playback() {
        let mut s = ready_session();

        for tick in 1..15 {
            let out = s.tick(&present(power_pose())).unwrap();
            assert_eq!(out.gesture, GestureSymbol::None, "early confirm at {}", tick);
            assert_eq!(out.state, SessionState::Ready);
        }

        // Tick 15: confirmed, PlaybackStart takes effect for the next tick.
        let out = s.tick(&present(power_pose())).unwrap();
        assert_eq!(out.gesture, GestureSymbol::PowerPose);
        assert_eq!(out.state, SessionState::PlaybackStart);
        assert!(out.effects.is_empty());

        // Tick 16: PlaybackStart issues playback.
        let out = s.tick(&present(power_pose())).unwrap();
        assert_eq!(out.previous, SessionState::PlaybackStart);
        assert_eq!(
            out.effects,
            vec![SessionEffect::StartPlayback(GestureSymbol::PowerPose)]
        );
        assert_eq!(out.state, SessionState::PlaybackUnderway);

        // Tick 17: underway.
        let out = s.tick(&present(OffsetFeatures::new(0, 0, 0, 0))).unwrap();
        assert_eq!(out.previous, SessionState::PlaybackUnderway);
        assert_eq!(out.state, SessionState::PlaybackUnderway);
    }

    #[test]
    fn test_scenario_single_dropout_delays_confirmation() {
        let mut s = ready_session();
        let mut confirmed_at = None;

        for tick in 1..=30 {
            let features = if tick == 8 { miss() } else { power_pose() };
            let out = s.tick(&present(features)).unwrap();
            match tick {
                8 => assert_eq!(power_phase(&s), PosePhase::Lost),
                9 => assert_eq!(power_phase(&s), PosePhase::Detecting),
                _ => {}
            }
            if out.gesture == GestureSymbol::PowerPose {
                confirmed_at = Some(tick);
                break;
            }
        }
        assert_eq!(confirmed_at, Some(23));
    }

    #[test]
    fn test_scenario_person_lost_mid_detection() {
        let mut s = ready_session();
        for _ in 1..5 {
            s.tick(&present(power_pose())).unwrap();
        }
        assert_eq!(power_phase(&s), PosePhase::Detecting);

        let out = s.tick(&absent(0)).unwrap();
        assert_eq!(out.state, SessionState::Idle);
        assert!(s.dispatcher().is_idle());

        // Person returns: one tick to re-enter Ready, then a full dwell.
        let out = s.tick(&present(power_pose())).unwrap();
        assert_eq!(out.state, SessionState::Ready);
        for _ in 1..15 {
            let out = s.tick(&present(power_pose())).unwrap();
            assert_eq!(out.gesture, GestureSymbol::None);
        }
        let out = s.tick(&present(power_pose())).unwrap();
        assert_eq!(out.gesture, GestureSymbol::PowerPose);
    }

    #[test]
    fn test_occupancy_toggling_leaks_nothing() {
        let mut s = session();
        for round in 0..10 {
            let out = s.tick(&present(power_pose())).unwrap();
            assert_eq!(out.state, SessionState::Ready);
            assert_eq!(out.effects, vec![SessionEffect::ClearRecognition]);

            let count = if round % 2 == 0 { 0 } else { 2 };
            let out = s.tick(&absent(count)).unwrap();
            assert_eq!(out.state, SessionState::Idle);
            assert!(out.effects.is_empty());
            assert!(s.dispatcher().is_idle());
        }
    }

    #[test]
    fn test_invalid_frame_skips_tick() {
        let mut s = ready_session();
        for _ in 0..3 {
            s.tick(&present(power_pose())).unwrap();
        }

        let short = TickInput {
            tracked_count: 1,
            person_id: Some(0),
            joints: Some(JointFrame::from_pairs(&[[0, 0], [1, 1]])),
            playback_finished: false,
        };
        assert!(s.tick(&short).is_err());
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(power_phase(&s), PosePhase::Detecting);

        // Missing joints entirely behaves the same.
        assert!(s.tick(&absent(1)).is_err());
        assert_eq!(s.state(), SessionState::Ready);
    }

    fn underway_session() -> Session {
        let mut s = ready_session();
        for _ in 0..15 {
            s.tick(&present(power_pose())).unwrap();
        }
        s.tick(&present(power_pose())).unwrap();
        assert_eq!(s.state(), SessionState::PlaybackUnderway);
        s
    }

    #[test]
    fn test_cancel_aborts_without_state_change() {
        let mut s = underway_session();
        let mut aborts = 0;
        for _ in 0..15 {
            let out = s.tick(&present(cancel_pose())).unwrap();
            aborts += out
                .effects
                .iter()
                .filter(|e| **e == SessionEffect::AbortPlayback)
                .count();
            assert_eq!(out.state, SessionState::PlaybackUnderway);
        }
        assert_eq!(aborts, 1);

        let mut done = present(cancel_pose());
        done.playback_finished = true;
        let out = s.tick(&done).unwrap();
        assert_eq!(out.state, SessionState::Ready);
    }

    #[test]
    fn test_playback_finishes_with_nobody_tracked() {
        let mut s = underway_session();
        let out = s.tick(&absent(0)).unwrap();
        assert_eq!(out.state, SessionState::PlaybackUnderway);

        let finished = TickInput {
            tracked_count: 0,
            person_id: None,
            joints: None,
            playback_finished: true,
        };
        let out = s.tick(&finished).unwrap();
        assert_eq!(out.state, SessionState::Ready);

        // Ready with nobody present falls back to idle on the next tick.
        let out = s.tick(&absent(0)).unwrap();
        assert_eq!(out.state, SessionState::Idle);
    }

    #[test]
    fn test_cancel_does_not_start_playback_from_ready() {
        let mut s = ready_session();
        for _ in 0..15 {
            let out = s.tick(&present(cancel_pose())).unwrap();
            assert_eq!(out.state, SessionState::Ready);
        }
    }
}
