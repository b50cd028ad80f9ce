// src/dispatcher.rs - Runs every pose machine once per tick
use crate::config::GestureConfig;
use crate::features::OffsetFeatures;
use crate::gesture::GestureSymbol;
use crate::pose::{PoseMachine, Recognizer, SequenceMachine};
use tracing::info;

pub struct GestureDispatcher {
    recognizers: Vec<Recognizer>,
}

impl GestureDispatcher {
    pub fn new(recognizers: Vec<Recognizer>) -> Self {
        Self { recognizers }
    }

    pub fn from_config(config: &GestureConfig) -> Self {
        let timing = config.timing();
        let holds = config
            .poses
            .iter()
            .map(|p| Recognizer::Hold(PoseMachine::new(p.symbol, p.envelope, timing)));
        let sequences = config.sequences.iter().map(|s| {
            Recognizer::Sequence(SequenceMachine::new(
                s.symbol,
                s.steps.clone(),
                s.step_timeout_ticks,
            ))
        });

        Self::new(holds.chain(sequences).collect())
    }

    pub fn recognizers(&self) -> &[Recognizer] {
        &self.recognizers
    }

    pub fn find(&self, symbol: GestureSymbol) -> Option<&Recognizer> {
        self.recognizers.iter().find(|r| r.symbol() == symbol)
    }

    /// Advances every recognizer once and returns the first confirmation in
    /// evaluation order. Any confirmation clears progress on all recognizers.
    pub fn advance(&mut self, features: &OffsetFeatures) -> GestureSymbol {
        let mut confirmed = GestureSymbol::None;

        for recognizer in self.recognizers.iter_mut() {
            if recognizer.advance(features) && confirmed == GestureSymbol::None {
                confirmed = recognizer.symbol();
            }
        }

        if confirmed != GestureSymbol::None {
            info!(gesture = %confirmed, "gesture confirmed");
            self.reset_all();
        }
        confirmed
    }

    pub fn reset_all(&mut self) {
        for recognizer in self.recognizers.iter_mut() {
            recognizer.reset();
        }
    }

    pub fn is_idle(&self) -> bool {
        self.recognizers.iter().all(Recognizer::is_idle)
    }
}
