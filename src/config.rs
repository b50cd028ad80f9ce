// src/config.rs - Tunable thresholds, envelopes and collaborator settings
use crate::envelope::PoseEnvelope;
use crate::gesture::GestureSymbol;
use crate::pose::{HoldTiming, SequenceStep};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("pose {0} is configured more than once")]
    DuplicateSymbol(GestureSymbol),
    #[error("the None symbol cannot be assigned to a pose")]
    NoneSymbol,
    #[error("pose {0} has an envelope no frame can satisfy")]
    Unsatisfiable(GestureSymbol),
    #[error("sequence pose {0} has no steps")]
    EmptySequence(GestureSymbol),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gestures: GestureConfig,
    pub playback: PlaybackConfig,
    pub runtime: RuntimeConfig,
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticPoseConfig {
    pub symbol: GestureSymbol,
    pub envelope: PoseEnvelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencePoseConfig {
    pub symbol: GestureSymbol,
    pub step_timeout_ticks: u32,
    pub steps: Vec<SequenceStep>,
}

/// Poses are evaluated static-first, each list in the order given here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub detect_confirm_ticks: u32,
    pub lost_reset_ticks: u32,
    pub poses: Vec<StaticPoseConfig>,
    pub sequences: Vec<SequencePoseConfig>,
}

impl GestureConfig {
    pub fn timing(&self) -> HoldTiming {
        HoldTiming {
            detect_confirm_ticks: self.detect_confirm_ticks,
            lost_reset_ticks: self.lost_reset_ticks,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        let pose = |symbol, envelope| StaticPoseConfig { symbol, envelope };
        let step = |name: &str, envelope| SequenceStep {
            name: name.to_string(),
            envelope,
        };

        Self {
            detect_confirm_ticks: 15,
            lost_reset_ticks: 10,
            poses: vec![
                pose(GestureSymbol::Usain, PoseEnvelope::usain()),
                pose(GestureSymbol::Victory, PoseEnvelope::victory()),
                pose(GestureSymbol::PowerPose, PoseEnvelope::power_pose()),
                pose(GestureSymbol::TPose, PoseEnvelope::t_pose()),
                pose(GestureSymbol::Cancel, PoseEnvelope::o_pose()),
            ],
            sequences: vec![SequencePoseConfig {
                symbol: GestureSymbol::Flying,
                step_timeout_ticks: 30,
                steps: vec![
                    step("arms-down-baseline", PoseEnvelope::arms_down()),
                    step("arms-up", PoseEnvelope::arms_up()),
                    step("arms-down-confirm", PoseEnvelope::arms_down()),
                ],
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Media player executable; the media path is appended as the last argument.
    pub program: String,
    pub args: Vec<String>,
    pub media: BTreeMap<GestureSymbol, PathBuf>,
    pub default_media: PathBuf,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            program: "cvlc".to_string(),
            args: vec!["-f".to_string(), "--play-and-exit".to_string()],
            media: BTreeMap::new(),
            default_media: PathBuf::from("videos/default.mov"),
        }
    }
}

impl PlaybackConfig {
    pub fn media_for(&self, gesture: GestureSymbol) -> &Path {
        self.media
            .get(&gesture)
            .map(PathBuf::as_path)
            .unwrap_or(self.default_media.as_path())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tick_rate_hz: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick_rate_hz: 30 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub enabled: bool,
    /// Defaults to the platform data directory when unset.
    pub output_dir: Option<PathBuf>,
}

impl RecorderConfig {
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "pose_player")
                .map(|dirs| dirs.data_dir().join("sessions"))
                .unwrap_or_else(|| PathBuf::from("./sessions"))
        })
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pose_player")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path must exist; the default location is optional.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gestures = &self.gestures;
        if gestures.detect_confirm_ticks == 0 {
            return Err(ConfigError::Zero("detect_confirm_ticks"));
        }
        if self.runtime.tick_rate_hz == 0 {
            return Err(ConfigError::Zero("tick_rate_hz"));
        }

        let mut seen = HashSet::new();
        let symbols = gestures
            .poses
            .iter()
            .map(|p| p.symbol)
            .chain(gestures.sequences.iter().map(|s| s.symbol));
        for symbol in symbols {
            if symbol == GestureSymbol::None {
                return Err(ConfigError::NoneSymbol);
            }
            if !seen.insert(symbol) {
                return Err(ConfigError::DuplicateSymbol(symbol));
            }
        }

        for pose in &gestures.poses {
            if !pose.envelope.is_satisfiable() {
                return Err(ConfigError::Unsatisfiable(pose.symbol));
            }
        }
        for seq in &gestures.sequences {
            if seq.steps.is_empty() {
                return Err(ConfigError::EmptySequence(seq.symbol));
            }
            if seq.steps.iter().any(|s| !s.envelope.is_satisfiable()) {
                return Err(ConfigError::Unsatisfiable(seq.symbol));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::FeatureRange;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.gestures.detect_confirm_ticks, 15);
        assert_eq!(config.gestures.poses.len(), 5);
        assert_eq!(config.gestures.sequences[0].steps.len(), 3);
    }

    #[test]
    fn test_default_round_trips_through_json() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "gestures": {{ "detect_confirm_ticks": 20 }}, "runtime": {{ "tick_rate_hz": 15 }} }}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.gestures.detect_confirm_ticks, 20);
        assert_eq!(config.gestures.lost_reset_ticks, 10);
        assert_eq!(config.gestures.poses.len(), 5);
        assert_eq!(config.runtime.tick_rate_hz, 15);
        assert_eq!(config.playback.program, "cvlc");
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_or_default(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_tables() {
        let mut config = AppConfig::default();
        config.gestures.detect_confirm_ticks = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Zero(_))));

        let mut config = AppConfig::default();
        config.gestures.poses[1].symbol = GestureSymbol::Usain;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateSymbol(GestureSymbol::Usain))
        ));

        let mut config = AppConfig::default();
        config.gestures.poses[0].symbol = GestureSymbol::None;
        assert!(matches!(config.validate(), Err(ConfigError::NoneSymbol)));

        let mut config = AppConfig::default();
        config.gestures.poses[2].envelope.left_x = FeatureRange::inclusive(10, 5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Unsatisfiable(GestureSymbol::PowerPose))
        ));

        let mut config = AppConfig::default();
        config.gestures.sequences[0].steps.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptySequence(GestureSymbol::Flying))
        ));
    }

    #[test]
    fn test_media_lookup_falls_back_to_default() {
        let mut playback = PlaybackConfig::default();
        playback
            .media
            .insert(GestureSymbol::Victory, PathBuf::from("videos/victory.mov"));
        assert_eq!(
            playback.media_for(GestureSymbol::Victory),
            Path::new("videos/victory.mov")
        );
        assert_eq!(
            playback.media_for(GestureSymbol::Usain),
            Path::new("videos/default.mov")
        );
    }
}
