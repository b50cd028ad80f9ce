// src/tracking.rs - Person tracking sources feeding the tick loop
use crate::features::{JointFrame, OffsetFeatures};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("failed to open recording {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read recording line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid frame on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct TrackedPerson {
    pub id: u32,
    pub joints: JointFrame,
}

/// One tick of tracker output.
#[derive(Debug, Clone, Default)]
pub struct TrackedFrame {
    pub people: Vec<TrackedPerson>,
}

impl TrackedFrame {
    pub fn tracked_count(&self) -> usize {
        self.people.len()
    }

    /// Joints of the single occupant, if exactly one person is tracked.
    pub fn sole_person(&self) -> Option<&TrackedPerson> {
        match self.people.as_slice() {
            [person] => Some(person),
            _ => None,
        }
    }
}

/// On-disk shape of one recorded tick (one JSON object per line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    #[serde(default)]
    pub people: Vec<RecordedPerson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedPerson {
    pub id: u32,
    pub joints: Vec<[i32; 2]>,
}

/// Hands out stable local ids for tracker ids. Clearing it makes the next
/// occupant id 0 again.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    ids: HashMap<u32, u32>,
}

impl IdentityRegistry {
    pub fn resolve(&mut self, raw: u32) -> u32 {
        let next = self.ids.len() as u32;
        *self.ids.entry(raw).or_insert(next)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

pub struct ReplayReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl ReplayReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackingError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| TrackingError::Open {
            path: path.clone(),
            source,
        })?;

        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_recorded(&mut self) -> Option<Result<RecordedFrame, TrackingError>> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(TrackingError::Read {
                        line: self.line_no,
                        source,
                    }))
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line).map_err(|source| TrackingError::Parse {
                    line: self.line_no,
                    source,
                }),
            );
        }
    }
}

/// What the simulated tracker shows for a stretch of ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scene {
    Empty,
    Crowd(usize),
    Person(OffsetFeatures),
}

/// Scripted occupant for demos and dry runs, looping forever.
pub struct Simulator {
    script: Vec<(u32, Scene)>,
    segment: usize,
    tick_in_segment: u32,
    /// Every n-th tick of a `Person` scene drops one hand out of frame.
    dropout_every: Option<u32>,
}

impl Simulator {
    pub fn new(script: Vec<(u32, Scene)>) -> Self {
        Self {
            script,
            segment: 0,
            tick_in_segment: 0,
            dropout_every: None,
        }
    }

    pub fn with_dropouts(mut self, every: u32) -> Self {
        self.dropout_every = (every > 0).then_some(every);
        self
    }

    /// Walk in, hold a power pose, wait through playback, try a cancel, leave.
    pub fn demo() -> Self {
        let rest = OffsetFeatures::new(-5, -150, 5, -150);
        Self::new(vec![
            (30, Scene::Empty),
            (20, Scene::Person(rest)),
            (30, Scene::Person(OffsetFeatures::new(20, 20, -20, 20))),
            (90, Scene::Person(rest)),
            (25, Scene::Person(OffsetFeatures::new(0, 60, 5, 60))),
            (30, Scene::Person(rest)),
            (30, Scene::Crowd(2)),
        ])
        .with_dropouts(20)
    }

    fn next_scene(&mut self) -> Option<(Scene, u32)> {
        if self.script.is_empty() {
            return None;
        }
        while self.tick_in_segment >= self.script[self.segment].0 {
            self.tick_in_segment = 0;
            self.segment = (self.segment + 1) % self.script.len();
            if self.script.iter().all(|(len, _)| *len == 0) {
                return None;
            }
        }
        let scene = self.script[self.segment].1;
        let tick = self.tick_in_segment;
        self.tick_in_segment += 1;
        Some((scene, tick))
    }

    fn next_frame(&mut self) -> Option<TrackedFrame> {
        let (scene, tick) = self.next_scene()?;
        let people = match scene {
            Scene::Empty => Vec::new(),
            Scene::Crowd(n) => (0..n as u32)
                .map(|id| TrackedPerson {
                    id,
                    joints: JointFrame::from_offsets(OffsetFeatures::new(0, -150, 0, -150)),
                })
                .collect(),
            Scene::Person(features) => {
                let dropout = self
                    .dropout_every
                    .is_some_and(|n| tick > 0 && tick % n == 0);
                let features = if dropout {
                    OffsetFeatures {
                        left: features.left.map(|v| v + 500),
                        ..features
                    }
                } else {
                    features
                };
                vec![TrackedPerson {
                    id: 0,
                    joints: JointFrame::from_offsets(features),
                }]
            }
        };
        Some(TrackedFrame { people })
    }
}

pub enum TrackingSource {
    Replay {
        reader: ReplayReader,
        identities: IdentityRegistry,
    },
    Simulated(Simulator),
}

impl TrackingSource {
    pub fn replay(path: impl AsRef<Path>) -> Result<Self, TrackingError> {
        let reader = ReplayReader::open(path)?;
        info!(path = %reader.path().display(), "replaying recorded frames");
        Ok(Self::Replay {
            reader,
            identities: IdentityRegistry::default(),
        })
    }

    pub fn simulated(simulator: Simulator) -> Self {
        info!("using simulated tracking");
        Self::Simulated(simulator)
    }

    /// `None` once the source is exhausted. An `Err` is a per-tick failure;
    /// the stream can continue afterwards.
    pub fn next_frame(&mut self) -> Option<Result<TrackedFrame, TrackingError>> {
        match self {
            Self::Replay { reader, identities } => {
                let recorded = match reader.next_recorded()? {
                    Ok(recorded) => recorded,
                    Err(e) => return Some(Err(e)),
                };
                let people = recorded
                    .people
                    .into_iter()
                    .map(|p| TrackedPerson {
                        id: identities.resolve(p.id),
                        joints: JointFrame::from_pairs(&p.joints),
                    })
                    .collect();
                Some(Ok(TrackedFrame { people }))
            }
            Self::Simulated(sim) => sim.next_frame().map(Ok),
        }
    }

    /// Forgets every recognized identity so the current occupant starts fresh.
    pub fn clear_recognition(&mut self) {
        match self {
            Self::Replay { identities, .. } => {
                debug!(known = identities.len(), "clearing recognition database");
                identities.clear();
            }
            Self::Simulated(_) => debug!("clearing recognition database"),
        }
    }
}
