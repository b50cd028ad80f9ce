// src/probe.rs - Per-frame offset dump for tuning pose envelopes
use crate::config::GestureConfig;
use crate::features::OffsetFeatures;
use crate::tracking::TrackingSource;
use anyhow::Result;
use std::io::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeStats {
    pub frames: usize,
    pub single_person: usize,
    pub invalid: usize,
}

/// Names of every envelope the features fall into, ignoring dwell time.
pub fn matching_envelopes(config: &GestureConfig, features: &OffsetFeatures) -> Vec<String> {
    let statics = config
        .poses
        .iter()
        .filter(|p| p.envelope.matches(features))
        .map(|p| p.symbol.to_string());
    let steps = config.sequences.iter().flat_map(|seq| {
        seq.steps
            .iter()
            .filter(|s| s.envelope.matches(features))
            .map(move |s| format!("{}:{}", seq.symbol, s.name))
    });
    statics.chain(steps).collect()
}

pub fn probe(
    source: &mut TrackingSource,
    config: &GestureConfig,
    out: &mut impl Write,
) -> Result<ProbeStats> {
    let mut stats = ProbeStats::default();

    while let Some(frame) = source.next_frame() {
        stats.frames += 1;
        let tick = stats.frames;

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                stats.invalid += 1;
                writeln!(out, "{:>6}  error: {}", tick, e)?;
                continue;
            }
        };

        let Some(person) = frame.sole_person() else {
            writeln!(out, "{:>6}  people {}", tick, frame.tracked_count())?;
            continue;
        };
        stats.single_person += 1;

        match OffsetFeatures::extract(&person.joints) {
            Ok(f) => {
                let matches = matching_envelopes(config, &f);
                writeln!(
                    out,
                    "{:>6}  L({:>4}, {:>4})  R({:>4}, {:>4})  {}",
                    tick,
                    f.left_x(),
                    f.left_y(),
                    f.right_x(),
                    f.right_y(),
                    if matches.is_empty() {
                        "-".to_string()
                    } else {
                        matches.join(", ")
                    }
                )?;
            }
            Err(e) => {
                stats.invalid += 1;
                writeln!(out, "{:>6}  invalid: {}", tick, e)?;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{RecordedFrame, RecordedPerson, Scene, Simulator};

    #[test]
    fn test_power_pose_also_reads_as_arms_down() {
        let config = GestureConfig::default();
        let names = matching_envelopes(&config, &OffsetFeatures::new(20, 20, -20, 20));
        assert_eq!(
            names,
            vec![
                "power-pose",
                "flying:arms-down-baseline",
                "flying:arms-down-confirm"
            ]
        );
    }

    #[test]
    fn test_probe_reports_each_frame() {
        let sim = Simulator::new(vec![
            (1, Scene::Empty),
            (2, Scene::Person(OffsetFeatures::new(0, 60, 5, 60))),
            (1, Scene::Crowd(3)),
        ]);
        // One pass over the looping script, written out as a recording.
        let mut source = TrackingSource::simulated(sim);
        let mut frames = Vec::new();
        for _ in 0..4 {
            frames.push(source.next_frame().unwrap().unwrap());
        }
        let mut replay = tempfile::NamedTempFile::new().unwrap();
        for frame in &frames {
            let recorded = RecordedFrame {
                people: frame
                    .people
                    .iter()
                    .map(|p| RecordedPerson {
                        id: p.id,
                        joints: p.joints.points().iter().map(|pt| [pt.x, pt.y]).collect(),
                    })
                    .collect(),
            };
            writeln!(replay, "{}", serde_json::to_string(&recorded).unwrap()).unwrap();
        }

        let mut source = TrackingSource::replay(replay.path()).unwrap();
        let mut out = Vec::new();
        let stats = probe(&mut source, &GestureConfig::default(), &mut out).unwrap();

        assert_eq!(
            stats,
            ProbeStats {
                frames: 4,
                single_person: 2,
                invalid: 0
            }
        );
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("people 0"));
        assert!(lines[1].contains("cancel"));
        assert!(lines[3].ends_with("people 3"));
    }
}
