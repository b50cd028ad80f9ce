// src/features.rs - Shoulder-to-hand offset features
use nalgebra::{Point2, Vector2};
use thiserror::Error;

/// Skeleton slot indices as delivered by the tracking SDK.
pub mod joint {
    pub const LEFT_HAND: usize = 0;
    pub const RIGHT_HAND: usize = 1;
    pub const HEAD: usize = 2;
    pub const SPINE_BASE: usize = 3;
    pub const LEFT_SHOULDER: usize = 4;
    pub const RIGHT_SHOULDER: usize = 5;

    /// Minimum joint count a frame needs before extraction can run.
    pub const REQUIRED: usize = 6;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("joint index {index} out of range (frame has {len} joints)")]
    MissingJoint { index: usize, len: usize },
    #[error("no joint frame for the tracked person")]
    NoFrame,
}

/// Image-space joint positions for one tracked person in one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointFrame {
    points: Vec<Point2<i32>>,
}

impl JointFrame {
    pub fn from_pairs(pairs: &[[i32; 2]]) -> Self {
        Self {
            points: pairs.iter().map(|p| Point2::new(p[0], p[1])).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Builds a frame whose shoulders sit at a fixed position and whose hands
    /// produce the given offsets. Used by the simulated tracker.
    pub fn from_offsets(features: OffsetFeatures) -> Self {
        let left_shoulder = Point2::new(200, 150);
        let right_shoulder = Point2::new(300, 150);

        let mut points = vec![Point2::origin(); joint::REQUIRED];
        points[joint::LEFT_HAND] = left_shoulder - features.left;
        points[joint::RIGHT_HAND] = right_shoulder - features.right;
        points[joint::HEAD] = Point2::new(250, 80);
        points[joint::SPINE_BASE] = Point2::new(250, 300);
        points[joint::LEFT_SHOULDER] = left_shoulder;
        points[joint::RIGHT_SHOULDER] = right_shoulder;
        Self { points }
    }

    pub fn points(&self) -> &[Point2<i32>] {
        &self.points
    }

    pub fn joint(&self, index: usize) -> Result<Point2<i32>, FeatureError> {
        self.points
            .get(index)
            .copied()
            .ok_or(FeatureError::MissingJoint {
                index,
                len: self.len(),
            })
    }
}

/// Shoulder minus hand, per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetFeatures {
    pub left: Vector2<i32>,
    pub right: Vector2<i32>,
}

impl OffsetFeatures {
    pub fn new(left_x: i32, left_y: i32, right_x: i32, right_y: i32) -> Self {
        Self {
            left: Vector2::new(left_x, left_y),
            right: Vector2::new(right_x, right_y),
        }
    }

    pub fn left_x(&self) -> i32 {
        self.left.x
    }

    pub fn left_y(&self) -> i32 {
        self.left.y
    }

    pub fn right_x(&self) -> i32 {
        self.right.x
    }

    pub fn right_y(&self) -> i32 {
        self.right.y
    }

    /// Pure per-tick extraction; fails only when a required joint is absent.
    pub fn extract(frame: &JointFrame) -> Result<Self, FeatureError> {
        if frame.is_empty() {
            return Err(FeatureError::NoFrame);
        }
        let left_hand = frame.joint(joint::LEFT_HAND)?;
        let right_hand = frame.joint(joint::RIGHT_HAND)?;
        let left_shoulder = frame.joint(joint::LEFT_SHOULDER)?;
        let right_shoulder = frame.joint(joint::RIGHT_SHOULDER)?;

        Ok(Self {
            left: left_shoulder - left_hand,
            right: right_shoulder - right_hand,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subtracts_hand_from_shoulder() {
        let frame = JointFrame::from_pairs(&[
            [180, 130], // left hand
            [320, 170], // right hand
            [250, 80],
            [250, 300],
            [200, 150], // left shoulder
            [300, 150], // right shoulder
        ]);

        let features = OffsetFeatures::extract(&frame).unwrap();
        assert_eq!(features, OffsetFeatures::new(20, 20, -20, -20));
    }

    #[test]
    fn test_extract_rejects_short_frame() {
        let frame = JointFrame::from_pairs(&[[0, 0], [1, 1], [2, 2]]);
        let err = OffsetFeatures::extract(&frame).unwrap_err();
        assert_eq!(
            err,
            FeatureError::MissingJoint {
                index: joint::LEFT_SHOULDER,
                len: 3
            }
        );
    }

    #[test]
    fn test_empty_frame_counts_as_no_frame() {
        let err = OffsetFeatures::extract(&JointFrame::default()).unwrap_err();
        assert_eq!(err, FeatureError::NoFrame);
    }

    #[test]
    fn test_extra_joints_are_ignored() {
        let mut pairs = vec![[0, 0]; 20];
        pairs[joint::LEFT_SHOULDER] = [10, 10];
        pairs[joint::RIGHT_SHOULDER] = [-10, 5];
        let features = OffsetFeatures::extract(&JointFrame::from_pairs(&pairs)).unwrap();
        assert_eq!(features, OffsetFeatures::new(10, 10, -10, 5));
    }

    #[test]
    fn test_from_offsets_reproduces_features() {
        let wanted = OffsetFeatures::new(20, 20, -20, 20);
        let frame = JointFrame::from_offsets(wanted);
        assert_eq!(frame.len(), joint::REQUIRED);
        assert_eq!(OffsetFeatures::extract(&frame).unwrap(), wanted);
    }
}
