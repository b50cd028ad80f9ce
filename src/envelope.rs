// src/envelope.rs - Static per-pose geometric bounds
use crate::features::OffsetFeatures;
use serde::{Deserialize, Serialize};
use std::ops::{Bound, RangeBounds};

/// Lower and upper bound for one offset feature. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub lower: Bound<i32>,
    pub upper: Bound<i32>,
}

impl FeatureRange {
    pub const ANY: Self = Self {
        lower: Bound::Unbounded,
        upper: Bound::Unbounded,
    };

    /// `min <= v <= max`
    pub const fn inclusive(min: i32, max: i32) -> Self {
        Self {
            lower: Bound::Included(min),
            upper: Bound::Included(max),
        }
    }

    /// `min < v <= max`
    pub const fn left_open(min: i32, max: i32) -> Self {
        Self {
            lower: Bound::Excluded(min),
            upper: Bound::Included(max),
        }
    }

    /// `v >= min`
    pub const fn at_least(min: i32) -> Self {
        Self {
            lower: Bound::Included(min),
            upper: Bound::Unbounded,
        }
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.lower, self.upper).contains(&value)
    }

    /// False when no integer can satisfy the range.
    pub fn is_satisfiable(&self) -> bool {
        let lo = match self.lower {
            Bound::Included(v) => Some(v),
            Bound::Excluded(v) => v.checked_add(1),
            Bound::Unbounded => Some(i32::MIN),
        };
        let hi = match self.upper {
            Bound::Included(v) => Some(v),
            Bound::Excluded(v) => v.checked_sub(1),
            Bound::Unbounded => Some(i32::MAX),
        };
        matches!((lo, hi), (Some(lo), Some(hi)) if lo <= hi)
    }
}

impl Default for FeatureRange {
    fn default() -> Self {
        Self::ANY
    }
}

/// Bounds over the four offset features. A pose matches a tick when all four hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseEnvelope {
    pub left_x: FeatureRange,
    pub left_y: FeatureRange,
    pub right_x: FeatureRange,
    pub right_y: FeatureRange,
}

impl PoseEnvelope {
    pub fn matches(&self, features: &OffsetFeatures) -> bool {
        self.left_x.contains(features.left_x())
            && self.left_y.contains(features.left_y())
            && self.right_x.contains(features.right_x())
            && self.right_y.contains(features.right_y())
    }

    pub fn is_satisfiable(&self) -> bool {
        [self.left_x, self.left_y, self.right_x, self.right_y]
            .iter()
            .all(FeatureRange::is_satisfiable)
    }

    pub fn usain() -> Self {
        Self {
            left_x: FeatureRange::inclusive(20, 45),
            left_y: FeatureRange::inclusive(-45, -10),
            right_x: FeatureRange::inclusive(-90, -30),
            right_y: FeatureRange::inclusive(15, 50),
        }
    }

    pub fn victory() -> Self {
        Self {
            left_x: FeatureRange::inclusive(35, 70),
            left_y: FeatureRange::inclusive(50, 90),
            right_x: FeatureRange::inclusive(-60, -20),
            right_y: FeatureRange::inclusive(50, 80),
        }
    }

    pub fn power_pose() -> Self {
        Self {
            left_x: FeatureRange::left_open(0, 40),
            left_y: FeatureRange::left_open(0, 40),
            right_x: FeatureRange::left_open(-40, 0),
            right_y: FeatureRange::left_open(0, 40),
        }
    }

    pub fn t_pose() -> Self {
        Self {
            left_x: FeatureRange::at_least(75),
            left_y: FeatureRange::inclusive(-10, 10),
            right_x: FeatureRange::at_least(-110),
            right_y: FeatureRange::inclusive(-15, 5),
        }
    }

    /// Hands joined above the head.
    pub fn o_pose() -> Self {
        Self {
            left_x: FeatureRange::inclusive(-10, 15),
            left_y: FeatureRange::inclusive(55, 65),
            right_x: FeatureRange::inclusive(-5, 15),
            right_y: FeatureRange::inclusive(55, 70),
        }
    }

    pub fn arms_down() -> Self {
        Self {
            left_y: FeatureRange::inclusive(-20, 20),
            right_y: FeatureRange::inclusive(-10, 30),
            ..Self::default()
        }
    }

    pub fn arms_up() -> Self {
        Self {
            left_y: FeatureRange::inclusive(-100, -60),
            right_y: FeatureRange::inclusive(-90, -50),
            ..Self::default()
        }
    }
}
