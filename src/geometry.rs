//! # Geometry Types
//!
//! Minimal pose types passed between the task states and the transform, IK and
//! detection collaborators. No kinematics lives here: only translation offsets,
//! fixed orientations and the planar distance used for detection selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Quaternion for static-axis roll/pitch/yaw (rotation about x, then y, then z)
    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll / 2.0).sin_cos();
        let (sp, cp) = (pitch / 2.0).sin_cos();
        let (sy, cy) = (yaw / 2.0).sin_cos();

        Self {
            x: sr * cp * cy - cr * sp * sy,
            y: cr * sp * cy + sr * cp * sy,
            z: cr * cp * sy - sr * sp * cy,
            w: cr * cp * cy + sr * sp * sy,
        }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// A pose tagged with the frame it is expressed in and the time it was observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub frame_id: String,
    pub stamp: DateTime<Utc>,
    pub pose: Pose,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, pose: Pose) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp: Utc::now(),
            pose,
        }
    }

    pub fn at(frame_id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self::new(
            frame_id,
            Pose {
                position: Point::new(x, y, z),
                orientation: Quaternion::IDENTITY,
            },
        )
    }

    /// Copy of this pose translated by `(dx, dy, dz)` in its own frame
    pub fn offset(&self, (dx, dy, dz): (f64, f64, f64)) -> Self {
        let mut shifted = self.clone();
        shifted.pose.position.x += dx;
        shifted.pose.position.y += dy;
        shifted.pose.position.z += dz;
        shifted
    }

    pub fn with_orientation(mut self, orientation: Quaternion) -> Self {
        self.pose.orientation = orientation;
        self
    }

    /// Distance from the frame origin in the x-y plane
    pub fn planar_distance(&self) -> f64 {
        let p = &self.pose.position;
        (p.x * p.x + p.y * p.y).sqrt()
    }

    pub fn height(&self) -> f64 {
        self.pose.position.z
    }
}
