// core/state.rs

// The small pieces of state the recorder caches between button presses: the
// latest end-effector pose, the latest joint positions, and which calibration
// hole samples currently go to.

use log::warn;
use nalgebra::{Quaternion, Vector3};
use std::fmt;

/// End-effector pose: position plus orientation quaternion
///
/// The orientation is stored as received, without normalisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Position (meters)
    pub position: Vector3<f64>,
    /// Orientation
    pub orientation: Quaternion<f64>,
}

impl Pose {
    /// Number of scalars in the flat representation
    pub const LEN: usize = 7;

    /// All-zero pose, used before the first pose message arrives
    pub fn zeros() -> Self {
        Pose {
            position: Vector3::zeros(),
            orientation: Quaternion::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    /// Builds a pose from position xyz and orientation w, x, y, z
    pub fn new(position: [f64; 3], orientation_wxyz: [f64; 4]) -> Self {
        let [w, i, j, k] = orientation_wxyz;
        Pose {
            position: Vector3::from(position),
            orientation: Quaternion::new(w, i, j, k),
        }
    }

    /// Flat `[x, y, z, qw, qx, qy, qz]` representation
    pub fn to_array(&self) -> [f64; 7] {
        let q = &self.orientation;
        [
            self.position.x,
            self.position.y,
            self.position.z,
            q.w,
            q.i,
            q.j,
            q.k,
        ]
    }

    /// Inverse of [`Pose::to_array`]; `None` unless exactly seven values are given
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            &[x, y, z, w, i, j, k] => Some(Pose::new([x, y, z], [w, i, j, k])),
            _ => None,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::zeros()
    }
}

/// One joint-position sample
#[derive(Clone, Debug, PartialEq, Default)]
pub struct JointPositions(pub Vec<f64>);

impl JointPositions {
    /// Joint values in radians
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl fmt::Display for JointPositions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", q)?;
        }
        write!(f, "]")
    }
}

/// Keeps the most recent joint positions of the arm
#[derive(Clone, Debug)]
pub struct JointCache {
    n_joints: usize,
    latest: JointPositions,
}

impl JointCache {
    /// Starts with `n_joints` zeros
    pub fn new(n_joints: usize) -> Self {
        JointCache {
            n_joints,
            latest: JointPositions(vec![0.0; n_joints]),
        }
    }

    /// Caches the first `n_joints` positions of a joint state message
    ///
    /// Messages carrying fewer positions than expected are dropped.
    pub fn cache_positions(&mut self, positions: &[f64]) -> bool {
        if positions.len() < self.n_joints {
            warn!(
                "Ignoring joint state with {} positions, expected {}",
                positions.len(),
                self.n_joints
            );
            return false;
        }
        self.latest = JointPositions(positions[..self.n_joints].to_vec());
        true
    }

    /// Returns the latest cached positions
    pub fn latest(&self) -> &JointPositions {
        &self.latest
    }
}

/// One of the two calibration targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Hole {
    /// Hole 0, active at startup
    #[default]
    First,
    /// Hole 1
    Second,
}

impl Hole {
    /// Both holes in index order
    pub const ALL: [Hole; 2] = [Hole::First, Hole::Second];

    /// Index 0 or 1
    pub fn index(self) -> usize {
        match self {
            Hole::First => 0,
            Hole::Second => 1,
        }
    }

    /// The other hole
    pub fn toggled(self) -> Self {
        match self {
            Hole::First => Hole::Second,
            Hole::Second => Hole::First,
        }
    }

    /// Key of this hole's joint samples, e.g. `hole_0`
    pub fn name(self) -> String {
        format!("hole_{}", self.index())
    }

    /// Key of this hole's pose samples, e.g. `hole_0_pose`
    pub fn pose_name(self) -> String {
        format!("hole_{}_pose", self.index())
    }
}

impl fmt::Display for Hole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}
