// core/samples.rs

// Per-hole sample collection. Joint samples and pose samples are kept in two
// parallel lists per hole and flattened into a `hole_<i>` / `hole_<i>_pose`
// table for persistence.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use super::state::{Hole, JointPositions, Pose};
use crate::RecorderError;

/// Samples recorded for one hole
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HoleSamples {
    joints: Vec<JointPositions>,
    poses: Vec<Pose>,
}

impl HoleSamples {
    /// Recorded joint samples, oldest first
    pub fn joints(&self) -> &[JointPositions] {
        &self.joints
    }

    /// Recorded pose samples, oldest first
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }
}

/// The whole recording: samples for both holes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleSet {
    holes: [HoleSamples; 2],
}

/// Flat on-disk layout: `hole_0`, `hole_0_pose`, `hole_1`, `hole_1_pose`
pub type SampleTable = BTreeMap<String, Vec<Vec<f64>>>;

impl SampleSet {
    /// Creates an empty recording
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples of one hole
    pub fn hole(&self, hole: Hole) -> &HoleSamples {
        &self.holes[hole.index()]
    }

    /// Number of joint samples recorded for `hole`
    pub fn count(&self, hole: Hole) -> usize {
        self.holes[hole.index()].joints.len()
    }

    /// True when neither hole holds a joint or pose sample
    pub fn is_empty(&self) -> bool {
        self.holes
            .iter()
            .all(|h| h.joints.is_empty() && h.poses.is_empty())
    }

    /// Appends a joint sample and its pose to `hole`; returns the new joint count
    pub fn push(&mut self, hole: Hole, joints: JointPositions, pose: Pose) -> usize {
        let samples = &mut self.holes[hole.index()];
        samples.joints.push(joints);
        samples.poses.push(pose);
        samples.joints.len()
    }

    /// Drops the last joint sample of `hole`, leaving its poses alone
    pub fn pop_joints(&mut self, hole: Hole) -> Option<JointPositions> {
        self.holes[hole.index()].joints.pop()
    }

    /// Drops the last pose sample of `hole`
    pub fn pop_pose(&mut self, hole: Hole) -> Option<Pose> {
        self.holes[hole.index()].poses.pop()
    }

    /// One-line summary of the sample counts
    pub fn status(&self, active: Hole) -> String {
        let counts: Vec<String> = Hole::ALL
            .iter()
            .map(|&hole| format!("{}: {} data points", hole.name(), self.count(hole)))
            .collect();
        format!("{} (active: {})", counts.join(", "), active.name())
    }

    /// Flattens the recording into its on-disk table
    pub fn to_table(&self) -> SampleTable {
        let mut table = SampleTable::new();
        for hole in Hole::ALL {
            let samples = self.hole(hole);
            table.insert(
                hole.name(),
                samples.joints.iter().map(|j| j.0.clone()).collect(),
            );
            table.insert(
                hole.pose_name(),
                samples.poses.iter().map(|p| p.to_array().to_vec()).collect(),
            );
        }
        table
    }

    /// Rebuilds a recording from its on-disk table; missing keys read as empty
    pub fn from_table(table: &SampleTable) -> Result<Self, RecorderError> {
        let mut set = SampleSet::new();
        for hole in Hole::ALL {
            let samples = &mut set.holes[hole.index()];
            if let Some(rows) = table.get(&hole.name()) {
                samples.joints = rows.iter().cloned().map(JointPositions).collect();
            }
            if let Some(rows) = table.get(&hole.pose_name()) {
                samples.poses = rows
                    .iter()
                    .map(|row| {
                        Pose::from_slice(row).ok_or_else(|| {
                            RecorderError::Config(format!(
                                "{} entry has {} values, expected {}",
                                hole.pose_name(),
                                row.len(),
                                Pose::LEN
                            ))
                        })
                    })
                    .collect::<Result<_, _>>()?;
            }
        }
        Ok(set)
    }

    /// Loads a recording previously written by [`crate::YamlStorage`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RecorderError::io(path, e))?;
        let table: SampleTable = serde_yaml::from_reader(file)?;
        info!("Loaded recording from {}", path.display());
        Self::from_table(&table)
    }
}

impl Serialize for SampleSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_table().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SampleSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let table = SampleTable::deserialize(deserializer)?;
        SampleSet::from_table(&table).map_err(serde::de::Error::custom)
    }
}
