// src/storage.rs

// Persistence of the finished recording. The YAML layout is the flat
// `hole_<i>` / `hole_<i>_pose` table produced by `SampleSet::to_table`.

use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::RecorderError;
use crate::core::SampleSet;

/// Destination for the final sample collection
#[cfg_attr(test, mockall::automock)]
pub trait SampleStorage {
    /// Persists `samples`, returning where they went
    fn save(&mut self, samples: &SampleSet) -> Result<PathBuf, RecorderError>;
}

/// Writes the recording as a single YAML file
#[derive(Debug, Clone)]
pub struct YamlStorage {
    path: PathBuf,
}

impl YamlStorage {
    /// Storage writing to `path`; parent directories are created on save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        YamlStorage { path: path.into() }
    }
}

impl SampleStorage for YamlStorage {
    fn save(&mut self, samples: &SampleSet) -> Result<PathBuf, RecorderError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| RecorderError::io(dir, e))?;
        }

        let file = File::create(&self.path).map_err(|e| RecorderError::io(&self.path, e))?;
        let mut writer = BufWriter::new(file);
        serde_yaml::to_writer(&mut writer, samples)?;
        writer.flush().map_err(|e| RecorderError::io(&self.path, e))?;

        info!("Saved recording to {}", self.path.display());
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Hole, JointPositions, Pose};

    #[test]
    fn save_creates_folder_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session_1").join("joint_states.yaml");
        let mut storage = YamlStorage::new(&path);

        let mut samples = SampleSet::new();
        samples.push(Hole::First, JointPositions(vec![0.1; 7]), Pose::zeros());
        samples.push(
            Hole::Second,
            JointPositions(vec![-0.2; 7]),
            Pose::new([0.5, 0.0, 0.2], [0.0, 1.0, 0.0, 0.0]),
        );

        assert_eq!(storage.save(&samples).unwrap(), path);
        assert_eq!(SampleSet::load(&path).unwrap(), samples);
    }

    #[test]
    fn save_overwrites_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("joint_states.yaml");
        let mut storage = YamlStorage::new(&path);

        let mut samples = SampleSet::new();
        samples.push(Hole::First, JointPositions(vec![1.0; 7]), Pose::zeros());
        storage.save(&samples).unwrap();
        storage.save(&SampleSet::new()).unwrap();

        assert_eq!(SampleSet::load(&path).unwrap().count(Hole::First), 0);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SampleSet::load(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, RecorderError::Io { .. }));
    }
}
