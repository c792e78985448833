// src/config.rs

// Startup configuration for the recorder: Desk credentials, ROS 2 topic and
// node names, and recording behaviour. Loaded from YAML, then overridden from
// the command line.

use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::RecorderError;

// Upper bound for every configured duration
const MAX_DURATION_SECS: f64 = 3600.0;

/// Main configuration structure for the recorder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Desk session credentials
    pub desk: DeskConfig,
    /// ROS 2 topics and nodes
    pub ros: RosConfig,
    /// Recording behaviour and output location
    pub recording: RecordingSettings,
}

/// Credentials for the robot's Desk web interface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Robot hostname or IP address
    pub hostname: String,
    /// Desk user name
    pub username: String,
    /// Desk password
    pub password: String,
}

/// ROS 2 specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosConfig {
    /// Node name
    pub node_name: String,
    /// Topic carrying `sensor_msgs/JointState`
    pub joint_state_topic: String,
    /// Topic carrying the end-effector `geometry_msgs/PoseStamped`
    pub pose_topic: String,
    /// Topic the haptic pulse durations are published on
    pub feedback_topic: String,
    /// Node whose stiffness parameters get zeroed at startup
    pub compliance_node: String,
    /// How long to wait for a parameter service call, in seconds
    pub service_timeout_secs: f64,
}

impl Default for RosConfig {
    fn default() -> Self {
        RosConfig {
            node_name: "joint_state_recorder".to_string(),
            joint_state_topic: "/joint_states".to_string(),
            pose_topic: "/cartesian_pose".to_string(),
            feedback_topic: "/haptic_feedback".to_string(),
            compliance_node: "/dynamic_reconfigure_compliance_param_node".to_string(),
            service_timeout_secs: 5.0,
        }
    }
}

impl RosConfig {
    /// Parameter service timeout as a `Duration`
    pub fn service_timeout(&self) -> Duration {
        seconds(self.service_timeout_secs, 5.0)
    }
}

/// What a "down" press removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Drop the last joint sample only, leaving the pose list as is
    #[default]
    JointsOnly,
    /// Drop the last joint sample and the last pose sample together
    Paired,
}

/// Recording behaviour and output location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Number of joints cached from each joint state message
    pub n_joints: usize,
    /// Minimum spacing between accepted button events, in seconds
    pub debounce_secs: f64,
    /// Sample count per hole at which a check gives the long pulse
    pub target_samples: usize,
    /// Pulse for an ordinary add, delete or save
    pub short_pulse_secs: f32,
    /// Pulse once the target sample count is reached
    pub long_pulse_secs: f32,
    /// Pulse after switching holes
    pub switch_pulse_secs: f32,
    /// What "down" removes
    pub delete_policy: DeletePolicy,
    /// Root directory for recordings
    pub output_root: PathBuf,
    /// Folder under `output_root` receiving this session's data
    pub folder_name: String,
    /// Name of the data file inside the folder
    pub file_name: String,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        RecordingSettings {
            n_joints: 7,
            debounce_secs: 0.6,
            target_samples: 30,
            short_pulse_secs: 0.2,
            long_pulse_secs: 0.5,
            switch_pulse_secs: 1.0,
            delete_policy: DeletePolicy::JointsOnly,
            output_root: PathBuf::from("data"),
            folder_name: "calibration".to_string(),
            file_name: "joint_states.yaml".to_string(),
        }
    }
}

impl RecordingSettings {
    /// Debounce window as a `Duration`
    pub fn debounce_window(&self) -> Duration {
        seconds(self.debounce_secs, 0.6)
    }

    /// Full path of the file the samples are flushed to
    pub fn output_path(&self) -> PathBuf {
        self.output_root.join(&self.folder_name).join(&self.file_name)
    }
}

// Out-of-range values fall back; `validate` reports them before this matters
fn seconds(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0))
        .unwrap_or_else(|_| Duration::from_secs_f64(fallback))
}

fn check_secs(name: &str, value: f64) -> Result<(), RecorderError> {
    if value.is_finite() && (0.0..=MAX_DURATION_SECS).contains(&value) {
        Ok(())
    } else {
        Err(RecorderError::Config(format!(
            "{name} must be between 0 and {MAX_DURATION_SECS} seconds, got {value}"
        )))
    }
}

/// Values given on the command line; each one replaces its file counterpart
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Robot hostname
    pub hostname: Option<String>,
    /// Desk user name
    pub username: Option<String>,
    /// Desk password
    pub password: Option<String>,
    /// Joint state topic
    pub joint_state_topic: Option<String>,
    /// Output folder name
    pub folder_name: Option<String>,
    /// Output root directory
    pub output_root: Option<PathBuf>,
}

impl RecorderConfig {
    /// Loads configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RecorderError::io(path, e))?;
        let config: RecorderConfig = serde_yaml::from_reader(file)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Applies command line overrides on top of this configuration
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(hostname) = overrides.hostname {
            self.desk.hostname = hostname;
        }
        if let Some(username) = overrides.username {
            self.desk.username = username;
        }
        if let Some(password) = overrides.password {
            self.desk.password = password;
        }
        if let Some(topic) = overrides.joint_state_topic {
            self.ros.joint_state_topic = topic;
        }
        if let Some(folder) = overrides.folder_name {
            self.recording.folder_name = folder;
        }
        if let Some(root) = overrides.output_root {
            self.recording.output_root = root;
        }
    }

    /// Rejects configurations the recorder cannot start with
    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.desk.hostname.trim().is_empty() {
            return Err(RecorderError::Config("desk.hostname is empty".into()));
        }
        if self.desk.username.trim().is_empty() {
            return Err(RecorderError::Config("desk.username is empty".into()));
        }
        if self.recording.n_joints == 0 {
            return Err(RecorderError::Config("recording.n_joints must be positive".into()));
        }
        if self.recording.folder_name.trim().is_empty() {
            return Err(RecorderError::Config("recording.folder_name is empty".into()));
        }
        if self.ros.joint_state_topic.trim().is_empty() {
            return Err(RecorderError::Config("ros.joint_state_topic is empty".into()));
        }
        let recording = &self.recording;
        check_secs("recording.debounce_secs", recording.debounce_secs)?;
        check_secs("recording.short_pulse_secs", recording.short_pulse_secs.into())?;
        check_secs("recording.long_pulse_secs", recording.long_pulse_secs.into())?;
        check_secs("recording.switch_pulse_secs", recording.switch_pulse_secs.into())?;
        check_secs("ros.service_timeout_secs", self.ros.service_timeout_secs)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid() -> RecorderConfig {
        let mut config = RecorderConfig::default();
        config.desk.hostname = "172.16.0.2".into();
        config.desk.username = "franka".into();
        config
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "desk:\n  hostname: 172.16.0.2\n  username: franka\n  password: secret\n\
                    recording:\n  folder_name: hole_calib\n";
        let config: RecorderConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.desk.password, "secret");
        assert_eq!(config.recording.folder_name, "hole_calib");
        assert_eq!(config.recording.n_joints, 7);
        assert_eq!(config.recording.delete_policy, DeletePolicy::JointsOnly);
        assert_eq!(config.ros.pose_topic, "/cartesian_pose");
        assert_eq!(config.recording.debounce_window(), Duration::from_millis(600));
    }

    #[test]
    fn delete_policy_is_snake_case() {
        let settings: RecordingSettings = serde_yaml::from_str("delete_policy: paired").unwrap();
        assert_eq!(settings.delete_policy, DeletePolicy::Paired);
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = valid();
        config.apply(ConfigOverrides {
            joint_state_topic: Some("/franka/joint_states".into()),
            folder_name: Some("run_2".into()),
            ..Default::default()
        });

        assert_eq!(config.ros.joint_state_topic, "/franka/joint_states");
        assert_eq!(config.recording.folder_name, "run_2");
        assert_eq!(config.desk.hostname, "172.16.0.2");
        assert_eq!(
            config.recording.output_path(),
            PathBuf::from("data").join("run_2").join("joint_states.yaml")
        );
    }

    #[rstest]
    #[case::no_host(|c: &mut RecorderConfig| c.desk.hostname.clear())]
    #[case::no_user(|c: &mut RecorderConfig| c.desk.username = "  ".into())]
    #[case::no_joints(|c: &mut RecorderConfig| c.recording.n_joints = 0)]
    #[case::no_folder(|c: &mut RecorderConfig| c.recording.folder_name.clear())]
    #[case::infinite_debounce(|c: &mut RecorderConfig| c.recording.debounce_secs = f64::INFINITY)]
    #[case::nan_debounce(|c: &mut RecorderConfig| c.recording.debounce_secs = f64::NAN)]
    #[case::negative_pulse(|c: &mut RecorderConfig| c.recording.short_pulse_secs = -0.2)]
    #[case::huge_timeout(|c: &mut RecorderConfig| c.ros.service_timeout_secs = 1e300)]
    fn validate_rejects(#[case] break_it: fn(&mut RecorderConfig)) {
        let mut config = valid();
        break_it(&mut config);
        assert!(matches!(config.validate(), Err(RecorderError::Config(_))));
    }

    #[test]
    fn infinite_debounce_from_yaml_is_rejected_without_panicking() {
        let yaml = "desk: {hostname: robot, username: franka}\n\
                    recording: {debounce_secs: .inf}\n";
        let config: RecorderConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(matches!(config.validate(), Err(RecorderError::Config(_))));
        assert_eq!(config.recording.debounce_window(), Duration::from_millis(600));
    }

    #[rstest]
    #[case(1e300)]
    #[case(f64::INFINITY)]
    fn out_of_range_timeout_falls_back(#[case] secs: f64) {
        let ros = RosConfig {
            service_timeout_secs: secs,
            ..RosConfig::default()
        };
        assert_eq!(ros.service_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn validate_accepts_defaults_with_credentials() {
        assert!(valid().validate().is_ok());
    }
}
