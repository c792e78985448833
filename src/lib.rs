//! Panda joint state recorder
//!
//! Collects calibration samples on a Franka Panda: the operator hand-guides
//! the arm to a calibration hole and presses the pilot buttons to record the
//! joint positions and end-effector pose, switch holes, delete samples, and
//! finally save everything to a YAML file.
//!
//! The recorder core has no middleware dependencies. ROS 2 (`ros` feature)
//! and Desk (`desk` feature) plug in through the collaborator traits.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod compliance;
pub mod config;
pub mod core;
pub mod error;
pub mod feedback;
pub mod pendant;
pub mod session;
pub mod storage;

#[cfg(feature = "desk")]
pub mod desk;
#[cfg(feature = "ros")]
pub mod ros_interface;

// Re-export commonly used items for easier access
pub use compliance::{STIFFNESS_PARAMETERS, StiffnessConfigurator, zero_stiffness};
pub use config::{
    ConfigOverrides, DeletePolicy, DeskConfig, RecorderConfig, RecordingSettings, RosConfig,
};
pub use crate::core::{
    BUTTONS_LOST_REASON, Clock, Collaborators, Hole, JointPositions, ManualClock, MonotonicClock,
    Outcome, Pose, Recorder, RecorderInput, SHUTDOWN_REASON, SampleSet,
};
pub use error::RecorderError;
pub use feedback::FeedbackSink;
pub use pendant::{Button, ButtonEvent, ButtonListener};
pub use session::{Session, SessionState};
pub use storage::{SampleStorage, YamlStorage};
