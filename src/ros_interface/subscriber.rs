// src/ros_interface/subscriber.rs
// Pose and joint state subscriptions. Each message is converted and sent
// into the recorder's input channel; the subscription tasks themselves keep
// no state.

use crossbeam_channel::Sender;
use futures::StreamExt;
use futures::future;
use futures::task::{LocalSpawn, LocalSpawnExt};
use log::debug;
use r2r::QosProfile;
use r2r::geometry_msgs::msg::PoseStamped;
use r2r::sensor_msgs::msg::JointState;

use crate::RecorderError;
use crate::core::{Pose, RecorderInput};

/// Flattens a stamped pose, keeping the quaternion w-first
pub fn pose_from_msg(msg: &PoseStamped) -> Pose {
    let p = &msg.pose.position;
    let q = &msg.pose.orientation;
    Pose::new([p.x, p.y, p.z], [q.w, q.x, q.y, q.z])
}

/// Subscribes to `topic` and forwards every pose into `inputs`
pub fn forward_poses(
    node: &mut r2r::Node,
    spawner: &impl LocalSpawn,
    topic: &str,
    inputs: Sender<RecorderInput>,
) -> Result<(), RecorderError> {
    let stream = node.subscribe::<PoseStamped>(topic, QosProfile::default())?;
    spawner
        .spawn_local(stream.for_each(move |msg| {
            if inputs.send(RecorderInput::Pose(pose_from_msg(&msg))).is_err() {
                debug!("Recorder gone, dropping pose");
            }
            future::ready(())
        }))
        .map_err(|e| RecorderError::Ros(format!("cannot spawn pose task: {e}")))
}

/// Subscribes to `topic` and forwards every joint position vector into `inputs`
pub fn forward_joint_states(
    node: &mut r2r::Node,
    spawner: &impl LocalSpawn,
    topic: &str,
    inputs: Sender<RecorderInput>,
) -> Result<(), RecorderError> {
    let stream = node.subscribe::<JointState>(topic, QosProfile::default())?;
    spawner
        .spawn_local(stream.for_each(move |msg| {
            if inputs.send(RecorderInput::JointState(msg.position)).is_err() {
                debug!("Recorder gone, dropping joint state");
            }
            future::ready(())
        }))
        .map_err(|e| RecorderError::Ros(format!("cannot spawn joint state task: {e}")))
}
