// src/ros_interface/publisher.rs
// Haptic feedback over ROS 2: each pulse is one std_msgs/Float32 carrying
// the vibration duration in seconds.

use r2r::QosProfile;
use r2r::std_msgs::msg::Float32;

use crate::RecorderError;
use crate::feedback::FeedbackSink;

/// Publishes pulse durations on the haptic feedback topic
pub struct HapticPublisher {
    inner: r2r::Publisher<Float32>,
}

impl HapticPublisher {
    /// Creates the publisher on `topic`
    pub fn new(node: &mut r2r::Node, topic: &str) -> Result<Self, RecorderError> {
        let inner = node.create_publisher::<Float32>(topic, QosProfile::default())?;
        Ok(HapticPublisher { inner })
    }
}

impl FeedbackSink for HapticPublisher {
    fn pulse(&mut self, seconds: f32) -> Result<(), RecorderError> {
        self.inner.publish(&Float32 { data: seconds })?;
        Ok(())
    }
}
