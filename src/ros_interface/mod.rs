//! ROS 2 interface for the recorder
//!
//! This module handles all communication with ROS 2, including:
//! - Publishing haptic pulses to the pendant
//! - Subscribing to the end-effector pose and joint states
//! - Setting the compliance controller's stiffness parameters

mod parameters;
mod publisher;
mod subscriber;

use crossbeam_channel::Sender;
use futures::executor::LocalPool;
use log::info;
use r2r::rcl_interfaces::srv::SetParameters;
use std::future::Future;
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};

pub use parameters::{double_request, set_parameters_service};
pub use publisher::HapticPublisher;
pub use subscriber::{forward_joint_states, forward_poses, pose_from_msg};

use crate::RecorderError;
use crate::compliance::StiffnessConfigurator;
use crate::config::RosConfig;
use crate::core::RecorderInput;

const SERVICE_POLL: Duration = Duration::from_millis(10);

/// ROS 2 interface manager
pub struct RosInterface {
    node: r2r::Node,
    pool: LocalPool,
    parameters: r2r::Client<SetParameters::Service>,
    service_timeout: Duration,
}

impl RosInterface {
    /// Creates the node and the parameter client of the compliance node
    pub fn new(config: &RosConfig) -> Result<Self, RecorderError> {
        let context = r2r::Context::create()?;
        let mut node = r2r::Node::create(context, &config.node_name, "")?;
        let parameters = parameters::client(&mut node, &config.compliance_node)?;
        info!("ROS 2 node {} created", config.node_name);

        Ok(RosInterface {
            node,
            pool: LocalPool::new(),
            parameters,
            service_timeout: config.service_timeout(),
        })
    }

    /// Subscribes to the pose and joint state topics, forwarding into `inputs`
    pub fn forward_inputs(
        &mut self,
        config: &RosConfig,
        inputs: Sender<RecorderInput>,
    ) -> Result<(), RecorderError> {
        let spawner = self.pool.spawner();
        forward_poses(&mut self.node, &spawner, &config.pose_topic, inputs.clone())?;
        info!("Subscribed to {}", config.pose_topic);
        forward_joint_states(&mut self.node, &spawner, &config.joint_state_topic, inputs)?;
        info!("Subscribed to {}", config.joint_state_topic);
        Ok(())
    }

    /// Opens the haptic feedback publisher
    pub fn haptic_publisher(&mut self, topic: &str) -> Result<HapticPublisher, RecorderError> {
        let publisher = HapticPublisher::new(&mut self.node, topic)?;
        info!("Publishing haptic feedback to {}", topic);
        Ok(publisher)
    }

    /// Processes pending middleware work, then runs the subscription tasks
    pub fn spin_once(&mut self, timeout: Duration) -> Result<(), RecorderError> {
        self.node.spin_once(timeout);
        self.pool.run_until_stalled();
        Ok(())
    }

    // Drives the node until `fut` resolves or the service timeout passes
    fn wait_for<F: Future>(&mut self, fut: F, what: &str) -> Result<F::Output, RecorderError> {
        let mut fut = Box::pin(fut);
        let waker = futures::task::noop_waker();
        let mut cx = TaskContext::from_waker(&waker);
        let deadline = Instant::now() + self.service_timeout;

        loop {
            if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
                return Ok(output);
            }
            if Instant::now() >= deadline {
                return Err(RecorderError::Ros(format!("timed out waiting for {what}")));
            }
            self.spin_once(SERVICE_POLL)?;
        }
    }
}

impl StiffnessConfigurator for RosInterface {
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), RecorderError> {
        let available = r2r::Node::is_available(&self.parameters)?;
        self.wait_for(available, "parameter service")??;

        let request = self.parameters.request(&double_request(name, value))?;
        let response = self.wait_for(request, name)??;

        match response.results.first() {
            Some(result) if result.successful => {
                info!("Set {} to {}", name, value);
                Ok(())
            }
            Some(result) => Err(RecorderError::ParameterRejected {
                name: name.to_string(),
                reason: result.reason.clone(),
            }),
            None => Err(RecorderError::ParameterRejected {
                name: name.to_string(),
                reason: "empty response".into(),
            }),
        }
    }
}
