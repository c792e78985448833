// src/main.rs
// Entry point for the Panda joint state recorder: wires ROS 2, Desk and the
// recorder together and runs until the operator saves with the cross button.

use clap::Parser;
use crossbeam_channel::Sender;
use env_logger::Env;
use log::{error, info, warn};
use panda_joint_recorder::desk::{DeskClient, DeskListener};
use panda_joint_recorder::ros_interface::{HapticPublisher, RosInterface};
use panda_joint_recorder::{
    BUTTONS_LOST_REASON, Collaborators, ConfigOverrides, MonotonicClock, Recorder, RecorderConfig,
    RecorderError, RecorderInput, RosConfig, Session, SessionState, YamlStorage, zero_stiffness,
};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// How long each spin waits for ROS 2 work before the input queue is drained
const SPIN_PERIOD: Duration = Duration::from_millis(10);

/// Records Panda joint states and poses for calibration using the pilot buttons
#[derive(Parser, Debug)]
#[command(name = "panda-joint-recorder", version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Robot hostname or IP address
    #[arg(long)]
    hostname: Option<String>,

    /// Desk user name
    #[arg(long)]
    username: Option<String>,

    /// Desk password
    #[arg(long, env = "DESK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Joint state topic
    #[arg(long)]
    joint_state_topic: Option<String>,

    /// Folder (under the output root) receiving the recording
    #[arg(long)]
    folder_name: Option<String>,

    /// Root directory for recordings
    #[arg(long)]
    output_root: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            joint_state_topic: self.joint_state_topic.clone(),
            folder_name: self.folder_name.clone(),
            output_root: self.output_root.clone(),
        }
    }
}

// Feedback, pose and joint state topics, then zeroed stiffness
fn start_ros(
    config: &RosConfig,
    inputs: Sender<RecorderInput>,
) -> Result<(RosInterface, HapticPublisher), RecorderError> {
    let mut ros = RosInterface::new(config)?;
    let feedback = ros.haptic_publisher(&config.feedback_topic)?;
    ros.forward_inputs(config, inputs)?;
    zero_stiffness(&mut ros)?;
    Ok((ros, feedback))
}

// Desk comes first so bad credentials stop us before the arm goes compliant.
// `release` undoes the Desk side when the ROS side fails.
fn desk_then_ros<D, R>(
    connect_desk: impl FnOnce() -> Result<D, RecorderError>,
    start_ros: impl FnOnce() -> Result<R, RecorderError>,
    release: impl FnOnce(D),
) -> Result<(D, R), RecorderError> {
    let desk = connect_desk()?;
    match start_ros() {
        Ok(ros) => Ok((desk, ros)),
        Err(e) => {
            release(desk);
            Err(e)
        }
    }
}

fn release_desk(desk: &mut DeskClient, listener: DeskListener) {
    listener.join();
    if let Err(e) = desk.logout() {
        error!("Failed to log out of Desk: {}", e);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting Panda joint state recorder...");

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => RecorderConfig::load(path)?,
        None => RecorderConfig::default(),
    };
    config.apply(args.overrides());
    config.validate()?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let (inputs, receiver) = crossbeam_channel::unbounded();

    let desk_inputs = inputs.clone();
    let ((mut desk, listener), (mut ros, feedback)) = desk_then_ros(
        || {
            let desk = DeskClient::connect(&config.desk)?;
            let listener = desk.listen(desk_inputs)?;
            Ok((desk, listener))
        },
        || start_ros(&config.ros, inputs),
        |(mut desk, listener)| release_desk(&mut desk, listener),
    )?;

    let output = config.recording.output_path();
    info!("Recording to {}", output.display());
    let recorder = Recorder::new(
        &config.recording,
        Collaborators {
            feedback: Box::new(feedback),
            storage: Box::new(YamlStorage::new(output)),
            listener: Box::new(listener.stop_handle()),
            clock: Box::new(MonotonicClock::new()),
        },
    );
    recorder.print_info();
    recorder.print_status();

    let mut session = Session::new(recorder, receiver, interrupted);
    let result = session.run(SPIN_PERIOD, |timeout| ros.spin_once(timeout));

    release_desk(&mut desk, listener);

    match result? {
        SessionState::Finished(BUTTONS_LOST_REASON) => warn!("{}", BUTTONS_LOST_REASON),
        SessionState::Finished(reason) => info!("{}", reason),
        SessionState::Interrupted => warn!("Recording discarded"),
        SessionState::Disconnected => warn!("Inputs closed before the recording was saved"),
        SessionState::Running => {}
    }
    Ok(())
}
