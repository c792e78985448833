// core/recorder.rs

// The joint state recorder for the Panda pendant. Caches the latest pose and
// joint positions, and on each debounced button press adds, deletes, switches
// hole, or saves and quits. Every collaborator is injected so the whole press
// handling runs against fakes in tests.

use log::{debug, error, info, warn};

use super::debounce::{Clock, Debouncer};
use super::samples::SampleSet;
use super::state::{Hole, JointCache, Pose};
use crate::config::{DeletePolicy, RecordingSettings};
use crate::feedback::FeedbackSink;
use crate::pendant::{Button, ButtonEvent, ButtonListener};
use crate::storage::SampleStorage;
use crate::RecorderError;

/// Reason given when the operator saves and quits
pub const SHUTDOWN_REASON: &str = "Finished recording data";

/// Reason given when the button source stops before the operator saved
pub const BUTTONS_LOST_REASON: &str = "Pendant button stream lost";

/// Everything the recorder reacts to
#[derive(Clone, Debug, PartialEq)]
pub enum RecorderInput {
    /// New end-effector pose
    Pose(Pose),
    /// Positions from a joint state message
    JointState(Vec<f64>),
    /// Pendant button event
    Button(ButtonEvent),
    /// The button source stopped on its own; carries the cause
    ButtonsLost(String),
}

/// What the caller should do after an input was handled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Keep recording
    Continue,
    /// Recording is over, shut down with the given reason
    Shutdown(&'static str),
}

/// External services the recorder talks to
pub struct Collaborators {
    /// Haptic pulses
    pub feedback: Box<dyn FeedbackSink>,
    /// Where the recording is flushed to
    pub storage: Box<dyn SampleStorage>,
    /// Button event source, stopped on save
    pub listener: Box<dyn ButtonListener>,
    /// Time source for the debounce filter
    pub clock: Box<dyn Clock>,
}

/// Pendant-driven recorder of joint positions and poses per hole
pub struct Recorder {
    settings: RecordingSettings,
    samples: SampleSet,
    active_hole: Hole,
    pose: Pose,
    joints: JointCache,
    debouncer: Debouncer,
    feedback: Box<dyn FeedbackSink>,
    storage: Box<dyn SampleStorage>,
    listener: Box<dyn ButtonListener>,
    finished: bool,
}

impl Recorder {
    /// Creates a recorder with empty samples and hole 0 active
    pub fn new(settings: &RecordingSettings, parts: Collaborators) -> Self {
        Recorder {
            settings: settings.clone(),
            samples: SampleSet::new(),
            active_hole: Hole::First,
            pose: Pose::zeros(),
            joints: JointCache::new(settings.n_joints),
            debouncer: Debouncer::new(parts.clock, settings.debounce_window()),
            feedback: parts.feedback,
            storage: parts.storage,
            listener: parts.listener,
            finished: false,
        }
    }

    /// Logs the button help
    pub fn print_info(&self) {
        info!("Press 'check' to add a data point");
        info!("Press 'down' to delete the last data point");
        info!("Press 'o' to switch between holes");
        info!("Press 'x' to save the data and quit.");
    }

    /// Logs sample counts per hole
    pub fn print_status(&self) {
        info!("{}", self.samples.status(self.active_hole));
    }

    /// Dispatches one input to its handler
    pub fn handle(&mut self, input: RecorderInput) -> Result<Outcome, RecorderError> {
        match input {
            RecorderInput::Pose(pose) => {
                self.on_pose(pose);
                Ok(Outcome::Continue)
            }
            RecorderInput::JointState(positions) => {
                self.on_joint_state(&positions);
                Ok(Outcome::Continue)
            }
            RecorderInput::Button(event) => self.on_button_event(&event),
            RecorderInput::ButtonsLost(cause) => self.on_buttons_lost(&cause),
        }
    }

    /// Replaces the cached pose
    pub fn on_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Caches the arm joints of a joint state message
    pub fn on_joint_state(&mut self, positions: &[f64]) {
        self.joints.cache_positions(positions);
    }

    /// Handles a pendant event; duplicates inside the debounce window are dropped
    pub fn on_button_event(&mut self, event: &ButtonEvent) -> Result<Outcome, RecorderError> {
        if self.finished {
            debug!("Ignoring button event after save");
            return Ok(Outcome::Continue);
        }
        if !self.debouncer.accept() {
            return Ok(Outcome::Continue);
        }

        match event.button() {
            Some(Button::Check) => self.add_sample(),
            Some(Button::Down) => self.delete_sample(),
            Some(Button::Cross) => return self.save_and_quit(),
            Some(Button::Circle) => self.switch_hole(),
            None => info!("Unknown key pressed"),
        }
        self.print_status();
        Ok(Outcome::Continue)
    }

    /// Saves what was collected and shuts down, since "cross" can no longer arrive
    pub fn on_buttons_lost(&mut self, cause: &str) -> Result<Outcome, RecorderError> {
        if self.finished {
            return Ok(Outcome::Continue);
        }
        error!("Lost the pendant buttons: {}", cause);
        if self.samples.is_empty() {
            warn!("Nothing recorded, no data file written");
        } else {
            let path = self.storage.save(&self.samples)?;
            warn!("Saved the data collected so far to {}", path.display());
        }
        self.finished = true;
        Ok(Outcome::Shutdown(BUTTONS_LOST_REASON))
    }

    fn add_sample(&mut self) {
        let joints = self.joints.latest().clone();
        info!("Added data point for {} with value {}", self.active_hole.name(), joints);
        let count = self.samples.push(self.active_hole, joints, self.pose);

        if count >= self.settings.target_samples {
            self.vibrate(self.settings.long_pulse_secs);
        } else {
            self.vibrate(self.settings.short_pulse_secs);
        }
    }

    fn delete_sample(&mut self) {
        let hole = self.active_hole;
        match self.samples.pop_joints(hole) {
            Some(_) => {
                if self.settings.delete_policy == DeletePolicy::Paired {
                    self.samples.pop_pose(hole);
                }
                info!("Deleted data point for {}", hole.name());
            }
            None => warn!("No data point to delete for {}", hole.name()),
        }
        self.vibrate(self.settings.short_pulse_secs);
    }

    fn save_and_quit(&mut self) -> Result<Outcome, RecorderError> {
        self.listener.stop_listening();
        info!("Saving data to file and exiting");
        self.storage.save(&self.samples)?;
        self.vibrate(self.settings.short_pulse_secs);
        self.finished = true;
        info!("Wait for the recorder to shut down...");
        Ok(Outcome::Shutdown(SHUTDOWN_REASON))
    }

    fn switch_hole(&mut self) {
        self.active_hole = self.active_hole.toggled();
        info!("Switched to hole {}", self.active_hole);
        self.vibrate(self.settings.switch_pulse_secs);
    }

    fn vibrate(&mut self, seconds: f32) {
        if let Err(e) = self.feedback.pulse(seconds) {
            warn!("Failed to send haptic pulse: {}", e);
        }
    }

    /// Samples recorded so far
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Hole new samples go to
    pub fn active_hole(&self) -> Hole {
        self.active_hole
    }

    /// Latest cached pose
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Whether the recording was saved
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::debounce::ManualClock;
    use crate::feedback::MockFeedbackSink;
    use crate::pendant::MockButtonListener;
    use crate::storage::MockSampleStorage;
    use mockall::predicate::eq;
    use std::path::PathBuf;
    use std::time::Duration;

    struct Mocks {
        feedback: MockFeedbackSink,
        storage: MockSampleStorage,
        listener: MockButtonListener,
    }

    impl Mocks {
        fn new() -> Self {
            Mocks {
                feedback: MockFeedbackSink::new(),
                storage: MockSampleStorage::new(),
                listener: MockButtonListener::new(),
            }
        }

        fn build(self, settings: &RecordingSettings) -> (ManualClock, Recorder) {
            let clock = ManualClock::new();
            let recorder = Recorder::new(
                settings,
                Collaborators {
                    feedback: Box::new(self.feedback),
                    storage: Box::new(self.storage),
                    listener: Box::new(self.listener),
                    clock: Box::new(clock.clone()),
                },
            );
            (clock, recorder)
        }
    }

    fn press(clock: &ManualClock, recorder: &mut Recorder, button: Button) -> Outcome {
        clock.advance(Duration::from_secs(1));
        recorder
            .on_button_event(&ButtonEvent::pressed(button))
            .unwrap()
    }

    #[test]
    fn check_records_cached_joints_and_pose() {
        let mut mocks = Mocks::new();
        mocks
            .feedback
            .expect_pulse()
            .with(eq(0.2_f32))
            .times(1)
            .returning(|_| Ok(()));
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        let pose = Pose::new([0.3, 0.1, 0.5], [0.0, 1.0, 0.0, 0.0]);
        recorder.on_pose(pose);
        recorder.on_joint_state(&[0.0, -0.7, 0.0, -2.3, 0.0, 1.6, 0.8, 0.04, 0.04]);

        assert_eq!(press(&clock, &mut recorder, Button::Check), Outcome::Continue);

        let hole = recorder.samples().hole(Hole::First);
        assert_eq!(hole.joints()[0].as_slice(), &[0.0, -0.7, 0.0, -2.3, 0.0, 1.6, 0.8]);
        assert_eq!(hole.poses(), &[pose]);
    }

    #[test]
    fn long_pulse_once_target_reached() {
        let settings = RecordingSettings {
            target_samples: 3,
            ..Default::default()
        };
        let mut mocks = Mocks::new();
        mocks
            .feedback
            .expect_pulse()
            .with(eq(0.2_f32))
            .times(2)
            .returning(|_| Ok(()));
        mocks
            .feedback
            .expect_pulse()
            .with(eq(0.5_f32))
            .times(2)
            .returning(|_| Ok(()));
        let (clock, mut recorder) = mocks.build(&settings);

        for _ in 0..4 {
            press(&clock, &mut recorder, Button::Check);
        }
        assert_eq!(recorder.samples().count(Hole::First), 4);
    }

    #[test]
    fn down_on_empty_hole_still_pulses() {
        let mut mocks = Mocks::new();
        mocks
            .feedback
            .expect_pulse()
            .with(eq(0.2_f32))
            .times(1)
            .returning(|_| Ok(()));
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        press(&clock, &mut recorder, Button::Down);
        assert_eq!(recorder.samples().count(Hole::First), 0);
    }

    #[test]
    fn paired_delete_drops_pose_too() {
        let settings = RecordingSettings {
            delete_policy: DeletePolicy::Paired,
            ..Default::default()
        };
        let mut mocks = Mocks::new();
        mocks.feedback.expect_pulse().returning(|_| Ok(()));
        let (clock, mut recorder) = mocks.build(&settings);

        press(&clock, &mut recorder, Button::Check);
        press(&clock, &mut recorder, Button::Check);
        press(&clock, &mut recorder, Button::Down);

        let hole = recorder.samples().hole(Hole::First);
        assert_eq!(hole.joints().len(), 1);
        assert_eq!(hole.poses().len(), 1);
    }

    #[test]
    fn circle_switches_with_long_pulse() {
        let mut mocks = Mocks::new();
        mocks
            .feedback
            .expect_pulse()
            .with(eq(1.0_f32))
            .times(2)
            .returning(|_| Ok(()));
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        press(&clock, &mut recorder, Button::Circle);
        assert_eq!(recorder.active_hole(), Hole::Second);
        press(&clock, &mut recorder, Button::Circle);
        assert_eq!(recorder.active_hole(), Hole::First);
    }

    #[test]
    fn cross_stops_listener_saves_and_requests_shutdown() {
        let mut mocks = Mocks::new();
        mocks.listener.expect_stop_listening().times(1).return_const(());
        mocks
            .storage
            .expect_save()
            .times(1)
            .returning(|_| Ok(PathBuf::from("data/calibration/joint_states.yaml")));
        mocks
            .feedback
            .expect_pulse()
            .with(eq(0.2_f32))
            .times(1)
            .returning(|_| Ok(()));
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        assert_eq!(
            press(&clock, &mut recorder, Button::Cross),
            Outcome::Shutdown("Finished recording data")
        );
        assert!(recorder.is_finished());

        // Anything still queued after the save is ignored
        assert_eq!(press(&clock, &mut recorder, Button::Check), Outcome::Continue);
        assert_eq!(recorder.samples().count(Hole::First), 0);
    }

    #[test]
    fn failed_flush_propagates() {
        let mut mocks = Mocks::new();
        mocks.listener.expect_stop_listening().return_const(());
        mocks.storage.expect_save().returning(|_| {
            Err(RecorderError::io(
                "data/calibration",
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ))
        });
        mocks.feedback.expect_pulse().never();
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        clock.advance(Duration::from_secs(1));
        let result = recorder.on_button_event(&ButtonEvent::pressed(Button::Cross));
        assert!(matches!(result, Err(RecorderError::Io { .. })));
        assert!(!recorder.is_finished());
    }

    #[test]
    fn lost_buttons_save_collected_samples() {
        let mut mocks = Mocks::new();
        mocks.feedback.expect_pulse().returning(|_| Ok(()));
        mocks.listener.expect_stop_listening().never();
        mocks
            .storage
            .expect_save()
            .withf(|samples| samples.count(Hole::First) == 1)
            .times(1)
            .returning(|_| Ok(PathBuf::from("data/calibration/joint_states.yaml")));
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        press(&clock, &mut recorder, Button::Check);
        let outcome = recorder
            .handle(RecorderInput::ButtonsLost("connection reset".into()))
            .unwrap();
        assert_eq!(outcome, Outcome::Shutdown(BUTTONS_LOST_REASON));
        assert!(recorder.is_finished());
    }

    #[test]
    fn lost_buttons_with_nothing_recorded_writes_no_file() {
        let mut mocks = Mocks::new();
        mocks.storage.expect_save().never();
        let (_clock, mut recorder) = mocks.build(&RecordingSettings::default());

        assert_eq!(
            recorder.on_buttons_lost("closed by Desk").unwrap(),
            Outcome::Shutdown(BUTTONS_LOST_REASON)
        );
    }

    #[test]
    fn unknown_key_changes_nothing() {
        let mut mocks = Mocks::new();
        mocks.feedback.expect_pulse().never();
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        clock.advance(Duration::from_secs(1));
        let event = ButtonEvent::default().with("up", true);
        assert_eq!(recorder.on_button_event(&event).unwrap(), Outcome::Continue);
        assert_eq!(recorder.active_hole(), Hole::First);
        assert_eq!(recorder.samples().count(Hole::First), 0);
    }

    #[test]
    fn debounced_press_has_no_side_effect() {
        let mut mocks = Mocks::new();
        mocks.feedback.expect_pulse().times(1).returning(|_| Ok(()));
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        press(&clock, &mut recorder, Button::Check);
        clock.advance(Duration::from_millis(300));
        recorder
            .on_button_event(&ButtonEvent::pressed(Button::Check))
            .unwrap();
        assert_eq!(recorder.samples().count(Hole::First), 1);
    }

    #[test]
    fn feedback_failure_does_not_stop_recording() {
        let mut mocks = Mocks::new();
        mocks
            .feedback
            .expect_pulse()
            .returning(|_| Err(RecorderError::Ros("publisher gone".into())));
        let (clock, mut recorder) = mocks.build(&RecordingSettings::default());

        press(&clock, &mut recorder, Button::Check);
        assert_eq!(recorder.samples().count(Hole::First), 1);
    }

    #[test]
    fn handle_routes_cache_updates() {
        let (_clock, mut recorder) = Mocks::new().build(&RecordingSettings::default());
        let pose = Pose::new([1.0, 2.0, 3.0], [1.0, 0.0, 0.0, 0.0]);

        assert_eq!(recorder.handle(RecorderInput::Pose(pose)).unwrap(), Outcome::Continue);
        assert_eq!(recorder.pose(), &pose);
        assert_eq!(
            recorder.handle(RecorderInput::JointState(vec![0.5; 7])).unwrap(),
            Outcome::Continue
        );
    }
}
