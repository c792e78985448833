// core/mod.rs

// The recorder core: cached robot state, per-hole samples, the debounce
// filter, and the button handling that ties them together. Nothing in here
// talks to ROS or Desk directly.

pub mod debounce;
pub mod recorder;
pub mod samples;
pub mod state;

pub use debounce::{Clock, Debouncer, ManualClock, MonotonicClock};
pub use recorder::{
    BUTTONS_LOST_REASON, Collaborators, Outcome, Recorder, RecorderInput, SHUTDOWN_REASON,
};
pub use samples::{HoleSamples, SampleSet, SampleTable};
pub use state::{Hole, JointCache, JointPositions, Pose};
