// src/session.rs

// Main-thread event loop. ROS callbacks and the Desk listener only forward
// `RecorderInput`s into a channel; the session drains it between middleware
// spins so the recorder itself is only ever touched from one thread.

use crossbeam_channel::{Receiver, TryRecvError};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::RecorderError;
use crate::core::{Outcome, Recorder, RecorderInput};

/// Where the session stands after draining pending inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Still recording
    Running,
    /// Recording over, shut down with this reason
    Finished(&'static str),
    /// Ctrl-C before saving
    Interrupted,
    /// Every input source went away
    Disconnected,
}

/// Owns the recorder and the receiving end of the input channel
pub struct Session {
    recorder: Recorder,
    inputs: Receiver<RecorderInput>,
    interrupted: Arc<AtomicBool>,
}

impl Session {
    /// Wraps a recorder; `interrupted` is raised by the Ctrl-C handler
    pub fn new(
        recorder: Recorder,
        inputs: Receiver<RecorderInput>,
        interrupted: Arc<AtomicBool>,
    ) -> Self {
        Session {
            recorder,
            inputs,
            interrupted,
        }
    }

    /// Handles every input already queued
    pub fn pump(&mut self) -> Result<SessionState, RecorderError> {
        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                warn!("Interrupted, exiting without saving");
                return Ok(SessionState::Interrupted);
            }
            match self.inputs.try_recv() {
                Ok(input) => {
                    if let Outcome::Shutdown(reason) = self.recorder.handle(input)? {
                        info!("Shutting down: {}", reason);
                        return Ok(SessionState::Finished(reason));
                    }
                }
                Err(TryRecvError::Empty) => return Ok(SessionState::Running),
                Err(TryRecvError::Disconnected) => {
                    warn!("All input sources closed");
                    return Ok(SessionState::Disconnected);
                }
            }
        }
    }

    /// Alternates `spin` (the middleware's turn) with draining inputs until
    /// the session ends
    pub fn run<F>(&mut self, period: Duration, mut spin: F) -> Result<SessionState, RecorderError>
    where
        F: FnMut(Duration) -> Result<(), RecorderError>,
    {
        loop {
            spin(period)?;
            match self.pump()? {
                SessionState::Running => continue,
                done => return Ok(done),
            }
        }
    }

    /// The wrapped recorder
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }
}
