// src/feedback.rs

// Haptic feedback towards the operator. The pendant vibrates for the given
// number of seconds whenever a pulse is published.

use crate::RecorderError;

/// Fire-and-forget sink for haptic pulses
#[cfg_attr(test, mockall::automock)]
pub trait FeedbackSink {
    /// Requests a vibration lasting `seconds`
    fn pulse(&mut self, seconds: f32) -> Result<(), RecorderError>;
}
