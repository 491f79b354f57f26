//! Feedback signals produced by the session state machine
//!
//! The state machine only builds these values. Rendering them (text, glow,
//! sound, progress bars) is the job of a `FeedbackSink`.

use crate::error::Result;

/// Video glow around the camera feed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlowState {
    None,
    Correct,
    Incorrect,
}

/// Sound to play with this signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioCue {
    None,
    Success,
    Error,
}

/// Sequence-level event carried by the signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    None,
    Advanced,
    Finished,
}

/// Which transition rule produced the signal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Session just started
    Ready,
    /// Inconclusive or below the acceptance threshold
    LowConfidence,
    /// Correct pose, hold in progress
    Holding,
    /// Confidently wrong pose
    WrongPose,
    /// Error streak hit its threshold, round restarted
    ErrorReset,
    /// Hold complete, next pose is the target
    Advanced,
    /// Last pose completed
    Finished,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackSignal {
    pub kind: FeedbackKind,
    pub status_text: String,
    pub detail_text: String,
    pub glow: GlowState,
    pub audio_cue: AudioCue,
    /// Hold progress toward the threshold (0-100)
    pub progress_percent: u32,
    /// Confidence of the decided label (0-100), 0 when inconclusive
    pub confidence_percent: u32,
    pub seconds_remaining: u32,
    pub event: SessionEvent,
    /// Title of the current target pose
    pub pose_title: String,
    pub reference_image: Option<String>,
}

impl FeedbackSignal {
    /// Timer display as `MM:SS`
    pub fn timer_text(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.seconds_remaining / 60,
            self.seconds_remaining % 60
        )
    }
}

/// Receives feedback signals and renders them
pub trait FeedbackSink {
    fn emit(&mut self, signal: &FeedbackSignal) -> Result<()>;
}

impl<T: FeedbackSink + ?Sized> FeedbackSink for &mut T {
    fn emit(&mut self, signal: &FeedbackSignal) -> Result<()> {
        (**self).emit(signal)
    }
}
