//! Session Management: state machine, feedback signals, statistics and the tick loop
//!
//! # Components
//! - `state.rs`: SessionState and the pure transition function
//! - `feedback.rs`: FeedbackSignal and the FeedbackSink seam
//! - `stats.rs`: Per-run counts and pose confusions
//! - `runner.rs`: Scheduler driving ticks, countdown and control commands

pub mod feedback;
pub mod runner;
pub mod state;
pub mod stats;

pub use feedback::{AudioCue, FeedbackSignal, FeedbackSink, GlowState};
pub use runner::{RunEnd, SessionCommand, SessionRunner};
pub use state::SessionMachine;
pub use stats::SessionStats;
