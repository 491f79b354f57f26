//! CLI Interface: terminal feedback and key input
//!
//! # Components
//! - `display.rs`: Feedback rendering and session summary
//! - `input.rs`: Keystroke capture using crossterm

pub mod display;
pub mod input;

pub use display::{print_summary, Display};
pub use input::InputHandler;
