//! Terminal feedback rendering
//!
//! Features:
//! - Target pose title and reference image
//! - Status line colored by glow state
//! - Confidence and hold progress bars, `MM:SS` countdown
//! - Audio cues as a terminal bell

use crate::error::Result;
use crate::session::{AudioCue, FeedbackSignal, FeedbackSink, GlowState, SessionStats};
use crate::pose::PoseCatalog;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use std::io::{stdout, Write};

const BAR_WIDTH: usize = 30;

/// Terminal display manager
pub struct Display {
    /// Whether raw mode was enabled by us
    raw_mode: bool,
}

impl Display {
    /// Create display and switch the terminal to raw mode
    pub fn new() -> Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), cursor::Hide)?;
        Ok(Display { raw_mode: true })
    }

    /// Clear screen
    pub fn clear(&self) -> Result<()> {
        execute!(stdout(), terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        Ok(())
    }

    fn bar(percent: u32) -> String {
        let filled = (percent.min(100) as usize * BAR_WIDTH) / 100;
        format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
    }

    fn percent_color(percent: u32) -> Color {
        if percent >= 90 {
            Color::Green
        } else if percent >= 75 {
            Color::Yellow
        } else {
            Color::Red
        }
    }

    /// Draw one full feedback frame
    pub fn render(&self, signal: &FeedbackSignal) -> Result<()> {
        let mut out = stdout();

        let glow = match signal.glow {
            GlowState::Correct => Color::Green,
            GlowState::Incorrect => Color::Red,
            GlowState::None => Color::White,
        };

        queue!(
            out,
            terminal::Clear(ClearType::All),
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Cyan),
            Print("Pose: "),
            ResetColor,
            Print(&signal.pose_title),
            cursor::MoveTo(0, 1),
            SetForegroundColor(Color::DarkGrey),
            Print(format!(
                "Reference: {}",
                signal.reference_image.as_deref().unwrap_or("-")
            )),
            ResetColor,
            cursor::MoveTo(0, 3),
            SetForegroundColor(glow),
            Print(&signal.status_text),
            ResetColor,
            cursor::MoveTo(0, 4),
            Print(&signal.detail_text),
        )?;

        queue!(
            out,
            cursor::MoveTo(0, 6),
            SetForegroundColor(Color::Magenta),
            Print("Confidence: "),
            SetForegroundColor(Self::percent_color(signal.confidence_percent)),
            Print(Self::bar(signal.confidence_percent)),
            ResetColor,
            Print(format!(" {:>3}%", signal.confidence_percent)),
            cursor::MoveTo(0, 7),
            SetForegroundColor(Color::Magenta),
            Print("Hold:       "),
            SetForegroundColor(Color::Blue),
            Print(Self::bar(signal.progress_percent)),
            ResetColor,
            Print(format!(" {:>3}%", signal.progress_percent)),
            cursor::MoveTo(0, 8),
            SetForegroundColor(Color::Magenta),
            Print("Time left:  "),
            ResetColor,
            Print(signal.timer_text()),
            cursor::MoveTo(0, 10),
            SetForegroundColor(Color::DarkGrey),
            Print("r to restart  |  Esc / Ctrl+C to exit"),
            ResetColor,
        )?;

        if signal.audio_cue != AudioCue::None {
            queue!(out, Print('\u{7}'))?;
        }

        out.flush()?;
        Ok(())
    }

    /// Show the pose sequence before the session starts
    pub fn show_catalog(&self, catalog: &PoseCatalog) -> Result<()> {
        let mut out = stdout();
        queue!(
            out,
            cursor::MoveTo(0, 12),
            SetForegroundColor(Color::Blue),
            Print("─".repeat(50)),
            ResetColor,
        )?;
        for (row, pose) in catalog.iter().enumerate() {
            queue!(
                out,
                cursor::MoveTo(0, 13 + row as u16),
                Print(format!("{}. {}", pose.index + 1, pose.name)),
            )?;
        }
        out.flush()?;
        Ok(())
    }

    /// Reset terminal state and cleanup
    pub fn shutdown(&mut self) -> Result<()> {
        if self.raw_mode {
            execute!(stdout(), cursor::Show, cursor::MoveTo(0, 0), terminal::Clear(ClearType::All))?;
            terminal::disable_raw_mode()?;
            self.raw_mode = false;
        }
        Ok(())
    }
}

impl FeedbackSink for Display {
    fn emit(&mut self, signal: &FeedbackSignal) -> Result<()> {
        self.render(signal)
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        // Best effort cleanup
        let _ = self.shutdown();
    }
}

/// Print the end-of-session summary (after the display is shut down)
pub fn print_summary(stats: &SessionStats, catalog: &PoseCatalog, finished: bool) {
    if finished {
        println!("🧘 Practice complete! All {} poses held.", catalog.len());
    } else {
        println!("Session ended early.");
    }
    println!(
        "📊 Poses completed: {} | Accuracy: {:.0}% | Ticks: {} | Resets: {} | {:.1}s",
        stats.poses_completed,
        stats.accuracy() * 100.0,
        stats.ticks,
        stats.resets,
        stats.duration_secs()
    );
    if stats.inconclusive + stats.low_confidence > 0 {
        println!(
            "   Unclear detections: {} | Low confidence: {}",
            stats.inconclusive, stats.low_confidence
        );
    }
    for ((target, detected), count) in stats.confusions.persistent() {
        println!(
            "⚠️  {} was mistaken for {} ({} times)",
            catalog.display_name(target),
            catalog.display_name(detected),
            count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_width() {
        assert_eq!(Display::bar(0).chars().count(), BAR_WIDTH);
        assert_eq!(Display::bar(100), "█".repeat(BAR_WIDTH));
        assert_eq!(Display::bar(250), "█".repeat(BAR_WIDTH));
        assert_eq!(Display::bar(50).chars().filter(|&c| c == '█').count(), 15);
    }

    #[test]
    fn test_percent_color() {
        assert_eq!(Display::percent_color(95), Color::Green);
        assert_eq!(Display::percent_color(80), Color::Yellow);
        assert_eq!(Display::percent_color(10), Color::Red);
    }
}
