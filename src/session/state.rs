//! Session state and its transition function
//!
//! Maintains:
//! - Current target pose and phase
//! - Hold progress and consecutive error streak
//! - Countdown display value
//!
//! `SessionMachine::transition` is pure: it never mutates its input and never
//! fails. Rules, in precedence order while in progress:
//! 1. `Inconclusive` → low-confidence signal, state unchanged
//! 2. confidence below acceptance → low-confidence signal, state unchanged
//! 3. label == target → hold progress, advance or finish at the hold threshold
//! 4. label != target → error streak, reset the round at the error threshold

use super::feedback::{AudioCue, FeedbackKind, FeedbackSignal, GlowState, SessionEvent};
use crate::classifier::ClassificationOutcome;
use crate::config::{CountdownMode, SessionConfig};
use crate::pose::PoseCatalog;

/// Session lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    InProgress,
    /// Advanced past the last pose; terminal
    Finished,
}

/// Mutable session state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    /// Index into the pose catalog (== catalog length once finished)
    pub target_index: usize,
    /// Consecutive correct ticks toward the current pose
    pub hold_progress: u32,
    /// Consecutive confidently-wrong ticks
    pub error_streak: u32,
    /// Countdown display value
    pub seconds_remaining: u32,
    pub phase: SessionPhase,
}

impl SessionState {
    /// Initial state: first pose, counters cleared, full round on the clock
    pub fn new(round_seconds: u32) -> Self {
        SessionState {
            target_index: 0,
            hold_progress: 0,
            error_streak: 0,
            seconds_remaining: round_seconds,
            phase: SessionPhase::InProgress,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    /// Clear every round counter together
    fn reset_round(&mut self, round_seconds: u32) {
        self.hold_progress = 0;
        self.error_streak = 0;
        self.seconds_remaining = round_seconds;
    }
}

/// Result of one transition
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub feedback: FeedbackSignal,
}

/// Transition rules over an immutable catalog and thresholds
#[derive(Clone, Debug)]
pub struct SessionMachine {
    rules: SessionConfig,
    catalog: PoseCatalog,
}

impl SessionMachine {
    pub fn new(rules: SessionConfig, catalog: PoseCatalog) -> Self {
        SessionMachine { rules, catalog }
    }

    pub fn rules(&self) -> &SessionConfig {
        &self.rules
    }

    pub fn catalog(&self) -> &PoseCatalog {
        &self.catalog
    }

    pub fn initial_state(&self) -> SessionState {
        SessionState::new(self.rules.round_seconds)
    }

    /// Signal shown when the session starts
    pub fn initial_feedback(&self, state: &SessionState) -> FeedbackSignal {
        let target = self.catalog.display_name(state.target_index).to_string();
        self.signal(
            state,
            FeedbackKind::Ready,
            "Status: Ready".to_string(),
            format!("Model loaded! Start the first pose: {}.", target),
            GlowState::None,
            AudioCue::None,
            0,
            SessionEvent::None,
        )
    }

    /// Apply one classification outcome
    pub fn transition(&self, state: &SessionState, outcome: ClassificationOutcome) -> Transition {
        let mut next = state.clone();

        if next.is_finished() {
            let feedback = self.finished_signal(&next, SessionEvent::None);
            return Transition { state: next, feedback };
        }

        let (label, confidence) = match outcome {
            ClassificationOutcome::Inconclusive => {
                let feedback = self.signal(
                    &next,
                    FeedbackKind::LowConfidence,
                    "Status: No clear detection".to_string(),
                    "Cannot see your body clearly. Step fully into the frame and recenter."
                        .to_string(),
                    GlowState::None,
                    AudioCue::None,
                    0,
                    SessionEvent::None,
                );
                return Transition { state: next, feedback };
            }
            ClassificationOutcome::Decided { label, confidence } => (label, confidence),
        };
        let confidence_percent = percent(confidence);

        if confidence < self.rules.acceptance_confidence {
            let feedback = self.signal(
                &next,
                FeedbackKind::LowConfidence,
                "Status: Adjusting or low confidence".to_string(),
                "Keep adjusting your body to raise confidence in the target pose.".to_string(),
                GlowState::None,
                AudioCue::None,
                confidence_percent,
                SessionEvent::None,
            );
            return Transition { state: next, feedback };
        }

        let target_name = self.catalog.display_name(next.target_index).to_string();

        if label == next.target_index {
            next.hold_progress += 1;
            next.error_streak = 0;

            if next.hold_progress >= self.rules.hold_threshold {
                next.reset_round(self.rules.round_seconds);
                next.target_index += 1;

                if next.target_index >= self.catalog.len() {
                    next.phase = SessionPhase::Finished;
                    let mut feedback = self.finished_signal(&next, SessionEvent::Finished);
                    feedback.audio_cue = AudioCue::Success;
                    feedback.confidence_percent = confidence_percent;
                    return Transition { state: next, feedback };
                }

                let next_name = self.catalog.display_name(next.target_index).to_string();
                let feedback = self.signal(
                    &next,
                    FeedbackKind::Advanced,
                    format!("Next pose: {}", next_name),
                    format!(
                        "{} complete! Get ready, you have {} seconds to hold the next pose.",
                        target_name, self.rules.round_seconds
                    ),
                    GlowState::Correct,
                    AudioCue::Success,
                    confidence_percent,
                    SessionEvent::Advanced,
                );
                return Transition { state: next, feedback };
            }

            if self.rules.countdown == CountdownMode::Tick {
                next.seconds_remaining = self.rules.round_seconds.saturating_sub(next.hold_progress);
            }
            let feedback = self.signal(
                &next,
                FeedbackKind::Holding,
                format!("Status: {} - Correct", target_name),
                format!("Hold steady! Accuracy: {}%", confidence_percent),
                GlowState::Correct,
                AudioCue::None,
                confidence_percent,
                SessionEvent::None,
            );
            return Transition { state: next, feedback };
        }

        // Confidently wrong; out-of-range labels land here as "Unknown pose"
        let detected_name = self.catalog.display_name(label);
        next.error_streak += 1;

        if next.error_streak >= self.rules.error_threshold {
            next.reset_round(self.rules.round_seconds);
            let feedback = self.signal(
                &next,
                FeedbackKind::ErrorReset,
                format!("Status: Detected {} (Wrong)", detected_name),
                "Time reset after repeated incorrect poses. Focus on alignment!".to_string(),
                GlowState::Incorrect,
                AudioCue::Error,
                confidence_percent,
                SessionEvent::None,
            );
            return Transition { state: next, feedback };
        }

        let feedback = self.signal(
            &next,
            FeedbackKind::WrongPose,
            format!("Status: Detected {} (Wrong)", detected_name),
            format!("Wrong pose detected. Try to transition to {}.", target_name),
            GlowState::Incorrect,
            AudioCue::None,
            confidence_percent,
            SessionEvent::None,
        );
        Transition { state: next, feedback }
    }

    /// One wall-clock countdown step; only meaningful in `WallClock` mode
    pub fn clock_tick(&self, state: &SessionState) -> SessionState {
        let mut next = state.clone();
        if !next.is_finished() {
            next.seconds_remaining = next.seconds_remaining.saturating_sub(1);
        }
        next
    }

    /// Hold progress as a percentage of the threshold
    pub fn progress_percent(&self, state: &SessionState) -> u32 {
        let threshold = self.rules.hold_threshold.max(1);
        (state.hold_progress.min(threshold) * 100) / threshold
    }

    fn finished_signal(&self, state: &SessionState, event: SessionEvent) -> FeedbackSignal {
        let mut feedback = self.signal(
            state,
            FeedbackKind::Finished,
            "Practice finished".to_string(),
            "You completed the whole yoga sequence. Namaste!".to_string(),
            GlowState::None,
            AudioCue::None,
            0,
            event,
        );
        feedback.pose_title = "Congratulations! All poses complete!".to_string();
        feedback
    }

    #[allow(clippy::too_many_arguments)]
    fn signal(
        &self,
        state: &SessionState,
        kind: FeedbackKind,
        status_text: String,
        detail_text: String,
        glow: GlowState,
        audio_cue: AudioCue,
        confidence_percent: u32,
        event: SessionEvent,
    ) -> FeedbackSignal {
        let target = self.catalog.get(state.target_index);
        FeedbackSignal {
            kind,
            status_text,
            detail_text,
            glow,
            audio_cue,
            progress_percent: self.progress_percent(state),
            confidence_percent,
            seconds_remaining: state.seconds_remaining,
            event,
            pose_title: target.map(|p| p.name.clone()).unwrap_or_default(),
            reference_image: target
                .map(|p| p.reference_image.clone())
                .filter(|r| !r.is_empty()),
        }
    }
}

fn percent(confidence: f32) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUND: u32 = 30;

    fn machine(poses: usize) -> SessionMachine {
        let names: Vec<(String, String)> = (0..poses)
            .map(|i| (format!("Pose {}", i), format!("pose-{}.png", i)))
            .collect();
        SessionMachine::new(SessionConfig::default(), PoseCatalog::new(names).unwrap())
    }

    fn feed(
        machine: &SessionMachine,
        state: SessionState,
        outcome: ClassificationOutcome,
        times: usize,
    ) -> (SessionState, Option<FeedbackSignal>) {
        let mut state = state;
        let mut last = None;
        for _ in 0..times {
            let t = machine.transition(&state, outcome);
            state = t.state;
            last = Some(t.feedback);
        }
        (state, last)
    }

    fn correct(label: usize) -> ClassificationOutcome {
        ClassificationOutcome::decided(label, 0.9)
    }

    #[test]
    fn test_initial_state() {
        let m = machine(2);
        let s = m.initial_state();
        assert_eq!(s.target_index, 0);
        assert_eq!(s.hold_progress, 0);
        assert_eq!(s.error_streak, 0);
        assert_eq!(s.seconds_remaining, ROUND);
        assert_eq!(s.phase, SessionPhase::InProgress);
        assert_eq!(m.initial_feedback(&s).kind, FeedbackKind::Ready);
    }

    #[test]
    fn test_inconclusive_is_inert() {
        let m = machine(2);
        let start = m.initial_state();
        let (after_one, fb) = feed(&m, start.clone(), ClassificationOutcome::Inconclusive, 1);
        let fb = fb.unwrap();
        assert_eq!(after_one, start);
        assert_eq!(fb.kind, FeedbackKind::LowConfidence);
        assert_eq!(fb.glow, GlowState::None);
        assert_eq!(fb.audio_cue, AudioCue::None);
        assert_eq!(fb.confidence_percent, 0);

        for n in [2, 17, 500] {
            let (after, _) = feed(&m, start.clone(), ClassificationOutcome::Inconclusive, n);
            assert_eq!(after, start);
        }
    }

    #[test]
    fn test_inconclusive_mid_round_keeps_counters() {
        let m = machine(2);
        let (s, _) = feed(&m, m.initial_state(), correct(0), 5);
        let (s, _) = feed(&m, s, correct(1), 2);
        let (after, _) = feed(&m, s.clone(), ClassificationOutcome::Inconclusive, 10);
        assert_eq!(after, s);
        assert_eq!(after.hold_progress, 5);
        assert_eq!(after.error_streak, 2);
    }

    #[test]
    fn test_below_acceptance_is_inert() {
        let m = machine(2);
        let start = m.initial_state();
        for label in [0, 1, 99] {
            let t = m.transition(&start, ClassificationOutcome::decided(label, 0.74));
            assert_eq!(t.state, start);
            assert_eq!(t.feedback.kind, FeedbackKind::LowConfidence);
            assert_eq!(t.feedback.confidence_percent, 74);
        }
    }

    #[test]
    fn test_acceptance_boundary_counts() {
        let m = machine(2);
        let t = m.transition(&m.initial_state(), ClassificationOutcome::decided(0, 0.75));
        assert_eq!(t.state.hold_progress, 1);
        assert_eq!(t.feedback.kind, FeedbackKind::Holding);
    }

    #[test]
    fn test_holding_counts_down() {
        let m = machine(2);
        let (s, fb) = feed(&m, m.initial_state(), correct(0), 10);
        let fb = fb.unwrap();
        assert_eq!(s.hold_progress, 10);
        assert_eq!(s.seconds_remaining, 20);
        assert_eq!(fb.kind, FeedbackKind::Holding);
        assert_eq!(fb.glow, GlowState::Correct);
        assert_eq!(fb.confidence_percent, 90);
        assert_eq!(fb.progress_percent, 33);
        assert_eq!(fb.seconds_remaining, 20);
        assert!(fb.detail_text.contains("90%"));
    }

    #[test]
    fn test_29_correct_ticks_do_not_advance() {
        let m = machine(2);
        let (s, _) = feed(&m, m.initial_state(), correct(0), 29);
        assert_eq!(s.target_index, 0);
        assert_eq!(s.hold_progress, 29);
        assert_eq!(s.seconds_remaining, 1);
    }

    #[test]
    fn test_30_correct_ticks_advance() {
        let m = machine(2);
        let (s, _) = feed(&m, m.initial_state(), correct(0), 29);
        let t = m.transition(&s, correct(0));
        assert_eq!(t.state.target_index, 1);
        assert_eq!(t.state.hold_progress, 0);
        assert_eq!(t.state.error_streak, 0);
        assert_eq!(t.state.seconds_remaining, ROUND);
        assert_eq!(t.state.phase, SessionPhase::InProgress);
        assert_eq!(t.feedback.kind, FeedbackKind::Advanced);
        assert_eq!(t.feedback.event, SessionEvent::Advanced);
        assert_eq!(t.feedback.audio_cue, AudioCue::Success);
        assert_eq!(t.feedback.pose_title, "Pose 1");
        assert_eq!(t.feedback.reference_image.as_deref(), Some("pose-1.png"));
    }

    #[test]
    fn test_two_pose_scenario_finishes() {
        let m = machine(2);
        let (s, _) = feed(&m, m.initial_state(), correct(0), 30);
        assert_eq!(s.target_index, 1);
        assert_eq!(s.hold_progress, 0);

        let (s, fb) = feed(&m, s, correct(1), 30);
        let fb = fb.unwrap();
        assert_eq!(s.phase, SessionPhase::Finished);
        assert_eq!(s.target_index, 2);
        assert_eq!(fb.kind, FeedbackKind::Finished);
        assert_eq!(fb.event, SessionEvent::Finished);
        assert_eq!(fb.audio_cue, AudioCue::Success);
    }

    #[test]
    fn test_finished_is_terminal() {
        let m = machine(1);
        let (done, _) = feed(&m, m.initial_state(), correct(0), 30);
        assert!(done.is_finished());

        for outcome in [
            correct(0),
            correct(5),
            ClassificationOutcome::Inconclusive,
            ClassificationOutcome::decided(0, 0.1),
        ] {
            let t = m.transition(&done, outcome);
            assert_eq!(t.state, done);
            assert_eq!(t.feedback.kind, FeedbackKind::Finished);
            assert_eq!(t.feedback.event, SessionEvent::None);
        }
        assert_eq!(m.clock_tick(&done), done);
    }

    #[test]
    fn test_four_wrong_ticks_reset_round() {
        let m = machine(2);
        let (s, _) = feed(&m, m.initial_state(), correct(0), 12);
        let (s, fb) = feed(&m, s, correct(1), 3);
        assert_eq!(s.error_streak, 3);
        assert_eq!(s.hold_progress, 12);
        assert_eq!(fb.unwrap().kind, FeedbackKind::WrongPose);

        let t = m.transition(&s, correct(1));
        assert_eq!(t.state.error_streak, 0);
        assert_eq!(t.state.hold_progress, 0);
        assert_eq!(t.state.seconds_remaining, ROUND);
        assert_eq!(t.state.target_index, 0);
        assert_eq!(t.feedback.kind, FeedbackKind::ErrorReset);
        assert_eq!(t.feedback.audio_cue, AudioCue::Error);
        assert_eq!(t.feedback.glow, GlowState::Incorrect);
    }

    #[test]
    fn test_scenario_four_wrong_from_start() {
        let m = machine(2);
        let (s, _) = feed(&m, m.initial_state(), correct(1), 4);
        assert_eq!(s.error_streak, 0);
        assert_eq!(s.target_index, 0);
    }

    #[test]
    fn test_correct_tick_breaks_error_streak() {
        let m = machine(2);
        let (s, _) = feed(&m, m.initial_state(), correct(0), 5);
        let (s, _) = feed(&m, s, correct(1), 3);
        let t = m.transition(&s, correct(0));
        assert_eq!(t.state.error_streak, 0);
        assert_eq!(t.state.hold_progress, 6);
    }

    #[test]
    fn test_wrong_tick_names_detected_pose() {
        let m = machine(3);
        let t = m.transition(&m.initial_state(), correct(2));
        assert!(t.feedback.status_text.contains("Pose 2"));
        assert!(t.feedback.detail_text.contains("Pose 0"));
        // Countdown untouched by wrong ticks
        assert_eq!(t.state.seconds_remaining, ROUND);
    }

    #[test]
    fn test_unknown_label_is_wrong_pose() {
        let m = machine(2);
        let t = m.transition(&m.initial_state(), correct(42));
        assert_eq!(t.state.error_streak, 1);
        assert_eq!(t.feedback.kind, FeedbackKind::WrongPose);
        assert!(t.feedback.status_text.contains(crate::pose::catalog::UNKNOWN_POSE));

        let (s, _) = feed(&m, m.initial_state(), correct(usize::MAX), 4);
        assert_eq!(s.error_streak, 0);
        assert_eq!(s.target_index, 0);
    }

    #[test]
    fn test_wall_clock_mode_leaves_countdown_to_clock() {
        let rules = SessionConfig {
            countdown: CountdownMode::WallClock,
            ..SessionConfig::default()
        };
        let m = SessionMachine::new(rules, PoseCatalog::new([("A", ""), ("B", "")]).unwrap());

        let (s, _) = feed(&m, m.initial_state(), correct(0), 10);
        assert_eq!(s.seconds_remaining, ROUND);

        let mut s = s;
        for _ in 0..40 {
            s = m.clock_tick(&s);
        }
        assert_eq!(s.seconds_remaining, 0);
        assert_eq!(s.hold_progress, 10);

        let (s, _) = feed(&m, s, correct(0), 20);
        assert_eq!(s.target_index, 1);
        assert_eq!(s.seconds_remaining, ROUND);
    }

    #[test]
    fn test_custom_thresholds() {
        let rules = SessionConfig {
            hold_threshold: 3,
            error_threshold: 2,
            acceptance_confidence: 0.5,
            round_seconds: 10,
            countdown: CountdownMode::Tick,
        };
        let m = SessionMachine::new(rules, PoseCatalog::new([("A", ""), ("B", "")]).unwrap());

        let (s, _) = feed(&m, m.initial_state(), ClassificationOutcome::decided(0, 0.6), 3);
        assert_eq!(s.target_index, 1);
        assert_eq!(s.seconds_remaining, 10);

        let (s, fb) = feed(&m, s, ClassificationOutcome::decided(0, 0.6), 2);
        assert_eq!(s.error_streak, 0);
        assert_eq!(fb.unwrap().kind, FeedbackKind::ErrorReset);
    }

    #[test]
    fn test_empty_reference_image_is_none() {
        let m = SessionMachine::new(
            SessionConfig::default(),
            PoseCatalog::new([("A", "")]).unwrap(),
        );
        let t = m.transition(&m.initial_state(), correct(0));
        assert_eq!(t.feedback.reference_image, None);
    }

    #[test]
    fn test_timer_text() {
        let m = machine(1);
        let fb = m.initial_feedback(&m.initial_state());
        assert_eq!(fb.timer_text(), "00:30");
    }
}
