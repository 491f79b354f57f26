//! Session runner: the poll → normalize → classify → transition loop
//!
//! One tick at a time: the next tick is scheduled only after the previous
//! classification and transition complete. Commands and the wall-clock
//! countdown are serviced while a classification is in flight, but a pending
//! stop or restart lets the call finish and then discards its result.

use super::feedback::{AudioCue, FeedbackKind, FeedbackSignal, FeedbackSink, SessionEvent};
use super::state::{SessionMachine, SessionState};
use super::stats::SessionStats;
use crate::classifier::{ClassificationGate, PoseClassifier};
use crate::config::{CountdownMode, ScheduleConfig};
use crate::pose::{FeatureNormalizer, PoseSource};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// External control of a running session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Stop,
    Restart,
}

/// Why the loop ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    Finished,
    Stopped,
}

/// Final state of a run
#[derive(Debug)]
pub struct SessionReport {
    pub end: RunEnd,
    pub state: SessionState,
    pub stats: SessionStats,
}

/// Session context: owns the only mutable `SessionState`
pub struct SessionRunner<S, C, F> {
    machine: SessionMachine,
    normalizer: FeatureNormalizer,
    gate: ClassificationGate<C>,
    source: S,
    sink: F,
    schedule: ScheduleConfig,
}

impl<S, C, F> SessionRunner<S, C, F>
where
    S: PoseSource,
    C: PoseClassifier,
    F: FeedbackSink,
{
    pub fn new(
        machine: SessionMachine,
        normalizer: FeatureNormalizer,
        gate: ClassificationGate<C>,
        source: S,
        sink: F,
        schedule: ScheduleConfig,
    ) -> Self {
        SessionRunner {
            machine,
            normalizer,
            gate,
            source,
            sink,
            schedule,
        }
    }

    /// Run until the sequence is finished or a stop command arrives
    pub async fn run(self, mut commands: mpsc::Receiver<SessionCommand>) -> SessionReport {
        let SessionRunner {
            machine,
            normalizer,
            mut gate,
            source,
            mut sink,
            schedule,
        } = self;

        let wall_clock = machine.rules().countdown == CountdownMode::WallClock;
        let mut clock = tokio::time::interval(schedule.clock_interval());
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        clock.reset();

        let mut state = machine.initial_state();
        let mut stats = SessionStats::new();
        let mut last = machine.initial_feedback(&state);
        emit(&mut sink, &last);
        let mut commands_open = true;

        info!(
            "Session started: {} poses, countdown {:?}",
            machine.catalog().len(),
            machine.rules().countdown
        );

        let end = 'session: loop {
            let pose = source.poll();
            let features = normalizer.normalize(pose.as_ref());
            let mut pending = None;

            let outcome = {
                let classify = gate.classify(&features);
                tokio::pin!(classify);
                loop {
                    tokio::select! {
                        biased;
                        outcome = &mut classify => break outcome,
                        cmd = commands.recv(), if commands_open && pending.is_none() => match cmd {
                            Some(cmd) => pending = Some(cmd),
                            None => commands_open = false,
                        },
                        _ = clock.tick(), if wall_clock => {
                            state = machine.clock_tick(&state);
                            last.seconds_remaining = state.seconds_remaining;
                            emit(&mut sink, &last);
                        }
                    }
                }
            };

            match pending {
                Some(SessionCommand::Stop) => {
                    debug!("Discarding in-flight classification: {:?}", outcome);
                    break 'session RunEnd::Stopped;
                }
                Some(SessionCommand::Restart) => {
                    debug!("Discarding in-flight classification: {:?}", outcome);
                    restart(&machine, &mut state, &mut stats, &mut last, &mut sink);
                    clock.reset();
                    continue 'session;
                }
                None => {}
            }

            let target = state.target_index;
            let transition = machine.transition(&state, outcome);
            stats.record(target, outcome, &transition.feedback);
            state = transition.state;
            last = transition.feedback;
            debug!(
                "Tick: {:?} → target {} hold {} errors {}",
                outcome, state.target_index, state.hold_progress, state.error_streak
            );
            emit(&mut sink, &last);

            // Cue and event fire once; clock re-emits only refresh the countdown
            let event = last.event;
            last.audio_cue = AudioCue::None;
            last.event = SessionEvent::None;

            let wait = match event {
                SessionEvent::Finished => {
                    info!("Sequence complete");
                    break 'session RunEnd::Finished;
                }
                SessionEvent::Advanced => {
                    info!(
                        "Advanced to pose {}: {}",
                        state.target_index,
                        machine.catalog().display_name(state.target_index)
                    );
                    clock.reset();
                    schedule.advance_pause()
                }
                SessionEvent::None if outcome.is_inconclusive() => schedule.retry_interval(),
                SessionEvent::None => {
                    if last.kind == FeedbackKind::ErrorReset {
                        clock.reset();
                    }
                    schedule.classify_interval()
                }
            };

            let sleep = tokio::time::sleep(wait);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    cmd = commands.recv(), if commands_open => match cmd {
                        Some(SessionCommand::Stop) => break 'session RunEnd::Stopped,
                        Some(SessionCommand::Restart) => {
                            restart(&machine, &mut state, &mut stats, &mut last, &mut sink);
                            clock.reset();
                            break;
                        }
                        None => commands_open = false,
                    },
                    _ = &mut sleep => break,
                    _ = clock.tick(), if wall_clock => {
                        state = machine.clock_tick(&state);
                        last.seconds_remaining = state.seconds_remaining;
                        emit(&mut sink, &last);
                    }
                }
            }
        };

        if end == RunEnd::Stopped {
            info!("Session stopped at pose {}", state.target_index);
        }

        SessionReport { end, state, stats }
    }
}

fn restart<F: FeedbackSink>(
    machine: &SessionMachine,
    state: &mut SessionState,
    stats: &mut SessionStats,
    last: &mut FeedbackSignal,
    sink: &mut F,
) {
    info!("Session restarted");
    *state = machine.initial_state();
    *stats = SessionStats::new();
    *last = machine.initial_feedback(state);
    emit(sink, last);
}

fn emit<F: FeedbackSink>(sink: &mut F, signal: &FeedbackSignal) {
    if let Err(e) = sink.emit(signal) {
        warn!("Feedback rendering failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::super::feedback::testing::RecordingSink;
    use super::*;
    use crate::classifier::testing::ScriptedClassifier;
    use crate::classifier::{ClassifierError, Prediction};
    use crate::config::SessionConfig;
    use crate::pose::keypoint::{Keypoint, KeypointSet};
    use crate::pose::{LatestPose, PoseCatalog, CANONICAL_JOINTS};
    use std::time::Duration;
    use tokio::time::Instant;

    fn standing_pose() -> KeypointSet {
        KeypointSet::new(
            CANONICAL_JOINTS
                .iter()
                .enumerate()
                .map(|(i, name)| Keypoint::new(*name, 300.0 + i as f32, 200.0 + 2.0 * i as f32, 0.9))
                .collect(),
        )
    }

    fn runner<'a>(
        rules: SessionConfig,
        classifier: ScriptedClassifier,
        source: LatestPose,
        sink: &'a mut RecordingSink,
    ) -> SessionRunner<LatestPose, ScriptedClassifier, &'a mut RecordingSink> {
        let catalog = PoseCatalog::new([("Mountain", "m.png"), ("Tree", "t.png")]).unwrap();
        SessionRunner::new(
            SessionMachine::new(rules, catalog),
            FeatureNormalizer::default(),
            ClassificationGate::new(classifier),
            source,
            sink,
            ScheduleConfig::default(),
        )
    }

    fn visible_source() -> LatestPose {
        let source = LatestPose::new();
        source.publish(Some(standing_pose()));
        source
    }

    fn script(labels: &[usize]) -> ScriptedClassifier {
        ScriptedClassifier::new(
            labels
                .iter()
                .map(|&label| Ok(vec![Prediction { label, confidence: 0.9 }]))
                .collect(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_pose_session_finishes() {
        let mut labels = vec![0; 30];
        labels.extend(vec![1; 30]);
        let mut sink = RecordingSink::default();
        let (_tx, rx) = mpsc::channel(4);

        let report = runner(SessionConfig::default(), script(&labels), visible_source(), &mut sink)
            .run(rx)
            .await;

        assert_eq!(report.end, RunEnd::Finished);
        assert!(report.state.is_finished());
        assert_eq!(report.stats.poses_completed, 2);
        assert_eq!(sink.signals[0].kind, FeedbackKind::Ready);
        assert_eq!(sink.count(FeedbackKind::Advanced), 1);
        assert_eq!(sink.last().kind, FeedbackKind::Finished);
        assert_eq!(sink.last().event, SessionEvent::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadence_follows_outcome() {
        let rules = SessionConfig {
            hold_threshold: 2,
            ..SessionConfig::default()
        };
        let classifier = ScriptedClassifier::new(vec![
            Ok(vec![]),
            Ok(vec![Prediction { label: 0, confidence: 0.9 }]),
            Ok(vec![Prediction { label: 0, confidence: 0.9 }]),
            Ok(vec![Prediction { label: 1, confidence: 0.9 }]),
            Ok(vec![Prediction { label: 1, confidence: 0.9 }]),
        ]);
        let mut sink = RecordingSink::default();
        let (_tx, rx) = mpsc::channel(4);

        let start = Instant::now();
        let report = runner(rules, classifier, visible_source(), &mut sink).run(rx).await;

        assert_eq!(report.end, RunEnd::Finished);
        // retry 500 + classify 700 + advance 1500 + classify 700
        assert_eq!(start.elapsed(), Duration::from_millis(3400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_person_is_low_confidence_and_retries() {
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1600)).await;
            let _ = tx.send(SessionCommand::Stop).await;
        });

        let classifier = script(&[0, 0, 0, 0]);
        let report = runner(SessionConfig::default(), classifier, LatestPose::new(), &mut sink)
            .run(rx)
            .await;

        assert_eq!(report.end, RunEnd::Stopped);
        assert_eq!(report.state, SessionState::new(30));
        // Ticks at 0, 500, 1000, 1500
        assert_eq!(report.stats.inconclusive, 4);
        assert_eq!(sink.count(FeedbackKind::LowConfidence), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_in_flight_result() {
        let classifier = script(&[0]).with_delay(Duration::from_secs(1));
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);
        tx.send(SessionCommand::Stop).await.unwrap();

        let report = runner(SessionConfig::default(), classifier, visible_source(), &mut sink)
            .run(rx)
            .await;

        assert_eq!(report.end, RunEnd::Stopped);
        assert_eq!(report.state.hold_progress, 0);
        assert_eq!(report.stats.ticks, 0);
        assert_eq!(sink.signals.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_state() {
        let classifier = script(&[0, 0, 0]).with_delay(Duration::from_secs(1));
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);
        tx.send(SessionCommand::Restart).await.unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3900)).await;
            let _ = tx.send(SessionCommand::Stop).await;
        });

        let report = runner(SessionConfig::default(), classifier, visible_source(), &mut sink)
            .run(rx)
            .await;

        // First answer discarded by the restart, next two applied
        assert_eq!(report.end, RunEnd::Stopped);
        assert_eq!(report.state.hold_progress, 2);
        assert_eq!(report.stats.correct, 2);
        assert_eq!(sink.count(FeedbackKind::Ready), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_counts_during_classification() {
        let rules = SessionConfig {
            countdown: CountdownMode::WallClock,
            ..SessionConfig::default()
        };
        let classifier = script(&[0]).with_delay(Duration::from_millis(4500));
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            let _ = tx.send(SessionCommand::Stop).await;
        });

        let report = runner(rules, classifier, visible_source(), &mut sink).run(rx).await;

        // Clock ticks at 1s, 2s, 3s, 4s; the classification itself is discarded
        assert_eq!(report.end, RunEnd::Stopped);
        assert_eq!(report.state.seconds_remaining, 26);
        assert_eq!(report.state.hold_progress, 0);
        assert_eq!(sink.last().seconds_remaining, 26);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_advance_cue_fires_once() {
        let rules = SessionConfig {
            hold_threshold: 1,
            countdown: CountdownMode::WallClock,
            ..SessionConfig::default()
        };
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1400)).await;
            let _ = tx.send(SessionCommand::Stop).await;
        });

        let report = runner(rules, script(&[0]), visible_source(), &mut sink).run(rx).await;

        // Ready, Advanced, then the 1s countdown refresh inside the advance pause
        assert_eq!(report.end, RunEnd::Stopped);
        assert_eq!(sink.signals.len(), 3);
        let cues = sink
            .signals
            .iter()
            .filter(|s| s.audio_cue == AudioCue::Success)
            .count();
        let advances = sink
            .signals
            .iter()
            .filter(|s| s.event == SessionEvent::Advanced)
            .count();
        assert_eq!(cues, 1);
        assert_eq!(advances, 1);
        assert_eq!(sink.last().seconds_remaining, 29);
        assert_eq!(sink.last().audio_cue, AudioCue::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_reset_restarts_wall_clock_second() {
        let rules = SessionConfig {
            error_threshold: 1,
            countdown: CountdownMode::WallClock,
            ..SessionConfig::default()
        };
        let classifier = script(&[1]).with_delay(Duration::from_millis(1500));
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2100)).await;
            let _ = tx.send(SessionCommand::Stop).await;
        });

        let report = runner(rules, classifier, visible_source(), &mut sink).run(rx).await;

        // Clock ticks at 1s, the reset lands at 1.5s and the next tick is due at 2.5s
        assert_eq!(report.end, RunEnd::Stopped);
        assert_eq!(report.stats.resets, 1);
        assert_eq!(report.state.seconds_remaining, 30);
        let errors = sink
            .signals
            .iter()
            .filter(|s| s.audio_cue == AudioCue::Error)
            .count();
        assert_eq!(errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_failure_keeps_running() {
        let classifier = ScriptedClassifier::new(vec![
            Err(ClassifierError::Inference("boom".to_string())),
            Ok(vec![Prediction { label: 0, confidence: 0.9 }]),
        ]);
        let mut sink = RecordingSink::default();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(600)).await;
            let _ = tx.send(SessionCommand::Stop).await;
        });

        let report = runner(SessionConfig::default(), classifier, visible_source(), &mut sink)
            .run(rx)
            .await;

        assert_eq!(report.stats.inconclusive, 1);
        assert_eq!(report.state.hold_progress, 1);
    }
}
