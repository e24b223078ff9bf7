//! # History module
//!
//! This module records the command segments issued while driving manually,
//! and replays them in reverse with negated velocities to retrace the path
//! back to the origin. Replaying recorded commands rather than planning a
//! fresh route is dead-reckoning safe: it works even when the pose is only
//! an estimate integrated from the commands themselves.
//!
//! The replayer is an explicit state machine, `Idle -> Replaying -> Idle`,
//! advanced by the scheduler tick. Each step emits the negated command of one
//! recorded segment and holds it for the segment's recorded duration, polling
//! connectivity before every step.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

// Internal
use comms_if::dev::MotionCmd;
pub use params::Params;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Shortest duration a segment is recorded with or held for during replay.
///
/// Units: milliseconds
pub const MIN_STEP_MS: u64 = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A committed manual-mode command segment and how long it was held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,

    /// Wall-clock time the segment was active.
    ///
    /// Units: milliseconds
    pub duration_ms: u64,
}

/// Recorder of manual-mode command segments.
#[derive(Debug, Default)]
pub struct HistoryRecorder {
    pub(crate) params: Params,

    entries: VecDeque<HistoryEntry>,

    /// The command currently being held, committed once it changes.
    last_cmd: MotionCmd,

    /// When `last_cmd` started being held.
    last_change: Option<Instant>,
}

/// Replayer of recorded history, emitting segments in reverse with negated
/// velocities.
#[derive(Debug)]
pub struct Replayer {
    state: ReplayState,
}

impl Default for Replayer {
    fn default() -> Self {
        Self {
            state: ReplayState::Idle,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum ReplayState {
    Idle,

    Replaying {
        /// Index of the segment currently being replayed, walking from the
        /// newest entry down to 0.
        index: usize,

        /// When the current segment's hold time expires. `None` until the
        /// segment's command has been emitted.
        step_deadline: Option<Instant>,
    },
}

/// Result of stepping the replayer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReplayOutput {
    /// Nothing to do this tick (idle, or holding the current segment).
    None,

    /// A command to be emitted this tick.
    Emit(MotionCmd),

    /// The full history has been replayed. The caller must stop the robot
    /// and clear the history.
    Finished,

    /// The replay was abandoned because the connection dropped. History is
    /// preserved so the operator can retry.
    Aborted,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HistoryEntry {
    /// The command this segment was recorded with.
    pub fn cmd(&self) -> MotionCmd {
        MotionCmd {
            x: self.x,
            y: self.y,
            rotation: self.rotation,
        }
    }
}

impl HistoryRecorder {

    /// Initialise the recorder from its parameter file.
    pub fn init(&mut self, params_path: &str) -> Result<(), util::params::LoadError> {
        self.params = util::params::load(params_path)?;

        Ok(())
    }

    /// Observe the command emitted this tick.
    ///
    /// When the command differs from the held one by more than the change
    /// tolerance the held command is committed as a segment, capturing how
    /// long it was active. Only non-zero segments are recorded. Returns the
    /// committed entry, if any, so the caller can archive it.
    pub fn observe(&mut self, cmd: &MotionCmd, now: Instant) -> Option<HistoryEntry> {
        if !cmd.differs_from(&self.last_cmd, self.params.change_tol) {
            return None;
        }

        let mut committed = None;

        if let Some(since) = self.last_change {
            if !self.last_cmd.is_zero(self.params.change_tol) {
                let held_ms = now.duration_since(since).as_millis() as u64;

                let entry = HistoryEntry {
                    x: self.last_cmd.x,
                    y: self.last_cmd.y,
                    rotation: self.last_cmd.rotation,
                    duration_ms: held_ms.max(MIN_STEP_MS),
                };

                trace!(
                    "History committed ({:.2}, {:.2}, {:.2}) held {} ms",
                    entry.x,
                    entry.y,
                    entry.rotation,
                    entry.duration_ms
                );

                self.entries.push_back(entry);

                // Oldest segments are discarded once the buffer is full
                while self.entries.len() > self.params.capacity {
                    self.entries.pop_front();
                }

                committed = Some(entry);
            }
        }

        self.last_cmd = *cmd;
        self.last_change = Some(now);

        committed
    }

    /// Clear all recorded history and reset the held-command tracker.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            info!("History cleared ({} entries)", self.entries.len());
        }

        self.entries.clear();
        self.last_cmd = MotionCmd::zero();
        self.last_change = None;
    }

    /// The recorded segments, oldest first.
    pub fn entries(&self) -> &VecDeque<HistoryEntry> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Replayer {

    /// Begin replaying `history_len` recorded segments, newest first.
    ///
    /// Returns false without starting if there is nothing to replay or a
    /// replay is already running.
    pub fn start(&mut self, history_len: usize) -> bool {
        if history_len == 0 || self.is_replaying() {
            return false;
        }

        info!("Replay started, {} segments to retrace", history_len);

        self.state = ReplayState::Replaying {
            index: history_len - 1,
            step_deadline: None,
        };

        true
    }

    /// Abandon any replay in progress. Idempotent.
    pub fn cancel(&mut self) {
        if self.is_replaying() {
            info!("Replay cancelled");
        }

        self.state = ReplayState::Idle;
    }

    /// True while a replay is in progress.
    pub fn is_replaying(&self) -> bool {
        !matches!(self.state, ReplayState::Idle)
    }

    /// Advance the replay by one scheduler tick.
    ///
    /// `connected` is polled every step: if the link has dropped the replay
    /// aborts, leaving the history untouched for a later retry.
    pub fn step(
        &mut self,
        entries: &VecDeque<HistoryEntry>,
        now: Instant,
        connected: bool,
    ) -> ReplayOutput {
        let (index, step_deadline) = match self.state {
            ReplayState::Idle => return ReplayOutput::None,
            ReplayState::Replaying {
                index,
                step_deadline,
            } => (index, step_deadline),
        };

        if !connected {
            warn!("Connection lost during replay, aborting");
            self.state = ReplayState::Idle;
            return ReplayOutput::Aborted;
        }

        // The history shrinking underneath a running replay means the caller
        // broke the protocol, abort rather than panic on the bad index
        if index >= entries.len() {
            warn!("History changed during replay, aborting");
            self.state = ReplayState::Idle;
            return ReplayOutput::Aborted;
        }

        match step_deadline {
            // Current segment not yet emitted
            None => {
                let entry = &entries[index];

                self.state = ReplayState::Replaying {
                    index,
                    step_deadline: Some(now + hold_duration(entry)),
                };

                ReplayOutput::Emit(entry.cmd().negated())
            }

            // Holding the current segment until its deadline
            Some(deadline) if now >= deadline => {
                if index == 0 {
                    info!("Replay complete");
                    self.state = ReplayState::Idle;
                    return ReplayOutput::Finished;
                }

                let next = index - 1;
                let entry = &entries[next];

                self.state = ReplayState::Replaying {
                    index: next,
                    step_deadline: Some(now + hold_duration(entry)),
                };

                ReplayOutput::Emit(entry.cmd().negated())
            }

            Some(_) => ReplayOutput::None,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn hold_duration(entry: &HistoryEntry) -> Duration {
    Duration::from_millis(entry.duration_ms.max(MIN_STEP_MS))
}

#[cfg(test)]
mod test {
    use super::*;

    fn recorder() -> HistoryRecorder {
        let mut rec = HistoryRecorder::default();
        rec.params = Params::default();
        rec
    }

    fn cmd(x: f64, y: f64, rotation: f64) -> MotionCmd {
        MotionCmd { x, y, rotation }
    }

    #[test]
    fn test_commits_previous_segment_on_change() {
        let mut rec = recorder();
        let t0 = Instant::now();

        assert!(rec.observe(&cmd(1.0, 0.0, 0.0), t0).is_none());

        let entry = rec
            .observe(&cmd(0.0, 0.0, 0.0), t0 + Duration::from_millis(500))
            .unwrap();

        assert_eq!(entry.x, 1.0);
        assert_eq!(entry.duration_ms, 500);
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn test_small_changes_not_committed() {
        let mut rec = recorder();
        let t0 = Instant::now();

        rec.observe(&cmd(1.0, 0.0, 0.0), t0);

        // Within the 0.01 tolerance on every axis, no commit
        assert!(rec
            .observe(&cmd(0.995, 0.005, 0.0), t0 + Duration::from_millis(100))
            .is_none());
        assert_eq!(rec.len(), 0);
    }

    #[test]
    fn test_zero_segments_not_recorded() {
        let mut rec = recorder();
        let t0 = Instant::now();

        rec.observe(&cmd(0.0, 0.0, 0.0), t0);
        assert!(rec
            .observe(&cmd(1.0, 0.0, 0.0), t0 + Duration::from_millis(200))
            .is_none());
        assert_eq!(rec.len(), 0);
    }

    #[test]
    fn test_duration_floor() {
        let mut rec = recorder();
        let t0 = Instant::now();

        rec.observe(&cmd(1.0, 0.0, 0.0), t0);
        let entry = rec
            .observe(&cmd(0.0, 1.0, 0.0), t0 + Duration::from_millis(2))
            .unwrap();

        assert_eq!(entry.duration_ms, MIN_STEP_MS);
    }

    #[test]
    fn test_capacity_discards_oldest() {
        let mut rec = recorder();
        rec.params.capacity = 3;
        let t0 = Instant::now();

        for i in 0..6 {
            let v = if i % 2 == 0 { 1.0 } else { -1.0 };
            rec.observe(&cmd(v, 0.0, 0.0), t0 + Duration::from_millis(i * 100));
        }

        assert_eq!(rec.len(), 3);

        // The newest committed segment is the 5th command held from 400 to
        // 500 ms
        let newest = rec.entries().back().unwrap();
        assert_eq!(newest.x, 1.0);
    }

    #[test]
    fn test_replay_single_entry() {
        let mut replayer = Replayer::default();
        let mut entries = VecDeque::new();
        entries.push_back(HistoryEntry {
            x: 1.0,
            y: 0.0,
            rotation: 0.0,
            duration_ms: 500,
        });

        let t0 = Instant::now();
        assert!(replayer.start(entries.len()));

        // First step emits the negated command
        assert_eq!(
            replayer.step(&entries, t0, true),
            ReplayOutput::Emit(cmd(-1.0, 0.0, 0.0))
        );

        // Held until the 500 ms deadline
        assert_eq!(
            replayer.step(&entries, t0 + Duration::from_millis(400), true),
            ReplayOutput::None
        );

        // Deadline passed: replay complete
        assert_eq!(
            replayer.step(&entries, t0 + Duration::from_millis(500), true),
            ReplayOutput::Finished
        );
        assert!(!replayer.is_replaying());
    }

    #[test]
    fn test_replay_reverse_order_and_negation() {
        let mut replayer = Replayer::default();
        let mut entries = VecDeque::new();
        entries.push_back(HistoryEntry {
            x: 1.0,
            y: 0.0,
            rotation: 0.0,
            duration_ms: 100,
        });
        entries.push_back(HistoryEntry {
            x: 0.0,
            y: -0.5,
            rotation: 0.2,
            duration_ms: 200,
        });

        let t0 = Instant::now();
        replayer.start(entries.len());

        // Newest segment first, negated
        assert_eq!(
            replayer.step(&entries, t0, true),
            ReplayOutput::Emit(cmd(0.0, 0.5, -0.2))
        );

        // After its 200 ms hold, the older segment follows
        assert_eq!(
            replayer.step(&entries, t0 + Duration::from_millis(200), true),
            ReplayOutput::Emit(cmd(-1.0, 0.0, 0.0))
        );

        assert_eq!(
            replayer.step(&entries, t0 + Duration::from_millis(300), true),
            ReplayOutput::Finished
        );
    }

    #[test]
    fn test_replay_aborts_on_disconnect() {
        let mut replayer = Replayer::default();
        let mut entries = VecDeque::new();
        entries.push_back(HistoryEntry {
            x: 1.0,
            y: 0.0,
            rotation: 0.0,
            duration_ms: 100,
        });

        let t0 = Instant::now();
        replayer.start(entries.len());
        replayer.step(&entries, t0, true);

        assert_eq!(
            replayer.step(&entries, t0 + Duration::from_millis(50), false),
            ReplayOutput::Aborted
        );
        assert!(!replayer.is_replaying());

        // History untouched for a retry
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_replay_is_exact_inverse() {
        // Drive a session, then check that replaying the recorded history
        // returns the integrated position to the origin and the rotation
        // stream to zero
        let mut rec = recorder();
        let t0 = Instant::now();

        let session: &[(MotionCmd, u64)] = &[
            (cmd(0.0, 1.0, 0.0), 700),
            (cmd(1.0, 0.0, 0.1), 300),
            (cmd(0.0, -0.5, -0.2), 400),
        ];

        let mut t = t0;
        let mut integral = (0.0f64, 0.0f64, 0.0f64);
        for (c, held_ms) in session {
            rec.observe(c, t);
            t += Duration::from_millis(*held_ms);
            integral.0 += c.x * (*held_ms as f64);
            integral.1 += c.y * (*held_ms as f64);
            integral.2 += c.rotation * (*held_ms as f64);
        }
        // Release the stick to commit the final segment
        rec.observe(&cmd(0.0, 0.0, 0.0), t);
        assert_eq!(rec.len(), 3);

        // Replay: each step must emit the negation of the next entry in
        // reverse order, held for exactly its recorded duration
        let mut replayer = Replayer::default();
        assert!(replayer.start(rec.len()));

        let recorded: Vec<HistoryEntry> = rec.entries().iter().cloned().collect();
        let mut now = t;

        for entry in recorded.iter().rev() {
            let emitted = match replayer.step(rec.entries(), now, true) {
                ReplayOutput::Emit(c) => c,
                o => panic!("expected an emission, got {:?}", o),
            };
            assert_eq!(emitted, entry.cmd().negated());

            integral.0 += emitted.x * entry.duration_ms as f64;
            integral.1 += emitted.y * entry.duration_ms as f64;
            integral.2 += emitted.rotation * entry.duration_ms as f64;

            now += Duration::from_millis(entry.duration_ms);
        }

        assert_eq!(replayer.step(rec.entries(), now, true), ReplayOutput::Finished);

        assert!(integral.0.abs() < 1e-9);
        assert!(integral.1.abs() < 1e-9);
        assert!(integral.2.abs() < 1e-9);
    }
}
