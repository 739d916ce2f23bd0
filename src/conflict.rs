//! Conflict - Decides whether restoring a backup may overwrite live saves
//!
//! A restore conflicts when the live save data is newer than the backup.
//! Conflicts are settled by a decision remembered from an earlier prompt
//! in the same run, or else by asking the caller.

use crate::manifest::PathType;
use crate::probe::Probe;
use crate::timestamps::{self, Precision};
use std::time::SystemTime;

/// "Apply to all" decision remembered for the rest of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    ReplaceAll,
    SkipAll,
}

/// Answer to a single conflict prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Replace,
    Skip,
}

/// What the prompt returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptAnswer {
    pub choice: Choice,
    /// Remember this choice for the remaining games of the run
    pub apply_to_all: bool,
}

impl PromptAnswer {
    pub fn once(choice: Choice) -> Self {
        Self {
            choice,
            apply_to_all: false,
        }
    }

    pub fn for_all(choice: Choice) -> Self {
        Self {
            choice,
            apply_to_all: true,
        }
    }
}

/// A backup location paired with the live location it restores to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPair {
    pub backup: String,
    pub live: String,
    pub path_type: PathType,
}

/// Live data newer than the backup about to overwrite it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub game: String,
    /// `None` when the backup holds no timestamped files
    pub backup_time: Option<SystemTime>,
    pub live_time: SystemTime,
}

/// Result of checking a game against the remembered decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Skip,
    Prompt(Conflict),
}

/// Compare backup and live modification times; registry paths are ignored
///
/// Live data against a backup with no timestamped files is a conflict.
pub fn detect(
    game: &str,
    pairs: &[PathPair],
    probe: &dyn Probe,
    precision: Precision,
) -> Option<Conflict> {
    let timed = || pairs.iter().filter(|p| p.path_type != PathType::Reg);
    let live_time = timestamps::latest_of(timed().map(|p| p.live.as_str()), probe)?;
    let backup_time = timestamps::latest_of(timed().map(|p| p.backup.as_str()), probe);

    let newer = match backup_time {
        Some(backup_time) => precision.truncate(live_time) > precision.truncate(backup_time),
        None => true,
    };

    if newer {
        Some(Conflict {
            game: game.to_string(),
            backup_time,
            live_time,
        })
    } else {
        None
    }
}

/// Decide a game's fate without prompting
pub fn decide(conflict: Option<Conflict>, remembered: Option<BatchDecision>) -> Verdict {
    match (conflict, remembered) {
        (None, _) => Verdict::Proceed,
        (Some(_), Some(BatchDecision::ReplaceAll)) => Verdict::Proceed,
        (Some(_), Some(BatchDecision::SkipAll)) => Verdict::Skip,
        (Some(conflict), None) => Verdict::Prompt(conflict),
    }
}

/// Carries the remembered decision across the games of one restore run
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    remembered: Option<BatchDecision>,
    precision: Precision,
}

impl ConflictResolver {
    pub fn new(precision: Precision) -> Self {
        Self {
            remembered: None,
            precision,
        }
    }

    /// Start the run with a decision already made (e.g. from a CLI flag)
    pub fn with_decision(mut self, decision: BatchDecision) -> Self {
        self.remembered = Some(decision);
        self
    }

    pub fn remembered(&self) -> Option<BatchDecision> {
        self.remembered
    }

    /// Check one game; returns `true` if its restore should be skipped
    ///
    /// `prompt` is only called for a conflict with no remembered decision.
    pub fn should_skip<F>(
        &mut self,
        game: &str,
        pairs: &[PathPair],
        probe: &dyn Probe,
        prompt: &mut F,
    ) -> bool
    where
        F: FnMut(&Conflict) -> PromptAnswer,
    {
        let conflict = detect(game, pairs, probe, self.precision);

        match decide(conflict, self.remembered) {
            Verdict::Proceed => false,
            Verdict::Skip => {
                tracing::info!("Skipping {} (remembered decision)", game);
                true
            }
            Verdict::Prompt(conflict) => {
                let answer = prompt(&conflict);
                if answer.apply_to_all {
                    self.remembered = Some(match answer.choice {
                        Choice::Replace => BatchDecision::ReplaceAll,
                        Choice::Skip => BatchDecision::SkipAll,
                    });
                }
                answer.choice == Choice::Skip
            }
        }
    }
}
