//! Report - Per-game outcomes and aggregated errors of a batch run

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What happened to a game in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Backup,
    Restore,
    Skip,
    Error,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Backup => write!(f, "backup"),
            Operation::Restore => write!(f, "restore"),
            Operation::Skip => write!(f, "skip"),
            Operation::Error => write!(f, "error"),
        }
    }
}

/// Outcome for a single game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOutcome {
    pub game: String,
    pub operation: Operation,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: HashMap<String, serde_json::Value>,
}

impl GameOutcome {
    pub fn new(game: &str, operation: Operation, success: bool, message: Option<String>) -> Self {
        Self {
            game: game.to_string(),
            operation,
            success,
            message,
            details: HashMap::new(),
        }
    }

    /// Outcome for a game whose operation failed
    pub fn failed(game: &str, message: String) -> Self {
        Self::new(game, Operation::Error, false, Some(message))
    }

    /// Add a detail field
    pub fn with_detail(mut self, key: &str, value: serde_json::Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    /// Get a detail field
    pub fn get_detail(&self, key: &str) -> Option<&serde_json::Value> {
        self.details.get(key)
    }
}

/// Results of backing up or restoring a batch of games
///
/// Failures never escape the batch; they are collected as user-facing
/// messages in `errors` alongside the per-game outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<GameOutcome>,
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome; failures also add to the error list
    pub fn push(&mut self, outcome: GameOutcome) {
        if !outcome.success {
            let message = outcome.message.as_deref().unwrap_or("failed");
            self.errors.push(format!("{}: {}", outcome.game, message));
        }
        self.outcomes.push(outcome);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Outcomes with the given operation
    pub fn with_operation(&self, operation: Operation) -> impl Iterator<Item = &GameOutcome> {
        self.outcomes.iter().filter(move |o| o.operation == operation)
    }
}
