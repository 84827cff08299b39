//! Vetting of actions proposed by an advisor before they may run.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cleanmate_core::PathWhitelist;

/// Actions an advisor may propose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Scan and summarize, deleting nothing.
    Analyze,
    /// Delete the contents of the named targets.
    Clean,
    /// Open the configuration file.
    OpenSettings,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyze => write!(f, "analyze"),
            Self::Clean => write!(f, "clean"),
            Self::OpenSettings => write!(f, "open_settings"),
        }
    }
}

impl FromStr for ActionKind {
    type Err = ActionRejected;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analyze" => Ok(Self::Analyze),
            "clean" => Ok(Self::Clean),
            "open_settings" => Ok(Self::OpenSettings),
            other => Err(ActionRejected::UnknownKind(other.to_string())),
        }
    }
}

/// An action attached to an advisor reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSuggestion {
    /// What to run.
    pub kind: ActionKind,
    /// Button-style label.
    pub label: String,
    /// Longer explanation shown next to the label.
    pub description: String,
    /// Whitelist targets, only meaningful for `clean`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

impl ActionSuggestion {
    /// Suggest an analysis.
    pub fn analyze(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Analyze,
            label: label.into(),
            description: description.into(),
            targets: Vec::new(),
        }
    }

    /// Suggest a cleanup of the given targets.
    pub fn clean<S: Into<String>>(
        targets: impl IntoIterator<Item = S>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind: ActionKind::Clean,
            label: label.into(),
            description: description.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionRejected {
    #[error("Invalid action type: {0}")]
    UnknownKind(String),

    #[error("Clean actions must name at least one target")]
    MissingTargets,

    #[error("Target '{0}' is not whitelisted")]
    NotWhitelisted(String),
}

/// An action that passed every check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyAction {
    /// The vetted suggestion.
    pub action: ActionSuggestion,
    /// When the action was accepted.
    pub timestamp: DateTime<Utc>,
}

/// Accepts only known action kinds and whitelisted clean targets.
#[derive(Debug, Clone)]
pub struct ActionInterpreter {
    whitelist: PathWhitelist,
}

impl ActionInterpreter {
    /// Create an interpreter that accepts targets registered in `whitelist`.
    pub fn new(whitelist: PathWhitelist) -> Self {
        Self { whitelist }
    }

    /// Check an action and stamp it as ready.
    pub fn interpret(&self, action: &ActionSuggestion) -> Result<ReadyAction, ActionRejected> {
        self.validate(action).inspect_err(|reason| {
            tracing::warn!(kind = %action.kind, %reason, "action blocked");
        })?;
        Ok(ReadyAction {
            action: action.clone(),
            timestamp: Utc::now(),
        })
    }

    /// Check an action given as loose strings, e.g. from a remote advisor.
    pub fn interpret_raw(&self, kind: &str, targets: &[String]) -> Result<ReadyAction, ActionRejected> {
        let kind: ActionKind = kind.parse().inspect_err(|reason| {
            tracing::warn!(%reason, "action blocked");
        })?;
        self.interpret(&ActionSuggestion {
            kind,
            label: kind.to_string(),
            description: String::new(),
            targets: targets.to_vec(),
        })
    }

    fn validate(&self, action: &ActionSuggestion) -> Result<(), ActionRejected> {
        if action.kind != ActionKind::Clean {
            return Ok(());
        }
        if action.targets.is_empty() {
            return Err(ActionRejected::MissingTargets);
        }
        match action.targets.iter().find(|t| !self.whitelist.contains(t)) {
            Some(target) => Err(ActionRejected::NotWhitelisted(target.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cleanmate_core::Privilege;

    fn interpreter() -> ActionInterpreter {
        let whitelist = PathWhitelist::new()
            .register("temp", ["/tmp"], Privilege::User)
            .register("browser-cache-chrome", ["/tmp/chrome"], Privilege::User);
        ActionInterpreter::new(whitelist)
    }

    #[test]
    fn test_whitelisted_clean_is_ready() {
        let action = ActionSuggestion::clean(["temp", "browser-cache-chrome"], "Clean", "");
        let ready = interpreter().interpret(&action).unwrap();
        assert_eq!(ready.action, action);
    }

    #[test]
    fn test_unlisted_target_is_rejected() {
        let action = ActionSuggestion::clean(["temp", "documents"], "Clean", "");
        assert_eq!(
            interpreter().interpret(&action).unwrap_err(),
            ActionRejected::NotWhitelisted("documents".to_string())
        );
    }

    #[test]
    fn test_clean_without_targets_is_rejected() {
        let action = ActionSuggestion::clean(Vec::<String>::new(), "Clean", "");
        assert_eq!(
            interpreter().interpret(&action).unwrap_err(),
            ActionRejected::MissingTargets
        );
    }

    #[test]
    fn test_raw_kinds() {
        let interpreter = interpreter();
        assert!(interpreter.interpret_raw("open_settings", &[]).is_ok());
        assert!(matches!(
            interpreter.interpret_raw("format_disk", &[]),
            Err(ActionRejected::UnknownKind(_))
        ));
    }
}
