//! Toast notifications and the summary wording used after menu mutations.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::bulk::{BatchOutcome, BatchReport};
use super::kind::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationVariant {
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: Option<String>,
    pub variant: Option<NotificationVariant>,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
            variant: None,
        }
    }

    pub fn destructive(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
            variant: Some(NotificationVariant::Destructive),
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == Some(NotificationVariant::Destructive)
    }
}

/// The toast surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log. Used by the command-line tool.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let description = notification.description.as_deref().unwrap_or("");
        if notification.is_destructive() {
            error!("{} {}", notification.title, description);
        } else {
            info!("{} {}", notification.title, description);
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        match self.notifications.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(poisoned) => {
                warn!("Notification log poisoned; recovering");
                poisoned.into_inner().push(notification)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Clone,
    Remove,
    Detach,
}

impl MenuAction {
    fn past_tense(&self) -> &'static str {
        match self {
            MenuAction::Clone => "Cloned",
            MenuAction::Remove => "Removed",
            MenuAction::Detach => "Detached",
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            MenuAction::Clone => "clone",
            MenuAction::Remove => "remove",
            MenuAction::Detach => "detach",
        }
    }
}

fn items(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}

/// The single summary shown when a bulk operation finishes.
pub fn batch_summary(action: MenuAction, report: &BatchReport) -> Notification {
    match report.outcome() {
        BatchOutcome::Empty => Notification {
            title: format!("Nothing to {}", action.verb()),
            description: Some("No selected rows could be resolved.".to_string()),
            variant: None,
        },
        BatchOutcome::AllSucceeded => Notification::success(
            format!("{} {}", action.past_tense(), items(report.succeeded)),
            None,
        ),
        BatchOutcome::AllFailed => Notification::destructive(
            format!("Failed to {} {}", action.verb(), items(report.failed)),
            Some("No changes were applied.".to_string()),
        ),
        BatchOutcome::Partial => Notification::destructive(
            format!("{} with errors", action.past_tense()),
            Some(format!(
                "{} succeeded, {} failed.",
                report.succeeded, report.failed
            )),
        ),
    }
}

/// Pass/fail message for a single-item mutation.
pub fn single_result(action: MenuAction, kind: EntityKind, ok: bool) -> Notification {
    if ok {
        Notification::success(
            format!(
                "{} {}",
                kind.display_name(),
                action.past_tense().to_lowercase()
            ),
            None,
        )
    } else {
        Notification::destructive(
            format!("Failed to {} {}", action.verb(), kind.as_str()),
            None,
        )
    }
}

/// Message for a bulk operation that stopped at its first error.
pub fn aborted(action: MenuAction, error: &impl std::fmt::Display) -> Notification {
    Notification::destructive(
        format!("Failed to {} selection", action.verb()),
        Some(error.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(succeeded: usize, failed: usize) -> BatchReport {
        BatchReport {
            succeeded,
            failed,
            skipped: 0,
        }
    }

    #[test]
    fn summaries_cover_the_three_outcomes() {
        let all = batch_summary(MenuAction::Detach, &report(3, 0));
        assert_eq!(all.title, "Detached 3 items");
        assert!(!all.is_destructive());

        let none = batch_summary(MenuAction::Detach, &report(0, 2));
        assert_eq!(none.title, "Failed to detach 2 items");
        assert!(none.is_destructive());

        let partial = batch_summary(MenuAction::Remove, &report(2, 1));
        assert_eq!(partial.title, "Removed with errors");
        assert_eq!(
            partial.description.as_deref(),
            Some("2 succeeded, 1 failed.")
        );
        assert!(partial.is_destructive());
    }

    #[test]
    fn single_results_name_the_kind() {
        let ok = single_result(MenuAction::Detach, EntityKind::Category, true);
        assert_eq!(ok.title, "Category detached");
        let failed = single_result(MenuAction::Detach, EntityKind::Product, false);
        assert_eq!(failed.title, "Failed to detach product");
        assert!(failed.is_destructive());
    }

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notification::success("first", None));
        notifier.notify(Notification::destructive("second", None));
        let titles: Vec<String> = notifier
            .notifications()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }
}
