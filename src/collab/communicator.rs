//! Operator notifications.
//!
//! [`RecordingCommunicator`] keeps every message in memory and mirrors it to
//! `tracing`, which is how the binary surfaces progress to the operator.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::collab::Communicator;
use crate::model::{now_ms, BuildPhase};

/// Message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Progress,
    Error,
    Success,
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub capability_name: String,
    pub phase: Option<BuildPhase>,
    /// Clamped to `[0, 100]`.
    pub percent: Option<f64>,
    pub message: String,
    pub suggestion: Option<String>,
    pub timestamp_ms: u64,
}

/// Communicator that records every message.
#[derive(Debug, Default)]
pub struct RecordingCommunicator {
    messages: Mutex<Vec<Notification>>,
}

impl RecordingCommunicator {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, n: Notification) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(n);
        }
    }

    /// All messages, or only those of `kind`.
    pub fn get_messages(&self, kind: Option<NotificationKind>) -> Vec<Notification> {
        self.messages
            .lock()
            .map(|m| {
                m.iter()
                    .filter(|n| kind.map_or(true, |k| n.kind == k))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn progress_history(&self) -> Vec<Notification> {
        self.get_messages(Some(NotificationKind::Progress))
    }

    pub fn last(&self) -> Option<Notification> {
        self.messages.lock().ok().and_then(|m| m.last().cloned())
    }
}

impl Communicator for RecordingCommunicator {
    fn send_progress(&self, capability_name: &str, phase: BuildPhase, percent: f64, message: &str) {
        let percent = percent.clamp(0.0, 100.0);
        tracing::debug!(
            target: "hotforge::communicator",
            capability = %capability_name,
            %phase,
            percent,
            "{}",
            message
        );
        self.push(Notification {
            kind: NotificationKind::Progress,
            capability_name: capability_name.to_string(),
            phase: Some(phase),
            percent: Some(percent),
            message: message.to_string(),
            suggestion: None,
            timestamp_ms: now_ms(),
        });
    }

    fn send_error(&self, capability_name: &str, message: &str, suggestion: &str) {
        tracing::warn!(
            target: "hotforge::communicator",
            capability = %capability_name,
            suggestion = %suggestion,
            "{}",
            message
        );
        self.push(Notification {
            kind: NotificationKind::Error,
            capability_name: capability_name.to_string(),
            phase: None,
            percent: None,
            message: message.to_string(),
            suggestion: Some(suggestion.to_string()),
            timestamp_ms: now_ms(),
        });
    }

    fn send_success(&self, capability_name: &str, message: &str) {
        tracing::info!(target: "hotforge::communicator", capability = %capability_name, "{}", message);
        self.push(Notification {
            kind: NotificationKind::Success,
            capability_name: capability_name.to_string(),
            phase: None,
            percent: None,
            message: message.to_string(),
            suggestion: None,
            timestamp_ms: now_ms(),
        });
    }
}
