//! Notification delivery
//!
//! Delivery is fire-and-forget: services log a failed delivery and carry on.

use crate::error::{AppError, Result};
use std::sync::Mutex;

/// What a notification is about; its tag starts with this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    DoseCompleted,
    NextDoseScheduled,
    AutoSetup,
    DueSoon,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::DoseCompleted => "dose-completed",
            NotificationKind::NextDoseScheduled => "next-dose-scheduled",
            NotificationKind::AutoSetup => "vaccine-auto-setup",
            NotificationKind::DueSoon => "due-soon",
        }
    }

    /// Tag for this kind, optionally narrowed to one subject
    pub fn tag(self, subject: Option<&str>) -> String {
        match subject {
            Some(subject) => format!("{}-{}", self.as_str(), subject),
            None => self.as_str().to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn deliver(&self, title: &str, body: &str, tag: &str) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn deliver(&self, title: &str, body: &str, tag: &str) -> Result<()> {
        tracing::info!(tag, "{}: {}", title, body);
        Ok(())
    }
}

/// A delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tag: String,
}

/// Keeps delivered notifications in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|d| d.to_vec())
            .unwrap_or_default()
    }

    /// Delivered notifications whose tag starts with `kind`
    pub fn of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        self.delivered()
            .into_iter()
            .filter(|n| n.tag.starts_with(kind.as_str()))
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn deliver(&self, title: &str, body: &str, tag: &str) -> Result<()> {
        let mut delivered = self
            .delivered
            .lock()
            .map_err(|_| AppError::Generic("Notification log poisoned".into()))?;
        delivered.push(Notification {
            title: title.to_string(),
            body: body.to_string(),
            tag: tag.to_string(),
        });
        Ok(())
    }
}

/// Deliver and swallow any failure
pub fn notify(notifier: &dyn Notifier, title: &str, body: &str, tag: &str) {
    if let Err(e) = notifier.deliver(title, body, tag) {
        tracing::error!("Failed to send notification {}: {}", tag, e);
    }
}
