//! Reminders service
//!
//! Orchestrates the vaccine schedule against the store: one-time auto-setup
//! for a user's baby, dose completion with next-dose advancement, duplicate
//! cleanup, the vaccine overview and due-soon digests.

use crate::config::AUTO_SETUP_SETTING_PREFIX;
use crate::database::{
    Insert, Recipient, RecipientType, Reminder, ReminderDraft, ReminderKind, ReminderStatus,
    Repository,
};
use crate::error::{AppError, Result};
use crate::schedule::{self, classify, days_remaining, DoseKey, Urgency};
use crate::services::notifier::{notify, NotificationKind};
use crate::services::{BabiesService, Clock, Notifier, ReferenceData, VaccinesService};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// What a call to [`RemindersService::ensure_auto_setup`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AutoSetupOutcome {
    AlreadyDone,
    /// No active baby yet; the flag stays unset so a later load retries
    NoBaby,
    Completed {
        created: usize,
        failed_vaccines: Vec<String>,
    },
}

/// Result of marking a dose done
#[derive(Debug, Clone, Serialize)]
pub struct DoseCompletion {
    pub completed: Reminder,
    pub next_dose: Option<Reminder>,
}

/// One row of the vaccine overview: a stored dose or a vaccine not yet scheduled
#[derive(Debug, Clone, Serialize)]
pub struct VaccineEntry {
    pub reminder_id: Option<i64>,
    pub vaccine_name: String,
    pub icon: String,
    pub description: Option<String>,
    pub recipient: Option<Recipient>,
    pub recipient_type: Option<RecipientType>,
    pub dose_number: Option<i64>,
    pub total_doses: Option<i64>,
    pub reminder_date: Option<NaiveDate>,
    pub urgency: Urgency,
    pub recommended: bool,
}

impl VaccineEntry {
    fn is_for(&self, recipient: Recipient) -> bool {
        self.recipient == Some(recipient)
            || self.recipient_type.is_some_and(|t| t.includes(recipient))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VaccineStats {
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
}

/// Overview tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaccineTab {
    All,
    Baby,
    Mother,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaccineOverview {
    pub entries: Vec<VaccineEntry>,
    pub stats: VaccineStats,
}

impl VaccineOverview {
    /// Entries shown on a tab; only the completed tab lists completed doses.
    pub fn filter(&self, tab: VaccineTab) -> Vec<&VaccineEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                let completed = entry.urgency == Urgency::Completed;
                match tab {
                    VaccineTab::Completed => completed,
                    VaccineTab::All => !completed,
                    VaccineTab::Baby => !completed && entry.is_for(Recipient::Baby),
                    VaccineTab::Mother => !completed && entry.is_for(Recipient::Mother),
                }
            })
            .collect()
    }
}

/// Reminders service
#[derive(Clone)]
pub struct RemindersService {
    repo: Repository,
    vaccines: VaccinesService,
    babies: BabiesService,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl RemindersService {
    pub fn new(
        repo: Repository,
        vaccines: VaccinesService,
        babies: BabiesService,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repo,
            vaccines,
            babies,
            clock,
            notifier,
        }
    }

    fn auto_setup_key(user_id: i64) -> String {
        format!("{}:{}", AUTO_SETUP_SETTING_PREFIX, user_id)
    }

    pub async fn is_auto_setup_done(&self, user_id: i64) -> Result<bool> {
        let flag = self.repo.get_setting(&Self::auto_setup_key(user_id)).await?;
        Ok(flag.as_deref() == Some("true"))
    }

    /// Generate every missing vaccine reminder for the user's baby, once.
    ///
    /// Each vaccine is persisted on its own; a failure is logged and the
    /// batch moves on. The auto-setup flag is set after every vaccine was
    /// attempted.
    pub async fn ensure_auto_setup(&self, user_id: i64) -> Result<AutoSetupOutcome> {
        if self.is_auto_setup_done(user_id).await? {
            return Ok(AutoSetupOutcome::AlreadyDone);
        }

        let Some(baby) = self.babies.primary_baby(user_id).await? else {
            tracing::info!("No baby profile for user {}, skipping auto-setup", user_id);
            return Ok(AutoSetupOutcome::NoBaby);
        };

        if baby.date_of_birth > self.clock.today() {
            return Err(AppError::Validation(format!(
                "Date of birth {} is in the future",
                baby.date_of_birth
            )));
        }

        let catalog = self.vaccines.catalog().await?;
        let existing = self.repo.list_reminders(user_id, ReminderKind::Vaccine).await?;

        tracing::info!(
            "Auto-creating vaccine reminders for user {} from birth date {}",
            user_id,
            baby.date_of_birth
        );

        let mut created = 0;
        let mut failed_vaccines = Vec::new();

        for vaccine in catalog.vaccines() {
            if catalog.is_rejected(&vaccine.name) {
                failed_vaccines.push(vaccine.name.clone());
                continue;
            }

            let drafts = schedule::generate(
                std::slice::from_ref(vaccine),
                catalog.schedules(),
                baby.date_of_birth,
                &existing,
            );
            if drafts.is_empty() {
                continue;
            }

            match self.persist_drafts(user_id, &drafts).await {
                Ok(count) => created += count,
                Err(e) => {
                    tracing::error!("Error creating reminders for {}: {}", vaccine.name, e);
                    failed_vaccines.push(vaccine.name.clone());
                }
            }
        }

        self.repo
            .set_setting(&Self::auto_setup_key(user_id), "true")
            .await?;

        tracing::info!(
            "Auto-setup for user {} created {} reminders, {} vaccines failed",
            user_id,
            created,
            failed_vaccines.len()
        );

        if created > 0 {
            notify(
                self.notifier.as_ref(),
                "Vaccine Reminders Created",
                &format!("{} vaccine reminders auto-created.", created),
                &NotificationKind::AutoSetup.tag(None),
            );
        }

        Ok(AutoSetupOutcome::Completed {
            created,
            failed_vaccines,
        })
    }

    async fn persist_drafts(&self, user_id: i64, drafts: &[ReminderDraft]) -> Result<usize> {
        let mut created = 0;
        for draft in drafts {
            if self.repo.create_reminder_if_absent(user_id, draft).await?.is_created() {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Store a vaccine reminder, returning the existing one for a repeated dose
    pub async fn create_vaccine_reminder(
        &self,
        user_id: i64,
        draft: ReminderDraft,
    ) -> Result<Reminder> {
        if draft.kind != ReminderKind::Vaccine {
            return Err(AppError::Validation("Expected a vaccine reminder".into()));
        }
        let inserted = self.repo.create_reminder_if_absent(user_id, &draft).await?;
        Ok(inserted.into_inner())
    }

    /// Mark a vaccine dose done and schedule the next one.
    ///
    /// `completion_date` defaults to today. The next dose is created at most
    /// once; completing the same dose again finds it already stored.
    pub async fn mark_dose_done(
        &self,
        user_id: i64,
        reminder_id: i64,
        completion_date: Option<NaiveDate>,
    ) -> Result<DoseCompletion> {
        let today = self.clock.today();
        let completion_date = completion_date.unwrap_or(today);
        if completion_date > today {
            return Err(AppError::Validation(format!(
                "Completion date {} is in the future",
                completion_date
            )));
        }

        let mut reminder = self.repo.get_reminder(user_id, reminder_id).await?;
        if reminder.kind != ReminderKind::Vaccine {
            return Err(AppError::Validation(format!(
                "Reminder {} is not a vaccine dose",
                reminder_id
            )));
        }

        let catalog = self.vaccines.catalog().await?;
        let next_dose_exists = match schedule::next_dose_key(&reminder) {
            Some(DoseKey {
                vaccine_name,
                dose_number,
            }) => self
                .repo
                .find_reminder_by_key(user_id, &vaccine_name, dose_number)
                .await?
                .is_some(),
            None => false,
        };

        let draft = schedule::on_dose_completed(
            &mut reminder,
            completion_date,
            catalog.schedules(),
            next_dose_exists,
        );

        let completed = self
            .repo
            .update_reminder_status(user_id, reminder_id, reminder.status, reminder.last_dose_date)
            .await?;

        tracing::info!(
            "Marked {} dose {} done for user {}",
            completed.title,
            completed.dose_number,
            user_id
        );

        let next_dose = match draft {
            Some(draft) => match self.repo.create_reminder_if_absent(user_id, &draft).await? {
                Insert::Created(next) => Some(next),
                Insert::Existing(_) => None,
            },
            None => None,
        };

        notify(
            self.notifier.as_ref(),
            &format!("✓ {} Completed", completed.title),
            &format!(
                "Great! You've completed dose {} of the {} vaccine.",
                completed.dose_number, completed.title
            ),
            &NotificationKind::DoseCompleted.tag(Some(&completed.id.to_string())),
        );

        if let Some(next) = &next_dose {
            let due = next
                .reminder_date
                .map(|d| d.format("%a %b %d %Y").to_string())
                .unwrap_or_else(|| "a date to be decided".to_string());
            notify(
                self.notifier.as_ref(),
                &format!("{} - Dose {} Scheduled", next.title, next.dose_number),
                &format!("Next dose scheduled for {}", due),
                &NotificationKind::NextDoseScheduled
                    .tag(Some(&format!("{}-{}", next.title, next.dose_number))),
            );
        }

        Ok(DoseCompletion {
            completed,
            next_dose,
        })
    }

    /// Delete duplicate vaccine reminders, keeping the most recent of each dose
    pub async fn cleanup_duplicates(&self, user_id: i64) -> Result<usize> {
        let reminders = self.repo.list_reminders(user_id, ReminderKind::Vaccine).await?;
        let deduplicated = schedule::deduplicate(reminders);

        for duplicate in &deduplicated.removed {
            self.repo.delete_reminder(user_id, duplicate.id).await?;
            tracing::info!(
                "Deleted duplicate reminder {} for {} dose {}",
                duplicate.id,
                duplicate.title,
                duplicate.dose_number
            );
        }

        Ok(deduplicated.removed.len())
    }

    pub async fn list_reminders(&self, user_id: i64, kind: ReminderKind) -> Result<Vec<Reminder>> {
        self.repo.list_reminders(user_id, kind).await
    }

    /// Run auto-setup if needed, then build the overview.
    ///
    /// A failed auto-setup is logged; the page still loads.
    pub async fn load_vaccine_page(&self, user_id: i64) -> Result<VaccineOverview> {
        if let Err(e) = self.ensure_auto_setup(user_id).await {
            tracing::error!("Vaccine auto-setup failed for user {}: {}", user_id, e);
        }
        self.overview(user_id).await
    }

    /// Stored doses with their urgency plus every vaccine not yet scheduled
    pub async fn overview(&self, user_id: i64) -> Result<VaccineOverview> {
        let today = self.clock.today();
        let catalog = self.vaccines.catalog().await?;
        let reminders = self.repo.list_reminders(user_id, ReminderKind::Vaccine).await?;
        let kept = schedule::deduplicate(reminders).kept;

        let scheduled: HashSet<&str> = kept.iter().filter_map(|r| r.vaccine()).collect();

        let mut entries: Vec<VaccineEntry> = kept
            .iter()
            .map(|reminder| {
                let vaccine_name = reminder.vaccine().unwrap_or(&reminder.title);
                let reference = catalog.find(vaccine_name);
                VaccineEntry {
                    reminder_id: Some(reminder.id),
                    vaccine_name: vaccine_name.to_string(),
                    icon: reminder.icon.clone(),
                    description: reminder.description.clone(),
                    recipient: Some(reminder.recipient),
                    recipient_type: reference.map(|v| v.recipient_type),
                    dose_number: Some(reminder.dose_number),
                    total_doses: reminder.total_doses,
                    reminder_date: reminder.reminder_date,
                    urgency: classify(reminder, today),
                    recommended: reference.is_some_and(|v| v.recommended),
                }
            })
            .collect();

        entries.extend(
            catalog
                .vaccines()
                .iter()
                .filter(|v| !scheduled.contains(v.name.as_str()))
                .map(|vaccine| VaccineEntry {
                    reminder_id: None,
                    vaccine_name: vaccine.name.clone(),
                    icon: vaccine.icon.clone(),
                    description: vaccine.description.clone(),
                    recipient: None,
                    recipient_type: Some(vaccine.recipient_type),
                    dose_number: None,
                    total_doses: Some(vaccine.total_doses),
                    reminder_date: None,
                    urgency: Urgency::Unscheduled,
                    recommended: vaccine.recommended,
                }),
        );

        let stats = VaccineStats {
            completed: entries
                .iter()
                .filter(|e| e.urgency == Urgency::Completed)
                .count(),
            pending: entries
                .iter()
                .filter(|e| e.urgency != Urgency::Completed)
                .count(),
            overdue: entries
                .iter()
                .filter(|e| e.urgency == Urgency::Overdue)
                .count(),
        };

        Ok(VaccineOverview { entries, stats })
    }

    // ===== General reminders =====

    pub async fn create_general_reminder(
        &self,
        user_id: i64,
        title: &str,
        reminder_date: NaiveDate,
    ) -> Result<Reminder> {
        if title.trim().chars().count() > crate::config::MAX_REMINDER_TITLE_LENGTH {
            return Err(AppError::Validation(format!(
                "Reminder title cannot exceed {} characters",
                crate::config::MAX_REMINDER_TITLE_LENGTH
            )));
        }

        tracing::info!("Creating reminder for user {} on {}", user_id, reminder_date);
        let draft = ReminderDraft::general(title.trim(), reminder_date);
        Ok(self.repo.create_reminder_if_absent(user_id, &draft).await?.into_inner())
    }

    /// Complete any reminder; vaccine doses go through advancement
    pub async fn complete_reminder(&self, user_id: i64, reminder_id: i64) -> Result<Reminder> {
        let reminder = self.repo.get_reminder(user_id, reminder_id).await?;
        match reminder.kind {
            ReminderKind::Vaccine => Ok(self
                .mark_dose_done(user_id, reminder_id, None)
                .await?
                .completed),
            ReminderKind::General => {
                self.repo
                    .update_reminder_status(
                        user_id,
                        reminder_id,
                        ReminderStatus::Completed,
                        Some(self.clock.today()),
                    )
                    .await
            }
        }
    }

    pub async fn delete_reminder(&self, user_id: i64, reminder_id: i64) -> Result<()> {
        tracing::info!("Deleting reminder {} for user {}", reminder_id, user_id);
        self.repo.delete_reminder(user_id, reminder_id).await
    }

    // ===== Due-soon digest =====

    /// Notify about every pending reminder that is overdue or due this week
    pub async fn send_due_soon_digest(&self, user_id: i64) -> Result<usize> {
        let today = self.clock.today();
        let mut reminders = self.repo.list_reminders(user_id, ReminderKind::Vaccine).await?;
        reminders.extend(self.repo.list_reminders(user_id, ReminderKind::General).await?);

        let mut sent = 0;
        for reminder in schedule::deduplicate(reminders).kept {
            let urgency = classify(&reminder, today);
            if !urgency.needs_attention() {
                continue;
            }
            let Some(due) = reminder.reminder_date else {
                continue;
            };

            let when = match days_remaining(due, today) {
                0 => "today".to_string(),
                1 => "tomorrow".to_string(),
                days if days < 0 => format!("overdue by {} days", -days),
                days => format!("in {} days", days),
            };
            let title = match reminder.kind {
                ReminderKind::Vaccine => format!("{} - Dose {}", reminder.title, reminder.dose_number),
                ReminderKind::General => reminder.title.clone(),
            };

            notify(
                self.notifier.as_ref(),
                &title,
                &format!("Due {} ({})", when, due),
                &NotificationKind::DueSoon.tag(Some(&reminder.id.to_string())),
            );
            sent += 1;
        }

        tracing::debug!("Sent {} due-soon notifications to user {}", sent, user_id);
        Ok(sent)
    }

    /// Digest for every user with pending reminders; one user's failure is logged
    pub async fn sweep_due_soon(&self) -> Result<usize> {
        let mut sent = 0;
        for user_id in self.repo.list_users_with_pending_reminders().await? {
            match self.send_due_soon_digest(user_id).await {
                Ok(count) => sent += count,
                Err(e) => tracing::error!("Due-soon digest failed for user {}: {}", user_id, e),
            }
        }
        Ok(sent)
    }

    /// Start the background digest sweep
    pub fn start_digest_scheduler(self, period: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Starting due-soon digest scheduler every {:?}", period);

            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                match self.sweep_due_soon().await {
                    Ok(sent) => tracing::info!("Due-soon sweep sent {} notifications", sent),
                    Err(e) => tracing::error!("Error sweeping due-soon reminders: {}", e),
                }
            }
        })
    }
}
