//! Repository layer for database operations
//!
//! This module provides CRUD operations for all entities.
//! Every user-scoped query filters on `user_id`, so a record owned by
//! someone else is reported as not found.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

/// Outcome of an idempotent insert
#[derive(Debug, Clone)]
pub enum Insert<T> {
    Created(T),
    Existing(T),
}

impl<T> Insert<T> {
    pub fn into_inner(self) -> T {
        match self {
            Insert::Created(value) | Insert::Existing(value) => value,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Insert::Created(_))
    }
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ===== Reminders =====

    /// Create a reminder unless one already exists for the same
    /// `(user_id, vaccine_name, dose_number)`; the existing row is returned then.
    pub async fn create_reminder_if_absent(
        &self,
        user_id: i64,
        draft: &ReminderDraft,
    ) -> Result<Insert<Reminder>> {
        draft.validate()?;
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, Reminder>(
            r#"
            INSERT INTO reminders (
                user_id, kind, title, vaccine_name, reminder_date, status,
                dose_number, total_doses, recipient, description, icon, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, vaccine_name, dose_number) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(draft.kind)
        .bind(&draft.title)
        .bind(&draft.vaccine_name)
        .bind(draft.reminder_date)
        .bind(ReminderStatus::Pending)
        .bind(draft.dose_number)
        .bind(draft.total_doses)
        .bind(draft.recipient)
        .bind(&draft.description)
        .bind(&draft.icon)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(reminder) = inserted {
            tracing::debug!(
                "Created reminder {} ({} dose {}) for user {}",
                reminder.id,
                reminder.title,
                reminder.dose_number,
                user_id
            );
            return Ok(Insert::Created(reminder));
        }

        let vaccine_name = draft.vaccine_name.as_deref().unwrap_or_default();
        let existing = self
            .find_reminder_by_key(user_id, vaccine_name, draft.dose_number)
            .await?
            .ok_or_else(|| {
                AppError::Generic(format!(
                    "Reminder insert for {} dose {} conflicted but no row was found",
                    vaccine_name, draft.dose_number
                ))
            })?;

        tracing::debug!(
            "Reminder already exists for {} dose {}: {}",
            vaccine_name,
            draft.dose_number,
            existing.id
        );
        Ok(Insert::Existing(existing))
    }

    /// Look up a vaccine reminder by its logical key
    pub async fn find_reminder_by_key(
        &self,
        user_id: i64,
        vaccine_name: &str,
        dose_number: i64,
    ) -> Result<Option<Reminder>> {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT * FROM reminders
            WHERE user_id = ? AND vaccine_name = ? AND dose_number = ?
            "#,
        )
        .bind(user_id)
        .bind(vaccine_name)
        .bind(dose_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reminder)
    }

    /// Get a reminder owned by `user_id`
    pub async fn get_reminder(&self, user_id: i64, id: i64) -> Result<Reminder> {
        sqlx::query_as::<_, Reminder>("SELECT * FROM reminders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Reminder", id))
    }

    /// List a user's reminders of one kind, soonest first, unscheduled last
    pub async fn list_reminders(&self, user_id: i64, kind: ReminderKind) -> Result<Vec<Reminder>> {
        let reminders = sqlx::query_as::<_, Reminder>(
            r#"
            SELECT * FROM reminders
            WHERE user_id = ? AND kind = ?
            ORDER BY reminder_date IS NULL, reminder_date ASC, dose_number ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }

    /// Users that still have at least one pending reminder
    pub async fn list_users_with_pending_reminders(&self) -> Result<Vec<i64>> {
        let users: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM reminders WHERE status = ? ORDER BY user_id",
        )
        .bind(ReminderStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Set a reminder's stored status and completion date
    pub async fn update_reminder_status(
        &self,
        user_id: i64,
        id: i64,
        status: ReminderStatus,
        completion_date: Option<NaiveDate>,
    ) -> Result<Reminder> {
        let reminder = sqlx::query_as::<_, Reminder>(
            r#"
            UPDATE reminders SET status = ?, last_dose_date = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(completion_date)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Reminder", id))?;

        tracing::debug!("Reminder {} is now {:?}", id, status);
        Ok(reminder)
    }

    /// Delete a reminder owned by `user_id`
    pub async fn delete_reminder(&self, user_id: i64, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM reminders WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Reminder", id));
        }

        tracing::debug!("Deleted reminder: {}", id);
        Ok(())
    }

    // ===== Vaccines =====

    /// Insert a reference vaccine or refresh the row with the same name
    pub async fn upsert_vaccine(&self, vaccine: &NewVaccine) -> Result<Vaccine> {
        let vaccine = sqlx::query_as::<_, Vaccine>(
            r#"
            INSERT INTO vaccines (name, icon, description, total_doses, recipient_type, recommended)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                icon = excluded.icon,
                description = excluded.description,
                total_doses = excluded.total_doses,
                recipient_type = excluded.recipient_type,
                recommended = excluded.recommended
            RETURNING *
            "#,
        )
        .bind(&vaccine.name)
        .bind(&vaccine.icon)
        .bind(&vaccine.description)
        .bind(vaccine.total_doses)
        .bind(vaccine.recipient_type)
        .bind(vaccine.recommended)
        .fetch_one(&self.pool)
        .await?;

        Ok(vaccine)
    }

    /// List all vaccines alphabetically
    pub async fn list_vaccines(&self) -> Result<Vec<Vaccine>> {
        let vaccines = sqlx::query_as::<_, Vaccine>("SELECT * FROM vaccines ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(vaccines)
    }

    pub async fn get_vaccine(&self, id: i64) -> Result<Vaccine> {
        sqlx::query_as::<_, Vaccine>("SELECT * FROM vaccines WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Vaccine", id))
    }

    // ===== Babies =====

    /// Create a baby profile. The caller validates the request.
    pub async fn create_baby(
        &self,
        user_id: i64,
        req: &CreateBabyRequest,
        date_of_birth: NaiveDate,
    ) -> Result<Baby> {
        let now = Utc::now();

        let baby = sqlx::query_as::<_, Baby>(
            r#"
            INSERT INTO babies (
                user_id, name, date_of_birth, gender, weight_at_birth_kg,
                height_at_birth_cm, head_circumference_at_birth_cm, blood_type,
                allergies, notes, is_active, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(req.name.trim())
        .bind(date_of_birth)
        .bind(req.gender)
        .bind(req.weight_at_birth_kg)
        .bind(req.height_at_birth_cm)
        .bind(req.head_circumference_at_birth_cm)
        .bind(&req.blood_type)
        .bind(&req.allergies)
        .bind(&req.notes)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created baby {} for user {}", baby.id, user_id);
        Ok(baby)
    }

    /// Get an active baby owned by `user_id`
    pub async fn get_baby(&self, user_id: i64, id: i64) -> Result<Baby> {
        sqlx::query_as::<_, Baby>(
            "SELECT * FROM babies WHERE id = ? AND user_id = ? AND is_active = 1",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Baby", id))
    }

    /// List active babies, newest first
    pub async fn list_babies(&self, user_id: i64) -> Result<Vec<Baby>> {
        let babies = sqlx::query_as::<_, Baby>(
            r#"
            SELECT * FROM babies
            WHERE user_id = ? AND is_active = 1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(babies)
    }

    /// Update the provided fields of a baby profile
    pub async fn update_baby(&self, user_id: i64, req: &UpdateBabyRequest) -> Result<Baby> {
        sqlx::query_as::<_, Baby>(
            r#"
            UPDATE babies SET
                name = COALESCE(?, name),
                date_of_birth = COALESCE(?, date_of_birth),
                gender = COALESCE(?, gender),
                blood_type = COALESCE(?, blood_type),
                allergies = COALESCE(?, allergies),
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE id = ? AND user_id = ? AND is_active = 1
            RETURNING *
            "#,
        )
        .bind(req.name.as_deref().map(str::trim))
        .bind(req.date_of_birth)
        .bind(req.gender)
        .bind(&req.blood_type)
        .bind(&req.allergies)
        .bind(&req.notes)
        .bind(Utc::now())
        .bind(req.id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Baby", req.id))
    }

    /// Soft delete a baby profile
    pub async fn deactivate_baby(&self, user_id: i64, id: i64) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE babies SET is_active = 0, updated_at = ?
            WHERE id = ? AND user_id = ? AND is_active = 1
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Baby", id));
        }

        tracing::debug!("Deactivated baby: {}", id);
        Ok(())
    }

    // ===== Settings =====

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Set setting: {} = {}", key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn opv_draft(dose: i64, due: NaiveDate) -> ReminderDraft {
        ReminderDraft {
            kind: ReminderKind::Vaccine,
            title: "OPV".to_string(),
            vaccine_name: Some("OPV".to_string()),
            reminder_date: Some(due),
            dose_number: dose,
            total_doses: Some(3),
            recipient: Recipient::Baby,
            description: None,
            icon: "💉".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_if_absent_is_idempotent() {
        let repo = create_test_repo().await;
        let draft = opv_draft(1, date(2025, 2, 12));

        let first = repo.create_reminder_if_absent(7, &draft).await.unwrap();
        assert!(first.is_created());
        let first = first.into_inner();

        let second = repo.create_reminder_if_absent(7, &draft).await.unwrap();
        assert!(!second.is_created());
        assert_eq!(second.into_inner().id, first.id);

        let all = repo.list_reminders(7, ReminderKind::Vaccine).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, ReminderStatus::Pending);
        assert!(all[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn test_same_dose_for_other_user_is_separate() {
        let repo = create_test_repo().await;
        let draft = opv_draft(1, date(2025, 2, 12));

        let mine = repo.create_reminder_if_absent(1, &draft).await.unwrap();
        let theirs = repo.create_reminder_if_absent(2, &draft).await.unwrap();

        assert!(mine.is_created());
        assert!(theirs.is_created());
    }

    #[tokio::test]
    async fn test_general_reminders_never_conflict() {
        let repo = create_test_repo().await;
        let draft = ReminderDraft::general("Checkup", date(2025, 3, 1));

        repo.create_reminder_if_absent(1, &draft).await.unwrap();
        let again = repo.create_reminder_if_absent(1, &draft).await.unwrap();

        assert!(again.is_created());
        let general = repo.list_reminders(1, ReminderKind::General).await.unwrap();
        assert_eq!(general.len(), 2);
        assert!(repo.list_reminders(1, ReminderKind::Vaccine).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_store() {
        let repo = create_test_repo().await;
        let draft = opv_draft(0, date(2025, 2, 12));

        let result = repo.create_reminder_if_absent(1, &draft).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(repo.list_reminders(1, ReminderKind::Vaccine).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_status_records_completion() {
        let repo = create_test_repo().await;
        let reminder = repo
            .create_reminder_if_absent(1, &opv_draft(1, date(2025, 2, 12)))
            .await
            .unwrap()
            .into_inner();

        let updated = repo
            .update_reminder_status(1, reminder.id, ReminderStatus::Completed, Some(date(2025, 2, 14)))
            .await
            .unwrap();

        assert!(updated.is_completed());
        assert_eq!(updated.last_dose_date, Some(date(2025, 2, 14)));
        assert!(updated.updated_at.is_some());

        // Another user's id lookups fail as not found
        let foreign = repo
            .update_reminder_status(2, reminder.id, ReminderStatus::Completed, None)
            .await;
        assert!(matches!(foreign, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_orders_by_due_date() {
        let repo = create_test_repo().await;
        repo.create_reminder_if_absent(1, &opv_draft(2, date(2025, 3, 12)))
            .await
            .unwrap();
        repo.create_reminder_if_absent(1, &opv_draft(1, date(2025, 2, 12)))
            .await
            .unwrap();
        let mut unscheduled = opv_draft(3, date(2025, 1, 1));
        unscheduled.reminder_date = None;
        repo.create_reminder_if_absent(1, &unscheduled).await.unwrap();

        let doses: Vec<i64> = repo
            .list_reminders(1, ReminderKind::Vaccine)
            .await
            .unwrap()
            .iter()
            .map(|r| r.dose_number)
            .collect();

        assert_eq!(doses, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_delete_reminder() {
        let repo = create_test_repo().await;
        let reminder = repo
            .create_reminder_if_absent(1, &opv_draft(1, date(2025, 2, 12)))
            .await
            .unwrap()
            .into_inner();

        assert!(repo.delete_reminder(2, reminder.id).await.is_err());
        repo.delete_reminder(1, reminder.id).await.unwrap();
        assert!(repo.get_reminder(1, reminder.id).await.is_err());
        assert!(repo.delete_reminder(1, reminder.id).await.is_err());
    }

    #[tokio::test]
    async fn test_pending_users() {
        let repo = create_test_repo().await;
        let first = repo
            .create_reminder_if_absent(1, &opv_draft(1, date(2025, 2, 12)))
            .await
            .unwrap()
            .into_inner();
        repo.create_reminder_if_absent(4, &opv_draft(1, date(2025, 2, 12)))
            .await
            .unwrap();

        repo.update_reminder_status(1, first.id, ReminderStatus::Completed, None)
            .await
            .unwrap();

        assert_eq!(repo.list_users_with_pending_reminders().await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn test_vaccine_upsert_keeps_single_row() {
        let repo = create_test_repo().await;
        let mut seed = NewVaccine {
            name: "BCG".to_string(),
            icon: "💉".to_string(),
            description: None,
            total_doses: 1,
            recipient_type: RecipientType::Baby,
            recommended: true,
        };

        let first = repo.upsert_vaccine(&seed).await.unwrap();
        seed.description = Some("Tuberculosis".to_string());
        let second = repo.upsert_vaccine(&seed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.description.as_deref(), Some("Tuberculosis"));
        assert_eq!(repo.list_vaccines().await.unwrap().len(), 1);
        assert!(repo.get_vaccine(first.id + 100).await.is_err());
    }

    #[tokio::test]
    async fn test_baby_lifecycle() {
        let repo = create_test_repo().await;
        let req = CreateBabyRequest {
            name: " Ada ".to_string(),
            date_of_birth: Some(date(2025, 1, 1)),
            gender: Some(Gender::Female),
            ..Default::default()
        };

        let baby = repo.create_baby(3, &req, date(2025, 1, 1)).await.unwrap();
        assert_eq!(baby.name, "Ada");
        assert!(baby.is_active);

        let updated = repo
            .update_baby(
                3,
                &UpdateBabyRequest {
                    id: baby.id,
                    notes: Some("Born early".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Born early"));
        assert_eq!(updated.gender, Some(Gender::Female));

        repo.deactivate_baby(3, baby.id).await.unwrap();
        assert!(repo.get_baby(3, baby.id).await.is_err());
        assert!(repo.list_babies(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_settings() {
        let repo = create_test_repo().await;

        repo.set_setting("vaccine_auto_setup:1", "true").await.unwrap();
        assert_eq!(
            repo.get_setting("vaccine_auto_setup:1").await.unwrap(),
            Some("true".to_string())
        );

        repo.set_setting("vaccine_auto_setup:1", "false").await.unwrap();
        assert_eq!(
            repo.get_setting("vaccine_auto_setup:1").await.unwrap(),
            Some("false".to_string())
        );
        assert_eq!(repo.get_setting("missing").await.unwrap(), None);
    }
}
