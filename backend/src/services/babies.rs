//! Baby profiles
//!
//! The most recently added active baby anchors a user's vaccine schedule.

use crate::config::MAX_BABY_NAME_LENGTH;
use crate::database::{Baby, CreateBabyRequest, Repository, UpdateBabyRequest};
use crate::error::{AppError, Result};
use crate::services::Clock;
use chrono::NaiveDate;
use std::sync::Arc;

/// Service for managing baby profiles
#[derive(Clone)]
pub struct BabiesService {
    repo: Repository,
    clock: Arc<dyn Clock>,
}

impl BabiesService {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    fn validate_name(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Baby name is required".into()));
        }
        if name.chars().count() > MAX_BABY_NAME_LENGTH {
            return Err(AppError::Validation(format!(
                "Baby name cannot exceed {} characters",
                MAX_BABY_NAME_LENGTH
            )));
        }
        Ok(())
    }

    fn validate_birth_date(&self, date_of_birth: NaiveDate) -> Result<()> {
        if date_of_birth > self.clock.today() {
            return Err(AppError::Validation(format!(
                "Date of birth {} is in the future",
                date_of_birth
            )));
        }
        Ok(())
    }

    /// Create a baby profile
    pub async fn create_baby(&self, user_id: i64, req: CreateBabyRequest) -> Result<Baby> {
        self.validate_name(&req.name)?;
        let date_of_birth = req
            .date_of_birth
            .ok_or_else(|| AppError::Validation("Date of birth is required".into()))?;
        self.validate_birth_date(date_of_birth)?;

        tracing::info!("Creating baby profile for user {}", user_id);
        let baby = self.repo.create_baby(user_id, &req, date_of_birth).await?;
        tracing::info!("Baby profile created: {}", baby.id);

        Ok(baby)
    }

    pub async fn get_baby(&self, user_id: i64, id: i64) -> Result<Baby> {
        self.repo.get_baby(user_id, id).await
    }

    /// Active babies, newest first
    pub async fn list_babies(&self, user_id: i64) -> Result<Vec<Baby>> {
        self.repo.list_babies(user_id).await
    }

    /// Baby whose birth date drives auto-setup
    pub async fn primary_baby(&self, user_id: i64) -> Result<Option<Baby>> {
        Ok(self.repo.list_babies(user_id).await?.into_iter().next())
    }

    pub async fn update_baby(&self, user_id: i64, req: UpdateBabyRequest) -> Result<Baby> {
        if let Some(name) = &req.name {
            self.validate_name(name)?;
        }
        if let Some(date_of_birth) = req.date_of_birth {
            self.validate_birth_date(date_of_birth)?;
        }

        tracing::debug!("Updating baby: {}", req.id);
        self.repo.update_baby(user_id, &req).await
    }

    /// Soft delete a baby profile
    pub async fn deactivate_baby(&self, user_id: i64, id: i64) -> Result<()> {
        tracing::info!("Deactivating baby: {}", id);
        self.repo.deactivate_baby(user_id, id).await
    }
}
