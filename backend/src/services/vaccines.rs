//! Vaccine reference data
//!
//! Seeds the national immunization program and pairs the stored vaccines
//! with their dose schedules.

use crate::config::DEFAULT_VACCINE_ICON;
use crate::database::{NewVaccine, RecipientType, Repository, Vaccine};
use crate::error::Result;
use crate::schedule::{DoseSchedule, DoseScheduleTable};
use std::sync::Arc;

/// Read access to vaccine reference data
pub trait ReferenceData {
    fn vaccines(&self) -> &[Vaccine];

    fn dose_schedule(&self, vaccine_name: &str) -> Option<&DoseSchedule>;

    fn find(&self, vaccine_name: &str) -> Option<&Vaccine> {
        self.vaccines().iter().find(|v| v.name == vaccine_name)
    }
}

/// Stored vaccines together with the schedule table.
///
/// A vaccine whose dose count disagrees with its schedule stays listed but
/// is marked rejected; callers skip it when generating reminders.
#[derive(Debug, Clone)]
pub struct VaccineCatalog {
    vaccines: Vec<Vaccine>,
    schedules: Arc<DoseScheduleTable>,
    rejected: Vec<String>,
}

impl VaccineCatalog {
    pub fn new(vaccines: Vec<Vaccine>, schedules: Arc<DoseScheduleTable>) -> Self {
        let rejected = vaccines
            .iter()
            .filter_map(|vaccine| {
                let error = schedules
                    .validate_against(std::slice::from_ref(vaccine))
                    .err()?;
                tracing::warn!("Skipping scheduling for {}: {}", vaccine.name, error);
                Some(vaccine.name.clone())
            })
            .collect();

        Self {
            vaccines,
            schedules,
            rejected,
        }
    }

    pub fn schedules(&self) -> &DoseScheduleTable {
        &self.schedules
    }

    /// Names of vaccines that cannot be scheduled
    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }

    pub fn is_rejected(&self, vaccine_name: &str) -> bool {
        self.rejected.iter().any(|name| name == vaccine_name)
    }
}

impl ReferenceData for VaccineCatalog {
    fn vaccines(&self) -> &[Vaccine] {
        &self.vaccines
    }

    fn dose_schedule(&self, vaccine_name: &str) -> Option<&DoseSchedule> {
        self.schedules.get(vaccine_name)
    }
}

/// Service for vaccine reference data
#[derive(Clone)]
pub struct VaccinesService {
    repo: Repository,
    schedules: Arc<DoseScheduleTable>,
}

impl VaccinesService {
    /// Service backed by the national dose schedule
    pub fn new(repo: Repository) -> Self {
        Self::with_schedules(repo, DoseScheduleTable::national())
    }

    pub fn with_schedules(repo: Repository, schedules: DoseScheduleTable) -> Self {
        Self {
            repo,
            schedules: Arc::new(schedules),
        }
    }

    /// Insert or refresh the national program vaccines
    pub async fn seed_defaults(&self) -> Result<Vec<Vaccine>> {
        self.seed(&default_vaccines()).await
    }

    pub async fn seed(&self, vaccines: &[NewVaccine]) -> Result<Vec<Vaccine>> {
        let mut seeded = Vec::with_capacity(vaccines.len());
        for vaccine in vaccines {
            seeded.push(self.repo.upsert_vaccine(vaccine).await?);
        }

        tracing::info!("Seeded {} vaccines", seeded.len());
        Ok(seeded)
    }

    pub async fn list_vaccines(&self) -> Result<Vec<Vaccine>> {
        self.repo.list_vaccines().await
    }

    pub async fn get_vaccine(&self, id: i64) -> Result<Vaccine> {
        self.repo.get_vaccine(id).await
    }

    /// Current vaccines paired with the schedule table
    pub async fn catalog(&self) -> Result<VaccineCatalog> {
        let vaccines = self.repo.list_vaccines().await?;
        Ok(VaccineCatalog::new(vaccines, Arc::clone(&self.schedules)))
    }
}

fn seed(
    name: &str,
    description: &str,
    total_doses: i64,
    recipient_type: RecipientType,
    recommended: bool,
) -> NewVaccine {
    NewVaccine {
        name: name.to_string(),
        icon: DEFAULT_VACCINE_ICON.to_string(),
        description: Some(description.to_string()),
        total_doses,
        recipient_type,
        recommended,
    }
}

/// National immunization program vaccines, recommended ones first
pub fn default_vaccines() -> Vec<NewVaccine> {
    use RecipientType::{Baby, Both};

    vec![
        seed(
            "BCG (Bacillus Calmette Guerin)",
            "Protects against tuberculosis. Given at birth. Route: Intradermal.",
            1,
            Baby,
            true,
        ),
        seed(
            "Pentavalent Vaccine (Diphtheria, Pertussis, Tetanus, Hepatitis B and Hemophilus influenza B)",
            "Protects against diphtheria, pertussis, tetanus, hepatitis B and haemophilus influenza B. Given at 6, 10 and 14 weeks. Route: Intramuscular.",
            3,
            Baby,
            true,
        ),
        seed(
            "OPV (Oral Polio Vaccine)",
            "Protects against polio. Given at 6, 10 and 14 weeks. Route: Oral.",
            3,
            Baby,
            true,
        ),
        seed(
            "PCV (Pneumococcal Conjugate Vaccine)",
            "Protects against pneumococcal diseases. Given at 6, 10 weeks and 9 months. Route: Intramuscular.",
            3,
            Baby,
            true,
        ),
        seed(
            "Rotavirus Vaccine",
            "Protects against rotavirus diarrhea. Given at 6 and 10 weeks. Route: Oral.",
            2,
            Baby,
            true,
        ),
        seed(
            "fIPV (Fractional Injectable Polio Vaccine)",
            "Protects against polio. Given at 6 and 14 weeks. Route: Intramuscular.",
            2,
            Baby,
            true,
        ),
        seed(
            "MR (Measles - Rubella)",
            "Protects against measles and rubella. Given at 9 and 15 months. Route: Subcutaneous.",
            2,
            Baby,
            true,
        ),
        seed(
            "JE (Japanese Encephalitis)",
            "Protects against Japanese encephalitis. Given at 12 months. Route: Subcutaneous.",
            1,
            Baby,
            true,
        ),
        seed(
            "Hepatitis A Vaccine",
            "Protects against food and water-borne hepatitis A. Age: after 1 year.",
            2,
            Both,
            false,
        ),
        seed(
            "Typhoid Vaccine",
            "Protects against typhoid fever. Age: 6 months conjugate.",
            1,
            Baby,
            false,
        ),
        seed(
            "Varicella (Chickenpox) Vaccine",
            "Protects against chickenpox. Age: after 12 months.",
            2,
            Baby,
            false,
        ),
        seed(
            "Influenza (Flu) Vaccine",
            "Protects against seasonal influenza. Age: after 6 months, yearly.",
            1,
            Both,
            false,
        ),
        seed(
            "HPV (Human Papillomavirus) Vaccine",
            "Protects against cervical cancer and genital warts. Age: 9 to 14 years.",
            2,
            Both,
            false,
        ),
        seed(
            "Meningococcal Vaccine",
            "Protects against meningitis. Age: infancy or adolescence.",
            1,
            Both,
            false,
        ),
        seed(
            "Rabies (Pre-exposure) Vaccine",
            "Protects against rabies in high dog-bite risk areas. Age: any age.",
            3,
            Both,
            false,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use crate::schedule::Offset;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_service() -> (VaccinesService, Repository) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();
        let repo = Repository::new(pool);

        (VaccinesService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_seed_defaults_is_repeatable() {
        let (service, _repo) = create_test_service().await;

        service.seed_defaults().await.unwrap();
        service.seed_defaults().await.unwrap();

        let vaccines = service.list_vaccines().await.unwrap();
        assert_eq!(vaccines.len(), default_vaccines().len());
    }

    #[tokio::test]
    async fn test_every_default_vaccine_is_scheduled() {
        let (service, _repo) = create_test_service().await;
        service.seed_defaults().await.unwrap();

        let catalog = service.catalog().await.unwrap();

        for vaccine in catalog.vaccines() {
            let schedule = catalog
                .dose_schedule(&vaccine.name)
                .unwrap_or_else(|| panic!("{} has no schedule", vaccine.name));
            assert_eq!(schedule.dose_count() as i64, vaccine.total_doses);
        }
    }

    #[tokio::test]
    async fn test_catalog_isolates_mismatched_schedule() {
        let (_, repo) = create_test_service().await;
        let table = DoseScheduleTable::national().with(
            "BCG (Bacillus Calmette Guerin)",
            DoseSchedule::new(vec![Offset::Days(0), Offset::Days(30)]).unwrap(),
        );
        let service = VaccinesService::with_schedules(repo, table);
        service.seed_defaults().await.unwrap();

        let catalog = service.catalog().await.unwrap();

        assert_eq!(catalog.rejected(), ["BCG (Bacillus Calmette Guerin)".to_string()]);
        assert!(catalog.find("BCG (Bacillus Calmette Guerin)").is_some());
        assert!(!catalog.is_rejected("Rotavirus Vaccine"));
        assert_eq!(catalog.vaccines().len(), default_vaccines().len());
    }

    #[tokio::test]
    async fn test_get_vaccine() {
        let (service, _repo) = create_test_service().await;
        let seeded = service.seed_defaults().await.unwrap();

        let bcg = service.get_vaccine(seeded[0].id).await.unwrap();
        assert_eq!(bcg.name, "BCG (Bacillus Calmette Guerin)");
        assert!(bcg.recommended);

        let catalog = service.catalog().await.unwrap();
        assert!(catalog.find("Rotavirus Vaccine").is_some());
        assert!(catalog.find("Unknown").is_none());
    }
}
