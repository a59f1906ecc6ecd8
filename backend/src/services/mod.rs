//! Services module
//!
//! Business logic services that coordinate between callers and the repository.

pub mod babies;
pub mod clock;
pub mod notifier;
pub mod reminders;
pub mod vaccines;

pub use babies::BabiesService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use notifier::{notify, MemoryNotifier, NotificationKind, Notifier, TracingNotifier};
pub use reminders::{
    AutoSetupOutcome, DoseCompletion, RemindersService, VaccineEntry, VaccineOverview,
    VaccineStats, VaccineTab,
};
pub use vaccines::{default_vaccines, ReferenceData, VaccineCatalog, VaccinesService};
