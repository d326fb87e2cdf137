//! Movement migration from the relational store into the legacy store.
//!
//! [`MigrationOrchestrator`] composes the record mapper, the period
//! resolver and the legacy procedure invoker to push one movement
//! end-to-end, and interprets the legacy result.

pub mod error;
pub mod mapper;
pub mod orchestrator;
pub mod period;
pub mod preview;
pub mod result;
pub mod store;

pub use error::MigrationError;
pub use mapper::{LegacyMovementPayload, MovementDraft, SiteConstants};
pub use orchestrator::{IdentityResolution, IdentitySource, MigrationOrchestrator};
pub use period::PeriodResolver;
pub use preview::{IdentityPreview, MovementPreview};
pub use result::{MigrationContext, MigrationOutcome, MigrationResult, MigrationStep};
pub use store::{PersonnelStore, PgPersonnelStore};
