//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod affectation_log_repo;
pub mod affiliate_repo;
pub mod assignment_repo;
pub mod movement_repo;
pub mod movement_type_repo;

pub use affectation_log_repo::AffectationLogRepo;
pub use affiliate_repo::AffiliateRepo;
pub use assignment_repo::AssignmentRepo;
pub use movement_repo::MovementRepo;
pub use movement_type_repo::MovementTypeRepo;
