//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row and, where rows are inserted by this workspace, a
//! `Deserialize` create DTO.

pub mod affectation;
pub mod affiliate;
pub mod assignment;
pub mod movement;
