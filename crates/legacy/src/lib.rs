//! Gateway to the legacy payroll database.
//!
//! The legacy driver is not safe for concurrent use and offers no
//! cancellation. [`LegacyGateway`] owns the single cached connection
//! ([`ConnectionManager`]) and the FIFO queue every operation must pass
//! through ([`AccessSerializer`]). [`ProcedureInvoker`] layers
//! fault-classified retry on top for the two stored procedures the
//! bridge calls.
//!
//! The concrete driver is supplied by the embedding service through the
//! [`LegacyConnector`] / [`LegacyConnection`] traits.

pub mod connection;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod invoker;
pub mod serializer;
pub mod statement;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::ConnectionManager;
pub use driver::{DriverError, DriverErrorKind, LegacyConnection, LegacyConnector, LegacyRow, LegacyValue};
pub use error::LegacyError;
pub use gateway::LegacyGateway;
pub use invoker::{
    CreateAffiliateOutcome, EditEntityOutcome, Invocation, ProcedureInvoker, ProcedureNames,
};
pub use serializer::AccessSerializer;
