//! `invoicer-core`: domain foundation building blocks.
//!
//! Identifiers, the aggregate/child ownership model, and the domain error
//! type. No infrastructure concerns.

pub mod error;
pub mod id;
pub mod model;

pub use error::DomainError;
pub use id::{AggregateId, EntityId};
pub use model::{has_distinct_ids, AggregateRoot, OwnedEntity};
