//! cohort-core
//!
//! Pure data layer of the attribute deriver: typed attribute keys, the
//! hierarchical path store, scoped accessors, and schema-version
//! normalization. No derivation logic lives here.

pub mod dated;
pub mod error;
pub mod key;
pub mod namespace;
pub mod store;
pub mod value;
pub mod version;

pub use crate::dated::DatedValue;
pub use crate::error::CoreError;
pub use crate::key::{AttributeKey, Entity, ScopePrefix, Section, WorkingScope};
pub use crate::namespace::{Namespace, WorkingNamespace};
pub use crate::store::{FlatRecord, PathStore};
pub use crate::version::SchemaVersion;
