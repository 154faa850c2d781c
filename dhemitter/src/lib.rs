pub mod bootstrap;
pub mod client;
pub mod error;
pub mod upsert;
pub mod urn;

pub use crate::bootstrap::{create_property_definition, PropertyDefinition};
pub use crate::client::{GmsRestEmitter, MetadataGraph};
pub use crate::upsert::{
    upsert_with_retry, FailureKind, PropertyUpsertRequest, RetryPolicy, SyncOutcome, UpsertFailure,
};
pub use crate::urn::{dataset_urn, structured_property_urn, RETENTION_PROPERTY_ID};
