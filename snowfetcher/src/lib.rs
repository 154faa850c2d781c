pub mod client;
pub mod error;
pub mod fetch;
pub mod models;
pub mod params;

pub use crate::client::{CatalogService, SnowflakeConfig, SnowflakeRestClient, TableListing};
pub use crate::fetch::extract_retention_facts;
pub use crate::models::TableRetentionFact;
pub use crate::params::SourceFilter;
