use crate::client::CatalogService;
use crate::error::Result;
use crate::models::TableRetentionFact;
use crate::params::SourceFilter;

/// System schemas that never carry user tables worth syncing.
const SKIPPED_SCHEMAS: &[&str] = &["INFORMATION_SCHEMA"];

/// Walks the catalog hierarchy (databases, then schemas, then tables) and
/// collects one retention fact per table that survives the filter.
///
/// A database or schema that errors mid-enumeration (privilege revoked,
/// dropped concurrently) is skipped with a warning and enumeration continues
/// at the next sibling. Only a failure to list databases at all propagates:
/// without that listing no facts can be produced.
///
/// Tables whose retention is null in the catalog are excluded, not defaulted;
/// a retention of `0` is a valid fact.
pub async fn extract_retention_facts(
    catalog: &dyn CatalogService,
    filter: &SourceFilter,
) -> Result<Vec<TableRetentionFact>> {
    let mut facts = Vec::new();

    let databases = catalog.list_databases().await?;
    log::info!("found {} databases", databases.len());

    for database in &databases {
        if !filter.admits_database(database) {
            continue;
        }

        let schemas = match catalog.list_schemas(database).await {
            Ok(schemas) => schemas,
            Err(err) => {
                log::warn!("skipping database {database}: {err}");
                continue;
            }
        };

        for schema in &schemas {
            if SKIPPED_SCHEMAS.contains(&schema.to_uppercase().as_str()) {
                continue;
            }
            if !filter.admits_schema(schema) {
                continue;
            }

            let listings = match catalog.list_tables(database, schema).await {
                Ok(listings) => listings,
                Err(err) => {
                    log::warn!("skipping schema {database}.{schema}: {err}");
                    continue;
                }
            };

            let mut emitted = 0usize;
            for listing in listings {
                match listing.retention_time {
                    Some(retention_days) if retention_days >= 0 => {
                        facts.push(TableRetentionFact {
                            database: listing.database,
                            schema: listing.schema,
                            table: listing.table,
                            retention_days,
                        });
                        emitted += 1;
                    }
                    Some(negative) => {
                        log::warn!(
                            "ignoring negative retention {negative} on {}.{}.{}",
                            listing.database,
                            listing.schema,
                            listing.table
                        );
                    }
                    None => {
                        log::debug!(
                            "no retention value for {}.{}.{}, excluded",
                            listing.database,
                            listing.schema,
                            listing.table
                        );
                    }
                }
            }
            log::info!("found {emitted} tables with retention in {database}.{schema}");
        }
    }

    log::info!("total tables extracted: {}", facts.len());
    Ok(facts)
}
