use crate::error::{EmitterError, Result};

/// Identifier of the retention structured-property definition. The sync
/// assumes this definition already exists in the target platform (see the
/// `bootstrap` module, which registers it).
pub const RETENTION_PROPERTY_ID: &str = "io.acryl.dataManagement.retentionPeriodDays";

/// Characters that act as separators inside a dataset URN. A component
/// containing any of them would make two distinct tables collide on the same
/// identifier, so such components are rejected outright.
const RESERVED: &[char] = &['.', ',', '(', ')'];

pub fn structured_property_urn(property_id: &str) -> String {
    format!("urn:li:structuredProperty:{property_id}")
}

/// Builds the dataset URN for a warehouse table.
///
/// Pure and deterministic: the same `(database, schema, table, env)` tuple
/// always yields the same URN, across runs and restarts, because the target
/// platform treats the URN as the upsert key. The dataset name is lowercased,
/// matching how the platform's own warehouse ingestion names datasets.
pub fn dataset_urn(
    platform: &str,
    database: &str,
    schema: &str,
    table: &str,
    env: &str,
) -> Result<String> {
    for component in [database, schema, table, env] {
        validate_component(component)?;
    }

    let name = format!("{database}.{schema}.{table}").to_lowercase();
    Ok(format!(
        "urn:li:dataset:(urn:li:dataPlatform:{platform},{name},{env})"
    ))
}

fn validate_component(component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(EmitterError::InvalidComponent(
            "empty identifier component".to_string(),
        ));
    }
    if component.contains(RESERVED) {
        return Err(EmitterError::InvalidComponent(format!(
            "'{component}' contains a reserved URN character"
        )));
    }
    Ok(())
}
