//! One-time registration of the retention structured-property definition.
//!
//! The sync pipeline assumes the definition exists and never creates it; this
//! module is what creates it. It also writes the settings aspect that makes
//! the property show up in the platform's search filters.

use serde_json::json;

use crate::client::GmsRestEmitter;
use crate::error::Result;
use crate::urn::{structured_property_urn, RETENTION_PROPERTY_ID};

/// A structured-property definition, in the shape the GMS aspect API expects.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
}

impl PropertyDefinition {
    /// The single-cardinality numeric retention property on datasets.
    pub fn retention_days() -> Self {
        Self {
            id: RETENTION_PROPERTY_ID,
            display_name: "Retention Period (Days)",
            description: "Number of days data is retained in Snowflake based on \
                          table-level retention settings. Synced automatically on a \
                          recurring schedule; useful for spotting tables whose high \
                          retention drives storage cost or conflicts with lifecycle \
                          policy.",
        }
    }

    pub fn urn(&self) -> String {
        structured_property_urn(self.id)
    }
}

/// Registers the property definition and its display settings.
///
/// Safe to re-run: both writes are aspect upserts and converge on the same
/// state.
pub async fn create_property_definition(
    emitter: &GmsRestEmitter,
    definition: &PropertyDefinition,
) -> Result<()> {
    let urn = definition.urn();

    let definition_aspect = json!({
        "qualifiedName": definition.id,
        "displayName": definition.display_name,
        "description": definition.description,
        "valueType": "urn:li:dataType:datahub.number",
        "cardinality": "SINGLE",
        "entityTypes": ["urn:li:entityType:datahub.dataset"],
    });
    emitter
        .post_aspect("structuredProperty", &urn, "propertyDefinition", definition_aspect)
        .await?;
    log::info!("registered structured property {urn}");

    // Without this aspect the property exists but never appears in search
    // filters or the asset sidebar.
    let settings_aspect = json!({
        "isHidden": false,
        "showInSearchFilters": true,
        "showInAssetSummary": true,
        "hideInAssetSummaryWhenEmpty": false,
        "showAsAssetBadge": false,
        "showInColumnsTable": false,
    });
    emitter
        .post_aspect(
            "structuredProperty",
            &urn,
            "structuredPropertySettings",
            settings_aspect,
        )
        .await?;
    log::info!("enabled search-filter settings for {urn}");

    Ok(())
}
