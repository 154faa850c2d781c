use std::collections::HashSet;

use crate::models::TableRetentionFact;

/// Allow-list filter over the catalog enumeration.
///
/// Each level is optional; `None` admits everything at that level. A fact
/// passes only if both its database and its schema are admitted. Matching is
/// case-sensitive exact match, the way the warehouse reports identifiers.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    databases: Option<HashSet<String>>,
    schemas: Option<HashSet<String>>,
}

impl SourceFilter {
    pub fn new(databases: Option<&str>, schemas: Option<&str>) -> Self {
        Self {
            databases: parse_list(databases),
            schemas: parse_list(schemas),
        }
    }

    pub fn admits_database(&self, database: &str) -> bool {
        match &self.databases {
            Some(allowed) => allowed.contains(database),
            None => true,
        }
    }

    pub fn admits_schema(&self, schema: &str) -> bool {
        match &self.schemas {
            Some(allowed) => allowed.contains(schema),
            None => true,
        }
    }

    pub fn admits(&self, fact: &TableRetentionFact) -> bool {
        self.admits_database(&fact.database) && self.admits_schema(&fact.schema)
    }
}

/// Parses a comma-separated allow-list. Blank tokens are dropped; an absent
/// or effectively empty list means "allow all".
fn parse_list(raw: Option<&str>) -> Option<HashSet<String>> {
    let values: HashSet<String> = raw
        .unwrap_or_default()
        .split(',')
        .filter_map(|token| {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(database: &str, schema: &str) -> TableRetentionFact {
        TableRetentionFact {
            database: database.to_string(),
            schema: schema.to_string(),
            table: "T".to_string(),
            retention_days: 1,
        }
    }

    #[test]
    fn empty_filter_admits_everything() {
        let filter = SourceFilter::new(None, None);
        assert!(filter.admits(&fact("ANY", "PUBLIC")));

        let blank = SourceFilter::new(Some(" , ,"), Some(""));
        assert!(blank.admits(&fact("ANY", "PUBLIC")));
    }

    #[test]
    fn database_and_schema_filters_are_anded() {
        let filter = SourceFilter::new(Some("A,B"), Some("PUBLIC"));

        assert!(filter.admits(&fact("A", "PUBLIC")));
        assert!(filter.admits(&fact("B", "PUBLIC")));
        assert!(!filter.admits(&fact("A", "SALES")));
        assert!(!filter.admits(&fact("C", "PUBLIC")));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let filter = SourceFilter::new(Some("Prod"), None);
        assert!(filter.admits_database("Prod"));
        assert!(!filter.admits_database("PROD"));
        assert!(!filter.admits_database("prod"));
    }

    #[test]
    fn tokens_are_trimmed() {
        let filter = SourceFilter::new(Some(" A , B "), None);
        assert!(filter.admits_database("A"));
        assert!(filter.admits_database("B"));
        assert!(!filter.admits_database(" A "));
    }
}
