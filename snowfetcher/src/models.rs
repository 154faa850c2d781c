use serde::Serialize;

/// One table's retention setting as reported by the warehouse catalog.
///
/// `(database, schema, table)` is unique within a run. A retention of `0`
/// means the table has no retention configured and is still a valid value;
/// tables whose retention is null in the catalog are never turned into facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRetentionFact {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub retention_days: i64,
}

impl TableRetentionFact {
    /// Fully qualified `db.schema.table` name, as the catalog reports it.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }
}
