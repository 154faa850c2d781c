use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{Result, SnowfetcherError};

/// Connection parameters for the warehouse, validated before use.
#[derive(Debug, Clone)]
pub struct SnowflakeConfig {
    /// Account identifier, e.g. `xy12345.eu-west-1`.
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: Option<String>,
    pub warehouse: Option<String>,
}

impl SnowflakeConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("account", &self.account),
            ("user", &self.user),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(SnowfetcherError::Config(format!(
                    "snowflake {name} must not be empty"
                )));
            }
        }
        Ok(())
    }

    fn base_url(&self) -> String {
        format!("https://{}.snowflakecomputing.com", self.account)
    }
}

/// One table row from `SHOW TABLES`, before it becomes a retention fact.
///
/// `retention_time` is `None` when the catalog reports null or an
/// unparseable value; callers must not coerce that to a default.
#[derive(Debug, Clone)]
pub struct TableListing {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub retention_time: Option<i64>,
}

/// Read access to the warehouse metadata catalog.
///
/// The production implementation is [`SnowflakeRestClient`]; tests substitute
/// mocks so enumeration and orchestration logic can run without a warehouse.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<String>>;

    async fn list_schemas(&self, database: &str) -> Result<Vec<String>>;

    async fn list_tables(&self, database: &str, schema: &str) -> Result<Vec<TableListing>>;
}

#[derive(Deserialize)]
struct RestResponse {
    success: bool,
    message: Option<String>,
    data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct QueryData {
    #[serde(default)]
    rowtype: Vec<ColumnType>,
    #[serde(default)]
    rowset: Vec<Vec<Option<String>>>,
}

#[derive(Deserialize)]
struct ColumnType {
    name: String,
}

/// A decoded result set with by-name column access.
pub struct QueryRowset {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl QueryRowset {
    pub fn column_index(&self, name: &'static str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
            .ok_or(SnowfetcherError::MissingColumn(name))
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }
}

/// Client for the warehouse's REST session protocol.
///
/// [`SnowflakeRestClient::connect`] opens a session (login), queries run over
/// that session token, and [`SnowflakeRestClient::close`] logs out. One
/// session spans the whole catalog read; nothing is cached across sessions.
pub struct SnowflakeRestClient {
    http: reqwest::Client,
    base_url: String,
    session_token: String,
    sequence: AtomicU64,
}

impl SnowflakeRestClient {
    /// Establishes a warehouse session. A rejected login or unreachable host
    /// is a fatal error: no catalog data can be produced without a session.
    pub async fn connect(config: &SnowflakeConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = config.base_url();

        let mut query: Vec<(&str, String)> = vec![("requestId", Uuid::new_v4().to_string())];
        if let Some(warehouse) = &config.warehouse {
            query.push(("warehouse", warehouse.clone()));
        }
        if let Some(role) = &config.role {
            query.push(("roleName", role.clone()));
        }

        let body = json!({
            "data": {
                "LOGIN_NAME": config.user,
                "PASSWORD": config.password,
                "ACCOUNT_NAME": config.account,
                "CLIENT_APP_ID": "retsync",
                "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION"),
            }
        });

        let response: RestResponse = http
            .post(format!("{base_url}/session/v1/login-request"))
            .query(&query)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            return Err(SnowfetcherError::Login(
                response
                    .message
                    .unwrap_or_else(|| "login request rejected".to_string()),
            ));
        }

        let session_token = response
            .data
            .as_ref()
            .and_then(|data| data.get("token"))
            .and_then(|token| token.as_str())
            .ok_or_else(|| SnowfetcherError::Login("login response had no token".to_string()))?
            .to_string();

        log::info!("opened warehouse session for account {}", config.account);

        Ok(Self {
            http,
            base_url,
            session_token,
            sequence: AtomicU64::new(1),
        })
    }

    /// Executes one SQL statement over the session and decodes the rowset.
    pub async fn execute(&self, sql: &str) -> Result<QueryRowset> {
        let body = json!({
            "sqlText": sql,
            "sequenceId": self.sequence.fetch_add(1, Ordering::Relaxed),
            "isInternal": false,
        });

        let response: RestResponse = self
            .http
            .post(format!("{}/queries/v1/query-request", self.base_url))
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Snowflake Token=\"{}\"", self.session_token),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.success {
            return Err(SnowfetcherError::Query(
                response
                    .message
                    .unwrap_or_else(|| format!("statement rejected: {sql}")),
            ));
        }

        let data: QueryData = match response.data {
            Some(value) => serde_json::from_value(value)?,
            None => {
                return Err(SnowfetcherError::Query(format!(
                    "statement returned no data: {sql}"
                )))
            }
        };

        Ok(QueryRowset {
            columns: data.rowtype.into_iter().map(|column| column.name).collect(),
            rows: data.rowset,
        })
    }

    /// Logs the session out. Best effort: a failed logout only warns, the
    /// session expires server-side regardless.
    pub async fn close(self) {
        let result = self
            .http
            .post(format!("{}/session/logout-request", self.base_url))
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Snowflake Token=\"{}\"", self.session_token),
            )
            .send()
            .await;

        match result {
            Ok(_) => log::info!("closed warehouse session"),
            Err(err) => log::warn!("failed to log out warehouse session: {err}"),
        }
    }
}

/// Quotes an identifier for interpolation into a SHOW statement.
fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

#[async_trait]
impl CatalogService for SnowflakeRestClient {
    async fn list_databases(&self) -> Result<Vec<String>> {
        let rowset = self.execute("SHOW DATABASES").await?;
        let name_idx = rowset.column_index("name")?;

        Ok(rowset
            .rows()
            .iter()
            .filter_map(|row| row.get(name_idx).cloned().flatten())
            .collect())
    }

    async fn list_schemas(&self, database: &str) -> Result<Vec<String>> {
        let sql = format!("SHOW SCHEMAS IN DATABASE {}", quote_identifier(database));
        let rowset = self.execute(&sql).await?;
        let name_idx = rowset.column_index("name")?;

        Ok(rowset
            .rows()
            .iter()
            .filter_map(|row| row.get(name_idx).cloned().flatten())
            .collect())
    }

    async fn list_tables(&self, database: &str, schema: &str) -> Result<Vec<TableListing>> {
        let sql = format!(
            "SHOW TABLES IN {}.{}",
            quote_identifier(database),
            quote_identifier(schema)
        );
        let rowset = self.execute(&sql).await?;

        let name_idx = rowset.column_index("name")?;
        let database_idx = rowset.column_index("database_name")?;
        let schema_idx = rowset.column_index("schema_name")?;
        let retention_idx = rowset.column_index("retention_time")?;

        let mut listings = Vec::with_capacity(rowset.rows().len());
        for row in rowset.rows() {
            let cell = |idx: usize| row.get(idx).cloned().flatten();
            let (Some(table), Some(database), Some(schema)) =
                (cell(name_idx), cell(database_idx), cell(schema_idx))
            else {
                continue;
            };

            // Null stays None; a value the catalog renders unparseably is
            // treated the same way rather than defaulted.
            let retention_time = cell(retention_idx).and_then(|raw| raw.trim().parse::<i64>().ok());

            listings.push(TableListing {
                database,
                schema,
                table,
                retention_time,
            });
        }

        Ok(listings)
    }
}
