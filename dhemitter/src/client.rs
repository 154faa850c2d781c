use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::json;
use url::Url;

use crate::error::{EmitterError, Result};

/// Write access to the metadata-graph platform.
///
/// The production implementation is [`GmsRestEmitter`]; the orchestrator only
/// depends on this trait so dry-run and failure-injection tests can verify
/// exactly which writes were attempted.
#[async_trait]
pub trait MetadataGraph: Send + Sync {
    /// Cheap reachability probe, run once before any upsert. Failure here is
    /// a fatal startup condition, not a per-entity one.
    async fn check_connectivity(&self) -> Result<()>;

    /// Sets the structured property on one dataset to the given value.
    /// Replace semantics: repeated calls with the same inputs converge.
    async fn upsert_structured_property(
        &self,
        dataset_urn: &str,
        property_urn: &str,
        value: i64,
    ) -> Result<()>;
}

/// REST client for the platform's GMS endpoint, bearer-token authenticated.
pub struct GmsRestEmitter {
    http: reqwest::Client,
    base_url: Url,
}

impl GmsRestEmitter {
    pub fn new(gms_url: &str, token: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(EmitterError::Config("GMS token must not be empty".to_string()));
        }

        let base_url = Url::parse(gms_url)?;
        if base_url.cannot_be_a_base() {
            return Err(EmitterError::Config(format!(
                "'{gms_url}' is not a usable GMS endpoint"
            )));
        }

        let mut auth = HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|_| EmitterError::Config("GMS token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EmitterError::Config("GMS endpoint URL has no path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Writes one aspect of one entity via the v3 entity API.
    pub(crate) async fn post_aspect(
        &self,
        entity_type: &str,
        urn: &str,
        aspect: &str,
        value: serde_json::Value,
    ) -> Result<()> {
        let url = self.endpoint(&["openapi", "v3", "entity", entity_type, urn, aspect])?;

        let response = self
            .http
            .post(url)
            .json(&json!({ "value": value }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(EmitterError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl MetadataGraph for GmsRestEmitter {
    async fn check_connectivity(&self) -> Result<()> {
        let url = self.endpoint(&["config"])?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(EmitterError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn upsert_structured_property(
        &self,
        dataset_urn: &str,
        property_urn: &str,
        value: i64,
    ) -> Result<()> {
        let aspect = json!({
            "properties": [
                {
                    "propertyUrn": property_urn,
                    "values": [ { "double": value } ],
                }
            ]
        });

        self.post_aspect("dataset", dataset_urn, "structuredProperties", aspect)
            .await?;

        log::debug!("synced {property_urn}={value} on {dataset_urn}");
        Ok(())
    }
}
