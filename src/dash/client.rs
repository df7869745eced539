//! Blocking HTTP client for the Dash `data-input-file` endpoint.

use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::error::{DashError, DashResult};

/// Fixed Dash ingestion endpoint.
pub const DASH_ENDPOINT: &str = "https://api.comodash.io/v1/data-input-file";

const SERVICE_CLIENT_ID: &str = "service_client_id";
const API_KEY: &str = "x-api-key";
const ORG_NAME: &str = "org-name";
const TABLE_NAME: &str = "table-name";

/// Client configuration.
///
/// Use [`Default`] for the production endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashConfig {
    /// URL every chunk is POSTed to.
    pub endpoint: String,
    /// Value of the `service_client_id` header.
    pub service_client_id: String,
    /// Request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            endpoint: DASH_ENDPOINT.to_string(),
            service_client_id: "0".to_string(),
            timeout: None,
        }
    }
}

/// Credentials and routing for one upload call.
#[derive(Clone, PartialEq, Eq)]
pub struct DashTarget {
    /// Dash organisation name.
    pub org_name: String,
    /// API key valid for the organisation.
    pub api_key: String,
    /// Table the data is loaded into.
    pub table: String,
}

impl DashTarget {
    pub fn new(org_name: impl Into<String>, api_key: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            api_key: api_key.into(),
            table: table.into(),
        }
    }
}

impl fmt::Debug for DashTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashTarget")
            .field("org_name", &self.org_name)
            .field("api_key", &"<redacted>")
            .field("table", &self.table)
            .finish()
    }
}

/// A successful (2xx) upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body text.
    pub body: String,
}

/// Synchronous Dash API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DashClient {
    client: Client,
    config: DashConfig,
}

impl DashClient {
    /// Client for the production endpoint.
    pub fn new() -> DashResult<Self> {
        Self::with_config(DashConfig::default())
    }

    /// Client with an explicit configuration (e.g. a different endpoint).
    pub fn with_config(config: DashConfig) -> DashResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn headers(&self, target: &DashTarget) -> DashResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/gzip"));
        for (name, value) in [
            (SERVICE_CLIENT_ID, self.config.service_client_id.as_str()),
            (API_KEY, target.api_key.as_str()),
            (ORG_NAME, target.org_name.as_str()),
            (TABLE_NAME, target.table.as_str()),
        ] {
            headers.insert(HeaderName::from_static(name), header_value(name, value)?);
        }
        Ok(headers)
    }

    /// POST one gzip-compressed CSV payload.
    ///
    /// Any 2xx status returns the response; anything else is
    /// [`DashError::UploadRejected`]. Nothing is retried.
    pub fn upload_csv(&self, target: &DashTarget, payload: Vec<u8>) -> DashResult<DashResponse> {
        let headers = self.headers(target)?;
        tracing::debug!(
            endpoint = %self.config.endpoint,
            table = %target.table,
            bytes = payload.len(),
            "uploading csv payload"
        );

        let res = self
            .client
            .post(&self.config.endpoint)
            .headers(headers)
            .body(payload)
            .send()?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(DashError::UploadRejected {
                status: status.as_u16(),
                table: target.table.clone(),
                body,
            });
        }

        Ok(DashResponse {
            status: status.as_u16(),
            body: res.text()?,
        })
    }
}

/// Upload one gzip-compressed CSV payload to the production endpoint.
///
/// ```no_run
/// use dash_upload::dash::upload_csv_to_dash;
/// use dash_upload::export::create_gzipped_csv_stream;
/// use dash_upload::types::{DataSet, DataType, Field, Schema, Value};
///
/// # fn main() -> Result<(), dash_upload::DashError> {
/// let ds = DataSet::new(
///     Schema::new(vec![Field::new("id", DataType::Int64)]),
///     vec![vec![Value::Int64(1)]],
/// );
/// let payload = create_gzipped_csv_stream(&ds)?;
/// let response = upload_csv_to_dash("my-org", "api-key", "my_table", payload)?;
/// println!("{}", response.body);
/// # Ok(())
/// # }
/// ```
pub fn upload_csv_to_dash(
    org_name: &str,
    api_key: &str,
    table: &str,
    payload: Vec<u8>,
) -> DashResult<DashResponse> {
    DashClient::new()?.upload_csv(&DashTarget::new(org_name, api_key, table), payload)
}

fn header_value(name: &str, value: &str) -> DashResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| DashError::invalid_options(format!("invalid value for header '{name}': {e}")))
}
