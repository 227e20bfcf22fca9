//! The PI Web API query flow.
//!
//! A query runs in three steps: resolve the data server's Web ID, batch
//! search the tag Web IDs, then batch-read values from the stream
//! endpoint selected by the query type.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde_json::{Value, json};

use piterm_config::{AuthMethod, Config};
use piterm_session::{Credentials, Query, QueryType};
use piterm_types::{PitermError, Result};

use crate::http::{HttpRequest, HttpTransport, Url, percent_encode};

/// One flattened result sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub tag: String,
    pub timestamp: String,
    /// PI values may be numbers, strings, booleans, or digital-state
    /// objects; kept as raw JSON.
    pub value: Value,
    pub good: bool,
    pub questionable: bool,
    pub substituted: bool,
}

/// PI Web API client bound to a transport and an authentication header.
pub struct Client<'a> {
    transport: &'a dyn HttpTransport,
    auth_header: Option<String>,
}

impl std::fmt::Debug for Client<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("auth_header", &self.auth_header)
            .finish_non_exhaustive()
    }
}

impl<'a> Client<'a> {
    /// Build a client for the configured authentication method.
    ///
    /// Fails up front for methods this client cannot speak rather than
    /// letting the server reject every request.
    pub fn new(
        transport: &'a dyn HttpTransport,
        config: &Config,
        credentials: &Credentials,
    ) -> Result<Self> {
        let auth_header = match config.auth_method {
            AuthMethod::Basic => credentials.username.as_ref().map(|username| {
                let password = credentials.password.as_deref().unwrap_or("");
                format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
            }),
            AuthMethod::Ntlm => {
                return Err(PitermError::WebApi(
                    "Windows authentication is not implemented".to_string(),
                ));
            },
        };
        Ok(Self {
            transport,
            auth_header,
        })
    }

    /// Run the full three-step query and return flattened records.
    pub fn execute(&self, query: &Query) -> Result<Vec<Record>> {
        log::info!("Executing query");
        let base = Url::parse(&query.api_base_url)?;

        let server_web_id = self.server_web_id(&base, &query.pi_server)?;
        let tag_web_ids = self.tag_web_ids(&base, query, &server_web_id)?;
        let records = self.values(&base, query, &tag_web_ids)?;
        log::info!("Query executed successfully ({} samples)", records.len());
        Ok(records)
    }

    /// Step 1: `GET /dataservers?name=...` and pull out the Web ID.
    fn server_web_id(&self, base: &Url, server: &str) -> Result<String> {
        log::info!("Getting Web ID for server {server}");
        let url = base.join(&format!("/dataservers?name={}", percent_encode(server)));
        let response = self.send(HttpRequest::get(url))?;

        if response.status != 200 {
            return Err(PitermError::WebApi(format!(
                "could not get Web ID for server {server} (status {}); check the server name",
                response.status
            )));
        }
        response
            .json()?
            .get("WebId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                PitermError::WebApi(format!("response for server {server} carried no Web ID"))
            })
    }

    /// Step 2: batch tag search, keeping the query's tag order.
    fn tag_web_ids(
        &self,
        base: &Url,
        query: &Query,
        server_web_id: &str,
    ) -> Result<Vec<(String, String)>> {
        log::info!("Getting Web IDs for {} tag(s)", query.tags.len());
        let mut body = serde_json::Map::new();
        for tag in &query.tags {
            let resource = base
                .join(&format!(
                    "/points/search?dataServerWebId={server_web_id}&query={}",
                    percent_encode(&format!("tag:\"{tag}\""))
                ))
                .to_string();
            body.insert(tag.clone(), json!({ "Method": "GET", "Resource": resource }));
        }

        let envelopes = self.batch(base, &Value::Object(body), "tag search")?;

        let mut web_ids = Vec::with_capacity(query.tags.len());
        for tag in &query.tags {
            let content = per_tag_content(&envelopes, tag)?;
            let web_id = content
                .get("Items")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|item| item.get("WebId"))
                .and_then(Value::as_str)
                .ok_or_else(|| PitermError::WebApi(format!("no Web ID for tag {tag}")))?;
            web_ids.push((tag.clone(), web_id.to_string()));
        }
        Ok(web_ids)
    }

    /// Step 3: batch value retrieval from the per-type stream endpoint.
    fn values(
        &self,
        base: &Url,
        query: &Query,
        tag_web_ids: &[(String, String)],
    ) -> Result<Vec<Record>> {
        log::info!("Getting {} values", query.query_type);
        let mut body = serde_json::Map::new();
        for (tag, web_id) in tag_web_ids {
            let resource = self.stream_resource(base, query, web_id);
            body.insert(tag.clone(), json!({ "Method": "GET", "Resource": resource }));
        }

        let envelopes = self.batch(base, &Value::Object(body), "value retrieval")?;

        let summary = query.query_type == QueryType::Summary;
        let mut records = Vec::new();
        for (tag, _) in tag_web_ids {
            let content = per_tag_content(&envelopes, tag)?;
            let items = content
                .get("Items")
                .and_then(Value::as_array)
                .ok_or_else(|| PitermError::WebApi(format!("no items for tag {tag}")))?;
            for item in items {
                // Summary items nest the sample one level down.
                let sample = if summary { item.get("Value").unwrap_or(item) } else { item };
                records.push(Record {
                    tag: tag.clone(),
                    timestamp: sample
                        .get("Timestamp")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    value: sample.get("Value").cloned().unwrap_or(Value::Null),
                    good: sample.get("Good").and_then(Value::as_bool).unwrap_or(true),
                    questionable: sample
                        .get("Questionable")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    substituted: sample
                        .get("Substituted")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                });
            }
        }
        Ok(records)
    }

    /// The stream resource URL for one tag under the active query type.
    fn stream_resource(&self, base: &Url, query: &Query, web_id: &str) -> String {
        let start = percent_encode(&query.start_time);
        let end = percent_encode(&query.end_time);
        let timezone = percent_encode(&query.timezone);
        match query.query_type {
            QueryType::Recorded => base
                .join(&format!(
                    "/streams/{web_id}/recorded?startTime={start}&endTime={end}\
                     &boundaryType={}&timeZone={timezone}",
                    query.boundary_type
                ))
                .to_string(),
            QueryType::Interpolated => base
                .join(&format!(
                    "/streams/{web_id}/interpolated?startTime={start}&endTime={end}\
                     &interval={}&timeZone={timezone}",
                    percent_encode(&query.interval)
                ))
                .to_string(),
            QueryType::Summary => base
                .join(&format!(
                    "/streams/{web_id}/summary?startTime={start}&endTime={end}\
                     &summaryType={}&summaryDuration={}&calculationBasis={}\
                     &timeType={}&timeZone={timezone}",
                    query.summary_type,
                    percent_encode(&query.interval),
                    query.calculation_basis,
                    query.timestamp_calculation
                ))
                .to_string(),
        }
    }

    /// POST a batch request and return the per-tag envelope object.
    fn batch(&self, base: &Url, body: &Value, what: &str) -> Result<Value> {
        let request =
            HttpRequest::post_json(base.join("/batch"), body).header("X-Requested-With", "piterm");
        let response = self.send(request)?;
        if response.status != 207 {
            return Err(PitermError::WebApi(format!(
                "{what} returned status {}",
                response.status
            )));
        }
        response.json()
    }

    fn send(&self, mut request: HttpRequest) -> Result<crate::http::HttpResponse> {
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }
        self.transport.send(&request)
    }
}

/// Pull one tag's `Content` out of a batch envelope, checking its
/// sub-request status.
fn per_tag_content<'v>(envelopes: &'v Value, tag: &str) -> Result<&'v Value> {
    let envelope = envelopes
        .get(tag)
        .ok_or_else(|| PitermError::WebApi(format!("no batch result for tag {tag}")))?;
    let status = envelope.get("Status").and_then(Value::as_u64).unwrap_or(0);
    if status != 200 {
        return Err(PitermError::WebApi(format!(
            "tag {tag}: status {status}; check the tag name"
        )));
    }
    envelope
        .get("Content")
        .ok_or_else(|| PitermError::WebApi(format!("no content for tag {tag}")))
}
