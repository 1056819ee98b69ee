use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::xmlrpc::{self, Value};
use super::{CatalogError, RpcError, SubtitleCatalog};
use crate::config::CatalogSettings;
use crate::domain::models::{SearchQuery, SessionToken, SubtitleCandidate};

#[derive(Debug)]
pub struct OpenSubtitlesClient {
    http: reqwest::blocking::Client,
    settings: CatalogSettings,
    token: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum CandidateDecodeError {
    #[error("search result is a {0}, not a struct")]
    NotAStruct(&'static str),

    #[error("search result has no usable SubDownloadLink")]
    MissingDownloadLink,
}

impl OpenSubtitlesClient {
    pub fn new(settings: CatalogSettings) -> Result<Self, RpcError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            settings,
            token: None,
        })
    }

    fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let body = xmlrpc::encode_call(method, params)?;
        let response = self
            .http
            .post(&self.settings.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()?;

        if !response.status().is_success() {
            return Err(RpcError::Status(response.status()));
        }

        let value = xmlrpc::decode_response(&response.text()?)?;
        check_status(&value)?;
        Ok(value)
    }
}

impl SubtitleCatalog for OpenSubtitlesClient {
    /// Logs in once per client; later calls reuse the session token.
    fn login(&mut self) -> Result<SessionToken, CatalogError> {
        if let Some(token) = &self.token {
            debug!("Reusing catalog session");
            return Ok(SessionToken(token.clone()));
        }

        let params = [
            Value::str(&self.settings.username),
            Value::str(&self.settings.password),
            Value::str(&self.settings.login_language),
            Value::str(&self.settings.user_agent),
        ];
        let response = self.call("LogIn", &params).map_err(CatalogError::Auth)?;

        let token = response
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or(CatalogError::Auth(RpcError::MissingMember("token")))?
            .to_string();

        info!(endpoint = %self.settings.endpoint, "Logged in to subtitle catalog");
        self.token = Some(token.clone());
        Ok(SessionToken(token))
    }

    fn search(
        &mut self,
        token: &SessionToken,
        query: &SearchQuery,
    ) -> Result<Vec<SubtitleCandidate>, CatalogError> {
        let constraints = query
            .constraints()
            .iter()
            .map(|(key, value)| (key.clone(), Value::str(value)))
            .collect();
        let params = [
            Value::str(token.as_str()),
            Value::Array(vec![Value::Struct(constraints)]),
        ];

        let response = match self.call("SearchSubtitles", &params) {
            Ok(response) => response,
            Err(e) => {
                // The session may have expired; log in again next time.
                self.token = None;
                return Err(CatalogError::Search(e));
            }
        };
        let candidates = candidates_from_response(&response);
        debug!(%query, count = candidates.len(), "Catalog search returned");
        Ok(candidates)
    }
}

// Both calls report a textual status such as "200 OK".
fn check_status(response: &Value) -> Result<(), RpcError> {
    match response.get("status").and_then(Value::as_str) {
        Some(status) if !status.starts_with("200") => Err(RpcError::BadStatus(status.to_string())),
        _ => Ok(()),
    }
}

/// Candidates carried by a `SearchSubtitles` response, in response order.
/// `data` is `false` when nothing matched.
pub fn candidates_from_response(response: &Value) -> Vec<SubtitleCandidate> {
    match response.get("data") {
        Some(Value::Array(records)) => records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| match decode_candidate(record) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    warn!(index, "Skipping search result: {e}");
                    None
                }
            })
            .collect(),
        Some(Value::Bool(false)) | None => Vec::new(),
        Some(other) => {
            warn!(kind = other.kind(), "Unexpected data member in search response");
            Vec::new()
        }
    }
}

/// Maps one search result struct onto a [`SubtitleCandidate`].
///
/// Unknown members are ignored. Known members must be strings or ints; any
/// other type is reported and treated as absent.
pub fn decode_candidate(record: &Value) -> Result<SubtitleCandidate, CandidateDecodeError> {
    if !matches!(record, Value::Struct(_)) {
        return Err(CandidateDecodeError::NotAStruct(record.kind()));
    }
    let text = |field: &'static str| text_member(record, field);

    let download_link = text("SubDownloadLink").ok_or(CandidateDecodeError::MissingDownloadLink)?;

    Ok(SubtitleCandidate {
        download_link,
        matched_by: text("MatchedBy"),
        user_rank: text("UserRank"),
        download_count: text("SubDownloadsCnt").and_then(|count| count.parse().ok()),
        file_name: text("SubFileName"),
        language_id: text("SubLanguageID"),
        language_name: text("LanguageName"),
        release_name: text("MovieReleaseName"),
        format: text("SubFormat"),
        subtitle_file_id: text("IDSubtitleFile"),
        imdb_id: text("IDMovieImdb"),
        uploader: text("UserNickName"),
    })
}

fn text_member(record: &Value, field: &'static str) -> Option<String> {
    let text = match record.get(field)? {
        Value::String(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        other => {
            warn!(field, kind = other.kind(), "Ignoring search result member of unexpected type");
            return None;
        }
    };
    (!text.is_empty()).then_some(text)
}
