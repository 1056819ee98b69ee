//! Scripted stand-ins for the catalog and transfer collaborators.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::models::{SearchQuery, SessionToken, SubtitleCandidate};
use crate::infra::{CatalogError, RpcError, SubtitleCatalog, SubtitleTransfer, TransferError};
use crate::media::fingerprint::CHUNK_SIZE;

/// Catalog that answers searches from a script and records every call.
#[derive(Debug, Default)]
pub struct StubCatalog {
    pub(crate) responses: VecDeque<Vec<SubtitleCandidate>>,
    pub fail_login: bool,
    pub fail_search: bool,
    pub logins: usize,
    pub searches: Vec<SearchQuery>,
}

impl StubCatalog {
    /// Each search pops the next response; an exhausted script answers empty.
    pub fn with_responses(responses: Vec<Vec<SubtitleCandidate>>) -> Self {
        Self {
            responses: responses.into(),
            ..Self::default()
        }
    }
}

impl SubtitleCatalog for StubCatalog {
    fn login(&mut self) -> Result<SessionToken, CatalogError> {
        self.logins += 1;
        if self.fail_login {
            return Err(CatalogError::Auth(RpcError::BadStatus(
                "401 Unauthorized".to_string(),
            )));
        }
        Ok(SessionToken("stub-token".to_string()))
    }

    fn search(
        &mut self,
        _token: &SessionToken,
        query: &SearchQuery,
    ) -> Result<Vec<SubtitleCandidate>, CatalogError> {
        self.searches.push(query.clone());
        if self.fail_search {
            return Err(CatalogError::Search(RpcError::BadStatus(
                "503 Service Unavailable".to_string(),
            )));
        }
        Ok(self.responses.pop_front().unwrap_or_default())
    }
}

/// Transfer that writes a placeholder subtitle and records what it fetched.
#[derive(Debug, Default)]
pub struct StubTransfer {
    pub fail: bool,
    pub fetched: RefCell<Vec<(String, PathBuf)>>,
}

impl SubtitleTransfer for StubTransfer {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), TransferError> {
        self.fetched
            .borrow_mut()
            .push((url.to_string(), destination.to_path_buf()));
        if self.fail {
            return Err(TransferError::Status(reqwest::StatusCode::NOT_FOUND));
        }
        fs::write(destination, "1\n00:00:01,000 --> 00:00:02,000\nstub\n").map_err(|source| {
            TransferError::Io {
                path: destination.display().to_string(),
                source,
            }
        })
    }
}

pub fn candidate(link: &str) -> SubtitleCandidate {
    SubtitleCandidate {
        download_link: link.to_string(),
        ..SubtitleCandidate::default()
    }
}

/// Writes a fake video large enough to fingerprint.
pub fn write_video(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let content: Vec<u8> = (0..2 * CHUNK_SIZE).map(|i| (i % 253) as u8).collect();
    fs::write(&path, content).unwrap();
    path
}
