use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::domain::models::{
    subtitle_path_for, FileIdentity, Resolution, SearchQuery, SessionToken, SubtitleCandidate,
};
use crate::infra::{CatalogError, SubtitleCatalog, SubtitleTransfer, TransferError};
use crate::media::filename::classify;
use crate::media::fingerprint::{fingerprint_file, FingerprintError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// State for resolving one file, from login to candidate selection.
#[derive(Debug)]
pub struct MatchSession {
    token: SessionToken,
    attempts: Vec<SearchQuery>,
    results: Vec<SubtitleCandidate>,
}

impl MatchSession {
    fn open<C: SubtitleCatalog>(catalog: &mut C) -> Result<Self, CatalogError> {
        Ok(Self {
            token: catalog.login()?,
            attempts: Vec::new(),
            results: Vec::new(),
        })
    }

    // One query per call; the previous results are discarded.
    fn search<C: SubtitleCatalog>(
        &mut self,
        catalog: &mut C,
        query: SearchQuery,
    ) -> Result<usize, CatalogError> {
        self.results.clear();
        let results = catalog.search(&self.token, &query)?;
        debug!(%query, attempt = self.attempts.len() + 1, found = results.len(), "Searched catalog");
        self.attempts.push(query);
        self.results = results;
        Ok(self.results.len())
    }

    fn attempt_trail(&self) -> String {
        self.attempts
            .iter()
            .map(|query| query.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// First candidate in response order. No ranking is applied.
    fn select(self) -> Option<SubtitleCandidate> {
        self.results.into_iter().next()
    }
}

/// Finds and downloads subtitles for one video file at a time.
pub struct Resolver<C, T> {
    catalog: C,
    transfer: T,
    language_id: String,
}

impl<C: SubtitleCatalog, T: SubtitleTransfer> Resolver<C, T> {
    /// `language_id` is the catalog's language id, empty for any language.
    pub fn new(catalog: C, transfer: T, language_id: &str) -> Self {
        Self {
            catalog,
            transfer,
            language_id: language_id.to_string(),
        }
    }

    /// Tries an exact fingerprint match first, then falls back to what the
    /// file name says. The subtitle lands beside the video as `.srt`.
    pub fn resolve(&mut self, video: &Path) -> Result<Resolution, ResolveError> {
        let (fingerprint, size) = fingerprint_file(video)?;
        let identity = FileIdentity {
            path: video.to_path_buf(),
            size,
            fingerprint,
        };
        let file_name = identity.file_name();
        let parsed = classify(&file_name);
        debug!(file = %file_name, ?parsed, "Classified file name");

        let mut session = MatchSession::open(&mut self.catalog)?;

        let found = session.search(&mut self.catalog, SearchQuery::by_hash(&identity))?;
        if found == 0 {
            debug!(file = %file_name, "No fingerprint match, searching by name");
            let query = SearchQuery::by_name(&file_name, &parsed, &self.language_id);
            session.search(&mut self.catalog, query)?;
        }

        if session.results.is_empty() {
            debug!(file = %file_name, trail = %session.attempt_trail(), "No candidates");
        }
        let Some(candidate) = session.select() else {
            return Ok(Resolution::NotFound);
        };

        let subtitle_path = subtitle_path_for(video);
        self.transfer.fetch(&candidate.download_link, &subtitle_path)?;
        Ok(Resolution::Downloaded {
            subtitle_path,
            candidate,
        })
    }

    #[cfg(test)]
    pub fn parts(&self) -> (&C, &T) {
        (&self.catalog, &self.transfer)
    }
}
