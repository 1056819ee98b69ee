use std::path::Path;

use thiserror::Error;

use crate::domain::models::{SearchQuery, SessionToken, SubtitleCandidate};

pub mod download;
pub mod languages;
pub mod opensubtitles;
pub mod xmlrpc;

/// Failure talking to the catalog endpoint.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error(transparent)]
    Xml(#[from] xmlrpc::XmlRpcError),

    #[error("Catalog replied with status {0:?}")]
    BadStatus(String),

    #[error("Response is missing {0:?}")]
    MissingMember(&'static str),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Login failed: {0}")]
    Auth(#[source] RpcError),

    #[error("Search failed: {0}")]
    Search(#[source] RpcError),
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed: HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Remote subtitle catalog.
pub trait SubtitleCatalog {
    fn login(&mut self) -> Result<SessionToken, CatalogError>;

    /// Runs exactly one query; candidates come back in catalog order.
    fn search(
        &mut self,
        token: &SessionToken,
        query: &SearchQuery,
    ) -> Result<Vec<SubtitleCandidate>, CatalogError>;
}

/// Fetches a compressed subtitle payload and stores it decompressed.
pub trait SubtitleTransfer {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), TransferError>;
}
