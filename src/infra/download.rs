use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{SubtitleTransfer, TransferError};

/// Downloads gzip-compressed subtitles over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    http: reqwest::blocking::Client,
}

impl HttpTransfer {
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, TransferError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
        })
    }
}

impl SubtitleTransfer for HttpTransfer {
    fn fetch(&self, url: &str, destination: &Path) -> Result<(), TransferError> {
        debug!(url, destination = %destination.display(), "Downloading subtitle");
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            return Err(TransferError::Status(response.status()));
        }
        install_gzip(response, destination)
    }
}

/// Decompresses `payload` next to `destination` and renames it into place.
/// The temporary file is removed on any failure.
pub fn install_gzip<R: Read>(payload: R, destination: &Path) -> Result<(), TransferError> {
    let io_error = |source: io::Error| TransferError::Io {
        path: destination.display().to_string(),
        source,
    };

    let directory = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(directory).map_err(io_error)?;

    let mut decoder = GzDecoder::new(payload);
    io::copy(&mut decoder, temp.as_file_mut()).map_err(io_error)?;
    temp.as_file().sync_all().map_err(io_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644)).map_err(io_error)?;
    }

    temp.persist(destination)
        .map_err(|e| io_error(e.error))?;
    Ok(())
}
