use std::fmt;
use std::path::{Path, PathBuf};

/// A video file as seen by the matcher: where it lives, how big it is and
/// its content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub path: PathBuf,
    pub size: u64,
    pub fingerprint: u64,
}

impl FileIdentity {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// What the file name says about the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedName {
    MovieGuess {
        raw_title: String,
        year: u16,
    },
    EpisodeGuess {
        show: String,
        season: u32,
        episode: u32,
    },
    Unclassified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    Hash,
    Name,
}

/// One constraint set sent to the catalog. Keys are unique and keep their
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    shape: QueryShape,
    constraints: Vec<(String, String)>,
}

impl SearchQuery {
    pub fn by_hash(identity: &FileIdentity) -> Self {
        let mut query = Self {
            shape: QueryShape::Hash,
            constraints: Vec::new(),
        };
        query.set("moviehash", identity.fingerprint.to_string());
        query.set("moviebytesize", identity.size.to_string());
        query
    }

    /// Name based query: show/season/episode for an episode guess, the raw
    /// file name otherwise.
    pub fn by_name(file_name: &str, parsed: &ParsedName, language_id: &str) -> Self {
        let mut query = Self {
            shape: QueryShape::Name,
            constraints: Vec::new(),
        };
        match parsed {
            ParsedName::EpisodeGuess {
                show,
                season,
                episode,
            } => {
                query.set("query", show.clone());
                query.set("season", season.to_string());
                query.set("episode", episode.to_string());
            }
            _ => query.set("query", file_name.to_string()),
        }
        query.set("sublanguageid", language_id.to_string());
        query
    }

    fn set(&mut self, key: &str, value: String) {
        match self.constraints.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.constraints.push((key.to_string(), value)),
        }
    }

    pub fn shape(&self) -> QueryShape {
        self.shape
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.constraints
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> Vec<&str> {
        self.constraints.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn constraints(&self) -> &[(String, String)] {
        &self.constraints
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .constraints
            .iter()
            .map(|(k, v)| format!("{k}={v:?}"))
            .collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

/// A subtitle record returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleCandidate {
    pub download_link: String,
    pub matched_by: Option<String>,
    pub user_rank: Option<String>,
    pub download_count: Option<u64>,
    pub file_name: Option<String>,
    pub language_id: Option<String>,
    pub language_name: Option<String>,
    pub release_name: Option<String>,
    pub format: Option<String>,
    pub subtitle_file_id: Option<String>,
    pub imdb_id: Option<String>,
    pub uploader: Option<String>,
}

/// Catalog session credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How the resolution of one file ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Downloaded {
        subtitle_path: PathBuf,
        candidate: SubtitleCandidate,
    },
    NotFound,
}

/// `<dir>/<file name without its final extension>.srt`
pub fn subtitle_path_for(video: &Path) -> PathBuf {
    let file_name = video
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name.as_str(),
    };
    let directory = video.parent().unwrap_or(Path::new(""));
    directory.join(format!("{base}.srt"))
}
