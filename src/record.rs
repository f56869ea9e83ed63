use core::fmt;
use std::path::{Path, PathBuf};

/// Which step of the pipeline rejected a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Unparseable,
    MissingEpisode,
    MissingSeries,
    NotIdentified,
    NameGeneration,
    Relocation,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Unparseable => "unparseable",
            FailureKind::MissingEpisode => "missing episode",
            FailureKind::MissingSeries => "missing series",
            FailureKind::NotIdentified => "not identified",
            FailureKind::NameGeneration => "name generation",
            FailureKind::Relocation => "relocation",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub reason: String,
}

/// Per-file state threaded through parse, identify, name generation and
/// relocation.
///
/// Stages take a record by value and hand back a new one. The source path
/// is fixed at construction and a failure, once recorded, is never
/// cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRecord {
    pub(crate) filename: PathBuf,
    pub(crate) failure: Option<Failure>,
    pub ext: String,
    pub seriesname: Option<String>,
    pub episode: Option<String>,
    pub episodename: Option<String>,
    pub identified_as: Option<String>,
    pub confidence: Option<u8>,
    pub season: Option<u32>,
    pub offset: Option<i64>,
    pub new_name: Option<String>,
    pub moved_to: Option<PathBuf>,
}

impl EpisodeRecord {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            failure: None,
            ext: String::new(),
            seriesname: None,
            episode: None,
            episodename: None,
            identified_as: None,
            confidence: None,
            season: None,
            offset: None,
            new_name: None,
            moved_to: None,
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// File name component of the source path, for reporting.
    pub fn basename(&self) -> String {
        self.filename
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.to_string_lossy().into_owned())
    }

    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|failure| failure.kind)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_ref().map(|failure| failure.reason.as_str())
    }

    /// Marks the record failed. The first failure wins.
    pub fn fail(self, kind: FailureKind, reason: impl Into<String>) -> Self {
        if self.failed() {
            return self;
        }
        Self {
            failure: Some(Failure {
                kind,
                reason: reason.into(),
            }),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_not_failed() {
        let record = EpisodeRecord::new("/in/show - 01.mkv");
        assert!(!record.failed());
        assert_eq!(record.failure_reason(), None);
        assert_eq!(record.filename(), Path::new("/in/show - 01.mkv"));
    }

    #[test]
    fn test_fail_sets_reason_and_kind() {
        let record = EpisodeRecord::new("a.mkv").fail(FailureKind::MissingSeries, "nope");
        assert!(record.failed());
        assert_eq!(record.failure_reason(), Some("nope"));
        assert_eq!(record.failure_kind(), Some(FailureKind::MissingSeries));
    }

    #[test]
    fn test_first_failure_wins() {
        let record = EpisodeRecord::new("a.mkv")
            .fail(FailureKind::NotIdentified, "first")
            .fail(FailureKind::Relocation, "second");
        assert_eq!(record.failure_reason(), Some("first"));
        assert_eq!(record.failure_kind(), Some(FailureKind::NotIdentified));
    }

    #[test]
    fn test_basename() {
        assert_eq!(
            EpisodeRecord::new("/downloads/[Blah] some show - 01.mkv").basename(),
            "[Blah] some show - 01.mkv"
        );
        assert_eq!(EpisodeRecord::new("plain.mkv").basename(), "plain.mkv");
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::NotIdentified.to_string(), "not identified");
    }
}
