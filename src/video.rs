use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

static CANONICAL_EPISODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^S(\d+)E(\d+)(?:\.[^.]+)?$").expect("canonical episode regex should compile")
});

/// Canonical `S<season>E<episode>` tag, episode padded to two digits.
pub fn episode_id(season: u32, episode: u32) -> String {
    format!("S{}E{:02}", season, episode)
}

/// Filename of a sorted episode, made safe for the filesystem.
pub fn canonical_name(show: &str, season: u32, episode: u32, ext: &str) -> String {
    sanitize_filename::sanitize(format!("{} - {}{}", show, episode_id(season, episode), ext))
}

/// Reads `(season, episode)` back out of a name produced by
/// [`canonical_name`] for the given show.
pub fn parse_canonical_name(show: &str, file_name: &str) -> Option<(u32, u32)> {
    let rest = file_name.strip_prefix(show)?.strip_prefix(" - ")?;
    let caps = CANONICAL_EPISODE_REGEX.captures(rest)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Extract the title from a filename by removing metadata patterns
/// Returns the cleaned title as a string
pub fn parse_title(path: &Path) -> Option<String> {
    let file_name = path.file_stem().and_then(|name| name.to_str())?;

    // Patterns that indicate the start of metadata (case insensitive)
    let metadata_patterns = [
        r"[Ss]\d+",
        r"[Ee]\d+",
        r"\d{4}",
        r"\d{3,4}p",
        r"(?i)(bluray|brrip|webrip|web-dl|hdtv|dvdrip|xvid|x264|x265|h264|h265)",
        r"(?i)(proper|repack|internal|limited|unrated|extended|directors.cut)",
        r"\[.*?\]",
        r"\(.*?\)",
    ];

    let combined_pattern = metadata_patterns.join("|");
    let re = Regex::new(&combined_pattern).ok()?;

    // A leading group tag is not the end of the title.
    let group = Regex::new(r"^\s*\[[^\]]*\]\s*").ok()?;
    let file_name = group.replace(file_name, "");

    let title_end = re
        .find(&file_name)
        .map(|m| m.start())
        .unwrap_or(file_name.len());

    clean_series(&file_name[..title_end])
}

/// Lowercased extension of `path` if it is one of `valid_extensions`.
pub fn parse_extension(path: &Path, valid_extensions: &[String]) -> Option<String> {
    if path.is_dir() {
        return None;
    }

    let ext = path.extension()?.to_str()?.to_lowercase();
    if !valid_extensions.contains(&ext) {
        return None;
    }

    Some(ext)
}

/// Recursively collects files under `root` with one of `valid_extensions`,
/// in file name order. Only an unreadable `root` is an error; entries below
/// it that cannot be read are logged and skipped.
pub fn find_videos(root: &Path, valid_extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() > 0 => {
                warn!("skipping {:?}: {}", e.path().unwrap_or(root), e);
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to walk {:?}", root)),
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if parse_extension(entry.path(), valid_extensions).is_some() {
            videos.push(entry.into_path());
        }
    }
    Ok(videos)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFilename {
    pub seriesname: Option<String>,
    pub episode: Option<String>,
    pub episodename: Option<String>,
    /// Extension including the leading dot, or empty.
    pub ext: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("path has no file name")]
    NoFileName,
    #[error("file name is not valid UTF-8")]
    NotUtf8,
    #[error("no series or episode information found")]
    Unrecognized,
}

/// Splits a filename into series name, episode number and episode title.
pub trait FilenameParser {
    fn parse(&self, path: &Path) -> Result<ParsedFilename, ParseError>;
}

/// Release-name parser covering `Show S01E02`, `Show 1x02` and fansub
/// style `[Group] Show - 02` names.
#[derive(Debug)]
pub struct PatternParser {
    group: Regex,
    patterns: Vec<Regex>,
    metadata: Regex,
    tags: Regex,
}

impl PatternParser {
    pub fn new() -> Result<Self> {
        let patterns = [
            r"(?i)^(?P<series>.+?)[\s._-]+s(?P<season>\d{1,3})[\s._-]*e(?P<episode>\d{1,4})(?P<rest>.*)$",
            r"(?i)^(?P<series>.+?)[\s._-]+(?P<season>\d{1,2})x(?P<episode>\d{1,4})(?P<rest>\b.*)$",
            r"(?i)^(?P<series>.+?)[\s_]+-[\s_]+(?P<episode>\d{1,4})(?:v\d+)?(?P<rest>(?:[\s._\[(-].*)?)$",
            r"(?i)^s(?P<season>\d{1,3})[\s._-]*e(?P<episode>\d{1,4})(?P<rest>.*)$",
            r"(?i)^(?P<season>\d{1,2})x(?P<episode>\d{1,4})(?P<rest>\b.*)$",
        ]
        .into_iter()
        .map(Regex::new)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            group: Regex::new(r"^\s*\[[^\]]*\][\s._-]*")?,
            patterns,
            metadata: Regex::new(
                r"(?i)\b(\d{3,4}p|bluray|brrip|webrip|web-dl|hdtv|dvdrip|xvid|x264|x265|h264|h265|proper|repack)\b.*$",
            )?,
            tags: Regex::new(r"\[[^\]]*\]|\([^)]*\)")?,
        })
    }

    fn episode_title(&self, caps: &Captures) -> Option<String> {
        let rest = caps.name("rest")?.as_str();
        let rest = self.tags.replace_all(rest, " ");
        let rest = self.metadata.replace(&rest, "");
        clean_series(&rest)
    }
}

impl FilenameParser for PatternParser {
    fn parse(&self, path: &Path) -> Result<ParsedFilename, ParseError> {
        let stem = path
            .file_stem()
            .ok_or(ParseError::NoFileName)?
            .to_str()
            .ok_or(ParseError::NotUtf8)?;
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let stem = self.group.replace(stem, "");

        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(&stem) {
                return Ok(ParsedFilename {
                    seriesname: caps.name("series").and_then(|m| clean_series(m.as_str())),
                    episode: caps.name("episode").map(|m| m.as_str().to_string()),
                    episodename: self.episode_title(&caps),
                    ext,
                });
            }
        }

        match parse_title(path) {
            Some(title) => Ok(ParsedFilename {
                seriesname: Some(title),
                episode: None,
                episodename: None,
                ext,
            }),
            None => Err(ParseError::Unrecognized),
        }
    }
}

fn clean_series(raw: &str) -> Option<String> {
    let cleaned = raw
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned.trim_matches(|c: char| c == '-' || c.is_whitespace());

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(name: &str) -> Result<ParsedFilename, ParseError> {
        PatternParser::new().unwrap().parse(Path::new(name))
    }

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|ext| ext.to_string()).collect()
    }

    #[test]
    fn test_episode_id() {
        assert_eq!(episode_id(1, 1), "S1E01");
        assert_eq!(episode_id(5, 12), "S5E12");
        assert_eq!(episode_id(10, 123), "S10E123");
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(
            canonical_name("some show", 1, 1, ".mkv"),
            "some show - S1E01.mkv"
        );
        assert_eq!(
            canonical_name("What? Show", 2, 6, ".mp4"),
            "What Show - S2E06.mp4"
        );
    }

    #[test]
    fn test_parse_canonical_name() {
        assert_eq!(
            parse_canonical_name("some show", "some show - S1E01.mkv"),
            Some((1, 1))
        );
        assert_eq!(
            parse_canonical_name("some show", "some show - S12E104.mp4"),
            Some((12, 104))
        );
        assert_eq!(parse_canonical_name("some show", "other - S1E01.mkv"), None);
        assert_eq!(parse_canonical_name("some show", "some show - 01.mkv"), None);
        assert_eq!(
            parse_canonical_name("some show", "some show - S1E01.part.mkv"),
            None
        );
    }

    #[test]
    fn test_parse_title_simple() {
        assert_eq!(
            parse_title(Path::new("Movie Name.mkv")),
            Some("Movie Name".to_string())
        );
    }

    #[test]
    fn test_parse_title_with_season_episode() {
        assert_eq!(
            parse_title(Path::new("Show.Title.S01E01.720p.mkv")),
            Some("Show Title".to_string())
        );
    }

    #[test]
    fn test_parse_title_with_group_tag() {
        assert_eq!(
            parse_title(Path::new("[Group] Show Name [1080p].mkv")),
            Some("Show Name".to_string())
        );
    }

    #[test]
    fn test_parse_title_only_metadata() {
        assert_eq!(parse_title(Path::new("[1080p].mkv")), None);
    }

    #[test]
    fn test_parse_extension_with_valid_extensions() {
        let valid = exts(&["mkv", "mp4"]);
        assert_eq!(
            parse_extension(Path::new("video.mp4"), &valid).as_deref(),
            Some("mp4")
        );
        assert_eq!(
            parse_extension(Path::new("/path/to/movie.MKV"), &valid).as_deref(),
            Some("mkv")
        );
    }

    #[test]
    fn test_parse_extension_with_invalid_extensions() {
        let valid = exts(&["mkv"]);
        assert_eq!(parse_extension(Path::new("video.mp4"), &valid), None);
        assert_eq!(parse_extension(Path::new("noextension"), &valid), None);
    }

    #[test]
    fn test_find_videos_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        for name in ["b.mkv", "a.MKV", "notes.txt", "nested/c.mkv"] {
            fs::File::create(root.join(name)).unwrap();
        }

        let videos = find_videos(root, &exts(&["mkv"])).unwrap();
        assert_eq!(
            videos,
            vec![root.join("a.MKV"), root.join("b.mkv"), root.join("nested/c.mkv")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_find_videos_skips_unreadable_dir() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let locked = root.join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::File::create(locked.join("hidden.mkv")).unwrap();
        fs::File::create(root.join("visible.mkv")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let videos = find_videos(root, &exts(&["mkv"]));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root may still read the locked directory, so only the readable file is checked.
        let videos = videos.unwrap();
        assert!(videos.contains(&root.join("visible.mkv")));
    }

    #[test]
    fn test_find_videos_missing_root() {
        assert!(find_videos(Path::new("/nonexistent/downloads"), &exts(&["mkv"])).is_err());
    }

    #[test]
    fn test_parse_fansub_release() {
        let parsed = parse("[Blah] some show - 01.mkv").unwrap();
        assert_eq!(
            parsed,
            ParsedFilename {
                seriesname: Some("some show".to_string()),
                episode: Some("01".to_string()),
                episodename: None,
                ext: ".mkv".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_fansub_release_with_version_and_tags() {
        let parsed = parse("[Group] Some Show - 12v2 [1080p][ABCD1234].mkv").unwrap();
        assert_eq!(parsed.seriesname.as_deref(), Some("Some Show"));
        assert_eq!(parsed.episode.as_deref(), Some("12"));
        assert_eq!(parsed.episodename, None);
    }

    #[test]
    fn test_parse_scene_release() {
        let parsed = parse("Some.Show.S02E05.720p.HDTV.x264.mkv").unwrap();
        assert_eq!(parsed.seriesname.as_deref(), Some("Some Show"));
        assert_eq!(parsed.episode.as_deref(), Some("05"));
        assert_eq!(parsed.episodename, None);
        assert_eq!(parsed.ext, ".mkv");
    }

    #[test]
    fn test_parse_episode_title() {
        let parsed = parse("Some Show - S01E02 - The Pilot.mp4").unwrap();
        assert_eq!(parsed.seriesname.as_deref(), Some("Some Show"));
        assert_eq!(parsed.episode.as_deref(), Some("02"));
        assert_eq!(parsed.episodename.as_deref(), Some("The Pilot"));
    }

    #[test]
    fn test_parse_season_x_episode() {
        let parsed = parse("some_show_3x07.avi").unwrap();
        assert_eq!(parsed.seriesname.as_deref(), Some("some show"));
        assert_eq!(parsed.episode.as_deref(), Some("07"));
    }

    #[test]
    fn test_parse_without_series() {
        let parsed = parse("S01E03.mkv").unwrap();
        assert_eq!(parsed.seriesname, None);
        assert_eq!(parsed.episode.as_deref(), Some("03"));
    }

    #[test]
    fn test_parse_without_episode() {
        let parsed = parse("Some Movie.mkv").unwrap();
        assert_eq!(parsed.seriesname.as_deref(), Some("Some Movie"));
        assert_eq!(parsed.episode, None);
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(parse("[1080p].mkv"), Err(ParseError::Unrecognized));
    }

    #[test]
    fn test_parse_uses_file_name_only() {
        let parsed = parse("/downloads/Other S09E09/[Blah] some show - 04.mkv").unwrap();
        assert_eq!(parsed.seriesname.as_deref(), Some("some show"));
        assert_eq!(parsed.episode.as_deref(), Some("04"));
    }
}
