//! Parse, identify and name episode files.
//!
//! Records flow through the stages lazily and in arrival order. A stage that
//! rejects a record marks it failed; later stages pass failed records along
//! untouched, so every input path comes out exactly once.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::debug;

use crate::{
    alias::AliasIndex,
    config::Config,
    matcher::Matcher,
    record::{EpisodeRecord, FailureKind},
    video::{FilenameParser, canonical_name},
};

/// Wraps a stage so that failed records bypass it unchanged.
pub fn skip_failed<F>(mut stage: F) -> impl FnMut(EpisodeRecord) -> EpisodeRecord
where
    F: FnMut(EpisodeRecord) -> EpisodeRecord,
{
    move |record| {
        if record.failed() {
            record
        } else {
            stage(record)
        }
    }
}

/// Outcome of matching a series name against the alias index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identification {
    Identified { show: String, confidence: u8 },
    Unidentified { confidence: u8 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub success: Vec<EpisodeRecord>,
    pub failure: Vec<EpisodeRecord>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.failure.is_empty()
    }

    pub fn len(&self) -> usize {
        self.success.len() + self.failure.len()
    }
}

impl FromIterator<EpisodeRecord> for Partition {
    fn from_iter<I: IntoIterator<Item = EpisodeRecord>>(iter: I) -> Self {
        let (failure, success): (Vec<_>, Vec<_>) =
            iter.into_iter().partition(EpisodeRecord::failed);
        Self { success, failure }
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    aliases: &'a AliasIndex,
    parser: &'a dyn FilenameParser,
    matcher: &'a dyn Matcher,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        aliases: &'a AliasIndex,
        parser: &'a dyn FilenameParser,
        matcher: &'a dyn Matcher,
    ) -> Self {
        Self {
            config,
            aliases,
            parser,
            matcher,
        }
    }

    /// Lazily runs every path through parse, identify and name generation.
    pub fn records<I>(&self, paths: I) -> impl Iterator<Item = EpisodeRecord>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        paths
            .into_iter()
            .map(move |path| self.parse(path))
            .map(skip_failed(move |record| self.identify(record)))
            .map(skip_failed(move |record| self.generate_name(record)))
    }

    pub fn run<I>(&self, paths: I) -> Partition
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.records(paths).collect()
    }

    pub fn parse(&self, path: PathBuf) -> EpisodeRecord {
        let record = EpisodeRecord::new(path);
        let parsed = match self.parser.parse(record.filename()) {
            Ok(parsed) => parsed,
            Err(e) => {
                let reason = format!("Error parsing {} -> {}", record.basename(), e);
                debug!("{}", reason);
                return record.fail(FailureKind::Unparseable, reason);
            }
        };

        let record = EpisodeRecord {
            ext: parsed.ext,
            seriesname: parsed.seriesname,
            episode: parsed.episode,
            episodename: parsed.episodename,
            ..record
        };

        if record.episode.is_none() {
            return record.fail(FailureKind::MissingEpisode, "Could not parse episode number");
        }
        if record.seriesname.is_none() {
            return record.fail(FailureKind::MissingSeries, "Could not parse series name");
        }

        debug!(
            "parsed {:?} as {:?} episode {:?}",
            record.filename(),
            record.seriesname,
            record.episode
        );
        record
    }

    /// Best alias for `seriesname`, accepted only when its confidence is
    /// strictly above the configured threshold.
    pub fn identify_series(&self, seriesname: &str) -> Identification {
        let candidates: Vec<&str> = self.aliases.keys().collect();
        let Some(best) = self.matcher.best_match(seriesname, &candidates) else {
            return Identification::Unidentified { confidence: 0 };
        };

        if best.confidence > self.config.settings.threshold {
            if let Some(show) = self.aliases.resolve(&best.candidate) {
                return Identification::Identified {
                    show: show.to_string(),
                    confidence: best.confidence,
                };
            }
        }
        Identification::Unidentified {
            confidence: best.confidence,
        }
    }

    fn identify(&self, record: EpisodeRecord) -> EpisodeRecord {
        let Some(seriesname) = record.seriesname.as_deref() else {
            return record.fail(FailureKind::MissingSeries, "Could not parse series name");
        };

        match self.identify_series(seriesname) {
            Identification::Identified { show, confidence } => {
                debug!("identified {:?} as {:?} ({})", seriesname, show, confidence);
                EpisodeRecord {
                    identified_as: Some(show),
                    confidence: Some(confidence),
                    ..record
                }
            }
            Identification::Unidentified { confidence } => {
                debug!("could not identify {:?} ({})", seriesname, confidence);
                EpisodeRecord {
                    confidence: Some(confidence),
                    ..record
                }
                .fail(
                    FailureKind::NotIdentified,
                    format!("Series not identified (confidence={})", confidence),
                )
            }
        }
    }

    fn generate_name(&self, record: EpisodeRecord) -> EpisodeRecord {
        match self.resolve_name(&record) {
            Ok((season, offset, new_name)) => EpisodeRecord {
                season: Some(season),
                offset: Some(offset),
                new_name: Some(new_name),
                ..record
            },
            Err(e) => record.fail(
                FailureKind::NameGeneration,
                format!("Error during name generation ({:#})", e),
            ),
        }
    }

    fn resolve_name(&self, record: &EpisodeRecord) -> Result<(u32, i64, String)> {
        let show_name = record
            .identified_as
            .as_deref()
            .context("record has no identified show")?;
        let show = self
            .config
            .show(show_name)
            .with_context(|| format!("no configuration for show `{}`", show_name))?;
        let raw = record
            .episode
            .as_deref()
            .context("record has no episode number")?;

        let offset = show.offset();
        let season = show.season();
        let parsed: i64 = raw
            .parse()
            .with_context(|| format!("invalid episode number `{}`", raw))?;
        let episode = parsed
            .checked_add(offset)
            .and_then(|episode| u32::try_from(episode).ok());
        let Some(episode) = episode else {
            bail!("episode {} with offset {} is out of range", parsed, offset);
        };

        Ok((
            season,
            offset,
            canonical_name(show_name, season, episode, &record.ext),
        ))
    }
}
