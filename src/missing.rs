//! Cross-references sorted episodes against TMDB season listings.

use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::{collections::BTreeSet, fs, path::Path};
use tabled::Tabled;

use crate::{
    config::Config,
    pipeline::{Identification, Pipeline},
    tmdb::{Season, TmdbClient},
    video::{episode_id, parse_canonical_name},
};

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct MissingEpisode {
    #[tabled(rename = "Show")]
    pub show: String,
    #[tabled(rename = "Episode")]
    pub episode: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Air date")]
    pub air_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedShow {
    pub name: String,
    pub tmdb_id: i32,
    pub season: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub shows: Vec<String>,
    /// Queries that did not clear the threshold, with their best confidence.
    pub unresolved: Vec<(String, u8)>,
}

/// Resolves each query to a configured show the same way filenames are
/// identified. No queries selects every configured show.
pub fn select_shows(pipeline: &Pipeline, config: &Config, queries: &[String]) -> Selection {
    if queries.is_empty() {
        return Selection {
            shows: config.shows.keys().cloned().collect(),
            unresolved: Vec::new(),
        };
    }

    let mut selection = Selection::default();
    for query in queries {
        match pipeline.identify_series(query) {
            Identification::Identified { show, .. } => {
                if !selection.shows.contains(&show) {
                    selection.shows.push(show);
                }
            }
            Identification::Unidentified { confidence } => {
                selection.unresolved.push((query.clone(), confidence));
            }
        }
    }
    selection
}

/// Splits shows into those with a TMDB id and the names of those without.
pub fn tracked_shows(config: &Config, shows: &[String]) -> (Vec<TrackedShow>, Vec<String>) {
    let mut tracked = Vec::new();
    let mut untracked = Vec::new();
    for name in shows {
        match config.show(name).and_then(|show| Some((show.tmdb_id?, show.season()))) {
            Some((tmdb_id, season)) => tracked.push(TrackedShow {
                name: name.clone(),
                tmdb_id,
                season,
            }),
            None => untracked.push(name.clone()),
        }
    }
    (tracked, untracked)
}

/// `(season, episode)` pairs already sorted into `<destination>/<show>`.
pub fn local_episodes(destination: &Path, show: &str) -> Result<BTreeSet<(u32, u32)>> {
    let dir = destination.join(show);
    if !dir.is_dir() {
        return Ok(BTreeSet::new());
    }

    let mut episodes = BTreeSet::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let entry = entry?;
        if let Some(episode) = entry
            .file_name()
            .to_str()
            .and_then(|name| parse_canonical_name(show, name))
        {
            episodes.insert(episode);
        }
    }
    Ok(episodes)
}

/// Aired episodes of `season` with no matching local file.
pub fn missing_from_season(
    show: &TrackedShow,
    season: &Season,
    local: &BTreeSet<(u32, u32)>,
) -> Vec<MissingEpisode> {
    season
        .episodes
        .iter()
        .filter(|episode| episode.has_aired())
        .filter_map(|episode| {
            let number = u32::try_from(episode.episode_number).ok()?;
            if local.contains(&(show.season, number)) {
                return None;
            }
            Some(MissingEpisode {
                show: show.name.clone(),
                episode: episode_id(show.season, number),
                title: episode.name.clone(),
                air_date: episode.air_date.clone().unwrap_or_default(),
            })
        })
        .collect()
}

pub async fn find_missing(
    client: &TmdbClient,
    destination: &Path,
    shows: &[TrackedShow],
) -> Result<Vec<MissingEpisode>> {
    let seasons = try_join_all(
        shows
            .iter()
            .map(|show| client.season(show.tmdb_id, show.season))
            .collect::<Vec<_>>(),
    )
    .await?;

    let mut missing = Vec::new();
    for (show, season) in shows.iter().zip(&seasons) {
        let local = local_episodes(destination, &show.name)?;
        missing.extend(missing_from_season(show, season, &local));
    }
    Ok(missing)
}
