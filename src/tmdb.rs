use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

const BASE_URL: &str = "https://api.themoviedb.org/3";

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct Season {
    pub id: i32,
    pub season_number: i32,
    pub name: String,
    #[serde(default)]
    pub air_date: Option<String>,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct Episode {
    pub id: i32,
    pub season_number: i32,
    pub episode_number: i32,
    pub name: String,
    #[serde(default)]
    pub air_date: Option<String>,
}

impl Episode {
    pub fn air_date(&self) -> Option<NaiveDate> {
        self.air_date
            .as_deref()
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
    }

    /// Aired on or before `today`. Episodes without a usable date have not.
    pub fn aired_by(&self, today: NaiveDate) -> bool {
        self.air_date().is_some_and(|date| date <= today)
    }

    pub fn has_aired(&self) -> bool {
        self.aired_by(Local::now().date_naive())
    }
}

pub struct TmdbClient {
    client: reqwest::Client,
    token: String,
}

impl TmdbClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            token: std::env::var("TMDB_API_TOKEN").context("TMDB_API_TOKEN is not set")?,
        })
    }

    pub async fn season(&self, id: i32, season: u32) -> Result<Season> {
        Ok(self
            .client
            .get(format!("{}/tv/{}/season/{}", BASE_URL, id, season))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}
