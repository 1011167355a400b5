//! Thin async client for the TMDB v3 API and the card shapes served to the UI.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const TMDB_IMG_500: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Error, Debug)]
pub enum TmdbError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("tmdb returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Movie as TMDB lists it in search, discover and feed results.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMovie {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct MoviePage {
    #[serde(default)]
    results: Vec<RawMovie>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieCard {
    pub tmdb_id: u64,
    pub title: String,
    pub poster_url: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub tmdb_id: u64,
    pub title: String,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeCategory {
    Trending,
    Popular,
    TopRated,
    NowPlaying,
    Upcoming,
}

impl HomeCategory {
    fn path(self) -> &'static str {
        match self {
            HomeCategory::Trending => "/trending/movie/day",
            HomeCategory::Popular => "/movie/popular",
            HomeCategory::TopRated => "/movie/top_rated",
            HomeCategory::NowPlaying => "/movie/now_playing",
            HomeCategory::Upcoming => "/movie/upcoming",
        }
    }
}

pub fn img_url(path: Option<&str>) -> Option<String> {
    match path {
        Some(p) if !p.is_empty() => Some(format!("{TMDB_IMG_500}{p}")),
        _ => None,
    }
}

impl From<&RawMovie> for MovieCard {
    fn from(m: &RawMovie) -> Self {
        MovieCard {
            tmdb_id: m.id,
            title: m.title.clone(),
            poster_url: img_url(m.poster_path.as_deref()),
            release_date: m.release_date.clone(),
            vote_average: m.vote_average,
        }
    }
}

impl From<RawMovie> for MovieDetails {
    fn from(m: RawMovie) -> Self {
        MovieDetails {
            tmdb_id: m.id,
            poster_url: img_url(m.poster_path.as_deref()),
            backdrop_url: img_url(m.backdrop_path.as_deref()),
            title: m.title,
            overview: m.overview,
            release_date: m.release_date,
            genres: m.genres,
        }
    }
}

pub fn to_cards(results: &[RawMovie], limit: usize) -> Vec<MovieCard> {
    results.iter().take(limit).map(MovieCard::from).collect()
}

#[derive(Clone)]
pub struct TmdbClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self, TmdbError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string(), api_key: api_key.into() })
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, params: &[(&str, String)]) -> Result<T, TmdbError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TmdbError::Status { status: status.as_u16(), body });
        }
        Ok(resp.json::<T>().await?)
    }

    /// Raw TMDB search payload, passed through unchanged.
    pub async fn search_raw(&self, query: &str, page: u32) -> Result<serde_json::Value, TmdbError> {
        self.get("/search/movie", &search_params(query, page)).await
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<RawMovie>, TmdbError> {
        let page: MoviePage = self.get("/search/movie", &search_params(query, page)).await?;
        Ok(page.results)
    }

    pub async fn first_match(&self, query: &str) -> Result<Option<MovieCard>, TmdbError> {
        Ok(self.search(query, 1).await?.first().map(MovieCard::from))
    }

    pub async fn movie_details(&self, tmdb_id: u64) -> Result<MovieDetails, TmdbError> {
        let raw: RawMovie = self.get(&format!("/movie/{tmdb_id}"), &[("language", "en-US".into())]).await?;
        Ok(raw.into())
    }

    pub async fn home_feed(&self, category: HomeCategory) -> Result<Vec<RawMovie>, TmdbError> {
        let params: Vec<(&str, String)> = match category {
            HomeCategory::Trending => Vec::new(),
            _ => vec![("page", "1".into())],
        };
        let page: MoviePage = self.get(category.path(), &params).await?;
        Ok(page.results)
    }

    /// Movies sharing at least one of `genre_ids`, most popular first.
    pub async fn discover_by_genres(&self, genre_ids: &[u64]) -> Result<Vec<RawMovie>, TmdbError> {
        let with_genres = genre_ids.iter().map(u64::to_string).collect::<Vec<_>>().join("|");
        let params = [
            ("with_genres", with_genres),
            ("sort_by", "popularity.desc".to_string()),
            ("language", "en-US".to_string()),
            ("page", "1".to_string()),
        ];
        let page: MoviePage = self.get("/discover/movie", &params).await?;
        Ok(page.results)
    }

    /// Popular movies that share a genre with `tmdb_id`, excluding it.
    pub async fn recommend_by_genre(&self, tmdb_id: u64, limit: usize) -> Result<Vec<MovieCard>, TmdbError> {
        let details = self.movie_details(tmdb_id).await?;
        if details.genres.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<u64> = details.genres.iter().map(|g| g.id).collect();
        let found = self.discover_by_genres(&ids).await?;
        Ok(found.iter().filter(|m| m.id != tmdb_id).take(limit).map(MovieCard::from).collect())
    }
}

fn search_params(query: &str, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("query", query.to_string()),
        ("include_adult", "false".into()),
        ("language", "en-US".into()),
        ("page", page.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls() {
        assert_eq!(img_url(Some("/p.jpg")).as_deref(), Some("https://image.tmdb.org/t/p/w500/p.jpg"));
        assert_eq!(img_url(Some("")), None);
        assert_eq!(img_url(None), None);
    }

    #[test]
    fn cards_truncate_and_map() {
        let raw: Vec<RawMovie> = serde_json::from_str(
            r#"[{"id":1,"title":"A","poster_path":"/a.jpg","vote_average":7.5},{"id":2},{"id":3,"title":"C"}]"#,
        )
        .unwrap();
        let cards = to_cards(&raw, 2);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].poster_url.as_deref(), Some("https://image.tmdb.org/t/p/w500/a.jpg"));
        assert_eq!(cards[1].title, "");
    }
}
