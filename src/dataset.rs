//! MovieLens `.dat` loader.
//!
//! Reads the three `::`-separated MovieLens 1M tables and hands them to
//! the core as an [`InMemoryRatingStore`]:
//!
//! | File | Format | Used columns |
//! |------|--------|--------------|
//! | `users.dat` | `UserID::Gender::Age::Occupation::Zip` | id |
//! | `movies.dat` | `MovieID::Title::Genres` (Latin-1) | all, genres split on `\|` |
//! | `ratings.dat` | `UserID::MovieID::Rating[::Timestamp]` | all |
//!
//! Blank lines are ignored. Any other malformed line is an error naming
//! the file and line number. `users.dat` may be absent, in which case the
//! user set is every user that appears in `ratings.dat`.

use anyhow::{anyhow, bail, Context, Result};
use cinematch_core::models::{Movie, MovieId, Rating, UserId};
use cinematch_core::store::memory::InMemoryRatingStore;
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::DataConfig;

const SEP: &str = "::";

/// The three parsed tables.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: Vec<UserId>,
    pub movies: Vec<Movie>,
    pub ratings: Vec<Rating>,
}

impl Dataset {
    pub fn into_store(self) -> InMemoryRatingStore {
        InMemoryRatingStore::new(self.users, self.movies, self.ratings)
    }
}

/// Load all tables from the configured data directory.
pub fn load_dataset(data: &DataConfig) -> Result<Dataset> {
    let started = Instant::now();

    let movies_path = data.movies_path();
    let ratings_path = data.ratings_path();
    let users_path = data.users_path();

    let movies = parse_movies(&read_latin1(&movies_path)?, &movies_path)?;
    let ratings = parse_ratings(&read_latin1(&ratings_path)?, &ratings_path)?;

    let users = if users_path.exists() {
        parse_users(&read_latin1(&users_path)?, &users_path)?
    } else {
        warn!(
            path = %users_path.display(),
            "users file missing; deriving user set from ratings"
        );
        ratings
            .iter()
            .map(|r| r.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    info!(
        users = users.len(),
        movies = movies.len(),
        ratings = ratings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dataset loaded"
    );

    Ok(Dataset {
        users,
        movies,
        ratings,
    })
}

/// Load the dataset and build the store in one step.
pub fn load_store(data: &DataConfig) -> Result<InMemoryRatingStore> {
    Ok(load_dataset(data)?.into_store())
}

/// Read a file as Latin-1. Every byte maps to the code point of the same
/// value, so this never fails on encoding.
fn read_latin1(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}

fn lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty())
}

fn field<T: FromStr>(raw: Option<&str>, what: &str, path: &Path, line: usize) -> Result<T> {
    let raw = raw.ok_or_else(|| anyhow!("{}:{}: missing {}", path.display(), line, what))?;
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("{}:{}: invalid {} '{}'", path.display(), line, what, raw))
}

pub fn parse_users(text: &str, path: &Path) -> Result<Vec<UserId>> {
    lines(text)
        .map(|(n, l)| field(l.split(SEP).next(), "user id", path, n))
        .collect()
}

pub fn parse_movies(text: &str, path: &Path) -> Result<Vec<Movie>> {
    let mut movies = Vec::new();
    for (n, l) in lines(text) {
        let mut parts = l.splitn(3, SEP);
        let id: MovieId = field(parts.next(), "movie id", path, n)?;
        let title = parts
            .next()
            .ok_or_else(|| anyhow!("{}:{}: missing title", path.display(), n))?
            .to_string();
        let genres = match parts.next() {
            Some(g) if !g.trim().is_empty() => {
                g.trim().split('|').map(|s| s.to_string()).collect()
            }
            _ => Vec::new(),
        };
        movies.push(Movie::new(id, title, genres));
    }
    Ok(movies)
}

pub fn parse_ratings(text: &str, path: &Path) -> Result<Vec<Rating>> {
    let mut ratings = Vec::new();
    for (n, l) in lines(text) {
        let mut parts = l.split(SEP);
        let user: UserId = field(parts.next(), "user id", path, n)?;
        let movie: MovieId = field(parts.next(), "movie id", path, n)?;
        let score: f64 = field(parts.next(), "rating", path, n)?;
        if !score.is_finite() {
            bail!("{}:{}: rating must be finite", path.display(), n);
        }
        let mut rating = Rating::new(user, movie, score);
        if let Some(ts) = parts.next() {
            rating = rating.with_timestamp(field(Some(ts), "timestamp", path, n)?);
        }
        ratings.push(rating);
    }
    Ok(ratings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn p() -> PathBuf {
        PathBuf::from("test.dat")
    }

    #[test]
    fn parses_users() {
        let users = parse_users("1::F::1::10::48067\n2::M::56::16::70072\n\n", &p()).unwrap();
        assert_eq!(users, vec![1, 2]);
    }

    #[test]
    fn parses_movies_with_genres() {
        let movies = parse_movies(
            "1::Toy Story (1995)::Animation|Children's|Comedy\r\n2::Untitled::\n",
            &p(),
        )
        .unwrap();
        assert_eq!(movies[0].title, "Toy Story (1995)");
        assert_eq!(movies[0].genres, vec!["Animation", "Children's", "Comedy"]);
        assert!(movies[1].genres.is_empty());
    }

    #[test]
    fn parses_ratings_with_optional_timestamp() {
        let ratings = parse_ratings("1::1193::5::978300760\n2::661::3.5\n", &p()).unwrap();
        assert_eq!(ratings[0].rating, 5.0);
        assert_eq!(ratings[0].timestamp, Some(978300760));
        assert_eq!(ratings[1].rating, 3.5);
        assert_eq!(ratings[1].timestamp, None);
    }

    #[test]
    fn malformed_line_names_location() {
        let err = parse_ratings("1::2::5\n1::x::4\n", &p()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("test.dat:2"), "{}", msg);
        assert!(msg.contains("movie id"), "{}", msg);
    }

    #[test]
    fn latin1_bytes_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.dat");
        std::fs::write(&path, b"7::Am\xe9lie (2001)::Comedy\n").unwrap();
        let text = read_latin1(&path).unwrap();
        let movies = parse_movies(&text, &path).unwrap();
        assert_eq!(movies[0].title, "Amélie (2001)");
    }

    #[test]
    fn missing_users_file_derives_from_ratings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("movies.dat"), "1::A::Drama\n").unwrap();
        std::fs::write(dir.path().join("ratings.dat"), "5::1::4\n3::1::2\n5::1::3\n").unwrap();
        let data = DataConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let ds = load_dataset(&data).unwrap();
        assert_eq!(ds.users, vec![3, 5]);
        assert_eq!(ds.ratings.len(), 3);
    }
}
