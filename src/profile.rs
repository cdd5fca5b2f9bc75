//! User profile view for `cine profile`.
//!
//! Lists what a user rated, best first, along with their mean rating and
//! how their ratings spread across genres.

use anyhow::Result;
use cinematch_core::models::{MovieId, UserId};
use cinematch_core::store::RatingStore;
use cinematch_core::RecError;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::Config;
use crate::dataset;
use crate::recommend::describe_error;
use crate::stats::format_ts_date;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedMovie {
    pub movie_id: MovieId,
    pub title: String,
    pub rating: f64,
    /// Most recent timestamp across duplicate rows, if any.
    pub rated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreShare {
    pub genre: String,
    pub count: usize,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub mean: f64,
    pub rated: Vec<RatedMovie>,
    pub genres: Vec<GenreShare>,
}

/// Build the profile of `user`.
///
/// Duplicate ratings of the same movie are averaged. Movies are sorted by
/// rating descending, then by id. Genres are sorted by count descending,
/// then by name.
pub fn build_profile<S: RatingStore + ?Sized>(
    user: UserId,
    store: &S,
) -> Result<UserProfile, RecError> {
    if !store.contains_user(user) {
        return Err(RecError::InvalidUser(user));
    }
    let vector = store.by_user(user).ok_or(RecError::ColdUser(user))?;
    let mean = vector.mean().ok_or(RecError::ColdUser(user))?;

    let mut rated_at: HashMap<MovieId, i64> = HashMap::new();
    for r in store.ratings().iter().filter(|r| r.user_id == user) {
        if let Some(ts) = r.timestamp {
            let e = rated_at.entry(r.movie_id).or_insert(ts);
            *e = (*e).max(ts);
        }
    }

    let mut rated: Vec<RatedMovie> = vector
        .iter()
        .map(|(movie_id, rating)| RatedMovie {
            movie_id,
            title: store
                .movie(movie_id)
                .map(|m| m.title.clone())
                .unwrap_or_else(|| format!("#{}", movie_id)),
            rating,
            rated_at: rated_at.get(&movie_id).copied(),
        })
        .collect();
    rated.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.movie_id.cmp(&b.movie_id))
    });

    let mut by_genre: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for (movie_id, rating) in vector.iter() {
        if let Some(movie) = store.movie(movie_id) {
            for g in &movie.genres {
                let e = by_genre.entry(g.as_str()).or_insert((0, 0.0));
                e.0 += 1;
                e.1 += rating;
            }
        }
    }
    let mut genres: Vec<GenreShare> = by_genre
        .into_iter()
        .map(|(genre, (count, sum))| GenreShare {
            genre: genre.to_string(),
            count,
            mean: sum / count as f64,
        })
        .collect();
    genres.sort_by(|a, b| b.count.cmp(&a.count).then(a.genre.cmp(&b.genre)));

    Ok(UserProfile {
        user_id: user,
        mean,
        rated,
        genres,
    })
}

pub fn run_profile(config: &Config, user: UserId, limit: Option<usize>, json: bool) -> Result<()> {
    let store = dataset::load_store(&config.data)?;
    let profile = build_profile(user, &store).map_err(|e| describe_error(e, &store))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let limit = limit.unwrap_or(config.recommend.limit);

    println!(
        "User {}: {} movies rated, mean {:.2}",
        profile.user_id,
        profile.rated.len(),
        profile.mean
    );
    println!();
    println!("  {:>6}  {:<10}  {}", "RATING", "DATE", "TITLE");
    for m in profile.rated.iter().take(limit) {
        println!(
            "  {:>6.1}  {:<10}  {}",
            m.rating,
            m.rated_at.map(format_ts_date).unwrap_or_else(|| "-".into()),
            m.title
        );
    }
    if profile.rated.len() > limit {
        println!("  ... {} more", profile.rated.len() - limit);
    }

    if !profile.genres.is_empty() {
        println!();
        println!("  {:<14} {:>6} {:>6}", "GENRE", "COUNT", "MEAN");
        for g in &profile.genres {
            println!("  {:<14} {:>6} {:>6.2}", g.genre, g.count, g.mean);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinematch_core::models::{Movie, Rating};
    use cinematch_core::store::memory::InMemoryRatingStore;

    fn store() -> InMemoryRatingStore {
        InMemoryRatingStore::new(
            [1, 2],
            vec![
                Movie::new(10, "Heat (1995)", vec!["Action".into(), "Crime".into()]),
                Movie::new(11, "Toy Story (1995)", vec!["Animation".into()]),
                Movie::new(12, "Casino (1995)", vec!["Crime".into()]),
            ],
            vec![
                Rating::new(1, 10, 4.0).with_timestamp(100),
                Rating::new(1, 10, 5.0).with_timestamp(200),
                Rating::new(1, 11, 2.0),
                Rating::new(1, 12, 5.0),
            ],
        )
    }

    #[test]
    fn sorts_and_averages_duplicates() {
        let p = build_profile(1, &store()).unwrap();
        let ids: Vec<_> = p.rated.iter().map(|m| m.movie_id).collect();
        assert_eq!(ids, vec![12, 10, 11]);
        assert_eq!(p.rated[1].rating, 4.5);
        assert_eq!(p.rated[1].rated_at, Some(200));
        assert!((p.mean - 11.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn genre_breakdown() {
        let p = build_profile(1, &store()).unwrap();
        assert_eq!(p.genres[0].genre, "Crime");
        assert_eq!(p.genres[0].count, 2);
        assert!((p.genres[0].mean - 4.75).abs() < 1e-12);
    }

    #[test]
    fn errors_for_unknown_and_cold_users() {
        assert_eq!(build_profile(9, &store()), Err(RecError::InvalidUser(9)));
        assert_eq!(build_profile(2, &store()), Err(RecError::ColdUser(2)));
    }
}
