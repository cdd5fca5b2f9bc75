//! End-to-end behaviour of the recommendation pipeline over small,
//! hand-checkable rating tables.

use cinematch_core::aggregate::{predict, recommend, PredictionSource, RecommendParams};
use cinematch_core::evaluate::{
    evaluate, evaluate_split, EvaluationParams, MissingPolicy, NoProgress,
};
use cinematch_core::models::{Movie, MovieId, Rating, UserId};
use cinematch_core::neighbours::{find_k_nearest, NeighbourParams};
use cinematch_core::similarity::{similarity, SimilarityConfig};
use cinematch_core::store::memory::InMemoryRatingStore;
use cinematch_core::store::RatingStore;
use cinematch_core::RecError;

fn movies(n: MovieId) -> Vec<Movie> {
    (1..=n)
        .map(|id| Movie::new(id, format!("Movie {id}"), vec!["Drama".to_string()]))
        .collect()
}

fn build(rows: &[(UserId, MovieId, f64)], users: &[UserId], n_movies: MovieId) -> InMemoryRatingStore {
    let ratings = rows.iter().map(|&(u, m, r)| Rating::new(u, m, r)).collect();
    InMemoryRatingStore::new(users.iter().copied(), movies(n_movies), ratings)
}

fn three_users() -> InMemoryRatingStore {
    let mut rows = Vec::new();
    for (m, s) in (1..=5).zip([5.0, 4.0, 3.0, 2.0, 1.0]) {
        rows.push((1, m, s));
        rows.push((2, m, s));
        rows.push((3, m, 6.0 - s));
    }
    build(&rows, &[1, 2, 3], 5)
}

/// 30 users over 20 movies in two taste groups with opposite preferences.
fn planted_store() -> InMemoryRatingStore {
    let mut rows = Vec::new();
    for user in 1..=30u32 {
        for movie in 1..=20u32 {
            let base = ((movie * 7 + user % 3) % 5 + 1) as f64;
            let score = if user % 2 == 0 { base } else { 6.0 - base };
            rows.push((user, movie, score));
        }
    }
    let users: Vec<UserId> = (1..=30).collect();
    build(&rows, &users, 20)
}

#[test]
fn correlated_and_anti_correlated_users() {
    let store = three_users();
    let cfg = SimilarityConfig::default();
    assert!((similarity(1, 2, &store, &cfg) - 1.0).abs() < 1e-9);
    assert!((similarity(1, 3, &store, &cfg) + 1.0).abs() < 1e-9);

    let abs = SimilarityConfig {
        use_absolute_similarity: true,
        ..Default::default()
    };
    assert!((similarity(1, 3, &store, &abs) - 1.0).abs() < 1e-9);
}

#[test]
fn similarity_is_symmetric_and_self_similar() {
    let store = planted_store();
    let cfg = SimilarityConfig::default();
    for a in [1, 2, 5, 12] {
        for b in [3, 4, 17, 30] {
            assert_eq!(
                similarity(a, b, &store, &cfg),
                similarity(b, a, &store, &cfg)
            );
        }
        assert!((similarity(a, a, &store, &cfg) - 1.0).abs() < 1e-9);
    }
}

#[test]
fn neighbour_set_smaller_than_k_when_pool_is_small() {
    let store = build(
        &[(1, 1, 4.0), (2, 1, 3.0), (2, 2, 5.0), (3, 2, 1.0), (4, 3, 2.0)],
        &[1, 2, 3, 4],
        3,
    );
    let n = find_k_nearest(1, &store, 10, &SimilarityConfig::default()).unwrap();
    assert_eq!(n.len(), 3);
    assert!(n.iter().all(|n| n.user_id != 1));
}

#[test]
fn neighbour_search_is_deterministic() {
    let store = planted_store();
    let cfg = SimilarityConfig::default();
    let first = find_k_nearest(4, &store, 7, &cfg).unwrap();
    let second = find_k_nearest(4, &store, 7, &cfg).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 7);
    assert!(first.iter().all(|n| n.user_id != 4));
}

#[test]
fn recommendations_never_include_seen_movies() {
    let mut rows = Vec::new();
    for user in 1..=8u32 {
        for movie in 1..=10u32 {
            if user == 1 && movie > 4 {
                continue;
            }
            rows.push((user, movie, ((movie + user) % 5 + 1) as f64));
        }
    }
    let users: Vec<UserId> = (1..=8).collect();
    let store = build(&rows, &users, 10);

    let neighbours = find_k_nearest(1, &store, 7, &SimilarityConfig::default()).unwrap();
    let recs = recommend(1, &neighbours, &store, &RecommendParams::default()).unwrap();
    let seen = store.by_user(1).unwrap();
    assert!(!recs.is_empty());
    assert!(recs.iter().all(|r| !seen.contains(r.movie_id)));
    assert!(recs.iter().all(|r| r.support >= 5));
    assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn recommend_reports_empty_result_below_min_support() {
    let store = three_users();
    let extra = build(
        &[(1, 1, 5.0), (2, 2, 4.0), (3, 2, 3.0), (3, 3, 4.0)],
        &[1, 2, 3],
        5,
    );
    let neighbours = find_k_nearest(1, &extra, 2, &SimilarityConfig::default()).unwrap();
    let err = recommend(1, &neighbours, &extra, &RecommendParams::default()).unwrap_err();
    assert_eq!(err, RecError::EmptyResult { min_support: 5 });

    // nothing left to recommend when every movie is already seen
    let neighbours = find_k_nearest(1, &store, 2, &SimilarityConfig::default()).unwrap();
    assert!(matches!(
        recommend(1, &neighbours, &store, &RecommendParams::default()),
        Err(RecError::EmptyResult { .. })
    ));
}

#[test]
fn prediction_without_neighbour_coverage_is_user_mean() {
    let store = build(
        &[(1, 1, 5.0), (1, 2, 2.0), (1, 2, 4.0), (2, 3, 1.0)],
        &[1, 2],
        4,
    );
    let neighbours = find_k_nearest(1, &store, 5, &SimilarityConfig::default()).unwrap();
    let p = predict(1, 4, &neighbours, &store).unwrap();
    assert_eq!(p.source, PredictionSource::UserMean);
    assert_eq!(Some(p.score), store.user_mean(1));
    assert_eq!(p.score, 4.0);
}

/// Users 1 and 2 agree on movies 1-5, user 3 is their mirror image.
/// With k = 1 user 1's only neighbour is user 2:
///   movie 6: predict 5, actual 5 -> 0
///   movie 7: predict 1, actual 2 -> 1
///   movie 8: no coverage, user 1 mean 3 -> |3 - 4| = 1
fn planted_split() -> (InMemoryRatingStore, Vec<Rating>) {
    let mut rows = Vec::new();
    for (m, s) in (1..=5).zip([5.0, 4.0, 3.0, 2.0, 1.0]) {
        rows.push((1, m, s));
        rows.push((2, m, s));
        rows.push((3, m, 6.0 - s));
    }
    rows.extend([(2, 6, 5.0), (2, 7, 1.0), (3, 6, 1.0), (3, 7, 5.0)]);
    let train = build(&rows, &[1, 2, 3], 8);
    let test = vec![
        Rating::new(1, 6, 5.0),
        Rating::new(1, 7, 2.0),
        Rating::new(1, 8, 4.0),
    ];
    (train, test)
}

#[test]
fn evaluation_matches_hand_computed_errors() {
    let (train, test) = planted_split();
    let params = EvaluationParams {
        neighbours: NeighbourParams {
            k: 1,
            ..Default::default()
        },
        parallel: false,
        ..Default::default()
    };
    let report = evaluate_split(&train, &test, &params, &NoProgress).unwrap();
    assert_eq!(report.coverage, 3);
    assert!((report.mae - 2.0 / 3.0).abs() < 1e-12);
    assert!((report.rmse - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);

    // the mirror-image user pulls predictions to 3 when admitted
    let wide = EvaluationParams {
        neighbours: NeighbourParams {
            k: 2,
            ..Default::default()
        },
        parallel: false,
        ..Default::default()
    };
    let report = evaluate_split(&train, &test, &wide, &NoProgress).unwrap();
    assert!((report.mae - 4.0 / 3.0).abs() < 1e-12);
}

#[test]
fn parallel_and_sequential_evaluation_agree() {
    let store = planted_store();
    let base = EvaluationParams {
        test_fraction: 0.2,
        max_users: None,
        neighbours: NeighbourParams {
            k: 5,
            ..Default::default()
        },
        missing_policy: MissingPolicy::Skip,
        seed: Some(7),
        ..Default::default()
    };
    let par = evaluate(
        &store,
        &EvaluationParams {
            parallel: true,
            ..base.clone()
        },
        &NoProgress,
    )
    .unwrap();
    let seq = evaluate(
        &store,
        &EvaluationParams {
            parallel: false,
            ..base
        },
        &NoProgress,
    )
    .unwrap();
    assert_eq!(par, seq);
    assert_eq!(par.folds.len(), 1);
    assert_eq!(par.folds[0].test_rows, 120);
    assert!(par.mae.is_finite() && par.rmse >= par.mae);
}

#[test]
fn folds_resample_and_average() {
    let store = planted_store();
    let params = EvaluationParams {
        max_users: Some(10),
        seed: Some(3),
        folds: 3,
        ..Default::default()
    };
    let summary = evaluate(&store, &params, &NoProgress).unwrap();
    assert_eq!(summary.folds.len(), 3);
    assert_eq!(summary.empty_folds, 0);
    let mean_mae = summary.folds.iter().map(|f| f.mae).sum::<f64>() / 3.0;
    assert!((summary.mae - mean_mae).abs() < 1e-12);
    assert!(summary.folds.iter().all(|f| f.users_evaluated <= 10));
    assert_eq!(
        summary.coverage,
        summary.folds.iter().map(|f| f.coverage).sum::<usize>()
    );
}
