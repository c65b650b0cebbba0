#[path = "common/mod.rs"]
mod common;

use common::*;
use cinetl::{HarvestOutcome, Harvester, KeySet, RatingsError, RatingsResolver};

/// Three failing keys: exactly three requests, then the fatal exhaustion
/// signal; a later lookup does not touch the network again.
#[test]
fn every_key_failing_exhausts_after_one_attempt_each() {
    let ratings = FakeRatings::new()
        .with_key("k1", KeyScript::Broken)
        .with_key("k2", KeyScript::Broken)
        .with_key("k3", KeyScript::Broken);
    let keys = KeySet::new(vec!["k1".into(), "k2".into(), "k3".into()]);
    let mut resolver = RatingsResolver::new(&ratings, keys);

    let err = resolver.lookup("tt0000001").unwrap_err();
    assert!(matches!(err, RatingsError::KeysExhausted(3)));
    assert_eq!(ratings.calls.get(), 3, "one attempt per key, no wrap-around");

    let err = resolver.lookup("tt0000002").unwrap_err();
    assert!(matches!(err, RatingsError::KeysExhausted(3)));
    assert_eq!(ratings.calls.get(), 3, "a spent set answers without any request");
}

/// A rate-limited key is abandoned for the process lifetime: the first
/// lookup pays one wasted request, later lookups go straight to the good
/// key. The parsed reply fills all three rating slots.
#[test]
fn rate_limited_key_is_skipped_permanently() {
    let ratings = FakeRatings::new().with_key("k1", KeyScript::RateLimited);
    let keys = KeySet::new(vec!["k1".into(), "k2".into()]);
    let mut resolver = RatingsResolver::new(&ratings, keys);

    let report = resolver.lookup("tt0000001").unwrap().unwrap();
    assert_eq!(ratings.calls.get(), 2);
    assert_eq!(resolver.cursor(), 1);
    assert_eq!(report.awards.as_deref(), Some("2 wins for tt0000001"));
    assert_eq!(report.ratings.imdb.as_deref(), Some("8.5/10"));
    assert_eq!(report.ratings.rotten_tomatoes.as_deref(), Some("94%"));
    assert_eq!(report.ratings.metacritic.as_deref(), Some("74/100"));

    resolver.lookup("tt0000002").unwrap().unwrap();
    assert_eq!(ratings.calls.get(), 3, "second lookup skips the limited key");
    assert_eq!(resolver.cursor(), 1);
}

/// An embedder that persisted the cursor hands it back at construction: a
/// set starting at the second key never touches the first. Handing back the
/// set's length means every key is already spent.
#[test]
fn persisted_cursor_resumes_past_spent_keys() {
    let ratings = FakeRatings::new().with_key("k1", KeyScript::Broken);
    let keys = KeySet::starting_at(vec!["k1".into(), "k2".into()], 1);
    let mut resolver = RatingsResolver::new(&ratings, keys);

    let report = resolver.lookup("tt0000001").unwrap().unwrap();
    assert_eq!(ratings.calls.get(), 1, "the spent first key is never tried");
    assert_eq!(resolver.cursor(), 1);
    assert_eq!(report.awards.as_deref(), Some("2 wins for tt0000001"));

    let ratings = FakeRatings::new();
    let keys = KeySet::starting_at(vec!["k1".into(), "k2".into()], 2);
    let mut resolver = RatingsResolver::new(&ratings, keys);

    let err = resolver.lookup("tt0000002").unwrap_err();
    assert!(matches!(err, RatingsError::KeysExhausted(2)));
    assert_eq!(ratings.calls.get(), 0);
}

/// An empty cross-reference id never reaches the provider.
#[test]
fn empty_external_id_short_circuits() {
    let ratings = FakeRatings::new();
    let mut resolver = RatingsResolver::new(&ratings, KeySet::new(vec!["k1".into()]));

    assert!(resolver.lookup("").unwrap().is_none());
    assert_eq!(ratings.calls.get(), 0);
}

/// Exhaustion mid-run stops the whole walk with a resumable checkpoint; a
/// rerun with fresh quotas finishes the year.
#[test]
fn exhaustion_stops_run_and_resumes_cleanly() {
    let dir = make_data_dir();
    let pages = vec![vec![1, 2]];

    let catalog = FakeCatalog::new().with_year(2024, pages.clone());
    let ratings = FakeRatings::new()
        .with_key("k1", KeyScript::Broken)
        .with_key("k2", KeyScript::Broken)
        .with_key("k3", KeyScript::Broken);
    let summary = Harvester::new(test_options(&dir), &catalog, &ratings)
        .run()
        .unwrap();

    assert_eq!(summary.outcome, HarvestOutcome::Exhausted);
    assert_eq!(summary.new_records, 0);
    assert_eq!(catalog.detail_calls.get(), 1, "stops at the first title needing ratings");
    assert!(read_shard_ids(&dir).is_empty());
    let cp = load_checkpoint(&dir);
    assert_eq!((cp.partition_index, cp.page), (0, 1));

    let catalog = FakeCatalog::new().with_year(2024, pages);
    let summary = Harvester::new(test_options(&dir), &catalog, &FakeRatings::new())
        .run()
        .unwrap();
    assert_eq!(summary.outcome, HarvestOutcome::Completed);
    assert_eq!(read_shard_ids(&dir), vec![1, 2]);
}
