//! Integration tests for Sluice.

use std::fs;
use std::path::Path;

use serde_json::json;

use sluice::{
    CancelToken, Curator, FilterOptions, PopulateOptions, Registry, Value,
};

/// Write a small PNG with the given dimensions and a per-image fill so
/// different names produce different content.
fn write_png(path: &Path, width: u32, height: u32, fill: u8) {
    image::GrayImage::from_pixel(width, height, image::Luma([fill]))
        .save(path)
        .expect("failed to write test image");
}

fn path_string(dir: &Path, name: &str) -> String {
    dir.join(name).to_string_lossy().into_owned()
}

// =============================================================================
// Population Scenarios
// =============================================================================

#[test]
fn test_file_size_scenario() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.png"), vec![0u8; 123]).unwrap();
    fs::write(dir.path().join("b.png"), vec![0u8; 456]).unwrap();

    let registry = Registry::builtin();
    let mut curator = Curator::in_memory();
    curator
        .add_producer(registry.producer_from_config("file_info", &json!({})).unwrap())
        .unwrap();

    let a = path_string(dir.path(), "a.png");
    let b = path_string(dir.path(), "b.png");
    curator.add_paths([a.clone(), b.clone()]).unwrap();

    let report = curator
        .populate(&PopulateOptions::default(), &CancelToken::new())
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.rows_processed, 2);

    let row_a = curator.ledger().row(&a).unwrap();
    let row_b = curator.ledger().row(&b).unwrap();
    assert_eq!(row_a.get("size"), Some(&Some(Value::Int(123))));
    assert_eq!(row_b.get("size"), Some(&Some(Value::Int(456))));
    assert!(matches!(
        row_a.get("mtime"),
        Some(&Some(Value::Timestamp(_)))
    ));
}

#[test]
fn test_image_shape_and_hash_populate() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("wide.png"), 640, 480, 10);
    write_png(&dir.path().join("tall.png"), 100, 900, 200);

    let registry = Registry::builtin();
    let mut curator = Curator::in_memory();
    curator
        .add_producer(registry.producer_from_config("image_shape", &json!({})).unwrap())
        .unwrap();
    curator
        .add_producer(
            registry
                .producer_from_config("image_hash", &json!({ "algorithm": "difference" }))
                .unwrap(),
        )
        .unwrap();

    let wide = path_string(dir.path(), "wide.png");
    let tall = path_string(dir.path(), "tall.png");
    curator.add_paths([wide.clone(), tall.clone()]).unwrap();
    let report = curator
        .populate(&PopulateOptions::default(), &CancelToken::new())
        .unwrap();
    assert!(report.is_clean());

    let row = curator.ledger().row(&wide).unwrap();
    assert_eq!(row.get("width"), Some(&Some(Value::Int(640))));
    assert_eq!(row.get("height"), Some(&Some(Value::Int(480))));
    assert_eq!(row.get("channels"), Some(&Some(Value::Int(1))));
    let Some(Some(Value::Str(hash))) = row.get("hash") else {
        panic!("hash column not populated");
    };
    assert_eq!(hash.len(), 16);
}

#[test]
fn test_unreadable_file_degrades_to_null() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("good.png"), 32, 32, 10);
    fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

    let registry = Registry::builtin();
    let mut curator = Curator::in_memory();
    curator
        .add_producer(registry.producer_from_config("image_shape", &json!({})).unwrap())
        .unwrap();

    let good = path_string(dir.path(), "good.png");
    let broken = path_string(dir.path(), "broken.png");
    curator.add_paths([good.clone(), broken.clone()]).unwrap();
    let report = curator
        .populate(&PopulateOptions::default(), &CancelToken::new())
        .unwrap();

    // The bad file is reported but does not poison its chunk.
    assert!(!report.failures.is_empty());
    assert!(report.failures.iter().all(|f| f.path == broken));
    let good_row = curator.ledger().row(&good).unwrap();
    assert_eq!(good_row.get("width"), Some(&Some(Value::Int(32))));
    let broken_row = curator.ledger().row(&broken).unwrap();
    assert_eq!(broken_row.get("width"), Some(&None));
}

#[test]
fn test_new_producer_migrates_schema_nondestructively() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("db.ledger");
    fs::write(dir.path().join("a.png"), vec![0u8; 99]).unwrap();
    let a = path_string(dir.path(), "a.png");

    let registry = Registry::builtin();
    {
        let mut curator = Curator::open(&store).unwrap();
        curator
            .add_producer(registry.producer_from_config("file_info", &json!({})).unwrap())
            .unwrap();
        curator.add_paths([a.clone()]).unwrap();
        curator
            .populate(&PopulateOptions::default(), &CancelToken::new())
            .unwrap();
        curator.save().unwrap();
    }

    // Reopen with an additional producer: old values survive untouched.
    write_png(&dir.path().join("a.png"), 8, 8, 1);
    let mut curator = Curator::open(&store).unwrap();
    let before = curator.ledger().row(&a).unwrap();
    let old_size = before.get("size").cloned().unwrap();
    assert_eq!(old_size, Some(Value::Int(99)));

    curator
        .add_producer(registry.producer_from_config("file_info", &json!({})).unwrap())
        .unwrap();
    curator
        .add_producer(registry.producer_from_config("image_shape", &json!({})).unwrap())
        .unwrap();
    curator
        .populate(&PopulateOptions::default(), &CancelToken::new())
        .unwrap();

    let after = curator.ledger().row(&a).unwrap();
    // size was computed before the file was rewritten; the ledger keeps
    // the cached value because the row was already finished for file_info.
    assert_eq!(after.get("size"), Some(&old_size));
    assert_eq!(after.get("width"), Some(&Some(Value::Int(8))));
}

// =============================================================================
// Filter Scenarios
// =============================================================================

#[test]
fn test_modified_window_rule_scenario() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("old.png"), b"x").unwrap();
    fs::write(dir.path().join("new.png"), b"y").unwrap();
    let old = path_string(dir.path(), "old.png");
    let new = path_string(dir.path(), "new.png");

    // 2015-06-01 and 2021-01-01, seconds since the epoch.
    filetime::set_file_mtime(&old, filetime::FileTime::from_unix_time(1_433_116_800, 0))
        .unwrap();
    filetime::set_file_mtime(&new, filetime::FileTime::from_unix_time(1_609_459_200, 0))
        .unwrap();

    let registry = Registry::builtin();
    let mut curator = Curator::in_memory();
    curator
        .add_producer(registry.producer_from_config("file_info", &json!({})).unwrap())
        .unwrap();
    curator.add_paths([old.clone(), new.clone()]).unwrap();
    curator
        .populate(&PopulateOptions::default(), &CancelToken::new())
        .unwrap();

    curator.add_rule(
        registry
            .rule_from_config(
                "modified",
                &json!({ "after": "2010-01-01", "before": "2020-01-01" }),
            )
            .unwrap(),
    );
    let candidates = vec![old.clone(), new.clone()];
    let surviving = curator.filter(&candidates, &FilterOptions::default()).unwrap();
    assert_eq!(surviving, vec![old]);
}

#[test]
fn test_resolution_and_duplicate_rules_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    // twin_a and twin_b are identical content; small is below min_res.
    let horizontal = |x: u32, _y: u32| image::Luma([x as u8]);
    let vertical = |_x: u32, y: u32| image::Luma([(y * 2) as u8]);
    image::GrayImage::from_fn(256, 256, horizontal)
        .save(dir.path().join("twin_a.png"))
        .unwrap();
    image::GrayImage::from_fn(256, 256, horizontal)
        .save(dir.path().join("twin_b.png"))
        .unwrap();
    image::GrayImage::from_fn(256, 128, vertical)
        .save(dir.path().join("unique.png"))
        .unwrap();
    write_png(&dir.path().join("small.png"), 16, 16, 100);

    let registry = Registry::builtin();
    let mut curator = Curator::in_memory();
    for producer in ["file_info", "image_shape", "image_hash"] {
        curator
            .add_producer(registry.producer_from_config(producer, &json!({})).unwrap())
            .unwrap();
    }
    let candidates: Vec<String> = ["twin_a.png", "twin_b.png", "unique.png", "small.png"]
        .iter()
        .map(|name| path_string(dir.path(), name))
        .collect();
    curator.add_paths(candidates.clone()).unwrap();
    let report = curator
        .populate(&PopulateOptions::default(), &CancelToken::new())
        .unwrap();
    assert!(report.is_clean());

    curator.add_rule(
        registry
            .rule_from_config("resolution", &json!({ "min_res": 64, "max_res": 4096 }))
            .unwrap(),
    );
    curator.add_rule(
        registry
            .rule_from_config("duplicates", &json!({ "resolver": "ignore_all" }))
            .unwrap(),
    );

    let surviving = curator.filter(&candidates, &FilterOptions::default()).unwrap();
    // The twins drop as an unresolved duplicate group, small fails the
    // resolution bound, unique survives.
    assert_eq!(surviving.len(), 1);
    assert!(surviving[0].ends_with("unique.png"));
}

#[test]
fn test_filter_output_is_sorted_by_requested_column() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("big.png"), vec![0u8; 500]).unwrap();
    fs::write(dir.path().join("small.png"), vec![0u8; 5]).unwrap();

    let registry = Registry::builtin();
    let mut curator = Curator::in_memory();
    curator
        .add_producer(registry.producer_from_config("file_info", &json!({})).unwrap())
        .unwrap();
    let candidates = vec![
        path_string(dir.path(), "big.png"),
        path_string(dir.path(), "small.png"),
    ];
    curator.add_paths(candidates.clone()).unwrap();
    curator
        .populate(&PopulateOptions::default(), &CancelToken::new())
        .unwrap();

    let by_size = curator
        .filter(
            &candidates,
            &FilterOptions {
                sort_by: "size".to_string(),
            },
        )
        .unwrap();
    assert!(by_size[0].ends_with("small.png"));
    assert!(by_size[1].ends_with("big.png"));
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[test]
fn test_unknown_names_fail_before_any_work() {
    let registry = Registry::builtin();
    assert!(registry.producer_from_config("perceptual", &json!({})).is_err());
    assert!(registry.rule_from_config("stat", &json!({})).is_err());
}

#[test]
fn test_invalid_window_fails_at_configuration_time() {
    let registry = Registry::builtin();
    let err = registry
        .rule_from_config("modified", &json!({ "after": "2030", "before": "2020" }))
        .unwrap_err();
    assert!(err.to_string().contains("later than"));
}
