//! End-to-end runs of whole manifests through the orchestrator.

use std::collections::HashSet;

use datagen_core::error::DataGenError;
use datagen_core::generate::{generate_data, Generator, Value};
use datagen_core::manifest::load_schema_str;
use datagen_core::output::{CsvSink, MemorySink};
use datagen_testutil::{
    base_time, fixed_options, write_manifest, FailingSink, CLAIMS_MANIFEST, COMPOSITE_MANIFEST,
    PARENT_CHILD_MANIFEST,
};

#[tokio::test]
async fn test_foreign_keys_resolve_to_parent_values() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path(), "test", PARENT_CHILD_MANIFEST);

    let mut sink = MemorySink::new();
    let summary = generate_data(&mut sink, 5, &manifest).await.unwrap();
    assert_eq!(summary.records_attempted, 10);
    assert_eq!(summary.records_failed, 0);

    let parent_ids: HashSet<String> = sink
        .table("table_a")
        .into_iter()
        .map(|r| r["id"].to_string())
        .collect();
    assert_eq!(parent_ids.len(), 5);

    let children = sink.table("table_b");
    assert_eq!(children.len(), 5);
    for child in children {
        assert!(parent_ids.contains(&child["id"].to_string()));
    }

    // Parents are generated first even though the manifest lists them second
    assert_eq!(sink.records()[0].0, "table_a");
    assert!(sink.is_finished());
}

#[tokio::test]
async fn test_claim_rules() {
    let schema = load_schema_str(CLAIMS_MANIFEST).unwrap();
    let mut generator = Generator::new(&schema, &fixed_options(200));
    let mut sink = MemorySink::new();
    let summary = generator.run(&mut sink, None).await.unwrap();

    let claims = sink.table("claims");
    assert_eq!(claims.len(), 200);
    for claim in &claims {
        let age = claim["age"].as_int().unwrap();
        match claim["status"].as_str().unwrap() {
            "PENDING" => {
                let expected = if age > 40 { "High" } else { "Medium" };
                assert_eq!(claim["priority"], Value::from(expected));
                assert_eq!(
                    claim["review_by"],
                    Value::Timestamp(base_time() + chrono::Duration::hours(48))
                );
                assert!(!claim.contains_key("closed"));
            }
            "APPROVED" => {
                assert_eq!(claim["priority"], Value::from("Low"));
                assert_eq!(claim["closed"], Value::Bool(true));
                assert!(!claim.contains_key("review_by"));
                let big = claim["amount"].as_f64().unwrap() > 1000.0;
                assert_eq!(claim.contains_key("escalated"), big);
            }
            other => panic!("unexpected status {}", other),
        }
    }

    let stats = summary.per_table["claims"].rules;
    assert!(stats.then_applied + stats.otherwise_applied >= 200);
    assert_eq!(stats.errors, 0);

    // Every note points at a generated claim
    let claim_ids: HashSet<String> = claims.iter().map(|c| c["claim_id"].to_string()).collect();
    for note in sink.table("claim_notes") {
        assert!(claim_ids.contains(&note["claim_id"].to_string()));
        assert!(note["reference"].as_str().unwrap().starts_with("REF-"));
    }
}

#[tokio::test]
async fn test_composite_columns() {
    let schema = load_schema_str(COMPOSITE_MANIFEST).unwrap();
    let mut sink = MemorySink::new();
    Generator::new(&schema, &fixed_options(20))
        .run(&mut sink, None)
        .await
        .unwrap();

    for profile in sink.table("profiles") {
        let Value::Map(attributes) = &profile["attributes"] else {
            panic!("attributes should be a map");
        };
        assert!((1..=3).contains(&attributes.len()));
        assert!(attributes
            .keys()
            .all(|k| ["color", "size", "shape"].contains(&k.as_str())));

        let Value::List(tags) = &profile["tags"] else {
            panic!("tags should be a list");
        };
        assert_eq!(tags.len(), 2);
        assert_ne!(tags[0], tags[1]);

        let Value::List(scores) = &profile["scores"] else {
            panic!("scores should be a list");
        };
        assert_eq!(scores.len(), 3);

        let Value::Map(address) = &profile["address"] else {
            panic!("address should be a map");
        };
        assert_eq!(address["zip"].as_str().map(str::len), Some(5));

        let Value::List(point) = &profile["point"] else {
            panic!("point should be a list");
        };
        assert_eq!(point.len(), 2);

        let Value::Map(meta) = &profile["meta"] else {
            panic!("meta should be a map");
        };
        assert!(meta["active"].as_bool().is_some());
        assert!((1..=9).contains(&meta["visits"].as_int().unwrap()));

        // date columns render with their own format
        let born = profile["born"].as_str().unwrap();
        assert_eq!(born, "01/06/2025");
        assert_eq!(profile["id"].as_str().map(str::len), Some(36));
    }
}

#[tokio::test]
async fn test_csv_output() {
    let dir = tempfile::tempdir().unwrap();
    let schema = load_schema_str(CLAIMS_MANIFEST).unwrap();
    let mut sink = CsvSink::from_schema(dir.path().join("out"), &schema).unwrap();
    Generator::new(&schema, &fixed_options(12))
        .run(&mut sink, None)
        .await
        .unwrap();

    let claims = std::fs::read_to_string(dir.path().join("out/claims.csv")).unwrap();
    let mut lines = claims.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("claim_id,status,age,amount,created_on,"));
    assert!(header.contains("priority"));
    assert_eq!(lines.count(), 12);

    let mut reader = csv::Reader::from_path(dir.path().join("out/claims.csv")).unwrap();
    let status_col = reader
        .headers()
        .unwrap()
        .iter()
        .position(|h| h == "status")
        .unwrap();
    for row in reader.records() {
        let row = row.unwrap();
        assert!(["PENDING", "APPROVED"].contains(&&row[status_col]));
    }

    assert!(dir.path().join("out/claim_notes.csv").exists());
}

#[tokio::test]
async fn test_sink_errors_do_not_stop_the_run() {
    let schema = load_schema_str(PARENT_CHILD_MANIFEST).unwrap();
    let mut sink = FailingSink::new("table_a");
    let summary = Generator::new(&schema, &fixed_options(4))
        .run(&mut sink, None)
        .await
        .unwrap();

    assert_eq!(summary.records_attempted, 8);
    assert_eq!(summary.records_failed, 4);
    assert_eq!(summary.records_written(), 4);
    assert_eq!(summary.per_table["table_a"].failed, 4);
    // Rejected parents still feed the parent-key cache
    assert_eq!(sink.accepted.table("table_b").len(), 4);
    assert!(sink.finished);
}

#[tokio::test]
async fn test_strict_mode_aborts_and_finishes() {
    let schema = load_schema_str(PARENT_CHILD_MANIFEST).unwrap();
    let mut options = fixed_options(4);
    options.strict = true;

    let mut sink = FailingSink::new("table_b");
    let err = Generator::new(&schema, &options)
        .run(&mut sink, None)
        .await
        .unwrap_err();

    match err {
        DataGenError::SinkAborted {
            table,
            record_index,
            ..
        } => {
            assert_eq!(table, "table_b");
            assert_eq!(record_index, 0);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(sink.accepted.table("table_a").len(), 4);
    assert_eq!(sink.rejected, 1);
    assert!(sink.finished);
}

#[tokio::test]
async fn test_missing_manifest_is_fatal() {
    let mut sink = MemorySink::new();
    let err = generate_data(&mut sink, 1, std::path::Path::new("does/not/exist.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(err, DataGenError::ManifestRead { .. }));
    assert!(sink.is_empty());
}
