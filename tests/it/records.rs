//! Record materialization: round-trips, source columns, post stages and
//! the sort stage.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use serde_json::json;

use parquet_sieve::{
    scan, Cache, Error, FieldSpec, Query, Reader, Record, Result, SortSpec,
};

use super::fixture::{two_groups, with_payload};

#[tokio::test]
async fn empty_filter_round_trips_every_row() -> Result<()> {
    let reader = two_groups();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::parse(&json!({
        "fields": [{"path": "quantity"}, {"path": "name"}]
    }))?;
    let records: Vec<Record> = scan(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;

    assert_eq!(records.len(), 11);
    let quantities: Vec<i64> = records
        .iter()
        .map(|record| record["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, vec![20, 25, 30, 24, 29, 25, 20, 15, 17, 18, 30]);
    assert_eq!(records[1]["name"], json!("dallas"));
    assert_eq!(records[6]["name"], json!("amy"));
    Ok(())
}

#[tokio::test]
async fn source_fields_merge_their_documents() -> Result<()> {
    let reader = with_payload();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::parse(&json!({
        "filter": [{"path": "quantity", "min": 2, "max": 3}],
        "fields": [{"path": "quantity"}, {"path": "payload", "source": true}],
    }))?;
    let records: Vec<Record> = scan(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;

    let expected: Vec<Record> = [
        json!({"quantity": 2, "kind": "b", "weight": 20}),
        json!({"quantity": 3, "kind": "c", "weight": 30}),
    ]
    .iter()
    .map(|v| v.as_object().unwrap().clone())
    .collect();
    // the raw payload column is omitted once its keys are merged
    assert_eq!(records, expected);
    Ok(())
}

#[tokio::test]
async fn source_predicates_match_raw_documents() -> Result<()> {
    let reader = with_payload();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::parse(&json!({
        "filter": [{
            "path": "payload",
            "value": r#"{"kind":"c","weight":30}"#,
            "source": true,
        }],
        "fields": [{"path": "quantity"}],
    }))?;
    let records: Vec<Record> = scan(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["quantity"], json!(3));
    Ok(())
}

#[tokio::test]
async fn post_stages_run_in_declaration_order() -> Result<()> {
    let reader = two_groups();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::parse(&json!({
        "fields": [{"path": "quantity"}]
    }))?
    .post_filter(Arc::new(|record: &Record| {
        Ok(record["quantity"].as_i64().unwrap_or(0) >= 25)
    }))
    .post_transform(Arc::new(|mut record: Record| {
        let doubled = record["quantity"].as_i64().unwrap_or(0) * 2;
        record.insert("doubled".to_string(), json!(doubled));
        Ok(record)
    }));

    let records: Vec<Record> = scan(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;
    let doubled: Vec<i64> = records
        .iter()
        .map(|record| record["doubled"].as_i64().unwrap())
        .collect();
    assert_eq!(doubled, vec![50, 60, 58, 50, 60]);
    Ok(())
}

#[tokio::test]
async fn failing_post_stage_terminates_the_stream() -> Result<()> {
    let reader = two_groups();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::parse(&json!({
        "fields": [{"path": "quantity"}]
    }))?
    .post_filter(Arc::new(|record: &Record| {
        if record["quantity"] == json!(30) {
            Err("thirty is right out".to_string())
        } else {
            Ok(true)
        }
    }));

    let emitted: Vec<Result<Record>> = scan(&readers, &query, Arc::new(Cache::new()))?
        .collect()
        .await;

    // rows before the failure stand, the error is last, nothing follows
    assert_eq!(emitted.len(), 3);
    assert!(emitted[0].is_ok());
    assert!(emitted[1].is_ok());
    assert!(matches!(emitted[2], Err(Error::Reader(_))));
    Ok(())
}

#[tokio::test]
async fn sort_stage_merges_across_row_groups() -> Result<()> {
    let reader = two_groups();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::new()
        .field(FieldSpec::new("quantity"))
        .field(FieldSpec::new("name"))
        .sort_by(SortSpec::new("quantity"));

    let records: Vec<Record> = scan(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;
    let quantities: Vec<i64> = records
        .iter()
        .map(|record| record["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, vec![15, 17, 18, 20, 20, 24, 25, 25, 29, 30, 30]);
    Ok(())
}

#[tokio::test]
async fn sorting_by_an_unlisted_field_is_a_spec_error() {
    let reader = two_groups();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::new()
        .field(FieldSpec::new("name"))
        .sort_by(SortSpec::new("quantity"));
    assert!(matches!(
        scan(&readers, &query, Arc::new(Cache::new())),
        Err(Error::Spec(_))
    ));
}
