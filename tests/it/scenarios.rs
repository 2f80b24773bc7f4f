//! End-to-end pruning scenarios over the two-row-group fixture.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::TryStreamExt;
use serde_json::json;

use parquet_sieve::{scan, scan_ranges, Cache, Query, Reader, Result, RowRange, Scalar};

use super::fixture::{two_groups, MemoryReader};

async fn collect_ranges(
    reader: &Arc<MemoryReader>,
    filter: serde_json::Value,
) -> Result<Vec<(usize, u64, u64)>> {
    let query = Query::parse(&json!({ "filter": filter }))?;
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let ranges: Vec<RowRange> = scan_ranges(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;
    for range in &ranges {
        assert!(range.low() <= range.high());
        assert!(range.high() < range.num_rows());
    }
    Ok(ranges
        .iter()
        .map(|range| (range.row_group_no(), range.low(), range.high()))
        .collect())
}

#[tokio::test]
async fn disproven_index_filter_reads_nothing() -> Result<()> {
    let reader = two_groups();
    let ranges = collect_ranges(
        &reader,
        json!([{"path": "quantity", "min": 5, "max": 10, "index": true}]),
    )
    .await?;
    assert_eq!(ranges, vec![]);
    // row-group statistics decided everything
    assert_eq!(reader.counters.offset_reads.load(Ordering::SeqCst), 0);
    assert_eq!(reader.counters.column_reads.load(Ordering::SeqCst), 0);
    assert_eq!(reader.counters.page_reads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn index_filter_narrows_to_matching_pages() -> Result<()> {
    let reader = two_groups();
    let ranges = collect_ranges(
        &reader,
        json!([{"path": "quantity", "min": 5, "max": 18, "index": true}]),
    )
    .await?;
    assert_eq!(ranges, vec![(1, 1, 4)]);
    assert_eq!(reader.counters.page_reads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn index_filter_emits_one_range_per_page_run() -> Result<()> {
    let reader = two_groups();
    let ranges = collect_ranges(
        &reader,
        json!([{"path": "quantity", "min": 18, "max": 20, "index": true}]),
    )
    .await?;
    assert_eq!(ranges, vec![(0, 0, 3), (1, 0, 0), (1, 3, 4)]);
    assert_eq!(reader.counters.page_reads.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn value_filter_scans_only_plausible_pages() -> Result<()> {
    let reader = two_groups();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::parse(&json!({
        "filter": [{"path": "quantity", "value": 25}]
    }))?;
    let ranges: Vec<RowRange> = scan_ranges(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;

    let shape: Vec<_> = ranges
        .iter()
        .map(|range| (range.row_group_no(), range.low(), range.high()))
        .collect();
    assert_eq!(shape, vec![(0, 1, 1), (0, 5, 5)]);

    // matching runs carry their value extrema as tightened bounds
    let quantity = "quantity".into();
    assert_eq!(ranges[0].min_value(&quantity), Some(Scalar::Int64(25)));
    assert_eq!(ranges[0].max_value(&quantity), Some(Scalar::Int64(25)));

    // group 0 reads both pages; of group 1 only the page whose index
    // bounds admit 25
    assert_eq!(reader.counters.page_reads.load(Ordering::SeqCst), 3);
    Ok(())
}

#[tokio::test]
async fn records_follow_matching_ranges() -> Result<()> {
    let reader = two_groups();
    let readers: Vec<Arc<dyn Reader>> = vec![reader.clone()];
    let query = Query::parse(&json!({
        "filter": [{"path": "quantity", "value": 25}],
        "fields": [{"path": "quantity"}, {"path": "name"}],
    }))?;
    let records: Vec<_> = scan(&readers, &query, Arc::new(Cache::new()))?
        .try_collect()
        .await?;

    let expected: Vec<_> = [
        json!({"quantity": 25, "name": "dallas"}),
        json!({"quantity": 25, "name": "miles"}),
    ]
    .iter()
    .map(|v| v.as_object().unwrap().clone())
    .collect();
    assert_eq!(records, expected);
    Ok(())
}

#[tokio::test]
async fn contained_statistics_fast_pass_without_page_reads() -> Result<()> {
    let reader = two_groups();
    let ranges = collect_ranges(
        &reader,
        json!([{"path": "quantity", "min": 0, "max": 100}]),
    )
    .await?;
    assert_eq!(ranges, vec![(0, 0, 5), (1, 0, 4)]);
    assert_eq!(reader.counters.page_reads.load(Ordering::SeqCst), 0);
    Ok(())
}
