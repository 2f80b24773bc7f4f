//! An in-memory reader with per-kind fetch counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use parquet_sieve::error::{Error, Result};
use parquet_sieve::indexes::{ColumnIndex, OffsetIndex, PageLocation};
use parquet_sieve::metadata::{ColumnChunkMetaData, ColumnPath, RowGroupMetaData, Statistics};
use parquet_sieve::reader::Reader;
use parquet_sieve::types::Scalar;

pub struct FixtureColumn {
    pub path: &'static str,
    pub page_starts: Vec<u64>,
    pub values: Vec<Scalar>,
    pub mins: Vec<Option<Scalar>>,
    pub maxes: Vec<Option<Scalar>>,
    pub stats: Option<(Scalar, Scalar)>,
}

#[derive(Default)]
pub struct Counters {
    pub offset_reads: AtomicUsize,
    pub column_reads: AtomicUsize,
    pub page_reads: AtomicUsize,
}

pub struct MemoryReader {
    id: String,
    row_groups: Vec<RowGroupMetaData>,
    columns: HashMap<(usize, ColumnPath), FixtureColumn>,
    pub counters: Counters,
}

impl MemoryReader {
    pub fn new(id: &str, groups: Vec<Vec<FixtureColumn>>) -> Self {
        let mut row_groups = Vec::new();
        let mut columns = HashMap::new();
        for (no, group) in groups.into_iter().enumerate() {
            let num_rows = group
                .first()
                .map(|column| column.values.len() as u64)
                .unwrap_or(0);
            let chunks = group
                .iter()
                .map(|column| {
                    assert_eq!(column.values.len() as u64, num_rows);
                    ColumnChunkMetaData::new(
                        ColumnPath::from(column.path),
                        column
                            .stats
                            .clone()
                            .map(|(min, max)| Statistics::new(Some(min), Some(max))),
                    )
                })
                .collect();
            row_groups.push(RowGroupMetaData::new(chunks, num_rows));
            for column in group {
                columns.insert((no, ColumnPath::from(column.path)), column);
            }
        }
        Self {
            id: id.to_string(),
            row_groups,
            columns,
            counters: Counters::default(),
        }
    }

    fn column(&self, row_group: usize, path: &ColumnPath) -> Result<&FixtureColumn> {
        self.columns
            .get(&(row_group, path.clone()))
            .ok_or_else(|| Error::Reader(format!("fixture has no column {}", path)))
    }
}

#[async_trait]
impl Reader for MemoryReader {
    fn id(&self) -> &str {
        &self.id
    }

    fn row_groups(&self) -> &[RowGroupMetaData] {
        &self.row_groups
    }

    async fn read_offset_index(
        &self,
        row_group: usize,
        path: &ColumnPath,
    ) -> Result<OffsetIndex> {
        self.counters.offset_reads.fetch_add(1, Ordering::SeqCst);
        let column = self.column(row_group, path)?;
        Ok(OffsetIndex::new(
            column
                .page_starts
                .iter()
                .copied()
                .map(PageLocation::new)
                .collect(),
        ))
    }

    async fn read_column_index(
        &self,
        row_group: usize,
        path: &ColumnPath,
    ) -> Result<ColumnIndex> {
        self.counters.column_reads.fetch_add(1, Ordering::SeqCst);
        let column = self.column(row_group, path)?;
        Ok(ColumnIndex::new(column.mins.clone(), column.maxes.clone()))
    }

    async fn read_page(
        &self,
        row_group: usize,
        path: &ColumnPath,
        page: usize,
    ) -> Result<Vec<Scalar>> {
        self.counters.page_reads.fetch_add(1, Ordering::SeqCst);
        let column = self.column(row_group, path)?;
        let start = *column
            .page_starts
            .get(page)
            .ok_or_else(|| Error::Reader(format!("no page {} in {}", page, path)))?
            as usize;
        let end = column
            .page_starts
            .get(page + 1)
            .map(|next| *next as usize)
            .unwrap_or(column.values.len());
        Ok(column.values[start..end].to_vec())
    }
}

pub fn ints(values: &[i64]) -> Vec<Scalar> {
    values.iter().copied().map(Scalar::Int64).collect()
}

pub fn strs(values: &[&str]) -> Vec<Scalar> {
    values
        .iter()
        .map(|v| Scalar::Utf8((*v).to_string()))
        .collect()
}

fn int_bounds(values: &[i64]) -> Vec<Option<Scalar>> {
    values.iter().copied().map(|v| Some(Scalar::Int64(v))).collect()
}

fn str_bounds(values: &[&str]) -> Vec<Option<Scalar>> {
    values
        .iter()
        .map(|v| Some(Scalar::Utf8((*v).to_string())))
        .collect()
}

/// The two-row-group layout of the end-to-end scenarios.
///
/// Group 0 (6 rows): `quantity` pages start at [0, 4] with mins [20, 25]
/// and maxes [30, 29]; `name` is a single page. Group 1 (5 rows):
/// `quantity` pages start at [0, 1, 3] with mins [20, 15, 18] and maxes
/// [20, 17, 30]; `name` is a single page.
pub fn two_groups() -> Arc<MemoryReader> {
    Arc::new(MemoryReader::new(
        "two-groups",
        vec![
            vec![
                FixtureColumn {
                    path: "quantity",
                    page_starts: vec![0, 4],
                    values: ints(&[20, 25, 30, 24, 29, 25]),
                    mins: int_bounds(&[20, 25]),
                    maxes: int_bounds(&[30, 29]),
                    stats: Some((Scalar::Int64(20), Scalar::Int64(30))),
                },
                FixtureColumn {
                    path: "name",
                    page_starts: vec![0],
                    values: strs(&["austin", "dallas", "houston", "paris", "tokyo", "miles"]),
                    mins: str_bounds(&["austin"]),
                    maxes: str_bounds(&["tokyo"]),
                    stats: Some((
                        Scalar::Utf8("austin".to_string()),
                        Scalar::Utf8("tokyo".to_string()),
                    )),
                },
            ],
            vec![
                FixtureColumn {
                    path: "quantity",
                    page_starts: vec![0, 1, 3],
                    values: ints(&[20, 15, 17, 18, 30]),
                    mins: int_bounds(&[20, 15, 18]),
                    maxes: int_bounds(&[20, 17, 30]),
                    stats: Some((Scalar::Int64(15), Scalar::Int64(30))),
                },
                FixtureColumn {
                    path: "name",
                    page_starts: vec![0],
                    values: strs(&["amy", "bob", "cat", "dan", "eve"]),
                    mins: str_bounds(&["amy"]),
                    maxes: str_bounds(&["eve"]),
                    stats: Some((
                        Scalar::Utf8("amy".to_string()),
                        Scalar::Utf8("eve".to_string()),
                    )),
                },
            ],
        ],
    ))
}

/// A single group whose `payload` column holds JSON documents.
pub fn with_payload() -> Arc<MemoryReader> {
    Arc::new(MemoryReader::new(
        "with-payload",
        vec![vec![
            FixtureColumn {
                path: "quantity",
                page_starts: vec![0, 2],
                values: ints(&[1, 2, 3, 4]),
                mins: int_bounds(&[1, 3]),
                maxes: int_bounds(&[2, 4]),
                stats: Some((Scalar::Int64(1), Scalar::Int64(4))),
            },
            FixtureColumn {
                path: "payload",
                page_starts: vec![0],
                values: strs(&[
                    r#"{"kind":"a","weight":10}"#,
                    r#"{"kind":"b","weight":20}"#,
                    r#"{"kind":"c","weight":30}"#,
                    r#"{"kind":"d","weight":40}"#,
                ]),
                mins: vec![None],
                maxes: vec![None],
                stats: None,
            },
        ]],
    ))
}
