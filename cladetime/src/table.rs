//! Lazy tabular handles
//!
//! A `LazyTable` is a DataFusion `DataFrame` plus the engine that can run
//! it. Building, selecting and joining only grow a logical plan; rows are
//! read when `count`, `collect`, `string_values` or `write_tsv` is called.

use cladetime_core::{CladetimeError, CladetimeResult};
use datafusion::arrow::array::{ArrayRef, StringArray};
use datafusion::arrow::compute::cast;
use datafusion::arrow::csv::WriterBuilder;
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::cast::as_string_array;
use datafusion::datasource::MemTable;
use datafusion::prelude::{CsvReadOptions, DataFrame, SessionConfig, SessionContext};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// SQL identifier quoting; keeps mixed-case names like `seqName` intact
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL string literal quoting
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A DataFusion session driven on a private current-thread runtime
pub struct TableEngine {
    runtime: Runtime,
    ctx: SessionContext,
    next_id: AtomicU64,
}

impl TableEngine {
    pub fn new() -> CladetimeResult<Arc<Self>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let config = SessionConfig::new().with_target_partitions(1);
        Ok(Arc::new(Self {
            runtime,
            ctx: SessionContext::new_with_config(config),
            next_id: AtomicU64::new(0),
        }))
    }

    fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Plan a SQL query over `tables`. Each table is registered under a
    /// fresh name for the duration of planning only; `build` receives the
    /// quoted names in the same order.
    pub fn query<F>(self: &Arc<Self>, tables: &[&LazyTable], build: F) -> CladetimeResult<LazyTable>
    where
        F: FnOnce(&[String]) -> String,
    {
        let mut names = Vec::with_capacity(tables.len());
        let mut registered = Ok(());
        for table in tables {
            let name = format!("t{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            registered = self
                .ctx
                .register_table(name.as_str(), table.df.clone().into_view())
                .map(|_| ());
            if registered.is_err() {
                break;
            }
            names.push(name);
        }

        let planned = registered.map_err(CladetimeError::table).and_then(|_| {
            let quoted: Vec<String> = names.iter().map(|n| quote_ident(n)).collect();
            let query = build(&quoted);
            tracing::trace!(query = %query, "Planning query");
            self.block_on(self.ctx.sql(&query)).map_err(CladetimeError::table)
        });

        // The plan holds its own handles to the sources
        for name in &names {
            if let Err(e) = self.ctx.deregister_table(name.as_str()) {
                tracing::warn!(table = %name, error = %e, "Failed to deregister table");
            }
        }
        Ok(LazyTable::new(self.clone(), planned?))
    }

    /// Names currently held by the session catalog
    pub fn registered_tables(&self) -> Vec<String> {
        self.ctx
            .catalog("datafusion")
            .and_then(|catalog| catalog.schema("public"))
            .map(|schema| schema.table_names())
            .unwrap_or_default()
    }

    /// Scan a tab-separated file with a header row. Every column is read as
    /// text so mixed-type columns never fail inference.
    pub fn read_tsv(self: &Arc<Self>, path: &Path) -> CladetimeResult<LazyTable> {
        let header = read_header(path)?;
        let schema = Schema::new(
            header
                .iter()
                .map(|name| Field::new(name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        );
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let location = path.to_string_lossy().into_owned();

        let options = CsvReadOptions::new()
            .has_header(true)
            .delimiter(b'\t')
            .schema(&schema)
            .file_extension(&extension);
        let df = self
            .block_on(self.ctx.read_csv(location, options))
            .map_err(CladetimeError::table)?;
        Ok(LazyTable::new(self.clone(), df))
    }

    /// Read a tab-separated file fully into memory
    pub fn load_tsv(self: &Arc<Self>, path: &Path) -> CladetimeResult<LazyTable> {
        self.read_tsv(path)?.materialize()
    }

    /// In-memory table of nullable string columns
    pub fn from_string_columns(
        self: &Arc<Self>,
        columns: &[(&str, Vec<Option<&str>>)],
    ) -> CladetimeResult<LazyTable> {
        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(name, _)| Field::new(*name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ));
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|(_, values)| Arc::new(StringArray::from(values.clone())) as ArrayRef)
            .collect();
        let batch = RecordBatch::try_new(schema.clone(), arrays).map_err(CladetimeError::table)?;
        self.from_batches(schema, vec![batch])
    }

    /// A table with no columns and no rows
    pub fn empty(self: &Arc<Self>) -> CladetimeResult<LazyTable> {
        self.from_batches(Arc::new(Schema::empty()), vec![])
    }

    fn from_batches(
        self: &Arc<Self>,
        schema: Arc<Schema>,
        batches: Vec<RecordBatch>,
    ) -> CladetimeResult<LazyTable> {
        let table = MemTable::try_new(schema, vec![batches]).map_err(CladetimeError::table)?;
        let df = self.ctx.read_table(Arc::new(table)).map_err(CladetimeError::table)?;
        Ok(LazyTable::new(self.clone(), df))
    }
}

impl fmt::Debug for TableEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableEngine")
            .field("registered", &self.registered_tables())
            .finish()
    }
}

fn read_header(path: &Path) -> CladetimeResult<Vec<String>> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    let line = line.trim_end_matches(['\n', '\r']);
    if line.is_empty() {
        return Err(CladetimeError::InvalidInput(format!(
            "{} has no header row",
            path.display()
        )));
    }
    Ok(line.split('\t').map(str::to_string).collect())
}

#[derive(Clone)]
pub struct LazyTable {
    engine: Arc<TableEngine>,
    df: DataFrame,
}

impl LazyTable {
    fn new(engine: Arc<TableEngine>, df: DataFrame) -> Self {
        Self { engine, df }
    }

    pub fn engine(&self) -> &Arc<TableEngine> {
        &self.engine
    }

    pub fn columns(&self) -> Vec<String> {
        self.df
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.schema().fields().iter().any(|f| f.name() == name)
    }

    pub fn select_columns(&self, columns: &[&str]) -> CladetimeResult<LazyTable> {
        if let Some(missing) = columns.iter().find(|c| !self.has_column(c)) {
            return Err(CladetimeError::MissingColumn(missing.to_string()));
        }
        let df = self
            .df
            .clone()
            .select_columns(columns)
            .map_err(CladetimeError::table)?;
        Ok(LazyTable::new(self.engine.clone(), df))
    }

    pub fn count(&self) -> CladetimeResult<usize> {
        self.engine
            .block_on(self.df.clone().count())
            .map_err(CladetimeError::table)
    }

    pub fn is_empty(&self) -> CladetimeResult<bool> {
        Ok(self.count()? == 0)
    }

    pub fn collect(&self) -> CladetimeResult<Vec<RecordBatch>> {
        self.engine
            .block_on(self.df.clone().collect())
            .map_err(CladetimeError::table)
    }

    /// Run the plan once and keep the rows in memory
    pub fn materialize(&self) -> CladetimeResult<LazyTable> {
        let schema = Arc::new(self.df.schema().as_arrow().clone());
        let batches = self.collect()?;
        self.engine.from_batches(schema, batches)
    }

    /// Every value of `column` rendered as text, in row order
    pub fn string_values(&self, column: &str) -> CladetimeResult<Vec<Option<String>>> {
        let selected = self.select_columns(&[column])?;
        let mut values = Vec::new();
        for batch in selected.collect()? {
            let array = cast(batch.column(0), &DataType::Utf8).map_err(CladetimeError::table)?;
            let strings: &StringArray = as_string_array(array.as_ref()).map_err(CladetimeError::table)?;
            values.extend(strings.iter().map(|v| v.map(str::to_string)));
        }
        Ok(values)
    }

    /// Write all rows as a tab-separated file with a header
    pub fn write_tsv(&self, path: &Path) -> CladetimeResult<usize> {
        let batches = self.collect()?;
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(path)?);

        if rows == 0 {
            writeln!(out, "{}", self.columns().join("\t"))?;
        } else {
            let mut writer = WriterBuilder::new()
                .with_delimiter(b'\t')
                .with_header(true)
                .build(&mut out);
            for batch in batches.iter().filter(|b| b.num_rows() > 0) {
                writer.write(batch).map_err(CladetimeError::table)?;
            }
        }
        out.flush()?;
        Ok(rows)
    }
}

impl fmt::Debug for LazyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyTable")
            .field("columns", &self.columns())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(engine: &Arc<TableEngine>) -> LazyTable {
        engine
            .from_string_columns(&[
                ("strain", vec![Some("X/1"), Some("X/2"), Some("X/3")]),
                ("seqName", vec![Some("a"), None, Some("c")]),
            ])
            .unwrap()
    }

    #[test]
    fn test_columns_and_count() {
        let engine = TableEngine::new().unwrap();
        let table = sample(&engine);
        assert_eq!(table.columns(), vec!["strain", "seqName"]);
        assert_eq!(table.count().unwrap(), 3);
        assert!(!table.is_empty().unwrap());
    }

    #[test]
    fn test_empty_table() {
        let engine = TableEngine::new().unwrap();
        let table = engine.empty().unwrap();
        assert!(table.columns().is_empty());
        assert!(table.is_empty().unwrap());
    }

    #[test]
    fn test_select_missing_column() {
        let engine = TableEngine::new().unwrap();
        let err = sample(&engine).select_columns(&["location"]).unwrap_err();
        assert!(matches!(err, CladetimeError::MissingColumn(ref c) if c == "location"));
    }

    #[test]
    fn test_query_keeps_mixed_case_columns() {
        let engine = TableEngine::new().unwrap();
        let table = engine
            .query(&[&sample(&engine)], |names| {
                format!(
                    "SELECT {} FROM {} WHERE {} IS NOT NULL ORDER BY 1",
                    quote_ident("seqName"),
                    names[0],
                    quote_ident("seqName")
                )
            })
            .unwrap();
        assert_eq!(
            table.string_values("seqName").unwrap(),
            vec![Some("a".to_string()), Some("c".to_string())]
        );
    }

    #[test]
    fn test_query_releases_registrations() {
        let engine = TableEngine::new().unwrap();
        let left = sample(&engine);
        let right = sample(&engine);
        let joined = engine
            .query(&[&left, &right], |names| {
                format!(
                    "SELECT l.\"strain\" FROM {} l JOIN {} r ON l.\"strain\" = r.\"strain\"",
                    names[0], names[1]
                )
            })
            .unwrap();

        assert!(engine.registered_tables().is_empty());
        assert_eq!(joined.count().unwrap(), 3);
    }

    #[test]
    fn test_failed_query_releases_registrations() {
        let engine = TableEngine::new().unwrap();
        let err = engine
            .query(&[&sample(&engine)], |names| {
                format!("SELECT \"nope\" FROM {}", names[0])
            })
            .unwrap_err();
        assert!(matches!(err, CladetimeError::Table(_)));
        assert!(engine.registered_tables().is_empty());
    }

    #[test]
    fn test_tsv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TableEngine::new().unwrap();
        let path = dir.path().join("out").join("table.tsv");

        assert_eq!(sample(&engine).write_tsv(&path).unwrap(), 3);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("strain\tseqName\n"));

        let reread = engine.read_tsv(&path).unwrap();
        assert_eq!(reread.columns(), vec!["strain", "seqName"]);
        assert_eq!(reread.count().unwrap(), 3);
    }

    #[test]
    fn test_write_empty_tsv_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TableEngine::new().unwrap();
        let table = engine
            .from_string_columns(&[("strain", vec![]), ("date", vec![])])
            .unwrap();
        let path = dir.path().join("empty.tsv");

        assert_eq!(table.write_tsv(&path).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "strain\tdate\n");
    }

    #[test]
    fn test_quote_helpers() {
        assert_eq!(quote_ident("seqName"), "\"seqName\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("Homo sapiens"), "'Homo sapiens'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
    }
}
