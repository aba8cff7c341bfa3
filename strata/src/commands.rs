use std::io;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use strata_scan::{GetTable, Operator, ScanType, TableScan, TableWrapper};
use strata_storage::{
    Catalog,
    ColumnDefinition,
    Compressor,
    CompressorOptions,
    DataType,
    PosList,
    Segment,
    Table,
    TableOptions,
    Value,
};
use tracing::info;

const BENCH_TABLE: &str = "bench";
const LABEL_CARDINALITY: u64 = 16;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a synthetic table, then scan it before and after compression.
    Bench {
        #[arg(long, env = "STRATA_BENCH_ROWS", default_value_t = 1_000_000)]
        /// The number of rows to generate.
        rows: u64,
        #[arg(long, env = "STRATA_BENCH_CHUNK_SIZE", default_value_t = 65_535)]
        /// The maximum number of rows per chunk.
        chunk_size: u32,
        #[arg(
            long,
            env = "STRATA_BENCH_DISTINCT",
            default_value_t = 1_000,
            value_parser = clap::value_parser!(u32).range(1..=i32::MAX as i64)
        )]
        /// The number of distinct values in the scanned `bucket` column.
        ///
        /// Buckets are stored in an `int` column, so at most `2147483647`.
        distinct: u32,
        #[arg(long, env = "STRATA_BENCH_THREADS", default_value_t = 4)]
        /// The number of threads used to compress the table.
        threads: usize,
        #[arg(long, default_value = "<")]
        /// The comparison to scan with, one of `=`, `!=`, `<`, `<=`, `>` or `>=`.
        scan_type: ScanType,
        #[arg(long, default_value_t = 500, allow_negative_numbers = true)]
        /// The literal the `bucket` column is compared with.
        literal: i32,
    },
}

impl Commands {
    /// Logs the parameters of the selected command.
    pub fn display_startup_message(&self) {
        match self {
            Commands::Bench {
                rows,
                chunk_size,
                distinct,
                threads,
                scan_type,
                literal,
            } => {
                info!(
                    rows,
                    chunk_size,
                    distinct,
                    threads,
                    predicate = %format!("bucket {scan_type} {literal}"),
                    "Starting benchmark",
                );
            },
        }
    }

    /// Executes the command
    pub fn execute(self) -> Result<()> {
        match self {
            Commands::Bench {
                rows,
                chunk_size,
                distinct,
                threads,
                scan_type,
                literal,
            } => run_bench(rows, chunk_size, distinct, threads, scan_type, literal),
        }
    }
}

fn run_bench(
    rows: u64,
    chunk_size: u32,
    distinct: u32,
    threads: usize,
    scan_type: ScanType,
    literal: i32,
) -> Result<()> {
    let catalog = Arc::new(Catalog::new());

    let start = Instant::now();
    let table = generate_table(rows, chunk_size, distinct).context("Generate table")?;
    info!(
        rows = table.row_count(),
        chunks = table.chunk_count(),
        bytes = table.estimated_memory_usage(),
        elapsed = ?start.elapsed(),
        "Generated table",
    );
    catalog
        .add_table(BENCH_TABLE, table.clone())
        .context("Register table")?;

    let bucket = table.column_id_by_name("bucket")?;
    let scan = TableScan::new(
        Arc::new(GetTable::new(catalog.clone(), BENCH_TABLE)),
        bucket,
        scan_type,
        literal,
    );

    let start = Instant::now();
    let plain = scan.execute().context("Scan uncompressed table")?;
    info!(matches = plain.row_count(), elapsed = ?start.elapsed(), "Scanned uncompressed table");

    let options = CompressorOptions::builder()
        .num_threads(threads)
        .include_partial_chunk(true)
        .build();
    let start = Instant::now();
    let summary = Compressor::new(options)
        .compress_table(&table)
        .context("Compress table")?;
    info!(
        chunks_compressed = summary.chunks_compressed,
        bytes_before = summary.bytes_before,
        bytes_after = summary.bytes_after,
        elapsed = ?start.elapsed(),
        "Compressed table",
    );

    let start = Instant::now();
    let compressed = scan.execute().context("Scan compressed table")?;
    info!(matches = compressed.row_count(), elapsed = ?start.elapsed(), "Scanned compressed table");

    if result_positions(&plain)? != result_positions(&compressed)? {
        bail!("Scans of the uncompressed and compressed table returned different rows");
    }

    let label = table.column_id_by_name("label")?;
    let composed = TableScan::new(
        Arc::new(TableWrapper::new(compressed)),
        label,
        ScanType::Equals,
        Value::from(label_for(0)),
    );
    let start = Instant::now();
    let result = composed.execute().context("Scan scan result")?;
    info!(matches = result.row_count(), elapsed = ?start.elapsed(), "Scanned scan result");

    catalog
        .print(&mut io::stdout().lock())
        .context("Print catalog")?;

    Ok(())
}

fn generate_table(rows: u64, chunk_size: u32, distinct: u32) -> Result<Arc<Table>> {
    let table = Table::new(TableOptions::builder().max_chunk_size(chunk_size).build());
    for column in [
        ColumnDefinition::new("id", DataType::Long),
        ColumnDefinition::new("bucket", DataType::Int),
        ColumnDefinition::new("label", DataType::String),
    ] {
        table.add_column(column.name, column.data_type)?;
    }

    for id in 0..rows {
        let bucket = scramble(id) % distinct as u64;
        table.append(vec![
            Value::Long(id as i64),
            Value::Int(bucket as i32),
            Value::String(label_for(bucket % LABEL_CARDINALITY)),
        ])?;
    }

    Ok(Arc::new(table))
}

fn label_for(n: u64) -> String {
    format!("label-{n}")
}

/// Spreads sequential IDs over the 64 bit range.
fn scramble(id: u64) -> u64 {
    let mut z = id.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn result_positions(table: &Table) -> Result<Arc<PosList>> {
    let chunk = table.get_chunk(0)?;
    match chunk.segment(0)? {
        Segment::Reference(segment) => Ok(segment.pos_list().clone()),
        other => bail!("Expected a reference segment, got a {} segment", other.kind()),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(subcommand)]
        command: Commands,
    }

    #[rstest::rstest]
    #[case("1", true)]
    #[case("2147483647", true)]
    #[case("0", false)]
    #[case("2147483648", false)]
    #[case("4294967295", false)]
    fn test_distinct_range(#[case] distinct: &str, #[case] is_ok: bool) {
        let parsed = Cli::try_parse_from(["strata", "bench", "--distinct", distinct]);
        assert_eq!(parsed.is_ok(), is_ok, "distinct = {distinct}");
    }

    #[test]
    fn test_generate_table_buckets_fit_column() {
        let table = generate_table(200, 16, 7).unwrap();
        assert_eq!(table.row_count(), 200);
        assert_eq!(table.chunk_count(), 13);

        for chunk in table.chunks() {
            let segment = chunk.segment(1).unwrap();
            for offset in 0..segment.len() {
                let Value::Int(bucket) = segment.value(offset).unwrap() else {
                    panic!("bucket column is not an int column");
                };
                assert!((0..7).contains(&bucket));
            }
        }
    }
}
