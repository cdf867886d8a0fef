//! stripestore CLI
//!
//! Loads comma-separated rows into a table and inspects its footer and
//! skip-list statistics.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use stripestore::{
    ColumnType, CompressionType, Config, FileBlockStore, Schema, StripeError, TableReader, Value,
    WriteSession,
};
use tracing_subscriber::{fmt, EnvFilter};

/// stripestore CLI
#[derive(Parser, Debug)]
#[command(name = "stripestore-cli")]
#[command(about = "Columnar stripe store loader and inspector")]
#[command(version)]
struct Args {
    /// Table directory
    #[arg(short, long, default_value = "./stripestore_data")]
    data_dir: PathBuf,

    /// Footer block size in bytes
    #[arg(long, default_value = "8192")]
    footer_block_size: usize,

    /// Column types, e.g. int4,text,bytes16
    #[arg(short, long, value_delimiter = ',', required = true)]
    columns: Vec<ColumnType>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append rows from a CSV file (empty field = NULL)
    Load {
        /// Input file, one row per line
        input: PathBuf,

        /// Rows per stripe
        #[arg(long, default_value = "150000")]
        stripe_rows: u64,

        /// Rows per block
        #[arg(long, default_value = "10000")]
        block_rows: u32,

        /// Block compression: none or lz4
        #[arg(long, default_value = "none")]
        compression: CompressionType,
    },

    /// Print the footer and per-block statistics
    Inspect,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stripestore=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    tracing::info!("stripestore CLI v{}", stripestore::VERSION);
    tracing::info!("Data directory: {}", args.data_dir.display());

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), StripeError> {
    let store = Arc::new(FileBlockStore::open(&args.data_dir, args.footer_block_size)?);
    let schema = Schema::from_types(&args.columns);

    match args.command {
        Commands::Load {
            input,
            stripe_rows,
            block_rows,
            compression,
        } => {
            let config = Config::builder()
                .data_dir(&args.data_dir)
                .footer_block_size(args.footer_block_size)
                .stripe_max_row_count(stripe_rows)
                .block_row_count(block_rows)
                .compression(compression)
                .build();

            let mut session = WriteSession::begin(store, schema, &config)?;
            let reader = BufReader::new(File::open(&input)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let values = parse_row(&args.columns, &line).map_err(|e| {
                    StripeError::InvalidValue(format!("line {}: {}", line_no + 1, e))
                })?;
                session.write_values(&values)?;
            }

            let summary = session.finish()?;
            tracing::info!(
                rows = summary.rows_written,
                stripes = summary.stripes_written,
                total_stripes = summary.total_stripes,
                "load complete"
            );
        }
        Commands::Inspect => inspect(store, schema, &args.columns)?,
    }

    Ok(())
}

fn inspect(
    store: Arc<FileBlockStore>,
    schema: Schema,
    types: &[ColumnType],
) -> Result<(), StripeError> {
    let reader = TableReader::open(store, schema)?;

    println!(
        "block_row_count={} stripes={}",
        reader.block_row_count(),
        reader.stripes().len()
    );

    for (stripe_no, stripe) in reader.stripes().iter().enumerate() {
        println!(
            "stripe {}: offset={} skip_list={} data={} footer={}",
            stripe_no, stripe.file_offset, stripe.skip_list_length, stripe.data_length, stripe.footer_length
        );

        for (column, ty) in types.iter().enumerate() {
            for (block, node) in reader.read_skip_list(stripe_no, column)?.iter().enumerate() {
                let range = match (node.min_value(), node.max_value()) {
                    (Some(min), Some(max)) => format!(
                        "[{}, {}]",
                        Value::decode(*ty, min)?,
                        Value::decode(*ty, max)?
                    ),
                    _ => "-".to_string(),
                };
                println!(
                    "  col {} block {}: rows={} range={} exists={}@{} values={}@{} {:?}",
                    column,
                    block,
                    node.row_count,
                    range,
                    node.exists_length,
                    node.exists_offset,
                    node.value_length,
                    node.value_offset,
                    node.compression
                );
            }
        }
    }

    Ok(())
}

fn parse_row(types: &[ColumnType], line: &str) -> Result<Vec<Value>, String> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != types.len() {
        return Err(format!("expected {} fields, got {}", types.len(), fields.len()));
    }

    types
        .iter()
        .zip(fields)
        .map(|(ty, field)| Value::parse(*ty, field.trim()).map_err(|e| e.to_string()))
        .collect()
}
