//! emjoin CLI: sort or join CSV files under a fixed buffer budget.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use emjoin_core::config::EngineConfig;
use emjoin_exec::{Engine, RunReport};
use emjoin_io::writers::{open_writer, OutputFormat, RecordWriter};
use emjoin_operators::{JoinInputs, JoinType};

#[derive(Parser)]
#[command(name = "emjoin")]
#[command(about = "Bounded-memory joins and external sort over paged tables", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct GlobalArgs {
    /// JSON engine config file (defaults come from EMJOIN_* variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Buffer budget B in pages (overrides config)
    #[arg(long, global = true)]
    buffers: Option<usize>,

    /// Records per page (overrides config)
    #[arg(long, global = true)]
    records_per_page: Option<usize>,

    /// Directory for table and run pages (overrides config)
    #[arg(long, global = true)]
    spill_dir: Option<String>,

    /// Storage URI, e.g. file:///tmp/emjoin or memory://
    #[arg(long, global = true)]
    spill_uri: Option<String>,

    /// Page codec: none, zstd or lz4
    #[arg(long, global = true)]
    codec: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print the run report as JSON on stderr
    #[arg(long, global = true)]
    report: bool,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: csv or jsonl
    #[arg(long, default_value = "csv")]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort a CSV file by one column
    Sort {
        #[arg(short, long)]
        input: PathBuf,

        /// Column to sort by
        #[arg(long)]
        by: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Equi-join two CSV files
    Join {
        #[arg(long)]
        left: PathBuf,

        #[arg(long)]
        right: PathBuf,

        #[arg(long)]
        left_on: String,

        #[arg(long)]
        right_on: String,

        /// bnlj, pnlj or smj
        #[arg(long, default_value = "smj")]
        strategy: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Show output schema and page footprint of each join strategy
    Explain {
        #[arg(long)]
        left: PathBuf,

        #[arg(long)]
        right: PathBuf,

        #[arg(long)]
        left_on: String,

        #[arg(long)]
        right_on: String,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(cli.global.log_level.to_lowercase())
            }),
        )
        .try_init()
        .ok();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&cli.global)?;
    let engine = Engine::new(config)?;

    match cli.command {
        Commands::Sort { input, by, out } => {
            load(&engine, "input", &input)?;
            let result = sort_into(&engine, "input", &by, &out);
            engine.drop_table("input")?;
            finish(&cli.global, result?)
        }
        Commands::Join {
            left,
            right,
            left_on,
            right_on,
            strategy,
            out,
        } => {
            let join_type: JoinType = strategy.parse()?;
            load(&engine, "left", &left)?;
            load(&engine, "right", &right)?;
            let inputs = JoinInputs::new("left", "right", left_on, right_on);
            let result = join_into(&engine, join_type, inputs, &out);
            engine.drop_table("left")?;
            engine.drop_table("right")?;
            finish(&cli.global, result?)
        }
        Commands::Explain {
            left,
            right,
            left_on,
            right_on,
        } => {
            load(&engine, "left", &left)?;
            load(&engine, "right", &right)?;
            let inputs = JoinInputs::new("left", "right", left_on, right_on);
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "Buffer budget: {} pages", engine.config().num_buffers)?;
            for join_type in JoinType::ALL {
                let plan = engine.join_operator(join_type, inputs.clone())?.plan()?;
                writeln!(
                    stdout,
                    "{:<5} footprint {} pages ({} fixed + {} block)",
                    join_type.short_name(),
                    plan.footprint.total_pages(),
                    plan.footprint.fixed_pages,
                    plan.footprint.block_pages
                )?;
            }
            let plan = engine.join_operator(JoinType::SortMerge, inputs)?.plan()?;
            let columns: Vec<&str> = plan
                .output_schema
                .fields
                .iter()
                .map(|f| f.name.as_str())
                .collect();
            writeln!(stdout, "Output columns: {}", columns.join(", "))?;
            engine.drop_table("left")?;
            engine.drop_table("right")?;
            Ok(())
        }
    }
}

fn sort_into(
    engine: &Engine,
    table: &str,
    column: &str,
    out: &OutputArgs,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    let schema = engine.store().schema(table)?;
    let mut sink = open_sink(out, &schema)?;
    Ok(engine.run_sort(table, column, sink.as_mut())?)
}

fn join_into(
    engine: &Engine,
    join_type: JoinType,
    inputs: JoinInputs,
    out: &OutputArgs,
) -> Result<RunReport, Box<dyn std::error::Error>> {
    let plan = engine.join_operator(join_type, inputs.clone())?.plan()?;
    let mut sink = open_sink(out, &plan.output_schema)?;
    Ok(engine.run_join(join_type, inputs, sink.as_mut())?)
}

/// File config (or environment), then command-line overrides.
fn build_config(args: &GlobalArgs) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_str(&fs::read_to_string(path)?)?,
        None => EngineConfig::from_env(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(cfg: &mut EngineConfig, args: &GlobalArgs) {
    if let Some(b) = args.buffers {
        cfg.num_buffers = b;
    }
    if let Some(n) = args.records_per_page {
        cfg.records_per_page = n;
    }
    if let Some(dir) = &args.spill_dir {
        cfg.spill_dir = dir.clone();
    }
    if let Some(uri) = &args.spill_uri {
        cfg.spill_uri = Some(uri.clone());
    }
    if let Some(codec) = &args.codec {
        cfg.page_codec = codec.clone();
    }
}

fn load(engine: &Engine, table: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = engine.load_csv(table, path)?;
    tracing::info!(
        table,
        path = %path.display(),
        records = loaded.records,
        pages = loaded.pages,
        "loaded input"
    );
    Ok(())
}

fn open_sink(
    out: &OutputArgs,
    schema: &emjoin_core::schema::Schema,
) -> Result<Box<dyn RecordWriter>, Box<dyn std::error::Error>> {
    let format: OutputFormat = out.format.parse()?;
    let writer = match &out.output {
        Some(path) => open_writer(format, schema, File::create(path)?)?,
        None => open_writer(format, schema, io::stdout())?,
    };
    Ok(writer)
}

fn finish(args: &GlobalArgs, report: RunReport) -> Result<(), Box<dyn std::error::Error>> {
    if args.report {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!(
            "✓ {} records in {}ms (peak {} of {} pages)",
            report.output_records,
            report.elapsed_ms(),
            report.peak_pages,
            report.num_buffers
        );
    }
    Ok(())
}
