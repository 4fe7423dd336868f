use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pcat_analysis::PcatConfig;
use pcat_engine::{PlanarEngine, PolygonLayer};
use pcat_layer::Layer;

mod io;

#[derive(Parser)]
#[command(name = "pcat")]
#[command(about = "Score candidate parcels by their adjacency to protected land", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the analysis parcels and write the annotated layer
    Run(RunArgs),

    /// Print the default configuration as TOML
    #[command(name = "default-config")]
    DefaultConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Protected (context) land layer
    #[arg(long)]
    context: PathBuf,

    /// Candidate parcel layer
    #[arg(long)]
    analysis: PathBuf,

    /// Land excluded from every calculation
    #[arg(long)]
    exclusion: Option<PathBuf>,

    /// TOML configuration; defaults are used for anything it omits
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for intermediate layers (overrides the config file)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Where to write the scored parcel layer
    #[arg(long, short = 'o')]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::DefaultConfig => {
            print!("{}", PcatConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PcatConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PcatConfig::default(),
    };
    if args.workspace.is_some() {
        config.workspace = args.workspace;
    }

    let engine = PlanarEngine::new(config.engine.clone())?;
    let context = io::read_layer(&args.context)?;
    let analysis = io::read_layer(&args.analysis)?;
    let exclusion: PolygonLayer = match &args.exclusion {
        Some(path) => io::read_layer(path)?,
        None => Layer::from_geometries("exclusion", Vec::new()),
    };

    let scored = pcat_analysis::run(&engine, &context, &analysis, &exclusion, &config)?;
    for timing in &scored.summary.timings {
        log::info!(
            "{}: {:.2}s",
            timing.stage,
            timing.elapsed.as_secs_f64()
        );
    }

    io::write_layer(&args.output, &scored.layer)?;
    log::info!("wrote {}", args.output.display());

    let summary = serde_json::json!({
        "output": args.output.display().to_string(),
        "parcels": scored.summary.parcels,
        "corridors": scored.summary.corridors,
    });
    println!("{summary}");
    Ok(())
}
