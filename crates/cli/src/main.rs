use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use treezoom_core::input::load_items;
use treezoom_core::{export, EngineConfig, Padding, Size, TreemapEngine, ValueRange};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "treezoom-cli", about = "Treemap layout report generator")]
struct Args {
    /// Items file (.json or .csv)
    input: PathBuf,
    #[arg(long, default_value_t = 800.0)]
    width: f64,
    #[arg(long, default_value_t = 600.0)]
    height: f64,
    /// Engine config (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides the configured outer padding
    #[arg(long)]
    padding: Option<f64>,
    /// Lower bound of the value filter
    #[arg(long)]
    min: Option<f64>,
    /// Upper bound of the value filter
    #[arg(long)]
    max: Option<f64>,
    /// Slash separated group path to zoom into, e.g. `north/oslo`
    #[arg(short, long)]
    zoom: Option<String>,
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,
    /// Output path; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> treezoom_core::Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(outer) = args.padding {
        config.padding = Padding {
            outer,
            ..config.padding
        };
        config.validate()?;
    }

    let items = load_items(&args.input)?;
    let mut engine = TreemapEngine::new(config, ());
    engine.set_container_size(Size::new(args.width, args.height));
    engine.set_items(items);

    if args.min.is_some() || args.max.is_some() {
        if let Some(full) = engine.full_range() {
            let range = ValueRange::new(args.min.unwrap_or(full.min), args.max.unwrap_or(full.max));
            engine.set_value_range(range);
        }
    }
    if let Some(path) = &args.zoom {
        let path: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if !engine.zoom_to_path(&path) {
            tracing::warn!(?path, "could not zoom, reporting the root view");
        }
    }
    if engine.is_empty() {
        tracing::warn!("no items left to lay out");
    }

    let mut out: Box<dyn std::io::Write> = match &args.output {
        Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    match args.format {
        Format::Json => {
            let json = export::to_json(engine.cells(), args.width, args.height);
            serde_json::to_writer_pretty(&mut out, &json)?;
            writeln!(out)?;
        }
        Format::Csv => export::to_csv(engine.cells(), &mut out)?,
    }
    out.flush()?;
    eprintln!(
        "{} cells, total {}",
        engine.cells().count(),
        engine.tree().total()
    );
    Ok(())
}
