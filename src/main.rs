//! SliceKit CLI
//!
//! Slices models with the configured engine and manages slicing profiles.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use slicekit::{
    check_health, default_config_path, init_logging, ExportFormat, LogFormat, PlateSelector,
    ProfileCategory, ProfileStore, SliceRequest, SliceSettings, SlicerConfig, SlicingPipeline,
    BUILD_DATE, VERSION,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogStyle {
    /// Human-readable output
    Pretty,
    /// One JSON object per line
    Json,
}

impl From<LogStyle> for LogFormat {
    fn from(style: LogStyle) -> Self {
        match style {
            LogStyle::Pretty => LogFormat::Pretty,
            LogStyle::Json => LogFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(name = "slicekit")]
#[command(version, about = "Slice 3D models with an external slicer engine", long_about = None)]
struct Cli {
    /// Configuration file (JSON or TOML); environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogStyle,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Slice a model and write the result
    Slice(SliceArgs),

    /// Manage printer, preset and filament profiles
    #[command(subcommand)]
    Profiles(ProfilesCommand),

    /// Check that the engine and data directory are usable
    Health,

    /// Show version and build information
    Info,
}

#[derive(clap::Args)]
struct SliceArgs {
    /// Model file (STL, 3MF, STEP, ...)
    model: PathBuf,

    /// Printer profile name
    #[arg(long)]
    printer: Option<String>,

    /// Process preset profile name
    #[arg(long)]
    preset: Option<String>,

    /// Filament profile name
    #[arg(long)]
    filament: Option<String>,

    /// Build plate type, e.g. "Textured PEI Plate"
    #[arg(long)]
    bed_type: Option<String>,

    /// Plate to slice: a 1-based index or "all"
    #[arg(long)]
    plate: Option<PlateSelector>,

    /// Auto-arrange objects (engine default when omitted)
    #[arg(long)]
    arrange: Option<bool>,

    /// Auto-orient objects (engine default when omitted)
    #[arg(long)]
    orient: Option<bool>,

    /// Allow several filaments on one plate
    #[arg(long)]
    multicolor_one_plate: bool,

    /// Output format: gcode or 3mf
    #[arg(long, default_value = "gcode")]
    export: ExportFormat,

    /// Where to write the result ("-" for stdout); defaults to the result's own name
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Skip print time and filament usage extraction
    #[arg(long)]
    no_metadata: bool,
}

#[derive(Subcommand)]
enum ProfilesCommand {
    /// List profile names in a category
    List {
        /// printers, presets or filaments
        category: ProfileCategory,
    },
    /// Print a profile document
    Show {
        category: ProfileCategory,
        name: String,
    },
    /// Store a profile from a JSON file
    Add {
        category: ProfileCategory,
        name: String,
        /// JSON profile document
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format.into()) {
        eprintln!("Error: Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    // Dropping the command on Ctrl-C kills the engine and removes its workspace
    let result = tokio::select! {
        result = run(cli) => Some(result),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };

    match result {
        Some(Ok(code)) => code,
        Some(Err(e)) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
        None => {
            eprintln!("Interrupted");
            ExitCode::from(130)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Slice(args) => slice(&config, args).await,
        Command::Profiles(command) => profiles(&config, command),
        Command::Health => health(&config).await,
        Command::Info => {
            println!("slicekit {} (built {})", VERSION, BUILD_DATE);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// File settings, if any, overridden by the environment
fn load_config(path: Option<&Path>) -> anyhow::Result<SlicerConfig> {
    let mut config = match path {
        Some(path) => SlicerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => SlicerConfig::load_from_file(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => SlicerConfig::default(),
        },
    };
    config
        .merge_env()
        .context("Invalid configuration in environment")?;
    Ok(config)
}

async fn slice(config: &SlicerConfig, args: SliceArgs) -> anyhow::Result<ExitCode> {
    let pipeline = SlicingPipeline::new(config)?;

    let model = std::fs::read(&args.model)
        .with_context(|| format!("Failed to read model {}", args.model.display()))?;
    let file_name = args
        .model
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let settings = SliceSettings {
        printer: args.printer,
        preset: args.preset,
        filament: args.filament,
        bed_type: args.bed_type,
        plate: args.plate.unwrap_or_default(),
        arrange: args.arrange,
        orient: args.orient,
        multicolor_one_plate: args.multicolor_one_plate,
        export_format: args.export,
    };

    let request = SliceRequest::new(file_name, model, settings).with_metadata(!args.no_metadata);
    let job = pipeline.slice(request).await?;
    let metadata = job.metadata().copied();
    let to_stdout = args.output.as_deref() == Some(Path::new("-"));

    let output = match args.output {
        Some(path) if !to_stdout => path,
        _ => PathBuf::from(job.package()?.file_name()),
    };

    let written = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        if to_stdout {
            let stdout = io::stdout();
            let name = job.deliver_to(stdout.lock())?;
            Ok(name)
        } else {
            let file = File::create(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            job.deliver_to(BufWriter::new(file))?;
            Ok(output.display().to_string())
        }
    })
    .await
    .context("Result writer task failed")??;

    // Keep stdout clean when it carries the result itself
    let mut report: Box<dyn Write> = if to_stdout {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    };
    writeln!(report, "Wrote {}", written)?;
    if let Some(metadata) = metadata {
        for (header, value) in metadata.header_pairs() {
            writeln!(report, "{}: {}", header, value)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn profiles(config: &SlicerConfig, command: ProfilesCommand) -> anyhow::Result<ExitCode> {
    let store = ProfileStore::new(&config.data_path);

    match command {
        ProfilesCommand::List { category } => {
            for name in store.list(category)? {
                println!("{}", name);
            }
        }
        ProfilesCommand::Show { category, name } => {
            let document = store.get(category, &name)?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        ProfilesCommand::Add {
            category,
            name,
            file,
        } => {
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let path = store.save_bytes(category, &name, &bytes)?;
            println!("Saved {} profile '{}' to {}", category, name, path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn health(config: &SlicerConfig) -> anyhow::Result<ExitCode> {
    let report = check_health(config).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.is_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
