// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::io::Write;
use std::path::{Path, PathBuf};

use vosync::app_config::{self, Config};
use vosync::app_controller::{SyncController, SyncRequest};
use vosync::clips::{AssemblyManifest, CrossfadePlan};
use vosync::file_utils::FileManager;
use vosync::subtitle_processor::OverlayMap;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Expand a subtitle, cut and stitch the voiceover, and retime the entries
    Sync(SyncArgs),

    /// Print crossfade offsets for a list of clip durations
    Offsets {
        /// Transition length in seconds (defaults to the configured one)
        #[arg(short, long)]
        transition: Option<f64>,

        /// Clip durations in seconds
        #[arg(value_name = "DURATION", required = true)]
        durations: Vec<f64>,
    },

    /// Place clips on a retimed timeline and chain them with crossfades
    Assemble(AssembleArgs),

    /// Generate shell completions for vosync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct SyncArgs {
    /// Source subtitle matching the voiceover
    #[arg(value_name = "SUBTITLE")]
    subtitle: PathBuf,

    /// Recorded voiceover
    #[arg(value_name = "AUDIO")]
    audio: PathBuf,

    /// Run directory (a fresh one under the workspace root by default)
    #[arg(short, long)]
    work_dir: Option<PathBuf>,

    /// JSON object of pause hints keyed by entry index, e.g. {"3": 2.0}
    #[arg(long)]
    hints: Option<PathBuf>,

    /// JSON object of overlays keyed by entry index
    #[arg(long)]
    overlays: Option<PathBuf>,

    /// Caller's own segmentation that hints and overlays are keyed by
    #[arg(long)]
    script: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct AssembleArgs {
    /// JSON manifest listing the clips
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Retimed subtitle produced by `sync`
    #[arg(value_name = "TIMELINE")]
    timeline: PathBuf,

    /// Output video
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Seed for the motion of stills without an explicit one
    #[arg(long)]
    seed: Option<u64>,
}

/// vosync - voiceover / subtitle / clip timeline synchronization
#[derive(Parser, Debug)]
#[command(name = "vosync")]
#[command(version)]
#[command(about = "Synchronize subtitles, voiceover and visual clips on one timeline")]
#[command(long_about = "vosync expands a subtitle into sentence-level entries, cuts the recorded voiceover per entry,
stitches it back with explicit pauses and retimes the subtitle to the stitched track.

EXAMPLES:
    vosync sync talk.srt talk.wav                       # Synchronize with default config
    vosync sync talk.srt talk.wav -w ./run --hints p.json
    vosync offsets --transition 1.0 10 8 6              # Crossfade offsets for three clips
    vosync assemble clips.json run/expanded.srt out.mp4 # Chain clips on the retimed timeline
    vosync completions bash > vosync.bash               # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Glyph and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("✗", "1;31"),
            Level::Warn => ("!", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("·", "1;36"),
            Level::Trace => ("»", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (glyph, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", colour, now, glyph, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at trace so a later set_max_level can raise verbosity
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(cmd_log_level) = &cli.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "vosync", &mut std::io::stdout());
            Ok(())
        }
        Commands::Offsets { transition, durations } => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            let transition = transition.unwrap_or(config.sync.crossfade.transition_duration);
            print_offsets(&durations, transition)
        }
        Commands::Sync(args) => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            run_sync(config, args).await
        }
        Commands::Assemble(args) => {
            let config = load_config(&cli.config_path, cli.log_level.as_ref())?;
            run_assemble(config, args).await
        }
    }
}

/// Load the configuration file, writing a default one when it is missing
fn load_config(config_path: &str, cli_log_level: Option<&CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        let file = File::open(config_path).context(format!("Failed to open config file: {}", config_path))?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);

        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;

        std::fs::write(config_path, config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;

        config
    };

    if let Some(log_level) = cli_log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    // Just update the max level without reinitializing the logger
    log::set_max_level(level_filter(&config.log_level));

    Ok(config)
}

fn print_offsets(durations: &[f64], transition: f64) -> Result<()> {
    if durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return Err(anyhow!("Clip durations must be non-negative numbers"));
    }

    let plan = CrossfadePlan::new(durations, transition);
    let mut stdout = std::io::stdout();
    for (i, (duration, offset)) in plan.durations.iter().zip(&plan.offsets).enumerate() {
        writeln!(stdout, "clip {:>3}  duration {:>9.3}s  offset {:>9.3}s", i + 1, duration, offset)?;
    }
    writeln!(stdout, "total {:.3}s", plan.total_duration)?;
    Ok(())
}

fn read_json_map<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<HashMap<usize, T>> {
    let content = FileManager::read_to_string(path)?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {} file: {:?}", what, path))
}

async fn run_sync(config: Config, args: SyncArgs) -> Result<()> {
    let controller = SyncController::with_config(config)?;
    cancel_on_ctrl_c(&controller);

    let mut request = SyncRequest::new(&args.subtitle, &args.audio);
    if let Some(work_dir) = &args.work_dir {
        request = request.with_work_dir(work_dir);
    }
    if let Some(path) = &args.hints {
        request = request.with_hints(read_json_map::<f64>(path, "hints")?);
    }
    if let Some(path) = &args.overlays {
        let overlays: OverlayMap = read_json_map(path, "overlays")?;
        request = request.with_overlays(overlays);
    }
    if let Some(script) = &args.script {
        request = request.with_script(script);
    }

    let outcome = controller.run(request).await?;

    info!("Subtitle: {}", outcome.expanded_subtitle.display());
    info!("Voiceover: {}", outcome.stitched_voiceover.display());
    info!("Timeline: {:.3}s over {} entries", outcome.timeline_duration, outcome.entries.len());
    Ok(())
}

async fn run_assemble(config: Config, args: AssembleArgs) -> Result<()> {
    let controller = SyncController::with_config(config)?;
    cancel_on_ctrl_c(&controller);

    let manifest = AssemblyManifest::from_file(&args.manifest)?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let outcome = controller.assemble(&manifest, &args.timeline, &args.output, &mut rng).await?;
    for attempt in &outcome.failed_attempts {
        warn!("Fell back after: {}", attempt);
    }
    info!("Success: {}", outcome.output.display());
    Ok(())
}

fn cancel_on_ctrl_c(controller: &SyncController) {
    let token = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after running encoder calls finish");
            token.cancel();
        }
    });
}
