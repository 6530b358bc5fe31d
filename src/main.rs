use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args as ClapArgs, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rssiview::serve::ServeState;
use rssiview::{prepare_trials, render, report, Config, FacetSummary, LayoutPolicy, Trial};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rssiview")]
#[command(author, version, about = "Lay out RSSI calibration trials and compare detection algorithms")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Trial file or directory of result_*.json files
    path: Option<PathBuf>,

    #[command(flatten)]
    view: ViewArgs,

    /// Output report file (.html, .json, .csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "rssiview-reports")]
    report_dir: PathBuf,

    /// Don't open the report in a browser
    #[arg(long)]
    no_open: bool,

    /// Show debug diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show warnings
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Options shared by the report and serve modes.
#[derive(ClapArgs, Debug, Clone)]
struct ViewArgs {
    /// Arrangement: pages, grid or trellis
    #[arg(short, long, default_value = "pages")]
    layout: LayoutPolicy,

    /// Only these trials, by the last three digits of the sample file name
    #[arg(long, value_delimiter = ',')]
    ids: Vec<u32>,

    /// JSON config file overriding the built-in thresholds
    #[arg(long)]
    config: Option<PathBuf>,

    /// Trials per page in the paginated layout
    #[arg(long)]
    page_size: Option<usize>,

    /// Grid size as ROWSxCOLS, e.g. 4x5
    #[arg(long, value_parser = parse_grid)]
    grid: Option<(usize, usize)>,

    /// Peak RSSI (dBm) at or above which a pass counts as close
    #[arg(long, allow_hyphen_values = true)]
    close_peak: Option<f64>,

    /// Maximum sample count of a run
    #[arg(long)]
    run_max_rows: Option<usize>,

    /// Minimum sample count of a walk
    #[arg(long)]
    walk_min_rows: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve figures with live legend toggles
    Serve {
        /// Trial file or directory
        path: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "3002")]
        port: u16,

        #[command(flatten)]
        view: ViewArgs,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },
}

fn parse_grid(s: &str) -> std::result::Result<(usize, usize), String> {
    let (r, c) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected ROWSxCOLS, got '{}'", s))?;
    let rows = r.trim().parse().map_err(|_| format!("bad row count '{}'", r))?;
    let cols = c.trim().parse().map_err(|_| format!("bad column count '{}'", c))?;
    Ok((rows, cols))
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Defaults, then the config file, then CLI flags.
fn build_config(view: &ViewArgs) -> Result<Config> {
    let mut config = match &view.config {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(n) = view.page_size {
        config.layout.page_size = n;
    }
    if let Some((rows, cols)) = view.grid {
        config.layout.grid_rows = rows;
        config.layout.grid_cols = cols;
    }
    if let Some(dbm) = view.close_peak {
        config.classify.close_peak_dbm = dbm;
    }
    if let Some(n) = view.run_max_rows {
        config.classify.run_max_rows = n;
    }
    if let Some(n) = view.walk_min_rows {
        config.classify.walk_min_rows = n;
    }

    config.validate().context("invalid settings")?;
    Ok(config)
}

/// Load with a progress bar and log what was found.
fn load(path: &Path, view: &ViewArgs, config: &Config, quiet: bool) -> Vec<Trial> {
    let file_count = rssiview::trial::collect_result_files(path).len();
    info!("Found {} trial file(s) under {}", file_count, path.display());

    let pb = if !quiet && file_count > 1 {
        let pb = ProgressBar::new(file_count as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    let trials = prepare_trials(path, &view.ids, config, |p| {
        if let Some(ref pb) = pb {
            pb.inc(1);
            if let Some(name) = p.file_name() {
                pb.set_message(name.to_string_lossy().to_string());
            }
        }
    });

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    log_summary(&trials);
    trials
}

fn log_summary(trials: &[Trial]) {
    let summary = FacetSummary::from_trials(trials);
    info!("{} trial(s) after filtering", summary.total);
    for (&(speed, proximity), &n) in &summary.counts {
        info!("  {:<11} {:<6} {}", speed.as_str(), proximity.as_str(), n);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    // Handle subcommands first
    if let Some(Command::Serve { path, port, view, no_open }) = args.command {
        let config = build_config(&view)?;
        let mut trials = load(&path, &view, &config, args.quiet);
        if trials.is_empty() {
            warn!("No trials to show; nothing to serve");
            return Ok(());
        }
        let figures = render::render(view.layout, &mut trials, &config);
        rssiview::serve::start(port, ServeState::new(figures, trials), !no_open)
            .with_context(|| format!("serving on port {}", port))?;
        return Ok(());
    }

    let Some(path) = args.path.clone() else {
        anyhow::bail!("no input given. Usage: rssiview <PATH>; run 'rssiview --help' for options");
    };

    let config = build_config(&args.view)?;
    let mut trials = load(&path, &args.view, &config, args.quiet);
    if trials.is_empty() {
        warn!("No trials to render");
        return Ok(());
    }

    let figures = render::render(args.view.layout, &mut trials, &config);
    info!("Rendered {} figure(s) with the {:?} layout", figures.len(), args.view.layout);

    // Determine report path
    let report_path = match args.output {
        Some(ref output) => output.clone(),
        None => {
            std::fs::create_dir_all(&args.report_dir)
                .with_context(|| format!("creating {}", args.report_dir.display()))?;
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let layout = format!("{:?}", args.view.layout).to_lowercase();
            args.report_dir.join(format!("rssiview_{}_{}.html", layout, timestamp))
        }
    };

    report::generate(&report_path, &figures, &trials)
        .with_context(|| format!("writing report {}", report_path.display()))?;
    info!("Report saved: {}", report_path.display());

    if !args.no_open {
        if let Err(e) = open::that(&report_path) {
            warn!("Failed to open report: {}", e);
        }
    }

    Ok(())
}
