use animedash::csv_reader;
use animedash::dashboard::{Dashboard, DashboardConfig, View};
use animedash::enrich::{JikanLookup, OfflineLookup, TitleLookup};
use animedash::render::{self, ChartConfig};
use animedash::scale::{ActivityScale, BubbleScale, Rounding};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "animedash")]
#[command(about = "Regional anime viewing dashboard from CSV data", long_about = None)]
struct Args {
    #[arg(short = 'i', long = "input", global = true, help = "CSV dataset (reads stdin when absent)")]
    input: Option<PathBuf>,

    #[arg(short = 's', long = "state", global = true, help = "Selected region [default: California]")]
    state: Option<String>,

    #[arg(long = "width", global = true, default_value = "800", help = "Output width in pixels")]
    width: u32,

    #[arg(long = "height", global = true, default_value = "600", help = "Output height in pixels")]
    height: u32,

    #[arg(short = 't', long = "title", global = true, help = "Chart title")]
    title: Option<String>,

    #[arg(long = "timeout", global = true, default_value = "30", help = "Seconds to wait for loads and lookups")]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bar chart of titles per source material (PNG)
    Bar,
    /// Radar chart of activity by gender (PNG)
    Radar {
        #[arg(long = "divisor", default_value = "1000", help = "Divide activity totals by this value")]
        divisor: f64,

        #[arg(long = "unrounded", help = "Keep fractional scaled values")]
        unrounded: bool,
    },
    /// Bubble chart of genre by age group (PNG)
    Bubble {
        #[arg(long = "divisor", default_value = "10", help = "Count per pixel of bubble radius")]
        divisor: f64,

        #[arg(long = "min-radius", default_value = "4")]
        min_radius: f64,

        #[arg(long = "max-radius", default_value = "30")]
        max_radius: f64,
    },
    /// Per-region fill colors for the choropleth (JSON)
    Map,
    /// Most-watched titles and most active raters (JSON)
    Top {
        #[arg(short = 'n', long = "n", default_value = "3", help = "Number of entries per list")]
        n: usize,

        #[arg(long = "offline", help = "Skip title lookups and use placeholder images")]
        offline: bool,
    },
    /// Distinct regions present in the dataset (JSON)
    Regions,
}

/// Unwrap a panel view or turn its state into an error.
fn ready<'a, T>(view: &'a View<T>, panel: &str, region: &str) -> Result<&'a T> {
    match view {
        View::Ready(value) => Ok(value),
        View::NoData => bail!("No data for region '{}' in {}", region, panel),
        View::Unavailable(reason) => bail!("{} unavailable: {}", panel, reason),
        View::Loading => bail!("{} still loading", panel),
    }
}

fn build_config(args: &Args) -> DashboardConfig {
    let mut config = DashboardConfig::default();
    if let Some(state) = &args.state {
        config.default_region = state.clone();
    }
    match &args.command {
        Command::Radar { divisor, unrounded } => {
            config.activity_scale = ActivityScale {
                divisor: *divisor,
                rounding: if *unrounded { Rounding::Unrounded } else { Rounding::Nearest },
            };
        }
        Command::Bubble {
            divisor,
            min_radius,
            max_radius,
        } => {
            config.bubble_scale = BubbleScale::new(*divisor, *min_radius, *max_radius);
        }
        Command::Top { n, .. } => config.top_n = *n,
        _ => {}
    }
    if let Some(path) = &args.input {
        config = config.with_dataset(path);
    }
    config
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(bytes).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(value).context("Failed to serialize output")?;
    json.push(b'\n');
    write_stdout(&json)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = build_config(&args);
    let lookup: Arc<dyn TitleLookup> = match &args.command {
        Command::Top { offline: false, .. } => Arc::new(JikanLookup::new().context("Failed to build title lookup")?),
        _ => Arc::new(OfflineLookup),
    };

    let mut dashboard = Dashboard::new(config, lookup);
    if args.input.is_some() {
        dashboard.load_datasets();
    } else {
        let data = csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin")?;
        dashboard.attach_all(Arc::new(data));
    }

    if !dashboard.run_until_settled(Duration::from_secs(args.timeout)) {
        log::warn!("Timed out after {}s with work still outstanding", args.timeout);
    }

    let region = dashboard.state().selected_region().to_string();
    let chart = ChartConfig {
        title: args.title.clone(),
        width: args.width,
        height: args.height,
    };

    match &args.command {
        Command::Bar => {
            let summary = ready(dashboard.source_bar(), "source bar chart", &region)?;
            let png = render::render_source_bar(summary, &chart).context("Failed to generate bar chart")?;
            write_stdout(&png)
        }
        Command::Radar { .. } => {
            let summary = ready(dashboard.gender_radar(), "gender radar chart", &region)?;
            let png = render::render_gender_radar(summary, &dashboard.config().activity_scale, &chart)
                .context("Failed to generate radar chart")?;
            write_stdout(&png)
        }
        Command::Bubble { .. } => {
            let view = ready(dashboard.genre_bubble(), "genre bubble chart", &region)?;
            let png = render::render_genre_bubble(view, &chart).context("Failed to generate bubble chart")?;
            write_stdout(&png)
        }
        Command::Map => {
            let map = ready(dashboard.region_map(), "region map", &region)?;
            write_json(&map.table(&region))
        }
        Command::Top { .. } => {
            let stats = ready(dashboard.top_stats(), "top stats", &region)?;
            write_json(stats)
        }
        Command::Regions => write_json(&dashboard.state().all_regions()),
    }
}
