use std::env;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use foundation::{Timestamp, Ttl};
use layers::POST_TTL_HOURS;
use tools::{CONFIG_ENV, Expiry};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "postmap", about = "Map post visibility, fading and card placement")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute render attributes for a post snapshot and viewport.
    Render(RenderArgs),
    /// Print the resolved engine configuration.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// JSON array of posts.
    posts: PathBuf,
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    #[arg(long)]
    span_lat: f64,
    #[arg(long)]
    span_lon: f64,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Drop posts older than the TTL at this instant (epoch milliseconds).
    #[arg(long)]
    now_ms: Option<i64>,
    #[arg(long, default_value_t = POST_TTL_HOURS)]
    ttl_hours: i64,
    #[arg(long)]
    pretty: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    match Cli::parse().command {
        Command::Render(args) => cmd_render(args),
        Command::Config { config } => cmd_config(config),
    }
}

fn cmd_render(args: RenderArgs) -> Result<(), String> {
    let config_path = tools::resolve_config_path(args.config, env::var(CONFIG_ENV).ok());
    let config = tools::load_config(config_path.as_deref()).map_err(|e| e.to_string())?;
    let viewport = tools::viewport_from_args(args.lat, args.lon, args.span_lat, args.span_lon)
        .map_err(|e| e.to_string())?;
    let posts = tools::load_posts(&args.posts).map_err(|e| e.to_string())?;

    let expiry = args.now_ms.map(|ms| Expiry {
        now: Timestamp::from_millis(ms),
        ttl: Ttl::hours(args.ttl_hours),
    });

    let report = tools::render_report(posts, viewport, config, expiry);
    info!(
        posts = report.stats.posts,
        visible = report.stats.visible,
        dropped_expired = report.dropped_expired,
        "rendered {}",
        args.posts.display()
    );

    let payload = if args.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(|e| format!("json: {e}"))?;
    println!("{payload}");
    Ok(())
}

fn cmd_config(flag: Option<PathBuf>) -> Result<(), String> {
    let config_path = tools::resolve_config_path(flag, env::var(CONFIG_ENV).ok());
    let config = tools::load_config(config_path.as_deref()).map_err(|e| e.to_string())?;
    match &config_path {
        Some(p) => info!("loaded config from {}", p.display()),
        None => info!("no config file, using defaults"),
    }
    let payload = serde_json::to_string_pretty(&config).map_err(|e| format!("json: {e}"))?;
    println!("{payload}");
    Ok(())
}
