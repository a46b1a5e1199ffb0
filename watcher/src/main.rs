use anyhow::Context;
use birdnestcore::geofence::NoFlyZone;
use birdnestcore::StoreBackend;
use clap::{Parser, ValueEnum};
use feed::client::DEFAULT_FEED_URL;
use log::{error, info};
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WatcherConfig;
use workflow::runner::Runner;

mod feed;
mod web;
mod workflow;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Local,
    Redis,
}

#[derive(Parser)]
#[command(author, version, about = "Tracks pilots violating the Birdnest no-fly zone")]
struct Args {
    /// Load settings from YAML instead of flags
    #[arg(long)]
    config: Option<PathBuf>,
    /// API server port
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    /// Timeout between drone position polls (milliseconds)
    #[arg(long, default_value_t = 2000)]
    sleep: u64,
    /// Time to persist violating pilots (minutes)
    #[arg(long, default_value_t = 10)]
    persist: u64,
    /// Radius of no-fly zone in meters
    #[arg(long, default_value_t = 100.0)]
    no_fly_zone_radius: f64,
    /// Origin X coordinate of no-fly zone in feed units
    #[arg(long, default_value_t = 250000.0)]
    no_fly_zone_origin_x: f64,
    /// Origin Y coordinate of no-fly zone in feed units
    #[arg(long, default_value_t = 250000.0)]
    no_fly_zone_origin_y: f64,
    /// Where violations are kept
    #[arg(long, value_enum, default_value_t = BackendArg::Local)]
    backend: BackendArg,
    #[arg(long, default_value = "redis://127.0.0.1:6379/")]
    redis_url: String,
    #[arg(long, default_value = DEFAULT_FEED_URL)]
    feed_url: String,
}

fn config_from_args(args: &Args) -> WatcherConfig {
    let store = match args.backend {
        BackendArg::Local => StoreBackend::Local,
        BackendArg::Redis => StoreBackend::Remote {
            url: args.redis_url.clone(),
        },
    };
    WatcherConfig {
        port: args.port,
        sleep_ms: args.sleep,
        persist_minutes: args.persist,
        zone: NoFlyZone::new(
            args.no_fly_zone_origin_x,
            args.no_fly_zone_origin_y,
            args.no_fly_zone_radius,
        ),
        store,
        feed_url: args.feed_url.clone(),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = &args.config {
        WatcherConfig::load(path)?
    } else {
        config_from_args(&args)
    };

    let runner = Runner::new(config);
    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    runtime.block_on(runner.execute(async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", err);
        }
        info!("shutdown requested");
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_build_redis_config() {
        let args = Args::parse_from([
            "watcher",
            "--port",
            "9000",
            "--persist",
            "5",
            "--no-fly-zone-radius",
            "50",
            "--backend",
            "redis",
            "--redis-url",
            "redis://cache:6379/",
        ]);
        let config = config_from_args(&args);
        assert_eq!(config.port, 9000);
        assert_eq!(config.persist_minutes, 5);
        assert_eq!(config.zone.radius_m, 50.0);
        assert_eq!(config.zone.origin_x, 250000.0);
        assert_eq!(
            config.store,
            StoreBackend::Remote {
                url: "redis://cache:6379/".to_string()
            }
        );
    }

    #[test]
    fn flags_default_to_local_store() {
        let args = Args::parse_from(["watcher", "--port", "8080"]);
        assert_eq!(config_from_args(&args).store, StoreBackend::Local);
    }
}
