//! lrpc node entry point.
//!
//! Loads the TOML config, applies command-line overrides, and serves the
//! built-in `echo` service until Ctrl-C is received.
//!
//! ```text
//! main()
//!  └─ load_config()          -- defaults when the file is absent
//!  └─ ServiceRegistry        -- echo.Echo, echo.Reverse
//!  └─ Server::bind()
//!       └─ Server::run()     -- blocking task, one thread per connection
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lrpc_node::application::echo;
use lrpc_node::{load_config, save_config, Server, ServiceRegistry};

#[derive(Parser, Debug)]
#[command(name = "lrpc-node", version, about = "Serve lrpc calls over TCP")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "LRPC_CONFIG", default_value = "lrpc.toml")]
    config: PathBuf,

    /// Listen address, overriding `server.bind_address` and `server.port`
    #[arg(long, env = "LRPC_BIND")]
    bind: Option<SocketAddr>,

    /// Log filter, overriding `log.level`; `RUST_LOG` still wins
    #[arg(long)]
    log_level: Option<String>,

    /// Write the effective config (file plus overrides) back to `--config`
    /// and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    if let Some(addr) = args.bind {
        config.server.bind_address = addr.ip().to_string();
        config.server.port = addr.port();
    }
    if let Some(level) = args.log_level {
        config.log.level = level;
    }

    if args.write_config {
        save_config(&config, &args.config)
            .with_context(|| format!("writing config to {}", args.config.display()))?;
        println!("wrote {}", args.config.display());
        return Ok(());
    }

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .init();

    info!("lrpc node starting");

    let mut registry = ServiceRegistry::new();
    echo::register(&mut registry);
    info!(?registry, "services registered");

    let server = Server::bind(&config, Arc::new(registry)).context("starting server")?;

    // Shutdown flag polled by the accept loop.
    let running = Arc::new(AtomicBool::new(true));

    // ── Ctrl-C handler ────────────────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("lrpc node ready.  Press Ctrl-C to exit.");

    tokio::task::spawn_blocking(move || server.run(running))
        .await
        .context("server task panicked")?;

    info!("lrpc node stopped");
    Ok(())
}
