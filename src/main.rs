use clap::Parser;
use tokio::net::TcpListener;

use meetserver::config::Config;
use meetserver::state::AppState;

/// Signaling and room coordination server for group video chat.
#[derive(Debug, Parser)]
#[command(name = "meetserver", version)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
    /// SQLite database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meetserver=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }
    print_banner(&config);

    let db = match meetserver::db::create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("failed to open database {}: {e}", config.database_url);
            std::process::exit(1);
        }
    };

    let state = AppState::new(db, config.gateway.clone(), config.allowed_origins.clone());
    let app = meetserver::routes::router(state);

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind port {}: {e}", config.port);
            std::process::exit(1);
        }
    };

    if let Ok(addr) = listener.local_addr() {
        eprintln!("  \x1b[32m→ listening on {addr}\x1b[0m");
        eprintln!();
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let rooms = match config.gateway.max_room_members {
        Some(n) => format!("up to {n} members"),
        None => "unbounded".to_string(),
    };
    let origins = if config.allowed_origins.is_empty() {
        "any".to_string()
    } else {
        config.allowed_origins.join(", ")
    };

    eprintln!();
    eprintln!("  \x1b[1;36mmeetserver\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!("  \x1b[2mdatabase\x1b[0m     {}", config.database_url);
    eprintln!("  \x1b[2mrooms\x1b[0m        {rooms}");
    eprintln!("  \x1b[2morigins\x1b[0m      {origins}");
    eprintln!(
        "  \x1b[2mheartbeat\x1b[0m    {}s / timeout {}s",
        config.gateway.heartbeat_interval.as_secs(),
        config.gateway.heartbeat_timeout.as_secs()
    );
    eprintln!();
}
