use std::sync::Arc;

use neta_assist::api::{AppState, TurnService, api_routes};
use neta_assist::config::AppConfig;
use neta_assist::discovery::{AccountLookup, HttpAccountLookup};
use neta_assist::error::Result;
use neta_assist::llm::create_provider;
use neta_assist::store::{InMemorySessionStore, LibSqlSessionStore, SessionStore, stored_sessions};
use neta_assist::workflow::{Collaborators, HandlerSet, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🌟 Neta Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Assistant ID: {}", config.assistant_id);

    // ── Collaborators ───────────────────────────────────────────────────
    let mut collaborators = Collaborators::default().with_timeout(config.step_timeout);

    match &config.llm {
        Some(llm_config) => {
            collaborators = collaborators.with_llm(create_provider(llm_config)?);
            eprintln!("   Model: {} ({})", llm_config.model, llm_config.backend);
        }
        None => eprintln!("   Model: none (no API key set, using canned analysis)"),
    }

    match &config.search_url {
        Some(url) => {
            let lookup: Arc<dyn AccountLookup> =
                Arc::new(HttpAccountLookup::new(reqwest::Client::new(), url));
            collaborators = collaborators.with_lookup(lookup);
            eprintln!("   Account search: {}", url);
        }
        None => eprintln!("   Account search: none (using fallback accounts)"),
    }

    // ── Sessions ────────────────────────────────────────────────────────
    let store: Arc<dyn SessionStore> = match &config.db_path {
        Some(path) => {
            let store = LibSqlSessionStore::new_local(path).await.unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", path.display(), e);
                std::process::exit(1);
            });
            match stored_sessions(&store).await {
                Some(sessions) => eprintln!("   Database: {} ({} sessions)", path.display(), sessions),
                None => eprintln!("   Database: {}", path.display()),
            }
            Arc::new(store)
        }
        None => {
            eprintln!("   Database: in-memory (sessions are lost on restart)");
            Arc::new(InMemorySessionStore::new())
        }
    };

    // ── Server ──────────────────────────────────────────────────────────
    let handlers = HandlerSet::standard(&collaborators);
    eprintln!("   Steps: {} handlers", handlers.len());
    let orchestrator = Orchestrator::new(handlers);
    let service = Arc::new(TurnService::new(store, orchestrator));
    let app = api_routes(AppState {
        service,
        assistant_id: config.assistant_id.clone(),
    });

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    eprintln!("   Health: http://{}/health", addr);
    eprintln!("   Runs:   http://{}/runs", addr);
    eprintln!();
    tracing::info!(addr = %addr, "Neta server started");

    axum::serve(listener, app).await?;
    Ok(())
}
