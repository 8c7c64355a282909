mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use colored::*;
use repolook::actors::SearchSession;
use repolook::github::{GitHubClient, RepositorySource};
use repolook::server::{start_server, AppState};
use repolook::suggest::{GeminiSuggester, Suggester};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,repolook=debug,tower_http=debug"))
        )
        .init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.request_timeout);

    println!("{}", "RepoLook".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    let github = GitHubClient::new(&cli.github_api_url, timeout)
        .context("Failed to create GitHub client")?;
    println!("✅ GitHub API: {}", github.base_url());

    let gemini = GeminiSuggester::new(
        &cli.gemini_api_url,
        cli.gemini_model.clone(),
        cli.gemini_api_key.clone(),
        timeout,
    )
    .context("Failed to create suggestion backend")?;

    let suggester_configured = gemini.is_configured();
    if suggester_configured {
        println!("✅ Suggestions: {} ({})", cli.gemini_model, cli.gemini_api_url);
    } else {
        warn!("GEMINI_API_KEY is not set; related-repository suggestions will fail");
        println!("{}", "⚠️ Suggestions disabled: GEMINI_API_KEY is not set".yellow());
    }

    let source: Arc<dyn RepositorySource> = Arc::new(github);
    let suggester: Arc<dyn Suggester> = Arc::new(gemini);

    let session = SearchSession::spawn(source.clone(), suggester.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start search session: {}", e))?;

    let state = AppState {
        session: session.clone(),
        source,
        suggester,
        suggester_configured,
        start_time: std::time::Instant::now(),
    };

    let addr = cli.bind_addr();
    println!("📡 Serving on http://{}", addr);
    println!("\nPress Ctrl+C to stop the server\n");

    tokio::select! {
        result = start_server(state, &addr) => {
            result.with_context(|| format!("Server on {} failed", addr))?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n🛑 Shutting down server...");
        }
    }

    session.stop(Some("Shutdown requested".to_string()));
    println!("✅ Server stopped");

    Ok(())
}
