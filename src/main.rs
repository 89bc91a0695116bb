use stata_cells::create_service;
use tower_lsp::Server;
use tracing_subscriber::EnvFilter;

/// Log filter variable; stdout carries the protocol, so logs go to stderr.
const LOG_ENV: &str = "STATA_CELLS_LOG";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = create_service();
    Server::new(stdin, stdout, socket).serve(service).await;
}
