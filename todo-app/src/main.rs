use anyhow::Context;
use todo_app::config::Config;
use todo_app::connectors::supabase::reqwest::ReqwestSupabaseConnector;
use todo_app::identity::session::SessionStore;
use todo_app::shell::{Reply, Shell};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "> ";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::new().context("Cannot load configuration")?;
    let connector = ReqwestSupabaseConnector::new(&config.supabase);
    let sessions = SessionStore::new();
    let mut shell = Shell::new(&connector, &connector, &sessions, &config);
    info!(url = %config.supabase.url, "Starting todo shell");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(format!("{}\nType `help` to see the commands\n{}", shell.banner(), PROMPT).as_bytes())
        .await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        match shell.handle(&line).await {
            Reply::Quit => break,
            Reply::Output(text) if text.is_empty() => {}
            Reply::Output(text) => stdout.write_all(format!("{}\n", text).as_bytes()).await?,
        }
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("Bye");
    Ok(())
}
