use anyhow::{Context, Result};
use clap::Parser;
use docx_html_server::{start_server, AppState};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "DOCX_HTML_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,

    /// Directory with the static client.
    #[arg(long, env = "DOCX_HTML_PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// Largest accepted upload, in MiB.
    #[arg(long, env = "DOCX_HTML_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let state = AppState::new(args.public_dir, args.max_upload_mb);
    start_server(&args.addr, state)
        .await
        .with_context(|| format!("serve on {}", args.addr))
}
