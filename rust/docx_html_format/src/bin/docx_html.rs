use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use docx_html_format::{convert_document, process, DocxConverter, StyleMap};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Input file: a .docx package or converter HTML.
    input: PathBuf,

    /// Input kind; inferred from the extension when omitted.
    #[arg(long, value_enum)]
    from: Option<InputKind>,

    /// Print a JSON envelope (`{"html": ...}` or `{"error": ...}`) instead of bare HTML.
    #[arg(long)]
    json: bool,

    /// Write the output here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InputKind {
    Html,
    Docx,
}

impl InputKind {
    fn infer(path: &Path) -> Self {
        let docx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if docx {
            InputKind::Docx
        } else {
            InputKind::Html
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Envelope {
    Html { html: String },
    Error { error: String },
}

fn run(args: &Args) -> Result<String> {
    let mut bytes = Vec::new();
    File::open(&args.input)
        .with_context(|| format!("open {}", args.input.display()))?
        .read_to_end(&mut bytes)
        .context("read input")?;

    let kind = args.from.unwrap_or_else(|| InputKind::infer(&args.input));
    tracing::info!(input = %args.input.display(), ?kind, bytes = bytes.len(), "converting");
    let html = match kind {
        InputKind::Docx => convert_document(&DocxConverter::new(StyleMap::default()), &bytes)?,
        InputKind::Html => process(&String::from_utf8_lossy(&bytes))?,
    };
    Ok(html)
}

fn emit(args: &Args, text: &str) -> Result<()> {
    match &args.out {
        Some(path) => fs::write(path, text).with_context(|| format!("write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{text}").context("write stdout")
        }
    }
}

fn envelope(result: Result<String>) -> Result<String> {
    let envelope = match result {
        Ok(html) => Envelope::Html { html },
        Err(e) => Envelope::Error {
            error: format!("{e:#}"),
        },
    };
    serde_json::to_string(&envelope).context("serialize JSON envelope")
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = run(&args);
    let failed = result.is_err();

    let text = match (result, args.json) {
        (Ok(html), false) => html,
        (Err(e), false) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
        (result, true) => match envelope(result) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("error: {e:#}");
                return ExitCode::FAILURE;
            }
        },
    };

    if let Err(e) = emit(&args, &text) {
        eprintln!("error: {e:#}");
        return ExitCode::FAILURE;
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
