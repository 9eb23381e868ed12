use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use tracing::warn;

use answerbook::answerer::gemini::GeminiAnswerer;
use answerbook::auth::storage::{AuthStorage, KeySource};
use answerbook::auth::{self, prompt_api_key};
use answerbook::banner::{BannerInfo, print_banner, summary_line};
use answerbook::batch::Batch;
use answerbook::config::{Config, KNOWN_KEYS};
use answerbook::consts::{API_KEY_ENV_VARS, PROVIDER, default_db_path};
use answerbook::document::convert::Converter;
use answerbook::document::{OutputFormat, resolve_output, write_document};
use answerbook::events::EventBus;
use answerbook::throttle::Throttler;
use answerbook::{logging, progress, questions};

#[derive(Parser)]
#[command(
    name = "answerbook",
    version,
    about = "Ask Gemini a list of questions, get the answers back as a document.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Questions file, one question per line (blank lines are skipped)
    questions: Option<PathBuf>,

    /// Output file [default: answers.pdf]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (inferred from the output extension if omitted)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Gemini model name
    #[arg(long)]
    model: Option<String>,

    /// Maximum requests per window
    #[arg(long)]
    rpm: Option<u32>,

    /// Rate-limit window in seconds
    #[arg(long)]
    window: Option<u64>,

    /// Extra seconds to wait on top of each throttle delay
    #[arg(long)]
    buffer: Option<u64>,

    /// SQLite database for credentials and config [default: ~/.answerbook/answerbook.db]
    #[arg(long)]
    db: Option<PathBuf>,

    /// Timeout in seconds for each API call and each conversion step
    #[arg(short, long, default_value_t = 120, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Open the document with the system viewer when done
    #[arg(long, default_value_t = false)]
    open: bool,

    /// Store an interactively entered API key for next time
    #[arg(long, default_value_t = false)]
    save_key: bool,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Store a Gemini API key
    Login,
    /// Remove the stored Gemini API key
    Logout,
    /// Read or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show one setting, or all of them
    Get { key: Option<String> },
    /// Change a setting
    Set { key: String, value: String },
    /// Reset a setting to its default
    Unset { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = db_path
        .to_str()
        .context("database path is not valid UTF-8")?
        .to_string();

    if let Some(command) = &cli.command {
        return match command {
            Command::Login => handle_login(&db),
            Command::Logout => handle_logout(&db),
            Command::Config { action } => handle_config(&db, action),
        };
    }

    let Some(input) = cli.questions.clone() else {
        bail!("no questions file given. Usage: answerbook <QUESTIONS>");
    };
    run(cli, input, &db).await
}

async fn run(cli: Cli, input: PathBuf, db: &str) -> anyhow::Result<()> {
    let questions = questions::read_questions(&input)?;
    let (output, format) = resolve_output(cli.output, cli.format)?;

    let config = Config::open(db)?;
    let model = config.resolve_model(cli.model)?;
    let throttle = config.resolve_throttle(cli.rpm, cli.window, cli.buffer)?;

    let storage = AuthStorage::open(db)?;
    let (api_key, auth_status) = match storage.get_api_key(PROVIDER, API_KEY_ENV_VARS)? {
        Some(resolved) => {
            let status = match resolved.source {
                KeySource::Stored => "API key ✓".to_string(),
                KeySource::Env(var) => format!("API key ({var}) ✓"),
            };
            (resolved.key, status)
        }
        None => {
            if !std::io::stdin().is_terminal() {
                bail!(
                    "no Gemini API key found. Run `answerbook login` or set {}.",
                    API_KEY_ENV_VARS.join(" or ")
                );
            }
            let key = prompt_api_key("Gemini")?;
            if cli.save_key {
                auth::login(db, PROVIDER, &key)?;
                println!("✓ API key saved");
            }
            (key, "API key (entered) ✓".to_string())
        }
    };

    let timeout = Duration::from_secs(cli.timeout);
    let answerer = GeminiAnswerer::new(Some(model.clone()), api_key, timeout)?;

    print_banner(&BannerInfo {
        model: &model,
        auth_status: &auth_status,
        throttle: &throttle,
        questions: questions.len(),
        input: &input,
        output: &output,
    });

    let events = Arc::new(EventBus::default());
    let printer = progress::spawn(events.subscribe());
    let mut throttler = Throttler::new(throttle)?.with_events(Arc::clone(&events));

    // Ctrl+C abandons the whole run; nothing is written.
    let report = {
        let mut batch = Batch::new(&answerer, &mut throttler).with_events(Arc::clone(&events));
        tokio::select! {
            report = batch.run(&questions) => Some(report),
            _ = tokio::signal::ctrl_c() => None,
        }
    };
    drop(throttler);
    drop(events);
    let _ = printer.await;

    let Some(report) = report else {
        println!("\ninterrupted");
        return Ok(());
    };

    println!(
        "\n{}",
        summary_line(report.answered(), report.failed, report.usage)
    );

    println!("generating {}...", format.extension());
    write_document(&report.pairs, format, &output, &Converter::new(timeout)).await?;
    println!("✓ saved {}", output.display());

    if cli.open
        && let Err(e) = open::that(&output)
    {
        warn!(error = %e, "could not open document");
    }
    Ok(())
}

fn handle_login(db: &str) -> anyhow::Result<()> {
    let key = prompt_api_key("Gemini")?;
    auth::login(db, PROVIDER, &key)?;
    println!("✓ API key saved to {db}");
    Ok(())
}

fn handle_logout(db: &str) -> anyhow::Result<()> {
    auth::logout(db, PROVIDER)?;
    println!("✓ API key cleared.");
    Ok(())
}

fn handle_config(db: &str, action: &ConfigAction) -> anyhow::Result<()> {
    let config = Config::open(db)?;
    match action {
        ConfigAction::Get { key: Some(key) } => match config.get(key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Get { key: None } => {
            for key in KNOWN_KEYS {
                let value = config.get(key)?.unwrap_or_else(|| "(default)".to_string());
                println!("{key:<12} {value}");
            }
        }
        ConfigAction::Set { key, value } => {
            config.set(key, value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            config.remove(key)?;
            println!("✓ {key} reset to default");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_must_be_positive() {
        assert!(Cli::try_parse_from(["answerbook", "q.txt", "--timeout", "0"]).is_err());

        let cli = Cli::try_parse_from(["answerbook", "q.txt", "-t", "1"]).unwrap();
        assert_eq!(cli.timeout, 1);
        let cli = Cli::try_parse_from(["answerbook", "q.txt"]).unwrap();
        assert_eq!(cli.timeout, 120);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
