//! Terminal front end for the travel assistant.

mod render;

use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use travel_assist::backend::DEFAULT_HISTORY_LIMIT;
use travel_assist::prelude::*;

#[derive(Parser)]
#[command(name = "travel-assist", version, about = "Ask the travel assistant from the terminal")]
struct Cli {
    /// Backend base URL (overrides TRAVEL_API_URL).
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a travel question.
    Ask {
        /// Wait for the whole answer instead of streaming it.
        #[arg(long)]
        no_stream: bool,
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Show recent questions and answers.
    History {
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Delete all stored history.
    ClearHistory,
    /// Check whether the backend is reachable.
    Health,
}

/// Load .env from the crate dir or current dir.
fn load_env() {
    if let Ok(canon) = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join(".env")
        .canonicalize()
    {
        let _ = dotenvy::from_path(canon);
    }
    let _ = dotenvy::dotenv();
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env();
    travel_assist::init_observability();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            debug!(error = %err, "command failed");
            eprintln!("error: {}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, ClientError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config = config.base_url(url);
    }
    let backend = Arc::new(HttpTravelBackend::new(config)?);

    match cli.command {
        Command::Ask {
            no_stream,
            question,
        } => {
            let question = question.join(" ");
            let mut conversation = Conversation::new(backend);
            let record = if no_stream {
                conversation.ask(&question).await?
            } else {
                stream_answer(&mut conversation, &question).await?
            };
            if no_stream {
                println!("{}", record.answer);
            }
            println!("{}", render::footer(&record));
            Ok(ExitCode::SUCCESS)
        }
        Command::History { limit, offset } => {
            let page = backend.history(limit, offset).await?;
            print!("{}", render::history(&page));
            Ok(ExitCode::SUCCESS)
        }
        Command::ClearHistory => {
            let mut conversation = Conversation::new(backend);
            conversation.clear_history().await?;
            println!("History cleared.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            let conversation = Conversation::new(backend);
            let status = conversation.check_health().await;
            println!("{}", render::api_status(status));
            Ok(match status {
                ApiStatus::Online => ExitCode::SUCCESS,
                ApiStatus::Offline => ExitCode::FAILURE,
            })
        }
    }
}

async fn stream_answer(
    conversation: &mut Conversation,
    question: &str,
) -> Result<QueryRecord, ClientError> {
    let mut answer = conversation.start_stream(question).await?;

    let abort = answer.abort_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let mut stdout = std::io::stdout();
    let mut wrote_text = false;
    while let Some(update) = answer.next_update().await {
        match update {
            AnswerUpdate::Started { metadata } => {
                debug!(id = %metadata.id, "answer started");
            }
            AnswerUpdate::Delta { text, .. } => {
                wrote_text = true;
                print!("{text}");
                if let Err(err) = stdout.flush() {
                    warn!(error = %err, "failed to flush stdout");
                }
            }
            AnswerUpdate::Completed { .. } | AnswerUpdate::Failed { .. } => {
                if wrote_text {
                    println!();
                }
            }
        }
    }
    interrupt.abort();

    let record = answer.finish().await?;
    conversation.complete(record.clone());
    Ok(record)
}
