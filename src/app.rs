//! Command handlers for the `billing-assistant` binary.

use std::{io::IsTerminal, process::ExitCode, sync::Arc};

use ai_llm_service::{CredentialOutcome, GeminiConfig, GeminiService, GenerativeBackend};
use anyhow::{Context, Result};
use billing_context::{ContextBuilder, ContextSnapshot, ContractSource, DATA_UNAVAILABLE, JsonFileSource};
use chat_agent::{ChatError, ChatSession, Completion, CompletionClient};
use colored::Colorize;
use settings_store::{FileSettingsStore, SettingsStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::{
    cli::{Cli, Command, SettingsCommand},
    progress::{NoopProgress, Progress, Spinner},
    view::View,
};

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = GeminiConfig::from_env()?;
    let backend: Arc<dyn GenerativeBackend> = Arc::new(GeminiService::new(cfg.clone())?);

    let store = FileSettingsStore::open_default().context("opening settings")?;
    debug!(path = %store.path().display(), "settings store");
    let store: Arc<dyn SettingsStore> = Arc::new(store);

    let client = Arc::new(CompletionClient::new(backend, store, cfg)?);
    let source: Arc<dyn ContractSource> = Arc::new(JsonFileSource::new(&cli.contracts));
    let session = ChatSession::new(client, ContextBuilder::from_env()?, source);

    match cli.command {
        Command::Chat { skip_validation } => chat(&session, skip_validation).await,
        Command::Ask { question } => ask(&session, &question.join(" ")).await,
        Command::Context => print_context(&session),
        Command::Settings(cmd) => settings(session.client(), cmd).await,
    }
}

fn make_view() -> View {
    let progress: Box<dyn Progress> = if std::io::stderr().is_terminal() {
        Box::new(Spinner::default())
    } else {
        Box::new(NoopProgress)
    };
    View::new(progress)
}

/// Sends one question while rendering its events as they arrive.
async fn turn(session: &ChatSession, view: &View, text: &str) -> Result<Option<Completion>, ChatError> {
    let mut rx = session.subscribe();
    let send = session.send(text);
    tokio::pin!(send);

    let result = loop {
        tokio::select! {
            res = &mut send => break res,
            Ok(event) = rx.recv() => view.render(&event),
        }
    };
    view.drain(&mut rx);
    result
}

async fn ask(session: &ChatSession, question: &str) -> Result<ExitCode> {
    let view = make_view();
    Ok(match turn(session, &view, question).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}

async fn chat(session: &ChatSession, skip_validation: bool) -> Result<ExitCode> {
    let view = make_view();
    let mut rx = session.subscribe();
    let client = session.client();

    println!(
        "{} {}",
        "Billing assistant".bold(),
        "(type /quit to leave, /settings for status)".dimmed()
    );

    if !client.has_credential()? {
        session.notice(ChatError::ConfigurationRequired.user_message(), true);
    } else if !skip_validation {
        let spinner = Spinner::default();
        spinner.start("Checking API key...");
        let outcome = client.revalidate().await;
        spinner.finish();
        match outcome {
            Ok(v) => session.notice(format!("Connected. Using model {}.", v.model), false),
            Err(e) => session.notice(e.user_message(), true),
        }
    }
    view.drain(&mut rx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = String::new();

    loop {
        view.prompt(!pending.is_empty());
        let Some(line) = lines.next_line().await? else {
            break;
        };

        // A trailing backslash continues the message on the next line.
        if let Some(head) = line.strip_suffix('\\') {
            pending.push_str(head);
            pending.push('\n');
            continue;
        }
        pending.push_str(&line);
        let text = std::mem::take(&mut pending);
        let text = text.trim();

        if text.is_empty() {
            continue;
        }
        if let Some(cmd) = text.strip_prefix('/') {
            if !slash_command(session, cmd).await {
                break;
            }
            view.drain(&mut rx);
            continue;
        }
        // Errors are already posted to the thread as notices.
        let _ = turn(session, &view, text).await;
        // Events were rendered by `turn`; discard the copies on this receiver.
        while rx.try_recv().is_ok() {}
    }

    info!(messages = session.transcript().len(), "chat closed");
    Ok(ExitCode::SUCCESS)
}

/// Handles `/cmd`; returns `false` to leave the chat.
async fn slash_command(session: &ChatSession, cmd: &str) -> bool {
    let client = session.client();
    let (name, arg) = cmd.split_once(' ').unwrap_or((cmd, ""));
    match name {
        "quit" | "exit" | "q" => return false,
        "models" => match client.available_models().await {
            Ok(models) => session.notice(
                format!("Available models (current: {}):\n  {}", client.current_model(), models.join("\n  ")),
                false,
            ),
            Err(e) => session.notice(e.user_message(), true),
        },
        "model" => match client.select_model(arg) {
            Ok(m) => session.notice(format!("Default model set to {m}."), false),
            Err(e) => session.notice(e.user_message(), true),
        },
        "settings" => match client.has_credential() {
            Ok(has_key) => session.notice(status_line(client, has_key), false),
            Err(e) => session.notice(e.user_message(), true),
        },
        other => session.notice(format!("Unknown command /{other}"), true),
    }
    true
}

fn status_line(client: &CompletionClient, has_key: bool) -> String {
    format!(
        "API key: {}\nModel: {}\nFallbacks: {}",
        if has_key { "configured" } else { "not configured" },
        client.current_model(),
        client.config().fallback_models.join(", ")
    )
}

fn print_context(session: &ChatSession) -> Result<ExitCode> {
    match session.context() {
        ContextSnapshot::Available(payload) => {
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::SUCCESS)
        }
        ContextSnapshot::Unavailable { reason } => {
            eprintln!("{} {reason}", "warning".yellow().bold());
            println!("{DATA_UNAVAILABLE}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn settings(client: &CompletionClient, cmd: SettingsCommand) -> Result<ExitCode> {
    let failed = |e: ChatError| -> Result<ExitCode> {
        eprintln!("{} {}", "error".red().bold(), e.user_message());
        Ok(ExitCode::FAILURE)
    };

    match cmd {
        SettingsCommand::Show => println!("{}", status_line(client, client.has_credential()?)),
        SettingsCommand::SetKey { key } => match client.configure(&key).await {
            Ok(v) => println!(
                "{} key stored, using model {} ({} models available, {} ms)",
                "ok".green().bold(),
                v.model,
                v.available_models.len(),
                v.latency_ms
            ),
            Err(e) => return failed(e),
        },
        SettingsCommand::Validate => match client.check_stored_credential().await {
            Ok(report) => {
                let label = match report.outcome {
                    CredentialOutcome::Verified => "verified".green().bold(),
                    _ => format!("{:?}", report.outcome).red().bold(),
                };
                println!("{label} {} ({} ms)", report.message, report.latency_ms);
                if !report.is_verified() {
                    return Ok(ExitCode::FAILURE);
                }
            }
            Err(e) => return failed(e),
        },
        SettingsCommand::Models => match client.available_models().await {
            Ok(models) => {
                let current = client.current_model();
                for m in models {
                    let marker = if m == current { "*" } else { " " };
                    println!("{marker} {m}");
                }
            }
            Err(e) => return failed(e),
        },
        SettingsCommand::UseModel { name } => match client.select_model(&name) {
            Ok(m) => println!("default model: {m}"),
            Err(e) => return failed(e),
        },
        SettingsCommand::ClearKey => {
            client.clear_credential()?;
            println!("key removed");
        }
    }
    Ok(ExitCode::SUCCESS)
}
