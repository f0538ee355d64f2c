//! `herald repl` -- interactive session on stdin.
//!
//! Opens one session for `--user` on `--client`, starts the session
//! manager loops and the notification monitor, then dispatches every line
//! typed as a command. Lines starting with `:` are local:
//!
//! ```text
//! :reply <command-id> <text>   answer a pending prompt
//! :notify <secs> <message>     schedule a notification
//! :report                      manager status report
//! :reload                      drop cached records and rebuild arguments
//! :help                        this list
//! :quit                        log out and exit
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::Args;
use tokio::io::AsyncBufReadExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use herald_core::memory::{Directory, MemoryIdentityStore, MemoryKeyStore};
use herald_core::{BasicParser, NotificationQueue, Session, SessionContext, SessionManager};
use herald_services::{LogSink, NotificationMonitor};
use herald_types::records::{ClientRecord, UserRecord};
use herald_types::response::{DataKind, Response};

use super::{build_registry, load_config};

/// Arguments for the `herald repl` subcommand.
#[derive(Args)]
pub struct ReplArgs {
    /// User to open the session for.
    #[arg(short, long, default_value = "local")]
    pub user: String,

    /// Client identifier to open the session on.
    #[arg(long, default_value = "cli")]
    pub client: String,

    /// JSON directory of users, clients and API keys.
    ///
    /// Without one, a directory holding just `--user` and `--client` is used.
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Config file path (overrides auto-discovery).
    #[arg(short, long)]
    pub config: Option<String>,
}

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Quit,
    Help,
    Report,
    Reload,
    Reply { command_id: String, text: String },
    Notify { delay_secs: i64, message: String },
    Command(String),
    Invalid(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(local) = line.strip_prefix(':') else {
        return Some(Input::Command(line.to_string()));
    };
    let (word, rest) = local.split_once(char::is_whitespace).unwrap_or((local, ""));
    let rest = rest.trim();
    let input = match word {
        "quit" | "exit" => Input::Quit,
        "help" => Input::Help,
        "report" => Input::Report,
        "reload" => Input::Reload,
        "reply" => match rest.split_once(char::is_whitespace) {
            Some((id, text)) if !text.trim().is_empty() => Input::Reply {
                command_id: id.to_string(),
                text: text.trim().to_string(),
            },
            _ => Input::Invalid("usage: :reply <command-id> <text>".into()),
        },
        "notify" => match rest.split_once(char::is_whitespace) {
            Some((secs, message)) if !message.trim().is_empty() => match secs.parse::<i64>() {
                Ok(delay_secs) if delay_secs >= 0 => Input::Notify {
                    delay_secs,
                    message: message.trim().to_string(),
                },
                _ => Input::Invalid(format!("not a delay in seconds: {secs}")),
            },
            _ => Input::Invalid("usage: :notify <secs> <message>".into()),
        },
        other => Input::Invalid(format!("unknown command :{other} (try :help)")),
    };
    Some(input)
}

/// Load `path`, or build a directory with just the REPL's own user and client.
fn load_directory(path: Option<&Path>, user: &str, client: &str) -> anyhow::Result<Directory> {
    match path {
        Some(path) => Directory::load(path)
            .map_err(|e| anyhow::anyhow!("failed to load directory {}: {e}", path.display())),
        None => Ok(Directory {
            users: vec![UserRecord::new(user)],
            clients: vec![ClientRecord::new(client)],
            keys: Vec::new(),
        }),
    }
}

/// Human-readable rendering of a dispatch response.
fn render(response: &Response) -> String {
    let Some(data) = response.payload() else {
        return response
            .errors()
            .iter()
            .map(|e| format!("error [{}] {}", e.id, e.text))
            .collect::<Vec<_>>()
            .join("\n");
    };

    let mut out = data.text.clone();
    if let Some(options) = data.extra.get("options").and_then(|o| o.as_array()) {
        for (i, option) in options.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, option.as_str().unwrap_or_default()));
        }
    }
    if data.kind == DataKind::Response
        && let Some(uid) = data.extra.get("command_id").and_then(|v| v.as_str())
    {
        out.push_str(&format!("\n(answer with :reply {uid} <text>)"));
    }
    out
}

fn print_help() {
    println!("Commands:");
    println!("  :reply <command-id> <text>   answer a pending prompt");
    println!("  :notify <secs> <message>     schedule a notification");
    println!("  :report                      session manager report");
    println!("  :reload                      reload user and client records");
    println!("  :help                        show this help");
    println!("  :quit                        log out and exit");
    println!();
}

/// Run the REPL.
pub async fn run(args: ReplArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let directory = load_directory(args.directory.as_deref(), &args.user, &args.client)?;

    let identity = Arc::new(MemoryIdentityStore::from_directory(&directory));
    let keys = Arc::new(MemoryKeyStore::new(
        directory.keys.clone(),
        config.keys.rotation_period(),
    ));
    let queue = NotificationQueue::new();
    let monitor = NotificationMonitor::from_config(queue.clone(), Arc::new(LogSink), &config.notifications)?;

    let parser = Arc::new(BasicParser::new());
    let registry = build_registry(parser.as_ref(), &config)?;
    let ctx = SessionContext::new(config, Arc::new(registry), parser, identity, keys)
    .with_notifications(queue);
    let manager = SessionManager::new(ctx);

    let cancel = CancellationToken::new();
    manager.start(cancel.clone()).await;
    let monitor_cancel = cancel.clone();
    let monitor_handle = tokio::spawn(async move { monitor.start(monitor_cancel).await });

    let mut session = manager.open_session(&args.user, &args.client).await?;
    println!(
        "herald repl -- {} on {} (type :help for commands)",
        session.username(),
        session.client_id()
    );
    println!();

    let result = repl_loop(&manager, &mut session).await;

    if session.is_ready() {
        session.logout().await;
    }
    cancel.cancel();
    manager.shutdown().await;
    monitor_handle.await??;
    info!("repl finished");

    result?;
    println!("Goodbye.");
    Ok(())
}

async fn repl_loop(manager: &SessionManager, session: &mut Arc<Session>) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = tokio::io::BufReader::new(stdin).lines();

    loop {
        eprint!("> ");
        // Flush stderr so the prompt appears before blocking on read.
        use std::io::Write;
        std::io::stderr().flush().ok();

        let Some(line) = reader.next_line().await? else {
            break;
        };
        let Some(input) = parse_input(&line) else {
            continue;
        };

        if !session.is_ready() && input != Input::Quit {
            let username = session.username().to_string();
            let client_id = session.client_id().to_string();
            *session = manager.open_session(&username, &client_id).await?;
            println!("[session expired, opened a new one]");
        }

        match input {
            Input::Quit => break,
            Input::Help => print_help(),
            Input::Report => println!("{}", render(&manager.report())),
            Input::Reload => {
                session.reload();
                println!("[reloaded, records refresh on the next command]");
            }
            Input::Reply { command_id, text } => {
                println!("{}", render(&session.process_response(&command_id, &text).await));
            }
            Input::Notify {
                delay_secs,
                message,
            } => {
                let when = Utc::now() + chrono::Duration::seconds(delay_secs);
                let uid = session.notify(&message, "Reminder", when, "user");
                println!("[notification {uid} scheduled for {}]", when.to_rfc3339());
            }
            Input::Command(text) => println!("{}", render(&session.command(&text).await)),
            Input::Invalid(message) => eprintln!("{message}"),
        }
        println!();
    }
    Ok(())
}
