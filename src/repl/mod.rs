//! Line-oriented terminal front end. It only reads input, forwards it to the
//! session and prints whatever the session reports back.

use log::{ error, info, warn };
use std::error::Error;
use std::path::PathBuf;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, BufReader };
use tokio::sync::{ mpsc, oneshot };
use tokio::task::JoinSet;

use crate::config::assistant::AssistantKind;
use crate::models::chat::{ Message, Role, Source };
use crate::models::upload::UploadFile;
use crate::session::{ SessionController, SessionEvent };

const HELP: &str = "\
Type a question and press enter.
  /upload <file>...   upload and index documents (.pdf .txt .md .docx)
  /sources            show sources of the latest answer
  /health             ping the backend
  /help               show this help
  /quit               leave the session";

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Ask(String),
    Upload(Vec<PathBuf>),
    Sources,
    Health,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return ReplCommand::Ask(line.to_string());
        };
        let mut parts = rest.split_whitespace();
        match parts.next().unwrap_or("") {
            "upload" => ReplCommand::Upload(parts.map(PathBuf::from).collect()),
            "sources" => ReplCommand::Sources,
            "health" | "ping" => ReplCommand::Health,
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

pub fn render_message(message: &Message) -> String {
    match message.role {
        Role::User => format!("you> {}", message.content),
        role => format!("{}> {}", role, message.content),
    }
}

pub fn render_sources(sources: &[Source]) -> String {
    if sources.is_empty() {
        return "No sources yet.".to_string();
    }
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turns session events into printable lines. The thinking label is shown
/// once per question, when asking goes from false to true.
#[derive(Debug, Clone)]
pub struct EventPrinter {
    assistant: AssistantKind,
    asking: bool,
}

impl EventPrinter {
    pub fn new(assistant: AssistantKind) -> Self {
        Self { assistant, asking: false }
    }

    /// Text to print for an event, if any.
    pub fn render(&mut self, event: &SessionEvent) -> Option<String> {
        match event {
            // The user's own line is already on screen.
            SessionEvent::MessageAppended(m) if m.role == Role::User => None,
            SessionEvent::MessageAppended(m) => Some(render_message(m)),
            SessionEvent::SourcesReplaced(sources) if !sources.is_empty() =>
                Some(format!("sources:\n{}", render_sources(sources))),
            SessionEvent::BusyChanged { asking, .. } => {
                let started = *asking && !self.asking;
                self.asking = *asking;
                started.then(|| self.assistant.thinking_label().to_string())
            }
            SessionEvent::UploadStatusChanged(Some(status)) => Some(format!("[upload] {}", status)),
            SessionEvent::BackendStatus(report) => Some(format!("[backend] {}", report)),
            _ => None,
        }
    }
}

/// Reads every path, skipping the ones that cannot be read.
pub async fn load_files(paths: &[PathBuf]) -> Vec<UploadFile> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match UploadFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                eprintln!("Cannot read {}: {}", path.display(), e);
            }
        }
    }
    files
}

pub async fn run_interactive(
    session: SessionController,
    events: mpsc::UnboundedReceiver<SessionEvent>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    run_with_input(session, events, BufReader::new(tokio::io::stdin())).await
}

/// Runs the command loop over `input` until EOF or `/quit`. Upload batches
/// started from the loop are awaited before returning, and every event they
/// publish is printed.
pub async fn run_with_input<R>(
    session: SessionController,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    input: R
) -> Result<(), Box<dyn Error + Send + Sync>>
    where R: AsyncBufRead + Unpin
{
    let mut renderer = EventPrinter::new(session.config().assistant);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    // Pending status-clear timers hold a sender, so the channel may outlive
    // the loop. Shutdown drains what is queued and stops.
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                Some(event) = events.recv() => {
                    if let Some(text) = renderer.render(&event) {
                        println!("{}", text);
                    }
                }
                _ = &mut shutdown_rx => {
                    while let Ok(event) = events.try_recv() {
                        if let Some(text) = renderer.render(&event) {
                            println!("{}", text);
                        }
                    }
                    break;
                }
            }
        }
    });

    for message in session.messages().await {
        println!("{}", render_message(&message));
    }
    println!("(type /help for commands)");

    let mut uploads = JoinSet::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Ask(question) => {
                if let Err(e) = session.submit_question(&question).await {
                    println!("{}", e);
                }
            }
            ReplCommand::Upload(paths) => {
                let files = load_files(&paths).await;
                let session = session.clone();
                // Uploads run in the background so the prompt stays usable.
                uploads.spawn(async move {
                    match session.upload_files(files).await {
                        Ok(None) => println!("No eligible files to upload."),
                        Ok(Some(_)) => {}
                        Err(e) => println!("{}", e),
                    }
                });
            }
            ReplCommand::Sources => println!("{}", render_sources(&session.sources().await)),
            ReplCommand::Health => {
                session.health_check().await;
            }
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(cmd) => println!("Unknown command '/{}'. {}", cmd, HELP),
        }
    }

    if !uploads.is_empty() {
        info!("Waiting for {} upload batch(es) to settle", uploads.len());
    }
    while let Some(joined) = uploads.join_next().await {
        if let Err(e) = joined {
            error!("Upload batch task failed: {}", e);
        }
    }

    info!("Session closed");
    drop(session);
    let _ = shutdown_tx.send(());
    printer.await?;
    Ok(())
}
