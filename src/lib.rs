pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod repl;
pub mod session;

use api::HttpBackend;
use cli::{ Args, Command };
use config::ClientConfig;
use log::info;
use models::chat::Message;
use session::SessionController;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ClientConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("API Base URL: {}", config.display_base());
    info!("Assistant: {}", config.assistant);
    info!("Top K: {}", config.top_k);
    info!("Temperature: {}", config.temperature);
    info!("History Window: {}", config.history_window);
    info!("Send Policy: {:?}", config.send_policy);
    if let Some(name) = &config.student_name {
        info!("Student Name: {}", name);
    }
    info!("-------------------------");

    let backend = Arc::new(HttpBackend::new(&config));
    let (session, events) = SessionController::new(config, backend);

    match args.command.unwrap_or(Command::Chat) {
        Command::Chat => repl::run_interactive(session, events).await?,
        Command::Ask { question } => {
            drop(events);
            let reply: Message = session.submit_question(&question.join(" ")).await?;
            println!("{}", reply.content);
            let sources = session.sources().await;
            if !sources.is_empty() {
                println!("\n{}", repl::render_sources(&sources));
            }
        }
        Command::Upload { files } => {
            drop(events);
            let files = repl::load_files(&files).await;
            match session.upload_files(files).await? {
                Some(report) => println!("{}", report),
                None => println!("No eligible files to upload."),
            }
        }
        Command::Health => {
            drop(events);
            let report = session.health_check().await;
            println!("{}", report);
            if !report.is_reachable() {
                return Err(report.to_string().into());
            }
        }
    }

    Ok(())
}
