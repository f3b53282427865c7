use clap::{ Parser, Subcommand };
use std::path::PathBuf;

use crate::config::assistant::AssistantKind;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Args ---
    /// Base address of the RAG backend (e.g., http://localhost:8000)
    #[arg(long, env = "API_BASE_URL", default_value = "http://localhost:8000")]
    pub api_base_url: String,

    /// Assistant to talk to (documents, math)
    #[arg(long, env = "ASSISTANT", default_value = "documents")]
    pub assistant: AssistantKind,

    // --- Retrieval Args ---
    /// Number of chunks the backend should retrieve per question (1-20)
    #[arg(long, env = "TOP_K", default_value = "5")]
    pub top_k: u32,

    /// Sampling temperature forwarded to the backend (0.0-2.0)
    #[arg(long, env = "TEMPERATURE", default_value = "0.1")]
    pub temperature: f32,

    /// Optional student name the backend uses to personalise answers.
    #[arg(long, env = "STUDENT_NAME")]
    pub student_name: Option<String>,

    // --- Session Args ---
    /// Seconds before the upload summary line is cleared.
    #[arg(long, env = "UPLOAD_STATUS_TTL_SECS", default_value = "5")]
    pub upload_status_ttl_secs: u64,

    /// Keep the question prompt open while an upload batch is still indexing.
    #[arg(long, env = "ALLOW_SEND_WHILE_UPLOADING", default_value = "false")]
    pub allow_send_while_uploading: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Interactive chat session (default)
    Chat,
    /// Ask a single question and print the answer with its sources
    Ask {
        /// Question text
        question: Vec<String>,
    },
    /// Upload and index one or more documents
    Upload {
        /// Files to upload (.pdf, .txt, .md, .docx)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Check that the backend is reachable
    Health,
}
