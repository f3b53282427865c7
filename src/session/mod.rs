//! Conversation session controller.
//!
//! Owns the chat transcript and latest sources for one chat view, sends at
//! most one question at a time, and fans uploads out concurrently before
//! folding their outcomes into a single status line. Front ends observe the
//! session through [`SessionEvent`]s and read snapshots of its state.

use log::{ debug, error, info, warn };
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{ mpsc, Mutex };
use tokio::task::JoinSet;

use crate::api::RagBackend;
use crate::config::{ ClientConfig, SendPolicy };
use crate::models::chat::{ AskRequest, Message, Source };
use crate::models::upload::{ UploadFile, UploadOutcome, UploadSummary };

pub const UPLOAD_IN_PROGRESS: &str = "Uploading & indexing…";
pub const ERROR_MARKER: &str = "⚠️";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    Asking,
    Uploading,
}

impl fmt::Display for BusyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusyReason::Asking => write!(f, "a question is still being answered"),
            BusyReason::Uploading => write!(f, "documents are still being indexed"),
        }
    }
}

/// Precondition failures. Backend failures never surface here; they end up
/// in the transcript or the status line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Question is empty")]
    EmptyQuestion,
    #[error("Session busy: {0}")]
    Busy(BusyReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    MessageAppended(Message),
    SourcesReplaced(Vec<Source>),
    BusyChanged {
        asking: bool,
        uploading: bool,
    },
    UploadStatusChanged(Option<String>),
    ScrollToBottom,
    /// The picker or input that launched an upload batch can be cleared.
    UploadInputReset,
    BackendStatus(HealthReport),
}

#[derive(Debug, Clone, PartialEq)]
pub enum HealthReport {
    Reachable {
        status: String,
        base_url: String,
    },
    Unreachable {
        error: String,
    },
}

impl HealthReport {
    pub fn is_reachable(&self) -> bool {
        matches!(self, HealthReport::Reachable { .. })
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthReport::Reachable { status, base_url } =>
                write!(f, "Backend OK ({}). {}", status, base_url),
            HealthReport::Unreachable { error } => write!(f, "Backend unreachable: {}", error),
        }
    }
}

/// Result of an upload batch that actually started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadReport {
    Completed(UploadSummary),
    /// The batch itself broke down, as opposed to individual files failing.
    Aborted(String),
}

impl fmt::Display for UploadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadReport::Completed(summary) => write!(f, "{}", summary),
            UploadReport::Aborted(reason) => write!(f, "Upload failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub sources: Vec<Source>,
    pub asking: bool,
    pub uploading: bool,
    pub upload_status: Option<String>,
    pub backend_status: Option<HealthReport>,
}

#[derive(Debug, Default)]
struct SessionState {
    messages: Vec<Message>,
    sources: Vec<Source>,
    asking: bool,
    uploading: bool,
    upload_status: Option<String>,
    // Bumped on every status write so a stale clear timer leaves newer text alone.
    upload_status_generation: u64,
    backend_status: Option<HealthReport>,
}

impl SessionState {
    fn history(&self, window: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(window);
        self.messages[start..].to_vec()
    }

    fn set_upload_status(&mut self, status: Option<String>) -> u64 {
        self.upload_status = status;
        self.upload_status_generation += 1;
        self.upload_status_generation
    }

    fn busy_event(&self) -> SessionEvent {
        SessionEvent::BusyChanged {
            asking: self.asking,
            uploading: self.uploading,
        }
    }
}

#[derive(Clone)]
pub struct SessionController {
    config: Arc<ClientConfig>,
    backend: Arc<dyn RagBackend>,
    state: Arc<Mutex<SessionState>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn RagBackend>
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = SessionState {
            messages: vec![Message::assistant(config.assistant.welcome())],
            ..SessionState::default()
        };
        let controller = Self {
            config: Arc::new(config),
            backend,
            state: Arc::new(Mutex::new(state)),
            events: tx,
        };
        (controller, rx)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn emit(&self, event: SessionEvent) {
        // A front end that stopped listening does not affect the session.
        let _ = self.events.send(event);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        SessionSnapshot {
            messages: state.messages.clone(),
            sources: state.sources.clone(),
            asking: state.asking,
            uploading: state.uploading,
            upload_status: state.upload_status.clone(),
            backend_status: state.backend_status.clone(),
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn sources(&self) -> Vec<Source> {
        self.state.lock().await.sources.clone()
    }

    pub async fn is_asking(&self) -> bool {
        self.state.lock().await.asking
    }

    pub async fn is_uploading(&self) -> bool {
        self.state.lock().await.uploading
    }

    pub async fn upload_status(&self) -> Option<String> {
        self.state.lock().await.upload_status.clone()
    }

    pub async fn can_send(&self) -> bool {
        let state = self.state.lock().await;
        self.blocking_reason(&state).is_none()
    }

    fn blocking_reason(&self, state: &SessionState) -> Option<BusyReason> {
        if state.asking {
            return Some(BusyReason::Asking);
        }
        if state.uploading && self.config.send_policy == SendPolicy::BlockWhileEitherBusy {
            return Some(BusyReason::Uploading);
        }
        None
    }

    /// Sends one question and appends the reply (or a visible error) to the
    /// transcript. Returns the appended assistant message.
    ///
    /// A second submission while one is pending is rejected, never queued.
    pub async fn submit_question(&self, text: &str) -> Result<Message, SessionError> {
        let question = text.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let (request, user_message, busy) = {
            let mut state = self.state.lock().await;
            if let Some(reason) = self.blocking_reason(&state) {
                return Err(SessionError::Busy(reason));
            }
            let request = AskRequest {
                question: question.to_string(),
                history: state.history(self.config.history_window),
                top_k: self.config.top_k,
                temperature: self.config.temperature,
                student_name: self.config.student_name.clone(),
            };
            let user_message = Message::user(question);
            state.messages.push(user_message.clone());
            state.asking = true;
            (request, user_message, state.busy_event())
        };
        self.emit(SessionEvent::MessageAppended(user_message));
        self.emit(busy);

        let result = self.backend.ask(&request).await;

        let (reply, sources, busy) = {
            let mut state = self.state.lock().await;
            let (reply, sources) = match result {
                Ok(response) => {
                    let sources = response.sources.unwrap_or_default();
                    debug!("Answer received with {} source(s)", sources.len());
                    state.sources = sources.clone();
                    (Message::assistant(response.answer), Some(sources))
                }
                Err(e) => {
                    warn!("Ask failed: {}", e);
                    (Message::assistant(format!("{} {}", ERROR_MARKER, e)), None)
                }
            };
            state.messages.push(reply.clone());
            state.asking = false;
            (reply, sources, state.busy_event())
        };

        self.emit(SessionEvent::MessageAppended(reply.clone()));
        if let Some(sources) = sources {
            self.emit(SessionEvent::SourcesReplaced(sources));
        }
        self.emit(busy);
        self.emit(SessionEvent::ScrollToBottom);
        Ok(reply)
    }

    /// Uploads every eligible file concurrently and waits for all of them to
    /// settle. Returns `Ok(None)` when there was nothing eligible to send.
    pub async fn upload_files(
        &self,
        files: Vec<UploadFile>
    ) -> Result<Option<UploadReport>, SessionError> {
        let (eligible, skipped): (Vec<_>, Vec<_>) = files
            .into_iter()
            .partition(|f| f.is_eligible());
        for file in &skipped {
            warn!("Skipping '{}': unsupported file type", file.name);
        }
        if eligible.is_empty() {
            return Ok(None);
        }

        let busy = {
            let mut state = self.state.lock().await;
            if state.uploading {
                return Err(SessionError::Busy(BusyReason::Uploading));
            }
            state.uploading = true;
            state.set_upload_status(Some(UPLOAD_IN_PROGRESS.to_string()));
            state.busy_event()
        };
        self.emit(busy);
        self.emit(SessionEvent::UploadStatusChanged(Some(UPLOAD_IN_PROGRESS.to_string())));

        let total = eligible.len();
        info!("Uploading {} file(s)", total);
        let report = match self.fan_out_uploads(eligible).await {
            Ok(outcomes) => UploadReport::Completed(UploadSummary::from_outcomes(&outcomes)),
            Err(reason) => {
                error!("Upload batch failed: {}", reason);
                UploadReport::Aborted(reason)
            }
        };
        let status = report.to_string();

        let nudge = match &report {
            UploadReport::Completed(_) => Some(Message::assistant(self.config.assistant.upload_nudge(total))),
            UploadReport::Aborted(_) => None,
        };

        let (generation, busy) = {
            let mut state = self.state.lock().await;
            if let Some(nudge) = &nudge {
                state.messages.push(nudge.clone());
            }
            state.uploading = false;
            (state.set_upload_status(Some(status.clone())), state.busy_event())
        };

        self.emit(SessionEvent::UploadStatusChanged(Some(status)));
        if let Some(nudge) = nudge {
            self.emit(SessionEvent::MessageAppended(nudge));
        }
        self.emit(busy);
        self.schedule_status_clear(generation);
        self.emit(SessionEvent::UploadInputReset);

        Ok(Some(report))
    }

    async fn fan_out_uploads(&self, files: Vec<UploadFile>) -> Result<Vec<UploadOutcome>, String> {
        let mut set = JoinSet::new();
        for file in files {
            let backend = Arc::clone(&self.backend);
            set.spawn(async move {
                match backend.upload(&file).await {
                    Ok(resp) if resp.ok => UploadOutcome::Indexed,
                    Ok(resp) => {
                        let reason = resp.detail.unwrap_or_else(|| "not indexed".to_string());
                        warn!("'{}' was not indexed: {}", file.name, reason);
                        UploadOutcome::Failed(reason)
                    }
                    Err(e) => {
                        warn!("Upload of '{}' failed: {}", file.name, e);
                        UploadOutcome::Failed(e.to_string())
                    }
                }
            });
        }

        let mut outcomes = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            outcomes.push(joined.map_err(|e| e.to_string())?);
        }
        Ok(outcomes)
    }

    fn schedule_status_clear(&self, generation: u64) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let ttl = self.config.upload_status_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut state = state.lock().await;
            if state.upload_status_generation == generation {
                state.set_upload_status(None);
                let _ = events.send(SessionEvent::UploadStatusChanged(None));
            }
        });
    }

    /// Pings the backend once and records the result as the session's
    /// backend status.
    pub async fn health_check(&self) -> HealthReport {
        let report = match self.backend.health().await {
            Ok(res) => HealthReport::Reachable {
                status: res.status,
                base_url: self.config.display_base(),
            },
            Err(e) => {
                warn!("Health check failed: {}", e);
                HealthReport::Unreachable { error: e.to_string() }
            }
        };
        self.state.lock().await.backend_status = Some(report.clone());
        self.emit(SessionEvent::BackendStatus(report.clone()));
        report
    }
}
