use async_trait::async_trait;
use learning_assistant::api::{ ApiError, HealthResponse, RagBackend };
use learning_assistant::config::ClientConfig;
use learning_assistant::models::chat::{ AskRequest, AskResponse, Role, Source };
use learning_assistant::models::upload::{ UploadFile, UploadResponse };
use learning_assistant::session::{ SessionController, SessionEvent, UploadReport };
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct ScriptedBackend;

#[async_trait]
impl RagBackend for ScriptedBackend {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ApiError> {
        assert_eq!(request.question, "What is in the report?");
        Ok(AskResponse {
            answer: "It contains X.".to_string(),
            sources: Some(vec![Source {
                title: Some("doc.pdf".to_string()),
                score: Some(0.87),
                ..Source::default()
            }]),
        })
    }

    async fn upload(&self, file: &UploadFile) -> Result<UploadResponse, ApiError> {
        match file.name.as_str() {
            "fileA.pdf" => Ok(UploadResponse { ok: true, detail: None }),
            _ => Err(ApiError::Transport("413 Too Large".to_string())),
        }
    }

    async fn health(&self) -> Result<HealthResponse, ApiError> {
        Ok(HealthResponse { status: "ok".to_string() })
    }
}

#[tokio::test]
async fn ask_end_to_end() {
    let (session, _events) = SessionController::new(ClientConfig::default(), Arc::new(ScriptedBackend));
    let welcome = session.messages().await;
    assert_eq!(welcome.len(), 1);

    session.submit_question("What is in the report?").await.unwrap();

    let transcript: Vec<(Role, String)> = session
        .messages().await
        .into_iter()
        .map(|m| (m.role, m.content))
        .collect();
    assert_eq!(
        transcript,
        vec![
            (Role::Assistant, welcome[0].content.clone()),
            (Role::User, "What is in the report?".to_string()),
            (Role::Assistant, "It contains X.".to_string())
        ]
    );
    assert_eq!(
        session.sources().await,
        vec![Source { title: Some("doc.pdf".to_string()), score: Some(0.87), ..Source::default() }]
    );
}

#[tokio::test(start_paused = true)]
async fn upload_end_to_end() {
    let (session, mut events) = SessionController::new(ClientConfig::default(), Arc::new(ScriptedBackend));
    let files = vec![
        UploadFile::new("fileA.pdf", b"alpha".to_vec()),
        UploadFile::new("fileB.pdf", b"beta".to_vec())
    ];

    let report = session.upload_files(files).await.unwrap().unwrap();
    assert!(matches!(report, UploadReport::Completed(ref s) if s.indexed == 1 && s.total == 2));

    let status = session.upload_status().await.unwrap();
    assert!(status.contains("1/2"), "status was {status}");
    assert!(status.contains("413 Too Large"), "status was {status}");
    assert!(!session.is_uploading().await);
    assert_eq!(session.messages().await.len(), 2);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(session.upload_status().await, None);

    let mut saw_reset = false;
    let mut last_status = None;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::UploadInputReset => saw_reset = true,
            SessionEvent::UploadStatusChanged(status) => last_status = Some(status),
            _ => {}
        }
    }
    assert!(saw_reset);
    assert_eq!(last_status, Some(None));
}
