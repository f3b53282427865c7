use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;

/// Which chat persona the session talks to. Each kind has its own ask
/// endpoint and canned texts; upload and health are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantKind {
    #[default]
    Documents,
    Math,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseAssistantKindError {
    message: String,
}

impl fmt::Display for ParseAssistantKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseAssistantKindError {}

impl FromStr for AssistantKind {
    type Err = ParseAssistantKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "documents" | "docs" | "chat" => Ok(AssistantKind::Documents),
            "math" => Ok(AssistantKind::Math),
            _ =>
                Err(ParseAssistantKindError {
                    message: format!("Invalid assistant kind: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for AssistantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssistantKind::Documents => write!(f, "documents"),
            AssistantKind::Math => write!(f, "math"),
        }
    }
}

impl AssistantKind {
    pub fn ask_path(&self) -> &'static str {
        match self {
            AssistantKind::Documents => "/api/ask",
            AssistantKind::Math => "/api/math",
        }
    }

    pub fn welcome(&self) -> &'static str {
        match self {
            AssistantKind::Documents =>
                "Hi! I can answer questions about your uploaded documents. Upload a PDF/TXT/DOCX and ask a question below.",
            AssistantKind::Math =>
                "Hi! I can help you solve math problems. Type any equation or question below.",
        }
    }

    /// Assistant message appended after an upload batch settles.
    pub fn upload_nudge(&self, total: usize) -> String {
        let subject = if total > 1 {
            "Your documents are indexed."
        } else {
            "Your document is indexed."
        };
        let ask = match self {
            AssistantKind::Documents => "Ask a question to query them!",
            AssistantKind::Math => "Ask a math question to query them!",
        };
        format!("{} {}", subject, ask)
    }

    pub fn thinking_label(&self) -> &'static str {
        match self {
            AssistantKind::Documents => "Thinking…",
            AssistantKind::Math => "Calculating…",
        }
    }
}
