use serde::{ Serialize, Deserialize };
use std::fmt;
use std::path::Path;

/// Extensions the backend indexer accepts.
pub const ELIGIBLE_EXTENSIONS: [&str; 4] = ["pdf", "txt", "md", "docx"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn is_eligible(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ELIGIBLE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Indexed,
    Failed(String),
}

impl UploadOutcome {
    pub fn is_indexed(&self) -> bool {
        matches!(self, UploadOutcome::Indexed)
    }
}

/// Tally of a settled upload batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadSummary {
    pub indexed: usize,
    pub total: usize,
    /// Distinct failure reasons in first-seen order.
    pub errors: Vec<String>,
}

impl UploadSummary {
    pub fn from_outcomes(outcomes: &[UploadOutcome]) -> Self {
        let indexed = outcomes.iter().filter(|o| o.is_indexed()).count();
        let mut errors: Vec<String> = Vec::new();
        for outcome in outcomes {
            if let UploadOutcome::Failed(reason) = outcome {
                if !errors.iter().any(|e| e == reason) {
                    errors.push(reason.clone());
                }
            }
        }
        Self { indexed, total: outcomes.len(), errors }
    }

    pub fn all_indexed(&self) -> bool {
        self.indexed == self.total
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.all_indexed() {
            return write!(f, "Uploaded & indexed {}/{} ✅", self.indexed, self.total);
        }
        write!(f, "Indexed {}/{}.", self.indexed, self.total)?;
        if !self.errors.is_empty() {
            write!(f, " Errors: {}", self.errors.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_by_extension() {
        assert!(UploadFile::new("notes.PDF", vec![]).is_eligible());
        assert!(UploadFile::new("a.md", vec![]).is_eligible());
        assert!(UploadFile::new("report.docx", vec![]).is_eligible());
        assert!(!UploadFile::new("image.png", vec![]).is_eligible());
        assert!(!UploadFile::new("README", vec![]).is_eligible());
    }

    #[test]
    fn test_outcome_is_indexed() {
        assert!(UploadOutcome::Indexed.is_indexed());
        assert!(!UploadOutcome::Failed("413 Too Large".into()).is_indexed());
    }

    #[test]
    fn test_summary_all_indexed() {
        let summary = UploadSummary::from_outcomes(&[UploadOutcome::Indexed, UploadOutcome::Indexed]);
        assert!(summary.all_indexed());
        assert_eq!(summary.to_string(), "Uploaded & indexed 2/2 ✅");
    }

    #[test]
    fn test_summary_partial_dedupes_reasons() {
        let summary = UploadSummary::from_outcomes(&[
            UploadOutcome::Failed("500 Internal Server Error: boom".into()),
            UploadOutcome::Indexed,
            UploadOutcome::Failed("500 Internal Server Error: boom".into()),
            UploadOutcome::Failed("Processing failed".into()),
        ]);
        assert!(!summary.all_indexed());
        assert_eq!(
            summary.to_string(),
            "Indexed 1/4. Errors: 500 Internal Server Error: boom, Processing failed"
        );
    }

    #[test]
    fn test_upload_response_soft_failure() {
        let res: UploadResponse = serde_json::from_str(r#"{"ok":false,"detail":"Processing failed"}"#).unwrap();
        assert!(!res.ok);
        assert_eq!(res.detail.as_deref(), Some("Processing failed"));
    }
}
