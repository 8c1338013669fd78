//! Request and response shapes of the processing service.

use crate::error::OperationError;
use crate::model::FileHandle;
use crate::registry::ActionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fallback failure message when the service gives none.
pub const FALLBACK_FAILURE: &str = "API request failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file: FileHandle,
    pub save_as: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveTextRequest {
    pub input_pdf: String,
    pub output_pdf: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractCharactersRequest {
    pub input_pdf: String,
    pub json_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractLinesRequest {
    pub input_pdf: String,
    pub line_db_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslateArabicRequest {
    pub line_db_input: String,
    pub ar_line_db_output: String,
    pub max_workers: i64,
    pub timeout_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconstructEnglishRequest {
    pub json_input: String,
    pub text_removed_pdf: String,
    pub output_pdf: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconstructArabicRequest {
    pub ar_line_db_input: String,
    pub base_pdf: String,
    pub output_pdf: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisualizeLinesRequest {
    pub input_pdf: String,
    pub line_db_input: String,
    pub visualized_pdf: String,
}

/// A fully parameterised remote operation, one variant per [`ActionId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Upload(UploadRequest),
    RemoveText(RemoveTextRequest),
    ExtractCharacters(ExtractCharactersRequest),
    ExtractLines(ExtractLinesRequest),
    TranslateArabic(TranslateArabicRequest),
    ReconstructEnglish(ReconstructEnglishRequest),
    ReconstructArabic(ReconstructArabicRequest),
    VisualizeLines(VisualizeLinesRequest),
}

impl Operation {
    pub fn action(&self) -> ActionId {
        match self {
            Operation::Upload(_) => ActionId::Upload,
            Operation::RemoveText(_) => ActionId::RemoveText,
            Operation::ExtractCharacters(_) => ActionId::ExtractCharacters,
            Operation::ExtractLines(_) => ActionId::ExtractLines,
            Operation::TranslateArabic(_) => ActionId::TranslateArabic,
            Operation::ReconstructEnglish(_) => ActionId::ReconstructEnglish,
            Operation::ReconstructArabic(_) => ActionId::ReconstructArabic,
            Operation::VisualizeLines(_) => ActionId::VisualizeLines,
        }
    }

    /// Service route, relative to the API base.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Operation::Upload(_) => "/api/upload",
            Operation::RemoveText(_) => "/api/remove-text",
            Operation::ExtractCharacters(_) => "/api/extract-characters",
            Operation::ExtractLines(_) => "/api/extract-lines",
            Operation::TranslateArabic(_) => "/api/translate/arabic",
            Operation::ReconstructEnglish(_) => "/api/reconstruct/english",
            Operation::ReconstructArabic(_) => "/api/reconstruct/arabic",
            Operation::VisualizeLines(_) => "/api/visualize-lines",
        }
    }
}

/// Uniform response envelope: `{ ok, message, ... }`.
///
/// Fields other than `ok` / `message` / `detail` are kept verbatim in
/// `payload` (`output`, `file`, `preview`, `summary`, `files`, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ServiceResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            detail: None,
            payload: Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            ..Self::success(message)
        }
    }

    /// Attach an extra payload field.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// The message to surface when the service reported failure.
    pub fn failure_message(&self) -> String {
        if !self.message.trim().is_empty() {
            self.message.clone()
        } else if let Some(detail) = self.detail.as_ref().filter(|d| !d.trim().is_empty()) {
            detail.clone()
        } else {
            FALLBACK_FAILURE.to_string()
        }
    }

    /// `Ok(self)` when `ok` is true, otherwise a [`OperationError::Rejected`].
    pub fn into_result(self) -> Result<Self, OperationError> {
        if self.ok {
            Ok(self)
        } else {
            Err(OperationError::rejected(self.failure_message()))
        }
    }

    /// The produced file, from `output` (processing steps) or `file` (upload).
    pub fn produced_file(&self) -> Option<FileInfo> {
        ["output", "file"]
            .iter()
            .filter_map(|k| self.payload.get(*k))
            .find_map(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// A file in the service's storage directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub filename: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub abs_path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_envelope_and_keeps_payload() {
        let r: ServiceResponse = serde_json::from_value(json!({
            "ok": true,
            "message": "Text removed",
            "output": {
                "filename": "input_text_removed.pdf",
                "path": "/api/download?file=input_text_removed.pdf",
                "absPath": "/srv/storage/input_text_removed.pdf",
                "size": 1024,
                "modifiedAt": null
            }
        }))
        .unwrap();
        assert!(r.ok);
        let file = r.produced_file().unwrap();
        assert_eq!(file.filename, "input_text_removed.pdf");
        assert_eq!(file.size, 1024);
    }

    #[test]
    fn failure_message_precedence() {
        let with_message = ServiceResponse::failure("Removal failed");
        assert_eq!(with_message.failure_message(), "Removal failed");

        let mut with_detail = ServiceResponse::failure("");
        with_detail.detail = Some("File not found: input.pdf".into());
        assert_eq!(with_detail.failure_message(), "File not found: input.pdf");

        assert_eq!(ServiceResponse::failure("").failure_message(), FALLBACK_FAILURE);
    }

    #[test]
    fn into_result_rejects_not_ok() {
        let err = ServiceResponse::failure("disk full").into_result().unwrap_err();
        assert_eq!(err, OperationError::rejected("disk full"));
        assert!(ServiceResponse::success("fine").into_result().is_ok());
    }

    #[test]
    fn translate_request_body_shape() {
        let body = serde_json::to_value(TranslateArabicRequest {
            line_db_input: "line_db.json".into(),
            ar_line_db_output: "ar_line_db.json".into(),
            max_workers: 2,
            timeout_seconds: 120,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "line_db_input": "line_db.json",
                "ar_line_db_output": "ar_line_db.json",
                "max_workers": 2,
                "timeout_seconds": 120
            })
        );
    }

    #[test]
    fn operations_map_to_actions_and_routes() {
        let op = Operation::ReconstructArabic(ReconstructArabicRequest {
            ar_line_db_input: "ar_line_db.json".into(),
            base_pdf: "input_text_removed.pdf".into(),
            output_pdf: "arabic_reconstructed_input.pdf".into(),
        });
        assert_eq!(op.action(), ActionId::ReconstructArabic);
        assert_eq!(op.endpoint(), "/api/reconstruct/arabic");
    }
}
