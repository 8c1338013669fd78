//! Execution records and per-step form data.

use crate::registry::{DefaultValue, InputKind, InputSpec, StepDefinition, StepId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ── Execution ────────────────────────────────────────────────────────────

/// Lifecycle of one step execution.
///
/// ```text
/// idle ──▶ running ──▶ success
///            ▲    └──▶ error
///            └──────────┘  (any terminal state may start a fresh attempt)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
        })
    }
}

/// The latest execution attempt of a step.
///
/// Only the most recent attempt is kept: starting a new one replaces the
/// record wholesale, logs included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub step: StepId,
    pub status: ExecutionStatus,
    /// Append-only within an attempt.
    pub logs: Vec<String>,
    /// Payload of the last successful invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Set only while `status` is [`ExecutionStatus::Error`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// A fresh `running` record whose log holds only `first_line`.
    pub fn started(step: StepId, first_line: impl Into<String>) -> Self {
        Self {
            step,
            status: ExecutionStatus::Running,
            logs: vec![first_line.into()],
            result: None,
            error: None,
        }
    }
}

// ── Form data ────────────────────────────────────────────────────────────

/// A local file bound to a `file` input.
///
/// Holding a `FileHandle` means a concrete, readable file was chosen; a bare
/// filename typed into a text box is a [`FormValue::Text`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    path: PathBuf,
    name: String,
}

impl FileHandle {
    /// Bind an existing regular file.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Original filename, as sent in the multipart upload.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the filename passes an `accept` suffix filter such as `.pdf`.
    pub fn matches_accept(&self, accept: &str) -> bool {
        accept
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .any(|a| self.name.to_lowercase().ends_with(&a.to_lowercase()))
    }
}

/// A value entered for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FormValue {
    File(FileHandle),
    Text(String),
    Number(i64),
    /// Selected radio option.
    Radio(String),
}

impl FormValue {
    /// String content of a text or radio value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) | FormValue::Radio(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            FormValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            FormValue::File(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this value satisfies an input of `kind`.
    ///
    /// A `file` input needs a bound [`FileHandle`]; other inputs need a
    /// non-empty value.
    pub fn satisfies(&self, kind: &InputKind) -> bool {
        match (kind, self) {
            (InputKind::File { .. }, FormValue::File(_)) => true,
            (InputKind::File { .. }, _) => false,
            (_, FormValue::Text(s) | FormValue::Radio(s)) => !s.trim().is_empty(),
            (_, FormValue::Number(_)) => true,
            (_, FormValue::File(_)) => false,
        }
    }

    fn from_default(kind: &InputKind, default: DefaultValue) -> Self {
        match (kind, default) {
            (_, DefaultValue::Number(n)) => FormValue::Number(n),
            (InputKind::Radio { .. }, DefaultValue::Text(s)) => FormValue::Radio(s.to_string()),
            (_, DefaultValue::Text(s)) => FormValue::Text(s.to_string()),
        }
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

impl From<i64> for FormValue {
    fn from(n: i64) -> Self {
        FormValue::Number(n)
    }
}

impl From<FileHandle> for FormValue {
    fn from(f: FileHandle) -> Self {
        FormValue::File(f)
    }
}

/// Values entered for one step, keyed by input id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormDataRecord {
    values: BTreeMap<String, FormValue>,
}

impl FormDataRecord {
    /// A record holding the declared default of every input of `step`.
    pub fn seeded(step: &StepDefinition) -> Self {
        let values = step
            .all_inputs()
            .into_iter()
            .filter_map(|input| {
                input
                    .default
                    .map(|d| (input.id.to_string(), FormValue::from_default(&input.kind, d)))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, id: &str) -> Option<&FormValue> {
        self.values.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(FormValue::as_str)
    }

    pub fn number(&self, id: &str) -> Option<i64> {
        self.get(id).and_then(FormValue::as_number)
    }

    pub fn file(&self, id: &str) -> Option<&FileHandle> {
        self.get(id).and_then(FormValue::as_file)
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<FormValue>) {
        self.values.insert(id.into(), value.into());
    }

    /// Overwrite the given entries, leaving the others untouched.
    pub fn merge(&mut self, edits: impl IntoIterator<Item = (String, FormValue)>) {
        self.values.extend(edits);
    }

    /// Ids of `inputs` that have no acceptable value in this record.
    pub fn missing(&self, inputs: &[InputSpec]) -> Vec<&'static str> {
        inputs
            .iter()
            .filter(|input| {
                !self
                    .get(input.id)
                    .is_some_and(|v| v.satisfies(&input.kind))
            })
            .map(|input| input.id)
            .collect()
    }
}
