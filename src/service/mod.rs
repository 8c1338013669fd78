//! The remote processing service.
//!
//! The PDF work itself (text removal, extraction, translation,
//! reconstruction, visualisation) happens in a separate service. The engine
//! only sees the [`ProcessingService`] trait, so tests can script responses
//! and hosts can route calls through their own transport.
//!
//! 1. [`types`] — one request struct per operation and the shared
//!    `{ ok, message, ... }` response envelope
//! 2. [`http`]  — [`HttpService`], the reqwest client for the real service

pub mod http;
pub mod types;

pub use http::HttpService;
pub use types::{FileInfo, Operation, ServiceResponse};

use crate::error::OperationError;
use async_trait::async_trait;

/// A processing backend.
///
/// `invoke` makes exactly one attempt; it never retries. A returned
/// `Ok(response)` may still carry `ok: false`, which callers turn into a
/// failure with [`ServiceResponse::into_result`].
#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// Run one pipeline operation.
    async fn invoke(&self, operation: &Operation) -> Result<ServiceResponse, OperationError>;

    /// Liveness probe.
    async fn health(&self) -> Result<ServiceResponse, OperationError>;

    /// Files currently in the service's storage.
    async fn list_files(&self) -> Result<Vec<FileInfo>, OperationError>;

    /// Where `file` can be downloaded from.
    fn download_url(&self, file: &str) -> String;
}
