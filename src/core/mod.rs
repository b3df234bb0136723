// src/core/mod.rs
//! Request plumbing shared by every store: storage, transport, the request
//! layer, error normalization and retry.

pub mod errors;
pub mod request;
pub mod retry;
pub mod storage;
pub mod transport;

pub use errors::{to_user_message, ApiError, ErrorInfo};
pub use request::{ApiClient, RequestOptions};
pub use retry::{with_retry, RetryPolicy, RetryableError};
pub use storage::{FileStorage, MemoryStorage, PersistedSession, SessionPersistence, Storage};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
