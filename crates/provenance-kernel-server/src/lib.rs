//! # Provenance Kernel Server
//!
//! JSON over HTTP in front of a [`Kernel`]. Request handling is a thin
//! mapping: each route calls one kernel operation and maps
//! [`KernelError`](provenance_kernel::KernelError) to a status code via
//! [`ApiError`].

use std::sync::Arc;

use provenance_kernel::log::LogClient;
use provenance_kernel::Kernel;

pub mod error;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::router;

/// The log behind the server, chosen at startup.
pub type SharedLog = Arc<dyn LogClient>;

/// Shared server state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub kernel: Arc<Kernel<SharedLog>>,
}

impl AppState {
    pub fn new(kernel: Kernel<SharedLog>) -> Self {
        Self {
            kernel: Arc::new(kernel),
        }
    }
}
