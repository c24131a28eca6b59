//! Per-request context propagation
//!
//! A `RequestContext` is created once per inbound request and installed as a
//! tokio task-local for the request future. Code anywhere below that future
//! reaches it through the free functions of this module, without threading it
//! through every call. Tasks started with [`spawn`] share the same context by
//! reference, so a value set in one is visible in the others.

pub mod middleware;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;

use crate::connection::DbConnection;

pub use middleware::{RequestContextLayer, RequestContextService, RequestStats};

tokio::task_local! {
    static CURRENT: Arc<RequestContext>;
}

/// Mutable per-request state
#[derive(Debug)]
pub struct RequestContext {
    request_id: String,
    connection: DbConnection,
    data: Mutex<HashMap<String, Value>>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, connection: DbConnection) -> Self {
        Self {
            request_id: request_id.into(),
            connection,
            data: Mutex::new(HashMap::new()),
        }
    }

    /// Context with a fresh v4 request id
    pub fn generate(connection: DbConnection) -> Self {
        Self::new(Uuid::new_v4().to_string(), connection)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Connection handle of the request (possibly empty)
    pub fn connection(&self) -> &DbConnection {
        &self.connection
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock_data().get(key).cloned()
    }

    /// Store a value, returning the previous one
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.lock_data().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock_data().remove(key)
    }

    fn lock_data(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Run `fut` with `ctx` as the current context
pub async fn scope<F: Future>(ctx: Arc<RequestContext>, fut: F) -> F::Output {
    CURRENT.scope(ctx, fut).await
}

/// The current context, if running inside one
pub fn current() -> Option<Arc<RequestContext>> {
    CURRENT.try_with(Arc::clone).ok()
}

/// Spawn a task that inherits the current context
///
/// Outside a context this is a plain `tokio::spawn`.
pub fn spawn<F>(fut: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match current() {
        Some(ctx) => tokio::spawn(CURRENT.scope(ctx, fut)),
        None => tokio::spawn(fut),
    }
}

fn missing(operation: &str, key: &str) {
    error!(operation, key, "No request context, is the middleware installed?");
}

/// Read a value from the current context
///
/// Logs an error and returns `None` outside a context.
pub fn get(key: &str) -> Option<Value> {
    match current() {
        Some(ctx) => ctx.get(key),
        None => {
            missing("get", key);
            None
        }
    }
}

/// Write a value into the current context
///
/// Logs an error and returns `false` outside a context.
pub fn set(key: impl Into<String>, value: Value) -> bool {
    let key = key.into();
    match current() {
        Some(ctx) => {
            ctx.set(key, value);
            true
        }
        None => {
            missing("set", &key);
            false
        }
    }
}

/// Request id of the current context
pub fn request_id() -> Option<String> {
    current().map(|ctx| ctx.request_id().to_string())
}

/// Connection of the current context
///
/// Outside a context the handle is empty, so statements on it fail with
/// `ConnectionRequired`.
pub fn connection() -> DbConnection {
    match current() {
        Some(ctx) => ctx.connection().clone(),
        None => {
            missing("connection", "connection");
            DbConnection::empty()
        }
    }
}
