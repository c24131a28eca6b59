//! Request context middleware
//!
//! Wraps every request in a `RequestContext`. When a database server is
//! configured the request runs inside its own transaction:
//! - the session is opened before the inner service is called
//! - a response status below 400 commits, anything else rolls back
//! - an error from the inner service rolls back
//! - the connection is always released afterwards
//! - a request dropped mid-flight still ends: its transaction is rolled back
//!   and `request end` is logged
//!
//! A session that cannot be opened is logged as an error and the request
//! proceeds with an empty connection, so statements fail with
//! `ConnectionRequired` instead of the request hanging.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use tower::{Layer, Service};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{RequestContext, scope};
use crate::config::{DEFAULT_REQUEST_ID_HEADER, DatabaseConfig};
use crate::connection::{DbConnection, DbServer};
use crate::error::{DataError, Result};

/// Live and total request counters shared by every clone of a layer
#[derive(Debug, Default)]
pub struct RequestStats {
    live: AtomicU64,
    total: AtomicU64,
}

impl RequestStats {
    /// Requests currently in flight
    pub fn live(&self) -> u64 {
        self.live.load(Ordering::Relaxed)
    }

    /// Requests started since the layer was built
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    fn start(&self) {
        self.live.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    fn end(&self) {
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

/// End-of-request bookkeeping
///
/// Dropping the guard decrements the live counter and emits `request end`,
/// so a cancelled or panicking request is still accounted for. A request that
/// never reached `complete` has its transaction rolled back on a spawned task.
struct RequestGuard {
    stats: Arc<RequestStats>,
    request_id: String,
    method: Method,
    uri: Uri,
    connection: DbConnection,
    status: Option<StatusCode>,
    completed: bool,
}

impl RequestGuard {
    /// Commit below 400, roll back otherwise, then release the connection
    async fn complete(&mut self, status: Option<StatusCode>) {
        // failures are logged by the connection
        let _ = match status {
            Some(status) if status.as_u16() < 400 => self.connection.commit().await,
            _ => self.connection.rollback().await,
        };
        self.connection.release().await;
        self.status = status;
        self.completed = true;
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.stats.end();

        if !self.completed {
            warn!(request_id = %self.request_id, "Request dropped before completion");
            let connection = std::mem::take(&mut self.connection);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = connection.rollback().await;
                    connection.release().await;
                });
            }
        }

        info!(
            request_id = %self.request_id,
            method = %self.method,
            uri = %self.uri,
            status = self.status.map(|s| s.as_u16()),
            completed = self.completed,
            live = self.stats.live(),
            total = self.stats.total(),
            "request end"
        );
    }
}

/// Layer installing a `RequestContext` around each request
#[derive(Clone)]
pub struct RequestContextLayer {
    db_server: Option<Arc<dyn DbServer>>,
    request_id_header: HeaderName,
    stats: Arc<RequestStats>,
}

impl Default for RequestContextLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContextLayer {
    /// Layer without a database; every request gets an empty connection
    pub fn new() -> Self {
        Self {
            db_server: None,
            request_id_header: HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER),
            stats: Arc::new(RequestStats::default()),
        }
    }

    /// Layer using the configured request id header and `server`
    pub fn from_config(config: &DatabaseConfig, server: Arc<dyn DbServer>) -> Result<Self> {
        let header = HeaderName::from_bytes(config.request_id_header.as_bytes()).map_err(|_| {
            DataError::configuration(format!(
                "Invalid request id header: {}",
                config.request_id_header
            ))
        })?;
        Ok(Self::new()
            .with_db_server(server)
            .with_request_id_header(header))
    }

    /// Open a transactional session per request from `server`
    pub fn with_db_server(mut self, server: Arc<dyn DbServer>) -> Self {
        self.db_server = Some(server);
        self
    }

    /// Header a caller-supplied request id is read from and echoed on
    pub fn with_request_id_header(mut self, header: HeaderName) -> Self {
        self.request_id_header = header;
        self
    }

    pub fn stats(&self) -> Arc<RequestStats> {
        self.stats.clone()
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextService {
            inner,
            db_server: self.db_server.clone(),
            request_id_header: self.request_id_header.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Service produced by `RequestContextLayer`
#[derive(Clone)]
pub struct RequestContextService<S> {
    inner: S,
    db_server: Option<Arc<dyn DbServer>>,
    request_id_header: HeaderName,
    stats: Arc<RequestStats>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestContextService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // the clone may not be ready; call the one that was polled
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let db_server = self.db_server.clone();
        let header = self.request_id_header.clone();
        let stats = self.stats.clone();

        Box::pin(async move {
            stats.start();

            let method = request.method().clone();
            let uri = request.uri().clone();
            let request_id = request
                .headers()
                .get(&header)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            let mut guard = RequestGuard {
                stats,
                request_id: request_id.clone(),
                method,
                uri,
                connection: DbConnection::empty(),
                status: None,
                completed: false,
            };

            if let Some(server) = &db_server {
                match DbConnection::open(server.as_ref()).await {
                    Ok(cn) => guard.connection = cn,
                    Err(e) => error!(
                        request_id = %request_id,
                        code = e.code(),
                        error = %e,
                        "Database session setup failed, continuing without a connection"
                    ),
                }
            }

            let ctx = Arc::new(RequestContext::new(
                request_id.clone(),
                guard.connection.clone(),
            ));
            debug!(
                request_id = %request_id,
                method = %guard.method,
                uri = %guard.uri,
                "Request start"
            );

            let result = scope(ctx, async move { inner.call(request).await }).await;

            guard
                .complete(result.as_ref().ok().map(|response| response.status()))
                .await;
            drop(guard);

            result.map(|mut response| {
                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(header, value);
                }
                response
            })
        })
    }
}
