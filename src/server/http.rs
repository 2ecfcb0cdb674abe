//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; one task per connection.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::analysis::AnalysisProvider;
use crate::config::Args;
use crate::db::{MemoryStore, MongoStore};
use crate::ledger::{UsageLedger, UsageStore};
use crate::logging::UsageLogger;
use crate::reports::ReportStore;
use crate::routes;
use crate::types::ValidatorError;
use crate::waitlist::{Waitlist, WaitlistStore};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest request body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Which store backs the ledger, waitlist and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Mongo,
    Memory,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mongo => "mongodb",
            Self::Memory => "memory",
        }
    }
}

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub storage: StorageMode,
    pub ledger: Arc<UsageLedger>,
    pub waitlist: Arc<Waitlist>,
    pub reports: Arc<dyn ReportStore>,
    /// Absent when no provider key is configured
    pub provider: Option<Arc<dyn AnalysisProvider>>,
    pub usage_log: UsageLogger,
    pub started_at: Instant,
}

impl AppState {
    /// Build state over explicit stores
    pub fn with_stores(
        args: Args,
        storage: StorageMode,
        usage: Arc<dyn UsageStore>,
        waitlist: Arc<dyn WaitlistStore>,
        reports: Arc<dyn ReportStore>,
    ) -> Self {
        let ledger = Arc::new(UsageLedger::new(usage, args.quota_policy()));
        let usage_log = UsageLogger::new(args.node_id.to_string());

        Self {
            args,
            storage,
            ledger,
            waitlist: Arc::new(Waitlist::new(waitlist)),
            reports,
            provider: None,
            usage_log,
            started_at: Instant::now(),
        }
    }

    /// State backed by a single in-process store (dev mode and tests)
    pub fn in_memory(args: Args) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(
            args,
            StorageMode::Memory,
            store.clone(),
            store.clone(),
            store,
        )
    }

    /// State backed by MongoDB
    pub fn with_mongo(args: Args, store: MongoStore) -> Self {
        let store = Arc::new(store);
        Self::with_stores(
            args,
            StorageMode::Mongo,
            store.clone(),
            store.clone(),
            store,
        )
    }

    /// Attach the analysis provider
    pub fn with_provider(mut self, provider: Arc<dyn AnalysisProvider>) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), ValidatorError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "ContentValidator listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }
    if state.provider.is_none() {
        warn!("No analysis provider configured - /api/validate will return 503");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let headers = req.headers().clone();
    let peer = addr.ip();

    info!("[{}] {} {}", addr, method, path);

    if method == Method::OPTIONS {
        return Ok(to_boxed(preflight_response()));
    }

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        (Method::GET, "/version") => routes::version_info(),

        (Method::POST, "/api/usage/record") => match read_body(req).await {
            Ok(body) => routes::handle_usage_record(state, &headers, peer, body).await,
            Err(response) => response,
        },

        (Method::GET, "/api/usage/check") => {
            let client_id = routes::query_param(query.as_deref(), "clientId");
            routes::handle_usage_check(state, &headers, peer, client_id).await
        }

        (Method::POST, "/api/usage/check") => match read_body(req).await {
            Ok(body) => match routes::client_id_from_body(&body) {
                Ok(client_id) => routes::handle_usage_check(state, &headers, peer, client_id).await,
                Err(response) => response,
            },
            Err(response) => response,
        },

        (Method::POST, "/api/validate") => match read_body(req).await {
            Ok(body) => routes::handle_validate(state, &headers, peer, body).await,
            Err(response) => response,
        },

        (Method::POST, "/api/waitlist") => match read_body(req).await {
            Ok(body) => routes::handle_waitlist_join(state, &headers, peer, body).await,
            Err(response) => response,
        },

        (Method::GET, "/admin/waitlist") => routes::handle_admin_waitlist(state, &headers).await,

        (Method::GET, "/api/reports") => {
            routes::handle_list_reports(state, &headers, peer, query.as_deref()).await
        }

        (Method::GET, "/api/reports/latest") => {
            routes::handle_latest_report(state, &headers, peer, query.as_deref()).await
        }

        (Method::GET, p) if p.starts_with("/api/reports/") => {
            let rest = &p["/api/reports/".len()..];
            match rest.split_once('/') {
                None if !rest.is_empty() => routes::handle_get_report(state, rest).await,
                Some((id, "export")) if !id.is_empty() => {
                    routes::handle_export_report(state, id).await
                }
                _ => not_found_response(&path),
            }
        }

        _ => not_found_response(&path),
    };

    Ok(to_boxed(response))
}

/// Collect a request body up to `MAX_BODY_BYTES`
async fn read_body(req: Request<Incoming>) -> Result<Bytes, Response<Full<Bytes>>> {
    match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            Err(routes::error_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
                Some("INVALID_BODY"),
            ))
        }
    }
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
