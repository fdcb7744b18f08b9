//! HTTP surface.
//!
//! One router multiplexes queries across the per-language stores found in
//! the databases directory at startup. Stores are read-only and shared
//! without locks; the result cache is the only shared mutable state. Each
//! request runs on its own task, and the search itself runs on the blocking
//! pool with a cancellation token that fires when the client goes away.

use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cache::{SearchCache, SearchKey, POPULATE_THRESHOLD};
use crate::error::{Result, RouteError};
use crate::model::{PageId, StoreInfo, STORE_EXTENSION};
use crate::search;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub databases_dir: PathBuf,
    pub listen: SocketAddr,
    pub cache_bytes: usize,
}

struct AppState {
    stores: HashMap<String, Store>,
    cache: SearchCache,
    /// `list_databases` payload, serialized once at startup; the store set
    /// is fixed for the lifetime of the process.
    listing: Vec<u8>,
}

/// Open every store in a directory, keyed by language code. Files that fail
/// to open are skipped with a warning; between two stores of the same
/// language the newer dump wins.
pub fn open_stores(databases_dir: &Path) -> Result<HashMap<String, Store>> {
    let mut stores: HashMap<String, Store> = HashMap::new();
    for entry in fs::read_dir(databases_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(STORE_EXTENSION) {
            continue;
        }
        match Store::open(&path) {
            Ok(store) => {
                let code = store.info.language_code.clone();
                match stores.get(&code) {
                    Some(existing) if existing.info.dump_date >= store.info.dump_date => {
                        warn!("skipping {}: newer dump already open", store.name);
                    }
                    _ => {
                        info!("opened store {}", store.name);
                        stores.insert(code, store);
                    }
                }
            }
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
            }
        }
    }
    if stores.is_empty() {
        return Err(RouteError::NotFound("usable store"));
    }
    Ok(stores)
}

/// Assemble the router over an already-opened store set.
pub fn router(stores: HashMap<String, Store>, cache_bytes: usize) -> Result<Router> {
    let mut infos: Vec<&StoreInfo> = stores.values().map(|store| &store.info).collect();
    infos.sort_by(|a, b| a.language_code.cmp(&b.language_code));
    let listing = serde_json::to_vec(&infos)?;

    let state = Arc::new(AppState {
        stores,
        cache: SearchCache::new(cache_bytes),
        listing,
    });

    Ok(Router::new()
        .route("/api/list_databases", get(list_databases))
        .route("/api/shortest_paths", get(shortest_paths))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

pub async fn serve(options: &ServeOptions) -> Result<()> {
    let stores = open_stores(&options.databases_dir)?;
    let app = router(stores, options.cache_bytes)?;
    let listener = tokio::net::TcpListener::bind(options.listen).await?;
    info!("listening on http://{}", options.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("ctrl-c received, shutting down");
    }
}

async fn list_databases(State(state): State<Arc<AppState>>) -> Response {
    json_bytes(state.listing.clone())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ShortestPathsParams {
    language_code: String,
    source: PageId,
    target: PageId,
    /// Optional cache-buster; when present it must name the open dump.
    dump_date: Option<String>,
}

async fn shortest_paths(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ShortestPathsParams>,
) -> Response {
    let Some(store) = state.stores.get(&params.language_code) else {
        return plain(
            StatusCode::NOT_FOUND,
            "no database for the requested language",
        );
    };
    if let Some(dump_date) = &params.dump_date {
        if *dump_date != store.info.dump_date {
            return plain(
                StatusCode::NOT_FOUND,
                "no database for the requested dump date",
            );
        }
    }
    if params.source == 0 || params.source > store.info.max_page_id {
        return plain(StatusCode::BAD_REQUEST, "source is not a valid page id");
    }
    if params.target == 0 || params.target > store.info.max_page_id {
        return plain(StatusCode::BAD_REQUEST, "target is not a valid page id");
    }

    let key = SearchKey {
        language_code: params.language_code,
        source: params.source,
        target: params.target,
    };
    if let Some(payload) = state.cache.fetch(&key) {
        return json_bytes(payload);
    }

    // Dropping the guard cancels the token. The runtime drops this future on
    // HTTP/2 stream resets and connection errors; hyper's plain HTTP/1.1
    // path does not watch the socket while a response is pending, so an h1
    // disconnect may go unnoticed until the write fails. Best effort there.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    run_search(state, key, cancel).await
}

/// Run one search on the blocking pool and map its outcome to a response.
/// A cancelled engine answers 408; the cache is only populated by searches
/// slow enough to clear the threshold.
async fn run_search(state: Arc<AppState>, key: SearchKey, cancel: CancellationToken) -> Response {
    let task_state = Arc::clone(&state);
    let task_key = key.clone();
    let started = Instant::now();
    let search_task = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let store = task_state
            .stores
            .get(&task_key.language_code)
            .ok_or(RouteError::NotFound("store"))?;
        let snapshot = store.snapshot()?;
        let graph = search::all_shortest_paths(
            &snapshot,
            &store.info,
            task_key.source,
            task_key.target,
            &cancel,
        )?;
        Ok(serde_json::to_vec(&graph)?)
    });

    match search_task.await {
        Ok(Ok(payload)) => {
            if started.elapsed() >= POPULATE_THRESHOLD {
                state.cache.store(key, payload.clone());
            }
            json_bytes(payload)
        }
        Ok(Err(RouteError::Cancelled)) => plain(StatusCode::REQUEST_TIMEOUT, "search cancelled"),
        Ok(Err(e)) => {
            error!("shortest paths search failed: {e}");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
        Err(e) => {
            error!("search task failed: {e}");
            plain(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

fn json_bytes(payload: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        payload,
    )
        .into_response()
}

fn plain(status: StatusCode, message: &'static str) -> Response {
    (status, message).into_response()
}
