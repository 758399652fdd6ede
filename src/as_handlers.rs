//! AS HTTP surface: the read and write paths (spec §4.3, §6).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::seq::SliceRandom;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

use crate::as_service::AsState;
use crate::dto::{GetFileQuery, StatusResponse, UpdateFileMetaRequest, WriteFileQuery};
use crate::error::{DfsError, DfsResult};
use crate::util;

pub fn router(state: Arc<AsState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/get_file", get(get_file))
        .route("/write_file", post(write_file))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<StatusResponse>) {
    (StatusCode::NOT_FOUND, Json(StatusResponse { status: "error" }))
}

async fn ping() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

async fn get_file(
    State(state): State<Arc<AsState>>,
    Query(query): Query<GetFileQuery>,
) -> DfsResult<Response> {
    let meta = state.fetch_file_meta(&query.filename).await?;
    debug!(filename = %query.filename, "get_file");

    let begin_pos = query.begin_pos.unwrap_or(0).min(meta.length);
    let end_pos = query.end_pos.unwrap_or(meta.length).min(meta.length);

    let Some((first_idx, last_idx)) = util::chunk_index_range(begin_pos, end_pos, meta.chunk_size)
    else {
        return Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            Vec::<u8>::new(),
        )
            .into_response());
    };

    let mut out = Vec::new();
    for chunk_idx in first_idx..=last_idx {
        let chunk_id = meta
            .chunks
            .get(chunk_idx as usize)
            .ok_or_else(|| DfsError::Internal(format!("chunk index {chunk_idx} out of range")))?;
        let replicas = meta.chunk_servers.get(chunk_id).cloned().unwrap_or_default();
        let replica = replicas
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| DfsError::Unavailable(format!("no live replica for chunk '{chunk_id}'")))?;

        let body = state.cs_get_chunk(&replica.address, chunk_id).await?;
        out.extend(util::trim_chunk_body(
            &body,
            chunk_idx,
            first_idx,
            last_idx,
            begin_pos,
            end_pos,
            meta.chunk_size,
        ));
    }

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        out,
    )
        .into_response())
}

async fn write_file(
    State(state): State<Arc<AsState>>,
    Query(query): Query<WriteFileQuery>,
    body: Bytes,
) -> DfsResult<Json<StatusResponse>> {
    let begin_pos = query.begin_pos.unwrap_or(0);

    let meta = match state.fetch_file_meta(&query.filename).await {
        Ok(meta) => meta,
        Err(DfsError::NotFound(_)) => {
            state
                .create_file(&query.filename)
                .await
                .map_err(|e| DfsError::Internal(format!("auto-create failed: {e}")))?;
            state
                .fetch_file_meta(&query.filename)
                .await
                .map_err(|e| DfsError::Internal(format!("file vanished after create: {e}")))?
        }
        Err(e) => return Err(e),
    };

    if begin_pos > meta.length {
        return Err(DfsError::BadRequest(format!(
            "begin_pos {begin_pos} beyond length {}",
            meta.length
        )));
    }

    if body.is_empty() {
        return Ok(Json(StatusResponse::ok()));
    }

    let content = body.to_vec();
    let end_pos = begin_pos + content.len() as u64;
    let first_chunk_idx = begin_pos / meta.chunk_size;
    let last_chunk_idx = (end_pos - 1) / meta.chunk_size;
    let chunk_num = (last_chunk_idx - first_chunk_idx + 1) as usize;

    let new_cids: Vec<String> = (0..chunk_num).map(|_| Uuid::new_v4().to_string()).collect();
    let slices = util::slice_for_write(&content, begin_pos, meta.chunk_size);

    info!(
        filename = %query.filename,
        begin_pos,
        chunk_num,
        "write_file"
    );

    let mut some_ok = true;
    for i in 0..chunk_num {
        let chunk_idx = first_chunk_idx + i as u64;
        let new_cid = &new_cids[i];
        let slice = slices[i].clone();
        let offset = if i == 0 {
            util::offset_within_chunk(begin_pos, meta.chunk_size)
        } else {
            0
        };

        let chunk_ok = if (chunk_idx as usize) < meta.chunks.len() {
            let old_cid = meta.chunks[chunk_idx as usize].clone();
            let replicas = meta.chunk_servers.get(&old_cid).cloned().unwrap_or_default();
            let mut ok = false;
            for server in replicas {
                if state
                    .cs_update_chunk(&server.address, &old_cid, new_cid, offset, slice.clone())
                    .await
                    .is_ok()
                {
                    ok = true;
                }
            }
            ok
        } else {
            let active = state.get_active_chunk_servers().await?;
            let replica_count = meta.replica_count.min(active.len());
            let mut candidates = active;
            candidates.shuffle(&mut rand::thread_rng());
            let mut ok = false;
            for server in candidates.into_iter().take(replica_count) {
                if state
                    .cs_create_chunk(&server.address, new_cid, slice.clone())
                    .await
                    .is_ok()
                {
                    ok = true;
                }
            }
            ok
        };

        some_ok &= chunk_ok;
    }

    if !some_ok {
        return Err(DfsError::Unavailable(
            "no replica accepted one or more affected chunks".to_string(),
        ));
    }

    let mut new_chunks = meta.chunks[..first_chunk_idx as usize].to_vec();
    new_chunks.extend(new_cids);
    if (first_chunk_idx as usize + chunk_num) < meta.chunks.len() {
        new_chunks.extend(meta.chunks[first_chunk_idx as usize + chunk_num..].to_vec());
    }

    let new_length = meta.length.max(end_pos);
    state
        .update_file_meta(&UpdateFileMetaRequest {
            filename: query.filename.clone(),
            length: Some(new_length),
            chunk_size: None,
            chunks: Some(new_chunks),
        })
        .await?;

    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::sleep;
    use tower::ServiceExt;

    use crate::config::{AccessConfig, CsConfig, MdsConfig};
    use crate::cs_service::CsState;
    use crate::mds_service::MdsState;

    /// Boots a real MDS on a loopback ephemeral port, backed by a fresh
    /// temp directory. The liveness checker is left unstarted — scenario
    /// (f) below starts it explicitly, with a zero liveness window, once
    /// it needs eviction.
    async fn spawn_mds(
        default_chunk_size: u64,
        default_replica_count: usize,
        liveness_window_secs: u64,
    ) -> (Arc<MdsState>, String) {
        let dir = std::env::temp_dir().join(format!(
            "rustfs-as-test-mds-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        let config = MdsConfig {
            port: 0,
            root_directory: dir.to_string_lossy().to_string(),
            default_chunk_size,
            default_replica_count,
            check_interval_secs: 1,
            liveness_window_secs,
        };
        let state = MdsState::new(&config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let router = crate::mds_handlers::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (state, addr)
    }

    /// Boots a real CS on a loopback ephemeral port. The heartbeat worker
    /// is never started — tests drive `push_chunks_list` directly so a
    /// heartbeat happens exactly when the scenario calls for one.
    async fn spawn_cs(server_id: &str, meta_server_address: &str) -> (Arc<CsState>, String) {
        let dir = std::env::temp_dir().join(format!(
            "rustfs-as-test-cs-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        let config = CsConfig {
            port: 0,
            root_directory: dir.to_string_lossy().to_string(),
            meta_server_address: meta_server_address.to_string(),
            heartbeat_interval_secs: 3600,
        };
        let state = Arc::new(CsState::new(server_id.to_string(), &config).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let router = crate::cs_handlers::router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (state, addr)
    }

    fn as_router(meta_server_address: &str) -> Router {
        let state = Arc::new(AsState::new(&AccessConfig {
            port: 0,
            meta_server_address: meta_server_address.to_string(),
        }));
        router(state)
    }

    async fn write(app: &Router, filename: &str, begin_pos: u64, body: &'static [u8]) -> StatusCode {
        app.clone()
            .oneshot(
                Request::post(format!("/write_file?filename={filename}&begin_pos={begin_pos}"))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    async fn read(app: &Router, filename: &str, begin_pos: u64, end_pos: u64) -> Response {
        app.clone()
            .oneshot(
                Request::get(format!(
                    "/get_file?filename={filename}&begin_pos={begin_pos}&end_pos={end_pos}"
                ))
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn read_ok(app: &Router, filename: &str, begin_pos: u64, end_pos: u64) -> Vec<u8> {
        let resp = read(app, filename, begin_pos, end_pos).await;
        assert_eq!(resp.status(), StatusCode::OK);
        axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    /// Chains spec.md §8 scenarios (b)-(e): write-then-read-back, overwrite
    /// middle (fresh CIDs via `update_chunk`), append across a chunk
    /// boundary, then a rejected write past EOF. Two real CSes, chunk_size=4,
    /// replica_count=2. Heartbeats are driven manually after each commit so
    /// MDS learns the new chunk placements before the next read/write.
    #[tokio::test]
    async fn scenarios_b_through_e_chain() {
        let (mds, mds_addr) = spawn_mds(4, 2, 5).await;
        let (cs1, _cs1_addr) = spawn_cs("cs1", &mds_addr).await;
        let (cs2, _cs2_addr) = spawn_cs("cs2", &mds_addr).await;

        // Register both CSes as live before any write touches the append path,
        // which picks replicas from `get_active_chunk_servers`.
        mds.update_chunks_list("cs1", crate::util::now_micros(), vec![])
            .await;
        mds.update_chunks_list("cs2", crate::util::now_micros(), vec![])
            .await;

        let app = as_router(&mds_addr);

        // (b) write then read back.
        assert_eq!(write(&app, "y", 0, b"abcdefg").await, StatusCode::OK);
        cs1.push_chunks_list().await.unwrap();
        cs2.push_chunks_list().await.unwrap();

        assert_eq!(read_ok(&app, "y", 0, 7).await, b"abcdefg");
        assert_eq!(read_ok(&app, "y", 2, 6).await, b"cdef");
        assert_eq!(read_ok(&app, "y", 3, 3).await, b"" as &[u8]);

        // (c) overwrite middle: positions [2,4) fall entirely in chunk 0.
        assert_eq!(write(&app, "y", 2, b"ZZ").await, StatusCode::OK);
        cs1.push_chunks_list().await.unwrap();
        cs2.push_chunks_list().await.unwrap();
        assert_eq!(read_ok(&app, "y", 0, 7).await, b"abZZefg");

        // (d) append across a chunk boundary: extends chunk 1 ("efg" -> "efgH")
        // via update_chunk, then appends a fresh chunk ("IJ") via create_chunk.
        assert_eq!(write(&app, "y", 7, b"HIJ").await, StatusCode::OK);
        cs1.push_chunks_list().await.unwrap();
        cs2.push_chunks_list().await.unwrap();
        assert_eq!(read_ok(&app, "y", 0, 10).await, b"abZZefgHIJ");

        // (e) write past EOF is rejected, with no metadata change.
        assert_eq!(write(&app, "y", 20, b"X").await, StatusCode::BAD_REQUEST);
        assert_eq!(read_ok(&app, "y", 0, 10).await, b"abZZefgHIJ");
    }

    /// spec.md §8 scenario (f): once the sole replica of a file's chunks
    /// stops heartbeating and is evicted from the membership table, reads
    /// against that file return 503 rather than hanging or panicking.
    #[tokio::test]
    async fn scenario_f_replica_loss_returns_503() {
        // liveness_window_secs=0: the liveness checker's first tick (which
        // tokio::time::interval fires immediately) evicts any server whose
        // last heartbeat is already in the past, which every heartbeat is.
        let (mds, mds_addr) = spawn_mds(4, 1, 0).await;
        let (cs1, _cs1_addr) = spawn_cs("cs1", &mds_addr).await;
        mds.update_chunks_list("cs1", crate::util::now_micros(), vec![])
            .await;

        let app = as_router(&mds_addr);

        assert_eq!(write(&app, "z", 0, b"hello").await, StatusCode::OK);
        cs1.push_chunks_list().await.unwrap();
        assert_eq!(read_ok(&app, "z", 0, 5).await, b"hello");

        mds.start_liveness_checker();
        sleep(Duration::from_millis(100)).await;

        let resp = read(&app, "z", 0, 5).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    /// write_file auto-creates a missing file (spec.md §4.3.2 step 2) and a
    /// failed auto-create (e.g. a concurrent creator winning the race, which
    /// surfaces as 409 from MDS) is folded into a 500, not passed through
    /// verbatim (spec.md §4.3.2 Failure modes / §7).
    #[tokio::test]
    async fn write_file_auto_creates_missing_file() {
        let (mds, mds_addr) = spawn_mds(4, 1, 5).await;
        let (cs1, _cs1_addr) = spawn_cs("cs1", &mds_addr).await;
        mds.update_chunks_list("cs1", crate::util::now_micros(), vec![])
            .await;

        let app = as_router(&mds_addr);
        assert_eq!(write(&app, "new-file", 0, b"hi").await, StatusCode::OK);
        cs1.push_chunks_list().await.unwrap();
        assert_eq!(read_ok(&app, "new-file", 0, 2).await, b"hi");
    }
}
