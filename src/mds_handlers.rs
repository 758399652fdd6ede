//! MDS HTTP surface (spec §4.1, §6).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dto::{
    CreateFileQuery, FileMetaResponse, GetActiveChunkServersResponse, GetChunkChunkServersRequest,
    GetChunkChunkServersResponse, GetFileMetaQuery, ListFilesResponse, StatusResponse,
    UpdateChunksListRequest, UpdateFileMetaRequest,
};
use crate::error::DfsResult;
use crate::mds_service::MdsState;

pub fn router(state: Arc<MdsState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/files", get(list_files))
        .route("/create_file", get(create_file))
        .route("/get_file_meta", get(get_file_meta))
        .route("/update_file_meta", post(update_file_meta))
        .route("/update_chunks_list", post(update_chunks_list))
        .route("/get_active_chunk_servers", get(get_active_chunk_servers))
        .route("/get_chunk_chunk_servers", post(get_chunk_chunk_servers))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<StatusResponse>) {
    // spec §9 weakness #7: the original's handler factory returned null for
    // unmatched routes without signalling the HTTP layer; a correct
    // reimplementation returns 404 here instead.
    (StatusCode::NOT_FOUND, Json(StatusResponse { status: "error" }))
}

async fn ping() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

async fn list_files(State(state): State<Arc<MdsState>>) -> DfsResult<Json<ListFilesResponse>> {
    let files = state.list_files()?;
    Ok(Json(ListFilesResponse {
        status: "success".to_string(),
        files,
    }))
}

async fn create_file(
    State(state): State<Arc<MdsState>>,
    Query(query): Query<CreateFileQuery>,
) -> DfsResult<Json<crate::dto::FileMetaRecord>> {
    info!(filename = %query.filename, "create_file");
    let record = state.create_file(&query.filename, query.chunk_size)?;
    Ok(Json(record))
}

async fn get_file_meta(
    State(state): State<Arc<MdsState>>,
    Query(query): Query<GetFileMetaQuery>,
) -> DfsResult<Json<FileMetaResponse>> {
    let record = state.read_file_meta(&query.filename)?;

    let mut chunk_servers = HashMap::new();
    for chunk_id in &record.chunks {
        chunk_servers.insert(chunk_id.clone(), state.live_chunk_servers(chunk_id).await);
    }

    Ok(Json(FileMetaResponse {
        filename: record.filename,
        length: record.length,
        chunk_size: record.chunk_size,
        replica_count: record.replica_count,
        chunks: record.chunks,
        chunk_servers,
    }))
}

async fn update_file_meta(
    State(state): State<Arc<MdsState>>,
    Json(body): Json<UpdateFileMetaRequest>,
) -> DfsResult<Json<crate::dto::FileMetaRecord>> {
    info!(filename = %body.filename, "update_file_meta");
    let record = state.update_file_meta(&body.filename, body.length, body.chunk_size, body.chunks)?;
    Ok(Json(record))
}

async fn update_chunks_list(
    State(state): State<Arc<MdsState>>,
    Json(body): Json<UpdateChunksListRequest>,
) -> Json<StatusResponse> {
    state
        .update_chunks_list(&body.server_id, body.timestamp, body.chunks)
        .await;
    Json(StatusResponse::ok())
}

async fn get_active_chunk_servers(
    State(state): State<Arc<MdsState>>,
) -> Json<GetActiveChunkServersResponse> {
    let chunk_servers = state.get_active_chunk_servers().await;
    Json(GetActiveChunkServersResponse {
        status: "success".to_string(),
        chunk_servers,
    })
}

async fn get_chunk_chunk_servers(
    State(state): State<Arc<MdsState>>,
    Json(body): Json<GetChunkChunkServersRequest>,
) -> Json<GetChunkChunkServersResponse> {
    let servers = state.get_chunk_chunk_servers(&body.chunk_id).await;
    Json(GetChunkChunkServersResponse {
        status: "success".to_string(),
        servers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn tmp_state() -> Arc<MdsState> {
        let dir = std::env::temp_dir().join(format!(
            "rustfs-mds-handlers-test-{}-{}",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        let config = crate::config::MdsConfig {
            port: 0,
            root_directory: dir.to_string_lossy().to_string(),
            default_chunk_size: 4,
            default_replica_count: 2,
            check_interval_secs: 5,
            liveness_window_secs: 5,
        };
        MdsState::new(&config).unwrap()
    }

    #[tokio::test]
    async fn create_then_get_file_meta() {
        let app = router(tmp_state());

        let resp = app
            .clone()
            .oneshot(
                Request::get("/create_file?filename=x&chunk_size=8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(
                Request::get("/get_file_meta?filename=x")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = router(tmp_state());
        let resp = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_file_meta_missing_is_404() {
        let app = router(tmp_state());
        let resp = app
            .oneshot(
                Request::get("/get_file_meta?filename=nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_file_conflict_is_409() {
        let app = router(tmp_state());
        let req = || {
            Request::get("/create_file?filename=dup")
                .body(Body::empty())
                .unwrap()
        };
        let first = app.clone().oneshot(req()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app.oneshot(req()).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }
}
