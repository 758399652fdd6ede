//! CS HTTP surface (spec §4.2, §6).

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cs_service::CsState;
use crate::dto::{
    CreateChunkQuery, DeleteChunkRequest, GetChunkQuery, ListChunksResponse, StatusResponse,
    UpdateChunkQuery,
};
use crate::error::DfsResult;

pub fn router(state: Arc<CsState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/get_chunk", get(get_chunk))
        .route("/create_chunk", post(create_chunk))
        .route("/update_chunk", post(update_chunk))
        .route("/delete_chunk", post(delete_chunk))
        .route("/list_chunks", get(list_chunks))
        .route("/force_push_chunks_list", post(force_push_chunks_list))
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

async fn get_chunk(
    State(state): State<Arc<CsState>>,
    Query(query): Query<GetChunkQuery>,
) -> DfsResult<Response> {
    let body = state.get_chunk(&query.chunk_id)?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response())
}

async fn create_chunk(
    State(state): State<Arc<CsState>>,
    Query(query): Query<CreateChunkQuery>,
    body: Bytes,
) -> DfsResult<Json<StatusResponse>> {
    info!(chunk_id = %query.chunk_id, bytes = body.len(), "create_chunk");
    state.create_chunk(&query.chunk_id, &body)?;
    Ok(Json(StatusResponse::ok()))
}

async fn update_chunk(
    State(state): State<Arc<CsState>>,
    Query(query): Query<UpdateChunkQuery>,
    body: Bytes,
) -> DfsResult<Json<StatusResponse>> {
    info!(
        chunk_id = %query.chunk_id,
        new_id = %query.new_id,
        begin_pos = query.begin_pos,
        "update_chunk"
    );
    state.update_chunk(&query.chunk_id, &query.new_id, query.begin_pos, &body)?;
    Ok(Json(StatusResponse::ok()))
}

async fn delete_chunk(
    State(state): State<Arc<CsState>>,
    Json(body): Json<DeleteChunkRequest>,
) -> DfsResult<Json<StatusResponse>> {
    info!(chunk_id = %body.chunk_id, "delete_chunk");
    state.delete_chunk(&body.chunk_id)?;
    Ok(Json(StatusResponse::ok()))
}

async fn list_chunks(State(state): State<Arc<CsState>>) -> DfsResult<Json<ListChunksResponse>> {
    let chunks = state.list_chunks()?;
    Ok(Json(ListChunksResponse {
        status: "success".to_string(),
        chunks,
    }))
}

async fn force_push_chunks_list(State(state): State<Arc<CsState>>) -> Json<StatusResponse> {
    if let Err(e) = state.push_chunks_list().await {
        tracing::error!(error = %e, "force_push_chunks_list failed");
    }
    Json(StatusResponse::ok())
}
