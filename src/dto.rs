//! Wire DTOs shared by all three services (spec §6).
//!
//! Everything here is a typed decoder for the JSON envelope the original
//! DFS passed around as dynamically-traversed `JSON::Object::Ptr`s (spec §9
//! "Dynamic JSON object traversal → typed DTOs with explicit decoders").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single replica location, as returned to a client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkServerRef {
    pub id: String,
    pub address: String,
}

/// The on-disk metadata document for one file (spec §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileMetaRecord {
    pub filename: String,
    pub length: u64,
    pub chunk_size: u64,
    pub replica_count: usize,
    pub chunks: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateFileQuery {
    pub filename: String,
    pub chunk_size: Option<u64>,
}

/// Response body of `get_file_meta`: the record plus computed placement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileMetaResponse {
    pub filename: String,
    pub length: u64,
    pub chunk_size: u64,
    pub replica_count: usize,
    pub chunks: Vec<String>,
    pub chunk_servers: HashMap<String, Vec<ChunkServerRef>>,
}

#[derive(Debug, Deserialize)]
pub struct GetFileMetaQuery {
    pub filename: String,
}

/// Body of `update_file_meta`: only present fields are applied (spec §4.1).
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct UpdateFileMetaRequest {
    pub filename: String,
    pub length: Option<u64>,
    pub chunk_size: Option<u64>,
    pub chunks: Option<Vec<String>>,
}

/// The CS heartbeat payload (spec §4.1, §6).
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateChunksListRequest {
    pub server_id: String,
    pub timestamp: i64,
    pub chunks: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetActiveChunkServersResponse {
    pub status: String,
    pub chunk_servers: Vec<ChunkServerRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetChunkChunkServersRequest {
    pub chunk_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetChunkChunkServersResponse {
    pub status: String,
    pub servers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListFilesResponse {
    pub status: String,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListChunksResponse {
    pub status: String,
    pub chunks: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChunkRequest {
    pub chunk_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateChunkQuery {
    pub chunk_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChunkQuery {
    pub chunk_id: String,
    pub new_id: String,
    pub begin_pos: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetChunkQuery {
    pub chunk_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetFileQuery {
    pub filename: String,
    pub begin_pos: Option<u64>,
    pub end_pos: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct WriteFileQuery {
    pub filename: String,
    pub begin_pos: Option<u64>,
    /// Accepted but not acted upon — reserved for future truncation
    /// support (spec §9 weakness #6).
    #[allow(dead_code)]
    pub resize: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self { status: "success" }
    }
}

/// The static `id -> address` seed read from `<root>/servers_list.json`
/// at MDS startup (spec §4.1).
#[derive(Debug, Deserialize)]
pub struct ServersListFile {
    pub chunk_servers: Vec<ChunkServerRef>,
}
