//! CS local chunk storage and heartbeat worker (spec §4.2).

use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use tokio::time::{interval, Duration};
use tracing::{error, info};

use crate::config::CsConfig;
use crate::dto::UpdateChunksListRequest;
use crate::error::{DfsError, DfsResult};

pub struct CsState {
    root_directory: PathBuf,
    pub server_id: String,
    pub meta_server_address: String,
    heartbeat_interval_secs: u64,
    http: reqwest::Client,
}

impl CsState {
    pub fn new(server_id: String, config: &CsConfig) -> anyhow::Result<Self> {
        let root_directory = PathBuf::from(&config.root_directory);
        std::fs::create_dir_all(root_directory.join("chunks"))?;
        Ok(Self {
            root_directory,
            server_id,
            meta_server_address: config.meta_server_address.clone(),
            heartbeat_interval_secs: config.heartbeat_interval_secs,
            http: reqwest::Client::new(),
        })
    }

    fn chunks_dir(&self) -> PathBuf {
        self.root_directory.join("chunks")
    }

    fn chunk_path(&self, chunk_id: &str) -> PathBuf {
        self.chunks_dir().join(chunk_id)
    }

    pub fn list_chunks(&self) -> DfsResult<Vec<String>> {
        let mut chunks = Vec::new();
        for entry in std::fs::read_dir(self.chunks_dir())? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    chunks.push(name.to_string());
                }
            }
        }
        Ok(chunks)
    }

    pub fn get_chunk(&self, chunk_id: &str) -> DfsResult<Vec<u8>> {
        std::fs::read(self.chunk_path(chunk_id)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DfsError::NotFound(format!("chunk '{chunk_id}' not found"))
            }
            _ => DfsError::Internal(e.to_string()),
        })
    }

    pub fn create_chunk(&self, chunk_id: &str, body: &[u8]) -> DfsResult<()> {
        std::fs::write(self.chunk_path(chunk_id), body)?;
        Ok(())
    }

    /// The copy-on-write primitive (spec §4.2 `update_chunk`): patch
    /// `chunk_id` in place at `begin_pos`, then copy the result to
    /// `new_id`, leaving `chunk_id` untouched so concurrent readers with
    /// stale metadata still see a valid replica.
    pub fn update_chunk(&self, chunk_id: &str, new_id: &str, begin_pos: u64, body: &[u8]) -> DfsResult<()> {
        let path = self.chunk_path(chunk_id);
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    DfsError::NotFound(format!("chunk '{chunk_id}' not found"))
                }
                _ => DfsError::Internal(e.to_string()),
            })?;
        file.seek(SeekFrom::Start(begin_pos))?;
        file.write_all(body)?;
        drop(file);

        std::fs::copy(&path, self.chunk_path(new_id))?;
        Ok(())
    }

    pub fn delete_chunk(&self, chunk_id: &str) -> DfsResult<()> {
        std::fs::remove_file(self.chunk_path(chunk_id)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                DfsError::NotFound(format!("chunk '{chunk_id}' not found"))
            }
            _ => DfsError::Internal(e.to_string()),
        })
    }

    /// Pushes the current chunk inventory to the MDS once. Errors are the
    /// caller's to log and swallow (spec §4.2, §7).
    pub async fn push_chunks_list(&self) -> anyhow::Result<()> {
        let chunks = self.list_chunks()?;
        let url = format!("http://{}/update_chunks_list", self.meta_server_address);
        let body = UpdateChunksListRequest {
            server_id: self.server_id.clone(),
            timestamp: crate::util::now_micros(),
            chunks,
        };
        self.http.post(&url).json(&body).send().await?.error_for_status()?;
        Ok(())
    }

    /// Spawns the periodic heartbeat loop (spec §4.2). Never terminates;
    /// a failed push is logged and the loop continues.
    pub fn start_heartbeat_worker(self: std::sync::Arc<Self>) {
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(self.heartbeat_interval_secs.max(1)));
            loop {
                ticker.tick().await;
                match self.push_chunks_list().await {
                    Ok(()) => info!(server_id = %self.server_id, "heartbeat pushed"),
                    Err(e) => error!(server_id = %self.server_id, error = %e, "heartbeat push failed"),
                }
            }
        });
    }
}
