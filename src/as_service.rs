//! AS outbound calls to MDS and CS (spec §4.3). Stateless: the struct holds
//! only the MDS address and an HTTP client, rebuilt on every request.

use crate::config::AccessConfig;
use crate::dto::{
    ChunkServerRef, CreateFileQuery, FileMetaRecord, FileMetaResponse, GetChunkChunkServersRequest,
    GetChunkChunkServersResponse, UpdateFileMetaRequest,
};
use crate::error::{DfsError, DfsResult};

pub struct AsState {
    pub meta_server_address: String,
    http: reqwest::Client,
}

impl AsState {
    pub fn new(config: &AccessConfig) -> Self {
        Self {
            meta_server_address: config.meta_server_address.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn fetch_file_meta(&self, filename: &str) -> DfsResult<FileMetaResponse> {
        let url = format!("http://{}/get_file_meta", self.meta_server_address);
        let resp = self
            .http
            .get(&url)
            .query(&[("filename", filename)])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DfsError::NotFound(format!("file '{filename}' not found")));
        }
        Ok(resp.error_for_status()?.json().await?)
    }

    pub async fn create_file(&self, filename: &str) -> DfsResult<FileMetaRecord> {
        let url = format!("http://{}/create_file", self.meta_server_address);
        let resp = self
            .http
            .get(&url)
            .query(&CreateFileQuery {
                filename: filename.to_string(),
                chunk_size: None,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn update_file_meta(&self, req: &UpdateFileMetaRequest) -> DfsResult<FileMetaRecord> {
        let url = format!("http://{}/update_file_meta", self.meta_server_address);
        let resp = self.http.post(&url).json(req).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DfsError::NotFound(format!(
                "file '{}' not found",
                req.filename
            )));
        }
        Ok(resp.error_for_status()?.json().await?)
    }

    pub async fn get_active_chunk_servers(&self) -> DfsResult<Vec<ChunkServerRef>> {
        let url = format!(
            "http://{}/get_active_chunk_servers",
            self.meta_server_address
        );
        #[derive(serde::Deserialize)]
        struct Resp {
            chunk_servers: Vec<ChunkServerRef>,
        }
        let resp: Resp = self.http.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(resp.chunk_servers)
    }

    #[allow(dead_code)]
    pub async fn get_chunk_chunk_servers(&self, chunk_id: &str) -> DfsResult<Vec<String>> {
        let url = format!("http://{}/get_chunk_chunk_servers", self.meta_server_address);
        let resp: GetChunkChunkServersResponse = self
            .http
            .post(&url)
            .json(&GetChunkChunkServersRequest {
                chunk_id: chunk_id.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.servers)
    }

    pub async fn cs_get_chunk(&self, address: &str, chunk_id: &str) -> DfsResult<Vec<u8>> {
        let url = format!("http://{address}/get_chunk");
        let resp = self
            .http
            .get(&url)
            .query(&[("chunk_id", chunk_id)])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DfsError::NotFound(format!("chunk '{chunk_id}' not found")));
        }
        Ok(resp.error_for_status()?.bytes().await?.to_vec())
    }

    pub async fn cs_create_chunk(&self, address: &str, chunk_id: &str, body: Vec<u8>) -> DfsResult<()> {
        let url = format!("http://{address}/create_chunk");
        self.http
            .post(&url)
            .query(&[("chunk_id", chunk_id)])
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn cs_update_chunk(
        &self,
        address: &str,
        chunk_id: &str,
        new_id: &str,
        begin_pos: u64,
        body: Vec<u8>,
    ) -> DfsResult<()> {
        let url = format!("http://{address}/update_chunk");
        let begin_pos_str = begin_pos.to_string();
        self.http
            .post(&url)
            .query(&[
                ("chunk_id", chunk_id),
                ("new_id", new_id),
                ("begin_pos", &begin_pos_str),
            ])
            .body(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
