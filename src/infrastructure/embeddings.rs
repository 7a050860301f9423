//! Text embedding backend and the persisted embedding matrix.
//!
//! Embeddings come from a local fastembed model by default, or from an
//! OpenAI-compatible / Gemini endpoint when configured. The precomputed
//! matrix is persisted as a flat little-endian artifact keyed to dataset row
//! order; row `i` of the matrix belongs to row `i` of the protein table.

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Serialize)]
struct OpenAIEmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbeddingRequest {
    content: GeminiEmbeddingContent,
}

#[derive(Debug, Serialize)]
struct GeminiEmbeddingContent {
    parts: Vec<GeminiEmbeddingPart>,
}

#[derive(Debug, Serialize)]
struct GeminiEmbeddingPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbeddingResponse {
    embedding: GeminiEmbeddingResult,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbeddingResult {
    values: Vec<f32>,
}

pub struct EmbeddingService {
    client: Client,
    config: LLMConfig,
    // Lazily initialized; the Mutex also serializes concurrent local embeds,
    // the model handle is not assumed reentrant.
    local_embedder: Mutex<Option<TextEmbedding>>,
}

impl EmbeddingService {
    pub fn new(config: LLMConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            local_embedder: Mutex::new(None),
        }
    }

    fn resolve_local_model(model: &str) -> EmbeddingModel {
        match model.trim().to_lowercase().as_str() {
            "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            _ => EmbeddingModel::AllMiniLML6V2,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.config.provider {
            LLMProvider::Local => self.embed_local(&[text.to_string()]).map(|mut v| v.remove(0)),
            LLMProvider::OpenAI => self.embed_openai(text).await,
            LLMProvider::Gemini => self.embed_gemini(text).await,
        }
    }

    /// Embed many texts; local models batch natively, remote ones loop.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self.config.provider {
            LLMProvider::Local => self.embed_local(texts),
            _ => {
                let mut embeddings = Vec::with_capacity(texts.len());
                for text in texts {
                    embeddings.push(self.embed(text).await?);
                }
                Ok(embeddings)
            }
        }
    }

    fn embed_local(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut guard = self
            .local_embedder
            .lock()
            .map_err(|_| AppError::Internal("Local embedder lock poisoned".to_string()))?;
        if guard.is_none() {
            let mut options = InitOptions::default();
            options.model_name = Self::resolve_local_model(&self.config.model);
            let embedder = TextEmbedding::try_new(options)
                .map_err(|e| AppError::Internal(format!("Failed to init local embedder: {}", e)))?;
            *guard = Some(embedder);
        }
        let embedder = guard
            .as_mut()
            .ok_or_else(|| AppError::Internal("Local embedder unavailable".to_string()))?;

        let embeddings = embedder
            .embed(texts.to_vec(), None)
            .map_err(|e| AppError::Internal(format!("Failed to embed text: {}", e)))?;
        if embeddings.len() != texts.len() || embeddings.iter().any(|e| e.is_empty()) {
            return Err(AppError::Internal("Empty embedding response".to_string()));
        }
        Ok(embeddings)
    }

    async fn embed_openai(&self, text: &str) -> Result<Vec<f32>> {
        let base_url = self.config.base_url.trim_end_matches('/');
        let url = format!("{}/embeddings", base_url);

        let request = OpenAIEmbeddingRequest {
            model: self.config.model.clone(),
            input: text.to_string(),
        };

        let mut req = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to call embedding API ({}): {}", url, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Internal(format!(
                "Embedding API returned error {} (URL: {}): {}",
                status, url, error_text
            )));
        }

        let embedding_response: OpenAIEmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Internal(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = embedding_response
            .data
            .first()
            .map(|d| d.embedding.clone())
            .ok_or_else(|| AppError::Internal("No embedding data in response".to_string()))?;
        if embedding.is_empty() {
            return Err(AppError::Internal("Empty embedding response".to_string()));
        }
        Ok(embedding)
    }

    async fn embed_gemini(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Internal("Missing API key for Gemini provider".to_string()))?;
        let base_url = self.config.base_url.trim_end_matches('/');
        let url = format!(
            "{}/{}:embedContent?key={}",
            base_url, self.config.model, api_key
        );

        let request = GeminiEmbeddingRequest {
            content: GeminiEmbeddingContent {
                parts: vec![GeminiEmbeddingPart {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to call embedding API ({}): {}", url, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Internal(format!(
                "Embedding API returned error {} (URL: {}): {}",
                status, url, error_text
            )));
        }

        let embedding_response: GeminiEmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Internal(format!("Failed to parse embedding response: {}", e))
        })?;

        let embedding = embedding_response.embedding.values;
        if embedding.is_empty() {
            return Err(AppError::Internal("Empty embedding response".to_string()));
        }
        Ok(embedding)
    }

    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }
}

/// Serialize an embedding matrix: u32 row count, u32 dimension, then f32
/// values row-major, all little-endian.
pub fn matrix_to_bytes(matrix: &[Vec<f32>]) -> Vec<u8> {
    let rows = matrix.len() as u32;
    let dim = matrix.first().map(|row| row.len()).unwrap_or(0) as u32;

    let mut bytes = Vec::with_capacity(8 + (rows as usize) * (dim as usize) * 4);
    bytes.extend_from_slice(&rows.to_le_bytes());
    bytes.extend_from_slice(&dim.to_le_bytes());
    for row in matrix {
        for &val in row {
            bytes.extend_from_slice(&val.to_le_bytes());
        }
    }
    bytes
}

pub fn bytes_to_matrix(bytes: &[u8]) -> Result<Vec<Vec<f32>>> {
    if bytes.len() < 8 {
        return Err(AppError::ParseError(
            "Embedding artifact too short".to_string(),
        ));
    }
    let rows = u32::from_le_bytes(bytes[0..4].try_into().unwrap_or_default()) as usize;
    let dim = u32::from_le_bytes(bytes[4..8].try_into().unwrap_or_default()) as usize;
    let payload = &bytes[8..];

    if payload.len() != rows * dim * 4 {
        return Err(AppError::ParseError(format!(
            "Embedding artifact length mismatch: expected {}x{} values, got {} bytes",
            rows,
            dim,
            payload.len()
        )));
    }

    let mut matrix = Vec::with_capacity(rows);
    for row_idx in 0..rows {
        let mut row = Vec::with_capacity(dim);
        for col_idx in 0..dim {
            let offset = (row_idx * dim + col_idx) * 4;
            let chunk: [u8; 4] = payload[offset..offset + 4]
                .try_into()
                .unwrap_or_default();
            row.push(f32::from_le_bytes(chunk));
        }
        matrix.push(row);
    }
    Ok(matrix)
}

pub fn save_matrix(path: &Path, matrix: &[Vec<f32>]) -> Result<()> {
    fs::write(path, matrix_to_bytes(matrix)).map_err(|e| {
        AppError::IoError(format!(
            "Failed to write embedding artifact {}: {}",
            path.display(),
            e
        ))
    })
}

pub fn load_matrix(path: &Path) -> Result<Vec<Vec<f32>>> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::IoError(format!(
            "Failed to read embedding artifact {}: {}",
            path.display(),
            e
        ))
    })?;
    bytes_to_matrix(&bytes)
}
