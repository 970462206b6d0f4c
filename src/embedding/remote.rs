//! Remote embedding provider.
//!
//! Calls an OpenAI-compatible embeddings endpoint: `POST {api_base}{path}` with
//! `{model, input, dimensions}` and a bearer key, parsing the `data[].embedding`
//! response array. Requests carry the configured timeout so no embed call can
//! block indefinitely.

use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::ServiceError;

pub struct RemoteEmbeddingProvider {
    client: Client,
    url: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        if api_key.is_empty() {
            tracing::warn!(
                env = %config.api_key_env,
                "embedding API key env var is empty; non-empty embeds will fail"
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}{}", config.api_base, config.path),
            model: config.model.clone(),
            api_key,
            dimensions: config.dimensions,
        })
    }

    fn request(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
            "dimensions": self.dimensions,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::EmbeddingUnavailable(e.to_string()))?;

        let json: Value = response
            .json()
            .map_err(|e| ServiceError::EmbeddingUnavailable(e.to_string()))?;

        let mut vectors = parse_embedding_response(&json)?;
        let vector = if vectors.is_empty() {
            return Err(ServiceError::EmbeddingUnavailable(
                "embedding response contained no vectors".into(),
            ));
        } else {
            vectors.swap_remove(0)
        };

        if vector.len() != self.dimensions {
            return Err(ServiceError::EmbeddingUnavailable(format!(
                "provider returned {} dimensions, expected {}",
                vector.len(),
                self.dimensions
            )));
        }

        Ok(vector)
    }
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        // Empty input never reaches the remote model. The zero vector scores 0
        // against everything in the ranking function, so such notes are inert.
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimensions]);
        }
        self.request(text)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Parse the `data` array of an embeddings response, restoring request order
/// from each item's `index` field.
fn parse_embedding_response(json: &Value) -> Result<Vec<Vec<f32>>, ServiceError> {
    let data = json
        .get("data")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            ServiceError::EmbeddingUnavailable("embedding response missing data array".into())
        })?;

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (fallback_index, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(fallback_index);
        let values = item
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ServiceError::EmbeddingUnavailable("embedding item missing embedding array".into())
            })?;
        let mut vector = Vec::with_capacity(values.len());
        for value in values {
            let number = value.as_f64().ok_or_else(|| {
                ServiceError::EmbeddingUnavailable("embedding value must be numeric".into())
            })?;
            vector.push(number as f32);
        }
        indexed.push((index, vector));
    }

    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embeddings_in_index_order() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [2.0, 3.0] },
                { "index": 0, "embedding": [0.5, 1.5] }
            ]
        });
        let parsed = parse_embedding_response(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], vec![0.5, 1.5]);
        assert_eq!(parsed[1], vec![2.0, 3.0]);
    }

    #[test]
    fn missing_data_array_is_unavailable() {
        let json = serde_json::json!({ "error": "rate limited" });
        let err = parse_embedding_response(&json).unwrap_err();
        assert!(matches!(err, ServiceError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn non_numeric_value_is_unavailable() {
        let json = serde_json::json!({
            "data": [ { "index": 0, "embedding": [1.0, "oops"] } ]
        });
        let err = parse_embedding_response(&json).unwrap_err();
        assert!(matches!(err, ServiceError::EmbeddingUnavailable(_)));
    }

    #[test]
    fn blank_input_embeds_to_zero_vector_without_key() {
        // No API key and an unroutable URL; embed must still succeed for
        // whitespace because the remote is never called.
        let config = EmbeddingConfig {
            api_base: "http://127.0.0.1:1".into(),
            dimensions: 8,
            ..EmbeddingConfig::default()
        };
        let provider = RemoteEmbeddingProvider::new(&config).unwrap();

        let vector = provider.embed("   \t\n").unwrap();
        assert_eq!(vector.len(), 8);
        assert!(vector.iter().all(|v| *v == 0.0));
    }
}
