//! HTTP client for the hidden-state encoder server.
//!
//! The transformer encoder runs as a separate service; this client POSTs
//! batched token ids + attention masks to `/encode` and receives per-token
//! hidden states. It is synchronous (blocking reqwest) because the
//! training loop consumes one batch at a time.
//!
//! # Server contract
//!
//! ```text
//! POST /encode
//! { "input_ids": [[...]], "attention_mask": [[...]] }
//!   -> { "hidden_states": [[[f32; hidden]; seq]; batch] }
//! ```

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use pointer::EncodeFn;

#[derive(Serialize)]
struct EncodeRequest<'a> {
    input_ids: &'a [Vec<i64>],
    attention_mask: &'a [Vec<i64>],
}

#[derive(Deserialize)]
struct EncodeResponse {
    hidden_states: Vec<Vec<Vec<f32>>>,
}

/// Blocking HTTP client for the encoder service.
#[derive(Debug)]
pub struct EncoderClient {
    client: Client,
    base_url: Url,
    hidden_size: usize,
}

impl EncoderClient {
    /// Create a new client. Fails on an unparseable URL.
    pub fn new(server_url: &str, hidden_size: usize) -> anyhow::Result<Self> {
        let base_url = Url::parse(server_url)
            .map_err(|e| anyhow::anyhow!("Invalid encoder URL '{server_url}': {e}"))?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url,
            hidden_size,
        })
    }

    /// Verify the server is reachable and responding.
    pub fn health_check(&self) -> anyhow::Result<()> {
        let url = self.base_url.join("/health")?;
        let resp = self
            .client
            .get(url)
            .timeout(Duration::from_secs(10))
            .send()
            .map_err(|e| {
                anyhow::anyhow!("Encoder server unreachable at {}: {e}", self.base_url)
            })?;
        if !resp.status().is_success() {
            anyhow::bail!(
                "Encoder server at {} returned {}",
                self.base_url,
                resp.status()
            );
        }
        tracing::info!(url = %self.base_url, "Encoder server is reachable");
        Ok(())
    }

    /// Encode a batch of tokenized sentences into per-token hidden states.
    pub fn encode(
        &self,
        input_ids: &[Vec<i64>],
        attention_mask: &[Vec<i64>],
    ) -> anyhow::Result<Vec<Vec<Vec<f32>>>> {
        let url = self.base_url.join("/encode")?;
        let resp = self
            .client
            .post(url)
            .json(&EncodeRequest {
                input_ids,
                attention_mask,
            })
            .send()
            .map_err(|e| anyhow::anyhow!("Encode request failed: {e}"))?;
        if !resp.status().is_success() {
            anyhow::bail!("Encoder server returned {}", resp.status());
        }
        let body: EncodeResponse = resp
            .json()
            .map_err(|e| anyhow::anyhow!("Invalid encode response: {e}"))?;

        validate_hidden_states(&body.hidden_states, input_ids, self.hidden_size)?;
        Ok(body.hidden_states)
    }

    /// Consume the client into an encoder closure for the pointer crate.
    pub fn into_encode_fn(self) -> Box<EncodeFn> {
        Box::new(move |ids: &[Vec<i64>], mask: &[Vec<i64>]| self.encode(ids, mask))
    }
}

/// Check that the response matches the request batch shape and the
/// configured hidden size.
fn validate_hidden_states(
    hidden: &[Vec<Vec<f32>>],
    input_ids: &[Vec<i64>],
    hidden_size: usize,
) -> anyhow::Result<()> {
    if hidden.len() != input_ids.len() {
        anyhow::bail!(
            "Encoder returned {} samples, expected {}",
            hidden.len(),
            input_ids.len()
        );
    }
    for (i, (sample, ids)) in hidden.iter().zip(input_ids).enumerate() {
        if sample.len() != ids.len() {
            anyhow::bail!(
                "Encoder sample {i} has {} token states, expected {}",
                sample.len(),
                ids.len()
            );
        }
        for (t, token) in sample.iter().enumerate() {
            if token.len() != hidden_size {
                anyhow::bail!(
                    "Encoder sample {i} token {t} has dimension {}, expected {hidden_size}",
                    token.len()
                );
            }
        }
    }
    Ok(())
}
