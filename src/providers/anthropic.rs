use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::ProviderConfig;
use crate::providers::{
    build_http_client, GenerationProvider, GenerationReply, GenerationRequest, ProviderError,
    TokenUsage,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API implementation of [`GenerationProvider`].
pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let client = build_http_client(Duration::from_secs(config.request_timeout_secs))
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Parse a Messages API response body into a reply: concatenate the text
    /// content blocks and pick up token usage when reported.
    fn parse_reply(data: &Value) -> GenerationReply {
        let mut text = String::new();
        if let Some(blocks) = data["content"].as_array() {
            for block in blocks {
                if block["type"].as_str() == Some("text") {
                    if let Some(t) = block["text"].as_str() {
                        text.push_str(t);
                    }
                }
            }
        }

        let usage = data.get("usage").and_then(|u| {
            Some(TokenUsage {
                input_tokens: u.get("input_tokens")?.as_u64()? as u32,
                output_tokens: u.get("output_tokens")?.as_u64()? as u32,
            })
        });

        GenerationReply { text, usage }
    }
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<GenerationReply> {
        let body = json!({
            "model": request.model_identifier,
            "max_tokens": request.max_output_tokens,
            "system": request.system_instructions,
            "messages": [{
                "role": "user",
                "content": request.user_prompt,
            }],
        });

        info!(model = %request.model_identifier, url = %self.base_url, "Calling Anthropic");

        let resp = match self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("Anthropic HTTP request failed: {}", e);
                return Err(ProviderError::network(&e).into());
            }
        };

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            error!(status = %status, "Anthropic API error: {}", text);
            return Err(ProviderError::from_status(status.as_u16(), &text).into());
        }

        let data: Value = serde_json::from_str(&text)?;
        let reply = Self::parse_reply(&data);
        debug!(chars = reply.text.len(), "Anthropic reply received");
        Ok(reply)
    }
}
