//! Remote model provider: an OpenAI-compatible chat completions client with
//! strict structured output.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use heyi_shared::{HeyiConfig, HeyiError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Name given to the response schema in the request.
const SCHEMA_NAME: &str = "response";

/// One structured completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    /// The fully assembled prompt, sent as the single user message.
    pub prompt: String,
    /// JSON Schema the reply must satisfy.
    pub schema: Value,
}

/// A model that answers a prompt with a JSON value matching a schema.
#[allow(async_fn_in_trait)]
pub trait ModelProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenRouterClient
// ---------------------------------------------------------------------------

/// Client for OpenRouter or any endpoint speaking the same API.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HeyiError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &HeyiConfig) -> Result<Self> {
        Self::new(config.api_key.clone(), config.base_url.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl ModelProvider for OpenRouterClient {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: SCHEMA_NAME,
                    strict: true,
                    schema: &request.schema,
                },
            },
        };

        debug!(prompt_chars = request.prompt.len(), "sending completion request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| HeyiError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(HeyiError::Provider(format!("HTTP {status}: {}", detail.trim())));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| HeyiError::Provider(format!("invalid response body: {e}")))?;

        let value = parse_reply(parsed)?;
        info!("completion received");
        Ok(value)
    }
}

/// Extract and decode the JSON content of the first choice.
fn parse_reply(response: ChatResponse) -> Result<Value> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| HeyiError::Provider("response contained no choices".into()))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
        return Err(HeyiError::Provider(format!("model refused: {refusal}")));
    }

    let content = message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| HeyiError::Provider("response message has no content".into()))?;

    serde_json::from_str(&content)
        .map_err(|e| HeyiError::Provider(format!("response content is not valid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "openai/gpt-4o-mini".into(),
            prompt: "Say hi".into(),
            schema: json!({
                "type": "object",
                "properties": { "result": { "type": "string" } },
                "required": ["result"],
                "additionalProperties": false
            }),
        }
    }

    fn reply(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[tokio::test]
    async fn sends_structured_request_and_parses_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "openai/gpt-4o-mini",
                "messages": [{ "role": "user", "content": "Say hi" }],
                "response_format": {
                    "type": "json_schema",
                    "json_schema": { "name": "response", "strict": true }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(r#"{"result":"hi"}"#)))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("sk-test", format!("{}/", server.uri())).unwrap();
        let value = client.complete(&request()).await.unwrap();
        assert_eq!(value, json!({ "result": "hi" }));
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("bad", server.uri()).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, HeyiError::Provider(_)));
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid api key"));
    }

    #[tokio::test]
    async fn non_json_content_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("hello there")))
            .mount(&server)
            .await;

        let client = OpenRouterClient::new("k", server.uri()).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = parse_reply(ChatResponse { choices: vec![] }).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn refusal_is_reported() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null, "refusal": "cannot help" } }]
        }))
        .unwrap();
        let err = parse_reply(response).unwrap_err();
        assert!(err.to_string().contains("cannot help"));
    }
}
