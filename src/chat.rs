use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, input: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
}

#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiClient {
    pub fn new<K: Into<String>, M: Into<String>>(api_key: K, model: M) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            url: OPENAI_API_URL.to_string(),
        }
    }

    /// Points the client at a different chat-completions endpoint.
    pub fn with_url<U: Into<String>>(mut self, url: U) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl ChatCompletion for OpenAiClient {
    async fn complete(&self, input: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: input.to_string(),
            }],
        };

        let resp = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("OpenAI response read failed")?;

        if !status.is_success() {
            return Err(anyhow!("OpenAI API error: {} - {}", status, body));
        }

        first_choice(&body)
    }
}

fn first_choice(body: &str) -> Result<String> {
    let parsed: OpenAiResponse =
        serde_json::from_str(body).context("OpenAI response parse failed")?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("OpenAI response missing choices"))
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}},{"message":{"content":"ignored"}}]}"#;
        assert_eq!(first_choice(body).unwrap(), "Hi there");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = first_choice(r#"{"choices":[]}"#).unwrap_err();
        assert!(err.to_string().contains("missing choices"));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(first_choice("<html>bad gateway</html>").is_err());
    }

    #[test]
    fn request_carries_prompt_as_user_message() {
        let request = OpenAiRequest {
            model: "gpt-5".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "When is the career fair?".to_string(),
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-5");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "When is the career fair?");
    }
}
