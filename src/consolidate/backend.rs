// src/consolidate/backend.rs
//! Chat-completion backends. The trait keeps the engine testable: production
//! talks to OpenAI, tests script replies and count calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ai::AiConfig;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
    #[error("backend returned an empty completion")]
    EmptyCompletion,
}

#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One chat completion round-trip. `system` frames the role, `user`
    /// carries the consolidation request.
    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError>;
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;
}

/// OpenAI Chat Completions. Requires an API key (usually `OPENAI_API_KEY`
/// resolved through [`AiConfig`]).
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiBackend {
    pub fn new(cfg: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("job-posting-aggregator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, system: &str, user: &str) -> Result<String, BackendError> {
        if self.api_key.is_empty() {
            return Err(BackendError::Rejected("no API key configured".into()));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Rejected(format!("status {status}")));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(BackendError::EmptyCompletion);
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Test backend: replays a fixed list of replies and counts calls. Running
/// out of script is a transport error, which keeps misconfigured tests loud.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many completions were requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .expect("poisoned script")
            .pop_front()
            .ok_or_else(|| BackendError::Transport("scripted replies exhausted".into()))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
