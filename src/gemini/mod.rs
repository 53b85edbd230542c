pub mod sse;
pub mod wire;

use crate::chat::error::ChatError;
use crate::chat::GenerationParams;
use crate::config::{ClientConfig, Credential};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use sse::SseLineParser;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use wire::{Content, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub text: Option<String>,
}

impl Fragment {
    #[cfg(test)]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, RemoteError>> + Send>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    pub params: GenerationParams,
}

#[async_trait]
pub trait ChatSession: Send + Sync {
    async fn send_stream(&self, prompt: String) -> Result<FragmentStream, RemoteError>;
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn create_session(
        &self,
        config: SessionConfig,
    ) -> Result<Arc<dyn ChatSession>, RemoteError>;
}

pub struct GeminiClient {
    http: reqwest::Client,
    credential: Credential,
    base_url: String,
}

impl GeminiClient {
    pub fn connect(credential: &Credential, config: &ClientConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|err| ChatError::ClientInit(err.to_string()))?;
        info!(base_url = %config.base_url, "gemini client initialized");
        Ok(Self {
            http,
            credential: credential.clone(),
            base_url: config.base_url.clone(),
        })
    }
}

fn validate(config: &SessionConfig) -> Result<(), RemoteError> {
    let params = &config.params;
    if config.model.trim().is_empty() {
        return Err(RemoteError::new("model_name must not be empty"));
    }
    if !(0.0..=2.0).contains(&params.temperature) {
        return Err(RemoteError::new(format!(
            "temperature {} is outside 0.0..=2.0",
            params.temperature
        )));
    }
    if params.top_k == 0 {
        return Err(RemoteError::new("top_k must be at least 1"));
    }
    if !(0.0..=1.0).contains(&params.top_p) {
        return Err(RemoteError::new(format!(
            "top_p {} is outside 0.0..=1.0",
            params.top_p
        )));
    }
    Ok(())
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn create_session(
        &self,
        config: SessionConfig,
    ) -> Result<Arc<dyn ChatSession>, RemoteError> {
        validate(&config)?;
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, config.model
        );
        debug!(%url, "creating gemini chat session");
        Ok(Arc::new(GeminiChat {
            http: self.http.clone(),
            credential: self.credential.clone(),
            url,
            config,
            history: Arc::new(Mutex::new(Vec::new())),
        }))
    }
}

struct GeminiChat {
    http: reqwest::Client,
    credential: Credential,
    url: String,
    config: SessionConfig,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiChat {
    fn build_request(&self, prompt: &str) -> GenerateContentRequest {
        let mut contents = match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        contents.push(Content::user(prompt));

        let instruction = self.config.params.system_instruction.trim();
        GenerateContentRequest {
            contents,
            system_instruction: (!instruction.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: Some(instruction.to_string()),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.config.params.temperature,
                top_k: self.config.params.top_k,
                top_p: self.config.params.top_p,
            },
        }
    }
}

#[async_trait]
impl ChatSession for GeminiChat {
    async fn send_stream(&self, prompt: String) -> Result<FragmentStream, RemoteError> {
        let body = self.build_request(&prompt);
        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| RemoteError::new(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_http_error(status.as_u16(), &body_text));
        }

        let turn = HistoryCommit {
            history: Arc::clone(&self.history),
            prompt,
        };
        Ok(Box::pin(fragment_stream(response.bytes_stream(), turn)))
    }
}

fn map_http_error(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| match envelope.error.status {
            Some(kind) if !envelope.error.message.is_empty() => {
                format!("{} ({kind})", envelope.error.message)
            }
            _ => envelope.error.message,
        })
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}: {}", body.trim()));
    RemoteError {
        status: Some(status),
        message,
    }
}

struct HistoryCommit {
    history: Arc<Mutex<Vec<Content>>>,
    prompt: String,
}

impl HistoryCommit {
    fn commit(self, reply: String) {
        let mut history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.push(Content::user(self.prompt));
        history.push(Content::model(reply));
    }
}

struct StreamState<S> {
    bytes: Pin<Box<S>>,
    parser: SseLineParser,
    buffered: VecDeque<Result<Fragment, RemoteError>>,
    reply: String,
    turn: Option<HistoryCommit>,
    done: bool,
}

impl<S> StreamState<S> {
    fn queue_event(&mut self, data: &str) {
        if data.trim().is_empty() {
            return;
        }
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(data) {
            self.buffered.push_back(Err(RemoteError {
                status: envelope.error.code,
                message: envelope.error.message,
            }));
            return;
        }
        match serde_json::from_str::<GenerateContentResponse>(data) {
            Ok(response) => {
                if let Some(reason) = response
                    .candidates
                    .first()
                    .and_then(|candidate| candidate.finish_reason.as_deref())
                {
                    debug!(reason, "gemini candidate finished");
                }
                let text = response.text();
                if let Some(text) = &text {
                    self.reply.push_str(text);
                }
                self.buffered.push_back(Ok(Fragment { text }));
            }
            Err(err) => {
                warn!(%err, "unparseable stream payload");
                self.buffered.push_back(Err(RemoteError::new(format!(
                    "invalid stream payload: {err}"
                ))));
            }
        }
    }
}

fn fragment_stream<S>(
    bytes: S,
    turn: HistoryCommit,
) -> impl Stream<Item = Result<Fragment, RemoteError>> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let state = StreamState {
        bytes: Box::pin(bytes),
        parser: SseLineParser::new(),
        buffered: VecDeque::new(),
        reply: String::new(),
        turn: Some(turn),
        done: false,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.buffered.pop_front() {
                if item.is_err() {
                    state.done = true;
                    state.buffered.clear();
                    state.turn = None;
                }
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for event in state.parser.push(&chunk) {
                        state.queue_event(&event.data);
                    }
                }
                Some(Err(err)) => {
                    state
                        .buffered
                        .push_back(Err(RemoteError::new(format!("stream read error: {err}"))));
                }
                None => {
                    if let Some(event) = state.parser.flush() {
                        state.queue_event(&event.data);
                    }
                    state.done = true;
                    if state.buffered.iter().all(Result::is_ok) {
                        if let Some(turn) = state.turn.take() {
                            turn.commit(std::mem::take(&mut state.reply));
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn commit_target() -> (Arc<Mutex<Vec<Content>>>, HistoryCommit) {
        let history = Arc::new(Mutex::new(Vec::new()));
        let turn = HistoryCommit {
            history: Arc::clone(&history),
            prompt: "hi".to_string(),
        };
        (history, turn)
    }

    fn body(chunks: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, reqwest::Error>> {
        stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<_, reqwest::Error>(Bytes::from_static(chunk.as_bytes()))),
        )
    }

    fn params() -> GenerationParams {
        GenerationParams {
            system_instruction: "be brief".to_string(),
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
        }
    }

    #[tokio::test]
    async fn stream_yields_fragments_and_commits_history() {
        let (history, turn) = commit_target();
        let chunks = vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\n\ndata: {\"candidates\":",
            "[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n\n",
        ];
        let items: Vec<_> = fragment_stream(body(chunks), turn).collect().await;

        assert_eq!(
            items,
            vec![
                Ok(Fragment::text("Hel")),
                Ok(Fragment::default()),
                Ok(Fragment::text("lo")),
            ]
        );
        let history = history.lock().expect("history lock");
        assert_eq!(history.as_slice(), &[Content::user("hi"), Content::model("Hello")]);
    }

    #[tokio::test]
    async fn error_payload_ends_stream_without_history() {
        let (history, turn) = commit_target();
        let chunks = vec![
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"x\"}]}}]}\n\n",
            "data: {\"error\":{\"code\":429,\"message\":\"quota exhausted\"}}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"y\"}]}}]}\n\n",
        ];
        let items: Vec<_> = fragment_stream(body(chunks), turn).collect().await;

        assert_eq!(items.len(), 2);
        let error = items[1].clone().expect_err("second item is the failure");
        assert_eq!(error.status, Some(429));
        assert!(history.lock().expect("history lock").is_empty());
    }

    #[test]
    fn http_error_body_is_unwrapped() {
        let error = map_http_error(
            400,
            r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#,
        );
        assert_eq!(error.status, Some(400));
        assert!(error.message.starts_with("API key not valid"));

        let raw = map_http_error(502, "bad gateway");
        assert_eq!(raw.message, "HTTP 502: bad gateway");
    }

    #[test]
    fn session_parameters_are_validated() {
        let mut config = SessionConfig {
            model: "gemini-test".to_string(),
            params: params(),
        };
        assert!(validate(&config).is_ok());

        config.params.top_k = 0;
        assert!(validate(&config).is_err());

        config.params = params();
        config.params.top_p = 1.5;
        assert!(validate(&config).is_err());

        config.params = params();
        config.model = " ".to_string();
        let error = validate(&config).expect_err("empty model");
        assert!(error.message.contains("model_name"));
    }

    #[test]
    fn request_carries_history_and_prompt() {
        let chat = GeminiChat {
            http: reqwest::Client::new(),
            credential: crate::config::Credential::for_tests("k"),
            url: "http://localhost/unused".to_string(),
            config: SessionConfig {
                model: "gemini-test".to_string(),
                params: params(),
            },
            history: Arc::new(Mutex::new(vec![Content::user("a"), Content::model("b")])),
        };
        let request = chat.build_request("c");
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[2], Content::user("c"));
        assert_eq!(request.generation_config.top_k, 40);
        assert!(request.system_instruction.is_some());
    }
}
