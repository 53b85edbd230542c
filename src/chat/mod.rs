pub mod error;
pub mod log;
pub mod stream;

use crate::event::AppEvent;
use crate::gemini::{ChatSession, GenerativeClient, SessionConfig};
use error::ChatError;
use log::{Message, MessageId, MessageLog};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub system_instruction: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
}

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct SessionHandle {
    id: u64,
    chat: Arc<dyn ChatSession>,
}

impl SessionHandle {
    pub fn new(chat: Arc<dyn ChatSession>) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            chat,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn chat(&self) -> &Arc<dyn ChatSession> {
        &self.chat
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle").field("id", &self.id).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    InitFailed(ChatError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    Idle,
    Streaming { message_id: MessageId },
}

pub struct ChatSessionManager {
    client: Result<Arc<dyn GenerativeClient>, ChatError>,
    runtime: Handle,
    tx: mpsc::Sender<AppEvent>,
    model: String,
    params: Option<GenerationParams>,
    generation: u64,
    state: SessionState,
    session: Option<SessionHandle>,
    send_state: SendState,
    in_flight: Option<JoinHandle<()>>,
    log: MessageLog,
    error: Option<String>,
}

impl ChatSessionManager {
    pub fn new(
        client: Result<Arc<dyn GenerativeClient>, ChatError>,
        runtime: Handle,
        tx: mpsc::Sender<AppEvent>,
        model: impl Into<String>,
    ) -> Self {
        let error = match &client {
            Ok(_) => None,
            Err(err) => {
                error!(%err, "generative client unavailable");
                Some(err.to_string())
            }
        };
        let state = match &client {
            Ok(_) => SessionState::Uninitialized,
            Err(err) => SessionState::InitFailed(err.clone()),
        };
        Self {
            client,
            runtime,
            tx,
            model: model.into(),
            params: None,
            generation: 0,
            state,
            session: None,
            send_state: SendState::Idle,
            in_flight: None,
            log: MessageLog::default(),
            error,
        }
    }

    pub fn configure(&mut self, params: GenerationParams) {
        if self.params.as_ref() == Some(&params) {
            return;
        }
        let client = match &self.client {
            Ok(client) => Arc::clone(client),
            Err(_) => {
                debug!("client unavailable; skipping session creation");
                self.params = Some(params);
                return;
            }
        };

        self.generation += 1;
        self.abort_in_flight();
        self.session = None;
        self.log.clear();
        self.state = SessionState::Initializing;
        self.params = Some(params.clone());

        let generation = self.generation;
        let tx = self.tx.clone();
        let config = SessionConfig {
            model: self.model.clone(),
            params,
        };
        info!(generation, model = %config.model, "creating chat session");
        self.runtime.spawn(async move {
            let event = match client.create_session(config).await {
                Ok(chat) => AppEvent::SessionCreated {
                    generation,
                    session: SessionHandle::new(chat),
                },
                Err(err) => AppEvent::SessionFailed {
                    generation,
                    error: ChatError::SessionCreate(err.message),
                },
            };
            let _ = tx.send(event);
        });
    }

    pub fn send(&mut self, prompt: &str) -> Result<Option<MessageId>, ChatError> {
        if prompt.trim().is_empty() || self.is_streaming() {
            return Ok(None);
        }
        let session = match (&self.state, &self.session) {
            (SessionState::Ready, Some(session)) => session.clone(),
            _ => {
                let err = match &self.client {
                    Err(err) => err.clone(),
                    Ok(_) => ChatError::SessionUnavailable,
                };
                warn!(%err, "send rejected");
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        self.error = None;
        self.log.push_user(prompt);
        let message_id = self.log.push_placeholder();
        self.send_state = SendState::Streaming { message_id };

        info!(%message_id, session = session.id(), "sending prompt");
        let task = stream::pump_stream(
            session,
            prompt.to_string(),
            message_id,
            self.model.clone(),
            self.tx.clone(),
        );
        self.in_flight = Some(self.runtime.spawn(task));
        Ok(Some(message_id))
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionCreated {
                generation,
                session,
            } => {
                if generation != self.generation {
                    debug!(generation, "dropping superseded session");
                    return;
                }
                info!(generation, session = session.id(), "chat session ready");
                self.session = Some(session);
                self.state = SessionState::Ready;
                self.error = None;
            }
            AppEvent::SessionFailed { generation, error } => {
                if generation != self.generation {
                    return;
                }
                error!(generation, %error, "chat session creation failed");
                self.session = None;
                self.error = Some(error.to_string());
                self.state = SessionState::InitFailed(error);
            }
            AppEvent::Fragment { message_id, text } => {
                if !self.log.append_fragment(message_id, &text) {
                    debug!(%message_id, "fragment for cleared message ignored");
                }
            }
            AppEvent::StreamEnd { message_id } => {
                self.log.finish(message_id);
                self.settle(message_id);
            }
            AppEvent::StreamFailed { message_id, error } => {
                let message = error.to_string();
                if self.log.fail(message_id, &message) {
                    self.error = Some(message);
                }
                self.settle(message_id);
            }
        }
    }

    fn settle(&mut self, message_id: MessageId) {
        if self.send_state == (SendState::Streaming { message_id }) {
            self.send_state = SendState::Idle;
            self.in_flight = None;
        }
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            debug!("aborting in-flight stream");
            task.abort();
        }
        self.send_state = SendState::Idle;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.send_state, SendState::Streaming { .. })
    }

    pub fn can_send(&self) -> bool {
        self.state == SessionState::Ready && self.session.is_some() && !self.is_streaming()
    }

    pub fn messages(&self) -> &[Message] {
        self.log.messages()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn status_line(&self) -> String {
        match &self.state {
            SessionState::Uninitialized => "Checking API Key...".to_string(),
            SessionState::Initializing => "API Key found. Initializing AI...".to_string(),
            SessionState::Ready if self.is_streaming() => "Waiting for response...".to_string(),
            SessionState::Ready => "Type your message...".to_string(),
            SessionState::InitFailed(err) if err.is_credential_error() => {
                format!("API Key error: {err}")
            }
            SessionState::InitFailed(err) => err.to_string(),
        }
    }
}
