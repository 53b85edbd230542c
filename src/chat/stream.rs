use crate::chat::error::ChatError;
use crate::chat::log::MessageId;
use crate::chat::SessionHandle;
use crate::event::AppEvent;
use futures_util::StreamExt;
use std::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn pump_stream(
    session: SessionHandle,
    prompt: String,
    message_id: MessageId,
    model: String,
    tx: mpsc::Sender<AppEvent>,
) {
    let fail = |error: &crate::gemini::RemoteError| {
        warn!(%message_id, status = ?error.status, %error, "send failed");
        let _ = tx.send(AppEvent::StreamFailed {
            message_id,
            error: ChatError::classify_send_failure(error, &model),
        });
    };

    let mut stream = match session.chat().send_stream(prompt).await {
        Ok(stream) => stream,
        Err(error) => {
            fail(&error);
            return;
        }
    };

    let mut received = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(fragment) => match fragment.text {
                Some(text) => {
                    received += text.len();
                    if tx.send(AppEvent::Fragment { message_id, text }).is_err() {
                        debug!(%message_id, "event channel closed; dropping stream");
                        return;
                    }
                }
                None => warn!(%message_id, "received fragment without text content"),
            },
            Err(error) => {
                fail(&error);
                return;
            }
        }
    }

    info!(%message_id, bytes = received, "stream ended");
    let _ = tx.send(AppEvent::StreamEnd { message_id });
}

#[cfg(test)]
mod tests {
    use super::pump_stream;
    use crate::chat::error::{ChatError, SendFailure};
    use crate::chat::log::MessageLog;
    use crate::chat::test_support::ScriptedChat;
    use crate::chat::SessionHandle;
    use crate::event::AppEvent;
    use crate::gemini::{Fragment, RemoteError};
    use std::sync::mpsc;

    async fn run(script: Vec<Result<Fragment, RemoteError>>) -> Vec<AppEvent> {
        let mut log = MessageLog::default();
        let id = log.push_placeholder();
        let (tx, rx) = mpsc::channel();
        let session = SessionHandle::new(ScriptedChat::new(script));
        pump_stream(session, "hi".to_string(), id, "gemini-test".to_string(), tx).await;
        rx.try_iter().collect()
    }

    #[tokio::test]
    async fn fragments_then_end() {
        let events = run(vec![
            Ok(Fragment::text("Hel")),
            Ok(Fragment::default()),
            Ok(Fragment::text("lo")),
        ])
        .await;

        let texts: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                AppEvent::Fragment { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
        assert!(matches!(events.last(), Some(AppEvent::StreamEnd { .. })));
    }

    #[tokio::test]
    async fn mid_stream_error_is_classified_and_final() {
        let events = run(vec![
            Ok(Fragment::text("par")),
            Err(RemoteError::new("Quota exceeded for requests")),
            Ok(Fragment::text("never")),
        ])
        .await;

        assert_eq!(events.len(), 2);
        match &events[1] {
            AppEvent::StreamFailed { error, .. } => {
                assert!(matches!(error, ChatError::Send(SendFailure::RateLimited(_))));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
