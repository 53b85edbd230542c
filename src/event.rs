use crate::chat::error::ChatError;
use crate::chat::log::MessageId;
use crate::chat::SessionHandle;

#[derive(Debug, Clone)]
pub enum AppEvent {
    SessionCreated {
        generation: u64,
        session: SessionHandle,
    },
    SessionFailed {
        generation: u64,
        error: ChatError,
    },
    Fragment {
        message_id: MessageId,
        text: String,
    },
    StreamEnd {
        message_id: MessageId,
    },
    StreamFailed {
        message_id: MessageId,
        error: ChatError,
    },
}
