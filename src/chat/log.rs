use chrono::{DateTime, Local};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Time-derived message id, strictly increasing within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct MessageIdGen {
    last: u64,
}

impl MessageIdGen {
    pub fn next_id(&mut self) -> MessageId {
        let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_millis() as u64,
            Err(_) => 0,
        };
        self.last = now.max(self.last + 1);
        MessageId(self.last)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageMeta {
    pub is_loading: bool,
    pub is_error: bool,
    pub chunks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Local>,
    pub meta: Option<MessageMeta>,
}

impl Message {
    pub fn is_loading(&self) -> bool {
        self.meta.as_ref().is_some_and(|meta| meta.is_loading)
    }

    pub fn is_error(&self) -> bool {
        self.meta.as_ref().is_some_and(|meta| meta.is_error)
    }
}

#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    ids: MessageIdGen,
}

impl MessageLog {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        let id = self.ids.next_id();
        self.messages.push(Message {
            id,
            text: text.into(),
            sender: Sender::User,
            timestamp: Local::now(),
            meta: None,
        });
        id
    }

    pub fn push_placeholder(&mut self) -> MessageId {
        let id = self.ids.next_id();
        self.messages.push(Message {
            id,
            text: String::new(),
            sender: Sender::Bot,
            timestamp: Local::now(),
            meta: Some(MessageMeta {
                is_loading: true,
                is_error: false,
                chunks: Vec::new(),
            }),
        });
        id
    }

    #[cfg(test)]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| message.id == id)
    }

    pub fn append_fragment(&mut self, id: MessageId, fragment: &str) -> bool {
        let Some(message) = self.get_mut(id) else {
            return false;
        };
        message.text.push_str(fragment);
        message
            .meta
            .get_or_insert_with(MessageMeta::default)
            .chunks
            .push(fragment.to_string());
        true
    }

    pub fn finish(&mut self, id: MessageId) -> bool {
        let Some(message) = self.get_mut(id) else {
            return false;
        };
        message.meta.get_or_insert_with(MessageMeta::default).is_loading = false;
        true
    }

    pub fn fail(&mut self, id: MessageId, error: &str) -> bool {
        let Some(message) = self.get_mut(id) else {
            return false;
        };
        message.text = format!("Error: {error}");
        message.meta = Some(MessageMeta {
            is_loading: false,
            is_error: true,
            chunks: Vec::new(),
        });
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageIdGen, MessageLog, Sender};

    #[test]
    fn fragments_accumulate_into_placeholder() {
        let mut log = MessageLog::default();
        log.push_user("hi");
        let id = log.push_placeholder();
        for fragment in ["Hel", "lo,", " world"] {
            assert!(log.append_fragment(id, fragment));
        }
        assert!(log.finish(id));

        let message = log.get(id).expect("placeholder should exist");
        assert_eq!(message.sender, Sender::Bot);
        assert_eq!(message.text, "Hello, world");
        assert!(!message.is_loading());
        let meta = message.meta.as_ref().expect("bot message has meta");
        assert_eq!(meta.chunks, vec!["Hel", "lo,", " world"]);
    }

    #[test]
    fn failure_replaces_text_with_error() {
        let mut log = MessageLog::default();
        let id = log.push_placeholder();
        log.append_fragment(id, "partial");
        log.fail(id, "API quota exceeded: limit");

        let message = log.get(id).expect("placeholder should exist");
        assert!(message.is_error());
        assert!(!message.is_loading());
        assert_eq!(message.text, "Error: API quota exceeded: limit");
    }

    #[test]
    fn updates_to_cleared_ids_are_no_ops() {
        let mut log = MessageLog::default();
        let id = log.push_placeholder();
        log.clear();
        assert!(!log.append_fragment(id, "late"));
        assert!(!log.finish(id));
        assert!(!log.fail(id, "late"));
        assert!(log.is_empty());
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let mut ids = MessageIdGen::default();
        let first = ids.next_id();
        let second = ids.next_id();
        let third = ids.next_id();
        assert!(first < second && second < third);
    }
}
