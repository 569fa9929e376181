//! Conversation / in-memory message store.
//!
//! `InMemoryStore` holds conversation history behind a lock rather than a
//! plain `Vec<Message>` behind `&mut self`, so it's safe for concurrent
//! access; every read returns a defensive copy so a caller cannot corrupt
//! shared state through a borrowed reference.

use crate::content::Message;
use crate::request::ChatRequestBuilder;
use crate::Result;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// A concurrent, ordered sequence of messages.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn append_many(&self, messages: impl IntoIterator<Item = Message>) {
        self.messages.lock().unwrap().extend(messages);
    }

    /// Returns a defensive copy of the full history.
    pub fn get_all(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    /// Returns the last `n` messages, or an empty vector if `n == 0`.
    pub fn get_last_n(&self, n: usize) -> Vec<Message> {
        if n == 0 {
            return Vec::new();
        }
        let messages = self.messages.lock().unwrap();
        let start = messages.len().saturating_sub(n);
        messages[start..].to_vec()
    }

    pub fn replace_all(&self, messages: Vec<Message>) {
        *self.messages.lock().unwrap() = messages;
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pairs an [`InMemoryStore`] with a client+model, offering a simple
/// `send(user_text)` turn that appends the user message, re-materializes
/// history into a request builder, and appends the assistant reply on success.
pub struct Conversation {
    store: InMemoryStore,
    builder: ChatRequestBuilder,
}

impl Conversation {
    pub fn new(builder: ChatRequestBuilder) -> Self {
        let store = InMemoryStore::new();
        store.append_many(builder.messages_ref().iter().cloned());
        Self { store, builder }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    /// Appends the user turn, re-sends the whole history, and appends the
    /// assistant reply to the store on success.
    pub async fn send(&mut self, ctx: CancellationToken, user_text: impl Into<String>) -> Result<String> {
        self.store.append(Message::user(user_text));
        self.builder = self.builder.clone().messages(self.store.get_all());
        let response = self.builder.get_response(ctx).await?;
        self.store.append(Message::assistant(response.output_text.clone()));
        Ok(response.output_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Message;

    #[test]
    fn test_get_all_is_defensive_copy() {
        let store = InMemoryStore::new();
        store.append(Message::user("hi"));
        let mut copy = store.get_all();
        copy.push(Message::user("tampered"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_last_n_zero_is_empty() {
        let store = InMemoryStore::new();
        store.append(Message::user("a"));
        store.append(Message::user("b"));
        assert!(store.get_last_n(0).is_empty());
    }

    #[test]
    fn test_get_last_n_bounds() {
        let store = InMemoryStore::new();
        store.append(Message::user("a"));
        store.append(Message::user("b"));
        store.append(Message::user("c"));
        let last_two = store.get_last_n(2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].effective_text(), "b");
        assert_eq!(last_two[1].effective_text(), "c");
    }

    #[test]
    fn test_get_last_n_exceeds_length() {
        let store = InMemoryStore::new();
        store.append(Message::user("a"));
        assert_eq!(store.get_last_n(10).len(), 1);
    }

    #[test]
    fn test_replace_all_and_clear() {
        let store = InMemoryStore::new();
        store.append(Message::user("a"));
        store.replace_all(vec![Message::user("b"), Message::user("c")]);
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());
    }
}
