//! Conversation log.
//!
//! The log is the widget's model of the message list: an ordered, append-only
//! sequence of message nodes plus at most one suggestion block. Every node has
//! an id that is never reused within a widget, so a late update addressed to
//! a node removed by a reset simply finds nothing.

use std::fmt;

use time::OffsetDateTime;

/// Identifier of a node in the log.
pub type NodeId = u64;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

/// How a message is put on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Formatted and inserted at once.
    Plain,
    /// Pulsing placeholder without text.
    Loading,
    /// Typed out over the plain-text projection, then swapped for markup.
    Streaming,
}

/// One message node.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: NodeId,
    pub sender: Sender,
    /// Raw text as supplied, before formatting.
    pub text: String,
    /// Final bubble markup.
    pub markup: String,
    pub mode: RenderMode,
    /// False while a streaming animation is still typing this message.
    pub settled: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Message(Message),
    Suggestions(NodeId),
}

impl Entry {
    fn id(&self) -> NodeId {
        match self {
            Entry::Message(message) => message.id,
            Entry::Suggestions(id) => *id,
        }
    }
}

/// Ordered conversation log.
#[derive(Debug, Default)]
pub struct Conversation {
    entries: Vec<Entry>,
    next_id: NodeId,
}

impl Conversation {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns its id.
    pub fn push(
        &mut self,
        sender: Sender,
        text: impl Into<String>,
        markup: impl Into<String>,
        mode: RenderMode,
    ) -> NodeId {
        let id = self.allocate();
        self.entries.push(Entry::Message(Message {
            id,
            sender,
            text: text.into(),
            markup: markup.into(),
            mode,
            settled: mode != RenderMode::Streaming,
            created_at: OffsetDateTime::now_utc(),
        }));
        id
    }

    /// Appends the suggestion block. Returns `None` if one is already present.
    pub fn push_suggestions(&mut self) -> Option<NodeId> {
        if self.suggestions().is_some() {
            return None;
        }
        let id = self.allocate();
        self.entries.push(Entry::Suggestions(id));
        Some(id)
    }

    /// Id of the suggestion block, if present.
    pub fn suggestions(&self) -> Option<NodeId> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Suggestions(id) => Some(*id),
            Entry::Message(_) => None,
        })
    }

    /// Removes the node with `id` if it is still present.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id() != id);
        before != self.entries.len()
    }

    /// Marks a streaming message as fully typed. Returns false if it is gone.
    pub fn settle(&mut self, id: NodeId) -> bool {
        match self.get_mut(id) {
            Some(message) => {
                message.settled = true;
                true
            }
            None => false,
        }
    }

    /// Drops every node. Ids keep increasing across clears.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Message> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Message(message) if message.id == id => Some(message),
            _ => None,
        })
    }

    /// True if a node with `id` is in the log.
    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.iter().any(|entry| entry.id() == id)
    }

    /// Messages in log order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Message(message) => Some(message),
            Entry::Suggestions(_) => None,
        })
    }

    fn allocate(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_never_reused() {
        let mut log = Conversation::new();
        let a = log.push(Sender::Bot, "a", "a", RenderMode::Plain);
        log.clear();
        let b = log.push(Sender::Bot, "b", "b", RenderMode::Plain);
        assert_ne!(a, b);
        assert!(!log.contains(a));
        assert!(log.contains(b));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut log = Conversation::new();
        let id = log.push(Sender::Bot, "", "", RenderMode::Loading);
        assert!(log.contains(id));
        assert!(log.remove(id));
        assert!(!log.remove(id));
        assert!(!log.contains(id));
    }

    #[test]
    fn single_suggestion_block() {
        let mut log = Conversation::new();
        let first = log.push_suggestions();
        assert!(first.is_some());
        assert!(log.push_suggestions().is_none());
        assert_eq!(log.suggestions(), first);
        assert_eq!(log.messages().count(), 0);
        assert!(log.contains(first.unwrap()));
    }

    #[test]
    fn streaming_messages_settle() {
        let mut log = Conversation::new();
        let id = log.push(Sender::Bot, "hi", "hi", RenderMode::Streaming);
        let settled = |log: &Conversation| log.messages().any(|m| m.id == id && m.settled);
        assert!(!settled(&log));
        assert!(log.settle(id));
        assert!(settled(&log));
        log.clear();
        assert!(!log.settle(id));
    }
}
