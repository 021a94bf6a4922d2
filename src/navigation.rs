//! Per-user browsing state and the navigation operations over it.
//!
//! A `SessionState` moves between three phases:
//! - `NoTopics`: nothing uploaded (or after `reset`).
//! - `TopicsLoaded`: topics present, no topic selected.
//! - `Browsing`: a topic is selected and a cursor points into its report list.
//!
//! The cursor is only ever built by `select_topic` and only moved by
//! `advance`/`retreat`, both of which saturate, so `position < len` always holds
//! for a non-empty topic. Callers are expected to hold the per-identity lock
//! (see `identity::SessionHandle`) while calling any of these methods.

use std::collections::BTreeMap;

use thiserror::Error;

/// Topic name -> ordered report ids. `BTreeMap` keeps names sorted for listing.
pub type Topics = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavError {
    #[error("no topics uploaded")]
    NoTopics,
    #[error("unknown topic '{0}'")]
    UnknownTopic(String),
    #[error("no topic selected")]
    NoActiveTopic,
    #[error("topic '{0}' has no reports")]
    EmptyTopic(String),
}

pub type NavResult<T> = Result<T, NavError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoTopics,
    TopicsLoaded,
    Browsing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    topic: String,
    position: usize,
}

/// Read-only view of where a user currently is inside a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorView {
    pub topic: String,
    pub position: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    topics: Topics,
    cursor: Option<Cursor>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match (&self.cursor, self.topics.is_empty()) {
            (Some(_), _) => Phase::Browsing,
            (None, true) => Phase::NoTopics,
            (None, false) => Phase::TopicsLoaded,
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Replace all topics wholesale and drop any selection.
    pub fn set_topics(&mut self, topics: Topics) {
        self.topics = topics;
        self.cursor = None;
    }

    /// Topic names in lexicographic order.
    pub fn list_topic_names(&self) -> NavResult<Vec<String>> {
        if self.topics.is_empty() {
            return Err(NavError::NoTopics);
        }
        Ok(self.topics.keys().cloned().collect())
    }

    /// Make `name` the active topic. Re-selecting the topic already being
    /// browsed keeps the position; any other topic starts at its first report.
    pub fn select_topic(&mut self, name: &str) -> NavResult<()> {
        if !self.topics.contains_key(name) {
            return Err(NavError::UnknownTopic(name.to_string()));
        }
        match &self.cursor {
            Some(c) if c.topic == name => {}
            _ => {
                self.cursor = Some(Cursor { topic: name.to_string(), position: 0 });
            }
        }
        Ok(())
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.cursor.as_ref().map(|c| c.topic.as_str())
    }

    pub fn position(&self) -> Option<usize> {
        self.cursor.as_ref().map(|c| c.position)
    }

    pub fn cursor(&self) -> Option<CursorView> {
        let c = self.cursor.as_ref()?;
        let len = self.topics.get(&c.topic).map(Vec::len).unwrap_or(0);
        Some(CursorView { topic: c.topic.clone(), position: c.position, len })
    }

    pub fn current_report_id(&self) -> NavResult<&str> {
        let (cursor, ids) = self.active()?;
        ids.get(cursor.position)
            .map(String::as_str)
            .ok_or_else(|| NavError::EmptyTopic(cursor.topic.clone()))
    }

    /// Step forward, staying on the last report once there. Returns the new position.
    pub fn advance(&mut self) -> NavResult<usize> {
        let len = self.active()?.1.len();
        let cursor = self.cursor.as_mut().ok_or(NavError::NoActiveTopic)?;
        if cursor.position + 1 < len {
            cursor.position += 1;
        }
        Ok(cursor.position)
    }

    /// Step back, staying on the first report once there. Returns the new position.
    pub fn retreat(&mut self) -> NavResult<usize> {
        self.active()?;
        let cursor = self.cursor.as_mut().ok_or(NavError::NoActiveTopic)?;
        cursor.position = cursor.position.saturating_sub(1);
        Ok(cursor.position)
    }

    /// Forget everything, as if freshly logged in.
    pub fn reset(&mut self) {
        self.topics.clear();
        self.cursor = None;
    }

    /// Leave the current topic but keep the uploaded topics.
    pub fn reset_position(&mut self) {
        self.cursor = None;
    }

    fn active(&self) -> NavResult<(&Cursor, &Vec<String>)> {
        let cursor = self.cursor.as_ref().ok_or(NavError::NoActiveTopic)?;
        // set_topics/reset always clear the cursor, so the topic is present
        let ids = self.topics.get(&cursor.topic).ok_or(NavError::NoActiveTopic)?;
        Ok((cursor, ids))
    }
}
