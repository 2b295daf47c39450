//! Append-only message log.
//!
//! Messages are kept in sealed, shared chunks plus one open tail. Appending
//! only touches the tail, and a snapshot clones chunk handles instead of
//! messages, so taking snapshots while messages keep arriving stays cheap.

use crate::Message;
use std::sync::Arc;

const CHUNK_LEN: usize = 64;

/// Ordered log of chat messages for one session.
///
/// There is deliberately no way to remove or reorder entries.
#[derive(Debug, Default)]
pub struct MessageStore {
    sealed: Vec<Arc<[Message]>>,
    tail: Vec<Message>,
    len: usize,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return the new length of the log.
    pub fn append(&mut self, message: Message) -> usize {
        if self.tail.capacity() == 0 {
            self.tail.reserve_exact(CHUNK_LEN);
        }
        self.tail.push(message);
        if self.tail.len() == CHUNK_LEN {
            let full = std::mem::take(&mut self.tail);
            self.sealed.push(Arc::from(full));
        }
        self.len += 1;
        self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Point-in-time view of the whole log. Later appends are not visible in it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sealed: self.sealed.clone(),
            tail: Arc::from(self.tail.as_slice()),
            len: self.len,
        }
    }
}

/// Frozen view of a [`MessageStore`].
///
/// Cloning is cheap, and [`Snapshot::iter`] can be called any number of times.
#[derive(Debug, Clone)]
pub struct Snapshot {
    sealed: Vec<Arc<[Message]>>,
    tail: Arc<[Message]>,
    len: usize,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Messages in append order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.sealed
            .iter()
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Message;
    type IntoIter = Box<dyn Iterator<Item = &'a Message> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
