//! Correlation of data packets with the context packets describing their stream.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::packet::{Context, Header};

/// The most recent context packet seen for a stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Correlated {
    /// Header of the context packet, which carries the timestamps.
    pub header: Header,
    pub context: Context,
}

/// Last-seen context per stream identifier.
///
/// Only context packets update the table and a newer context replaces the previous
/// one entirely; fields are never merged.
#[derive(Debug, Clone, Default)]
pub struct ContextTable {
    entries: HashMap<u32, Correlated>,
}

impl ContextTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `context` as the current context for `stream_id`.
    pub fn record(&mut self, stream_id: u32, header: Header, context: Context) {
        self.entries
            .insert(stream_id, Correlated { header, context });
    }

    #[must_use]
    pub fn lookup(&self, stream_id: u32) -> Option<&Correlated> {
        self.entries.get(&stream_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
