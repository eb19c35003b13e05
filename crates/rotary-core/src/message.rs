//! Polled message envelope.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A unit of work produced by one `receive()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    payload: Vec<u8>,
    headers: BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// When the message was created by its source.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
