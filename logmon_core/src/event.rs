use serde::{Deserialize, Serialize};
use std::fmt;

/// A single access-log record as produced by an input reader.
///
/// A `timestamp` of 0 marks a record whose date could not be read; such
/// records are dropped by every aggregator. A `status` of 0 or less means the
/// status column was absent or unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LogEvent {
    pub timestamp: u64,
    pub request: String,
    pub status: i32,
    pub remote_host: String,
}

impl LogEvent {
    pub fn new(
        timestamp: u64,
        request: impl Into<String>,
        status: i32,
        remote_host: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            request: request.into(),
            status,
            remote_host: remote_host.into(),
        }
    }

    /// Event carrying only a timestamp, as counted by the alert window.
    pub fn at(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.timestamp != 0
    }

    pub fn has_status(&self) -> bool {
        self.status > 0
    }

    pub fn is_success(&self) -> bool {
        self.has_status() && self.status < 300
    }

    pub fn verb(&self) -> Option<HttpVerb> {
        HttpVerb::from_request(&self.request)
    }

    /// Section of the request target: `"GET /api/user HTTP/1.0"` gives `/api`.
    pub fn section(&self) -> Option<String> {
        let tokens: Vec<&str> = self.request.split(' ').collect();
        if tokens.len() != 3 {
            return None;
        }

        match tokens[1].split('/').nth(1) {
            Some(segment) if !segment.is_empty() => Some(format!("/{}", segment)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HttpVerb {
    Post,
    Get,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 5] = [
        HttpVerb::Post,
        HttpVerb::Get,
        HttpVerb::Put,
        HttpVerb::Patch,
        HttpVerb::Delete,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "POST" => Some(HttpVerb::Post),
            "GET" => Some(HttpVerb::Get),
            "PUT" => Some(HttpVerb::Put),
            "PATCH" => Some(HttpVerb::Patch),
            "DELETE" => Some(HttpVerb::Delete),
            _ => None,
        }
    }

    pub fn from_request(request: &str) -> Option<Self> {
        request.split(' ').next().and_then(Self::from_token)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Post => "POST",
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
