//! Request module
//!
//! This module defines the value that flows through the scheduler:
//! - `Request`: a pending fetch with priority, metadata and filter bypass
//! - `RequestRecord`: the flat form a request takes on disk
//! - Request fingerprinting for duplicate detection

mod fingerprint;
mod record;

pub use fingerprint::{canonicalize_url, request_fingerprint};
pub use record::RequestRecord;

use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Metadata key carrying a request's traversal depth
pub const DEPTH_KEY: &str = "depth";

/// Errors raised while building requests or converting them to their persisted form
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request for {url} cannot be serialized: {reason}")]
    NotSerializable { url: String, reason: String },
}

/// Callback attached to a request
///
/// Only named callbacks survive a trip through the durable queue. A `Handle`
/// is a live in-process object and keeps its request in the memory tier.
#[derive(Clone)]
pub enum Callback {
    /// Callback resolved by name when the request is processed
    Named(String),

    /// Live handle, valid only within the current process
    Handle(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

/// A pending fetch request
///
/// Lower `priority` values are served first.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub method: String,
    pub body: Vec<u8>,
    pub priority: i32,
    pub meta: Map<String, Value>,
    pub dont_filter: bool,
    pub callback: Option<Callback>,
}

impl Request {
    /// Creates a GET request for `url` with priority 0
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            body: Vec::new(),
            priority: 0,
            meta: Map::new(),
            dont_filter: false,
            callback: None,
        }
    }

    /// Creates a GET request, rejecting URLs that do not parse as absolute
    pub fn parse(url: &str) -> Result<Self, RequestError> {
        url::Url::parse(url).map_err(|source| RequestError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self::new(url))
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Marks the request to bypass the duplicate filter
    pub fn dont_filter(mut self) -> Self {
        self.dont_filter = true;
        self
    }

    /// Traversal depth recorded in metadata, if any
    ///
    /// Out-of-range numbers are clamped to `0..=u32::MAX` and fractional ones
    /// truncated. A value that is not a number reads as no depth.
    pub fn depth(&self) -> Option<u32> {
        let value = self.meta.get(DEPTH_KEY)?;

        if let Some(depth) = value.as_u64() {
            return Some(u32::try_from(depth).unwrap_or(u32::MAX));
        }
        if let Some(depth) = value.as_i64() {
            tracing::warn!("Negative depth {} on {}, using 0", depth, self.url);
            return Some(0);
        }
        if let Some(depth) = value.as_f64() {
            tracing::warn!("Non-integer depth {} on {}", depth, self.url);
            // Float to int casts saturate and map NaN to 0
            return Some(depth as u32);
        }

        tracing::warn!("Ignoring non-numeric depth {} on {}", value, self.url);
        None
    }

    /// Whether metadata carries a depth entry at all, usable or not
    pub fn has_depth(&self) -> bool {
        self.meta.contains_key(DEPTH_KEY)
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.meta.insert(DEPTH_KEY.to_string(), Value::from(depth));
    }

    /// Converts the request into its flat persisted form
    ///
    /// # Returns
    ///
    /// * `Ok(RequestRecord)` - The request can be stored durably
    /// * `Err(RequestError::NotSerializable)` - The request carries a live callback handle
    pub fn to_record(&self) -> Result<RequestRecord, RequestError> {
        let callback = match &self.callback {
            None => None,
            Some(Callback::Named(name)) => Some(name.clone()),
            Some(Callback::Handle(_)) => {
                return Err(RequestError::NotSerializable {
                    url: self.url.clone(),
                    reason: "callback is a live handle".to_string(),
                })
            }
        };

        Ok(RequestRecord {
            url: self.url.clone(),
            method: self.method.clone(),
            body: self.body.clone(),
            priority: self.priority,
            meta: self.meta.clone(),
            dont_filter: self.dont_filter,
            callback,
        })
    }

    /// Rebuilds a request from its persisted form
    pub fn from_record(record: RequestRecord) -> Self {
        Self {
            url: record.url,
            method: record.method,
            body: record.body,
            priority: record.priority,
            meta: record.meta,
            dont_filter: record.dont_filter,
            callback: record.callback.map(Callback::Named),
        }
    }

    /// Fingerprint identifying this request for duplicate detection
    pub fn fingerprint(&self) -> String {
        request_fingerprint(self)
    }
}
