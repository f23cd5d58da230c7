//! Spider middleware
//!
//! Middleware sits between a processed response and the scheduler. It sees
//! every follow-up produced for a response and may annotate or drop it.

mod depth;

pub use depth::DepthMiddleware;

use crate::request::Request;
use serde_json::Value;

/// A processed response, carrying the request that produced it
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL of the response, after redirects
    pub url: String,
    pub request: Request,
}

impl Response {
    /// Creates a response served from the request's own URL
    pub fn new(request: Request) -> Self {
        Self {
            url: request.url.clone(),
            request,
        }
    }
}

/// Something a spider produced while processing a response
#[derive(Debug, Clone)]
pub enum SpiderOutput {
    /// A follow-up request to schedule
    Request(Request),

    /// A scraped item, passed through untouched by request middleware
    Item(Value),
}

impl SpiderOutput {
    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Self::Request(request) => Some(request),
            Self::Item(_) => None,
        }
    }
}

impl From<Request> for SpiderOutput {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Value> for SpiderOutput {
    fn from(item: Value) -> Self {
        Self::Item(item)
    }
}
