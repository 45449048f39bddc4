//! Test helpers: a scripted device transport and status page fixtures

use crate::domain::ports::{DeviceRequest, DeviceTransport, RequestMethod};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// A request the scripted transport received
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub request: DeviceRequest,
    pub at: Instant,
}

/// Transport that answers with queued responses in order
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<String>>>,
    sent: Mutex<Vec<SentRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful response body
    pub fn respond(&self, html: impl Into<String>) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(html.into()));
        self
    }

    /// Queue a failure
    pub fn fail(&self, err: Error) -> &Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Move requests only
    pub fn moves(&self) -> Vec<SentRequest> {
        self.sent()
            .into_iter()
            .filter(|s| s.request.method == RequestMethod::Post)
            .collect()
    }
}

#[async_trait]
impl DeviceTransport for ScriptedTransport {
    async fn send(&self, request: &DeviceRequest) -> Result<String> {
        self.sent.lock().unwrap().push(SentRequest {
            request: request.clone(),
            at: Instant::now(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Internal(format!("no response scripted for {}", request.path))))
    }
}

/// Status page with one slot image per `(title, target)`, e.g. `("T1", "slot15")`
pub fn status_page(slots: &[(&str, &str)]) -> String {
    let images: String = slots
        .iter()
        .map(|(title, target)| {
            format!(
                "<img src=\"tape.gif\" title=\"{}\" onclick=\"from_to({})\" />\n",
                title, target
            )
        })
        .collect();
    format!(
        "<html><body><a href=\"index.html\">Home</a>\n<center>\n{}</center></body></html>",
        images
    )
}

pub fn unauthorized() -> Error {
    Error::Unauthorized {
        url: "http://124t.local/move.cgi".to_string(),
    }
}
