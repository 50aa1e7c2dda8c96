//! In-memory server double for adapter and controller tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::transport::{HttpReply, HttpTransport, MultipartPayload};

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub payload: Option<MultipartPayload>,
}

type PostHook = Box<dyn Fn()>;

/// Replays queued replies in order and records every request.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: RefCell<VecDeque<Result<HttpReply, String>>>,
    requests: RefCell<Vec<RecordedRequest>>,
    on_post: Option<PostHook>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `hook` while a POST is in flight.
    pub fn with_post_hook(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_post = Some(Box::new(hook));
        self
    }

    pub fn push(&self, reply: HttpReply) {
        self.replies.borrow_mut().push_back(Ok(reply));
    }

    pub fn push_error(&self, message: &str) {
        self.replies.borrow_mut().push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.borrow().clone()
    }

    fn next_reply(&self) -> Result<HttpReply> {
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("no scripted reply left")),
        }
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str) -> Result<HttpReply> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            payload: None,
        });
        self.next_reply()
    }

    fn post_multipart(&self, url: &str, payload: &MultipartPayload) -> Result<HttpReply> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            payload: Some(payload.clone()),
        });
        if let Some(hook) = self.on_post.as_ref() {
            hook();
        }
        self.next_reply()
    }
}

pub(crate) fn reply(status: u16, content_type: Option<&str>, body: &[u8]) -> HttpReply {
    HttpReply {
        status,
        content_type: content_type.map(str::to_string),
        body: body.to_vec(),
    }
}

pub(crate) fn json_reply(value: serde_json::Value) -> HttpReply {
    reply(
        200,
        Some("application/json"),
        value.to_string().as_bytes(),
    )
}
