//! Hand-written fakes for the generative-text and search boundaries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::llm::TextGenerator;
use crate::search::{SearchBackend, SearchHit, SearchMode, SearchRequest};

/// Replies with a fixed answer (or a fixed error) and counts calls
pub struct FakeGenerator {
    reply: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(anyhow::anyhow!(e.clone())),
        }
    }
}

/// Returns fixed web and image fixtures and records every request
pub struct FakeSearch {
    web: Result<Vec<SearchHit>, String>,
    image: Result<Vec<SearchHit>, String>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FakeSearch {
    pub fn new(web: Vec<SearchHit>, image: Vec<SearchHit>) -> Self {
        Self {
            web: Ok(web),
            image: Ok(image),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            web: Err(error.to_string()),
            image: Err(error.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_for(&self, mode: SearchMode) -> Option<SearchRequest> {
        self.requests().into_iter().find(|r| r.mode == mode)
    }
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.requests.lock().unwrap().push(request.clone());
        let fixture = match request.mode {
            SearchMode::Web => &self.web,
            SearchMode::Image => &self.image,
        };
        match fixture {
            Ok(hits) => Ok(hits.clone()),
            Err(e) => Err(anyhow::anyhow!(e.clone())),
        }
    }
}

pub fn hit(title: &str, link: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        link: link.to_string(),
    }
}
