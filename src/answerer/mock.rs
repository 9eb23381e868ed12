use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Answerer, Reply, TokenUsage};

/// A scripted answerer for tests. Returns pre-defined outcomes in order;
/// `Err` entries become upstream failures.
pub struct MockAnswerer {
    script: Vec<std::result::Result<String, String>>,
    usage: Option<TokenUsage>,
    index: AtomicUsize,
    asked: Mutex<Vec<String>>,
}

impl MockAnswerer {
    pub fn new(script: Vec<std::result::Result<String, String>>) -> Self {
        Self {
            script,
            usage: None,
            index: AtomicUsize::new(0),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Report the same usage with every successful reply.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Questions received so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl Answerer for MockAnswerer {
    async fn answer(&self, question: &str) -> Result<Reply> {
        self.asked.lock().unwrap().push(question.to_string());
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        match self.script.get(i) {
            Some(Ok(text)) => Ok(Reply {
                text: text.clone(),
                usage: self.usage,
            }),
            Some(Err(e)) => Err(anyhow!("{e}")),
            None => Err(anyhow!("MockAnswerer: no more replies (called {} times)", i + 1)),
        }
    }
}
