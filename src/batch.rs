//! One pass over the question list: throttle, ask, collect.

use std::sync::Arc;

use tracing::{info, warn};

use crate::answerer::{Answerer, TokenUsage};
use crate::consts::ERROR_PLACEHOLDER;
use crate::events::{Event, EventBus};
use crate::throttle::Throttler;

/// The answer half of a [`QaPair`].
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Text(String),
    /// The upstream failed; carries the reason for logging only.
    Failed(String),
}

impl Answer {
    /// Markdown to put in the document. Failures render as the placeholder.
    pub fn rendered(&self) -> &str {
        match self {
            Answer::Text(text) => text,
            Answer::Failed(_) => ERROR_PLACEHOLDER,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Answer::Failed(_))
    }
}

/// A question and whatever came back for it.
#[derive(Debug, Clone, PartialEq)]
pub struct QaPair {
    pub question: String,
    pub answer: Answer,
}

/// What a batch produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One pair per question, in input order.
    pub pairs: Vec<QaPair>,
    pub usage: TokenUsage,
    pub failed: usize,
}

impl BatchReport {
    pub fn answered(&self) -> usize {
        self.pairs.len() - self.failed
    }
}

/// Sequential question runner. Borrows the throttler for its whole run.
pub struct Batch<'a> {
    answerer: &'a dyn Answerer,
    throttler: &'a mut Throttler,
    events: Option<Arc<EventBus>>,
}

impl<'a> Batch<'a> {
    pub fn new(answerer: &'a dyn Answerer, throttler: &'a mut Throttler) -> Self {
        Self {
            answerer,
            throttler,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    /// Ask every question once. Upstream errors become placeholders;
    /// nothing is retried and the batch never aborts.
    pub async fn run(&mut self, questions: &[String]) -> BatchReport {
        let mut report = BatchReport::default();

        for (i, question) in questions.iter().enumerate() {
            let index = i + 1;
            self.emit(Event::QuestionStarted {
                index,
                question: question.clone(),
            });

            let waited = self.throttler.acquire().await;
            if !waited.is_zero() {
                let waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX);
                info!(index, waited_ms, "throttled");
            }

            let answer = match self.answerer.answer(question).await {
                Ok(reply) => {
                    if let Some(usage) = reply.usage {
                        report.usage.add(usage);
                    }
                    self.emit(Event::Answered {
                        index,
                        answer: reply.text.clone(),
                    });
                    Answer::Text(reply.text)
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(index, %error, "failed to get answer");
                    self.emit(Event::AnswerFailed {
                        index,
                        error: error.clone(),
                    });
                    report.failed += 1;
                    Answer::Failed(error)
                }
            };

            report.pairs.push(QaPair {
                question: question.clone(),
                answer,
            });
        }

        report
    }

    fn emit(&self, event: Event) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}
