use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Notify;

use super::{BackgroundRemover, encode_png};
use crate::decoder::DecodedImage;

/// What a scripted call returns.
#[derive(Debug, Clone)]
pub enum MockResult {
    /// Return these bytes verbatim.
    Output(Vec<u8>),
    /// Re-encode the input as PNG, unchanged.
    Passthrough,
    /// Fail with this message.
    Fail(String),
}

/// One scripted call, optionally held until a gate is opened.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub result: MockResult,
    pub gate: Option<Arc<Notify>>,
}

impl MockStep {
    pub fn output(bytes: Vec<u8>) -> Self {
        Self {
            result: MockResult::Output(bytes),
            gate: None,
        }
    }

    pub fn passthrough() -> Self {
        Self {
            result: MockResult::Passthrough,
            gate: None,
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            result: MockResult::Fail(message.to_string()),
            gate: None,
        }
    }

    /// Wait for `gate.notify_one()` before settling.
    pub fn after(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// A scripted remover for tests. Plays its steps in call order.
pub struct MockRemover {
    steps: Mutex<VecDeque<MockStep>>,
    calls: AtomicUsize,
}

impl MockRemover {
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `remove` has been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemover for MockRemover {
    fn name(&self) -> &str {
        "mock"
    }

    async fn remove(&self, image: &DecodedImage) -> Result<Vec<u8>> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .steps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(step) = step else {
            bail!("MockRemover: no more steps (called {} times)", i + 1);
        };

        if let Some(gate) = step.gate {
            gate.notified().await;
        }

        match step.result {
            MockResult::Output(bytes) => Ok(bytes),
            MockResult::Passthrough => encode_png(&image.image),
            MockResult::Fail(message) => bail!(message),
        }
    }
}
