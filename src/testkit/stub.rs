//! In-memory collaborators for the outbound ports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Notify, Semaphore};

use crate::domain::{
    BarPeriod, ChannelKind, NotificationMessage, NotificationSettings, OhlcvSeries, OwnerId,
};
use crate::error::{DeliveryFailure, Error, Result};
use crate::port::outbound::llm::Llm;
use crate::port::outbound::market_data::OhlcvSource;
use crate::port::outbound::notifier::{EmailTransport, NotificationChannel, OutgoingEmail};
use crate::port::outbound::synthesis::{GeneratedScript, GenerationRequest, ScriptGenerator};

/// Channel that records every message it is handed.
pub struct RecordingChannel {
    kind: ChannelKind,
    messages: Mutex<Vec<NotificationMessage>>,
}

impl RecordingChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(
        &self,
        _owner: &OwnerId,
        message: &NotificationMessage,
        _settings: &NotificationSettings,
    ) -> std::result::Result<(), DeliveryFailure> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

/// Channel whose transport always fails.
pub struct FailingChannel {
    kind: ChannelKind,
}

impl FailingChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl NotificationChannel for FailingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(
        &self,
        _owner: &OwnerId,
        _message: &NotificationMessage,
        _settings: &NotificationSettings,
    ) -> std::result::Result<(), DeliveryFailure> {
        Err(DeliveryFailure::Transport("connection refused".into()))
    }
}

/// Channel that takes `delay` before succeeding.
pub struct SlowChannel {
    kind: ChannelKind,
    delay: Duration,
}

impl SlowChannel {
    pub fn new(kind: ChannelKind, delay: Duration) -> Self {
        Self { kind, delay }
    }
}

#[async_trait]
impl NotificationChannel for SlowChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(
        &self,
        _owner: &OwnerId,
        _message: &NotificationMessage,
        _settings: &NotificationSettings,
    ) -> std::result::Result<(), DeliveryFailure> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Email transport that records outgoing mail.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl EmailTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, email: &OutgoingEmail) -> std::result::Result<(), DeliveryFailure> {
        self.sent.lock().push(email.clone());
        Ok(())
    }
}

/// Pauses [`StaticSource::fetch`] until released.
pub struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

impl Gate {
    /// Wait until a fetch is parked at the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let `n` parked or future fetches through.
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
    }
}

/// Market data served from memory, per stock code.
#[derive(Default)]
pub struct StaticSource {
    series: RwLock<HashMap<String, std::result::Result<OhlcvSeries, String>>>,
    fetches: AtomicUsize,
    gate: Option<Arc<Gate>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source whose fetches wait at the returned gate.
    pub fn gated() -> (Self, Arc<Gate>) {
        let gate = Arc::new(Gate::default());
        let source = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (source, gate)
    }

    pub fn set(&self, stock_code: &str, series: OhlcvSeries) {
        self.series.write().insert(stock_code.to_string(), Ok(series));
    }

    /// Make fetches for `stock_code` fail with `reason`.
    pub fn fail(&self, stock_code: &str, reason: &str) {
        self.series
            .write()
            .insert(stock_code.to_string(), Err(reason.to_string()));
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OhlcvSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(
        &self,
        stock_code: &str,
        _period: BarPeriod,
        limit: usize,
    ) -> Result<OhlcvSeries> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        let entry = self.series.read().get(stock_code).cloned();
        match entry {
            Some(Ok(series)) => {
                let bars = series.bars();
                let start = bars.len().saturating_sub(limit);
                Ok(OhlcvSeries::new(bars[start..].to_vec()))
            }
            Some(Err(reason)) => Err(Error::Connection(reason)),
            None => Err(Error::Connection(format!("no bars for {stock_code}"))),
        }
    }
}

/// Generator returning a canned script, or failing.
pub struct StubGenerator {
    output: Option<GeneratedScript>,
    calls: AtomicUsize,
}

impl StubGenerator {
    pub fn canned(output: GeneratedScript) -> Self {
        Self {
            output: Some(output),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScriptGenerator for StubGenerator {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<GeneratedScript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.output
            .clone()
            .ok_or_else(|| Error::Connection("generator unavailable".into()))
    }
}

/// LLM answering every prompt with the same text.
pub struct CannedLlm {
    response: String,
}

impl CannedLlm {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Llm for CannedLlm {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}
