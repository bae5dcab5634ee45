//! Periodic Kodi flush loop.
//!
//! Every `flush_interval` the dispatcher:
//! 1. Skips the cycle when disabled or when nothing is queued
//! 2. Pings Kodi; if that fails the queue is left untouched until the next tick
//! 3. Sends each pending task as its own JSON-RPC call
//!
//! Failed sends are retried on later cycles up to `max_attempts`, then dropped.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use kodi_common::config::KodiConfig;
use kodi_common::error::RpcError;
use kodi_common::types::{JsonRpcRequest, JsonRpcResponse};

use crate::queue::{DrainReport, NotifyQueue};
use crate::transport::{HttpTransport, RpcTransport};

/// What a single cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Disabled,
    Empty,
    /// Ping failed, nothing was sent.
    Unreachable,
    Flushed(DrainReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Queue size observed when the cycle started.
    pub queued: usize,
    pub outcome: CycleOutcome,
}

/// Owns the notification queue and the transport used to flush it.
///
/// Share it as `Arc<Dispatcher>`: producers call [`Dispatcher::enqueue`], and
/// one background task drives [`Dispatcher::run`].
pub struct Dispatcher<T = HttpTransport> {
    config: KodiConfig,
    queue: NotifyQueue,
    transport: T,
}

impl Dispatcher<HttpTransport> {
    pub fn new(config: KodiConfig) -> Result<Self, RpcError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: RpcTransport> Dispatcher<T> {
    pub fn with_transport(config: KodiConfig, transport: T) -> Self {
        Self {
            config,
            queue: NotifyQueue::new(),
            transport,
        }
    }

    pub fn config(&self) -> &KodiConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable
    }

    pub fn queue(&self) -> &NotifyQueue {
        &self.queue
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// Queue `request` under `name` for the next flush.
    ///
    /// Returns `false` without touching the queue when notifications are
    /// disabled. A name that is already pending keeps its original request and
    /// still returns `true`.
    pub fn enqueue(&self, name: impl Into<String>, request: JsonRpcRequest) -> bool {
        if !self.config.enable {
            return false;
        }

        let name = name.into();
        let inserted = self.queue.enqueue(name.clone(), request);
        tracing::debug!(task = %name, inserted, "Kodi task enqueued");
        true
    }

    /// Run one flush cycle now.
    pub async fn run_cycle(&self) -> CycleReport {
        let queued = self.queue.len();

        if !self.config.enable {
            return CycleReport {
                queued,
                outcome: CycleOutcome::Disabled,
            };
        }
        if queued == 0 {
            return CycleReport {
                queued,
                outcome: CycleOutcome::Empty,
            };
        }

        if let Err(e) = self.transport.ping().await {
            tracing::warn!(error = %e, queued, "ping kodi err");
            return CycleReport {
                queued,
                outcome: CycleOutcome::Unreachable,
            };
        }

        let transport = &self.transport;
        let report = self
            .queue
            .drain_with(self.config.max_attempts, |request| async move {
                let body = transport.call(&request).await?;
                log_response(&request, &body);
                Ok::<(), RpcError>(())
            })
            .await;

        tracing::info!(
            sent = report.sent,
            requeued = report.requeued,
            dropped = report.dropped,
            "Kodi flush cycle complete"
        );

        CycleReport {
            queued,
            outcome: CycleOutcome::Flushed(report),
        }
    }

    /// Best-effort flush outside the timer, e.g. on shutdown.
    pub async fn flush_now(&self) -> CycleReport {
        self.run_cycle().await
    }

    /// Drive flush cycles until `shutdown` is cancelled.
    ///
    /// Returns immediately when disabled. The first cycle runs one full
    /// interval after start.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        if !self.config.enable {
            tracing::info!("Kodi notifications disabled, flush loop not started");
            return;
        }

        let period = self.config.flush_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            endpoint = %self.config.json_rpc,
            interval_secs = period.as_secs(),
            max_attempts = self.config.max_attempts,
            "Kodi flush loop started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(pending = self.queue.len(), "Kodi flush loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
    }

    /// Spawn [`Dispatcher::run`] on the current runtime.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()>
    where
        T: 'static,
    {
        tokio::spawn(Arc::clone(self).run(shutdown))
    }
}

fn log_response(request: &JsonRpcRequest, body: &[u8]) {
    match JsonRpcResponse::parse(body).and_then(|r| r.error) {
        Some(err) => tracing::warn!(
            method = %request.method,
            error = %err,
            "Kodi returned a JSON-RPC error"
        ),
        None => tracing::debug!(
            method = %request.method,
            response = %String::from_utf8_lossy(body),
            "req kodi"
        ),
    }
}
