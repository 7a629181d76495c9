use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{Rng, rngs::StdRng};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::{
    application::services::{
        cooldown::CooldownTracker, messenger::MessagingBackend, queue_registry::QueueRegistry,
        selector::FairSelector,
    },
    domain::{
        errors::DispatchError,
        events::DispatchResult,
        models::{MessageContent, OutboundMessage, QueuedMessage},
        value_objects::{MessageId, RecipientId, Ticket},
    },
};

/// What a failed send does to the recipient's cooldown slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedSendPolicy {
    /// The attempt counts like a successful send.
    #[default]
    ConsumeCooldown,
    /// The recipient stays eligible on the next tick.
    ReleaseCooldown,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub cooldown: Duration,
    pub tick_interval: Duration,
    pub queue_capacity: usize,
    pub failed_send_policy: FailedSendPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(1) / 3,
            tick_interval: Duration::from_secs(1),
            queue_capacity: 100,
            failed_send_policy: FailedSendPolicy::ConsumeCooldown,
        }
    }
}

/// Producer handle. Cheap to clone and safe to share between tasks.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<QueueRegistry>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        backend: Arc<dyn MessagingBackend>,
    ) -> (Self, DispatchLoop, mpsc::UnboundedReceiver<DispatchResult>) {
        Self::with_rng(config, backend, FairSelector::from_entropy())
    }

    pub fn with_rng<R: Rng>(
        config: DispatcherConfig,
        backend: Arc<dyn MessagingBackend>,
        selector: FairSelector<R>,
    ) -> (
        Self,
        DispatchLoop<R>,
        mpsc::UnboundedReceiver<DispatchResult>,
    ) {
        let registry = Arc::new(QueueRegistry::new(config.queue_capacity));
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let dispatch_loop = DispatchLoop {
            cooldown: CooldownTracker::new(config.cooldown),
            registry: registry.clone(),
            selector,
            backend,
            results: results_tx,
            config,
        };

        (Self { registry }, dispatch_loop, results_rx)
    }

    /// Queues a message for its recipient. Never waits: a full queue is rejected
    /// with `QueueOverflow`.
    pub async fn enqueue(&self, message: OutboundMessage) -> Result<Ticket, DispatchError> {
        let ticket = Ticket::new();
        let recipient = message.recipient;
        self.registry
            .enqueue(QueuedMessage { ticket, message })
            .await?;
        debug!(%recipient, %ticket, "message queued");
        Ok(ticket)
    }

    pub async fn pending(&self, recipient: RecipientId) -> usize {
        self.registry.len(recipient).await
    }
}

struct Delivered {
    message_id: MessageId,
    text: String,
    forward_date: Option<DateTime<Utc>>,
}

/// The single consumer side: one message per tick at most, across all recipients.
pub struct DispatchLoop<R = StdRng> {
    config: DispatcherConfig,
    registry: Arc<QueueRegistry>,
    cooldown: CooldownTracker,
    selector: FairSelector<R>,
    backend: Arc<dyn MessagingBackend>,
    results: mpsc::UnboundedSender<DispatchResult>,
}

impl<R: Rng> DispatchLoop<R> {
    pub fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    /// Runs one select, pop, send, record, report cycle. Returns the ticket of the
    /// dispatched message, or `None` when no recipient was ready.
    pub async fn tick(&mut self, now: Instant) -> Option<Ticket> {
        let pending = self.registry.pending_recipients().await;
        let Some(recipient) = self.selector.select(&pending, &self.cooldown, now) else {
            debug!(pending = pending.len(), "no recipient ready");
            return None;
        };

        let QueuedMessage { ticket, message } = self.registry.pop_front(recipient).await?;
        let kind = message.content.kind();

        let outcome = self.deliver(&message).await;

        let result = match outcome {
            Ok(delivered) => {
                self.cooldown.record_dispatch(recipient, now);
                DispatchResult {
                    ticket,
                    recipient,
                    kind,
                    message_id: Some(delivered.message_id),
                    text: delivered.text,
                    error: None,
                    forward_date: delivered.forward_date,
                }
            }
            Err(err) => {
                if self.config.failed_send_policy == FailedSendPolicy::ConsumeCooldown {
                    self.cooldown.record_dispatch(recipient, now);
                }
                DispatchResult {
                    ticket,
                    recipient,
                    kind,
                    message_id: None,
                    text: message.content.text().to_string(),
                    error: Some(DispatchError::SendFailure {
                        recipient,
                        reason: format!("{err:#}"),
                    }),
                    forward_date: None,
                }
            }
        };

        if self.results.send(result).is_err() {
            warn!(%recipient, %ticket, "result receiver dropped, outcome discarded");
        }

        Some(ticket)
    }

    async fn deliver(&self, message: &OutboundMessage) -> anyhow::Result<Delivered> {
        let recipient = message.recipient;
        match &message.content {
            MessageContent::PlainText {
                text,
                thread_id,
                reply_to,
                reply_markup,
            } => {
                let message_id = self
                    .backend
                    .send_text(recipient, text, *thread_id, *reply_to, reply_markup.as_ref())
                    .await?;
                Ok(Delivered {
                    message_id,
                    text: text.clone(),
                    forward_date: None,
                })
            }
            MessageContent::FormattedText { text } => {
                let message_id = self.backend.send_formatted_text(recipient, text).await?;
                Ok(Delivered {
                    message_id,
                    text: text.clone(),
                    forward_date: None,
                })
            }
            MessageContent::Copy {
                from_chat,
                message_id,
                thread_id,
                reply_to,
            } => {
                let message_id = self
                    .backend
                    .copy_message(recipient, from_chat, *message_id, *thread_id, *reply_to)
                    .await?;
                Ok(Delivered {
                    message_id,
                    text: String::new(),
                    forward_date: None,
                })
            }
            MessageContent::Forward {
                from_chat,
                message_id,
            } => {
                let forwarded = self
                    .backend
                    .forward_message(recipient, from_chat, *message_id)
                    .await?;
                Ok(Delivered {
                    message_id: forwarded.message_id,
                    text: forwarded.text,
                    forward_date: forwarded.origin_date,
                })
            }
        }
    }

    /// Ticks until `shutdown` flips to true or its sender is dropped.
    ///
    /// Every cycle, idle or not, schedules the next one a full interval after it
    /// finishes. A send that overruns the interval therefore delays the following
    /// tick instead of letting a missed tick fire straight away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let period = self.config.tick_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);

        info!(
            tick_ms = period.as_millis() as u64,
            cooldown_ms = self.config.cooldown.as_millis() as u64,
            capacity = self.config.queue_capacity,
            "dispatch loop started"
        );

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick(Instant::now()).await;
                    ticker.reset();
                }
            }
        }

        info!("dispatch loop stopped");
    }
}
