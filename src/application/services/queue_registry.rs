use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::domain::{errors::DispatchError, models::QueuedMessage, value_objects::RecipientId};

/// Fixed-capacity FIFO. Pushing never waits for space.
pub struct BoundedQueue {
    capacity: usize,
    items: Mutex<VecDeque<QueuedMessage>>,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Hands the item back when the queue is full.
    pub async fn try_push(&self, item: QueuedMessage) -> Result<(), QueuedMessage> {
        let mut items = self.items.lock().await;
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        Ok(())
    }

    pub async fn pop_front(&self) -> Option<QueuedMessage> {
        self.items.lock().await.pop_front()
    }

    pub async fn peek_front(&self) -> Option<QueuedMessage> {
        self.items.lock().await.front().cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

/// One bounded queue per recipient, created on first enqueue and never removed.
///
/// The registry lock only covers the recipient map. Pushes and pops go through
/// the per-recipient queue lock, so a full queue for one recipient never holds
/// up producers writing to another.
pub struct QueueRegistry {
    capacity: usize,
    queues: RwLock<HashMap<RecipientId, Arc<BoundedQueue>>>,
}

impl QueueRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queues: RwLock::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    async fn queue(&self, recipient: RecipientId) -> Option<Arc<BoundedQueue>> {
        self.queues.read().await.get(&recipient).cloned()
    }

    async fn queue_or_create(&self, recipient: RecipientId) -> Arc<BoundedQueue> {
        if let Some(queue) = self.queue(recipient).await {
            return queue;
        }

        let mut queues = self.queues.write().await;
        queues
            .entry(recipient)
            .or_insert_with(|| Arc::new(BoundedQueue::new(self.capacity)))
            .clone()
    }

    pub async fn enqueue(&self, item: QueuedMessage) -> Result<(), DispatchError> {
        let recipient = item.message.recipient;
        let queue = self.queue_or_create(recipient).await;

        queue
            .try_push(item)
            .await
            .map_err(|_| DispatchError::QueueOverflow {
                recipient,
                capacity: self.capacity,
            })
    }

    pub async fn len(&self, recipient: RecipientId) -> usize {
        match self.queue(recipient).await {
            Some(queue) => queue.len().await,
            None => 0,
        }
    }

    pub async fn is_empty(&self, recipient: RecipientId) -> bool {
        self.len(recipient).await == 0
    }

    pub(crate) async fn peek_front(&self, recipient: RecipientId) -> Option<QueuedMessage> {
        self.queue(recipient).await?.peek_front().await
    }

    pub(crate) async fn pop_front(&self, recipient: RecipientId) -> Option<QueuedMessage> {
        self.queue(recipient).await?.pop_front().await
    }

    /// Every recipient that has ever been enqueued to, in id order.
    #[cfg(test)]
    async fn recipients(&self) -> Vec<RecipientId> {
        let mut recipients: Vec<_> = self.queues.read().await.keys().copied().collect();
        recipients.sort_unstable();
        recipients
    }

    /// Recipients with at least one pending message, in id order.
    pub async fn pending_recipients(&self) -> Vec<RecipientId> {
        let snapshot: Vec<_> = self
            .queues
            .read()
            .await
            .iter()
            .map(|(recipient, queue)| (*recipient, queue.clone()))
            .collect();

        let mut pending = Vec::with_capacity(snapshot.len());
        for (recipient, queue) in snapshot {
            if !queue.is_empty().await {
                pending.push(recipient);
            }
        }
        pending.sort_unstable();
        pending
    }
}
