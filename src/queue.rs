//! Unbounded FIFO handing recorded mocks from the capture side to the
//! persister.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::cancel::CancelToken;

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Multi-producer, multi-consumer queue.
///
/// `push` never blocks. After [`MockQueue::close`], remaining items still
/// drain in order and then every `pop` returns `None`.
#[derive(Debug)]
pub struct MockQueue<T> {
    state: Mutex<State<T>>,
    ready: Notify,
}

impl<T> Default for MockQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MockQueue<T> {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State { items: VecDeque::new(), closed: false }),
            ready: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item. Returns `false` (dropping the item) once closed.
    pub fn push(&self, item: T) -> bool {
        {
            let mut state = self.lock();
            if state.closed {
                return false;
            }
            state.items.push_back(item);
        }
        self.ready.notify_one();
        true
    }

    /// Takes the next item without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Waits for the next item.
    ///
    /// Returns `None` when the queue is closed and drained, or when
    /// `cancel` fires first; a cancelled wait consumes nothing.
    pub async fn pop(&self, cancel: &CancelToken) -> Option<T> {
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.lock();
                if let Some(item) = state.items.pop_front() {
                    if !state.items.is_empty() {
                        self.ready.notify_one();
                    }
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            if cancel.is_cancelled() {
                return None;
            }
            tokio::select! {
                () = &mut notified => {}
                () = cancel.cancelled() => return None,
            }
        }
    }

    /// Stops accepting items and wakes every waiter.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_waiters();
    }

    /// Number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// `true` when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cancel::CancelHandle;

    #[tokio::test]
    async fn items_come_out_in_order() {
        let queue = MockQueue::new();
        queue.push(1);
        queue.push(2);
        let never = CancelToken::never();
        assert_eq!(queue.pop(&never).await, Some(1));
        assert_eq!(queue.pop(&never).await, Some(2));
    }

    #[tokio::test]
    async fn waiter_wakes_on_push() {
        let queue = Arc::new(MockQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop(&CancelToken::never()).await })
        };
        tokio::task::yield_now().await;
        queue.push("mock-0");
        assert_eq!(consumer.await.unwrap(), Some("mock-0"));
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let queue = MockQueue::new();
        queue.push(7);
        queue.close();
        assert!(!queue.push(8));
        let never = CancelToken::never();
        assert_eq!(queue.pop(&never).await, Some(7));
        assert_eq!(queue.pop(&never).await, None);
    }

    #[tokio::test]
    async fn close_wakes_idle_waiters() {
        let queue = Arc::new(MockQueue::<u32>::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop(&CancelToken::never()).await })
        };
        tokio::task::yield_now().await;
        queue.close();
        assert_eq!(consumer.await.unwrap(), None);
    }

    #[tokio::test]
    async fn cancel_returns_none_without_consuming() {
        let queue = Arc::new(MockQueue::new());
        let handle = CancelHandle::new();
        let cancelled = {
            let queue = Arc::clone(&queue);
            let token = handle.token();
            tokio::spawn(async move { queue.pop(&token).await })
        };
        tokio::task::yield_now().await;
        handle.cancel();
        assert_eq!(cancelled.await.unwrap(), None);

        queue.push(5);
        assert_eq!(queue.len(), 1);
        let got = tokio::time::timeout(Duration::from_secs(1), queue.pop(&CancelToken::never())).await;
        assert_eq!(got.unwrap(), Some(5));
    }
}
