use crate::paxos::suggestion_id::StateId;
use crate::paxos::value::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{oneshot, Notify};

/// ProposalQueue is the backlog of client commands this replica still wants the cluster to agree
/// on, in arrival order, plus the state id of the next log slot to be agreed.
///
/// It is shared between the request path (enqueue), the proposer task (peek/wait), and the
/// acceptor/learner handlers (state id, dequeue). Every accessor takes the same lock.
pub(crate) struct ProposalQueue {
    inner: Mutex<QueueState>,
    not_empty: Notify,
}

struct QueueState {
    pending: VecDeque<PendingProposal>,
    state_id: StateId,
}

impl QueueState {
    fn release_head_if(&mut self, value: &Value) -> bool {
        let head_matches = match self.pending.front() {
            Some(head) => head.value == *value,
            None => false,
        };
        if !head_matches {
            return false;
        }

        if let Some(head) = self.pending.pop_front() {
            // Receiver may have gone away (client hung up). Nothing to do about it.
            let _ = head.executed.send(());
        }
        true
    }

    fn advance_to(&mut self, new_state_id: StateId) -> bool {
        if new_state_id > self.state_id {
            self.state_id = new_state_id;
            true
        } else {
            false
        }
    }
}

struct PendingProposal {
    value: Value,
    executed: oneshot::Sender<()>,
}

/// What `complete_slot` changed: whether the head was the agreed command, and whether the state
/// id moved.
#[derive(Debug, Eq, PartialEq)]
pub(crate) struct SlotCompletion {
    pub(crate) released: bool,
    pub(crate) advanced: bool,
}

/// ExecutionReceipt resolves once the enqueued value has been agreed by the cluster and applied
/// locally. Its flag flips exactly once.
pub(crate) struct ExecutionReceipt {
    rx: oneshot::Receiver<()>,
}

#[derive(Debug, thiserror::Error)]
#[error("Proposal was dropped before it was executed")]
pub(crate) struct ProposalDropped;

impl ExecutionReceipt {
    pub(crate) async fn executed(self) -> Result<(), ProposalDropped> {
        self.rx.await.map_err(|_| ProposalDropped)
    }
}

impl ProposalQueue {
    pub(crate) fn new() -> Self {
        ProposalQueue {
            inner: Mutex::new(QueueState {
                pending: VecDeque::new(),
                state_id: StateId::first_slot(),
            }),
            not_empty: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().expect("ProposalQueue mutex guard poison")
    }

    pub(crate) fn enqueue(&self, value: Value) -> ExecutionReceipt {
        let (tx, rx) = oneshot::channel();
        self.lock().pending.push_back(PendingProposal { value, executed: tx });
        self.not_empty.notify_one();

        ExecutionReceipt { rx }
    }

    pub(crate) fn peek_head(&self) -> Option<Value> {
        self.lock().pending.front().map(|p| p.value.clone())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Remove the head and mark it executed, iff it equals `value`. Otherwise the head belongs to
    /// a round that is still pending and the queue is left untouched.
    ///
    /// Returns true if the head was removed.
    #[cfg(test)]
    pub(crate) fn dequeue_if_matches(&self, value: &Value) -> bool {
        self.lock().release_head_if(value)
    }

    pub(crate) fn state_id(&self) -> StateId {
        self.lock().state_id
    }

    /// Move the state id forward to `new_state_id`. The state id never goes backwards, so a lower
    /// value is ignored.
    ///
    /// Returns true if we mutated state.
    pub(crate) fn advance_state_id(&self, new_state_id: StateId) -> bool {
        self.lock().advance_to(new_state_id)
    }

    /// Record that the cluster agreed on `value` for `state_id`: release the head if it is that
    /// command, then move the state id past the slot. Both happen under one lock, so nobody reads
    /// the next slot while the agreed command is still at the head.
    pub(crate) fn complete_slot(&self, value: &Value, state_id: StateId) -> SlotCompletion {
        let mut state = self.lock();
        let released = state.release_head_if(value);
        let advanced = state.advance_to(state_id.next());

        SlotCompletion { released, advanced }
    }

    /// Resolves once the queue holds at least one value. Does not consume anything.
    pub(crate) async fn wait_until_non_empty(&self) {
        loop {
            if !self.is_empty() {
                return;
            }
            // `notify_one()` stores a permit if nobody is waiting, so an enqueue that lands between
            // the check above and this await is not lost.
            self.not_empty.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn new_queue_is_empty_at_first_slot() {
        let queue = ProposalQueue::new();

        assert!(queue.is_empty());
        assert_eq!(queue.peek_head(), None);
        assert_eq!(queue.state_id(), StateId::new(1));
    }

    #[test]
    fn fifo_order() {
        let queue = ProposalQueue::new();
        let _r1 = queue.enqueue(Value::put("a".into(), "1".into()));
        let _r2 = queue.enqueue(Value::delete("b".into()));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_head(), Some(Value::put("a".into(), "1".into())));
        assert!(queue.dequeue_if_matches(&Value::put("a".into(), "1".into())));
        assert_eq!(queue.peek_head(), Some(Value::delete("b".into())));
    }

    #[tokio::test]
    async fn dequeue_guard_only_removes_matching_head() {
        let queue = ProposalQueue::new();
        let head_receipt = queue.enqueue(Value::put("x".into(), "1".into()));
        let _tail_receipt = queue.enqueue(Value::put("y".into(), "2".into()));

        // Matches the tail, not the head: no-op.
        assert!(!queue.dequeue_if_matches(&Value::put("y".into(), "2".into())));
        // Same key, different value: no-op.
        assert!(!queue.dequeue_if_matches(&Value::put("x".into(), "2".into())));
        assert!(!queue.dequeue_if_matches(&Value::no_op()));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek_head(), Some(Value::put("x".into(), "1".into())));

        assert!(queue.dequeue_if_matches(&Value::put("x".into(), "1".into())));
        assert_eq!(queue.len(), 1);
        tokio::time::timeout(Duration::from_secs(1), head_receipt.executed())
            .await
            .expect("Receipt should resolve after dequeue")
            .expect("Proposal should not be dropped");
    }

    #[tokio::test]
    async fn unmatched_receipt_stays_pending() {
        let queue = ProposalQueue::new();
        let receipt = queue.enqueue(Value::delete("x".into()));

        assert!(!queue.dequeue_if_matches(&Value::delete("y".into())));

        tokio::time::timeout(Duration::from_millis(50), receipt.executed())
            .await
            .expect_err("Receipt should not resolve");
    }

    #[test]
    fn dequeue_on_empty_queue_is_noop() {
        let queue = ProposalQueue::new();
        assert!(!queue.dequeue_if_matches(&Value::no_op()));
    }

    #[test]
    fn state_id_only_moves_forward() {
        let queue = ProposalQueue::new();

        assert!(queue.advance_state_id(StateId::new(5)));
        assert!(!queue.advance_state_id(StateId::new(3)));
        assert!(!queue.advance_state_id(StateId::new(5)));
        assert_eq!(queue.state_id(), StateId::new(5));
    }

    #[tokio::test]
    async fn wait_until_non_empty_wakes_on_enqueue() {
        let queue = Arc::new(ProposalQueue::new());

        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.wait_until_non_empty().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let _receipt = queue.enqueue(Value::put("k".into(), "v".into()));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("Waiter should wake up")
            .expect("Waiter task panicked");
    }

    #[tokio::test]
    async fn dropped_queue_fails_receipt() {
        let queue = ProposalQueue::new();
        let receipt = queue.enqueue(Value::put("k".into(), "v".into()));
        drop(queue);

        assert!(receipt.executed().await.is_err());
    }

    #[tokio::test]
    async fn completing_a_slot_releases_head_and_moves_past_it() {
        let queue = ProposalQueue::new();
        let receipt = queue.enqueue(Value::put("x".into(), "1".into()));
        let _tail = queue.enqueue(Value::put("y".into(), "2".into()));

        assert_eq!(
            queue.complete_slot(&Value::put("x".into(), "1".into()), StateId::new(1)),
            SlotCompletion {
                released: true,
                advanced: true
            }
        );
        assert_eq!(queue.state_id(), StateId::new(2));
        assert_eq!(queue.peek_head(), Some(Value::put("y".into(), "2".into())));
        tokio::time::timeout(Duration::from_secs(1), receipt.executed())
            .await
            .expect("Receipt should resolve once its slot completes")
            .expect("Proposal should not be dropped");

        // Someone else's command for a slot we already passed.
        assert_eq!(
            queue.complete_slot(&Value::delete("z".into()), StateId::new(1)),
            SlotCompletion {
                released: false,
                advanced: false
            }
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn agreed_head_is_gone_once_the_next_slot_is_visible() {
        for _ in 0..200 {
            let queue = Arc::new(ProposalQueue::new());
            let agreed = Value::put("x".into(), "1".into());
            let _receipt = queue.enqueue(agreed.clone());
            let _tail = queue.enqueue(Value::put("y".into(), "2".into()));

            let reader = {
                let queue = queue.clone();
                let agreed = agreed.clone();
                std::thread::spawn(move || loop {
                    // Same read order as the proposer: slot first, then head.
                    let state_id = queue.state_id();
                    let head = queue.peek_head();
                    if state_id == StateId::new(2) {
                        assert_ne!(head.as_ref(), Some(&agreed), "agreed command still queued for the next slot");
                        return;
                    }
                })
            };

            queue.complete_slot(&agreed, StateId::new(1));
            reader.join().expect("Reader saw the agreed command in the next slot");
        }
    }
}
