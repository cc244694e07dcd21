use crate::paxos::{ProposalDropped, ReplicaNode, Value};
use std::sync::Arc;

/// KeyValueStore is what a front end serves clients from.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Resolves once the write has been agreed by the cluster and applied on this replica. There
    /// is no timeout: without a reachable majority this never resolves.
    async fn put(&self, key: String, value: String) -> Result<(), StoreError>;

    /// Reads this replica's applied state. Never consults the cluster, so it may be stale.
    fn get(&self, key: &str) -> Option<String>;

    /// Same blocking contract as `put()`. Deleting a missing key succeeds.
    async fn delete(&self, key: String) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    // Consensus runs on a background task. This error is returned if its state went away.
    #[error("Replica task has exited")]
    ReplicaExited,
}

/// ReplicatedKvStore is the Paxos-replicated key-value store of one replica. Cheap to clone.
#[derive(Clone)]
pub struct ReplicatedKvStore {
    node: Arc<ReplicaNode>,
}

impl ReplicatedKvStore {
    pub(crate) fn new(node: Arc<ReplicaNode>) -> Self {
        ReplicatedKvStore { node }
    }

    async fn propose_and_wait(&self, value: Value) -> Result<(), StoreError> {
        self.node.propose(value).executed().await.map_err(|e| e.into())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for ReplicatedKvStore {
    async fn put(&self, key: String, value: String) -> Result<(), StoreError> {
        self.propose_and_wait(Value::put(key, value)).await
    }

    fn get(&self, key: &str) -> Option<String> {
        self.node.read(key)
    }

    async fn delete(&self, key: String) -> Result<(), StoreError> {
        self.propose_and_wait(Value::delete(key)).await
    }
}

// ------- Conversions --------

impl From<ProposalDropped> for StoreError {
    fn from(_: ProposalDropped) -> Self {
        StoreError::ReplicaExited
    }
}
