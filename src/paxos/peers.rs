use crate::paxos::acceptor::GrantedMessage;
use crate::paxos::suggestion_id::{StateId, SuggestionId};
use crate::paxos::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// ReplicaId...or maybe it should be NodeId or ServerId. Idk.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct ReplicaId(String);

impl ReplicaId {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        ReplicaId(id.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a configured replica serves the peer RPC surface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MemberInfo {
    pub(crate) replica_id: ReplicaId,
    pub(crate) host: String,
    pub(crate) port: u16,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum PeerCallError {
    #[error("Timed out calling peer")]
    Timeout,
    #[error("Un-modeled failure from peer RPC call: {0}")]
    Rpc(String),
    #[error("Malformed reply from peer: {0}")]
    MalformedReply(String),
    #[error("Peer is unreachable")]
    Unreachable,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConnectError {
    #[error("Invalid peer address '{0}'")]
    InvalidAddress(String),
    #[error("Failed to connect to peer: {0}")]
    ConnectFailure(String),
}

/// PaxosPeer is the surface every replica exposes to every other replica's proposer (the
/// "response methods"). The local replica implements it directly; remote replicas are reached
/// through an RPC client.
///
/// Any `Err` means "this replica did not respond". Callers exclude it from the current tally and
/// move on.
#[async_trait::async_trait]
pub(crate) trait PaxosPeer: Send + Sync {
    /// Reverse-registration handshake: ask the peer to open a connection back to `id`.
    async fn register_this_id(&self, id: ReplicaId) -> Result<bool, PeerCallError>;

    async fn request_permission(
        &self,
        suggestion_id: SuggestionId,
        state_id: StateId,
    ) -> Result<GrantedMessage, PeerCallError>;

    async fn suggest_value(
        &self,
        suggestion_id: SuggestionId,
        value: Value,
        state_id: StateId,
    ) -> Result<bool, PeerCallError>;

    async fn report_consensus(&self, value: Value, state_id: StateId) -> Result<(), PeerCallError>;

    async fn get_state_id(&self) -> Result<StateId, PeerCallError>;
}

/// PeerConnector opens a `PaxosPeer` handle to a configured replica.
#[async_trait::async_trait]
pub(crate) trait PeerConnector: Send + Sync {
    async fn connect(&self, member: &MemberInfo) -> Result<Arc<dyn PaxosPeer>, ConnectError>;
}

/// An entry of the replica set. The local replica is kept as a marker rather than a handle to
/// itself.
#[derive(Clone)]
pub(crate) enum ReplicaEntry {
    Local,
    Remote(Arc<dyn PaxosPeer>),
}

/// ReplicaSet is the append-only registry of replicas this replica talks to, keyed by replica id.
///
/// There is no removal path. A dead replica stays registered and its calls simply fail.
pub(crate) struct ReplicaSet {
    entries: RwLock<BTreeMap<ReplicaId, ReplicaEntry>>,
}

impl ReplicaSet {
    pub(crate) fn new(my_replica_id: ReplicaId) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(my_replica_id, ReplicaEntry::Local);

        ReplicaSet {
            entries: RwLock::new(entries),
        }
    }

    /// First write wins, so a replica is never counted twice in a tally.
    ///
    /// Returns true if `replica_id` was newly added.
    pub(crate) fn register(&self, replica_id: ReplicaId, peer: Arc<dyn PaxosPeer>) -> bool {
        let mut entries = self.entries.write().expect("ReplicaSet lock poison");
        if entries.contains_key(&replica_id) {
            return false;
        }

        entries.insert(replica_id, ReplicaEntry::Remote(peer));
        true
    }

    pub(crate) fn contains(&self, replica_id: &ReplicaId) -> bool {
        self.entries
            .read()
            .expect("ReplicaSet lock poison")
            .contains_key(replica_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().expect("ReplicaSet lock poison").len()
    }

    pub(crate) fn snapshot(&self) -> Vec<(ReplicaId, ReplicaEntry)> {
        self.entries
            .read()
            .expect("ReplicaSet lock poison")
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }
}
