use crate::paxos::acceptor::{Acceptor, GrantedMessage};
use crate::paxos::membership::Membership;
use crate::paxos::peers::{MemberInfo, PaxosPeer, PeerCallError, PeerConnector, ReplicaId};
use crate::paxos::proposal_queue::{ExecutionReceipt, ProposalQueue};
use crate::paxos::state_machine::KvStateMachine;
use crate::paxos::suggestion_id::{StateId, SuggestionId};
use crate::paxos::value::Value;
use std::sync::Arc;

/// ReplicaNode is one replica of the key-value store: the local acceptor, the learner that applies
/// agreed values to the local map, the proposal backlog, and the replica set.
///
/// It serves the peer-facing response methods, and it is what the store's put/get/delete run
/// against. The proposer task that drives consensus for this replica runs separately and talks to
/// it through a `ClusterMessenger`.
pub(crate) struct ReplicaNode {
    logger: slog::Logger,
    my_replica_id: ReplicaId,
    queue: Arc<ProposalQueue>,
    acceptor: Acceptor,
    state_machine: KvStateMachine,
    membership: Membership,
}

impl ReplicaNode {
    pub(crate) fn new(
        logger: slog::Logger,
        my_replica_id: ReplicaId,
        cluster_members: Vec<MemberInfo>,
        connector: Arc<dyn PeerConnector>,
    ) -> Self {
        let acceptor = Acceptor::new(logger.new(slog::o!("Role" => "Acceptor")));
        let membership = Membership::new(
            logger.new(slog::o!("Role" => "Membership")),
            my_replica_id.clone(),
            cluster_members,
            connector,
        );

        ReplicaNode {
            logger,
            my_replica_id,
            queue: Arc::new(ProposalQueue::new()),
            acceptor,
            state_machine: KvStateMachine::new(),
            membership,
        }
    }

    pub(crate) fn my_replica_id(&self) -> &ReplicaId {
        &self.my_replica_id
    }

    pub(crate) fn queue(&self) -> &Arc<ProposalQueue> {
        &self.queue
    }

    pub(crate) fn membership(&self) -> &Membership {
        &self.membership
    }

    // --------------------------------- Store ---------------------------------

    /// Enqueue `value` for consensus. The receipt resolves once it has been agreed and applied.
    pub(crate) fn propose(&self, value: Value) -> ExecutionReceipt {
        slog::debug!(self.logger, "Enqueued {:?}", value);
        self.queue.enqueue(value)
    }

    /// Local read. Never consults the cluster.
    pub(crate) fn read(&self, key: &str) -> Option<String> {
        self.state_machine.get(key)
    }

    // ---------------------------- Response methods ----------------------------

    pub(crate) fn handle_request_permission(&self, suggestion_id: SuggestionId, state_id: StateId) -> GrantedMessage {
        self.acceptor.request_permission(suggestion_id, state_id, &self.queue)
    }

    pub(crate) fn handle_suggest_value(&self, suggestion_id: SuggestionId, value: Value, state_id: StateId) -> bool {
        self.acceptor.suggest_value(suggestion_id, value, state_id, &self.queue)
    }

    /// Learner: apply a value the cluster agreed on for `state_id`.
    ///
    /// The value may not be one we proposed (another replica may have recovered and re-proposed
    /// it), so the queue head is only released if it is the same command.
    pub(crate) fn handle_report_consensus(&self, value: Value, state_id: StateId) {
        // Apply before releasing the waiting client, so its next read sees the write.
        self.state_machine.execute_value(&value);
        let completion = self.queue.complete_slot(&value, state_id);
        if completion.advanced {
            slog::debug!(self.logger, "State id advanced to {:?}", state_id.next());
        }

        slog::info!(
            self.logger,
            "Consensus for state id {:?}: {:?} (mine: {}, still queued: {})",
            state_id,
            value,
            completion.released,
            self.queue.len()
        );
    }

    pub(crate) fn state_id(&self) -> StateId {
        self.queue.state_id()
    }

    pub(crate) async fn handle_register_this_id(&self, replica_id: ReplicaId) -> bool {
        self.membership.register_this_id(replica_id).await
    }

    #[cfg(test)]
    pub(crate) fn acceptor(&self) -> &Acceptor {
        &self.acceptor
    }
}

// The local replica answers its own proposer without going over the wire, so none of these fail.
#[async_trait::async_trait]
impl PaxosPeer for ReplicaNode {
    async fn register_this_id(&self, id: ReplicaId) -> Result<bool, PeerCallError> {
        Ok(self.handle_register_this_id(id).await)
    }

    async fn request_permission(
        &self,
        suggestion_id: SuggestionId,
        state_id: StateId,
    ) -> Result<GrantedMessage, PeerCallError> {
        Ok(self.handle_request_permission(suggestion_id, state_id))
    }

    async fn suggest_value(
        &self,
        suggestion_id: SuggestionId,
        value: Value,
        state_id: StateId,
    ) -> Result<bool, PeerCallError> {
        Ok(self.handle_suggest_value(suggestion_id, value, state_id))
    }

    async fn report_consensus(&self, value: Value, state_id: StateId) -> Result<(), PeerCallError> {
        self.handle_report_consensus(value, state_id);
        Ok(())
    }

    async fn get_state_id(&self) -> Result<StateId, PeerCallError> {
        Ok(self.state_id())
    }
}
