use crate::paxos::acceptor::{AcceptedProposal, GrantedMessage};
use crate::paxos::node::ReplicaNode;
use crate::paxos::peers::{PaxosPeer, PeerCallError, ReplicaEntry, ReplicaId};
use crate::paxos::suggestion_id::{StateId, SuggestionId};
use crate::paxos::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Outcome of asking the cluster for permission to suggest a value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum PermissionOutcome {
    /// A majority granted permission. If any of them had already accepted a value for this slot,
    /// this is the one accepted under the highest suggestion id.
    Majority { highest_accepted_value: Option<Value> },
    /// Not enough grants. `highest_promised_round` is the highest round a rejecting acceptor had
    /// promised, if any rejected us.
    NoMajority { highest_promised_round: Option<u64> },
    /// Some replica is ahead of our state id. We've adopted its state id; retry.
    StaleState { adopted_state_id: Option<StateId> },
}

/// PaxosMessenger is the dispatch half of the replica-to-replica contract: the calls a proposer makes
/// to fan a phase out to the whole cluster (itself included) and tally the replies.
#[async_trait::async_trait]
pub(crate) trait PaxosMessenger: Send + Sync {
    async fn send_permission_messages(&self, suggestion_id: SuggestionId, state_id: StateId) -> PermissionOutcome;

    /// Returns true if a majority accepted.
    async fn send_suggestion_messages(&self, suggestion_id: SuggestionId, value: Value, state_id: StateId) -> bool;

    /// Best effort. A replica that misses it stays behind until a later round catches it up.
    async fn send_consensus_messages(&self, value: Value, state_id: StateId);
}

/// ClusterMessenger dispatches to every replica in the local replica set, concurrently, bounding
/// each call by `rpc_timeout`.
///
/// `majority` is fixed at construction from the configured cluster size. It is deliberately not
/// recomputed from the replica set, which grows as replicas register.
pub(crate) struct ClusterMessenger {
    logger: slog::Logger,
    local: Arc<ReplicaNode>,
    majority: usize,
    rpc_timeout: Duration,
}

struct PeerReply<T> {
    replica_id: ReplicaId,
    peer: Arc<dyn PaxosPeer>,
    result: Result<T, PeerCallError>,
}

impl ClusterMessenger {
    pub(crate) fn new(logger: slog::Logger, local: Arc<ReplicaNode>, majority: usize, rpc_timeout: Duration) -> Self {
        ClusterMessenger {
            logger,
            local,
            majority,
            rpc_timeout,
        }
    }

    /// Spawn `call` against every replica. Replies come back in completion order.
    fn fan_out<T, F, Fut>(&self, call: F) -> JoinSet<PeerReply<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn PaxosPeer>) -> Fut,
        Fut: Future<Output = Result<T, PeerCallError>> + Send + 'static,
    {
        let mut calls = JoinSet::new();

        for (replica_id, entry) in self.local.membership().replicas().snapshot() {
            let peer: Arc<dyn PaxosPeer> = match entry {
                ReplicaEntry::Local => self.local.clone() as Arc<dyn PaxosPeer>,
                ReplicaEntry::Remote(peer) => peer,
            };
            let rpc = call(peer.clone());
            let rpc_timeout = self.rpc_timeout;

            calls.spawn(async move {
                let result = match tokio::time::timeout(rpc_timeout, rpc).await {
                    Ok(result) => result,
                    Err(_elapsed) => Err(PeerCallError::Timeout),
                };
                PeerReply {
                    replica_id,
                    peer,
                    result,
                }
            });
        }

        calls
    }

    /// Pull `peer`'s state id and adopt it locally.
    async fn catch_up_state_id(&self, replica_id: &ReplicaId, peer: Arc<dyn PaxosPeer>) -> Option<StateId> {
        // TODO:3 in a fully consistent version we'd also learn the values decided in the slots we skip.
        match tokio::time::timeout(self.rpc_timeout, peer.get_state_id()).await {
            Ok(Ok(state_id)) => {
                self.local.queue().advance_state_id(state_id);
                slog::info!(
                    self.logger,
                    "Adopted state id {:?} from {:?}",
                    self.local.queue().state_id(),
                    replica_id
                );
                Some(state_id)
            }
            Ok(Err(e)) => {
                slog::warn!(self.logger, "Failed to pull state id from {:?}: {}", replica_id, e);
                None
            }
            Err(_) => {
                slog::warn!(self.logger, "Timed out pulling state id from {:?}", replica_id);
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl PaxosMessenger for ClusterMessenger {
    async fn send_permission_messages(&self, suggestion_id: SuggestionId, state_id: StateId) -> PermissionOutcome {
        let mut calls = self.fan_out(|peer| {
            let suggestion_id = suggestion_id.clone();
            async move { peer.request_permission(suggestion_id, state_id).await }
        });

        let mut num_granted = 0;
        let mut highest_accepted: Option<AcceptedProposal> = None;
        let mut highest_promised_round: Option<u64> = None;

        while let Some(joined) = calls.join_next().await {
            let reply = match joined {
                Ok(reply) => reply,
                Err(e) => {
                    slog::error!(self.logger, "Permission call task failed: {:?}", e);
                    continue;
                }
            };

            match reply.result {
                Ok(GrantedMessage::Granted { last_accepted }) => {
                    num_granted += 1;
                    if let Some(accepted) = last_accepted {
                        let is_higher = match &highest_accepted {
                            Some(highest) => accepted.id > highest.id,
                            None => true,
                        };
                        if is_higher {
                            highest_accepted = Some(accepted);
                        }
                    }
                }
                Ok(GrantedMessage::Nack { promised_id }) => {
                    highest_promised_round = highest_promised_round.max(Some(promised_id.round()));
                }
                Ok(GrantedMessage::StateNack) => {
                    // Dropping `calls` aborts whatever is still in flight.
                    let adopted_state_id = self.catch_up_state_id(&reply.replica_id, reply.peer).await;
                    return PermissionOutcome::StaleState { adopted_state_id };
                }
                Err(e) => {
                    slog::debug!(self.logger, "Excluding {:?} from permission tally: {}", reply.replica_id, e);
                }
            }
        }

        slog::debug!(
            self.logger,
            "Permission for {:?} at state id {:?}: {}/{} granted",
            suggestion_id,
            state_id,
            num_granted,
            self.majority
        );

        if num_granted >= self.majority {
            PermissionOutcome::Majority {
                highest_accepted_value: highest_accepted.map(|accepted| accepted.value),
            }
        } else {
            PermissionOutcome::NoMajority { highest_promised_round }
        }
    }

    async fn send_suggestion_messages(&self, suggestion_id: SuggestionId, value: Value, state_id: StateId) -> bool {
        let mut calls = self.fan_out(|peer| {
            let suggestion_id = suggestion_id.clone();
            let value = value.clone();
            async move { peer.suggest_value(suggestion_id, value, state_id).await }
        });

        let mut num_accepted = 0;
        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok(PeerReply { result: Ok(true), .. }) => num_accepted += 1,
                Ok(PeerReply { result: Ok(false), .. }) => {}
                Ok(PeerReply {
                    replica_id,
                    result: Err(e),
                    ..
                }) => {
                    slog::debug!(self.logger, "Excluding {:?} from suggestion tally: {}", replica_id, e);
                }
                Err(e) => slog::error!(self.logger, "Suggestion call task failed: {:?}", e),
            }
        }

        slog::debug!(
            self.logger,
            "Suggestion {:?} at state id {:?}: {}/{} accepted",
            suggestion_id,
            state_id,
            num_accepted,
            self.majority
        );

        num_accepted >= self.majority
    }

    async fn send_consensus_messages(&self, value: Value, state_id: StateId) {
        let mut calls = self.fan_out(|peer| {
            let value = value.clone();
            async move { peer.report_consensus(value, state_id).await }
        });

        while let Some(joined) = calls.join_next().await {
            match joined {
                Ok(PeerReply { result: Ok(()), .. }) => {}
                Ok(PeerReply {
                    replica_id,
                    result: Err(e),
                    ..
                }) => {
                    slog::warn!(
                        self.logger,
                        "{:?} missed consensus report for state id {:?}: {}",
                        replica_id,
                        state_id,
                        e
                    );
                }
                Err(e) => slog::error!(self.logger, "Consensus call task failed: {:?}", e),
            }
        }
    }
}
