use crate::paxos::messenger::{PaxosMessenger, PermissionOutcome};
use crate::paxos::peers::ReplicaId;
use crate::paxos::proposal_queue::ProposalQueue;
use crate::paxos::suggestion_id::{StateId, SuggestionId};
use crate::paxos::value::Value;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Proposer drives consensus for one replica. It drains the local proposal queue one slot at a
/// time, running the permission and suggestion phases against the whole cluster through its
/// messenger, and broadcasts the consensus report when a majority accepts.
///
/// It is spawned once at replica boot and never terminates.
pub(crate) struct Proposer<M: PaxosMessenger> {
    logger: slog::Logger,
    my_replica_id: ReplicaId,
    queue: Arc<ProposalQueue>,
    messenger: M,
    round: u64,
    retry_backoff_min: Duration,
    retry_backoff_max: Duration,
}

#[derive(Debug, Eq, PartialEq)]
pub(crate) enum RoundOutcome {
    Committed { value: Value, state_id: StateId },
    NoPermissionMajority,
    StaleState,
    SuggestionRejected,
}

impl<M: PaxosMessenger> Proposer<M> {
    pub(crate) fn new(
        logger: slog::Logger,
        my_replica_id: ReplicaId,
        queue: Arc<ProposalQueue>,
        messenger: M,
        retry_backoff_min: Duration,
        retry_backoff_max: Duration,
    ) -> Self {
        Proposer {
            logger,
            my_replica_id,
            queue,
            messenger,
            round: 0,
            retry_backoff_min,
            retry_backoff_max,
        }
    }

    pub(crate) async fn run(mut self) {
        slog::info!(self.logger, "Proposer started");
        loop {
            self.queue.wait_until_non_empty().await;

            match self.run_round().await {
                RoundOutcome::Committed { .. } => {}
                RoundOutcome::NoPermissionMajority | RoundOutcome::StaleState | RoundOutcome::SuggestionRejected => {
                    self.back_off().await;
                }
            }
        }
    }

    /// One attempt at deciding the current slot.
    pub(crate) async fn run_round(&mut self) -> RoundOutcome {
        self.round += 1;
        let suggestion_id = SuggestionId::new(self.round, self.my_replica_id.clone());
        let state_id = self.queue.state_id();
        let logger = self.logger.new(slog::o!(
            "Round" => self.round,
            "StateId" => state_id.as_u64(),
        ));

        let highest_accepted_value = match self
            .messenger
            .send_permission_messages(suggestion_id.clone(), state_id)
            .await
        {
            PermissionOutcome::Majority { highest_accepted_value } => highest_accepted_value,
            PermissionOutcome::NoMajority { highest_promised_round } => {
                if let Some(promised_round) = highest_promised_round {
                    // Next attempt starts above whatever beat us.
                    self.round = self.round.max(promised_round);
                }
                slog::debug!(logger, "No permission majority");
                return RoundOutcome::NoPermissionMajority;
            }
            PermissionOutcome::StaleState { adopted_state_id } => {
                slog::info!(logger, "Behind the cluster, adopted state id {:?}", adopted_state_id);
                return RoundOutcome::StaleState;
            }
        };

        // An acceptor already accepted a value for this slot, so that is the only value we may suggest.
        let value = match highest_accepted_value {
            Some(accepted) => {
                slog::debug!(logger, "Re-proposing previously accepted {:?}", accepted);
                accepted
            }
            None => self.queue.peek_head().unwrap_or_else(Value::no_op),
        };

        if !self
            .messenger
            .send_suggestion_messages(suggestion_id, value.clone(), state_id)
            .await
        {
            slog::debug!(logger, "Suggestion of {:?} rejected by the majority", value);
            return RoundOutcome::SuggestionRejected;
        }

        slog::info!(logger, "Reached consensus on {:?}", value);
        self.messenger.send_consensus_messages(value.clone(), state_id).await;

        RoundOutcome::Committed { value, state_id }
    }

    async fn back_off(&self) {
        let backoff = if self.retry_backoff_min >= self.retry_backoff_max {
            self.retry_backoff_min
        } else {
            rand::thread_rng().gen_range(self.retry_backoff_min..=self.retry_backoff_max)
        };
        tokio::time::sleep(backoff).await;
    }
}
