use crate::paxos::proposal_queue::ProposalQueue;
use crate::paxos::suggestion_id::{StateId, SuggestionId};
use crate::paxos::value::Value;
use std::sync::{Mutex, MutexGuard};

/// A value an acceptor has accepted, and the suggestion that carried it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct AcceptedProposal {
    pub(crate) id: SuggestionId,
    pub(crate) value: Value,
}

/// An acceptor's answer to a proposer's request for permission to suggest a value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum GrantedMessage {
    /// Permission granted. Carries the value this acceptor already accepted for the requested
    /// slot, if any, which the proposer must then re-propose.
    Granted { last_accepted: Option<AcceptedProposal> },
    /// We already promised a higher suggestion id.
    Nack { promised_id: SuggestionId },
    /// The proposer's state id is behind ours. It must catch up before proposing again.
    StateNack,
}

/// Acceptor is the Paxos acceptor role for the log slot currently in flight.
///
/// Each of `request_permission()` and `suggest_value()` runs as a single critical section, since
/// safety depends on comparing then updating `last_promised_id` without interleaving.
pub(crate) struct Acceptor {
    logger: slog::Logger,
    state: Mutex<AcceptorState>,
}

struct AcceptorState {
    last_promised_id: SuggestionId,
    last_accepted_id: SuggestionId,
    last_accepted_value: Option<Value>,
    last_accepted_state_id: StateId,
}

impl Acceptor {
    pub(crate) fn new(logger: slog::Logger) -> Self {
        Acceptor {
            logger,
            state: Mutex::new(AcceptorState {
                last_promised_id: SuggestionId::initial(),
                last_accepted_id: SuggestionId::initial(),
                last_accepted_value: None,
                last_accepted_state_id: StateId::none_accepted(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AcceptorState> {
        self.state.lock().expect("Acceptor mutex guard poison")
    }

    pub(crate) fn request_permission(
        &self,
        suggestion_id: SuggestionId,
        sender_state_id: StateId,
        queue: &ProposalQueue,
    ) -> GrantedMessage {
        let mut state = self.lock();

        // 1. The proposer is behind. It must refresh its state id from the cluster.
        let my_state_id = queue.state_id();
        if sender_state_id < my_state_id {
            slog::info!(
                self.logger,
                "STATE_NACK {:?}: sender state id {:?} < ours {:?}",
                suggestion_id,
                sender_state_id,
                my_state_id
            );
            return GrantedMessage::StateNack;
        }

        // 2. We're behind. Jump forward.
        // TODO:3 catch up the decided values of the skipped slots, not just the counter.
        if sender_state_id > my_state_id {
            slog::info!(
                self.logger,
                "Advancing state id {:?} -> {:?} from permission request",
                my_state_id,
                sender_state_id
            );
            queue.advance_state_id(sender_state_id);
        }

        // 3. A value accepted for an older slot must not leak into this slot's decision.
        if sender_state_id > state.last_accepted_state_id {
            state.last_accepted_value = None;
        }

        // 4. Promise.
        if suggestion_id >= state.last_promised_id {
            state.last_promised_id = suggestion_id;
            let last_accepted = state.last_accepted_value.clone().map(|value| AcceptedProposal {
                id: state.last_accepted_id.clone(),
                value,
            });
            GrantedMessage::Granted { last_accepted }
        } else {
            slog::debug!(
                self.logger,
                "NACK {:?}: already promised {:?}",
                suggestion_id,
                state.last_promised_id
            );
            GrantedMessage::Nack {
                promised_id: state.last_promised_id.clone(),
            }
        }
    }

    pub(crate) fn suggest_value(
        &self,
        suggestion_id: SuggestionId,
        value: Value,
        sender_state_id: StateId,
        queue: &ProposalQueue,
    ) -> bool {
        let mut state = self.lock();

        if sender_state_id < queue.state_id() {
            return false;
        }

        if suggestion_id >= state.last_promised_id {
            slog::debug!(
                self.logger,
                "Accepted {:?} = {:?} for state id {:?}",
                suggestion_id,
                value,
                sender_state_id
            );
            state.last_accepted_id = suggestion_id;
            state.last_accepted_value = Some(value);
            state.last_accepted_state_id = sender_state_id;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    pub(crate) fn last_promised_id(&self) -> SuggestionId {
        self.lock().last_promised_id.clone()
    }
}
