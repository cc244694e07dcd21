use crate::paxos::peers::ReplicaId;
use std::fmt;

/// StateId is a slot in the agreed-command log. The first command the cluster agrees on has state
/// id 1, the second has state id 2, etc.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct StateId(u64);

impl StateId {
    pub(crate) fn new(state_id: u64) -> Self {
        StateId(state_id)
    }

    /// The slot a fresh replica expects to agree on first.
    pub(crate) fn first_slot() -> Self {
        StateId(1)
    }

    /// Sentinel for "nothing accepted yet". Lower than every real slot.
    pub(crate) fn none_accepted() -> Self {
        StateId(0)
    }

    pub(crate) fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn next(&self) -> Self {
        StateId(self.0 + 1)
    }
}

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SuggestionId identifies one proposal round. Ids compare by round number first, and the
/// proposer's replica id breaks ties (lexicographically), so two proposers never produce equal ids.
///
/// Field order matters: the derived `Ord` compares `round` before `proposer_id`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct SuggestionId {
    round: u64,
    proposer_id: ReplicaId,
}

impl SuggestionId {
    pub(crate) fn new(round: u64, proposer_id: ReplicaId) -> Self {
        SuggestionId { round, proposer_id }
    }

    /// The id every acceptor starts out having "promised". Any real suggestion is >= this one.
    pub(crate) fn initial() -> Self {
        SuggestionId::new(0, ReplicaId::new(""))
    }

    pub(crate) fn round(&self) -> u64 {
        self.round
    }

    pub(crate) fn proposer_id(&self) -> &ReplicaId {
        &self.proposer_id
    }
}

impl fmt::Debug for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.round, self.proposer_id.as_str())
    }
}
