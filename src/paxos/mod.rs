//! Consensus core. Everything in here is transport agnostic: remote replicas are only ever seen
//! through `PaxosPeer`.
mod acceptor;
mod membership;
mod messenger;
mod node;
mod peers;
mod proposal_queue;
mod proposer;
mod state_machine;
mod suggestion_id;
mod value;

#[cfg(test)]
mod cluster_tests;

pub(crate) use acceptor::AcceptedProposal;
pub(crate) use acceptor::GrantedMessage;
pub(crate) use messenger::ClusterMessenger;
pub(crate) use node::ReplicaNode;
pub(crate) use peers::ConnectError;
pub(crate) use peers::MemberInfo;
pub(crate) use peers::PaxosPeer;
pub(crate) use peers::PeerCallError;
pub(crate) use peers::PeerConnector;
pub(crate) use peers::ReplicaId;
pub(crate) use proposal_queue::ProposalDropped;
pub(crate) use proposer::Proposer;
pub(crate) use suggestion_id::StateId;
pub(crate) use suggestion_id::SuggestionId;
pub(crate) use value::Command;
pub(crate) use value::Value;
