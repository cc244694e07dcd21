use crate::paxos::peers::{MemberInfo, PeerConnector, ReplicaId, ReplicaSet};
use std::collections::HashMap;
use std::sync::Arc;

/// Membership owns the replica set and knows how to grow it: from the static cluster configuration
/// at startup, and from reverse-registration handshakes initiated by replicas that start later.
pub(crate) struct Membership {
    logger: slog::Logger,
    my_replica_id: ReplicaId,
    configured_members: HashMap<ReplicaId, MemberInfo>,
    connector: Arc<dyn PeerConnector>,
    replicas: ReplicaSet,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum JoinClusterError {
    #[error("Replica {replica_id:?} at {host}:{port} could not bind to this replica")]
    RegistrationRejected {
        replica_id: ReplicaId,
        host: String,
        port: u16,
    },
}

impl Membership {
    pub(crate) fn new(
        logger: slog::Logger,
        my_replica_id: ReplicaId,
        cluster_members: Vec<MemberInfo>,
        connector: Arc<dyn PeerConnector>,
    ) -> Self {
        let configured_members = cluster_members
            .into_iter()
            .map(|member| (member.replica_id.clone(), member))
            .collect();
        let replicas = ReplicaSet::new(my_replica_id.clone());

        Membership {
            logger,
            my_replica_id,
            configured_members,
            connector,
            replicas,
        }
    }

    pub(crate) fn replicas(&self) -> &ReplicaSet {
        &self.replicas
    }

    /// Connect to every other configured replica and ask it to register us back. Replicas that
    /// can't be reached are skipped; they will register themselves when they start.
    ///
    /// Returns the number of peers now in the replica set.
    pub(crate) async fn join_cluster(&self) -> Result<usize, JoinClusterError> {
        let mut others: Vec<&MemberInfo> = self
            .configured_members
            .values()
            .filter(|member| member.replica_id != self.my_replica_id)
            .collect();
        others.sort_by(|a, b| a.replica_id.cmp(&b.replica_id));

        for member in others {
            let logger = self.logger.new(slog::o!("Peer" => member.replica_id.as_str().to_string()));

            let peer = match self.connector.connect(member).await {
                Ok(peer) => peer,
                Err(e) => {
                    slog::info!(logger, "Skipping unreachable replica: {}", e);
                    continue;
                }
            };

            match peer.register_this_id(self.my_replica_id.clone()).await {
                Ok(true) => {
                    self.replicas.register(member.replica_id.clone(), peer);
                    slog::info!(logger, "Registered with replica at {}:{}", member.host, member.port);
                }
                Ok(false) => {
                    return Err(JoinClusterError::RegistrationRejected {
                        replica_id: member.replica_id.clone(),
                        host: member.host.clone(),
                        port: member.port,
                    });
                }
                Err(e) => {
                    slog::info!(logger, "Replica went away during registration: {}", e);
                }
            }
        }

        let num_peers = self.replicas.len() - 1;
        slog::info!(self.logger, "Replicas found: {}", num_peers);
        Ok(num_peers)
    }

    /// Handle a peer's reverse-registration request by connecting back to it.
    ///
    /// Returns false if `replica_id` is not in our static configuration or we can't reach it.
    pub(crate) async fn register_this_id(&self, replica_id: ReplicaId) -> bool {
        let member = match self.configured_members.get(&replica_id) {
            Some(member) => member,
            None => {
                slog::warn!(self.logger, "Refusing registration from unknown replica {:?}", replica_id);
                return false;
            }
        };

        if self.replicas.contains(&replica_id) {
            slog::debug!(self.logger, "Replica {:?} is already registered", replica_id);
            return true;
        }

        match self.connector.connect(member).await {
            Ok(peer) => {
                self.replicas.register(replica_id.clone(), peer);
                slog::info!(
                    self.logger,
                    "Registered replica {:?} at {}:{} (replica set size: {})",
                    replica_id,
                    member.host,
                    member.port,
                    self.replicas.len()
                );
                true
            }
            Err(e) => {
                slog::warn!(self.logger, "Failed to connect back to replica {:?}: {}", replica_id, e);
                false
            }
        }
    }
}
