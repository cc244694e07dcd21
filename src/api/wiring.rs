use crate::api::configuration::MemberInfo;
use crate::api::options::{PaxosOptions, PaxosOptionsValidated};
use crate::api::store::ReplicatedKvStore;
use crate::paxos::{self, ClusterMessenger, Proposer, ReplicaId, ReplicaNode};
use crate::server::{self, GrpcConnector, RpcServer, ShutdownHandle};
use std::collections::HashSet;
use std::convert::TryFrom;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ReplicaConfig {
    pub my_replica_id: String,
    pub cluster_members: Vec<MemberInfo>,
    pub info_logger: slog::Logger,
    pub options: PaxosOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicaCreationError {
    #[error("Invalid cluster info: {0}")]
    InvalidClusterInfo(String),
    #[error("Illegal options for configuring replica: {0}")]
    IllegalOptions(String),
    #[error("my replica ID not in cluster config")]
    MeNotInCluster,
    #[error("Failed to start peer RPC server on {addr}")]
    ServerStartFailure {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Cluster registration failed: {0}")]
    RegistrationRejected(String),
}

/// PaxosReplica is one running member of the replicated store.
pub struct PaxosReplica {
    pub store: ReplicatedKvStore,
    replica_id: String,
    server_shutdown_handle: ShutdownHandle,
}

impl PaxosReplica {
    pub fn replica_id(&self) -> &str {
        &self.replica_id
    }

    /// Stop serving peers. Consensus rounds already in flight elsewhere are not affected; to the
    /// rest of the cluster this replica simply stops responding.
    pub fn stop(self) {
        self.server_shutdown_handle.shutdown();
    }
}

/// Start a replica: serve the peer RPC surface, register with every reachable configured replica,
/// then start proposing.
pub async fn try_create_replica(config: ReplicaConfig) -> Result<PaxosReplica, ReplicaCreationError> {
    let root_logger = config.info_logger;

    let options = PaxosOptionsValidated::try_from(config.options)
        .map_err(|e| ReplicaCreationError::IllegalOptions(e.to_string()))?;

    validate_unique_ids(&config.cluster_members)?;
    let my_member_info = my_info(&config.my_replica_id, &config.cluster_members)
        .ok_or_else(|| ReplicaCreationError::MeNotInCluster)?;
    let my_server_addr = peer_rpc_server_addr(my_member_info).await?;

    let majority = options
        .majority(config.cluster_members.len())
        .map_err(ReplicaCreationError::IllegalOptions)?;

    let my_replica_id = ReplicaId::new(config.my_replica_id.clone());
    let cluster_members = config
        .cluster_members
        .into_iter()
        .map(paxos::MemberInfo::from)
        .collect();

    let connector = GrpcConnector::new(root_logger.new(slog::o!("Role" => "PeerClient")), options.rpc_timeout);
    let node = Arc::new(ReplicaNode::new(
        root_logger.clone(),
        my_replica_id,
        cluster_members,
        Arc::new(connector),
    ));

    // Peers must be able to call back into us before we ask them to.
    let (server_shutdown_handle, server_shutdown_signal) = server::shutdown_signal();
    ensure_port_available(my_server_addr)?;
    let rpc_server = RpcServer::new(root_logger.new(slog::o!("Role" => "RpcServer")), node.clone());
    tokio::spawn(rpc_server.run(my_server_addr, server_shutdown_signal));
    wait_until_listening(my_server_addr).await?;

    node.membership()
        .join_cluster()
        .await
        .map_err(|e| ReplicaCreationError::RegistrationRejected(e.to_string()))?;

    let messenger = ClusterMessenger::new(
        root_logger.new(slog::o!("Role" => "Messenger")),
        node.clone(),
        majority,
        options.rpc_timeout,
    );
    let proposer = Proposer::new(
        root_logger.new(slog::o!("Role" => "Proposer")),
        node.my_replica_id().clone(),
        node.queue().clone(),
        messenger,
        options.retry_backoff_min,
        options.retry_backoff_max,
    );
    tokio::spawn(proposer.run());

    slog::info!(root_logger, "Replica started with majority {}", majority);

    Ok(PaxosReplica {
        store: ReplicatedKvStore::new(node),
        replica_id: config.my_replica_id,
        server_shutdown_handle,
    })
}

fn validate_unique_ids(cluster_members: &[MemberInfo]) -> Result<(), ReplicaCreationError> {
    let mut seen = HashSet::new();
    for member in cluster_members {
        if !seen.insert(member.replica_id.as_str()) {
            return Err(ReplicaCreationError::InvalidClusterInfo(format!(
                "Replica '{}' is configured twice",
                member.replica_id
            )));
        }
    }

    Ok(())
}

fn my_info<'a>(my_replica_id: &'_ str, cluster_members: &'a [MemberInfo]) -> Option<&'a MemberInfo> {
    cluster_members
        .iter()
        .find(|member_info| member_info.replica_id == my_replica_id)
}

async fn peer_rpc_server_addr(member_info: &MemberInfo) -> Result<SocketAddr, ReplicaCreationError> {
    let invalid = |reason: String| {
        ReplicaCreationError::InvalidClusterInfo(format!(
            "Can't resolve {}:{}: {}",
            member_info.host, member_info.peer_port, reason
        ))
    };

    let mut addrs = tokio::net::lookup_host((member_info.host.as_str(), member_info.peer_port))
        .await
        .map_err(|e| invalid(e.to_string()))?;
    addrs.next().ok_or_else(|| invalid("no addresses".to_string()))
}

// The gRPC server binds on its own task, so surface an occupied port here instead.
fn ensure_port_available(addr: SocketAddr) -> Result<(), ReplicaCreationError> {
    std::net::TcpListener::bind(addr)
        .map(|_listener| ())
        .map_err(|source| ReplicaCreationError::ServerStartFailure { addr, source })
}

async fn wait_until_listening(addr: SocketAddr) -> Result<(), ReplicaCreationError> {
    let deadline = Instant::now() + SERVER_STARTUP_TIMEOUT;
    loop {
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(e) if Instant::now() >= deadline => {
                return Err(ReplicaCreationError::ServerStartFailure { addr, source: e });
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
}

// ------- Conversions --------

impl From<MemberInfo> for paxos::MemberInfo {
    fn from(member_info: MemberInfo) -> Self {
        paxos::MemberInfo {
            replica_id: ReplicaId::new(member_info.replica_id),
            host: member_info.host,
            port: member_info.peer_port,
        }
    }
}
