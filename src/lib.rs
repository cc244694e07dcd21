mod api;
mod frontend;
mod paxos;
mod server;
mod grpc {
    include!("../generated/paxos.rs");
}

pub use api::create_root_logger_for_file;
pub use api::create_root_logger_for_stdout;
pub use api::try_create_replica;
pub use api::ClusterConfig;
pub use api::ConfigError;
pub use api::KeyValueStore;
pub use api::MemberInfo;
pub use api::PaxosOptions;
pub use api::PaxosReplica;
pub use api::ReplicaConfig;
pub use api::ReplicaCreationError;
pub use api::ReplicatedKvStore;
pub use api::StoreError;
pub use api::DEFAULT_PEER_PORT;
pub use frontend::parse_command;
pub use frontend::ClientError;
pub use frontend::FrontEndError;
pub use frontend::FrontEndProtocol;
pub use frontend::KvClient;
pub use frontend::ProtocolError;
pub use frontend::Request;
pub use frontend::Response;
pub use frontend::TcpFrontEnd;
pub use frontend::UdpFrontEnd;
pub use frontend::MAX_TOKEN_LENGTH;
pub use frontend::RESPONSE_TIMEOUT;
pub use server::shutdown_signal;
pub use server::ShutdownHandle;
pub use server::ShutdownSignal;

// The crate root only declares private `mod`s and re-exports the public surface with `pub use`.
