//! This mod is meant to hold most of the code for the library's client-facing API.
mod configuration;
mod logging;
mod options;
mod store;
mod wiring;

pub use configuration::ClusterConfig;
pub use configuration::ConfigError;
pub use configuration::MemberInfo;
pub use configuration::DEFAULT_PEER_PORT;
pub use logging::create_root_logger_for_file;
pub use logging::create_root_logger_for_stdout;
pub use options::PaxosOptions;
pub use store::KeyValueStore;
pub use store::ReplicatedKvStore;
pub use store::StoreError;
pub use wiring::try_create_replica;
pub use wiring::PaxosReplica;
pub use wiring::ReplicaCreationError;
pub use wiring::ReplicaConfig;
