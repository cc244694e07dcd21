mod peer_client;
mod server;
mod shutdown;
mod wire;

pub(crate) use peer_client::GrpcConnector;
pub(crate) use server::RpcServer;
pub use shutdown::shutdown_signal;
pub use shutdown::ShutdownHandle;
pub use shutdown::ShutdownSignal;
