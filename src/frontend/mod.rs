mod client;
mod protocol;
mod tcp;
mod udp;

use std::io;
use std::net::SocketAddr;

pub use client::{parse_command, ClientError, KvClient, RESPONSE_TIMEOUT};
pub use protocol::{FrontEndProtocol, ProtocolError, Request, Response, MAX_TOKEN_LENGTH};
pub use tcp::TcpFrontEnd;
pub use udp::UdpFrontEnd;

#[derive(Debug, thiserror::Error)]
pub enum FrontEndError {
    #[error("Failed to bind front end to {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Front end socket failure")]
    Io(#[source] io::Error),
}
