use crate::api::KeyValueStore;
use crate::frontend::protocol;
use crate::frontend::tcp::ACCEPT_RETRY_DELAY;
use crate::frontend::FrontEndError;
use crate::server::ShutdownSignal;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

pub(crate) const DATAGRAM_BUFFER_SIZE: usize = 128;

/// UdpFrontEnd serves the line protocol over UDP: one request per datagram, one response datagram
/// back to the sender.
pub struct UdpFrontEnd {
    logger: slog::Logger,
    store: Arc<dyn KeyValueStore>,
    socket: Arc<UdpSocket>,
}

impl UdpFrontEnd {
    pub async fn bind(
        logger: slog::Logger,
        store: Arc<dyn KeyValueStore>,
        addr: SocketAddr,
    ) -> Result<Self, FrontEndError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| FrontEndError::Bind { addr, source })?;

        Ok(UdpFrontEnd {
            logger,
            store,
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, FrontEndError> {
        self.socket.local_addr().map_err(FrontEndError::Io)
    }

    /// Serve datagrams until `shutdown_signal` fires. Each request is handled on its own task so
    /// a write waiting on consensus does not hold up reads. A failed receive is logged and skipped.
    pub async fn run(self, shutdown_signal: ShutdownSignal) {
        slog::info!(self.logger, "Waiting for client packets on {:?}", self.socket.local_addr());

        let socket = self.socket.as_ref();
        receive_loop(
            &self.logger,
            &self.store,
            &self.socket,
            move || receive_request(socket),
            shutdown_signal,
        )
        .await;
    }
}

async fn receive_request(socket: &UdpSocket) -> io::Result<(String, SocketAddr)> {
    let mut buf = [0u8; DATAGRAM_BUFFER_SIZE];
    let (len, client_addr) = socket.recv_from(&mut buf).await?;
    Ok((String::from_utf8_lossy(&buf[..len]).trim().to_string(), client_addr))
}

async fn receive_loop<R, F>(
    logger: &slog::Logger,
    store: &Arc<dyn KeyValueStore>,
    socket: &Arc<UdpSocket>,
    mut receive: R,
    mut shutdown_signal: ShutdownSignal,
) where
    R: FnMut() -> F,
    F: Future<Output = io::Result<(String, SocketAddr)>>,
{
    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                slog::info!(logger, "Exiting.");
                return;
            }
            received = receive() => {
                match received {
                    Ok((request, client_addr)) => {
                        let logger = logger.new(slog::o!("Client" => client_addr.to_string()));
                        tokio::spawn(serve_datagram(logger, store.clone(), socket.clone(), request, client_addr));
                    }
                    Err(e) => {
                        slog::warn!(logger, "Failed to receive a client packet. Dropping it: {}", e);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                }
            }
        }
    }
}

async fn serve_datagram(
    logger: slog::Logger,
    store: Arc<dyn KeyValueStore>,
    socket: Arc<UdpSocket>,
    request: String,
    client_addr: SocketAddr,
) {
    slog::debug!(logger, "Received '{}'", request);
    let response = protocol::handle_request_line(&logger, store.as_ref(), &request).await;

    if let Err(e) = socket.send_to(response.to_string().as_bytes(), client_addr).await {
        slog::warn!(logger, "IO failure while responding: {}", e);
    }
}
