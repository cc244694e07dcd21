use crate::api::KeyValueStore;
use crate::frontend::protocol;
use crate::frontend::FrontEndError;
use crate::server::ShutdownSignal;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Pause after a failed accept so a persistent failure (fd exhaustion) doesn't spin the loop.
pub(crate) const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// TcpFrontEnd serves the line protocol over TCP: newline terminated requests, one response line
/// each, for as long as the client keeps the connection open.
pub struct TcpFrontEnd {
    logger: slog::Logger,
    store: Arc<dyn KeyValueStore>,
    listener: TcpListener,
}

impl TcpFrontEnd {
    pub async fn bind(
        logger: slog::Logger,
        store: Arc<dyn KeyValueStore>,
        addr: SocketAddr,
    ) -> Result<Self, FrontEndError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| FrontEndError::Bind { addr, source })?;

        Ok(TcpFrontEnd {
            logger,
            store,
            listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, FrontEndError> {
        self.listener.local_addr().map_err(FrontEndError::Io)
    }

    /// Accept connections until `shutdown_signal` fires. Connections already accepted keep being
    /// served on their own tasks. A failed accept drops that connection only.
    pub async fn run(self, shutdown_signal: ShutdownSignal) {
        slog::info!(self.logger, "Waiting for client connections on {:?}", self.listener.local_addr());

        let listener = &self.listener;
        accept_loop(&self.logger, &self.store, move || listener.accept(), shutdown_signal).await;
    }
}

async fn accept_loop<A, F>(
    logger: &slog::Logger,
    store: &Arc<dyn KeyValueStore>,
    mut accept: A,
    mut shutdown_signal: ShutdownSignal,
) where
    A: FnMut() -> F,
    F: Future<Output = io::Result<(TcpStream, SocketAddr)>>,
{
    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                slog::info!(logger, "Exiting.");
                return;
            }
            accepted = accept() => {
                match accepted {
                    Ok((stream, client_addr)) => {
                        let logger = logger.new(slog::o!("Client" => client_addr.to_string()));
                        slog::info!(logger, "Accepted connection");
                        tokio::spawn(serve_connection(logger, store.clone(), stream));
                    }
                    Err(e) => {
                        slog::warn!(logger, "Failed to accept a client. Dropping connection: {}", e);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                }
            }
        }
    }
}

async fn serve_connection(logger: slog::Logger, store: Arc<dyn KeyValueStore>, stream: TcpStream) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                slog::info!(logger, "Client closed the session.");
                return;
            }
            Err(e) => {
                slog::warn!(logger, "IO failure while servicing client. Dropping connection: {}", e);
                return;
            }
        };

        slog::debug!(logger, "Received '{}'", line);
        let response = protocol::handle_request_line(&logger, store.as_ref(), &line).await;

        if let Err(e) = writer.write_all(format!("{}\n", response).as_bytes()).await {
            slog::warn!(logger, "IO failure while responding. Dropping connection: {}", e);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::protocol::tests::MapStore;
    use crate::server::shutdown_signal;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    #[tokio::test]
    async fn serves_a_session() {
        let front_end = TcpFrontEnd::bind(logger(), Arc::new(MapStore::default()), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = front_end.local_addr().unwrap();
        let (shutdown_handle, shutdown_signal) = shutdown_signal();
        let server = tokio::spawn(front_end.run(shutdown_signal));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut responses = BufReader::new(reader).lines();

        let session = vec![
            ("PUT a 1", "PUT a 1"),
            ("GET a", "GET KEY: a VAL: 1"),
            ("GET b", "GET KEY: b VAL: [NULL]"),
            ("DEL a", "DEL a"),
            ("GET a", "GET KEY: a VAL: [NULL]"),
            ("PUT only-key", "ERROR"),
            ("PUT k abcdefghijklmnopqrstuvwxyz", "ERROR"),
        ];
        for (request, expected) in session {
            writer.write_all(format!("{}\n", request).as_bytes()).await.unwrap();
            let response = responses.next_line().await.unwrap().unwrap();
            assert_eq!(response, expected, "response to '{}'", request);
        }

        shutdown_handle.shutdown();
        server.await.unwrap();
    }

    type AcceptFuture<'a> = Pin<Box<dyn Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send + 'a>>;

    /// Fails with "too many open files" while `failures` is positive, then accepts for real.
    fn accept_after_failures<'a>(listener: &'a TcpListener, failures: &'a AtomicUsize) -> AcceptFuture<'a> {
        if failures.load(Ordering::SeqCst) > 0 {
            failures.fetch_sub(1, Ordering::SeqCst);
            Box::pin(async { Err(io::Error::from_raw_os_error(24)) })
        } else {
            Box::pin(listener.accept())
        }
    }

    #[tokio::test]
    async fn keeps_accepting_after_accept_failures() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let failures = Arc::new(AtomicUsize::new(3));
        let (shutdown_handle, shutdown_signal) = shutdown_signal();

        let server_failures = failures.clone();
        let server = tokio::spawn(async move {
            let store: Arc<dyn KeyValueStore> = Arc::new(MapStore::default());
            accept_loop(
                &logger(),
                &store,
                || accept_after_failures(&listener, &server_failures),
                shutdown_signal,
            )
            .await;
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut responses = BufReader::new(reader).lines();
        writer.write_all(b"PUT a 1\n").await.unwrap();
        let response = tokio::time::timeout(Duration::from_secs(2), responses.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.as_deref(), Some("PUT a 1"));
        assert_eq!(failures.load(Ordering::SeqCst), 0);

        shutdown_handle.shutdown();
        server.await.unwrap();
    }
}
