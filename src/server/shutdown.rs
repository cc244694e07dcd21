use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Create a linked pair: the signal resolves once the handle is shut down or dropped.
///
/// Used to stop the peer gRPC server and the client front ends. Neither reaches into consensus.
pub fn shutdown_signal() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

pub struct ShutdownHandle {
    tx: oneshot::Sender<()>,
}

impl ShutdownHandle {
    pub fn shutdown(self) {
        // Receiver already gone means whatever it guarded has already stopped.
        let _ = self.tx.send(());
    }
}

pub struct ShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let rx = Pin::new(&mut self.rx);

        match rx.poll(cx) {
            Poll::Pending => Poll::Pending,
            // We don't care if oneshot Sender sent value or dropped
            Poll::Ready(_) => Poll::Ready(()),
        }
    }
}
