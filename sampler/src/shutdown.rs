//! Process signals to a `CancellationToken`.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `cancel` once `signal` resolves. A handler that could not be
/// registered is logged and leaves the token alone.
pub async fn cancel_on_signal<F>(name: &'static str, signal: F, cancel: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!(signal = name, "received signal, shutting down");
            cancel.cancel();
        }
        Err(e) => warn!(signal = name, error = %e, "failed to register signal handler"),
    }
}

/// SIGINT everywhere, SIGTERM on unix.
pub fn setup_signal_handlers() -> CancellationToken {
    let cancel = CancellationToken::new();

    tokio::spawn(cancel_on_signal(
        "SIGINT",
        tokio::signal::ctrl_c(),
        cancel.clone(),
    ));

    #[cfg(unix)]
    tokio::spawn(cancel_on_signal(
        "SIGTERM",
        async {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sig = signal(SignalKind::terminate())?;
            sig.recv().await;
            Ok::<(), std::io::Error>(())
        },
        cancel.clone(),
    ));

    cancel
}
