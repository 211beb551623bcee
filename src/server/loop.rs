// Server loop module
// Accepts connections until shutdown is requested, then drains them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop.
///
/// Once `shutdown` is notified the listener is closed and every open
/// connection is asked to finish. The call returns when all of them are done,
/// or after `write_timeout` seconds, whichever comes first.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) -> std::io::Result<()> {
    let mut tasks = JoinSet::new();
    let (drain_tx, drain_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            &mut tasks,
                            drain_rx.clone(),
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    logger::log_error(&format!("Connection task failed: {e}"));
                }
            }

            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));
    drain_tx.send_replace(true);

    let deadline = Duration::from_secs(state.config.performance.write_timeout);
    let drained = tokio::time::timeout(deadline, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        logger::log_warning(&format!(
            "{} connection(s) did not finish within {} seconds, aborting",
            tasks.len(),
            deadline.as_secs()
        ));
        tasks.shutdown().await;
    }
    logger::log_info("Shutdown complete");
    Ok(())
}
