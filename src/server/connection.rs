// Connection handling module
// Accepts a single TCP connection and serves it over HTTP/1.1

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept and process a connection, checking limits and logging.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
/// * `tasks` - Set the connection task is spawned into, drained on shutdown
/// * `drain` - Flips to `true` when the server stops accepting
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
    tasks: &mut JoinSet<()>,
    drain: watch::Receiver<bool>,
) {
    // Increment first, then check, so concurrent accepts cannot overshoot
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    let state = Arc::clone(state);
    let conn_counter = Arc::clone(conn_counter);
    tasks.spawn(async move {
        serve_connection(stream, peer_addr, state, drain).await;
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Serve one connection until the client closes it or it is told to close.
///
/// The connection is asked to close gracefully once it has been open for
/// `keep_alive_timeout` seconds (`read_timeout` when keep-alive is off) or when
/// `drain` fires. A request already in progress then gets `write_timeout`
/// seconds to complete; idle connections close immediately.
async fn serve_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<AppState>,
    mut drain: watch::Receiver<bool>,
) {
    let performance = &state.config.performance;
    let keep_alive = performance.keep_alive_timeout > 0;
    let max_age = Duration::from_secs(if keep_alive {
        performance.keep_alive_timeout
    } else {
        performance.read_timeout
    });
    let grace = Duration::from_secs(performance.write_timeout);

    let mut builder = http1::Builder::new();
    builder
        .keep_alive(keep_alive)
        .timer(TokioTimer::new())
        .header_read_timeout(Duration::from_secs(performance.read_timeout));

    let service_state = Arc::clone(&state);
    let conn = builder.serve_connection(
        TokioIo::new(stream),
        service_fn(move |req| handler::handle_request(req, peer_addr, Arc::clone(&service_state))),
    );
    let mut conn = std::pin::pin!(conn);

    let finished = tokio::select! {
        result = conn.as_mut() => Some(result),
        () = tokio::time::sleep(max_age) => None,
        _ = drain.wait_for(|stop| *stop) => None,
    };

    let result = match finished {
        Some(result) => result,
        None => {
            conn.as_mut().graceful_shutdown();
            if let Ok(result) = tokio::time::timeout(grace, conn.as_mut()).await {
                result
            } else {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} still busy after {} seconds, closing",
                    grace.as_secs()
                ));
                return;
            }
        }
    };

    if let Err(err) = result {
        logger::log_connection_error(&err);
    }
}
