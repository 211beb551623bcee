use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

mod config;
mod handler;
mod http;
mod logger;
mod routing;
mod server;

use routing::{RouteError, RouteTable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let (listener, addr, routes) = bind_service(&cfg, handler::endpoints::default_routes)?;
    logger::log_server_start(&addr, &cfg, &routes);

    let state = Arc::new(config::AppState::new(&cfg, routes));
    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    server::start_server_loop(listener, state, Arc::new(AtomicUsize::new(0)), shutdown).await?;
    Ok(())
}

/// Build the route table, then bind the listening socket.
///
/// A duplicate route is a programming error: it aborts startup before the
/// address is even parsed, so nothing is ever bound.
fn bind_service<F>(
    cfg: &config::Config,
    build_routes: F,
) -> Result<(TcpListener, SocketAddr, RouteTable), Box<dyn std::error::Error>>
where
    F: FnOnce(&config::AppConfig) -> Result<RouteTable, RouteError>,
{
    let routes = build_routes(&cfg.app)?;
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr, cfg.performance.backlog)?;
    let addr = listener.local_addr()?;
    Ok((listener, addr, routes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::single;
    use hyper::Method;

    fn test_config(host: &str) -> config::Config {
        let mut cfg = config::Config::load_from("definitely-missing-config").unwrap();
        cfg.server.host = host.to_string();
        cfg.server.port = 0;
        cfg
    }

    fn duplicate_routes(_: &config::AppConfig) -> Result<RouteTable, RouteError> {
        let mut table = RouteTable::new();
        table.register(Method::GET, "/", || single("message", "first"))?;
        table.register(Method::GET, "/", || single("message", "second"))?;
        Ok(table)
    }

    #[tokio::test]
    async fn test_bind_service_default_routes() {
        let cfg = test_config("127.0.0.1");
        let (listener, addr, routes) =
            bind_service(&cfg, handler::endpoints::default_routes).unwrap();

        assert_eq!(routes.len(), 3);
        assert_ne!(addr.port(), 0);
        assert_eq!(listener.local_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_duplicate_route_aborts_startup() {
        let cfg = test_config("127.0.0.1");
        let err = bind_service(&cfg, duplicate_routes).unwrap_err();
        assert_eq!(err.to_string(), "duplicate route: GET /");
    }

    #[tokio::test]
    async fn test_duplicate_route_checked_before_binding() {
        // An unusable host would fail at bind time; the route error must win
        let cfg = test_config("not-an-address");
        let err = bind_service(&cfg, duplicate_routes).unwrap_err();
        assert!(err.downcast_ref::<RouteError>().is_some(), "{err}");
    }
}
