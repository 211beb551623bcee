//! Endpoint handlers and the default route table

use hyper::Method;
use rand::Rng;

use crate::config::AppConfig;
use crate::http::{single, ResultMapping};
use crate::routing::{RouteError, RouteTable};

pub const RANDOM_MIN: i64 = 1;
pub const RANDOM_MAX: i64 = 100;

/// `GET /`
pub fn welcome(message: &str) -> ResultMapping {
    single("message", message)
}

/// `GET /health`
pub fn health() -> ResultMapping {
    single("status", "healthy")
}

/// `GET /random`, uniform over `[RANDOM_MIN, RANDOM_MAX]`
pub fn random_number() -> ResultMapping {
    let value = rand::thread_rng().gen_range(RANDOM_MIN..=RANDOM_MAX);
    single("random_number", value)
}

/// Build the service's route table
pub fn default_routes(app: &AppConfig) -> Result<RouteTable, RouteError> {
    let message = app.welcome_message.clone();

    let mut table = RouteTable::new();
    table.register(Method::GET, "/", move || welcome(&message))?;
    table.register(Method::GET, "/health", health)?;
    table.register(Method::GET, "/random", random_number)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::Scalar;

    fn app_config() -> AppConfig {
        AppConfig {
            title: "Simple FastAPI App".to_string(),
            welcome_message: "Welcome to Simple FastAPI App".to_string(),
        }
    }

    fn random_value() -> i64 {
        match random_number().get("random_number") {
            Some(Scalar::Int(v)) => *v,
            other => panic!("unexpected random_number value: {other:?}"),
        }
    }

    #[test]
    fn test_welcome() {
        let result = welcome("hello");
        assert_eq!(result.len(), 1);
        assert_eq!(result["message"], Scalar::from("hello"));
    }

    #[test]
    fn test_health_is_stable() {
        let first = health();
        assert_eq!(first["status"], Scalar::from("healthy"));
        for _ in 0..100 {
            assert_eq!(health(), first);
        }
    }

    #[test]
    fn test_random_number_in_range() {
        for _ in 0..10_000 {
            let v = random_value();
            assert!((RANDOM_MIN..=RANDOM_MAX).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn test_random_number_covers_range() {
        let mut seen = [false; 100];
        for _ in 0..10_000 {
            let v = random_value();
            seen[usize::try_from(v - RANDOM_MIN).unwrap()] = true;
        }
        let missing: Vec<usize> = (0..100).filter(|&i| !seen[i]).map(|i| i + 1).collect();
        assert!(missing.is_empty(), "never drawn: {missing:?}");
    }

    #[test]
    fn test_default_routes() {
        let table = default_routes(&app_config()).unwrap();
        assert_eq!(table.len(), 3);

        let root = table.lookup(&Method::GET, "/").unwrap().call();
        assert_eq!(root, welcome("Welcome to Simple FastAPI App"));
        assert_eq!(table.lookup(&Method::GET, "/health").unwrap().call(), health());
        assert!(table.lookup(&Method::GET, "/random").is_ok());
    }

    #[test]
    fn test_default_routes_use_configured_message() {
        let mut app = app_config();
        app.welcome_message = "Hi there".to_string();

        let table = default_routes(&app).unwrap();
        let root = table.lookup(&Method::GET, "/").unwrap().call();
        assert_eq!(root["message"], Scalar::from("Hi there"));
    }
}
