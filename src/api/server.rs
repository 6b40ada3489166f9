//! HTTP server startup and its control handle.

use crate::GameRunner;
use crate::api::{Authentication, configure, json_config};
use crate::config::{DEFAULT_WORKERS, HttpConfig};
use crate::error::{Error, Result};

use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::ServerHandle, middleware, web::Data};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Handle for controlling the running HTTP API
pub struct ApiHandle {
    /// Actix server handle, used to stop it
    server: ServerHandle,
    /// Server task handle
    task: Mutex<Option<JoinHandle<()>>>,
    /// Addresses the server is bound to
    addrs: Vec<SocketAddr>,
}

impl ApiHandle {
    /// Addresses the server is listening on
    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(&self) -> Result<()> {
        self.server.stop(true).await;

        let mut task = self.task.lock().await;
        if let Some(task) = task.take() {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(Err(e)) => tracing::warn!("Error while joining API task: {}", e),
                Ok(Ok(())) => {}
                Err(_) => tracing::warn!("Timeout waiting for API task to finish"),
            }
        }

        tracing::info!("HTTP API stopped");
        Ok(())
    }
}

/// Bind the HTTP API and serve it in a background task
pub fn start_api(runner: GameRunner, config: &HttpConfig) -> Result<ApiHandle> {
    let addr_str = format!("{}:{}", config.address, config.port);
    let addr = addr_str
        .to_socket_addrs()
        .map_err(|e| Error::Other(format!("Failed to parse socket address: {}", e)))?
        .next()
        .ok_or_else(|| Error::Other(format!("Could not parse socket address: {}", addr_str)))?;

    if config.bearer_token().is_none() {
        tracing::warn!("No bearer token configured; the API is unauthenticated");
    }

    let runner = Data::new(runner);
    let auth = Authentication::from_config(config);

    let workers = config.workers.unwrap_or(DEFAULT_WORKERS);
    tracing::info!(address = %addr_str, workers, "Starting HTTP API");

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(auth.clone())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(runner.clone())
            .app_data(json_config())
            .configure(configure)
    })
    .workers(workers)
    .disable_signals()
    .bind(addr)
    .map_err(|e| Error::Other(format!("Failed to bind server: {}", e)))?;

    let addrs = server.addrs();
    let server = server.run();
    let handle = server.handle();

    let task = tokio::spawn(async move {
        if let Err(e) = server.await {
            tracing::error!(error = %e, "HTTP API server error");
        }
    });

    tracing::info!(addrs = ?addrs, "HTTP API started");
    Ok(ApiHandle {
        server: handle,
        task: Mutex::new(Some(task)),
        addrs,
    })
}
