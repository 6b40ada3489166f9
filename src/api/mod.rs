//! HTTP API for Game Runner using Actix Web.
//!
//! This module exposes the lifecycle controller to a management panel as a
//! small JSON API. All routes except the health check require a bearer token
//! when one is configured.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/health` | liveness, no token |
//! | GET | `/api/servers` | list servers |
//! | POST | `/api/servers` | create a server |
//! | POST | `/api/servers/start` | start a server |
//! | POST | `/api/servers/stop` | stop a server |
//! | POST | `/api/servers/uninstall` | uninstall a server |
//! | GET | `/api/templates` | list template variants |

pub use self::auth::{Authentication, StaticTokenValidator, TokenValidator};
pub use self::error::json_config;
pub use self::server::{ApiHandle, start_api};

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

use actix_web::web;

/// Register every API route
///
/// Handlers expect a `Data<GameRunner>` in the app data; pair this with
/// [`json_config`] so malformed bodies are reported the same way as other
/// validation errors.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/servers", web::get().to(handlers::list_servers))
            .route("/servers", web::post().to(handlers::create_server))
            .route("/servers/start", web::post().to(handlers::start_server))
            .route("/servers/stop", web::post().to(handlers::stop_server))
            .route("/servers/uninstall", web::post().to(handlers::uninstall_server))
            .route("/templates", web::get().to(handlers::list_templates)),
    );
}
