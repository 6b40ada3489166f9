//! HTTP request handlers for the Game Runner API.
//!
//! Each handler unwraps its JSON body, calls into the [`GameRunner`] and
//! answers with a `success` envelope. Errors become responses through the
//! `ResponseError` impl in `api::error`.

use crate::error::{Error, Result};
use crate::{CreateServerRequest, GameRunner};

use actix_web::{
    HttpResponse,
    web::{Data, Json},
};
use serde::Deserialize;
use serde_json::json;

/// Body of the start, stop and uninstall requests
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerNameRequest {
    /// Target server name
    pub server_name: Option<String>,
}

impl ServerNameRequest {
    fn into_name(self) -> Result<String> {
        self.server_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Validation("serverName is required".to_string()))
    }
}

/// Liveness check, reachable without a token
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// List every managed server
pub async fn list_servers(runner: Data<GameRunner>) -> HttpResponse {
    let servers = runner.list_servers().await;
    HttpResponse::Ok().json(json!({
        "success": true,
        "servers": servers,
    }))
}

/// Create a server; installation continues in the background
pub async fn create_server(
    runner: Data<GameRunner>,
    body: Json<CreateServerRequest>,
) -> Result<HttpResponse> {
    let server = runner.create_server(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "server": server,
    })))
}

/// Start a server
pub async fn start_server(
    runner: Data<GameRunner>,
    body: Json<ServerNameRequest>,
) -> Result<HttpResponse> {
    let name = body.into_inner().into_name()?;
    runner.start_server(&name).await?;
    Ok(success())
}

/// Stop a server; may take the whole graceful stop window
pub async fn stop_server(
    runner: Data<GameRunner>,
    body: Json<ServerNameRequest>,
) -> Result<HttpResponse> {
    let name = body.into_inner().into_name()?;
    runner.stop_server(&name).await?;
    Ok(success())
}

/// Uninstall a server
pub async fn uninstall_server(
    runner: Data<GameRunner>,
    body: Json<ServerNameRequest>,
) -> Result<HttpResponse> {
    let name = body.into_inner().into_name()?;
    runner.uninstall_server(&name).await?;
    Ok(success())
}

/// List the registered template variants
pub async fn list_templates(runner: Data<GameRunner>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "templates": runner.list_templates(),
    }))
}

fn success() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true }))
}
