//! Local web UI: one HTML page plus a JSON API.

mod api;
mod markdown;
mod page;
mod router;

pub use api::{ApiRequest, Method};
pub use router::{ApiResponse, App};

use crate::config::Config;
use crate::session::SessionStore;
use anyhow::{Context, Result, anyhow};
use std::io::Read;
use std::sync::Arc;
use tiny_http::{Header, Response, Server, StatusCode};
use tracing::{debug, info, warn};

impl ApiResponse {
    fn into_tiny(self) -> Response<std::io::Cursor<Vec<u8>>> {
        let mut response =
            Response::from_data(self.body).with_status_code(StatusCode(self.status));
        if let Ok(header) = Header::from_bytes("Content-Type", self.content_type) {
            response.add_header(header);
        }
        if let Some(name) = self.attachment {
            let value = format!("attachment; filename=\"{name}\"");
            if let Ok(header) = Header::from_bytes("Content-Disposition", value.as_bytes()) {
                response.add_header(header);
            }
        }
        response
    }
}

/// Read the body, refusing anything over `limit` bytes.
fn read_body(request: &mut tiny_http::Request, limit: usize) -> std::io::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)?;
    Ok((body.len() <= limit).then_some(body))
}

/// Serve the UI on `config.bind` until Ctrl-C.
///
/// Requests are handled one at a time against a single application state.
pub async fn serve(config: Config) -> Result<()> {
    let store = SessionStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open session directory {}", config.data_dir.display()))?;
    let server = Arc::new(
        Server::http(&config.bind).map_err(|e| anyhow!("Failed to bind {}: {e}", config.bind))?,
    );
    info!("NXGENIE listening on http://{}", config.bind);

    let shutdown = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            shutdown.unblock();
        }
    });

    let max_body = config.max_body_bytes;
    let mut app = App::new(config, store);
    let handle = tokio::runtime::Handle::current();

    tokio::task::spawn_blocking(move || {
        for mut request in server.incoming_requests() {
            let method = Method::from(request.method());
            let path = request.url().to_string();
            debug!(method = ?method, path = %path, "Request");

            let response = match read_body(&mut request, max_body) {
                Ok(Some(body)) => handle.block_on(app.handle(ApiRequest { method, path, body })),
                Ok(None) => ApiResponse::error(413, "Request body too large"),
                Err(e) => ApiResponse::error(400, &format!("Failed to read request body: {e}")),
            };

            if let Err(e) = request.respond(response.into_tiny()) {
                warn!("Failed to send response: {e}");
            }
        }
    })
    .await
    .context("Server loop panicked")?;

    Ok(())
}
