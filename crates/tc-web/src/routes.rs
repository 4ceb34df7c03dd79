use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::handlers::{self, AppState};

/// Register every API route
pub fn configure(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/health", web::get().to(handlers::health))
    .service(
      web::scope("/api")
        .route("/crypto-data", web::get().to(handlers::crypto_data))
        .route("/refresh", web::get().to(handlers::refresh))
        .route("/refresh", web::post().to(handlers::refresh))
        .route("/last-update", web::get().to(handlers::last_update))
        .route("/coins/{coin_id}/history", web::get().to(handlers::coin_history)),
    );
}

/// Serve the API until the server is stopped
pub async fn start_server(state: AppState, bind_addr: &str) -> std::io::Result<()> {
  let data = web::Data::new(state);
  let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
    .bind(bind_addr)?;

  info!("Dashboard API listening on http://{}", bind_addr);
  server.run().await
}
