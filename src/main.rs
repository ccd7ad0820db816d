use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use safety_checker::config::ServiceConfig;
use safety_checker::routes::build_routes;
use safety_checker::{AppState, ClipSafetyModel, SafetyChecker, logging};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = ServiceConfig::from_env();
    log::info!("Safety checker starting (max image dimension {})", config.max_image_dimension);

    // The model and concept set are fully loaded before the listener exists,
    // so no request can observe a partially initialized checker.
    let started = Instant::now();
    let source = config.model.clone();
    let model = tokio::task::spawn_blocking(move || ClipSafetyModel::load(&source)).await??;
    log::info!(
        "Model ready on {:?} after {:.1}s",
        model.device(),
        started.elapsed().as_secs_f64()
    );

    let state = Arc::new(AppState {
        checker: SafetyChecker::new(Arc::new(model), config.max_image_dimension),
    });

    let app = build_routes(state, config.max_request_bytes);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
