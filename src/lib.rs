pub mod api;
pub mod config;
pub mod services;
pub mod utils;

use crate::config::AnalyzerConfig;
use crate::services::analysis::{AnalysisSettings, DeepfakeAnalyzer};
use crate::services::classifier::FakeClassifier;
use crate::services::decoder::FfmpegFrameSource;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::analyze::analyze_video,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::analyze::AnalyzeForm,
            api::handlers::health::HealthResponse,
            api::error::ErrorResponse,
            services::aggregator::Verdict,
            services::aggregator::VerdictStatus,
            services::aggregator::FrameScore,
        )
    ),
    tags(
        (name = "analysis", description = "Deepfake video analysis"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<DeepfakeAnalyzer>,
    pub config: AnalyzerConfig,
}

impl AppState {
    /// Wire the ffmpeg-backed decoder and the given classifier together
    pub fn new(config: AnalyzerConfig, classifier: Arc<dyn FakeClassifier>) -> Self {
        let source = Arc::new(FfmpegFrameSource::new(
            config.ffmpeg_bin.clone(),
            config.ffprobe_bin.clone(),
        ));
        let analyzer = DeepfakeAnalyzer::new(source, classifier, AnalysisSettings::from(&config));
        Self {
            analyzer: Arc::new(analyzer),
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/analyze",
            post(api::handlers::analyze::analyze_video).layer(DefaultBodyLimit::max(
                state.config.max_upload_size + 10 * 1024 * 1024, // Add 10MB buffer for multipart overhead
            )),
        )
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
