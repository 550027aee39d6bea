use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod campaigns;
pub mod dashboard;
pub mod health;
pub mod leads;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new().route("/me", get(auth::me));

    let campaigns_routes = Router::new()
        .route(
            "/",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route("/:id", get(campaigns::get_campaign))
        .route("/:id/summary", get(campaigns::get_campaign_summary))
        .route("/:id/settings", patch(campaigns::update_campaign_settings))
        .route("/:id/sequence", patch(campaigns::update_campaign_sequence))
        .route(
            "/:id/sequence/preview",
            post(campaigns::preview_campaign_sequence),
        )
        .route("/:id/leads", get(campaigns::list_campaign_leads));

    let leads_routes = Router::new()
        .route("/", get(leads::list_leads).post(leads::create_lead))
        .route("/:id", get(leads::get_lead))
        .route("/:id/stages", post(leads::advance_lead_stage))
        .route("/:id/status", patch(leads::update_lead_status));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/campaigns", campaigns_routes)
        .nest("/api/leads", leads_routes)
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
