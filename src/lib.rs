//! # regctl: Registry Control Layer
//!
//! `regctl` is the tenant lifecycle service of a multi-tenant registry
//! platform. It owns the project abstraction: a named, access-controlled
//! namespace that groups repositories, holds free-form metadata, and is
//! bounded by a storage quota. The crate exposes a RESTful API for creating,
//! inspecting, updating, listing and deleting projects, together with
//! derived read models such as the per-project resource summary.
//!
//! ## Overview
//!
//! The service sits behind an authenticating proxy. The proxy resolves
//! credentials and forwards the principal's identity in trusted headers;
//! `regctl` turns those headers into a [`auth::Principal`] and makes every
//! authorization decision locally, against project membership roles held in
//! PostgreSQL. Three principal shapes exist: anonymous callers (who may at
//! most read public projects), ordinary users (whose visibility is the union
//! of public projects and their memberships), and the solution identity, a
//! trusted system-integration caller authenticated by a shared secret.
//!
//! Subordinate resources (repositories, helm charts, quota accounting) are
//! owned by sibling services. `regctl` consumes them through narrow traits
//! ([`db::handlers::ArtifactCounter`], [`quota::QuotaEngine`],
//! [`events::EventPublisher`]) so the lifecycle rules stay testable without
//! the rest of the platform.
//!
//! ### Request Flow
//!
//! A request hits the Axum router, the [`auth::Principal`] extractor reads
//! the identity headers, and the handler builds a request-scoped
//! [`project::controller::ProjectLifecycleController`] from the shared
//! [`AppState`]. The controller sequences the operation: resolve the target
//! project, consult the [`auth::gate::AccessGate`], validate input, persist
//! through the [`db::handlers::ProjectStore`], keep the quota reference in
//! step, and publish a lifecycle event.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use regctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = regctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     regctl::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod project;
pub mod quota;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod test;

use crate::auth::policy::{PolicyEvaluator, RoleMatrixPolicy};
use crate::db::handlers::{ArtifactCounter, MemberDirectory, PgArtifacts, PgMembers, PgProjects, PgQuotas, ProjectStore};
use crate::events::{EventPublisher, TracingEventPublisher};
use crate::quota::QuotaEngine;
use axum::{
    Json, Router,
    http::{HeaderName, header},
    routing::get,
};
use bon::Builder;
pub use config::Config;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info};
use utoipa::OpenApi;

pub use types::{ProjectId, QuotaId};

/// Application state shared across all request handlers.
///
/// Collaborators are held as trait objects so tests can swap in in-memory
/// fakes; production wiring in [`Application::new`] backs them with
/// PostgreSQL.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub projects: Arc<dyn ProjectStore>,
    pub members: Arc<dyn MemberDirectory>,
    pub artifacts: Arc<dyn ArtifactCounter>,
    pub quotas: Arc<dyn QuotaEngine>,
    pub events: Arc<dyn EventPublisher>,
    pub policy: Arc<dyn PolicyEvaluator>,
}

/// Get the regctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// OpenAPI document for the project API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "regctl",
        description = "Tenant project lifecycle API for a multi-tenant registry platform"
    ),
    paths(
        api::handlers::projects::create_project,
        api::handlers::projects::head_project,
        api::handlers::projects::get_project,
        api::handlers::projects::update_project,
        api::handlers::projects::delete_project,
        api::handlers::projects::project_deletable,
        api::handlers::projects::project_summary,
        api::handlers::projects::list_projects,
    ),
    tags((name = "projects", description = "Project lifecycle operations"))
)]
pub struct ApiDoc;

/// Build the application router with all endpoints and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/projects",
            get(api::handlers::projects::list_projects)
                .head(api::handlers::projects::head_project)
                .post(api::handlers::projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(api::handlers::projects::get_project)
                .put(api::handlers::projects::update_project)
                .delete(api::handlers::projects::delete_project),
        )
        .route("/projects/{id}/_deletable", get(api::handlers::projects::project_deletable))
        .route("/projects/{id}/summary", get(api::handlers::projects::project_summary))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state);

    // The proxy in front of the service strips origin restrictions;
    // Location and the list total must stay visible to browser clients.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(vec![header::LOCATION, HeaderName::from_static("x-total-count")]);

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Main application struct that owns all resources and lifecycle.
///
/// 1. **Create**: [`Application::new`] connects to PostgreSQL, runs
///    migrations, and wires the collaborator implementations
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
    pool: sqlx::PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting registry control layer with configuration: {:#?}", config);

        let database_url = config.database_url.clone().unwrap_or_else(|| config.database.url.clone());
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&database_url)
            .await?;

        migrator().run(&pool).await?;

        let members: Arc<dyn MemberDirectory> = Arc::new(PgMembers::new(pool.clone()));
        let state = AppState::builder()
            .config(config.clone())
            .projects(Arc::new(PgProjects::new(pool.clone())))
            .members(members.clone())
            .artifacts(Arc::new(PgArtifacts::new(pool.clone())))
            .quotas(Arc::new(PgQuotas::new(pool.clone())))
            .events(Arc::new(TracingEventPublisher))
            .policy(Arc::new(RoleMatrixPolicy::new(members)))
            .build();

        let router = build_router(state);

        Ok(Self { router, config, pool })
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Registry control layer listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
