//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use twilio::{TwilioOptions, TwilioService};

use crate::common::utils::{
    GoogleTranslateClient, NoopPushNotificationService, NoopTranslationService, OneSignalClient,
};
use crate::config::Config;
use crate::domains::auth::JwtService;
use crate::kernel::{
    BasePushNotificationService, BaseTranslationService, ChannelDispatchQueue, DispatchWorker,
    Dispatcher, PostgresStore, ServerDeps, TwilioAdapter,
};
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    create_recruits_handler, health_handler, list_messages_handler, list_recruits_handler,
    mark_read_handler, send_message_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: Arc<ServerDeps>,
    /// Present when backed by Postgres; used for pool stats
    pub db_pool: Option<PgPool>,
}

/// Build the Axum router around already-constructed dependencies
pub fn build_router(state: AppState) -> Router {
    let jwt_service = state.deps.jwt_service.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/recruits",
            post(create_recruits_handler).get(list_recruits_handler),
        )
        .route(
            "/messages",
            post(send_message_handler).get(list_messages_handler),
        )
        .route("/messages/:id/read", post(mark_read_handler))
        .layer(middleware::from_fn(move |request, next| {
            jwt_auth_middleware(jwt_service.clone(), request, next)
        }))
        .layer(Extension(state))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the production application
///
/// Returns the router and the dispatch worker; the caller spawns the worker.
pub fn build_app(config: &Config, pool: PgPool) -> (Router, DispatchWorker) {
    let store = Arc::new(PostgresStore::new(pool.clone()));

    let twilio = Arc::new(TwilioService::new(TwilioOptions {
        account_sid: config.twilio_account_sid.clone(),
        auth_token: config.twilio_auth_token.clone(),
    }));

    let push_service: Arc<dyn BasePushNotificationService> =
        match (&config.onesignal_app_id, &config.onesignal_api_key) {
            (Some(app_id), Some(api_key)) => {
                Arc::new(OneSignalClient::new(app_id.clone(), api_key.clone()))
            }
            _ => {
                tracing::warn!("OneSignal not configured, push notifications disabled");
                Arc::new(NoopPushNotificationService)
            }
        };

    let translator: Arc<dyn BaseTranslationService> = match &config.google_translate_api_key {
        Some(key) => Arc::new(GoogleTranslateClient::new(key.clone())),
        None => {
            tracing::warn!("Google Translate not configured, auto-translate copies source text");
            Arc::new(NoopTranslationService)
        }
    };

    let settings = config.messaging_settings();
    let (queue, receiver) = ChannelDispatchQueue::new();
    let dispatcher = Dispatcher::new(
        store.clone(),
        push_service,
        Arc::new(TwilioAdapter::new(twilio)),
        settings.sms_from_number.clone(),
    );

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
    ));

    let deps = Arc::new(ServerDeps::new(
        store,
        translator,
        Arc::new(queue),
        jwt_service,
        settings,
    ));

    let router = build_router(AppState {
        deps,
        db_pool: Some(pool),
    });

    (router, DispatchWorker::new(receiver, dispatcher))
}
