use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: DatabaseHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    connection_pool: Option<ConnectionPoolHealth>,
    dispatch_queue: DispatchQueueHealth,
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct ConnectionPoolHealth {
    size: u32,
    idle_connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_connections: Option<u32>,
}

#[derive(Serialize)]
pub struct DispatchQueueHealth {
    pending: usize,
}

/// Health check endpoint
///
/// Checks:
/// - Store connectivity and responsiveness
/// - Connection pool utilization (Postgres only)
/// - Dispatch backlog
///
/// Returns 200 OK if the store answers, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let db_health = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.deps.store.ping(),
    )
    .await
    {
        Ok(Ok(())) => DatabaseHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => DatabaseHealth {
            status: "error".to_string(),
            error: Some(format!("Query failed: {}", e)),
        },
        Err(_) => DatabaseHealth {
            status: "error".to_string(),
            error: Some("Query timeout (>5s)".to_string()),
        },
    };

    let pool_health = state.db_pool.as_ref().map(|pool| ConnectionPoolHealth {
        size: pool.size(),
        idle_connections: pool.num_idle(),
        max_connections: Some(pool.options().get_max_connections()),
    });

    let is_healthy = db_health.status == "ok";

    let overall_status = if is_healthy {
        "healthy"
    } else {
        "unhealthy"
    };

    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            database: db_health,
            connection_pool: pool_health,
            dispatch_queue: DispatchQueueHealth {
                pending: state.deps.dispatch_queue.pending(),
            },
        }),
    )
}
