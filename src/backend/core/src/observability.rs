//! Observability: tracing, metrics, and structured domain events.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry_otlp::WithExportConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize the tracing stack.
///
/// With an OTLP endpoint configured, spans are exported via OpenTelemetry
/// in addition to local logging.
pub fn init(service_name: &str, config: &ObservabilityConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if let Some(endpoint) = config.otlp_endpoint.as_deref() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint),
            )
            .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
                opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                    "service.name",
                    service_name.to_string(),
                )]),
            ))
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;

        let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        if config.json_logging {
            tracing_subscriber::registry()
                .with(filter)
                .with(telemetry_layer)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(telemetry_layer)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    } else if config.json_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    Ok(())
}

/// Shutdown OpenTelemetry.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Metrics
// ═══════════════════════════════════════════════════════════════════════════════

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus metrics recorder. Safe to call once per process;
/// subsequent calls are no-ops.
pub fn init_metrics() -> anyhow::Result<()> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(())
}

/// Render all metrics in Prometheus text format. Empty if the recorder was
/// never installed.
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Domain Events
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured event types for logging.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event_type")]
pub enum HiveEvent {
    UserRegistered {
        user_id: String,
        organization_id: String,
    },
    LoginSucceeded {
        user_id: String,
    },
    LoginFailed {
        email: String,
        reason: String,
    },
    TaskCreated {
        task_id: String,
        organization_id: String,
    },
    TaskStatusChanged {
        task_id: String,
        from: String,
        to: String,
    },
    OrganizationCreated {
        organization_id: String,
        name: String,
    },
}

impl HiveEvent {
    /// Log this event.
    pub fn log(&self) {
        match self {
            HiveEvent::UserRegistered {
                user_id,
                organization_id,
            } => {
                tracing::info!(
                    user_id = %user_id,
                    organization_id = %organization_id,
                    "User registered"
                );
            }
            HiveEvent::LoginSucceeded { user_id } => {
                tracing::info!(user_id = %user_id, "Login succeeded");
            }
            HiveEvent::LoginFailed { email, reason } => {
                // The specific reason stays server-side; the API response
                // is generic.
                tracing::warn!(email = %email, reason = %reason, "Login failed");
            }
            HiveEvent::TaskCreated {
                task_id,
                organization_id,
            } => {
                tracing::info!(
                    task_id = %task_id,
                    organization_id = %organization_id,
                    "Task created"
                );
            }
            HiveEvent::TaskStatusChanged { task_id, from, to } => {
                tracing::info!(
                    task_id = %task_id,
                    from = %from,
                    to = %to,
                    "Task status changed"
                );
            }
            HiveEvent::OrganizationCreated {
                organization_id,
                name,
            } => {
                tracing::info!(
                    organization_id = %organization_id,
                    name = %name,
                    "Organization created"
                );
            }
        }
    }
}
