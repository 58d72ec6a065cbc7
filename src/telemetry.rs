use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use rocket::{
    Data, Request, Response,
    fairing::{Fairing, Info, Kind},
};
use std::sync::Mutex;
use std::time::Instant;
use tonic::metadata::MetadataMap;
use tracing::{Span, field, info_span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use once_cell::sync::Lazy;

use crate::error::AppError;

/// Opens one span per HTTP request and closes it with status and latency.
pub struct TelemetryFairing;

/// Cached per request so the response hook finds the span the request hook opened.
struct RequestSpan {
    span: Span,
    started: Instant,
}

impl RequestSpan {
    fn open(request: &Request<'_>) -> Self {
        let method = request.method();
        let path = request.uri().path().to_string();
        let user_agent = request.headers().get_one("User-Agent").unwrap_or_default();

        let span = info_span!(
            "http_request",
            otel.name = format!("{} {}", method, path),
            http.method = %method,
            http.uri = %request.uri(),
            http.user_agent = user_agent,
            http.route = field::Empty,
            http.status_code = field::Empty,
            http.duration_ms = field::Empty,
        );

        Self {
            span,
            started: Instant::now(),
        }
    }
}

#[rocket::async_trait]
impl Fairing for TelemetryFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request tracing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let opened = RequestSpan::open(request);
        request.local_cache(|| opened);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let RequestSpan { span, started } = request.local_cache(|| RequestSpan::open(request));
        let elapsed_ms = started.elapsed().as_millis() as i64;
        let status = response.status().code;

        // Routing happens after on_request, so the matched route is only known here.
        if let Some(route) = request.route() {
            span.record("http.route", field::display(&route.uri));
        }
        span.record("http.status_code", status);
        span.record("http.duration_ms", elapsed_ms);

        span.in_scope(|| {
            if status >= 500 {
                tracing::error!(status, elapsed_ms, "Request failed");
            } else {
                tracing::info!(status, elapsed_ms, "Request completed");
            }
        });
    }
}

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

fn resource() -> Resource {
    let environment = dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    Resource::builder()
        .with_schema_url(
            [
                KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, environment),
            ],
            SCHEMA_URL,
        )
        .build()
}

const DEFAULT_OTLP_ENDPOINT: &str = "https://api.honeycomb.io:443";

fn init_tracer_provider(honeycomb_api_key: &str) -> Result<SdkTracerProvider, AppError> {
    let mut metadata = MetadataMap::new();
    let key = honeycomb_api_key
        .parse()
        .map_err(|e| AppError::Internal(format!("Invalid HONEYCOMB_API_KEY: {}", e)))?;
    metadata.insert("x-honeycomb-team", key);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(
            dotenvy::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_OTLP_ENDPOINT.to_string()),
        )
        .with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots())
        .with_protocol(Protocol::Grpc)
        .with_metadata(metadata)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build span exporter: {}", e)))?;

    Ok(SdkTracerProvider::builder()
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource())
        .with_batch_exporter(exporter)
        .build())
}

pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

/// Installs the global subscriber. Spans are exported to Honeycomb when
/// `HONEYCOMB_API_KEY` is set, otherwise only the console layer is active.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let provider = match dotenvy::var("HONEYCOMB_API_KEY") {
        Ok(key) if !key.trim().is_empty() => match init_tracer_provider(key.trim()) {
            Ok(provider) => Some(provider),
            Err(e) => {
                eprintln!("Telemetry export disabled: {}", e);
                None
            }
        },
        _ => None,
    };

    let otel_layer = provider
        .as_ref()
        .map(|p| OpenTelemetryLayer::new(p.tracer(env!("CARGO_PKG_NAME"))));

    let initialised = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .try_init();

    if let Err(e) = initialised {
        eprintln!("Tracing subscriber already installed: {}", e);
        return;
    }

    if let Some(tracer_provider) = provider {
        if let Ok(mut guard) = TELEMETRY_GUARD.lock() {
            *guard = Some(OtelGuard { tracer_provider });
        }
    }
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

pub fn shutdown_telemetry() {
    tracing::info!("Shutting down telemetry");

    let guard = match TELEMETRY_GUARD.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    drop(guard);
}
