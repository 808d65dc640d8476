pub mod logger;
pub mod metrics;
pub mod middleware;

#[cfg(any(feature = "axum-layer", test))]
pub use middleware::MetricsLayer;
pub use metrics::Metrics;


use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{trace as sdktrace, Resource};
use tracing_subscriber::{
    fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// サービス起動時に一度だけ渡すログ・トレースの設定。
/// サーバー側の Config から `telemetry_config()` で組み立てる。
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// リソース属性 service.name と Tracer 名に使う
    pub service_name: String,
    pub version: String,
    pub environment: String,
    /// OTLP gRPC の送信先。None ならトレースは送らずログだけ出す
    pub trace_endpoint: Option<String>,
    pub sample_rate: f64,
    /// RUST_LOG が無い場合の EnvFilter 指定
    pub log_level: String,
    /// "text" ならプレーンテキスト、それ以外は 1 行 1 JSON。
    pub log_format: String,
}

/// TelemetryError は telemetry 初期化の失敗を表す。
#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(String),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// trace_endpoint があれば OTLP gRPC へ送る Tracer を作り、グローバルに登録する。
fn otlp_tracer(cfg: &TelemetryConfig) -> Result<Option<sdktrace::Tracer>, TelemetryError> {
    let Some(ref endpoint) = cfg.trace_endpoint else {
        return Ok(None);
    };

    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    let provider = sdktrace::TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_sampler(sdktrace::Sampler::TraceIdRatioBased(cfg.sample_rate))
        .with_resource(Resource::new(vec![
            KeyValue::new("service.name", cfg.service_name.clone()),
            KeyValue::new("service.version", cfg.version.clone()),
            KeyValue::new("deployment.environment", cfg.environment.clone()),
        ]))
        .build();
    let tracer = provider.tracer(cfg.service_name.clone());
    global::set_tracer_provider(provider);
    Ok(Some(tracer))
}

/// init_telemetry はログ出力と（設定されていれば）トレース送信を初期化する。
/// RUST_LOG が設定されていればそちらを log_level より優先する。
pub fn init_telemetry(cfg: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    let fmt_layer = if cfg.log_format == "text" {
        fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    } else {
        fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    };

    let otel_layer =
        otlp_tracer(cfg)?.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// shutdown はバッファ済みのスパンを送信してから TracerProvider を閉じる。
pub fn shutdown() {
    global::shutdown_tracer_provider();
}
