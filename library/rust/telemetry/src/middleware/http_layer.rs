use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use axum::extract::MatchedPath;
use http::{Request, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use super::{RequestLabels, TelemetryMiddleware};
use crate::metrics::Metrics;

/// MetricsLayer は HTTP リクエストごとに件数とレイテンシを記録する tower Layer。
///
/// `Router::layer` で付けること。ルーティング後に実行されるため
/// `MatchedPath` が取得でき、path ラベルがルートのテンプレートになる。
/// fallback に落ちたリクエストは `unmatched` にまとめる。
///
/// ```ignore
/// let app = handler::router(state).layer(MetricsLayer::new(metrics.clone()));
/// ```
#[derive(Clone)]
pub struct MetricsLayer {
    recorder: TelemetryMiddleware,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            recorder: TelemetryMiddleware::new(metrics),
        }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            recorder: self.recorder.clone(),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    recorder: TelemetryMiddleware,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = RecordOnCompletion<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let route = req.extensions().get::<MatchedPath>().map(MatchedPath::as_str);
        let labels = RequestLabels::new(req.method().as_str(), route);

        RecordOnCompletion {
            inner: self.inner.call(req),
            labels,
            started: Instant::now(),
            recorder: self.recorder.clone(),
        }
    }
}

pin_project! {
    /// 内側のレスポンス Future が完了した時点で 1 回だけ記録する。
    pub struct RecordOnCompletion<F> {
        #[pin]
        inner: F,
        labels: RequestLabels,
        started: Instant,
        recorder: TelemetryMiddleware,
    }
}

impl<F, ResBody, E> Future for RecordOnCompletion<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.inner.poll(cx));
        let elapsed = this.started.elapsed().as_secs_f64();

        match &result {
            Ok(response) => {
                this.recorder
                    .on_response(this.labels, response.status().as_u16(), elapsed);
            }
            Err(_) => this.recorder.on_error(this.labels, elapsed),
        }
        Poll::Ready(result)
    }
}
