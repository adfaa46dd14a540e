//! # Handlers HTTP del Pipeline
//! src/jobs/handlers.rs
//!
//! Endpoints:
//! - `POST /jobs`            - Encolar un job `{"type": "...", "version": "..."}`
//! - `GET  /status`          - Estado de cola y pool
//! - `GET  /metrics`         - Exposición Prometheus
//! - `GET  /metrics/json`    - Snapshot de métricas en JSON
//! - `POST /admin/shutdown`  - Pedir apagado ordenado

use crate::error::PipelineError;
use crate::http::{Request, Response, StatusCode};
use crate::jobs::manager::JobManager;
use crate::metrics::{exposition, render_prometheus, MetricsCollector};
use crate::shutdown::ShutdownSignal;
use serde::Deserialize;

/// Body de `POST /jobs`
///
/// Las etiquetas llegan como strings para poder distinguir "tipo inválido"
/// de "JSON malformado" en el mensaje de error.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    pub version: String,
}

impl SubmitRequest {
    /// Lee el body JSON; sin body, cae a los query params `type` y `version`
    fn from_request(req: &Request) -> Result<Self, String> {
        if !req.body().is_empty() {
            return req.json::<SubmitRequest>().map_err(|e| format!("Invalid JSON body: {}", e));
        }

        match (req.query_param("type"), req.query_param("version")) {
            (Some(job_type), Some(version)) => Ok(SubmitRequest {
                job_type: job_type.to_string(),
                version: version.to_string(),
            }),
            _ => Err("Missing required fields: type, version".to_string()),
        }
    }
}

/// Handler para `POST /jobs`
///
/// Bloquea mientras la cola esté llena (backpressure hacia el cliente).
///
/// ```json
/// {"status": "queued"}
/// ```
pub fn submit_handler(req: &Request, manager: &JobManager) -> Response {
    let submit = match SubmitRequest::from_request(req) {
        Ok(submit) => submit,
        Err(message) => return Response::error(StatusCode::BadRequest, &message),
    };

    match manager.submit_raw(&submit.job_type, &submit.version) {
        Ok(()) => Response::json(r#"{"status":"queued"}"#),
        Err(err) if err.is_rejection() => Response::error(StatusCode::BadRequest, &err.to_string()),
        Err(err @ PipelineError::ShuttingDown) | Err(err @ PipelineError::QueueClosed) => {
            let mut response = Response::error(StatusCode::ServiceUnavailable, &err.to_string());
            response.add_header("Retry-After", "5");
            response
        }
        Err(err) => {
            tracing::error!(error = %err, "job submission failed");
            Response::error(StatusCode::InternalServerError, &err.to_string())
        }
    }
}

/// Handler para `GET /status`
pub fn status_handler(_req: &Request, manager: &JobManager) -> Response {
    Response::json_value(StatusCode::Ok, &manager.status_json())
}

/// Handler para `GET /metrics`
pub fn metrics_handler(_req: &Request, metrics: &MetricsCollector) -> Response {
    match render_prometheus(metrics) {
        Ok(body) => Response::text(&body, exposition::CONTENT_TYPE),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            Response::error(StatusCode::InternalServerError, &err.to_string())
        }
    }
}

/// Handler para `GET /metrics/json`
pub fn metrics_json_handler(_req: &Request, metrics: &MetricsCollector) -> Response {
    Response::json_value(StatusCode::Ok, &metrics.snapshot())
}

/// Handler para `POST /admin/shutdown`
pub fn shutdown_handler(_req: &Request, signal: &ShutdownSignal) -> Response {
    let first = signal.trigger();
    Response::json_value(
        StatusCode::Accepted,
        &serde_json::json!({ "status": "shutting_down", "already_requested": !first }),
    )
}
