use actix_web::{http::header, web, HttpResponse};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

use crate::controls::ControlEvaluator;
use crate::database::Database;
use crate::errors::AuditError;
use crate::export::{self, ExportError, EXPORT_FILENAME, XLSX_CONTENT_TYPE};
use crate::metrics;
use crate::models::{ControlId, ExportRequest, HealthResponse};
use crate::outcome::Outcome;
use crate::sanctions::{SanctionsReconciler, SanctionsScraper};
use crate::screening::{MatchClient, MatchQuery};

// ===== Health Check =====
pub async fn health_check(db: web::Data<Arc<Database>>) -> HttpResponse {
    let database = match db.health_check().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Database health check failed: {}", e);
            "disconnected"
        }
    };

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        checked_at: Utc::now(),
    })
}

// ===== Controls =====
pub async fn get_controles(
    evaluator: web::Data<Arc<ControlEvaluator>>,
) -> Result<HttpResponse, AuditError> {
    let evaluation = evaluator.evaluate_all().await.map_err(|e| {
        error!("Failed to load control catalog: {}", e);
        e
    })?;

    for degraded in &evaluation.degraded {
        warn!(
            control_id = %degraded.control_id,
            table = %degraded.table,
            "Anomaly count unavailable, reporting 0: {}",
            degraded.reason
        );
    }

    metrics::record_evaluation(&evaluation.controls, evaluation.degraded.len());
    info!(
        "Evaluated {} controls ({} degraded)",
        evaluation.controls.len(),
        evaluation.degraded.len()
    );

    Ok(HttpResponse::Ok().json(evaluation.controls))
}

pub async fn normativas_por_control(
    db: web::Data<Arc<Database>>,
    control_id: web::Path<i64>,
) -> Result<HttpResponse, AuditError> {
    let normativas = db.normativas_for_control(ControlId(*control_id)).await?;
    Ok(HttpResponse::Ok().json(normativas))
}

// ===== Reference data =====
pub async fn list_normativas(db: web::Data<Arc<Database>>) -> Result<HttpResponse, AuditError> {
    Ok(HttpResponse::Ok().json(db.list_normativas().await?))
}

pub async fn list_procesos(db: web::Data<Arc<Database>>) -> Result<HttpResponse, AuditError> {
    Ok(HttpResponse::Ok().json(db.list_procesos().await?))
}

pub async fn normativas_por_proceso(
    db: web::Data<Arc<Database>>,
    proceso_id: web::Path<i64>,
) -> Result<HttpResponse, AuditError> {
    let normativas = db.normativas_for_proceso(*proceso_id).await?;
    Ok(HttpResponse::Ok().json(normativas))
}

// ===== Sanctions =====
pub async fn get_paises_sancionados(scraper: web::Data<Arc<SanctionsScraper>>) -> HttpResponse {
    let outcome = scraper.scrape().await;
    log_scrape(&outcome);
    HttpResponse::Ok().json(outcome.into_value())
}

pub async fn get_coincidencias_sanciones(
    reconciler: web::Data<Arc<SanctionsReconciler>>,
) -> Result<HttpResponse, AuditError> {
    let outcome = reconciler.reconcile().await?;
    log_scrape(&outcome);
    Ok(HttpResponse::Ok().json(outcome.into_value()))
}

fn log_scrape<T>(outcome: &Outcome<T>) {
    match outcome.reason() {
        Some(reason) => {
            metrics::SANCTIONS_SCRAPES.with_label_values(&["degraded"]).inc();
            warn!("Sanctions scrape failed, serving empty result: {}", reason);
        }
        None => {
            metrics::SANCTIONS_SCRAPES.with_label_values(&["ok"]).inc();
        }
    }
}

// ===== Screening =====
pub async fn screen_entity(
    client: web::Data<Arc<MatchClient>>,
    query: web::Json<MatchQuery>,
) -> Result<HttpResponse, AuditError> {
    query
        .validate()
        .map_err(|e| AuditError::Validation(e.to_string()))?;

    match client.best_matches(&query).await {
        Ok(results) => {
            metrics::SCREENING_REQUESTS.with_label_values(&["ok"]).inc();
            info!("Screening of '{}' returned {} candidates", query.entity_name, results.len());
            Ok(HttpResponse::Ok().json(results))
        }
        Err(e) => {
            metrics::SCREENING_REQUESTS.with_label_values(&["error"]).inc();
            error!("Screening of '{}' failed: {}", query.entity_name, e);
            Err(e.into())
        }
    }
}

// ===== Export =====
pub async fn export_excel(
    db: web::Data<Arc<Database>>,
    request: web::Json<ExportRequest>,
) -> Result<HttpResponse, AuditError> {
    let bytes = match export::export_tables(&db, &request.tables).await {
        Ok(bytes) => bytes,
        Err(e) => {
            metrics::EXCEL_EXPORTS.with_label_values(&["error"]).inc();
            if !matches!(e, ExportError::NoTablesSelected) {
                error!("Export of {:?} failed: {}", request.tables, e);
            }
            return Err(e.into());
        }
    };

    metrics::EXCEL_EXPORTS.with_label_values(&["ok"]).inc();
    info!("Exported {} tables ({} bytes)", request.tables.len(), bytes.len());

    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", EXPORT_FILENAME),
        ))
        .body(bytes))
}

// ===== Metrics =====
pub async fn metrics_endpoint() -> HttpResponse {
    match metrics::gather_text() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

// ===== Configure Routes =====
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(metrics_endpoint))
        .route("/controles", web::get().to(get_controles))
        .route("/controles/{id}/normativas", web::get().to(normativas_por_control))
        .route("/normativas", web::get().to(list_normativas))
        .route("/procesos", web::get().to(list_procesos))
        .route("/procesos/{id}/normativas", web::get().to(normativas_por_proceso))
        .route("/sanciones/paises", web::get().to(get_paises_sancionados))
        .route("/sanciones/coincidencias", web::get().to(get_coincidencias_sanciones))
        .route("/screening/match", web::post().to(screen_entity))
        .route("/export_excel", web::post().to(export_excel));
}
