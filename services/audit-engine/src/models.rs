use serde::{Deserialize, Serialize};
use std::fmt;

use crate::controls::Severity;

// ===== Controls =====

/// Primary key of a row in `controles`.
///
/// Kept as an integer newtype: it is interpolated into the name of the
/// control's result table, so only digits can ever reach the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(pub i64);

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A control definition as stored, before evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRecord {
    pub id: ControlId,
    pub nombre: String,
    pub descripcion: String,
    pub accion_requerida: Option<String>,
}

/// A control enriched with its derived severity and anomaly count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub id: ControlId,
    pub nombre: String,
    pub descripcion: String,
    pub accion_requerida: Option<String>,
    pub estado: Severity,
    #[serde(rename = "cantidadAnomalias")]
    pub cantidad_anomalias: u64,
}

// ===== Requests / Responses =====

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}
