use serde::Serialize;
use std::sync::Arc;

use super::classifier::classify;
use super::resolver::{AnomalyTable, AnomalyTableResolver};
use crate::errors::Result;
use crate::models::{Control, ControlId, ControlRecord};
use crate::outcome::Outcome;
use crate::store::AuditStore;

/// A control whose anomaly count fell back to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedCount {
    pub control_id: ControlId,
    pub table: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ControlEvaluation {
    /// Enriched controls, in the order the store returned them.
    pub controls: Vec<Control>,
    pub degraded: Vec<DegradedCount>,
}

pub struct ControlEvaluator {
    store: Arc<dyn AuditStore>,
    resolver: AnomalyTableResolver,
}

impl ControlEvaluator {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        let resolver = AnomalyTableResolver::new(store.clone());
        Self { store, resolver }
    }

    /// Evaluate the whole control catalog.
    ///
    /// Failing to read `controles` is an error; failing to count a single
    /// result table only degrades that control to zero anomalies.
    pub async fn evaluate_all(&self) -> Result<ControlEvaluation> {
        let records = self.store.load_controls().await?;
        let mut evaluation = ControlEvaluation {
            controls: Vec::with_capacity(records.len()),
            degraded: Vec::new(),
        };

        for record in records {
            let outcome = self.resolver.anomaly_count(record.id).await;

            if let Outcome::Degraded { reason, .. } = &outcome {
                evaluation.degraded.push(DegradedCount {
                    control_id: record.id,
                    table: AnomalyTable::for_control(record.id).name().to_string(),
                    reason: reason.clone(),
                });
            }

            evaluation.controls.push(enrich(record, outcome.into_value()));
        }

        Ok(evaluation)
    }
}

/// Build the enriched control in one step so severity and remediation text
/// are never observed out of sync.
pub fn enrich(record: ControlRecord, anomaly_count: u64) -> Control {
    let estado = classify(anomaly_count);
    let accion_requerida = if estado.keeps_required_action() {
        record.accion_requerida
    } else {
        None
    };

    Control {
        id: record.id,
        nombre: record.nombre,
        descripcion: record.descripcion,
        accion_requerida,
        estado,
        cantidad_anomalias: anomaly_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Severity;
    use crate::errors::AuditError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MemoryStore {
        controls: Vec<ControlRecord>,
        counts: HashMap<String, i64>,
        catalog_unavailable: bool,
    }

    #[async_trait]
    impl AuditStore for MemoryStore {
        async fn load_controls(&self) -> Result<Vec<ControlRecord>> {
            if self.catalog_unavailable {
                return Err(AuditError::Internal("connection refused".to_string()));
            }
            Ok(self.controls.clone())
        }

        async fn count_rows(&self, table: &AnomalyTable) -> Result<i64> {
            self.counts
                .get(table.name())
                .copied()
                .ok_or_else(|| AuditError::NotFound(table.name().to_string()))
        }

        async fn reference_countries(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn record(id: i64, action: Option<&str>) -> ControlRecord {
        ControlRecord {
            id: ControlId(id),
            nombre: format!("Control {}", id),
            descripcion: "Pagos duplicados a proveedores".to_string(),
            accion_requerida: action.map(str::to_string),
        }
    }

    fn evaluator(controls: Vec<ControlRecord>, counts: &[(&str, i64)]) -> ControlEvaluator {
        let counts = counts.iter().map(|(n, c)| (n.to_string(), *c)).collect();
        ControlEvaluator::new(Arc::new(MemoryStore {
            controls,
            counts,
            catalog_unavailable: false,
        }))
    }

    #[test]
    fn test_enrich_clears_action_when_compliant() {
        let control = enrich(record(1, Some("Revisar")), 0);
        assert_eq!(control.estado, Severity::Compliant);
        assert_eq!(control.accion_requerida, None);
    }

    #[test]
    fn test_enrich_keeps_action_when_attention() {
        let control = enrich(record(1, Some("Revisar")), 3);
        assert_eq!(control.estado, Severity::Attention);
        assert_eq!(control.accion_requerida.as_deref(), Some("Revisar"));
    }

    #[tokio::test]
    async fn test_storage_order_is_preserved() {
        let evaluator = evaluator(
            vec![record(9, None), record(2, None), record(5, None)],
            &[("resultados_control9", 1), ("resultados_control2", 30)],
        );

        let evaluation = evaluator.evaluate_all().await.unwrap();
        let ids: Vec<i64> = evaluation.controls.iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![9, 2, 5]);
        assert_eq!(evaluation.controls[1].estado, Severity::Critical);
    }

    #[tokio::test]
    async fn test_missing_tables_are_reported_as_degraded() {
        let evaluator = evaluator(
            vec![record(1, Some("Revisar")), record(2, Some("Escalar"))],
            &[("resultados_control1", 4)],
        );

        let evaluation = evaluator.evaluate_all().await.unwrap();
        assert_eq!(evaluation.degraded.len(), 1);
        assert_eq!(evaluation.degraded[0].control_id, ControlId(2));
        assert_eq!(evaluation.degraded[0].table, "resultados_control2");

        let second = &evaluation.controls[1];
        assert_eq!(second.cantidad_anomalias, 0);
        assert_eq!(second.estado, Severity::Compliant);
        assert_eq!(second.accion_requerida, None);
    }

    #[tokio::test]
    async fn test_unreadable_catalog_is_an_error() {
        let evaluator = ControlEvaluator::new(Arc::new(MemoryStore {
            controls: vec![record(1, None)],
            counts: HashMap::new(),
            catalog_unavailable: true,
        }));

        assert!(evaluator.evaluate_all().await.is_err());
    }
}
