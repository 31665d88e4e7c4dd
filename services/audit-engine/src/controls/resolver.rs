use std::sync::Arc;

use crate::models::ControlId;
use crate::outcome::Outcome;
use crate::store::AuditStore;

pub const RESULT_TABLE_PREFIX: &str = "resultados_control";

/// Name of the table the anomaly detector writes a control's findings to.
///
/// Only constructible from a [`ControlId`], so the name is always the prefix
/// followed by decimal digits (and possibly a leading minus sign).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyTable {
    control_id: ControlId,
    name: String,
}

impl AnomalyTable {
    pub fn for_control(control_id: ControlId) -> Self {
        Self {
            control_id,
            name: format!("{}{}", RESULT_TABLE_PREFIX, control_id.0),
        }
    }

    pub fn control_id(&self) -> ControlId {
        self.control_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct AnomalyTableResolver {
    store: Arc<dyn AuditStore>,
}

impl AnomalyTableResolver {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Row count of the control's result table.
    ///
    /// A missing table or failed count is not an error here: it degrades to
    /// zero and the reason travels with the outcome.
    pub async fn anomaly_count(&self, control_id: ControlId) -> Outcome<u64> {
        let table = AnomalyTable::for_control(control_id);

        match self.store.count_rows(&table).await {
            Ok(count) => Outcome::ok(count.max(0) as u64),
            Err(e) => Outcome::degraded(0, format!("{}: {}", table.name(), e)),
        }
    }
}
