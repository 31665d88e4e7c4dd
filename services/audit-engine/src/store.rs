//! Read contract over the relational store.
//!
//! Only the queries the evaluation and reconciliation paths need live here;
//! the Postgres implementation is in [`crate::database`].

use async_trait::async_trait;

use crate::controls::AnomalyTable;
use crate::errors::Result;
use crate::models::ControlRecord;

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// All rows of `controles`, in storage order.
    async fn load_controls(&self) -> Result<Vec<ControlRecord>>;

    /// `COUNT(*)` of a control's result table. Fails if the table is missing.
    async fn count_rows(&self, table: &AnomalyTable) -> Result<i64>;

    /// Country names held in `paises_organizacion`.
    async fn reference_countries(&self) -> Result<Vec<String>>;
}
