use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::scraper::{SanctionedCountrySet, SanctionsScraper};
use crate::errors::Result;
use crate::outcome::Outcome;
use crate::store::AuditStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub matches: Vec<String>,
    pub count: usize,
}

/// Organization countries that also appear in the sanctioned set.
///
/// Exact comparison after trimming; no case or diacritic folding, so
/// "cuba" and "Cuba" are different countries here.
pub fn intersect(reference: &[String], sanctioned: &SanctionedCountrySet) -> Reconciliation {
    let matches: Vec<String> = reference
        .iter()
        .map(|country| country.trim())
        .filter(|country| !country.is_empty() && sanctioned.contains(country))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    Reconciliation {
        count: matches.len(),
        matches,
    }
}

pub struct SanctionsReconciler {
    store: Arc<dyn AuditStore>,
    scraper: Arc<SanctionsScraper>,
}

impl SanctionsReconciler {
    pub fn new(store: Arc<dyn AuditStore>, scraper: Arc<SanctionsScraper>) -> Self {
        Self { store, scraper }
    }

    /// Scrape the sanctions map and intersect it with `paises_organizacion`.
    ///
    /// A degraded scrape yields a degraded, empty reconciliation. Failing to
    /// read the reference list is an error.
    pub async fn reconcile(&self) -> Result<Outcome<Reconciliation>> {
        let scraped = self.scraper.scrape().await;
        let reference = self.store.reference_countries().await?;

        Ok(scraped.map(|sanctioned| intersect(&reference, &sanctioned)))
    }
}
