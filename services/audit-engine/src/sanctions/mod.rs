//! Sanctions screening against the externally published sanctions map.

pub mod reconciler;
pub mod scraper;

pub use reconciler::{intersect, Reconciliation, SanctionsReconciler};
pub use scraper::{
    Browser, BrowserSession, SanctionedCountrySet, SanctionsScraper, ScrapeError,
    ScrapeSettings, WebDriverBrowser,
};
