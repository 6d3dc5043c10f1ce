use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::client::transport::SalaryLookup;
use crate::models::{JobListing, SalaryEstimateRequest};

/// Attached when the estimate lookup fails for any reason.
pub const SALARY_FALLBACK: &str = "Salary not disclosed";

/// Best-effort salary estimates for listings the board gave no range for.
pub struct SalaryEnricher<'a> {
    lookup: &'a dyn SalaryLookup,
}

impl<'a> SalaryEnricher<'a> {
    pub fn new(lookup: &'a dyn SalaryLookup) -> Self {
        Self { lookup }
    }

    /// Never fails: a lookup error degrades to [`SALARY_FALLBACK`].
    pub async fn enrich(&self, mut listing: JobListing) -> JobListing {
        if listing.has_salary_range() || listing.salary_estimate.is_some() {
            return listing;
        }

        let request = SalaryEstimateRequest::from(&listing);
        match self.lookup.estimate(&request).await {
            Ok(range) => {
                debug!(job_id = %listing.id, "Salary estimate attached");
                listing.salary_estimate = Some(range);
            }
            Err(e) => {
                warn!(job_id = %listing.id, "Salary estimate failed, using fallback: {e}");
                listing.salary_estimate = Some(SALARY_FALLBACK.to_string());
            }
        }
        listing
    }

    /// Enriches a whole page concurrently and resolves once every lookup has
    /// settled. Order is preserved.
    pub async fn enrich_page(&self, listings: Vec<JobListing>) -> Vec<JobListing> {
        join_all(listings.into_iter().map(|listing| self.enrich(listing))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::ClientError;
    use crate::client::testing::FakeSalaryLookup;

    #[tokio::test]
    async fn test_listing_with_salary_is_left_alone() {
        let lookup = FakeSalaryLookup::answering(Ok("£1".to_string()));
        let mut listing = JobListing::new("1", "Welder");
        listing.max_salary = Some(42_000.0);

        let enriched = SalaryEnricher::new(&lookup).enrich(listing.clone()).await;
        assert_eq!(enriched, listing);
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_salary_gets_estimate() {
        let lookup = FakeSalaryLookup::answering(Ok("$70k - $85k".to_string()));
        let enriched = SalaryEnricher::new(&lookup)
            .enrich(JobListing::new("1", "Analyst"))
            .await;
        assert_eq!(enriched.salary_estimate.as_deref(), Some("$70k - $85k"));
        assert_eq!(lookup.requests()[0].id, "1");
    }

    #[tokio::test]
    async fn test_failed_lookup_falls_back() {
        for failure in [
            ClientError::Network("connection reset".to_string()),
            ClientError::Malformed("empty salary range".to_string()),
            ClientError::RateLimited,
        ] {
            let lookup = FakeSalaryLookup::answering(Err(failure));
            let enriched = SalaryEnricher::new(&lookup)
                .enrich(JobListing::new("7", "Nurse"))
                .await;
            assert_eq!(enriched.salary_estimate.as_deref(), Some(SALARY_FALLBACK));
            assert_eq!(enriched.id, "7");
            assert_eq!(enriched.title, "Nurse");
        }
    }

    #[tokio::test]
    async fn test_page_enrichment_preserves_order_and_only_queries_missing() {
        let lookup = FakeSalaryLookup::answering(Ok("est".to_string()));
        let mut paid = JobListing::new("b", "Paid");
        paid.min_salary = Some(10.0);
        let page = vec![JobListing::new("a", "A"), paid, JobListing::new("c", "C")];

        let enriched = SalaryEnricher::new(&lookup).enrich_page(page).await;
        let ids: Vec<_> = enriched.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(lookup.calls(), 2);
        assert_eq!(enriched[1].salary_estimate, None);
    }
}
