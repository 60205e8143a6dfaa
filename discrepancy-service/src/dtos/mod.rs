//! Request and response bodies for the HTTP surface.

use crate::engine::{DiscrepancyPage, PageRequest};
use crate::models::{Discrepancy, DiscrepancyType, Report, TransactionRecord, TypeCounts};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    #[serde(default)]
    pub system_a: Vec<TransactionRecord>,
    #[serde(default)]
    pub system_b: Vec<TransactionRecord>,
}

/// Query string of `GET /results/{report_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    #[serde(rename = "type")]
    pub discrepancy_type: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ResultsQuery {
    /// Resolve defaults and the type filter. Range checks happen in the reader.
    pub fn to_page_request(&self, default_page_size: u32) -> Result<PageRequest, ValidationErrors> {
        let discrepancy_type = match self.discrepancy_type.as_deref() {
            None | Some("") => None,
            Some(name) => Some(DiscrepancyType::parse(name).ok_or_else(|| unknown_type(name))?),
        };
        Ok(PageRequest {
            page: self.page.unwrap_or(1),
            page_size: self.page_size.unwrap_or(default_page_size),
            discrepancy_type,
        })
    }
}

fn unknown_type(name: &str) -> ValidationErrors {
    let mut error = ValidationError::new("unknown_type");
    error.message = Some(Cow::Owned(format!(
        "unknown discrepancy type '{}', expected one of: {}",
        name,
        DiscrepancyType::ALL.map(|t| t.as_str()).join(", ")
    )));
    let mut errors = ValidationErrors::new();
    errors.add("type", error);
    errors
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub report_finalized: bool,
    pub results: Vec<Discrepancy>,
}

impl PaginatedResponse {
    pub fn from_page(page: DiscrepancyPage, filter: Option<DiscrepancyType>) -> Self {
        let link = |n: u32| {
            let mut url = format!(
                "/results/{}?page={}&page_size={}",
                page.report_id, n, page.page_size
            );
            if let Some(t) = filter {
                url.push_str("&type=");
                url.push_str(t.as_str());
            }
            url
        };

        Self {
            count: page.count,
            next: page.has_next.then(|| link(page.page + 1)),
            previous: page.has_previous.then(|| link(page.page - 1)),
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages,
            report_finalized: page.report_finalized,
            results: page.results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportDetailResponse {
    #[serde(flatten)]
    pub report: Report,
    pub total_discrepancies: i64,
    pub discrepancies_by_type: TypeCounts,
}

impl From<(Report, TypeCounts)> for ReportDetailResponse {
    fn from((report, counts): (Report, TypeCounts)) -> Self {
        Self {
            report,
            total_discrepancies: counts.total(),
            discrepancies_by_type: counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_and_type_filter() {
        let query = ResultsQuery {
            discrepancy_type: Some("amount_mismatch".to_string()),
            ..Default::default()
        };
        let request = query.to_page_request(100).unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 100);
        assert_eq!(request.discrepancy_type, Some(DiscrepancyType::AmountMismatch));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let query = ResultsQuery {
            discrepancy_type: Some("missing".to_string()),
            ..Default::default()
        };
        let err = query.to_page_request(100).unwrap_err();
        assert!(err.field_errors().contains_key("type"));
    }

    #[test]
    fn links_keep_filter_and_page_size() {
        let page = DiscrepancyPage {
            report_id: 7,
            report_finalized: true,
            count: 25,
            page: 2,
            page_size: 10,
            total_pages: 3,
            has_next: true,
            has_previous: true,
            results: Vec::new(),
        };
        let body = PaginatedResponse::from_page(page, Some(DiscrepancyType::MissingInA));
        assert_eq!(
            body.next.as_deref(),
            Some("/results/7?page=3&page_size=10&type=missing_in_a")
        );
        assert_eq!(
            body.previous.as_deref(),
            Some("/results/7?page=1&page_size=10&type=missing_in_a")
        );
    }
}
