//! Offset pagination
//!
//! `page` and `page_size` come from the query string (defaults 1 and 10).
//! Missing or non-numeric values fall back to the defaults; values below 1 are
//! rejected. The envelope reports the filtered total alongside the window:
//!
//! ```json
//! {"total_records": 25, "total_pages": 3, "current_page": 3, "page_size": 10, "results": [...]}
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::IntErrorKind;
use thiserror::Error;

use crate::models::Id;
use crate::repository::{Predicate, Repository, RepositoryResult, Window};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{parameter}' must be a positive integer, got {value}")]
pub struct InvalidPagination {
    pub parameter: &'static str,
    pub value: String,
}

/// A validated page request; both fields are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Parse one parameter: `Ok(None)` when absent or non-numeric.
fn parse_param(
    params: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<u64>, InvalidPagination> {
    let Some(raw) = params.get(name) else {
        return Ok(None);
    };
    let invalid = || InvalidPagination {
        parameter: name,
        value: raw.clone(),
    };

    let parsed = match raw.trim().parse::<i64>() {
        Ok(value) => value,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            IntErrorKind::NegOverflow => return Err(invalid()),
            _ => return Ok(None),
        },
    };

    if parsed < 1 {
        return Err(invalid());
    }
    Ok(u64::try_from(parsed).ok())
}

impl PageRequest {
    pub fn new(page: u64, page_size: u64) -> Result<Self, InvalidPagination> {
        if page == 0 {
            return Err(InvalidPagination {
                parameter: "page",
                value: page.to_string(),
            });
        }
        if page_size == 0 {
            return Err(InvalidPagination {
                parameter: "page_size",
                value: page_size.to_string(),
            });
        }
        Ok(Self { page, page_size })
    }

    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, InvalidPagination> {
        let page = parse_param(params, "page")?.unwrap_or(DEFAULT_PAGE);
        let page_size = parse_param(params, "page_size")?.unwrap_or(DEFAULT_PAGE_SIZE);
        Self::new(page, page_size)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// `(page - 1) * page_size`, saturating
    pub fn start(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn end(&self) -> u64 {
        self.start().saturating_add(self.page_size)
    }

    pub fn window(&self) -> Window {
        Window::new(self.start(), self.page_size)
    }

    /// `ceil(total / page_size)`
    pub fn total_pages(&self, total_records: u64) -> u64 {
        total_records.div_ceil(self.page_size)
    }
}

/// One page of a collection with its pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub total_records: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub results: Vec<T>,
}

impl<T> PageEnvelope<T> {
    pub fn new(request: PageRequest, total_records: u64, results: Vec<T>) -> Self {
        Self {
            total_records,
            total_pages: request.total_pages(total_records),
            current_page: request.page(),
            page_size: request.page_size(),
            results,
        }
    }
}

impl<T: Serialize> IntoResponse for PageEnvelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Count and window a filtered collection from one snapshot.
pub async fn paginate<R, E, C, U>(
    repository: &R,
    filter: &Predicate,
    request: PageRequest,
) -> RepositoryResult<PageEnvelope<E>>
where
    R: Repository<Id, E, C, U>,
{
    let (total, results) = repository.find_page(filter, request.window()).await?;
    Ok(PageEnvelope::new(request, total, results))
}
