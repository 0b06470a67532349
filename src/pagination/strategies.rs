//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{PageProgress, Paginator};
use crate::config::PaginationDef;
use crate::extract::{extract_string, extract_value};
use crate::http::{PageRequest, PageResponse};
use std::collections::HashMap;

/// Build a paginator from a table's pagination definition
pub fn build_paginator(def: &PaginationDef, page_size: u32) -> Box<dyn Paginator> {
    match def {
        PaginationDef::None => Box::new(SinglePage),
        PaginationDef::Offset {
            offset_param,
            limit_param,
        } => Box::new(OffsetPaginator {
            offset_param: offset_param.clone(),
            limit_param: limit_param.clone(),
            page_size,
        }),
        PaginationDef::PageNumber {
            page_param,
            start_page,
            page_size_param,
            has_more_path,
        } => Box::new(PageNumberPaginator {
            page_param: page_param.clone(),
            start_page: *start_page,
            page_size_param: page_size_param.clone(),
            page_size,
            has_more_path: has_more_path.clone(),
        }),
        PaginationDef::Cursor {
            cursor_param,
            cursor_path,
        } => Box::new(CursorPaginator {
            cursor_param: cursor_param.clone(),
            cursor_path: cursor_path.clone(),
        }),
        PaginationDef::NextLink { path } => Box::new(NextLinkPaginator { path: path.clone() }),
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination (SQL-style)
///
/// Advances the offset by the number of records received; terminates when a
/// page comes back short. Common patterns:
/// - `?offset=100&limit=50`
/// - `?skip=100&take=50`
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    /// Query parameter name for offset
    pub offset_param: String,
    /// Query parameter name for limit
    pub limit_param: String,
    /// Number of records per page
    pub page_size: u32,
}

impl Paginator for OffsetPaginator {
    fn initial_params(&self, progress: &PageProgress) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.offset_param.clone(), progress.offset.to_string());
        params.insert(self.limit_param.clone(), self.page_size.to_string());
        params
    }

    fn next_request(
        &self,
        _response: &PageResponse,
        previous: &PageRequest,
        records_count: usize,
        progress: &mut PageProgress,
    ) -> Option<PageRequest> {
        progress.add_fetched(records_count as u64);
        // The offset always advances past what was received, so a
        // checkpoint taken after the final short page is exact.
        progress.offset += records_count as u64;

        if records_count < self.page_size as usize {
            progress.mark_done();
            return None;
        }

        let next = previous
            .clone()
            .query(&self.offset_param, progress.offset.to_string())
            .query(&self.limit_param, self.page_size.to_string());
        Some(next)
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination (traditional web pagination)
///
/// Common patterns:
/// - `?page=2`
/// - `?page=2&per_page=50`
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    /// Query parameter name for page number
    pub page_param: String,
    /// First page number (usually 0 or 1)
    pub start_page: u32,
    /// Optional page size parameter name
    pub page_size_param: Option<String>,
    /// Page size value
    pub page_size: u32,
    /// Path to an explicit has-more flag, if the API provides one
    pub has_more_path: Option<String>,
}

impl PageNumberPaginator {
    fn current_page(&self, progress: &PageProgress) -> u32 {
        if progress.page == 0 {
            self.start_page
        } else {
            progress.page
        }
    }
}

impl Paginator for PageNumberPaginator {
    fn initial_params(&self, progress: &PageProgress) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.page_param.clone(), self.current_page(progress).to_string());
        if let Some(param) = &self.page_size_param {
            params.insert(param.clone(), self.page_size.to_string());
        }
        params
    }

    fn next_request(
        &self,
        response: &PageResponse,
        previous: &PageRequest,
        records_count: usize,
        progress: &mut PageProgress,
    ) -> Option<PageRequest> {
        progress.add_fetched(records_count as u64);

        if records_count == 0 || records_count < self.page_size as usize {
            progress.mark_done();
            return None;
        }

        // Explicit has-more signal wins over page-size heuristics;
        // a missing flag means no more pages.
        if let Some(path) = &self.has_more_path {
            let has_more = extract_value(&response.body, path)
                .and_then(|v| v.as_bool().or_else(|| v.as_str().map(|s| s == "true")));
            if has_more != Some(true) {
                progress.mark_done();
                return None;
            }
        }

        progress.page = self.current_page(progress) + 1;

        let mut next = previous
            .clone()
            .query(&self.page_param, progress.page.to_string());
        if let Some(param) = &self.page_size_param {
            next = next.query(param, self.page_size.to_string());
        }
        Some(next)
    }
}

// ============================================================================
// Cursor (Keyset) Pagination
// ============================================================================

/// Cursor-based pagination (e.g., Stripe, Slack)
///
/// Extracts a cursor token from the response envelope; terminates when no
/// cursor is returned. Common patterns:
/// - `?starting_after=obj_123`
/// - `?cursor=abc123`
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter name for cursor
    pub cursor_param: String,
    /// Path to extract the cursor from the response
    pub cursor_path: String,
}

impl Paginator for CursorPaginator {
    fn initial_params(&self, progress: &PageProgress) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(cursor) = &progress.cursor {
            params.insert(self.cursor_param.clone(), cursor.clone());
        }
        params
    }

    fn next_request(
        &self,
        response: &PageResponse,
        previous: &PageRequest,
        records_count: usize,
        progress: &mut PageProgress,
    ) -> Option<PageRequest> {
        progress.add_fetched(records_count as u64);

        if records_count == 0 {
            progress.mark_done();
            return None;
        }

        match extract_string(&response.body, &self.cursor_path) {
            Some(cursor) if !cursor.is_empty() => {
                progress.cursor = Some(cursor.clone());
                Some(previous.clone().query(&self.cursor_param, cursor))
            }
            _ => {
                progress.mark_done();
                None
            }
        }
    }
}

// ============================================================================
// Next Link Pagination
// ============================================================================

/// Next-link pagination
///
/// Follows a literal URL from the response body, or from the `Link` header
/// (RFC 5988, rel="next") when no body path is configured. Terminates when
/// the link is absent.
#[derive(Debug, Clone)]
pub struct NextLinkPaginator {
    /// Path to the next URL in the response body; None means Link header
    pub path: Option<String>,
}

impl Paginator for NextLinkPaginator {
    fn initial_params(&self, _progress: &PageProgress) -> HashMap<String, String> {
        HashMap::new()
    }

    fn next_request(
        &self,
        response: &PageResponse,
        previous: &PageRequest,
        records_count: usize,
        progress: &mut PageProgress,
    ) -> Option<PageRequest> {
        progress.add_fetched(records_count as u64);

        let next_url = match &self.path {
            Some(path) => extract_string(&response.body, path),
            None => response
                .header("link")
                .and_then(|h| parse_link_header(h, "next")),
        };

        match next_url {
            Some(url) if !url.is_empty() => {
                progress.next_url = Some(url.clone());
                Some(previous.clone().with_url(url))
            }
            _ => {
                progress.mark_done();
                None
            }
        }
    }
}

/// Parse a Link header and extract the URL for the given rel
fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // Link header format: <url>; rel="next", <url>; rel="prev"
    for part in header.split(',') {
        let part = part.trim();
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(stripped) = segment.strip_prefix("rel=") {
                rel = Some(stripped.trim_matches('"').trim_matches('\''));
            }
        }

        if let (Some(u), Some(r)) = (url, rel) {
            if r == target_rel {
                return Some(u.to_string());
            }
        }
    }

    None
}

// ============================================================================
// Single Page
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct SinglePage;

impl Paginator for SinglePage {
    fn initial_params(&self, _progress: &PageProgress) -> HashMap<String, String> {
        HashMap::new()
    }

    fn next_request(
        &self,
        _response: &PageResponse,
        _previous: &PageRequest,
        records_count: usize,
        progress: &mut PageProgress,
    ) -> Option<PageRequest> {
        progress.add_fetched(records_count as u64);
        progress.mark_done();
        None
    }
}
