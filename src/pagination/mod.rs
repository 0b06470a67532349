//! Pagination strategies
//!
//! Four strategies behind one trait: offset, page number, cursor/keyset,
//! and next-link. Every strategy terminates on an empty first page and can
//! be resumed from a persisted mid-sync position.

mod strategies;
mod types;


pub use strategies::{
    build_paginator, CursorPaginator, NextLinkPaginator, OffsetPaginator, PageNumberPaginator,
    SinglePage,
};
pub use types::{PageProgress, Paginator};
