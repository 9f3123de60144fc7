//! Pagination module
//!
//! Supports: NONE, PAGE_COUNT, PAGE, ITERATION, LINK_ITERATION,
//! TOTAL_COUNT_AND_OFFSET, TOTAL_COUNT_AND_PAGE
//!
//! # Overview
//!
//! A [`PaginationSpec`] declares how an endpoint pages; it is validated into
//! a [`PaginationStrategy`] before any request is made. The strategy builds
//! each request from the run's [`FetchState`] and reads its counters back
//! from every [`FetchedPage`].

mod strategies;
mod types;

pub use strategies::PaginationStrategy;
pub use types::{
    as_integer, is_empty_scalar, is_truthy, parse_link_header, scalar_to_string, FetchState,
    FetchedPage, PaginationSpec, PaginationType, ParameterDescriptor, ParameterKind,
};
