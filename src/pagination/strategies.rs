//! Pagination strategy implementations
//!
//! Each pagination type is one variant of a closed enum. A strategy builds
//! the next request from the run's [`FetchState`], advances that state from
//! the page just fetched, and decides when the run is complete.

use super::types::{
    as_integer, is_empty_scalar, is_truthy, scalar_to_string, FetchState, FetchedPage,
    PaginationSpec, PaginationType, ParameterDescriptor, ParameterKind,
};
use crate::error::{Error, Result};
use crate::http::Request;
use crate::types::JsonValue;
use tracing::{debug, warn};

/// How a role may be configured for a pagination type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Usage {
    Required,
    Optional,
    Unused,
}

/// Kinds a write role may use
const WRITE_KINDS: &[ParameterKind] = &[ParameterKind::QueryParam, ParameterKind::JsonPath];
/// Kinds a read role may use
const READ_KINDS: &[ParameterKind] = &[ParameterKind::JsonPath, ParameterKind::XPath];
/// Kinds the link role may use
const LINK_KINDS: &[ParameterKind] = &[ParameterKind::LinkHeaderRelation];

fn role_usage(pagination_type: PaginationType, role: &str) -> Usage {
    use PaginationType as T;

    let required = match role {
        "page_number" => matches!(
            pagination_type,
            T::PageCount | T::Page | T::TotalCountAndPage
        ),
        "total_pages" => pagination_type == T::PageCount,
        "record_count" => pagination_type == T::Page,
        "offset_read" => pagination_type == T::Iteration,
        "offset_write" => matches!(pagination_type, T::Iteration | T::TotalCountAndOffset),
        "link_relation" => pagination_type == T::LinkIteration,
        "total_count" => matches!(
            pagination_type,
            T::TotalCountAndOffset | T::TotalCountAndPage
        ),
        _ => false,
    };
    if required {
        return Usage::Required;
    }

    let optional = match role {
        "page_size" => !matches!(pagination_type, T::None | T::LinkIteration),
        "has_next" => pagination_type == T::Iteration,
        _ => false,
    };
    if optional {
        Usage::Optional
    } else {
        Usage::Unused
    }
}

fn allowed_kinds(role: &str) -> &'static [ParameterKind] {
    match role {
        "page_number" | "page_size" | "offset_write" => WRITE_KINDS,
        "link_relation" => LINK_KINDS,
        _ => READ_KINDS,
    }
}

/// Request/termination algorithm of one pagination type
#[derive(Debug, Clone, PartialEq)]
enum Algorithm {
    None,
    PageCount {
        page_number: ParameterDescriptor,
        total_pages: ParameterDescriptor,
    },
    Page {
        page_number: ParameterDescriptor,
        record_count: ParameterDescriptor,
    },
    Iteration {
        offset_write: ParameterDescriptor,
        offset_read: ParameterDescriptor,
        has_next: Option<ParameterDescriptor>,
    },
    LinkIteration {
        relation: String,
    },
    TotalCountAndOffset {
        offset_write: ParameterDescriptor,
        total_count: ParameterDescriptor,
    },
    TotalCountAndPage {
        page_number: ParameterDescriptor,
        total_count: ParameterDescriptor,
    },
}

/// A validated pagination strategy
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationStrategy {
    algorithm: Algorithm,
    page_size: Option<ParameterDescriptor>,
    max_results_per_page: u32,
    first_page: i64,
    zero_based: bool,
}

impl Default for PaginationStrategy {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::None,
            page_size: None,
            max_results_per_page: 0,
            first_page: 1,
            zero_based: false,
        }
    }
}

impl PaginationStrategy {
    /// Single-request strategy
    pub fn none() -> Self {
        Self::default()
    }

    /// Validate a spec and build its strategy.
    ///
    /// Fails when a required role is unset, a role the type does not use is
    /// set, a role uses a kind it cannot use, or the page size is missing
    /// where offsets or totals depend on it.
    pub fn from_spec(spec: &PaginationSpec) -> Result<Self> {
        let pagination_type = spec.pagination_type;

        for (role, descriptor) in spec.roles() {
            let field = format!("pagination.{role}");
            match (role_usage(pagination_type, role), descriptor) {
                (Usage::Required, None) => return Err(Error::missing_field(field)),
                (Usage::Unused, Some(_)) => {
                    return Err(Error::invalid_value(
                        field,
                        format!("not used by {pagination_type} pagination"),
                    ))
                }
                (_, Some(descriptor)) => validate_descriptor(&field, role, descriptor)?,
                _ => {}
            }
        }

        let needs_page_size = matches!(
            pagination_type,
            PaginationType::TotalCountAndOffset | PaginationType::TotalCountAndPage
        ) || spec.page_size.is_some();
        if needs_page_size && spec.max_results_per_page == 0 {
            return Err(Error::invalid_value(
                "pagination.max_results_per_page",
                format!("must be greater than 0 for {pagination_type} pagination"),
            ));
        }

        let role = |descriptor: &Option<ParameterDescriptor>, name: &str| {
            descriptor
                .clone()
                .ok_or_else(|| Error::missing_field(format!("pagination.{name}")))
        };

        let algorithm = match pagination_type {
            PaginationType::None => Algorithm::None,
            PaginationType::PageCount => Algorithm::PageCount {
                page_number: role(&spec.page_number, "page_number")?,
                total_pages: role(&spec.total_pages, "total_pages")?,
            },
            PaginationType::Page => Algorithm::Page {
                page_number: role(&spec.page_number, "page_number")?,
                record_count: role(&spec.record_count, "record_count")?,
            },
            PaginationType::Iteration => Algorithm::Iteration {
                offset_write: role(&spec.offset_write, "offset_write")?,
                offset_read: role(&spec.offset_read, "offset_read")?,
                has_next: spec.has_next.clone(),
            },
            PaginationType::LinkIteration => Algorithm::LinkIteration {
                relation: role(&spec.link_relation, "link_relation")?.name,
            },
            PaginationType::TotalCountAndOffset => Algorithm::TotalCountAndOffset {
                offset_write: role(&spec.offset_write, "offset_write")?,
                total_count: role(&spec.total_count, "total_count")?,
            },
            PaginationType::TotalCountAndPage => Algorithm::TotalCountAndPage {
                page_number: role(&spec.page_number, "page_number")?,
                total_count: role(&spec.total_count, "total_count")?,
            },
        };

        let zero_based = spec.zero_based_page_index;
        let first_page = spec
            .first_page_index
            .unwrap_or(if zero_based { 0 } else { 1 });

        Ok(Self {
            algorithm,
            page_size: spec.page_size.clone(),
            max_results_per_page: spec.max_results_per_page,
            first_page,
            zero_based,
        })
    }

    /// Pagination type of this strategy
    pub fn pagination_type(&self) -> PaginationType {
        match self.algorithm {
            Algorithm::None => PaginationType::None,
            Algorithm::PageCount { .. } => PaginationType::PageCount,
            Algorithm::Page { .. } => PaginationType::Page,
            Algorithm::Iteration { .. } => PaginationType::Iteration,
            Algorithm::LinkIteration { .. } => PaginationType::LinkIteration,
            Algorithm::TotalCountAndOffset { .. } => PaginationType::TotalCountAndOffset,
            Algorithm::TotalCountAndPage { .. } => PaginationType::TotalCountAndPage,
        }
    }

    /// Fresh state for a new run
    pub fn initial_state(&self) -> FetchState {
        FetchState::starting_at(self.first_page)
    }

    /// Build the next request from the base request of the run
    pub fn build_next_request(&self, state: &FetchState, base: &Request) -> Request {
        let mut request = base.clone();

        match &self.algorithm {
            Algorithm::None => {}
            Algorithm::PageCount { page_number, .. }
            | Algorithm::Page { page_number, .. }
            | Algorithm::TotalCountAndPage { page_number, .. } => {
                write_parameter(&mut request, page_number, JsonValue::from(state.page));
            }
            Algorithm::Iteration { offset_write, .. } => {
                if let Some(cursor) = &state.cursor {
                    write_parameter(&mut request, offset_write, cursor.clone());
                }
            }
            Algorithm::LinkIteration { .. } => {
                if let Some(next_url) = &state.next_url {
                    request.url.clone_from(next_url);
                    request.query.clear();
                }
            }
            Algorithm::TotalCountAndOffset { offset_write, .. } => {
                if state.fetches > 0 {
                    write_parameter(&mut request, offset_write, JsonValue::from(state.offset));
                }
            }
        }

        if let Some(page_size) = &self.page_size {
            write_parameter(
                &mut request,
                page_size,
                JsonValue::from(self.max_results_per_page),
            );
        }

        request
    }

    /// Advance the state from the page just fetched
    pub fn update_state(&self, state: &mut FetchState, page: &FetchedPage<'_>) {
        let first_fetch = state.fetches == 0;
        state.fetches += 1;

        match &self.algorithm {
            Algorithm::None => {}
            Algorithm::PageCount { total_pages, .. } => {
                if first_fetch {
                    state.last_page = page
                        .scalar(total_pages)
                        .as_ref()
                        .and_then(as_integer)
                        .map(|count| if self.zero_based { count.saturating_sub(1) } else { count });
                    debug!(last_page = ?state.last_page, "Read page count");
                }
                state.page += 1;
            }
            Algorithm::Page { .. } => state.page += 1,
            Algorithm::Iteration { offset_read, .. } => {
                let next = page.scalar(offset_read).filter(|value| match value {
                    JsonValue::Null => false,
                    JsonValue::String(s) => !s.trim().is_empty(),
                    _ => true,
                });
                if next.is_some() && next == state.cursor {
                    warn!(
                        "Offset '{}' repeated, stopping pagination",
                        state.cursor.as_ref().map(scalar_to_string).unwrap_or_default()
                    );
                    state.cursor = None;
                } else {
                    state.cursor = next;
                }
            }
            Algorithm::LinkIteration { relation } => {
                state.next_url = page.link(relation);
            }
            Algorithm::TotalCountAndOffset { total_count, .. } => {
                if first_fetch {
                    state.total_count = read_total(page, total_count);
                }
                state.offset += u64::from(self.max_results_per_page);
            }
            Algorithm::TotalCountAndPage { total_count, .. } => {
                if first_fetch {
                    state.total_count = read_total(page, total_count);
                    state.last_page = state.total_count.map(|total| {
                        let per_page = u64::from(self.max_results_per_page.max(1));
                        let pages = i64::try_from(total.div_ceil(per_page)).unwrap_or(i64::MAX);
                        if self.zero_based {
                            pages - 1
                        } else {
                            pages
                        }
                    });
                }
                state.page += 1;
            }
        }
    }

    /// Check whether the run is complete after the page just fetched
    pub fn is_done(&self, state: &FetchState, page: &FetchedPage<'_>) -> bool {
        match &self.algorithm {
            Algorithm::None => true,
            Algorithm::PageCount { .. } | Algorithm::TotalCountAndPage { .. } => {
                state.last_page.map_or(true, |last| state.page > last)
            }
            Algorithm::Page { record_count, .. } => {
                is_empty_scalar(page.scalar(record_count).as_ref())
            }
            Algorithm::Iteration { has_next, .. } => {
                if let Some(has_next) = has_next {
                    if !is_truthy(page.scalar(has_next).as_ref()) {
                        debug!("has_next flag is absent or false");
                        return true;
                    }
                }
                state.cursor.is_none()
            }
            Algorithm::LinkIteration { .. } => state.next_url.is_none(),
            Algorithm::TotalCountAndOffset { .. } => {
                state.total_count.map_or(true, |total| state.offset >= total)
            }
        }
    }

    /// Update the state and mark it done when the run is complete
    pub fn advance(&self, state: &mut FetchState, page: &FetchedPage<'_>) {
        self.update_state(state, page);
        if self.is_done(state, page) {
            state.mark_done();
        }
    }
}

fn validate_descriptor(field: &str, role: &str, descriptor: &ParameterDescriptor) -> Result<()> {
    if descriptor.name.trim().is_empty() {
        return Err(Error::invalid_value(
            format!("{field}.name"),
            "must not be empty",
        ));
    }
    let allowed = allowed_kinds(role);
    if !allowed.contains(&descriptor.kind) {
        let names: Vec<String> = allowed.iter().map(ToString::to_string).collect();
        return Err(Error::invalid_value(
            format!("{field}.kind"),
            format!("{} is not allowed, expected {}", descriptor.kind, names.join(" or ")),
        ));
    }
    Ok(())
}

fn read_total(page: &FetchedPage<'_>, total_count: &ParameterDescriptor) -> Option<u64> {
    let total = page
        .scalar(total_count)
        .as_ref()
        .and_then(as_integer)
        .map(|total| u64::try_from(total).unwrap_or(0));
    debug!(total = ?total, "Read total count");
    total
}

/// Write a pagination value onto a request
fn write_parameter(request: &mut Request, descriptor: &ParameterDescriptor, value: JsonValue) {
    match descriptor.kind {
        ParameterKind::QueryParam => request.set_query(&descriptor.name, scalar_to_string(&value)),
        ParameterKind::JsonPath => request.merge_body(&descriptor.name, value),
        ParameterKind::XPath | ParameterKind::LinkHeaderRelation => {
            warn!(
                "Cannot write pagination value through a {} parameter",
                descriptor.kind
            );
        }
    }
}
