//! Nested lookup queries built from a chain

use super::types::LookupChain;

/// Caller flags applied to the deepest lookup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Wrap results in an expand marker
    pub expand: bool,
    /// Collapse only the first nesting level when flattening
    pub top_level_only: bool,
}

/// One level of a nested lookup; owns the next deeper level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    /// Endpoint queried at this level
    pub endpoint: String,
    /// Attach results inside an expand marker
    pub expand: bool,
    /// Caller asked for top-level flattening only
    pub top_level_only: bool,
    /// Levels the flattening stage collapses; 0 flattens fully
    pub flatten_levels: u32,
    /// Query run for each record this level returns
    pub child: Option<Box<LookupQuery>>,
}

impl LookupQuery {
    /// Number of levels from this query down
    pub fn depth(&self) -> usize {
        1 + self.child.as_ref().map_or(0, |c| c.depth())
    }

    /// Endpoint names from this query down
    pub fn endpoints(&self) -> Vec<&str> {
        let mut names = vec![self.endpoint.as_str()];
        let mut current = self.child.as_deref();
        while let Some(query) = current {
            names.push(query.endpoint.as_str());
            current = query.child.as_deref();
        }
        names
    }
}

/// Build one query per chain level, outermost first.
///
/// Only the deepest query takes the caller's flags; every ancestor is
/// expanded with zero flatten levels.
pub fn build_lookup_query(chain: &LookupChain, options: LookupOptions) -> Option<LookupQuery> {
    let mut names = chain.entries().iter().rev();
    let deepest = names.next()?;

    let mut query = LookupQuery {
        endpoint: deepest.clone(),
        expand: options.expand,
        top_level_only: options.top_level_only,
        flatten_levels: u32::from(options.top_level_only),
        child: None,
    };
    for name in names {
        query = LookupQuery {
            endpoint: name.clone(),
            expand: true,
            top_level_only: false,
            flatten_levels: 0,
            child: Some(Box::new(query)),
        };
    }
    Some(query)
}
