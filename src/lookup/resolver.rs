//! Depth-first lookup resolution

use super::matcher::{bind_variables, match_entities};
use super::query::LookupQuery;
use super::types::{ChildLink, ExpandMarker, LookupStats};
use crate::error::{Error, Result};
use crate::iterator::{CancellationFlag, DataIterator};
use crate::types::{JsonValue, StringMap};
use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

/// Where the resolver finds endpoints
pub trait EndpointSource: Send + Sync {
    /// Declared link from `parent` to `child`
    fn child_link(&self, parent: &str, child: &str) -> Result<ChildLink>;

    /// Open an iterator over an endpoint with template bindings
    fn open(
        &self,
        endpoint: &str,
        bindings: &StringMap,
        cancel: &CancellationFlag,
    ) -> Result<DataIterator>;

    /// Record path of an endpoint's documents
    fn record_path(&self, endpoint: &str) -> Option<String>;
}

/// Runs nested lookup queries and attaches their results onto records
pub struct LookupResolver<'a> {
    source: &'a dyn EndpointSource,
    cancel: CancellationFlag,
    live: bool,
}

impl<'a> LookupResolver<'a> {
    /// Create a resolver
    pub fn new(source: &'a dyn EndpointSource, cancel: CancellationFlag) -> Self {
        Self {
            source,
            cancel,
            live: true,
        }
    }

    /// Preview mode fetches only the first page of every nested query
    #[must_use]
    pub fn with_live_mode(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    /// Resolve `query` for one record of `parent`.
    ///
    /// Missing endpoints and match paths that select nothing are logged and
    /// skipped. Fetch failures of a nested query abort the resolution.
    pub fn resolve<'b>(
        &'b self,
        record: &'b mut JsonValue,
        parent: &'b str,
        query: &'b LookupQuery,
    ) -> BoxFuture<'b, Result<LookupStats>> {
        async move {
            let mut stats = LookupStats::default();
            if self.cancel.is_cancelled() {
                return Ok(stats);
            }

            let link = match self.source.child_link(parent, &query.endpoint) {
                Ok(link) => link,
                Err(e) => {
                    warn!("Skipping lookup: {e}");
                    stats.skipped += 1;
                    return Ok(stats);
                }
            };

            let entities = match_entities(record, &link.match_path).unwrap_or_default();
            if entities.is_empty() {
                let e = Error::UnresolvedMatchPath {
                    endpoint: query.endpoint.clone(),
                    path: link.match_path.clone(),
                };
                debug!("Skipping lookup: {e}");
                stats.skipped += 1;
                return Ok(stats);
            }

            for entity in entities {
                if self.cancel.is_cancelled() {
                    break;
                }
                if !entity.is_object() {
                    debug!(
                        "Skipping non-object match for lookup '{}'",
                        query.endpoint
                    );
                    stats.skipped += 1;
                    continue;
                }
                let Some(bindings) = bind_variables(entity, &link.bind) else {
                    debug!(
                        "Skipping lookup '{}': bound fields missing on match",
                        query.endpoint
                    );
                    stats.skipped += 1;
                    continue;
                };

                let Some(items) = self.fetch_all(query, &bindings, &mut stats).await? else {
                    if !self.cancel.is_cancelled() {
                        stats.skipped += 1;
                    }
                    continue;
                };

                stats.records += items.len();
                let value = if query.expand {
                    ExpandMarker::new(query.flatten_levels, items).into_value()
                } else {
                    JsonValue::Array(items)
                };
                if let JsonValue::Object(map) = entity {
                    map.insert(query.endpoint.clone(), value);
                }
            }

            Ok(stats)
        }
        .boxed()
    }

    /// Run a nested query to completion, resolving deeper lookups first.
    ///
    /// `None` when the query could not be opened or was cancelled midway.
    async fn fetch_all(
        &self,
        query: &LookupQuery,
        bindings: &StringMap,
        stats: &mut LookupStats,
    ) -> Result<Option<Vec<JsonValue>>> {
        let mut iter = match self.source.open(&query.endpoint, bindings, &self.cancel) {
            Ok(iter) => iter,
            Err(e) => {
                warn!("Skipping lookup '{}': {e}", query.endpoint);
                return Ok(None);
            }
        };
        iter.set_lookup(true);
        iter.set_live_mode(self.live);
        stats.queries += 1;

        let record_path = self.source.record_path(&query.endpoint);
        let mut items = Vec::new();

        while iter.has_next() {
            let Some(document) = iter.next().await? else {
                continue;
            };
            let mut records = iter.transformer().records(&document, record_path.as_deref());

            if let Some(child) = &query.child {
                for record in &mut records {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    let nested = self.resolve(record, &query.endpoint, child).await?;
                    stats.merge(nested);
                }
            }
            items.extend(records);
        }
        iter.close();

        if self.cancel.is_cancelled() {
            debug!(endpoint = %query.endpoint, "Lookup cancelled, discarding partial results");
            return Ok(None);
        }

        debug!(
            endpoint = %query.endpoint,
            records = items.len(),
            pages = iter.pages_fetched(),
            "Lookup complete"
        );
        Ok(Some(items))
    }
}
