//! Page iteration module
//!
//! [`DataIterator`] drives one paginated run: it asks the strategy for the
//! next request, executes it, parses the body and feeds the page back into
//! the strategy. Exactly one request is outstanding at a time and pages are
//! returned in fetch order.

mod types;

pub use types::CancellationFlag;

use crate::decode::{Document, ResponseTransformer};
use crate::error::{Error, Result};
use crate::http::{Request, RequestExecutor};
use crate::pagination::{FetchState, FetchedPage, PaginationStrategy};
use std::sync::Arc;
use tracing::debug;

/// Sequential page iterator over one endpoint
pub struct DataIterator {
    executor: Arc<dyn RequestExecutor>,
    transformer: Arc<dyn ResponseTransformer>,
    base: Request,
    strategy: PaginationStrategy,
    state: FetchState,
    cancel: CancellationFlag,
    live: bool,
    lookup: bool,
    closed: bool,
}

impl DataIterator {
    /// Create an iterator; no request is made until [`Self::next`]
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        transformer: Arc<dyn ResponseTransformer>,
        base: Request,
        strategy: PaginationStrategy,
        cancel: CancellationFlag,
    ) -> Self {
        let state = strategy.initial_state();
        Self {
            executor,
            transformer,
            base,
            strategy,
            state,
            cancel,
            live: true,
            lookup: false,
            closed: false,
        }
    }

    /// Check whether another page may be fetched
    pub fn has_next(&self) -> bool {
        !self.closed && !self.state.done && !self.cancel.is_cancelled()
    }

    /// Fetch the next page.
    ///
    /// Returns `None` for an empty body or once iteration has ended. A fetch
    /// failure closes the iterator and is returned, unless cancellation was
    /// already requested, in which case iteration just ends.
    pub async fn next(&mut self) -> Result<Option<Document>> {
        if self.cancel.is_cancelled() {
            debug!("Cancelled before fetching page {}", self.state.fetches + 1);
            self.close();
            return Ok(None);
        }
        if !self.has_next() {
            return Ok(None);
        }

        let request = self.strategy.build_next_request(&self.state, &self.base);
        let url = request.full_url();
        debug!(
            page = self.state.fetches + 1,
            lookup = self.lookup,
            "{} {}",
            request.method,
            url
        );

        let response = match self.executor.execute(&request).await {
            Ok(response) => response,
            Err(e) => return self.fail(e),
        };
        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body).into_owned();
            return self.fail(Error::http_status(response.status, body));
        }
        let document = match self.transformer.parse(&response.body) {
            Ok(document) => document,
            Err(e) => return self.fail(e),
        };

        let page = FetchedPage {
            document: document.as_ref(),
            headers: &response.headers,
            url: &url,
            transformer: self.transformer.as_ref(),
        };
        self.strategy.advance(&mut self.state, &page);
        drop(response);

        if !self.live && !self.state.done {
            debug!("Preview mode, stopping after the first page");
            self.state.mark_done();
        }
        debug!(
            fetches = self.state.fetches,
            done = self.state.done,
            "Page fetched"
        );

        Ok(document)
    }

    fn fail(&mut self, error: Error) -> Result<Option<Document>> {
        self.close();
        if self.cancel.is_cancelled() {
            debug!("Ignoring fetch failure after cancellation: {error}");
            return Ok(None);
        }
        Err(error)
    }

    /// Stop iterating; safe to call repeatedly
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.cursor = None;
            self.state.next_url = None;
            self.state.mark_done();
        }
    }

    /// Live mode off fetches only the first page
    pub fn set_live_mode(&mut self, live: bool) {
        self.live = live;
    }

    /// Mark this iterator as servicing a nested lookup
    pub fn set_lookup(&mut self, lookup: bool) {
        self.lookup = lookup;
    }

    /// Check whether this iterator services a nested lookup
    pub fn is_lookup(&self) -> bool {
        self.lookup
    }

    /// Check whether the iterator has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of completed fetches
    pub fn pages_fetched(&self) -> u32 {
        self.state.fetches
    }

    /// Current pagination state
    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Transformer used for this iterator's pages
    pub fn transformer(&self) -> &dyn ResponseTransformer {
        self.transformer.as_ref()
    }
}

impl std::fmt::Debug for DataIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataIterator")
            .field("url", &self.base.url)
            .field("pagination", &self.strategy.pagination_type())
            .field("state", &self.state)
            .field("live", &self.live)
            .field("lookup", &self.lookup)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
