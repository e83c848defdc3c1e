//! Exhaustive paging over key-value queries and scans.
//!
//! [`PagingClient`] decorates any [`KeyValueIO`]. Every request it forwards
//! gets the client's default `consistent_read` unless the request sets its
//! own. On top of that it offers:
//!
//! - [`PagingClient::query_pages`] / [`PagingClient::scan_pages`] - lazy
//!   iterators yielding one page of items per request
//! - [`PagingClient::query_all`] / [`PagingClient::scan_all`] - every item of
//!   every page, in order
//! - [`PagingClient::query_all_pager`] / [`PagingClient::scan_all_pager`] -
//!   hand each page to a callback before the next page is requested
//!
//! A page whose `items` field is absent counts as an empty page. Paging stops
//! when a page has no continuation key.

use crate::io::cloud::traits::{CloudIOError, CloudResult, KeyValueIO, QueryPage, QueryRequest};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while paging
#[derive(Debug, Error)]
pub enum PagingError {
    #[error("page request failed: {0}")]
    Query(#[source] CloudIOError),

    /// The page callback returned an error; no further page was requested.
    #[error("page callback failed: {0}")]
    Callback(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Query,
    Scan,
}

/// Paging decorator over a key-value store
#[derive(Clone)]
pub struct PagingClient {
    inner: Arc<dyn KeyValueIO>,
    consistent_read: Option<bool>,
}

impl PagingClient {
    pub fn new(inner: Arc<dyn KeyValueIO>) -> Self {
        Self {
            inner,
            consistent_read: None,
        }
    }

    /// Apply `consistent_read` to every request that does not choose for itself.
    #[must_use]
    pub const fn with_consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }

    fn prepare<'r>(&self, request: &'r QueryRequest) -> Cow<'r, QueryRequest> {
        match (self.consistent_read, request.consistent_read) {
            (Some(default), None) => {
                let mut owned = request.clone();
                owned.consistent_read = Some(default);
                Cow::Owned(owned)
            }
            _ => Cow::Borrowed(request),
        }
    }

    /// Lazily walk every page of a query.
    #[must_use]
    pub const fn query_pages(&self, request: QueryRequest) -> Pages<'_> {
        Pages::new(self, Operation::Query, request)
    }

    /// Lazily walk every page of a scan.
    #[must_use]
    pub const fn scan_pages(&self, request: QueryRequest) -> Pages<'_> {
        Pages::new(self, Operation::Scan, request)
    }

    /// Every item matched by a query, across all pages.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::Query`] on the first failed page request
    pub fn query_all(&self, request: QueryRequest) -> Result<Vec<Value>, PagingError> {
        collect_all(self.query_pages(request))
    }

    /// Every item of a scan, across all pages.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::Query`] on the first failed page request
    pub fn scan_all(&self, request: QueryRequest) -> Result<Vec<Value>, PagingError> {
        collect_all(self.scan_pages(request))
    }

    /// Hand each page of a query to `on_page`, one at a time.
    ///
    /// The callback runs for every page, including an empty first page, and
    /// the next page is only requested once it returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::Query`] if a page request fails, or
    /// [`PagingError::Callback`] if the callback does
    pub fn query_all_pager<F>(&self, request: QueryRequest, on_page: F) -> Result<(), PagingError>
    where
        F: FnMut(Vec<Value>) -> anyhow::Result<()>,
    {
        drive(self.query_pages(request), on_page)
    }

    /// Hand each page of a scan to `on_page`, one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`PagingError::Query`] if a page request fails, or
    /// [`PagingError::Callback`] if the callback does
    pub fn scan_all_pager<F>(&self, request: QueryRequest, on_page: F) -> Result<(), PagingError>
    where
        F: FnMut(Vec<Value>) -> anyhow::Result<()>,
    {
        drive(self.scan_pages(request), on_page)
    }
}

impl KeyValueIO for PagingClient {
    fn query(&self, request: &QueryRequest) -> CloudResult<QueryPage> {
        self.inner.query(&self.prepare(request))
    }

    fn scan(&self, request: &QueryRequest) -> CloudResult<QueryPage> {
        self.inner.scan(&self.prepare(request))
    }
}

fn collect_all(pages: Pages<'_>) -> Result<Vec<Value>, PagingError> {
    let mut items = Vec::new();
    for page in pages {
        items.extend(page.map_err(PagingError::Query)?);
    }
    Ok(items)
}

fn drive<F>(pages: Pages<'_>, mut on_page: F) -> Result<(), PagingError>
where
    F: FnMut(Vec<Value>) -> anyhow::Result<()>,
{
    for page in pages {
        let items = page.map_err(PagingError::Query)?;
        on_page(items).map_err(PagingError::Callback)?;
    }
    Ok(())
}

/// Lazy page iterator returned by [`PagingClient::query_pages`] and
/// [`PagingClient::scan_pages`].
///
/// Each `next` issues exactly one request. After a failed request or a page
/// without a continuation key the iterator is exhausted.
pub struct Pages<'a> {
    client: &'a PagingClient,
    operation: Operation,
    request: QueryRequest,
    fetched: usize,
    done: bool,
}

impl<'a> Pages<'a> {
    const fn new(client: &'a PagingClient, operation: Operation, request: QueryRequest) -> Self {
        Self {
            client,
            operation,
            request,
            fetched: 0,
            done: false,
        }
    }
}

impl Iterator for Pages<'_> {
    type Item = CloudResult<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = match self.operation {
            Operation::Query => self.client.query(&self.request),
            Operation::Scan => self.client.scan(&self.request),
        };

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        self.fetched += 1;
        let items = page.items.unwrap_or_default();
        let has_more = page.last_evaluated_key.is_some();
        debug!(
            table = %self.request.table_name,
            page = self.fetched,
            items = items.len(),
            has_more,
            "fetched page"
        );

        match page.last_evaluated_key {
            Some(key) => self.request.exclusive_start_key = Some(key),
            None => self.done = true,
        }
        Some(Ok(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::cloud::fake::FakeKeyValueIO;
    use crate::io::cloud::traits::ErrorKind;
    use serde_json::json;

    fn page(items: Option<Vec<Value>>, next: Option<Value>) -> CloudResult<QueryPage> {
        Ok(QueryPage {
            items,
            last_evaluated_key: next,
        })
    }

    #[test]
    fn test_pages_are_lazy() {
        let fake = FakeKeyValueIO::new();
        fake.push_query(page(Some(vec![json!(1)]), Some(json!({"id": 1}))));
        fake.push_query(page(Some(vec![json!(2)]), None));
        let client = PagingClient::new(Arc::new(fake.clone()));

        let mut pages = client.query_pages(QueryRequest::new("t"));
        assert_eq!(fake.requests().len(), 0);
        assert_eq!(pages.next().unwrap().unwrap(), vec![json!(1)]);
        assert_eq!(fake.requests().len(), 1);
        assert_eq!(pages.next().unwrap().unwrap(), vec![json!(2)]);
        assert!(pages.next().is_none());
        assert_eq!(fake.requests().len(), 2);
        assert_eq!(fake.requests()[1].exclusive_start_key, Some(json!({"id": 1})));
    }

    #[test]
    fn test_error_ends_iteration() {
        let fake = FakeKeyValueIO::new();
        fake.push_scan(Err(CloudIOError::new(ErrorKind::Timeout, "slow")));
        let client = PagingClient::new(Arc::new(fake.clone()));

        let mut pages = client.scan_pages(QueryRequest::new("t"));
        assert_eq!(pages.next().unwrap().unwrap_err().kind, ErrorKind::Timeout);
        assert!(pages.next().is_none());
        assert_eq!(fake.requests().len(), 1);
    }

    #[test]
    fn test_consistent_read_injection() {
        let fake = FakeKeyValueIO::new();
        fake.push_query(page(Some(vec![]), None));
        fake.push_query(page(Some(vec![]), None));
        let client = PagingClient::new(Arc::new(fake.clone())).with_consistent_read(true);

        client.query_all(QueryRequest::new("t")).unwrap();
        let mut explicit = QueryRequest::new("t");
        explicit.consistent_read = Some(false);
        client.query_all(explicit).unwrap();

        let requests = fake.requests();
        assert_eq!(requests[0].consistent_read, Some(true));
        assert_eq!(requests[1].consistent_read, Some(false));
    }

    #[test]
    fn test_no_default_leaves_request_untouched() {
        let fake = FakeKeyValueIO::new();
        fake.push_scan(page(None, None));
        let client = PagingClient::new(Arc::new(fake.clone()));

        assert!(client.scan_all(QueryRequest::new("t")).unwrap().is_empty());
        assert_eq!(fake.requests()[0].consistent_read, None);
    }
}
