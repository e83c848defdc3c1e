//! Fake implementations for testing.
//!
//! These implementations use in-memory data structures to simulate cloud services,
//! making them ideal for unit testing without external dependencies. Each fake
//! records the calls it receives and can be told to fail, so tests can assert on
//! exactly what a wrapper asked the service to do.

use crate::io::cloud::traits::{
    CloudIOError, CloudResult, DeleteEntry, ErrorKind, KeyValueIO, ObjectIO, PutOptions,
    QueryPage, QueryRequest, QueueIO, QueueMessage, ReceiveRequest, SendReceipt, TopicIO,
    TopicMessage, WireMessage,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Type aliases for complex nested types
type BucketStorage = Arc<Mutex<HashMap<String, HashMap<String, StoredObject>>>>;
type QueueStorage = Arc<Mutex<HashMap<String, VecDeque<QueueMessage>>>>;
type PageScript = Arc<Mutex<VecDeque<CloudResult<QueryPage>>>>;

fn unavailable(what: &str) -> CloudIOError {
    CloudIOError::new(
        ErrorKind::ServiceUnavailable,
        format!("{what} is unavailable (injected failure)"),
    )
}

// ============================================================================
// FakeObjectIO
// ============================================================================

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    options: PutOptions,
}

#[derive(Clone, Default)]
pub struct FakeObjectIO {
    storage: BucketStorage,
    puts: Arc<AtomicUsize>,
    gets: Arc<AtomicUsize>,
    fail_puts: Arc<AtomicBool>,
    fail_gets: Arc<AtomicBool>,
}

impl FakeObjectIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent upload fail with `ServiceUnavailable`.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent download fail with `ServiceUnavailable`.
    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Number of `put_object` calls, failed ones included.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Number of `get_object` calls, failed ones included.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Options the object at `bucket`/`key` was uploaded with.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the storage is poisoned.
    #[must_use]
    pub fn put_options(&self, bucket: &str, key: &str) -> Option<PutOptions> {
        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.options.clone())
    }

    /// Every key stored in `bucket`, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the storage is poisoned.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let storage = self.storage.lock().expect("storage mutex poisoned");
        let mut keys: Vec<String> = storage
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default();
        drop(storage);
        keys.sort();
        keys
    }
}

impl ObjectIO for FakeObjectIO {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        options: &PutOptions,
    ) -> CloudResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(unavailable("object store"));
        }

        self.storage
            .lock()
            .expect("storage mutex poisoned")
            .entry(bucket.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.to_vec(),
                    options: options.clone(),
                },
            );
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> CloudResult<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(unavailable("object store"));
        }

        let storage = self.storage.lock().expect("storage mutex poisoned");
        storage
            .get(bucket)
            .and_then(|b| b.get(key))
            .map(|o| o.data.clone())
            .ok_or_else(|| {
                CloudIOError::new(
                    ErrorKind::NotFound,
                    format!("Object {bucket}/{key} not found"),
                )
            })
    }
}

// ============================================================================
// FakeQueueIO
// ============================================================================

/// In-memory queues keyed by queue URL.
///
/// `receive` drains messages in FIFO order and, like the real service, only
/// returns the attributes named in the request (`"All"` returns all of them).
#[derive(Clone, Default)]
pub struct FakeQueueIO {
    queues: QueueStorage,
    sent: Arc<Mutex<Vec<WireMessage>>>,
    receives: Arc<Mutex<Vec<ReceiveRequest>>>,
    deletes: Arc<Mutex<Vec<(String, Vec<DeleteEntry>)>>>,
    visibility_changes: Arc<Mutex<Vec<(String, String, u32)>>>,
    message_counter: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl FakeQueueIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> String {
        let id = self.message_counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("msg-{id}")
    }

    fn check(&self) -> CloudResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("queue service"));
        }
        Ok(())
    }

    /// Make every subsequent call fail with `ServiceUnavailable`.
    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Enqueue a raw message as if another producer had sent it.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the queues is poisoned.
    pub fn inject(&self, queue_url: &str, message: QueueMessage) {
        self.queues
            .lock()
            .expect("queues mutex poisoned")
            .entry(queue_url.to_string())
            .or_default()
            .push_back(message);
    }

    /// Every message handed to `send`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn sent(&self) -> Vec<WireMessage> {
        self.sent.lock().expect("sent mutex poisoned").clone()
    }

    /// Every receive request, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn receive_requests(&self) -> Vec<ReceiveRequest> {
        self.receives.lock().expect("receives mutex poisoned").clone()
    }

    /// Every batch delete as `(queue_url, entries)`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn deletes(&self) -> Vec<(String, Vec<DeleteEntry>)> {
        self.deletes.lock().expect("deletes mutex poisoned").clone()
    }

    /// Every visibility change as `(queue_url, receipt_handle, timeout)`.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn visibility_changes(&self) -> Vec<(String, String, u32)> {
        self.visibility_changes
            .lock()
            .expect("visibility mutex poisoned")
            .clone()
    }

    /// Messages currently waiting in `queue_url`.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the queues is poisoned.
    #[must_use]
    pub fn queue_size(&self, queue_url: &str) -> usize {
        let queues = self.queues.lock().expect("queues mutex poisoned");
        queues.get(queue_url).map_or(0, VecDeque::len)
    }
}

impl QueueIO for FakeQueueIO {
    fn send(&self, message: &WireMessage) -> CloudResult<SendReceipt> {
        self.check()?;
        let msg_id = self.next_id();

        self.sent
            .lock()
            .expect("sent mutex poisoned")
            .push(message.clone());
        self.inject(
            &message.queue_url,
            QueueMessage {
                id: msg_id.clone(),
                receipt_handle: format!("receipt-{msg_id}"),
                body: message.body.clone(),
                attributes: message.attributes.clone(),
                receive_count: 0,
            },
        );

        Ok(SendReceipt {
            message_id: msg_id,
            sequence_number: message.group_id.as_ref().map(|_| "0".to_string()),
        })
    }

    fn receive(&self, request: &ReceiveRequest) -> CloudResult<Vec<QueueMessage>> {
        self.receives
            .lock()
            .expect("receives mutex poisoned")
            .push(request.clone());
        self.check()?;

        let mut queues = self.queues.lock().expect("queues mutex poisoned");
        let q = queues.entry(request.queue_url.clone()).or_default();
        let count = std::cmp::min(request.max_messages as usize, q.len());
        let mut messages: Vec<QueueMessage> = q.drain(0..count).collect();
        drop(queues);

        let all = request.attribute_names.iter().any(|n| n == "All");
        for message in &mut messages {
            message.receive_count += 1;
            if !all {
                message
                    .attributes
                    .retain(|name, _| request.attribute_names.contains(name));
            }
        }
        Ok(messages)
    }

    fn delete_batch(&self, queue_url: &str, entries: &[DeleteEntry]) -> CloudResult<()> {
        self.check()?;
        self.deletes
            .lock()
            .expect("deletes mutex poisoned")
            .push((queue_url.to_string(), entries.to_vec()));
        Ok(())
    }

    fn purge(&self, queue_url: &str) -> CloudResult<()> {
        self.check()?;
        if let Some(q) = self
            .queues
            .lock()
            .expect("queues mutex poisoned")
            .get_mut(queue_url)
        {
            q.clear();
        }
        Ok(())
    }

    fn change_visibility(
        &self,
        queue_url: &str,
        receipt_handle: &str,
        timeout_secs: u32,
    ) -> CloudResult<()> {
        self.check()?;
        self.visibility_changes
            .lock()
            .expect("visibility mutex poisoned")
            .push((queue_url.to_string(), receipt_handle.to_string(), timeout_secs));
        Ok(())
    }
}

// ============================================================================
// FakeKeyValueIO
// ============================================================================

/// Scripted key-value store.
///
/// Query and scan each replay their own queue of responses. A call made after
/// the script is exhausted fails, which catches runaway paging.
#[derive(Clone, Default)]
pub struct FakeKeyValueIO {
    query_pages: PageScript,
    scan_pages: PageScript,
    requests: Arc<Mutex<Vec<QueryRequest>>>,
}

impl FakeKeyValueIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response to `query`.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn push_query(&self, response: CloudResult<QueryPage>) {
        self.query_pages
            .lock()
            .expect("query mutex poisoned")
            .push_back(response);
    }

    /// Queue the next response to `scan`.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    pub fn push_scan(&self, response: CloudResult<QueryPage>) {
        self.scan_pages
            .lock()
            .expect("scan mutex poisoned")
            .push_back(response);
    }

    /// Every request received by `query` or `scan`, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }

    fn next(&self, script: &PageScript, request: &QueryRequest) -> CloudResult<QueryPage> {
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(request.clone());
        script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(CloudIOError::new(
                    ErrorKind::InternalError,
                    format!("no scripted page left for table {}", request.table_name),
                ))
            })
    }
}

impl KeyValueIO for FakeKeyValueIO {
    fn query(&self, request: &QueryRequest) -> CloudResult<QueryPage> {
        self.next(&self.query_pages, request)
    }

    fn scan(&self, request: &QueryRequest) -> CloudResult<QueryPage> {
        self.next(&self.scan_pages, request)
    }
}

// ============================================================================
// FakeTopicIO
// ============================================================================

#[derive(Clone, Default)]
pub struct FakeTopicIO {
    published: Arc<Mutex<Vec<TopicMessage>>>,
    fail: Arc<AtomicBool>,
}

impl FakeTopicIO {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every published message, in order.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<TopicMessage> {
        self.published.lock().expect("published mutex poisoned").clone()
    }
}

impl TopicIO for FakeTopicIO {
    fn publish(&self, message: &TopicMessage) -> CloudResult<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable("topic service"));
        }
        let mut published = self.published.lock().expect("published mutex poisoned");
        published.push(message.clone());
        let id = format!("pub-{}", published.len());
        drop(published);
        Ok(id)
    }
}
