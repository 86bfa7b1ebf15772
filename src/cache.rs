use crate::decoder::DocumentDecoder;
use crate::types::ObjectId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Mutex, OnceCell};

/// Decoded text keyed by blob object id, for the lifetime of one run
///
/// Each object id owns a `OnceCell`: the first caller fetches and decodes,
/// concurrent callers for the same id wait on that cell, and callers for
/// other ids only contend on the map lock for the lookup itself. A failed
/// fetch leaves the cell empty so a later request can retry.
pub struct DecodeCache {
    decoder: DocumentDecoder,
    entries: Mutex<HashMap<ObjectId, Arc<OnceCell<Arc<str>>>>>,
    decodes: AtomicUsize,
}

impl DecodeCache {
    pub fn new(decoder: DocumentDecoder) -> Self {
        Self {
            decoder,
            entries: Mutex::new(HashMap::new()),
            decodes: AtomicUsize::new(0),
        }
    }

    /// Return the decoded text for `object_id`, fetching and decoding the raw
    /// bytes only if no earlier request has done so
    pub async fn get_or_decode<F, Fut, E>(&self, object_id: &ObjectId, fetch: F) -> Result<Arc<str>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(object_id.clone()).or_default())
        };

        let text = cell
            .get_or_try_init(|| async {
                let bytes = fetch().await?;
                self.decodes.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Decoding blob {} ({} bytes)", object_id.short(), bytes.len());
                Ok::<Arc<str>, E>(Arc::from(self.decoder.decode(&bytes)))
            })
            .await?;

        Ok(Arc::clone(text))
    }

    /// Number of times the decoder has run
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }

    /// Number of object ids with decoded text
    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
