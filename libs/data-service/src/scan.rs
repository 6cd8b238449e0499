use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;

use table_api::{Projection, Record, ScanRequest, Segment, StoreError, TableStore};

use crate::ServiceError;

/// Число сегментов full-table scan'а по умолчанию.
pub const DEFAULT_SEGMENTS: u32 = 8;

// ═══════════════════════════════════════════════════════════════
//  SegmentScan
// ═══════════════════════════════════════════════════════════════

/// Результат чтения одного сегмента до конца.
#[derive(Debug, Default)]
pub struct SegmentScan {
    pub items: Vec<Record>,
    /// Сколько запросов ушло в store.
    pub pages: usize,
}

/// Читать сегмент страницами, пока store возвращает cursor.
///
/// Cursor, возвращённый K раз, даёт ровно K+1 запросов.
pub async fn scan_segment(
    store: &dyn TableStore,
    table: &str,
    projection: Option<&Projection>,
    segment: Segment,
) -> Result<SegmentScan, StoreError> {
    let mut out = SegmentScan::default();
    let mut cursor = None;
    loop {
        let page = store
            .scan_segment(ScanRequest {
                table: table.to_string(),
                projection: projection.cloned(),
                segment,
                cursor: cursor.take(),
            })
            .await?;
        out.pages += 1;
        out.items.extend(page.items);
        match page.cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(out),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  ParallelScanner
// ═══════════════════════════════════════════════════════════════

/// Full-table scan, разбитый на фиксированное число сегментов.
///
/// Все сегменты стартуют одновременно, каждый — отдельной task'ой со
/// своим cursor'ом и своим буфером. Scan завершается только когда
/// завершились все сегменты; ошибка любого сегмента — ошибка всего
/// scan'а, частичный результат не возвращается. Порядок записей не
/// определён.
#[derive(Clone)]
pub struct ParallelScanner {
    store: Arc<dyn TableStore>,
    segments: u32,
}

impl ParallelScanner {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            segments: DEFAULT_SEGMENTS,
        }
    }

    pub fn with_segments(store: Arc<dyn TableStore>, segments: u32) -> Result<Self, ServiceError> {
        if segments == 0 {
            return Err(ServiceError::Config("scan segments must be at least 1".into()));
        }
        Ok(Self { store, segments })
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub async fn scan(
        &self,
        table: &str,
        projection: Option<&Projection>,
    ) -> Result<Vec<Record>, ServiceError> {
        let started = Instant::now();
        let mut tasks = JoinSet::new();
        let mut by_task = HashMap::new();

        for segment in Segment::all(self.segments)? {
            let store = Arc::clone(&self.store);
            let table = table.to_string();
            let projection = projection.cloned();
            let handle = tasks.spawn(async move {
                scan_segment(store.as_ref(), &table, projection.as_ref(), segment).await
            });
            by_task.insert(handle.id(), segment);
        }

        let mut parts: Vec<(Segment, Vec<Record>)> = Vec::with_capacity(by_task.len());
        let mut failure: Option<ServiceError> = None;

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, Ok(done))) => {
                    let segment = by_task[&id];
                    tracing::debug!(
                        table,
                        %segment,
                        pages = done.pages,
                        items = done.items.len(),
                        "segment scanned"
                    );
                    parts.push((segment, done.items));
                }
                Ok((id, Err(e))) => {
                    let segment = by_task[&id];
                    tracing::warn!(
                        table,
                        %segment,
                        kind = %e.kind(),
                        error = e.message(),
                        "segment scan failed"
                    );
                    if failure.is_none() {
                        failure = Some(ServiceError::Store(e));
                    }
                }
                Err(e) => {
                    let segment = by_task[&e.id()];
                    tracing::error!(table, %segment, error = %e, "segment task died");
                    if failure.is_none() {
                        failure = Some(ServiceError::Segment {
                            segment,
                            detail: e.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let total: usize = parts.iter().map(|(_, items)| items.len()).sum();
        let mut records = Vec::with_capacity(total);
        for (_, items) in parts {
            records.extend(items);
        }

        tracing::info!(
            table,
            segments = self.segments,
            items = records.len(),
            projected = projection.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "parallel scan complete"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use serde_json::json;
    use table_api::{
        Cursor, PutRequest, QueryRequest, ScanPage, StoreFuture,
    };

    use super::*;

    /// Store, отдающий cursor `cursors` раз на каждый сегмент,
    /// по одной записи на страницу.
    struct CountingStore {
        cursors: usize,
        fail_segment: Option<u32>,
        requests: Mutex<HashMap<u32, usize>>,
        total: AtomicUsize,
    }

    impl CountingStore {
        fn new(cursors: usize) -> Self {
            Self {
                cursors,
                fail_segment: None,
                requests: Mutex::new(HashMap::new()),
                total: AtomicUsize::new(0),
            }
        }

        fn requests_for(&self, segment: u32) -> usize {
            self.requests.lock().unwrap().get(&segment).copied().unwrap_or(0)
        }
    }

    impl TableStore for CountingStore {
        fn put(&self, _request: PutRequest) -> StoreFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn query(&self, _request: QueryRequest) -> StoreFuture<'_, Vec<Record>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn scan_segment(&self, request: ScanRequest) -> StoreFuture<'_, ScanPage> {
            Box::pin(async move {
                self.total.fetch_add(1, Ordering::SeqCst);
                let index = request.segment.index();
                if self.fail_segment == Some(index) {
                    return Err(StoreError::remote("throttled"));
                }
                let served = {
                    let mut requests = self.requests.lock().unwrap();
                    let n = requests.entry(index).or_insert(0);
                    *n += 1;
                    *n
                };
                let mut item = Record::new();
                item.insert("id".into(), json!(format!("{index}-{served}")));
                let cursor = (served <= self.cursors).then(|| Cursor::new(item.clone()));
                Ok(ScanPage { items: vec![item], cursor })
            })
        }
    }

    #[tokio::test]
    async fn cursor_returned_k_times_means_k_plus_one_requests() {
        let store = Arc::new(CountingStore::new(3));
        let scanner = ParallelScanner::new(store.clone());

        let records = scanner.scan("t", None).await.unwrap();

        for segment in 0..DEFAULT_SEGMENTS {
            assert_eq!(store.requests_for(segment), 4);
        }
        assert_eq!(records.len(), 8 * 4);
        assert_eq!(store.total.load(Ordering::SeqCst), 32);
    }

    #[tokio::test]
    async fn single_page_segments_issue_one_request_each() {
        let store = Arc::new(CountingStore::new(0));
        let scanner = ParallelScanner::new(store.clone());
        let records = scanner.scan("t", None).await.unwrap();
        assert_eq!(records.len(), 8);
        assert_eq!(store.total.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn failing_segment_fails_whole_scan() {
        let mut store = CountingStore::new(2);
        store.fail_segment = Some(5);
        let store = Arc::new(store);
        let scanner = ParallelScanner::new(store.clone());

        let err = scanner.scan("t", None).await.unwrap_err();
        let inner = err.store_error().expect("store error passes through");
        assert_eq!(inner.kind(), table_api::ErrorKind::Remote);
        assert_eq!(inner.message(), "throttled");
        // остальные сегменты дочитаны до конца
        assert_eq!(store.requests_for(0), 3);
    }

    #[tokio::test]
    async fn custom_segment_count() {
        let store = Arc::new(CountingStore::new(1));
        let scanner = ParallelScanner::with_segments(store.clone(), 3).unwrap();
        assert_eq!(scanner.segments(), 3);
        let records = scanner.scan("t", None).await.unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(store.requests_for(3), 0);
        assert!(ParallelScanner::with_segments(store, 0).is_err());
    }
}
