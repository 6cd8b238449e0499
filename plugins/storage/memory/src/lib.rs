use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use table_api::{
    key_string, Cursor, PutRequest, QueryRequest, Record, ScanPage, ScanRequest, Segment,
    StoreError, StoreFuture, TableStore,
};

// ═══════════════════════════════════════════════════════════════
//  RequestStats
// ═══════════════════════════════════════════════════════════════

/// Счётчики запросов к store с момента создания.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub puts: u64,
    pub queries: u64,
    pub scans: u64,
}

#[derive(Default)]
struct Counters {
    puts: AtomicU64,
    queries: AtomicU64,
    scans: AtomicU64,
}

// ═══════════════════════════════════════════════════════════════
//  MemoryTableStore
// ═══════════════════════════════════════════════════════════════

type Table = BTreeMap<String, Record>;

/// In-process TableStore. Все чтения strongly-consistent, поэтому
/// `consistent_read` ни на что не влияет.
///
/// Сегмент записи — FNV-1a от строки ключа по модулю `total`, так что
/// сегменты не пересекаются и вместе покрывают всю таблицу. Внутри
/// сегмента записи отдаются в порядке ключей, cursor — ключ последней
/// отданной записи.
pub struct MemoryTableStore {
    tables: RwLock<HashMap<String, Table>>,
    key_field: String,
    page_size: usize,
    counters: Counters,
}

impl MemoryTableStore {
    pub fn new(key_field: impl Into<String>, page_size: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            key_field: key_field.into(),
            page_size: page_size.max(1),
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> RequestStats {
        RequestStats {
            puts: self.counters.puts.load(Ordering::Relaxed),
            queries: self.counters.queries.load(Ordering::Relaxed),
            scans: self.counters.scans.load(Ordering::Relaxed),
        }
    }

    /// Количество записей в таблице (0 для несуществующей).
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, BTreeMap::len)
    }

    fn item_key(&self, item: &Record) -> Result<String, StoreError> {
        item.get(&self.key_field)
            .map(key_string)
            .ok_or_else(|| {
                StoreError::record(format!("item is missing key attribute '{}'", self.key_field))
            })
    }

    fn cursor_key(&self, cursor: &Cursor) -> Result<String, StoreError> {
        cursor
            .as_record()
            .get(&self.key_field)
            .map(key_string)
            .ok_or_else(|| StoreError::request("cursor does not carry the table key"))
    }

    fn cursor_for(&self, key: &str, item: &Record) -> Cursor {
        let mut rec = Record::new();
        let value = item
            .get(&self.key_field)
            .cloned()
            .unwrap_or_else(|| serde_json::Value::String(key.to_string()));
        rec.insert(self.key_field.clone(), value);
        Cursor::new(rec)
    }
}

/// Номер сегмента для ключа.
pub fn segment_of(key: &str, total: u32) -> u32 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    (hash % u64::from(total.max(1))) as u32
}

fn in_segment(key: &str, segment: Segment) -> bool {
    segment_of(key, segment.total()) == segment.index()
}

impl TableStore for MemoryTableStore {
    fn put(&self, request: PutRequest) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.counters.puts.fetch_add(1, Ordering::Relaxed);
            let key = self.item_key(&request.item)?;
            let mut tables = self.tables.write().await;
            tables.entry(request.table).or_default().insert(key, request.item);
            Ok(())
        })
    }

    fn query(&self, request: QueryRequest) -> StoreFuture<'_, Vec<Record>> {
        Box::pin(async move {
            self.counters.queries.fetch_add(1, Ordering::Relaxed);
            let tables = self.tables.read().await;
            let Some(table) = tables.get(&request.table) else {
                return Ok(Vec::new());
            };
            Ok(table
                .values()
                .filter(|item| item.get(&request.field) == Some(&request.value))
                .cloned()
                .collect())
        })
    }

    fn scan_segment(&self, request: ScanRequest) -> StoreFuture<'_, ScanPage> {
        Box::pin(async move {
            self.counters.scans.fetch_add(1, Ordering::Relaxed);
            let after = request.cursor.as_ref().map(|c| self.cursor_key(c)).transpose()?;

            let tables = self.tables.read().await;
            let Some(table) = tables.get(&request.table) else {
                return Ok(ScanPage::default());
            };

            let mut remaining = table
                .iter()
                .filter(|(key, _)| after.as_ref().is_none_or(|a| key.as_str() > a.as_str()))
                .filter(|(key, _)| in_segment(key, request.segment));

            let mut items = Vec::new();
            let mut last: Option<(&String, &Record)> = None;
            for (key, item) in remaining.by_ref().take(self.page_size) {
                items.push(match &request.projection {
                    Some(p) => p.apply(item),
                    None => item.clone(),
                });
                last = Some((key, item));
            }

            let cursor = match (last, remaining.next()) {
                (Some((key, item)), Some(_)) => Some(self.cursor_for(key, item)),
                _ => None,
            };

            tracing::trace!(
                table = %request.table,
                segment = %request.segment,
                items = items.len(),
                more = cursor.is_some(),
                "memory scan page"
            );
            Ok(ScanPage { items, cursor })
        })
    }
}
