//! Paged, default-filled arrays keyed by 63-bit indices.
//!
//! Indices may be sparse and far larger than the number of values, so
//! only pages that receive a write are allocated. A page covers
//! `PAGE_SIZE` consecutive indices and is filled with the default value
//! when it is allocated.
//!
//! Lifecycle:
//!
//! ```text
//! SparseArrayBuilder  --build()-->  SparseArray  --drain()-->  DrainingIterator
//!   concurrent set()                 get() only                 next_batch() from N threads
//! ```
//!
//! The draining iterator is the only lock-free coordination point: an
//! atomic cursor over the occupied pages hands each page to exactly one
//! caller, which takes ownership of it. No page is observed twice and
//! every occupied page is observed once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use crate::collections::{lock, read, write};

pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

/// Largest supported index (2^63 - 1).
pub const MAX_INDEX: u64 = i64::MAX as u64;

type Page<T> = Box<[T]>;

#[inline]
fn page_index(index: u64) -> u64 {
    index >> PAGE_SHIFT
}

#[inline]
fn index_in_page(index: u64) -> usize {
    (index & PAGE_MASK) as usize
}

// ── Builder ────────────────────────────────────────────────────────

/// Write side of a sparse array. `set` may be called from many threads;
/// writes to distinct indices never interfere, writes to the same index
/// are last-writer-wins.
///
/// The page directory is behind an `RwLock`: setting a value into an
/// existing page takes the read lock plus that page's mutex, allocating
/// a page takes the write lock.
pub struct SparseArrayBuilder<T> {
    default_value: T,
    pages: RwLock<HashMap<u64, Mutex<Page<T>>>>,
}

impl<T: Clone + Send + Sync> SparseArrayBuilder<T> {
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            pages: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Store `value` at `index`, allocating the page on first write.
    pub fn set(&self, index: u64, value: T) {
        debug_assert!(index <= MAX_INDEX, "index {index} exceeds 63 bits");
        let page_idx = page_index(index);
        let offset = index_in_page(index);

        {
            let pages = read(&self.pages);
            if let Some(page) = pages.get(&page_idx) {
                lock(page)[offset] = value;
                return;
            }
        }

        let mut pages = write(&self.pages);
        let page = pages
            .entry(page_idx)
            .or_insert_with(|| Mutex::new(new_page(&self.default_value)));
        page.get_mut()
            .unwrap_or_else(PoisonError::into_inner)[offset] = value;
    }

    /// Read-modify-write of the slot at `index` under its page lock, so
    /// concurrent updates of one slot serialize.
    pub fn update(&self, index: u64, f: impl FnOnce(&mut T)) {
        debug_assert!(index <= MAX_INDEX, "index {index} exceeds 63 bits");
        let page_idx = page_index(index);
        let offset = index_in_page(index);

        {
            let pages = read(&self.pages);
            if let Some(page) = pages.get(&page_idx) {
                f(&mut lock(page)[offset]);
                return;
            }
        }

        let mut pages = write(&self.pages);
        let page = pages
            .entry(page_idx)
            .or_insert_with(|| Mutex::new(new_page(&self.default_value)));
        f(&mut page.get_mut().unwrap_or_else(PoisonError::into_inner)[offset]);
    }

    /// Current value at `index`, or the default if never set.
    pub fn get(&self, index: u64) -> T {
        let pages = read(&self.pages);
        match pages.get(&page_index(index)) {
            Some(page) => lock(page)[index_in_page(index)].clone(),
            None => self.default_value.clone(),
        }
    }

    /// Number of allocated pages.
    pub fn page_count(&self) -> usize {
        read(&self.pages).len()
    }

    /// Freeze the array. No further writes are possible.
    pub fn build(self) -> SparseArray<T> {
        let pages = self
            .pages
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        SparseArray {
            default_value: self.default_value,
            pages: unwrap_pages(pages),
        }
    }

    /// Move every page written so far into a frozen array, leaving this
    /// builder empty. Used where the builder sits behind a shared handle.
    pub fn take(&self) -> SparseArray<T> {
        let pages = std::mem::take(&mut *write(&self.pages));
        SparseArray {
            default_value: self.default_value.clone(),
            pages: unwrap_pages(pages),
        }
    }
}

fn unwrap_pages<T>(pages: HashMap<u64, Mutex<Page<T>>>) -> HashMap<u64, Page<T>> {
    pages
        .into_iter()
        .map(|(idx, page)| (idx, page.into_inner().unwrap_or_else(PoisonError::into_inner)))
        .collect()
}

fn new_page<T: Clone>(default_value: &T) -> Page<T> {
    vec![default_value.clone(); PAGE_SIZE].into_boxed_slice()
}

// ── Frozen array ───────────────────────────────────────────────────

/// Immutable sparse array. Reads of unset indices return the default.
pub struct SparseArray<T> {
    default_value: T,
    pages: HashMap<u64, Page<T>>,
}

impl<T: Clone + Send + Sync> SparseArray<T> {
    pub fn get(&self, index: u64) -> &T {
        match self.pages.get(&page_index(index)) {
            Some(page) => &page[index_in_page(index)],
            None => &self.default_value,
        }
    }

    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    /// Whether any page was ever allocated. Only writes allocate pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// One past the last index covered by an allocated page.
    pub fn capacity(&self) -> u64 {
        self.pages
            .keys()
            .max()
            .map_or(0, |&max_page| (max_page + 1) << PAGE_SHIFT)
    }

    /// Consume the array into a draining iterator over its pages,
    /// ordered by page index.
    pub fn drain(self) -> DrainingIterator<T> {
        let mut pages: Vec<(u64, Page<T>)> = self.pages.into_iter().collect();
        pages.sort_unstable_by_key(|(idx, _)| *idx);
        DrainingIterator {
            pages: pages
                .into_iter()
                .map(|(idx, page)| (idx, Mutex::new(Some(page))))
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }
}

// ── Draining iteration ─────────────────────────────────────────────

/// Hands out whole pages to concurrent consumers.
///
/// Each `next_batch` call claims the next slot with a single
/// `fetch_add` on the shared cursor, so a slot is claimed by exactly one
/// caller. The per-slot mutex is therefore never contended; it only
/// moves the page out of the shared slice.
pub struct DrainingIterator<T> {
    pages: Box<[(u64, Mutex<Option<Page<T>>>)]>,
    cursor: AtomicUsize,
}

impl<T: Send> DrainingIterator<T> {
    /// Number of pages this iterator started with.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Claim the next page into `batch`, replacing (and dropping) the
    /// page it held. Returns false once every page has been claimed.
    pub fn next_batch(&self, batch: &mut DrainingBatch<T>) -> bool {
        loop {
            let slot = self.cursor.fetch_add(1, Ordering::Relaxed);
            let Some((page_idx, handle)) = self.pages.get(slot) else {
                batch.page = None;
                return false;
            };
            if let Some(page) = lock(handle).take() {
                batch.offset = page_idx << PAGE_SHIFT;
                batch.page = Some(page);
                return true;
            }
        }
    }
}

/// Reusable handle receiving pages from a `DrainingIterator`.
pub struct DrainingBatch<T> {
    offset: u64,
    page: Option<Page<T>>,
}

impl<T> DrainingBatch<T> {
    pub fn new() -> Self {
        Self { offset: 0, page: None }
    }

    /// Index of the first slot of the current page.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn page(&self) -> &[T] {
        self.page.as_deref().unwrap_or(&[])
    }

    /// Mutable access, so consumers can move values out of a page they own.
    pub fn page_mut(&mut self) -> &mut [T] {
        self.page.as_deref_mut().unwrap_or(&mut [])
    }
}

impl<T> Default for DrainingBatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────────────
