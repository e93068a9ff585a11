//! Fixed-capacity staging area for one lane.
//!
//! NOT Sync -- single-writer access assumed. The owning worker flushes
//! the buffer as soon as it reports full and resets it afterwards.

/// Property reference of an entry that carries no properties.
pub const NO_PROPERTY: usize = usize::MAX;

/// Column-wise `(original_id, property_ref, local_label_token)` entries,
/// in call order.
pub struct NodesBatchBuffer {
    capacity: usize,
    original_ids: Vec<u64>,
    property_refs: Vec<usize>,
    label_tokens: Vec<u32>,
}

impl NodesBatchBuffer {
    // -- Constructors ---------------------------------------------------------

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            original_ids: Vec::with_capacity(capacity),
            property_refs: Vec::with_capacity(capacity),
            label_tokens: Vec::with_capacity(capacity),
        }
    }

    // -- Write Operations -----------------------------------------------------

    /// Append an entry. Returns true if the buffer is now full.
    pub fn add(&mut self, original_id: u64, property_ref: usize, label_token: u32) -> bool {
        debug_assert!(!self.is_full(), "append to a full batch buffer");
        self.original_ids.push(original_id);
        self.property_refs.push(property_ref);
        self.label_tokens.push(label_token);
        self.is_full()
    }

    /// Drop all entries, keeping the allocation.
    pub fn reset(&mut self) {
        self.original_ids.clear();
        self.property_refs.clear();
        self.label_tokens.clear();
    }

    // -- Read Operations ------------------------------------------------------

    pub fn original_ids(&self) -> &[u64] {
        &self.original_ids
    }

    pub fn property_refs(&self) -> &[usize] {
        &self.property_refs
    }

    pub fn label_tokens(&self) -> &[u32] {
        &self.label_tokens
    }

    /// Iterator over `(original_id, property_ref, label_token)`.
    pub fn entries(&self) -> impl Iterator<Item = (u64, usize, u32)> + '_ {
        self.original_ids
            .iter()
            .zip(&self.property_refs)
            .zip(&self.label_tokens)
            .map(|((&id, &prop), &token)| (id, prop, token))
    }

    // -- Stats ----------------------------------------------------------------

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.original_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original_ids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.original_ids.len() >= self.capacity
    }
}
