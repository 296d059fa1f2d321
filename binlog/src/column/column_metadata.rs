/// Per-column context handed to the value codec for a single cell decode.
/// Built by the dispatch function in `column::codec` from the owning
/// `TableDescriptor`'s `(column_type, meta)` pair for each column it visits.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// MySQL column type identifier (the *stored* type after the STRING
    /// real-type rewrite has already been applied by the caller).
    pub column_type: u8,
    /// Type-specific metadata (length, precision, etc.), as packed in the
    /// Table Map event's metadata block, or the rewritten length for STRING.
    pub metadata: u16,
    /// Set only for a JSON column in a PARTIAL_UPDATE_ROWS after-image whose
    /// partial bit was set; every other decoder ignores this.
    pub is_partial: bool,
}

impl ColumnMetadata {
    pub fn new(column_type: u8, metadata: u16) -> Self {
        Self {
            column_type,
            metadata,
            is_partial: false,
        }
    }

    pub fn with_partial(mut self, is_partial: bool) -> Self {
        self.is_partial = is_partial;
        self
    }
}
