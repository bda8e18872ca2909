/// Errors raised by the decoded splat buffer and its backing store.
///
/// ```text
/// ┌────────────────────┬─────────────────────────────────────────────┐
/// │ Variant            │ Cause                                       │
/// ├────────────────────┼─────────────────────────────────────────────┤
/// │ Overflow           │ Write past the end of the fixed-size store  │
/// │ StoreTooSmall      │ Store cannot hold the declared layout       │
/// │ SectionOutOfRange  │ Counter update for a section that is absent │
/// │ Wire               │ Header rewrite failed                       │
/// └────────────────────┴─────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// The backing store is allocated once at its exact final size and is
    /// never grown.
    #[error("write of {len} bytes at offset {offset} overflows store of {capacity} bytes")]
    Overflow {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    #[error("store of {actual} bytes cannot hold layout of {required} bytes")]
    StoreTooSmall { required: usize, actual: usize },

    #[error("section index {index} out of range ({count} sections)")]
    SectionOutOfRange { index: usize, count: usize },

    #[error(transparent)]
    Wire(#[from] ksplat_wire::WireError),
}
