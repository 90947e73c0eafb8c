use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphfeedError>;

#[derive(Debug, Error)]
pub enum GraphfeedError {
    /// A raw setting value was rejected by its field parser. Recovered with
    /// the field default inside the settings store; never crosses the store
    /// boundary.
    #[error("Parse error for setting '{key}': {reason}")]
    Parse { key: String, reason: String },

    /// A search node or anchor node could not be located or created.
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// A content source was unreachable or returned a non-success status.
    #[error("Fetch error for source '{source_id}': {reason}")]
    Fetch { source_id: String, reason: String },

    /// The host rejected a node-creation request for a content item.
    #[error("Insertion error: {0}")]
    Insertion(String),

    /// A host query or creation primitive failed structurally.
    #[error("Host error: {0}")]
    Host(String),
}
