#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested path is outside every allowed root. Carries no path
    /// text so the attempted path can never leak into a response body; it
    /// goes to the server-side logs only.
    #[error("Path not allowed")]
    PathNotAllowed,

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
