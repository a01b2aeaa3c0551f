use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Resume backend request failed with status {status}: {body}")]
    BackendApi { status: u16, body: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::BackendApi { status: 404, .. })
    }
}
