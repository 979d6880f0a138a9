#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    #[error("content not found")]
    NotFound,
    #[error("content api returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("error communicating with the content api: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed content api response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("error reading content fixtures: {0}")]
    Fixture(#[from] std::io::Error),
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound)
    }
}
