use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Sign in to {0}")]
    SignInRequired(&'static str),

    #[error("Comment text is required")]
    EmptyComment,

    #[error("Rating must be between 1 and 5")]
    InvalidRating,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}
