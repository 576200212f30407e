use thiserror::Error;

#[derive(Error, Debug)]
pub enum Rc4GitError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("github error: {0}")]
    GitHub(String),

    #[error("activity stream error: {0}")]
    Stream(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a room path: {0}")]
    InvalidRoom(String),

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("backend rejected request: {0}")]
    Backend(String),
}

impl From<octocrab::Error> for Rc4GitError {
    fn from(e: octocrab::Error) -> Self {
        Rc4GitError::GitHub(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Rc4GitError>;
