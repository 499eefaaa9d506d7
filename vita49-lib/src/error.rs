#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Not enough bytes")]
    NotEnoughData {
        /// Number of bytes we got
        actual: usize,
        /// Minimum number of expected bytes
        minimum: usize,
    },

    /// A length implied by the packet fields cannot be satisfied by the packet size.
    #[error("invalid length: packet is {packet} bytes but {needed} bytes are required")]
    InvalidLength { packet: usize, needed: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Reading or writing a SigMF metadata document.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
