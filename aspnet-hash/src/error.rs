#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid line format: missing delimiter {delimiter:?}")]
    MissingDelimiter { delimiter: String },

    #[error("error decoding base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded bytes too short: {len} < {min}")]
    TooShort { len: usize, min: usize },

    #[error("failed to obtain random salt: {0}")]
    Randomness(#[source] rand::Error),
}

impl Error {
    /// Whether the error should abort a whole run rather than just the line
    /// that produced it. Only a broken randomness source qualifies.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Randomness(_))
    }
}
