use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    #[error("unclosed element(s): <{tags}>")]
    Unclosed { tags: String },

    #[error("unexpected closing tag at byte {position}")]
    UnexpectedClose { position: u64 },

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,
}
