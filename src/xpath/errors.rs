use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XPathError {
    #[error("syntax error: {message}")]
    Syntax { message: String },

    #[error("unsupported construct: {message}")]
    Unsupported { message: String },
}

impl XPathError {
    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        XPathError::Syntax {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        XPathError::Unsupported {
            message: message.into(),
        }
    }
}
