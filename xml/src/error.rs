use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("input of {size} bytes exceeds the maximum allowed size of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    /// Carries the message of the underlying parser.
    #[error("{message}")]
    Malformed {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("failed to write XML: {0}")]
    Write(String),
}

impl From<roxmltree::Error> for XmlError {
    fn from(error: roxmltree::Error) -> Self {
        let pos = error.pos();
        Self::Malformed {
            message: error.to_string(),
            line: pos.row,
            column: pos.col,
        }
    }
}

impl XmlError {
    /// Line the error refers to, `0` when there is none.
    pub fn line(&self) -> u32 {
        match self {
            Self::Malformed { line, .. } => *line,
            _ => 0,
        }
    }
}
