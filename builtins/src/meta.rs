use std::{borrow::Cow, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnknownBuiltin(String),
    UnknownWhitespace(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Self::UnknownBuiltin(ref name) => write!(f, "{name:?} is not a built-in datatype"),
            Self::UnknownWhitespace(ref value) => {
                write!(f, "{value:?} is not a valid whiteSpace facet value")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Value of the `whiteSpace` facet (Part 2, §4.3.6).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Whitespace {
    Preserve,
    Replace,
    Collapse,
}

impl Whitespace {
    pub fn from_literal(literal: &str) -> Result<Self, Error> {
        match literal {
            "preserve" => Ok(Self::Preserve),
            "replace" => Ok(Self::Replace),
            "collapse" => Ok(Self::Collapse),
            _ => Err(Error::UnknownWhitespace(literal.to_string())),
        }
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

pub fn normalized_value(value: &str, whitespace: Whitespace) -> Cow<'_, str> {
    match whitespace {
        Whitespace::Preserve => Cow::Borrowed(value),
        Whitespace::Replace => {
            if value.chars().any(|c| matches!(c, '\t' | '\n' | '\r')) {
                Cow::Owned(value.replace(['\t', '\n', '\r'], " "))
            } else {
                Cow::Borrowed(value)
            }
        }
        // split_whitespace() would also split on U+000C and friends, which XML does not consider
        // white space.
        Whitespace::Collapse => Cow::Owned(
            value
                .split(is_xml_space)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        ),
    }
}
