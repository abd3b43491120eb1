//! Placeholder expressions, classified once before evaluation.
//!
//! ```text
//! expression := operand ( '|' format )?
//! operand    := name '(' path ')' | path
//! path       := segment ( '.' segment )*
//! format     := name ( ':' argument )?
//! ```
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FUNCTION: Regex = Regex::new(r"^([A-Za-z_]\w*)\s*\(\s*(.*?)\s*\)$").unwrap();
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Count,
    Avg,
    Max,
    Min,
    First,
    Last,
}

impl Aggregate {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sum" => Self::Sum,
            "count" => Self::Count,
            "avg" => Self::Avg,
            "max" => Self::Max,
            "min" => Self::Min,
            "first" => Self::First,
            "last" => Self::Last,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSpec {
    Uppercase,
    Lowercase,
    Title,
    /// strftime pattern of the output
    Date(String),
    Number(usize),
    /// currency symbol
    Currency(String),
    /// Leaves the value untouched.
    Unknown(String),
}

impl FormatSpec {
    pub const DEFAULT_DATE: &'static str = "%Y-%m-%d";
    pub const DEFAULT_DECIMALS: usize = 2;
    /// Larger `number:` arguments are clamped to this.
    pub const MAX_DECIMALS: usize = 20;
    pub const DEFAULT_SYMBOL: &'static str = "$";

    /// `name` or `name:argument`. Only the first `:` separates, so date patterns keep theirs.
    pub fn parse(spec: &str) -> Self {
        let (name, argument) = match spec.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.trim())),
            None => (spec.trim(), None),
        };
        let argument = argument.filter(|a| !a.is_empty());

        match name {
            "uppercase" | "upper" => Self::Uppercase,
            "lowercase" | "lower" => Self::Lowercase,
            "title" => Self::Title,
            "date" => Self::Date(argument.unwrap_or(Self::DEFAULT_DATE).to_string()),
            "number" => Self::Number(
                argument
                    .and_then(|a| a.parse::<usize>().ok())
                    .unwrap_or(Self::DEFAULT_DECIMALS)
                    .min(Self::MAX_DECIMALS),
            ),
            "currency" => Self::Currency(argument.unwrap_or(Self::DEFAULT_SYMBOL).to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Identifier(String),
    /// At least two segments.
    Path(Vec<String>),
    Function {
        func: Aggregate,
        argument: Vec<String>,
    },
    Formatted {
        base: Box<Expression>,
        format: FormatSpec,
    },
    Invalid,
}

impl Expression {
    pub fn classify(source: &str) -> Self {
        let source = source.trim();

        if let Some((operand, format)) = source.split_once('|') {
            return match Self::classify_operand(operand.trim()) {
                Self::Invalid => Self::Invalid,
                base => Self::Formatted {
                    base: Box::new(base),
                    format: FormatSpec::parse(format),
                },
            };
        }
        Self::classify_operand(source)
    }

    fn classify_operand(source: &str) -> Self {
        // function syntax first, the argument may contain dots
        if let Some(captures) = FUNCTION.captures(source) {
            let func = Aggregate::from_name(&captures[1]);
            let argument = parse_path(&captures[2]);
            return match (func, argument) {
                (Some(func), Some(argument)) => Self::Function { func, argument },
                _ => Self::Invalid,
            };
        }

        match parse_path(source) {
            Some(mut segments) if segments.len() == 1 => {
                Self::Identifier(segments.pop().unwrap_or_default())
            }
            Some(segments) => Self::Path(segments),
            None => Self::Invalid,
        }
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn parse_path(source: &str) -> Option<Vec<String>> {
    let segments = source.split('.').map(str::trim).collect::<Vec<_>>();
    segments
        .iter()
        .all(|s| is_segment(s))
        .then(|| segments.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identifiers_and_paths() {
        assert_eq!(
            Expression::classify(" cfdi_uuid "),
            Expression::Identifier("cfdi_uuid".to_string())
        );
        assert_eq!(
            Expression::classify("conceptos.0.importe"),
            Expression::Path(path(&["conceptos", "0", "importe"]))
        );
    }

    #[test]
    fn function_is_checked_before_path() {
        assert_eq!(
            Expression::classify("sum(conceptos.importe)"),
            Expression::Function {
                func: Aggregate::Sum,
                argument: path(&["conceptos", "importe"])
            }
        );
        assert_eq!(Expression::classify("median(conceptos.importe)"), Expression::Invalid);
        assert_eq!(Expression::classify("sum(conceptos"), Expression::Invalid);
    }

    #[test]
    fn formats() {
        assert_eq!(
            Expression::classify("fecha | date:%d/%m/%Y"),
            Expression::Formatted {
                base: Box::new(Expression::Identifier("fecha".to_string())),
                format: FormatSpec::Date("%d/%m/%Y".to_string()),
            }
        );
        assert_eq!(
            Expression::classify("sum(items.total)|currency"),
            Expression::Formatted {
                base: Box::new(Expression::Function {
                    func: Aggregate::Sum,
                    argument: path(&["items", "total"])
                }),
                format: FormatSpec::Currency("$".to_string()),
            }
        );
        assert_eq!(FormatSpec::parse("number"), FormatSpec::Number(2));
        assert_eq!(FormatSpec::parse("number:4"), FormatSpec::Number(4));
        assert_eq!(FormatSpec::parse("number:1000000000"), FormatSpec::Number(20));
        assert_eq!(FormatSpec::parse("number:-1"), FormatSpec::Number(2));
        assert_eq!(FormatSpec::parse("time:%H"), FormatSpec::Unknown("time".to_string()));
    }

    #[test]
    fn anything_else_is_invalid() {
        assert_eq!(Expression::classify("a b"), Expression::Invalid);
        assert_eq!(Expression::classify("a..b"), Expression::Invalid);
        assert_eq!(Expression::classify(""), Expression::Invalid);
        assert_eq!(Expression::classify("| upper"), Expression::Invalid);
    }
}
