use crate::{
    error::SchemaError,
    mapping_context::MappingContext,
    simple_type_def::Variety,
    values::{required_value, schema_children},
};
use addenda_builtins::{meta::Whitespace, BuiltinType};
use regex::Regex;
use roxmltree::Node;
use std::cmp::Ordering;

/// Constraining facet (pt. 2, §4.3)
///
/// Facets accumulate along a derivation chain and all of them apply to a value. `whiteSpace` is
/// not listed here; it is folded into [`SimpleTypeDefinition::whitespace`](crate::SimpleTypeDefinition).
#[derive(Clone, Debug)]
pub enum ConstrainingFacet {
    /// length (pt. 2, §4.3.1)
    Length(u64),
    /// minLength (pt. 2, §4.3.2)
    MinLength(u64),
    /// maxLength (pt. 2, §4.3.3)
    MaxLength(u64),
    /// pattern (pt. 2, §4.3.4)
    Pattern(Pattern),
    /// enumeration (pt. 2, §4.3.5)
    Enumeration(Vec<String>),
    /// maxInclusive (pt. 2, §4.3.7)
    MaxInclusive(String),
    /// maxExclusive (pt. 2, §4.3.8)
    MaxExclusive(String),
    /// minExclusive (pt. 2, §4.3.9)
    MinExclusive(String),
    /// minInclusive (pt. 2, §4.3.10)
    MinInclusive(String),
    /// totalDigits (pt. 2, §4.3.11)
    TotalDigits(u64),
    /// fractionDigits (pt. 2, §4.3.12)
    FractionDigits(u64),
}

/// The patterns declared in a single derivation step. A value matches if any of them matches.
#[derive(Clone, Debug)]
pub struct Pattern {
    pub sources: Vec<String>,
    regexes: Vec<Regex>,
}

impl Pattern {
    pub fn new(sources: Vec<String>) -> Result<Self, SchemaError> {
        let regexes = sources
            .iter()
            .map(|source| {
                let translated = translate_pattern(source)?;
                Regex::new(&translated).map_err(|e| SchemaError::InvalidPattern {
                    pattern: source.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { sources, regexes })
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regexes.iter().any(|regex| regex.is_match(value))
    }
}

/// Facets of a `<xs:restriction>`, plus the whiteSpace facet if one is declared.
pub(crate) struct RestrictionFacets {
    pub facets: Vec<ConstrainingFacet>,
    pub whitespace: Option<Whitespace>,
}

impl ConstrainingFacet {
    pub(crate) fn map_restriction(
        context: &mut MappingContext,
        restriction: Node,
    ) -> Result<RestrictionFacets, SchemaError> {
        let mut facets = Vec::new();
        let mut patterns = Vec::new();
        let mut enumeration = Vec::new();
        let mut whitespace = None;

        for child in schema_children(restriction) {
            let name = child.tag_name().name();
            match name {
                // Handled by the caller
                "simpleType" | "attribute" | "attributeGroup" | "anyAttribute" | "sequence"
                | "choice" | "all" | "group" => continue,
                "pattern" => patterns.push(required_value::<String>(child, "value")?),
                "enumeration" => enumeration.push(required_value::<String>(child, "value")?),
                "whiteSpace" => {
                    let value = required_value::<&str>(child, "value")?;
                    whitespace = Some(Whitespace::from_literal(value).map_err(|_| {
                        SchemaError::InvalidAttribute {
                            element: name.to_string(),
                            attribute: "value",
                            value: value.to_string(),
                        }
                    })?);
                }
                "length" => facets.push(Self::Length(required_value(child, "value")?)),
                "minLength" => facets.push(Self::MinLength(required_value(child, "value")?)),
                "maxLength" => facets.push(Self::MaxLength(required_value(child, "value")?)),
                "totalDigits" => facets.push(Self::TotalDigits(required_value(child, "value")?)),
                "fractionDigits" => {
                    facets.push(Self::FractionDigits(required_value(child, "value")?))
                }
                "minInclusive" => facets.push(Self::MinInclusive(required_value(child, "value")?)),
                "maxInclusive" => facets.push(Self::MaxInclusive(required_value(child, "value")?)),
                "minExclusive" => facets.push(Self::MinExclusive(required_value(child, "value")?)),
                "maxExclusive" => facets.push(Self::MaxExclusive(required_value(child, "value")?)),
                _ => context.warn(format!("facet <xs:{name}> is not enforced")),
            }
        }

        if !patterns.is_empty() {
            facets.push(Self::Pattern(Pattern::new(patterns)?));
        }
        if !enumeration.is_empty() {
            facets.push(Self::Enumeration(enumeration));
        }
        Ok(RestrictionFacets { facets, whitespace })
    }

    /// Checks a whitespace-normalized `value` against this facet. The error is a complete
    /// diagnostic sentence.
    pub fn check(&self, value: &str, variety: &Variety) -> Result<(), String> {
        let builtin = match variety {
            Variety::Atomic(builtin) => Some(*builtin),
            _ => None,
        };
        let length = || value_length(value, variety);

        match self {
            Self::Length(expected) => {
                let actual = length();
                if actual != *expected {
                    return Err(format!(
                        "[facet 'length'] The value has a length of '{actual}'; this differs \
                         from the allowed length of '{expected}'."
                    ));
                }
            }
            Self::MinLength(min) => {
                let actual = length();
                if actual < *min {
                    return Err(format!(
                        "[facet 'minLength'] The value has a length of '{actual}'; this \
                         underruns the allowed minimum length of '{min}'."
                    ));
                }
            }
            Self::MaxLength(max) => {
                let actual = length();
                if actual > *max {
                    return Err(format!(
                        "[facet 'maxLength'] The value has a length of '{actual}'; this exceeds \
                         the allowed maximum length of '{max}'."
                    ));
                }
            }
            Self::Pattern(pattern) => {
                if !pattern.is_match(value) {
                    return Err(format!(
                        "[facet 'pattern'] The value '{value}' is not accepted by the pattern \
                         '{}'.",
                        pattern.sources.join("|")
                    ));
                }
            }
            Self::Enumeration(allowed) => {
                if !allowed.iter().any(|a| values_equal(a, value, builtin)) {
                    let set = allowed
                        .iter()
                        .map(|a| format!("'{a}'"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    return Err(format!(
                        "[facet 'enumeration'] The value '{value}' is not an element of the set \
                         {{{set}}}."
                    ));
                }
            }
            Self::MinInclusive(min) => {
                if compare(value, min, builtin) == Some(Ordering::Less) {
                    return Err(format!(
                        "[facet 'minInclusive'] The value '{value}' is less than the minimum \
                         value allowed ('{min}')."
                    ));
                }
            }
            Self::MaxInclusive(max) => {
                if compare(value, max, builtin) == Some(Ordering::Greater) {
                    return Err(format!(
                        "[facet 'maxInclusive'] The value '{value}' is greater than the maximum \
                         value allowed ('{max}')."
                    ));
                }
            }
            Self::MinExclusive(min) => {
                if compare(value, min, builtin) != Some(Ordering::Greater) {
                    return Err(format!(
                        "[facet 'minExclusive'] The value '{value}' must be greater than '{min}'."
                    ));
                }
            }
            Self::MaxExclusive(max) => {
                if compare(value, max, builtin) != Some(Ordering::Less) {
                    return Err(format!(
                        "[facet 'maxExclusive'] The value '{value}' must be less than '{max}'."
                    ));
                }
            }
            Self::TotalDigits(max) => {
                let (integer, fraction) = decimal_digits(value);
                if (integer.len() + fraction.len()) as u64 > *max {
                    return Err(format!(
                        "[facet 'totalDigits'] The value '{value}' has more digits than are \
                         allowed ('{max}')."
                    ));
                }
            }
            Self::FractionDigits(max) => {
                let (_, fraction) = decimal_digits(value);
                if fraction.len() as u64 > *max {
                    return Err(format!(
                        "[facet 'fractionDigits'] The value '{value}' has more fractional digits \
                         than are allowed ('{max}')."
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Length in the units of the value space: list items, octets for binary types, characters
/// otherwise (pt. 2, §4.3.1.3).
fn value_length(value: &str, variety: &Variety) -> u64 {
    match variety {
        Variety::List(_) => value.split_ascii_whitespace().count() as u64,
        Variety::Atomic(BuiltinType::HexBinary) => value.len() as u64 / 2,
        Variety::Atomic(BuiltinType::Base64Binary) => {
            let symbols = value.chars().filter(|c| !c.is_ascii_whitespace()).count() as u64;
            let padding = value.chars().rev().take_while(|&c| c == '=').count() as u64;
            (symbols / 4 * 3).saturating_sub(padding)
        }
        _ => value.chars().count() as u64,
    }
}

fn values_equal(a: &str, b: &str, builtin: Option<BuiltinType>) -> bool {
    match builtin {
        Some(builtin) if builtin.is_numeric() => compare(a, b, Some(builtin)) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Numeric order for numeric types, lexical order otherwise (which is correct for dates and
/// times in a common timezone). `None` if a numeric literal does not parse.
fn compare(a: &str, b: &str, builtin: Option<BuiltinType>) -> Option<Ordering> {
    match builtin {
        Some(BuiltinType::Float | BuiltinType::Double) => {
            let a = a.trim().parse::<f64>().ok()?;
            let b = b.trim().parse::<f64>().ok()?;
            a.partial_cmp(&b)
        }
        Some(builtin) if builtin.is_numeric() => compare_decimal(a, b),
        _ => Some(a.cmp(b)),
    }
}

/// Integer digits without leading zeros and fraction digits without trailing zeros.
fn decimal_digits(literal: &str) -> (&str, &str) {
    let unsigned = literal.trim().trim_start_matches(['+', '-']);
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    (integer.trim_start_matches('0'), fraction.trim_end_matches('0'))
}

fn compare_decimal(a: &str, b: &str) -> Option<Ordering> {
    /// Sign (negative zero is not negative), integer digits and fraction digits.
    fn parse(literal: &str) -> Option<(bool, &str, &str)> {
        let literal = literal.trim();
        let negative = literal.starts_with('-');
        let (integer, fraction) = decimal_digits(literal);
        let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(integer) || !is_digits(fraction) {
            return None;
        }
        let is_zero = integer.is_empty() && fraction.is_empty();
        Some((negative && !is_zero, integer, fraction))
    }

    let (a_negative, a_integer, a_fraction) = parse(a)?;
    let (b_negative, b_integer, b_fraction) = parse(b)?;

    let magnitude = a_integer
        .len()
        .cmp(&b_integer.len())
        .then_with(|| a_integer.cmp(b_integer))
        .then_with(|| a_fraction.cmp(b_fraction));

    Some(match (a_negative, b_negative) {
        (false, false) => magnitude,
        (true, true) => magnitude.reverse(),
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
    })
}

const NAME_START_CLASS: &str = r"_:A-Za-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}";
const NAME_CLASS: &str = r"\-.0-9\u{B7}_:A-Za-z\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{300}-\u{37D}\u{37F}-\u{1FFF}";

/// Translates an XSD regular expression (pt. 2, Appendix G) into the `regex` crate's dialect.
///
/// XSD patterns are implicitly anchored and treat `^` and `$` as ordinary characters. The
/// multi-character escapes `\i` and `\c` are expanded; character class subtraction is rejected.
pub(crate) fn translate_pattern(pattern: &str) -> Result<String, SchemaError> {
    let invalid = |message: &str| SchemaError::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.to_string(),
    };

    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("^(?:");
    let mut in_class = false;
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escaped = chars.next().ok_or_else(|| invalid("trailing backslash"))?;
                match (escaped, in_class) {
                    ('i', false) => out.push_str(&format!("[{NAME_START_CLASS}]")),
                    ('I', false) => out.push_str(&format!("[^{NAME_START_CLASS}]")),
                    ('c', false) => out.push_str(&format!("[{NAME_CLASS}]")),
                    ('C', false) => out.push_str(&format!("[^{NAME_CLASS}]")),
                    ('i', true) => out.push_str(NAME_START_CLASS),
                    ('c', true) => out.push_str(NAME_CLASS),
                    ('I' | 'C', true) => {
                        return Err(invalid("negated name escapes inside a character class"))
                    }
                    (other, _) => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' if in_class => return Err(invalid("nested character class")),
            '[' => {
                in_class = true;
                out.push('[');
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            '-' if in_class && chars.peek() == Some(&'[') => {
                return Err(invalid("character class subtraction is not supported"))
            }
            '&' | '~' if in_class => {
                out.push('\\');
                out.push(c);
            }
            '^' | '$' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if in_class {
        return Err(invalid("unterminated character class"));
    }
    out.push_str(")$");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn atomic(builtin: BuiltinType) -> Variety {
        Variety::Atomic(builtin)
    }

    #[test]
    fn decimal_digits_strip_insignificant_zeros() {
        assert_eq!(decimal_digits(" 007.500 "), ("7", "5"));
        assert_eq!(decimal_digits("-0.0"), ("", ""));
        assert_eq!(decimal_digits("+12"), ("12", ""));
    }

    #[test]
    fn decimals_compare_numerically() {
        assert_eq!(compare_decimal("10", "9.99"), Some(Ordering::Greater));
        assert_eq!(compare_decimal("0.5", "0.45"), Some(Ordering::Greater));
        assert_eq!(compare_decimal("-1.5", "-1.25"), Some(Ordering::Less));
        assert_eq!(compare_decimal("-3", "2"), Some(Ordering::Less));
        assert_eq!(compare_decimal("-0.00", "0"), Some(Ordering::Equal));
        assert_eq!(compare_decimal("1.10", "001.1"), Some(Ordering::Equal));
        assert_eq!(compare_decimal("1,5", "1"), None);
    }

    #[test]
    fn patterns_are_anchored() {
        let pattern = Pattern::new(vec!["[A-Z]{3}-[0-9]+".to_string()]).unwrap();
        assert!(pattern.is_match("ABC-123"));
        assert!(!pattern.is_match("xABC-123"));
        assert!(!pattern.is_match("ABC-123x"));
    }

    #[test]
    fn caret_and_dollar_are_literal() {
        assert_eq!(translate_pattern("^a$").unwrap(), r"^(?:\^a\$)$");
        let pattern = Pattern::new(vec!["[^a]$".to_string()]).unwrap();
        assert!(pattern.is_match("b$"));
        assert!(!pattern.is_match("a$"));
    }

    #[test]
    fn patterns_of_one_step_are_alternatives() {
        let pattern = Pattern::new(vec!["a+".to_string(), "b+".to_string()]).unwrap();
        assert!(pattern.is_match("aaa"));
        assert!(pattern.is_match("bb"));
        assert!(!pattern.is_match("ab"));
    }

    #[test]
    fn name_escapes() {
        let pattern = Pattern::new(vec![r"\i\c*".to_string()]).unwrap();
        assert!(pattern.is_match("cfdi:Addenda"));
        assert!(!pattern.is_match("1abc"));
    }

    #[test]
    fn class_subtraction_is_rejected() {
        assert!(matches!(
            translate_pattern("[a-z-[aeiou]]"),
            Err(SchemaError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn enumeration_message() {
        let facet = ConstrainingFacet::Enumeration(vec!["MXN".to_string(), "USD".to_string()]);
        assert_eq!(
            facet.check("EUR", &atomic(BuiltinType::String)).unwrap_err(),
            "[facet 'enumeration'] The value 'EUR' is not an element of the set {'MXN', 'USD'}."
        );
        assert!(facet.check("USD", &atomic(BuiltinType::String)).is_ok());
    }

    #[test]
    fn numeric_bounds_compare_by_value() {
        let facet = ConstrainingFacet::MinInclusive("0.000001".to_string());
        let decimal = atomic(BuiltinType::Decimal);
        assert!(facet.check("10.5", &decimal).is_ok());
        assert!(facet.check("-1", &decimal).is_err());
        assert!(ConstrainingFacet::MaxExclusive("100".to_string())
            .check("99.99", &decimal)
            .is_ok());
        assert_eq!(compare_decimal("-0.0", "0"), Some(Ordering::Equal));
        assert_eq!(compare_decimal("-2", "-10"), Some(Ordering::Greater));
    }

    #[test]
    fn digits() {
        let decimal = atomic(BuiltinType::Decimal);
        assert!(ConstrainingFacet::FractionDigits(2).check("10.50", &decimal).is_ok());
        assert_eq!(
            ConstrainingFacet::FractionDigits(2).check("10.505", &decimal).unwrap_err(),
            "[facet 'fractionDigits'] The value '10.505' has more fractional digits than are \
             allowed ('2')."
        );
        assert!(ConstrainingFacet::TotalDigits(3).check("0012.0", &decimal).is_ok());
    }

    #[test]
    fn length_counts_characters() {
        let facet = ConstrainingFacet::MaxLength(3);
        assert!(facet.check("ñññ", &atomic(BuiltinType::String)).is_ok());
        assert_eq!(
            facet.check("abcd", &atomic(BuiltinType::String)).unwrap_err(),
            "[facet 'maxLength'] The value has a length of '4'; this exceeds the allowed maximum \
             length of '3'."
        );
    }
}
