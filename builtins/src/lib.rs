//! Lexical spaces of the XML Schema built-in datatypes (XSD 1.1 Part 2, §3).
//!
//! Only lexical validity is checked; values are never converted into a value space
//! representation beyond what is needed for range checks of the bounded integer types.

pub mod meta;

use lazy_static::lazy_static;
use meta::Whitespace;
use regex::Regex;

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    AnySimpleType,
    AnyAtomicType,
    String,
    NormalizedString,
    Token,
    Language,
    Name,
    NcName,
    NmToken,
    NmTokens,
    Id,
    IdRef,
    IdRefs,
    Entity,
    Entities,
    AnyUri,
    QName,
    Notation,
    Boolean,
    Decimal,
    Integer,
    NonPositiveInteger,
    NegativeInteger,
    NonNegativeInteger,
    PositiveInteger,
    Long,
    Int,
    Short,
    Byte,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    Float,
    Double,
    Duration,
    YearMonthDuration,
    DayTimeDuration,
    DateTime,
    DateTimeStamp,
    Time,
    Date,
    GYearMonth,
    GYear,
    GMonthDay,
    GDay,
    GMonth,
    HexBinary,
    Base64Binary,
}

lazy_static! {
    static ref LANGUAGE: Regex = Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap();
    static ref NAME: Regex = Regex::new(r"^[:_\p{L}][-.:_\p{L}\p{N}\p{M}]*$").unwrap();
    static ref NCNAME: Regex = Regex::new(r"^[_\p{L}][-._\p{L}\p{N}\p{M}]*$").unwrap();
    static ref NMTOKEN: Regex = Regex::new(r"^[-.:_\p{L}\p{N}\p{M}]+$").unwrap();
    static ref QNAME: Regex = Regex::new(
        r"^([_\p{L}][-._\p{L}\p{N}\p{M}]*:)?[_\p{L}][-._\p{L}\p{N}\p{M}]*$"
    )
    .unwrap();
    static ref DECIMAL: Regex = Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref FLOAT: Regex =
        Regex::new(r"^([+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?|-?INF|\+INF|NaN)$").unwrap();
    static ref DURATION: Regex = Regex::new(
        r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$"
    )
    .unwrap();
    static ref YEAR_MONTH_DURATION: Regex = Regex::new(r"^-?P(\d+Y)?(\d+M)?$").unwrap();
    static ref DAY_TIME_DURATION: Regex =
        Regex::new(r"^-?P(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$").unwrap();
    static ref DATE_TIME: Regex = Regex::new(
        r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$"
    )
    .unwrap();
    static ref TIME: Regex =
        Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref DATE: Regex =
        Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_YEAR_MONTH: Regex =
        Regex::new(r"^(-?\d{4,})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_YEAR: Regex = Regex::new(r"^(-?\d{4,})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_MONTH_DAY: Regex = Regex::new(r"^--(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_DAY: Regex = Regex::new(r"^---(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref G_MONTH: Regex = Regex::new(r"^--(\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap();
    static ref HEX_BINARY: Regex = Regex::new(r"^([0-9a-fA-F]{2})*$").unwrap();
    static ref BASE64_BINARY: Regex = Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").unwrap();
}

impl BuiltinType {
    pub const ALL: &'static [BuiltinType] = &[
        Self::AnySimpleType,
        Self::AnyAtomicType,
        Self::String,
        Self::NormalizedString,
        Self::Token,
        Self::Language,
        Self::Name,
        Self::NcName,
        Self::NmToken,
        Self::NmTokens,
        Self::Id,
        Self::IdRef,
        Self::IdRefs,
        Self::Entity,
        Self::Entities,
        Self::AnyUri,
        Self::QName,
        Self::Notation,
        Self::Boolean,
        Self::Decimal,
        Self::Integer,
        Self::NonPositiveInteger,
        Self::NegativeInteger,
        Self::NonNegativeInteger,
        Self::PositiveInteger,
        Self::Long,
        Self::Int,
        Self::Short,
        Self::Byte,
        Self::UnsignedLong,
        Self::UnsignedInt,
        Self::UnsignedShort,
        Self::UnsignedByte,
        Self::Float,
        Self::Double,
        Self::Duration,
        Self::YearMonthDuration,
        Self::DayTimeDuration,
        Self::DateTime,
        Self::DateTimeStamp,
        Self::Time,
        Self::Date,
        Self::GYearMonth,
        Self::GYear,
        Self::GMonthDay,
        Self::GDay,
        Self::GMonth,
        Self::HexBinary,
        Self::Base64Binary,
    ];

    /// Local name of the datatype in the XSD namespace.
    pub fn name(self) -> &'static str {
        match self {
            Self::AnySimpleType => "anySimpleType",
            Self::AnyAtomicType => "anyAtomicType",
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::Language => "language",
            Self::Name => "Name",
            Self::NcName => "NCName",
            Self::NmToken => "NMTOKEN",
            Self::NmTokens => "NMTOKENS",
            Self::Id => "ID",
            Self::IdRef => "IDREF",
            Self::IdRefs => "IDREFS",
            Self::Entity => "ENTITY",
            Self::Entities => "ENTITIES",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
            Self::Notation => "NOTATION",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::Float => "float",
            Self::Double => "double",
            Self::Duration => "duration",
            Self::YearMonthDuration => "yearMonthDuration",
            Self::DayTimeDuration => "dayTimeDuration",
            Self::DateTime => "dateTime",
            Self::DateTimeStamp => "dateTimeStamp",
            Self::Time => "time",
            Self::Date => "date",
            Self::GYearMonth => "gYearMonth",
            Self::GYear => "gYear",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::GMonth => "gMonth",
            Self::HexBinary => "hexBinary",
            Self::Base64Binary => "base64Binary",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, meta::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| meta::Error::UnknownBuiltin(name.to_string()))
    }

    /// The name as it shows up in diagnostics, e.g. `xs:date`.
    pub fn prefixed_name(self) -> String {
        format!("xs:{}", self.name())
    }

    pub fn whitespace(self) -> Whitespace {
        match self {
            Self::String | Self::AnySimpleType | Self::AnyAtomicType => Whitespace::Preserve,
            Self::NormalizedString => Whitespace::Replace,
            _ => Whitespace::Collapse,
        }
    }

    /// Whether the value space is ordered numerically, which decides how range facets compare.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Decimal | Self::Float | Self::Double) || self.is_integer()
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Integer
                | Self::NonPositiveInteger
                | Self::NegativeInteger
                | Self::NonNegativeInteger
                | Self::PositiveInteger
                | Self::Long
                | Self::Int
                | Self::Short
                | Self::Byte
                | Self::UnsignedLong
                | Self::UnsignedInt
                | Self::UnsignedShort
                | Self::UnsignedByte
        )
    }

    /// Checks an already whitespace-normalized literal against the lexical space.
    pub fn is_valid(self, literal: &str) -> bool {
        match self {
            Self::AnySimpleType | Self::AnyAtomicType | Self::String => true,
            Self::NormalizedString => !literal.contains(['\t', '\n', '\r']),
            Self::Token => {
                !literal.contains(['\t', '\n', '\r'])
                    && !literal.starts_with(' ')
                    && !literal.ends_with(' ')
                    && !literal.contains("  ")
            }
            Self::Language => LANGUAGE.is_match(literal),
            Self::Name => NAME.is_match(literal),
            Self::NcName | Self::Id | Self::IdRef | Self::Entity => NCNAME.is_match(literal),
            Self::NmToken => NMTOKEN.is_match(literal),
            Self::NmTokens => is_non_empty_list(literal, |t| NMTOKEN.is_match(t)),
            Self::IdRefs | Self::Entities => is_non_empty_list(literal, |t| NCNAME.is_match(t)),
            Self::AnyUri => !literal.contains(['\t', '\n', '\r']),
            Self::QName | Self::Notation => QNAME.is_match(literal),
            Self::Boolean => matches!(literal, "true" | "false" | "1" | "0"),
            Self::Decimal => DECIMAL.is_match(literal),
            Self::Float | Self::Double => FLOAT.is_match(literal),
            Self::Integer => INTEGER.is_match(literal),
            Self::NonPositiveInteger => integer_in_range(literal, None, Some(0)),
            Self::NegativeInteger => integer_in_range(literal, None, Some(-1)),
            Self::NonNegativeInteger => integer_in_range(literal, Some(0), None),
            Self::PositiveInteger => integer_in_range(literal, Some(1), None),
            Self::Long => integer_in_range(literal, Some(i64::MIN as i128), Some(i64::MAX as i128)),
            Self::Int => integer_in_range(literal, Some(i32::MIN as i128), Some(i32::MAX as i128)),
            Self::Short => integer_in_range(literal, Some(i16::MIN as i128), Some(i16::MAX as i128)),
            Self::Byte => integer_in_range(literal, Some(i8::MIN as i128), Some(i8::MAX as i128)),
            Self::UnsignedLong => integer_in_range(literal, Some(0), Some(u64::MAX as i128)),
            Self::UnsignedInt => integer_in_range(literal, Some(0), Some(u32::MAX as i128)),
            Self::UnsignedShort => integer_in_range(literal, Some(0), Some(u16::MAX as i128)),
            Self::UnsignedByte => integer_in_range(literal, Some(0), Some(u8::MAX as i128)),
            Self::Duration => is_duration(&DURATION, literal),
            Self::YearMonthDuration => is_duration(&YEAR_MONTH_DURATION, literal),
            Self::DayTimeDuration => is_duration(&DAY_TIME_DURATION, literal),
            Self::DateTime => is_date_time(literal, false),
            Self::DateTimeStamp => is_date_time(literal, true),
            Self::Time => TIME.captures(literal).map_or(false, |c| {
                valid_time(&c[1], &c[2], &c[3]) && valid_timezone(c.get(5).map(|m| m.as_str()))
            }),
            Self::Date => DATE.captures(literal).map_or(false, |c| {
                valid_date(&c[1], &c[2], &c[3]) && valid_timezone(c.get(4).map(|m| m.as_str()))
            }),
            Self::GYearMonth => G_YEAR_MONTH.captures(literal).map_or(false, |c| {
                valid_month(&c[2]) && valid_timezone(c.get(3).map(|m| m.as_str()))
            }),
            Self::GYear => G_YEAR
                .captures(literal)
                .map_or(false, |c| valid_timezone(c.get(2).map(|m| m.as_str()))),
            Self::GMonthDay => G_MONTH_DAY.captures(literal).map_or(false, |c| {
                // February 29 is allowed, there is no year to contradict it
                valid_date("2000", &c[1], &c[2]) && valid_timezone(c.get(3).map(|m| m.as_str()))
            }),
            Self::GDay => G_DAY.captures(literal).map_or(false, |c| {
                c[1].parse::<u32>().map_or(false, |d| (1..=31).contains(&d))
                    && valid_timezone(c.get(2).map(|m| m.as_str()))
            }),
            Self::GMonth => G_MONTH.captures(literal).map_or(false, |c| {
                valid_month(&c[1]) && valid_timezone(c.get(2).map(|m| m.as_str()))
            }),
            Self::HexBinary => HEX_BINARY.is_match(literal),
            Self::Base64Binary => {
                let compact: std::string::String =
                    literal.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                compact.len() % 4 == 0 && BASE64_BINARY.is_match(&compact)
            }
        }
    }
}

fn is_non_empty_list(literal: &str, item_valid: impl Fn(&str) -> bool) -> bool {
    let mut items = literal.split_ascii_whitespace().peekable();
    items.peek().is_some() && items.all(item_valid)
}

fn integer_in_range(literal: &str, min: Option<i128>, max: Option<i128>) -> bool {
    if !INTEGER.is_match(literal) {
        return false;
    }
    match literal.parse::<i128>() {
        Ok(value) => min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max),
        // Only unbounded directions can overflow an i128
        Err(_) => {
            let negative = literal.starts_with('-');
            if negative {
                min.is_none()
            } else {
                max.is_none()
            }
        }
    }
}

fn is_duration(pattern: &Regex, literal: &str) -> bool {
    pattern.is_match(literal)
        && !literal.ends_with('P')
        && !literal.ends_with('T')
}

fn is_date_time(literal: &str, require_timezone: bool) -> bool {
    let Some(c) = DATE_TIME.captures(literal) else {
        return false;
    };
    let timezone = c.get(8).map(|m| m.as_str());
    if require_timezone && timezone.is_none() {
        return false;
    }
    valid_date(&c[1], &c[2], &c[3]) && valid_time(&c[4], &c[5], &c[6]) && valid_timezone(timezone)
}

fn valid_month(month: &str) -> bool {
    month.parse::<u32>().map_or(false, |m| (1..=12).contains(&m))
}

fn valid_date(year: &str, month: &str, day: &str) -> bool {
    let (Ok(year), Ok(month), Ok(day)) = (
        year.parse::<i64>(),
        month.parse::<u32>(),
        day.parse::<u32>(),
    ) else {
        return false;
    };
    if !(1..=12).contains(&month) || day == 0 {
        return false;
    }
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days_in_month = match month {
        2 if leap => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    };
    day <= days_in_month
}

fn valid_time(hour: &str, minute: &str, second: &str) -> bool {
    let (Ok(hour), Ok(minute), Ok(second)) = (
        hour.parse::<u32>(),
        minute.parse::<u32>(),
        second.parse::<u32>(),
    ) else {
        return false;
    };
    // 24:00:00 is the only allowed spelling of end-of-day
    (hour < 24 && minute < 60 && second < 60) || (hour == 24 && minute == 0 && second == 0)
}

fn valid_timezone(timezone: Option<&str>) -> bool {
    match timezone {
        None | Some("Z") => true,
        Some(tz) => {
            let (Ok(hours), Ok(minutes)) = (tz[1..3].parse::<u32>(), tz[4..6].parse::<u32>())
            else {
                return false;
            };
            minutes < 60 && (hours < 14 || (hours == 14 && minutes == 0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_by_local_name() {
        assert_eq!(BuiltinType::from_name("date").unwrap(), BuiltinType::Date);
        assert_eq!(BuiltinType::from_name("NCName").unwrap(), BuiltinType::NcName);
        assert!(BuiltinType::from_name("datum").is_err());
    }

    #[test]
    fn dates_check_the_calendar() {
        assert!(BuiltinType::Date.is_valid("2024-02-29"));
        assert!(!BuiltinType::Date.is_valid("2023-02-29"));
        assert!(!BuiltinType::Date.is_valid("2024-13-01"));
        assert!(!BuiltinType::Date.is_valid("31/01/2024"));
        assert!(BuiltinType::Date.is_valid("2024-01-31-06:00"));
    }

    #[test]
    fn date_times() {
        assert!(BuiltinType::DateTime.is_valid("2024-01-15T10:30:00"));
        assert!(BuiltinType::DateTime.is_valid("2024-01-15T24:00:00Z"));
        assert!(!BuiltinType::DateTime.is_valid("2024-01-15T24:00:01"));
        assert!(!BuiltinType::DateTime.is_valid("2024-01-15 10:30:00"));
        assert!(!BuiltinType::DateTimeStamp.is_valid("2024-01-15T10:30:00"));
        assert!(BuiltinType::DateTimeStamp.is_valid("2024-01-15T10:30:00+01:00"));
    }

    #[test]
    fn numbers() {
        assert!(BuiltinType::Decimal.is_valid("-1234.50"));
        assert!(BuiltinType::Decimal.is_valid(".5"));
        assert!(!BuiltinType::Decimal.is_valid("1,234.50"));
        assert!(!BuiltinType::Decimal.is_valid("1e3"));
        assert!(BuiltinType::Double.is_valid("1e3"));
        assert!(BuiltinType::Float.is_valid("-INF"));
        assert!(BuiltinType::UnsignedByte.is_valid("255"));
        assert!(!BuiltinType::UnsignedByte.is_valid("256"));
        assert!(!BuiltinType::PositiveInteger.is_valid("0"));
        assert!(BuiltinType::Integer.is_valid("123456789012345678901234567890123456789012"));
        assert!(!BuiltinType::Long.is_valid("123456789012345678901234567890123456789012"));
    }

    #[test]
    fn durations_need_a_component() {
        assert!(BuiltinType::Duration.is_valid("P1Y2M3DT4H5M6.5S"));
        assert!(!BuiltinType::Duration.is_valid("P"));
        assert!(!BuiltinType::Duration.is_valid("P1DT"));
        assert!(BuiltinType::DayTimeDuration.is_valid("PT5M"));
        assert!(!BuiltinType::YearMonthDuration.is_valid("P1D"));
    }

    #[test]
    fn names_and_binary() {
        assert!(BuiltinType::NcName.is_valid("Addenda_1"));
        assert!(!BuiltinType::NcName.is_valid("cfdi:Addenda"));
        assert!(BuiltinType::QName.is_valid("cfdi:Addenda"));
        assert!(BuiltinType::NmTokens.is_valid("a b c"));
        assert!(!BuiltinType::NmTokens.is_valid(""));
        assert!(BuiltinType::HexBinary.is_valid("0FB7"));
        assert!(!BuiltinType::HexBinary.is_valid("0FB"));
        assert!(BuiltinType::Base64Binary.is_valid("SGVsbG8="));
        assert!(!BuiltinType::Base64Binary.is_valid("SGVsbG8"));
    }

    #[test]
    fn whitespace_facets() {
        assert_eq!(BuiltinType::String.whitespace(), Whitespace::Preserve);
        assert_eq!(BuiltinType::NormalizedString.whitespace(), Whitespace::Replace);
        assert_eq!(BuiltinType::Date.whitespace(), Whitespace::Collapse);
    }
}
