//! Best-effort fix suggestions derived from diagnostic messages.
//!
//! This is a heuristic layer: each message is matched against a list of substring rules and the
//! first rule that applies produces one suggestion. It never attempts to repair anything.
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EXPECTED: Regex = Regex::new(r"Expected is (?:one of )?\( ([^)]+) \)").unwrap();
    static ref ELEMENT: Regex = Regex::new(r"^Element '([^']+)'").unwrap();
    static ref ATTRIBUTE: Regex = Regex::new(r"The attribute '([^']+)'").unwrap();
    static ref ATOMIC_TYPE: Regex =
        Regex::new(r"is not a valid value of the atomic type '([^']+)'").unwrap();
    static ref ENUMERATION_SET: Regex = Regex::new(r"is not an element of the set \{(.*)\}").unwrap();
    static ref PATTERN: Regex = Regex::new(r"is not accepted by the pattern '(.*)'\.$").unwrap();
    static ref ALLOWED_LENGTH: Regex =
        Regex::new(r"the allowed (?:minimum |maximum )?length of '(\d+)'").unwrap();
}

const INTEGER_TYPES: &[&str] = &[
    "xs:integer",
    "xs:int",
    "xs:long",
    "xs:short",
    "xs:byte",
    "xs:nonNegativeInteger",
    "xs:nonPositiveInteger",
    "xs:positiveInteger",
    "xs:negativeInteger",
    "xs:unsignedLong",
    "xs:unsignedInt",
    "xs:unsignedShort",
    "xs:unsignedByte",
];

/// Drops the `{namespace}` part of a Clark name.
fn local_part(name: &str) -> &str {
    match name.rfind('}') {
        Some(end) => &name[end + 1..],
        None => name,
    }
}

fn expected_names(message: &str) -> Option<Vec<&str>> {
    let list = EXPECTED.captures(message)?.get(1)?.as_str();
    Some(list.split(", ").map(|name| local_part(name.trim())).collect())
}

fn captured<'m>(regex: &Regex, message: &'m str) -> Option<&'m str> {
    regex.captures(message)?.get(1).map(|m| m.as_str())
}

fn quoted_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("<{name}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The suggestion for a single diagnostic message.
pub fn suggest_for(message: &str) -> String {
    let element = captured(&ELEMENT, message).map(local_part);

    if let Some(type_name) = captured(&ATOMIC_TYPE, message) {
        return match type_name {
            "xs:date" => "Use the date format YYYY-MM-DD, e.g. 2024-01-31.".to_string(),
            "xs:dateTime" => {
                "Use the date-time format YYYY-MM-DDThh:mm:ss, e.g. 2024-01-31T13:45:00."
                    .to_string()
            }
            "xs:decimal" => "Use a plain decimal number with '.' as the decimal separator and no \
                             thousands separators or currency symbols, e.g. 1234.50."
                .to_string(),
            "xs:boolean" => "Use 'true' or 'false' (or 1 and 0).".to_string(),
            t if INTEGER_TYPES.contains(&t) => {
                format!("Use a whole number without decimals for the {t} value, e.g. 42.")
            }
            t => format!("Correct the value so that it is a valid {t}."),
        };
    }

    if message.contains("Schema compilation failed") {
        return "Fix the XSD schema first; no document can be validated against it until it \
                compiles."
            .to_string();
    }

    if message.contains("Missing child element") {
        if let Some(names) = expected_names(message) {
            let parent = element.unwrap_or("the parent element");
            return match names.as_slice() {
                [single] => format!("Add the missing element <{single}> inside <{parent}>."),
                many => format!(
                    "Add one of the missing elements {} inside <{parent}>.",
                    quoted_list(many)
                ),
            };
        }
        return "Add the child elements the schema requires.".to_string();
    }

    if message.contains("not expected") {
        let found = element.unwrap_or("this element");
        return match expected_names(message) {
            Some(names) => format!(
                "Element <{found}> is out of order or not allowed here; the schema expects {} at \
                 this position. Check the element order.",
                quoted_list(&names)
            ),
            None => format!(
                "Remove element <{found}> or move it to a position the schema allows."
            ),
        };
    }

    if message.contains("No matching global declaration") || message.contains("namespace") {
        return "Check the namespace declaration (xmlns) of the root element; it must match the \
                schema's target namespace."
            .to_string();
    }

    if message.contains("is required but missing") {
        let attribute = captured(&ATTRIBUTE, message).map(local_part).unwrap_or("?");
        return format!("Add the required attribute '{attribute}'.");
    }

    if message.contains("is not allowed") && message.contains("attribute") {
        let attribute = captured(&ATTRIBUTE, message).map(local_part).unwrap_or("?");
        return format!("Remove the attribute '{attribute}'; the schema does not declare it.");
    }

    if message.contains("[facet 'enumeration']") {
        return match captured(&ENUMERATION_SET, message) {
            Some(set) => format!("Use one of the allowed values: {set}."),
            None => "Use one of the values the schema enumerates.".to_string(),
        };
    }

    if message.contains("[facet 'pattern']") {
        return match captured(&PATTERN, message) {
            Some(pattern) => format!("Adjust the value so that it matches the pattern '{pattern}'."),
            None => "Adjust the value so that it matches the required pattern.".to_string(),
        };
    }

    if message.contains("[facet 'length']")
        || message.contains("[facet 'minLength']")
        || message.contains("[facet 'maxLength']")
    {
        let limit = captured(&ALLOWED_LENGTH, message).unwrap_or("?");
        return if message.contains("minLength") {
            format!("Lengthen the value to at least {limit} characters.")
        } else if message.contains("maxLength") {
            format!("Shorten the value to at most {limit} characters.")
        } else {
            format!("Make the value exactly {limit} characters long.")
        };
    }

    if message.contains("[facet '") {
        return "Adjust the value to the range or precision the schema allows.".to_string();
    }

    "Review the document structure against the schema.".to_string()
}

/// One suggestion per message, duplicates removed, first occurrence order kept.
pub fn suggest<'m>(messages: impl IntoIterator<Item = &'m str>) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();
    for message in messages {
        let suggestion = suggest_for(message);
        if !suggestions.contains(&suggestion) {
            suggestions.push(suggestion);
        }
    }
    suggestions
}
