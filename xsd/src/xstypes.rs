use super::error::SchemaError;
use std::fmt;

pub use addenda_builtins::XS_NAMESPACE;
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

pub type NCName = String;
pub type AnyURI = String;

/// An expanded name: optional namespace URI plus local name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace_name: Option<AnyURI>,
    pub local_name: NCName,
}

/// Clark notation (`{uri}local`), which is what the diagnostics print.
impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace_name.as_deref() {
            Some(XS_NAMESPACE) => write!(f, "xs:{}", self.local_name),
            Some(namespace_name) => write!(f, "{{{}}}{}", namespace_name, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

impl QName {
    pub fn with_namespace(
        namespace_name: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self::with_optional_namespace(Some(namespace_name), local_name)
    }

    pub fn with_optional_namespace(
        namespace_name: Option<impl Into<String>>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace_name: namespace_name.map(Into::into),
            local_name: local_name.into(),
        }
    }

    pub fn is_xs(&self) -> bool {
        self.namespace_name.as_deref() == Some(XS_NAMESPACE)
    }

    pub fn matches(&self, namespace_name: Option<&str>, local_name: &str) -> bool {
        self.namespace_name.as_deref() == namespace_name && self.local_name == local_name
    }

    fn qualified(
        prefix: &str,
        local_name: &str,
        context: roxmltree::Node,
    ) -> Result<Self, SchemaError> {
        let resolved_prefix = if prefix == "xml" {
            // The prefix xml is by definition bound to the namespace name
            // http://www.w3.org/XML/1998/namespace.
            // (Namespaces in XML 1.0, §3, Reserved Prefixes and Namespace Names)
            XML_NAMESPACE
        } else {
            context
                .lookup_namespace_uri(Some(prefix))
                .ok_or_else(|| SchemaError::NamePrefixNotResolved(prefix.into()))?
        };
        Ok(Self::with_namespace(resolved_prefix, local_name))
    }

    fn unqualified(local_name: &str, context: roxmltree::Node) -> Self {
        // If there is a default namespace declaration in scope, the expanded name corresponding to
        // an unprefixed element name has the URI of the default namespace as its namespace name.
        // (Namespaces in XML 1.0, §6.2)
        let namespace_name = context.lookup_namespace_uri(None);
        QName::with_optional_namespace(namespace_name, local_name)
    }

    /// Resolves a QName-valued attribute against the namespaces in scope at `context`.
    pub fn parse(source: &str, context: roxmltree::Node) -> Result<Self, SchemaError> {
        let source = source.trim();
        if let Some((prefix, local)) = source.split_once(':') {
            Self::qualified(prefix, local, context)
        } else {
            Ok(Self::unqualified(source, context))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_prefixes_in_scope() {
        let doc = roxmltree::Document::parse(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:t="urn:t"><x/></xs:schema>"#,
        )
        .unwrap();
        let x = doc.root_element().first_element_child().unwrap();
        assert_eq!(
            QName::parse("xs:string", x).unwrap(),
            QName::with_namespace(XS_NAMESPACE, "string")
        );
        assert_eq!(QName::parse("t:Item", x).unwrap().to_string(), "{urn:t}Item");
        assert_eq!(QName::parse("Item", x).unwrap().to_string(), "Item");
        assert!(matches!(
            QName::parse("nope:Item", x),
            Err(SchemaError::NamePrefixNotResolved(prefix)) if prefix == "nope"
        ));
    }
}
