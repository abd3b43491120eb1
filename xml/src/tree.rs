use std::fmt;

pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A name as written in the document, e.g. `cfdi:Addenda` or `xmlns:tfd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn new(prefix: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            local: local.into(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self::new(Some(prefix), local),
            None => Self::new(None, raw),
        }
    }

    fn is_namespace_declaration(&self) -> bool {
        match self.prefix.as_deref() {
            Some(prefix) => prefix == "xmlns",
            None => self.local == "xmlns",
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualifiedName,
    /// Resolved namespace URI, `None` for unprefixed attributes and namespace declarations.
    pub namespace: Option<String>,
    pub value: String,
}

/// Processing instructions are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// An owned, mutable element. Namespace declarations are kept as `xmlns` attributes on the
/// element that declared them, so prefixes survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QualifiedName,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: QualifiedName, namespace: Option<String>) -> Self {
        Self {
            name,
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Converts the root element of `document`. `input` must be the text `document` was parsed
    /// from; it is needed to recover the element prefixes as written.
    pub fn from_document(document: &roxmltree::Document, input: &str) -> Self {
        Self::from_node(document.root_element(), input)
    }

    fn from_node(node: roxmltree::Node, input: &str) -> Self {
        debug_assert!(node.is_element());

        let namespace = node.tag_name().namespace().map(str::to_string);
        let name = raw_tag_name(node, input)
            .map(QualifiedName::parse)
            .unwrap_or_else(|| {
                let prefix = namespace.as_deref().and_then(|ns| prefix_for(node, ns));
                QualifiedName::new(prefix.as_deref(), node.tag_name().name())
            });

        let parent = node.parent_element();
        let mut attributes = Vec::new();
        for ns in node.namespaces() {
            if ns.name() == Some("xml") {
                continue;
            }
            let inherited =
                parent.map_or(false, |p| p.lookup_namespace_uri(ns.name()) == Some(ns.uri()));
            if inherited {
                continue;
            }
            let name = match ns.name() {
                Some(prefix) => QualifiedName::new(Some("xmlns"), prefix),
                None => QualifiedName::new(None, "xmlns"),
            };
            attributes.push(Attribute {
                name,
                namespace: None,
                value: ns.uri().to_string(),
            });
        }
        for attribute in node.attributes() {
            let namespace = attribute.namespace().map(str::to_string);
            let prefix = attribute.namespace().and_then(|ns| prefix_for(node, ns));
            attributes.push(Attribute {
                name: QualifiedName::new(prefix.as_deref(), attribute.name()),
                namespace,
                value: attribute.value().to_string(),
            });
        }

        let children = node
            .children()
            .filter_map(|child| {
                if child.is_element() {
                    Some(Node::Element(Self::from_node(child, input)))
                } else if child.is_text() {
                    child.text().map(|t| Node::Text(t.to_string()))
                } else if child.is_comment() {
                    child.text().map(|t| Node::Comment(t.to_string()))
                } else {
                    None
                }
            })
            .collect();

        Self {
            name,
            namespace,
            attributes,
            children,
        }
    }

    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
        self.namespace.as_deref() == namespace && self.name.local == local
    }

    /// Value of an unprefixed attribute.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| {
                a.name.prefix.is_none() && a.name.local == local && !a.name.is_namespace_declaration()
            })
            .map(|a| a.value.as_str())
    }

    /// Sets an unprefixed attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
        let value = value.into();
        let name = QualifiedName::new(None, local);
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(attribute) => attribute.value = value,
            None => self.attributes.push(Attribute {
                name,
                namespace: None,
                value,
            }),
        }
    }

    /// Prefixes declared on this element, `None` standing for the default namespace.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (Option<&str>, &str)> + '_ {
        self.attributes
            .iter()
            .filter(|a| a.name.is_namespace_declaration())
            .map(|a| {
                let prefix = a.name.prefix.as_ref().map(|_| a.name.local.as_str());
                (prefix, a.value.as_str())
            })
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.children.iter().filter_map(Node::as_element)
    }

    pub fn find_child(&self, namespace: Option<&str>, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(namespace, local))
    }

    /// Index into [`Element::children`] of the first matching child element.
    pub fn position_of(&self, namespace: Option<&str>, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| c.as_element().map_or(false, |e| e.is(namespace, local)))
    }

    /// All elements below this one in document order, this element excluded.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.child_elements().collect::<Vec<_>>().into_iter().rev().collect(),
        }
    }

    pub fn find_descendant(&self, namespace: Option<&str>, local: &str) -> Option<&Element> {
        self.descendants().find(|e| e.is(namespace, local))
    }

    /// Follows indices into [`Element::children`]; an empty path is this element.
    pub fn at_path(&self, path: &[usize]) -> Option<&Element> {
        path.iter().try_fold(self, |element, &index| {
            element.children.get(index).and_then(Node::as_element)
        })
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut element = self;
        for &index in path {
            element = element.children.get_mut(index)?.as_element_mut()?;
        }
        Some(element)
    }

    /// Path of the first element (in document order) for which `predicate` holds.
    pub fn path_of(&self, predicate: &impl Fn(&Element) -> bool) -> Option<Vec<usize>> {
        for (index, child) in self.children.iter().enumerate() {
            let Some(child) = child.as_element() else {
                continue;
            };
            if predicate(child) {
                return Some(vec![index]);
            }
            if let Some(mut rest) = child.path_of(predicate) {
                rest.insert(0, index);
                return Some(rest);
            }
        }
        None
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => text.push_str(t),
                Node::Element(e) => text.push_str(&e.text_content()),
                Node::Comment(_) => {}
            }
        }
        text
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        let children = next.child_elements().collect::<Vec<_>>();
        self.stack.extend(children.into_iter().rev());
        Some(next)
    }
}

/// The start tag text runs from `<` up to the first whitespace, `/` or `>`.
fn raw_tag_name<'a>(node: roxmltree::Node, input: &'a str) -> Option<&'a str> {
    let start = node.range().start;
    let rest = input.get(start..)?.strip_prefix('<')?;
    let end = rest.find(|c: char| c.is_whitespace() || c == '/' || c == '>')?;
    let raw = &rest[..end];
    (!raw.is_empty()).then_some(raw)
}

fn prefix_for(node: roxmltree::Node, namespace: &str) -> Option<String> {
    if namespace == XML_NAMESPACE {
        return Some("xml".to_string());
    }
    node.namespaces()
        .find(|ns| ns.uri() == namespace && ns.name().is_some())
        .and_then(|ns| ns.name())
        .map(str::to_string)
}
