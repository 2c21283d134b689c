//! Tree plumbing shared by the ACBF reader and writer: namespace
//! normalization, document validation, path resolution, and the small
//! element helpers both engines lean on.

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::acbf::{ACBF_ROOT, SUPPORTED_NAMESPACES};
use crate::error::{Error, Result};

/// Parse bytes into a validated, namespace-free ACBF tree.
pub fn parse_document(bytes: &[u8]) -> Result<Element> {
    let mut root = Element::parse(bytes)?;
    validate_root(&root)?;
    strip_namespaces(&mut root);
    Ok(root)
}

/// Serialize a tree as indented UTF-8 XML with a declaration.
pub fn serialize_document(root: &Element) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let config = EmitterConfig::new().perform_indent(true);
    root.write_with_config(&mut out, config)
        .map_err(|err| Error::XmlWrite(err.to_string()))?;
    Ok(out)
}

/// Check that a root element identifies a supported ACBF document.
///
/// A wrong root tag means the document is some other format entirely; a
/// right tag under an unrecognized namespace means a schema version this
/// adapter cannot safely merge into. Callers need to tell those apart.
pub fn validate_root(root: &Element) -> Result<()> {
    if root.name != ACBF_ROOT {
        return Err(Error::NotAcbf);
    }
    match root.namespace.as_deref() {
        None => Ok(()),
        Some(ns) if SUPPORTED_NAMESPACES.contains(&ns) => Ok(()),
        Some(ns) => Err(Error::UnsupportedVersion(ns.to_string())),
    }
}

/// Strip namespace qualification from every element in the tree.
///
/// All later logic looks elements up by plain name. Idempotent: a stripped
/// tree carries nothing left to strip.
pub fn strip_namespaces(element: &mut Element) {
    element.prefix = None;
    element.namespace = None;
    element.namespaces = None;
    for child in &mut element.children {
        if let XMLNode::Element(e) = child {
            strip_namespaces(e);
        }
    }
}

/// Walk a slash-separated path from `root`, returning the leaf if every
/// segment exists.
pub fn find_path<'a>(root: &'a Element, path: &str) -> Option<&'a Element> {
    let mut current = root;
    for segment in path.split('/') {
        current = current.get_child(segment)?;
    }
    Some(current)
}

/// Walk a slash-separated path from `root`, creating each missing segment,
/// and return the leaf.
///
/// Repeated calls with the same path resolve to the same elements; ancestors
/// are never duplicated.
pub fn ensure_path<'a>(root: &'a mut Element, path: &str) -> &'a mut Element {
    let mut current = root;
    for segment in path.split('/') {
        let position = current
            .children
            .iter()
            .position(|node| node.as_element().is_some_and(|e| e.name == segment));
        let position = match position {
            Some(i) => i,
            None => {
                current
                    .children
                    .push(XMLNode::Element(Element::new(segment)));
                current.children.len() - 1
            }
        };
        current = match &mut current.children[position] {
            XMLNode::Element(e) => e,
            // position() above only matches element nodes
            _ => unreachable!(),
        };
    }
    current
}

/// Depth-first search for the first descendant element with the given name.
pub fn find_descendant<'a>(root: &'a Element, name: &str) -> Option<&'a Element> {
    for child in root.children.iter().filter_map(XMLNode::as_element) {
        if child.name == name {
            return Some(child);
        }
        if let Some(found) = find_descendant(child, name) {
            return Some(found);
        }
    }
    None
}

/// Concatenated text/CDATA content of an element, trimmed; `None` when
/// blank.
pub fn element_text(element: &Element) -> Option<String> {
    let mut text = String::new();
    for node in &element.children {
        match node {
            XMLNode::Text(t) | XMLNode::CData(t) => text.push_str(t),
            _ => {}
        }
    }
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Pick one element out of repeated language-tagged siblings.
///
/// Priority: no `lang` attribute, then `lang="en"`, then whatever comes
/// first.
pub fn preferred_by_lang<'a>(elements: &[&'a Element]) -> Option<&'a Element> {
    elements
        .iter()
        .copied()
        .find(|e| e.attr("lang").is_none())
        .or_else(|| elements.iter().copied().find(|e| e.attr("lang") == Some("en")))
        .or_else(|| elements.first().copied())
}

/// Append a child element with optional text and attributes.
pub fn add_element(parent: &mut Element, name: &str, text: &str, attrs: &[(&str, &str)]) {
    let mut element = Element::new(name);
    if !text.is_empty() {
        element.children.push(XMLNode::Text(text.to_string()));
    }
    for (key, value) in attrs {
        element
            .attributes
            .insert((*key).to_string(), (*value).to_string());
    }
    parent.children.push(XMLNode::Element(element));
}

/// Convenience accessors over [`xmltree::Element`].
pub trait ElementExt {
    /// Child elements with the given name, in document order.
    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a;

    /// All child elements, in document order.
    fn child_elements(&self) -> impl Iterator<Item = &Element>;

    /// An attribute value, if present.
    fn attr(&self, name: &str) -> Option<&str>;

    /// Remove every child element with the given name.
    fn remove_children(&mut self, name: &str);
}

impl ElementExt for Element {
    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children
            .iter()
            .filter_map(XMLNode::as_element)
            .filter(move |e| e.name == name)
    }

    fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XMLNode::as_element)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn remove_children(&mut self, name: &str) {
        self.children
            .retain(|node| node.as_element().is_none_or(|e| e.name != name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acbf::NS_ACBF_1_1;

    fn parse(xml: &str) -> Element {
        Element::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_validate_plain_root() {
        let root = parse("<ACBF><body/></ACBF>");
        assert!(validate_root(&root).is_ok());
    }

    #[test]
    fn test_validate_namespaced_root() {
        let root = parse(&format!("<ACBF xmlns=\"{NS_ACBF_1_1}\"><body/></ACBF>"));
        assert!(validate_root(&root).is_ok());
    }

    #[test]
    fn test_validate_wrong_root() {
        let root = parse("<Comic><body/></Comic>");
        assert!(matches!(validate_root(&root), Err(Error::NotAcbf)));
    }

    #[test]
    fn test_validate_unknown_namespace() {
        let root = parse("<ACBF xmlns=\"http://www.acbf.info/xml/acbf/9.9\"><body/></ACBF>");
        match validate_root(&root) {
            Err(Error::UnsupportedVersion(ns)) => {
                assert_eq!(ns, "http://www.acbf.info/xml/acbf/9.9");
            }
            other => panic!("expected UnsupportedVersion, got {other:?}"),
        }
    }

    #[test]
    fn test_strip_namespaces_idempotent() {
        let mut root = parse(&format!(
            "<ACBF xmlns=\"{NS_ACBF_1_1}\"><meta-data><book-info/></meta-data></ACBF>"
        ));
        strip_namespaces(&mut root);
        assert!(root.namespace.is_none());
        let meta = root.get_child("meta-data").unwrap();
        assert!(meta.namespace.is_none());

        strip_namespaces(&mut root);
        assert!(root.namespace.is_none());
    }

    #[test]
    fn test_ensure_path_creates_ancestors() {
        let mut root = Element::new("ACBF");
        ensure_path(&mut root, "meta-data/book-info/sequence");
        assert!(find_path(&root, "meta-data/book-info/sequence").is_some());
    }

    #[test]
    fn test_ensure_path_no_duplicates() {
        let mut root = Element::new("ACBF");
        ensure_path(&mut root, "meta-data/book-info");
        ensure_path(&mut root, "meta-data/publish-info");
        ensure_path(&mut root, "meta-data/book-info");

        let metas: Vec<_> = root.children_named("meta-data").collect();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].children_named("book-info").count(), 1);
        assert_eq!(metas[0].children_named("publish-info").count(), 1);
    }

    #[test]
    fn test_find_descendant() {
        let root = parse(
            "<ACBF><meta-data><publish-info><publisher>Dark Horse</publisher></publish-info></meta-data></ACBF>",
        );
        let publisher = find_descendant(&root, "publisher").unwrap();
        assert_eq!(element_text(publisher), Some("Dark Horse".to_string()));
        assert!(find_descendant(&root, "nonexistent").is_none());
    }

    #[test]
    fn test_preferred_by_lang() {
        let root = parse(
            "<book-info>\
             <book-title lang=\"fr\">Tintin</book-title>\
             <book-title lang=\"en\">Tintin EN</book-title>\
             </book-info>",
        );
        let titles: Vec<_> = root.children_named("book-title").collect();
        let chosen = preferred_by_lang(&titles).unwrap();
        assert_eq!(element_text(chosen), Some("Tintin EN".to_string()));

        let root = parse(
            "<book-info>\
             <book-title lang=\"en\">English</book-title>\
             <book-title>Untagged</book-title>\
             </book-info>",
        );
        let titles: Vec<_> = root.children_named("book-title").collect();
        let chosen = preferred_by_lang(&titles).unwrap();
        assert_eq!(element_text(chosen), Some("Untagged".to_string()));

        let root = parse("<book-info><book-title lang=\"fr\">Seul</book-title></book-info>");
        let titles: Vec<_> = root.children_named("book-title").collect();
        let chosen = preferred_by_lang(&titles).unwrap();
        assert_eq!(element_text(chosen), Some("Seul".to_string()));
    }

    #[test]
    fn test_serialize_has_declaration() {
        let root = parse("<ACBF><body/></ACBF>");
        let bytes = serialize_document(&root).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml"));
        assert!(text.contains("<ACBF"));
    }

    #[test]
    fn test_parse_document_rejects_garbage() {
        assert!(matches!(parse_document(b"not xml"), Err(Error::Malformed(_))));
    }
}
