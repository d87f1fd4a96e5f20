//! Thin helpers over the XML tree.
//!
//! The reader works on a parsed [`roxmltree`] document. Everything it needs
//! from the tree is collected here: namespace-qualified name tests, `xml:id`
//! lookup, child element searches and inner-text flattening.

use roxmltree::Node;

/// Namespace of all InkML elements.
pub(crate) const INKML_NS: &str = "http://www.w3.org/2003/InkML";

/// Namespace of the `xml:id` attribute.
pub(crate) const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Returns true if `node` is an InkML element with local name `name`.
pub(crate) fn is_inkml(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.has_tag_name((INKML_NS, name))
}

/// Reads the id attribute of an element.
///
/// The standard puts `id` in the `xml` namespace, but some writers omit the
/// namespace, so a plain `id` attribute is accepted as a fallback.
pub(crate) fn id_of<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((XML_NS, "id")).or_else(|| node.attribute("id"))
}

/// Finds the first InkML child element with local name `name`.
pub(crate) fn find_child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|child| is_inkml(*child, name))
}

/// Collects all InkML child elements with local name `name`, in document
/// order.
pub(crate) fn find_children<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Vec<Node<'a, 'i>> {
    node.children().filter(|child| is_inkml(*child, name)).collect()
}

/// Flattens the textual content of an element.
///
/// Concatenates every text node below `node` in document order: the
/// element's own text, then each child's inner text and tail. The tail of
/// `node` itself is not part of its content.
pub(crate) fn inner_text(node: Node<'_, '_>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        if descendant.is_text() {
            if let Some(chunk) = descendant.text() {
                text.push_str(chunk);
            }
        }
    }
    text
}
