//! Element tree -> XML string.
//!
//! Serialization is exact: no indentation or whitespace is invented, so a
//! parse/serialize round trip preserves every text and tail slot. Elements
//! without text or children collapse to the self-closing form.

use crate::tree::{Element, Node};
use std::borrow::Cow;

/// Serialize a tree rooted at `root`. The root's own tail is not emitted.
pub fn to_xml(root: &Element) -> String {
    let mut out = String::new();
    write_element(root, &mut out);
    out
}

/// Serialize a single node, tail included. Useful for error reporting.
pub fn node_to_xml(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (k, v) in &el.attrs {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(&escape_attr(v));
        out.push('"');
    }
    if el.text.is_none() && el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    if let Some(text) = &el.text {
        out.push_str(&escape_text(text));
    }
    for child in &el.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(el) => write_element(el, out),
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(&c.text);
            out.push_str("-->");
        }
        Node::Instruction(pi) => {
            out.push_str("<?");
            out.push_str(&pi.content);
            out.push_str("?>");
        }
    }
    if let Some(tail) = node.tail() {
        out.push_str(&escape_text(tail));
    }
}

/// Escape text content in a single pass, allocating only when needed.
fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>')) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| matches!(b, b'&' | b'<' | b'>' | b'"')) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_document;

    #[test]
    fn round_trip_preserves_text_and_tails() {
        let xml = r#"<form>lead<group name="g"><field name="a"/>mid</group>trail</form>"#;
        let root = parse_document(xml).unwrap();
        assert_eq!(to_xml(&root), xml);
    }

    #[test]
    fn empty_elements_self_close() {
        let root = parse_document("<form><field name=\"a\"></field></form>").unwrap();
        assert_eq!(to_xml(&root), "<form><field name=\"a\"/></form>");
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut el = Element::new("t");
        el.set_attr("label", "a \"b\" & c");
        el.text = Some("1 < 2".to_string());
        assert_eq!(
            to_xml(&el),
            "<t label=\"a &quot;b&quot; &amp; c\">1 &lt; 2</t>"
        );
    }

    #[test]
    fn comments_and_instructions_round_trip() {
        let xml = "<t><!-- note --><?target data?><a/></t>";
        let root = parse_document(xml).unwrap();
        assert_eq!(to_xml(&root), xml);
    }
}
