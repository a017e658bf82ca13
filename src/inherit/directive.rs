//! The directive interpreter: one branch per `position` value.

use crate::inherit::attrs::apply_attributes;
use crate::inherit::errors::ApplyError;
use crate::inherit::locator::spec_repr;
use crate::inherit::mover::resolve_moves;
use crate::tree::{push_text, Comment, Element, Node, NodePath};

/// Attribute stamped on the first element that takes a replaced node's
/// place when provenance branding is enabled. Its value is the tag of the
/// replaced node.
pub const REPLACED_TAG_ATTR: &str = "data-replaced-tag";

/// Text body that marks a replacement element as a wrapper: it receives a
/// deep copy of the replaced node as its last child.
const WRAP_PLACEHOLDER: &str = "$0";

/// Operation named by a spec's `position` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Inside,
    After,
    Before,
    Replace,
    Attributes,
}

impl Position {
    /// Read the directive off a spec; a missing `position` means `inside`.
    /// `move` is only meaningful on payload children, so it is rejected
    /// here along with any unknown value.
    pub fn from_spec(spec: &Element) -> Result<Position, ApplyError> {
        match spec.attr("position").unwrap_or("inside") {
            "inside" => Ok(Position::Inside),
            "after" => Ok(Position::After),
            "before" => Ok(Position::Before),
            "replace" => Ok(Position::Replace),
            "attributes" => Ok(Position::Attributes),
            other => Err(ApplyError::UnknownPosition {
                position: other.to_string(),
                spec: spec_repr(spec),
            }),
        }
    }
}

/// Apply one located spec to the base tree and return the (possibly new)
/// root. The spec is consumed: its children are grafted into the tree.
pub(crate) fn apply_directive(
    mut source: Element,
    mut anchor: NodePath,
    mut spec: Element,
    branding: bool,
    pre_locate: &mut dyn FnMut(&mut Element),
) -> Result<Element, ApplyError> {
    let position = Position::from_spec(&spec)?;
    let context = spec_repr(&spec);
    match position {
        Position::Attributes => {
            let target = source
                .element_mut(&anchor)
                .expect("anchor was located in this tree");
            apply_attributes(target, &spec)?;
            Ok(source)
        }
        Position::Inside => {
            let mut payload = std::mem::take(&mut spec.children);
            resolve_moves(&mut source, &mut anchor, &mut payload, pre_locate, &context)?;
            let target = source
                .element_mut(&anchor)
                .expect("anchor was located in this tree");
            if let Some(text) = &spec.text {
                add_text_inside(target, text);
            }
            target.children.extend(payload);
            Ok(source)
        }
        Position::After => {
            ensure_not_root(&anchor, &context, "after")?;
            let mut payload = std::mem::take(&mut spec.children);
            resolve_moves(&mut source, &mut anchor, &mut payload, pre_locate, &context)?;
            // The spec's leading text extends the located node's tail, so
            // it lands between the node and the inserted payload.
            if let Some(text) = &spec.text {
                let node = source
                    .node_mut(&anchor)
                    .expect("anchor was located in this tree");
                push_text(node.tail_mut(), text);
            }
            let index = anchor.index().expect("non-root anchor");
            let parent = source
                .element_mut(&anchor.parent().expect("non-root anchor"))
                .expect("anchor was located in this tree");
            for (offset, node) in payload.into_iter().enumerate() {
                parent.children.insert(index + 1 + offset, node);
            }
            Ok(source)
        }
        Position::Before => {
            ensure_not_root(&anchor, &context, "before")?;
            let mut payload = std::mem::take(&mut spec.children);
            resolve_moves(&mut source, &mut anchor, &mut payload, pre_locate, &context)?;
            let index = anchor.index().expect("non-root anchor");
            let parent = source
                .element_mut(&anchor.parent().expect("non-root anchor"))
                .expect("anchor was located in this tree");
            // The spec's leading text goes before the payload: onto the
            // predecessor's tail, or the parent's text slot.
            if let Some(text) = &spec.text {
                if index > 0 {
                    push_text(parent.children[index - 1].tail_mut(), text);
                } else {
                    push_text(&mut parent.text, text);
                }
            }
            for (offset, node) in payload.into_iter().enumerate() {
                parent.children.insert(index + offset, node);
            }
            Ok(source)
        }
        Position::Replace => {
            apply_replace(source, anchor, spec, branding, pre_locate, &context)
        }
    }
}

fn apply_replace(
    mut source: Element,
    mut anchor: NodePath,
    mut spec: Element,
    branding: bool,
    pre_locate: &mut dyn FnMut(&mut Element),
    context: &str,
) -> Result<Element, ApplyError> {
    let mut payload = std::mem::take(&mut spec.children);
    resolve_moves(&mut source, &mut anchor, &mut payload, pre_locate, context)?;

    if anchor.is_root() {
        // The whole tree is replaced by the first non-comment payload
        // element; a directly preceding comment is kept as a prefix and the
        // old root's template name survives on the new root.
        let mut wrapped = source.clone();
        wrapped.tail = None;
        substitute_placeholder(&mut payload, &wrapped);

        let mut comment: Option<Comment> = None;
        let mut replacement: Option<Element> = None;
        for node in payload {
            match node {
                Node::Comment(c) => comment = Some(c),
                Node::Element(el) => {
                    replacement = Some(el);
                    break;
                }
                Node::Instruction(_) => {}
            }
        }
        let mut new_root = replacement.ok_or_else(|| ApplyError::EmptyReplacement {
            spec: context.to_string(),
        })?;
        new_root.tail = None;
        if let Some(t_name) = source.attr("t-name") {
            let t_name = t_name.to_string();
            new_root.set_attr("t-name", t_name);
        }
        if let Some(mut c) = comment {
            c.tail = new_root.text.take();
            new_root.children.insert(0, Node::Comment(c));
        }
        return Ok(new_root);
    }

    // Brand before any further payload mutation so the marker survives.
    if branding {
        let replaced_tag = source
            .element(&anchor)
            .expect("anchor was located in this tree")
            .tag
            .clone();
        if let Some(first) = payload.iter_mut().find_map(Node::as_element_mut) {
            first.set_attr(REPLACED_TAG_ATTR, replaced_tag);
        }
    }

    // Wrap copies are taken before the located node leaves the tree.
    let mut wrapped = source
        .element(&anchor)
        .expect("anchor was located in this tree")
        .clone();
    wrapped.tail = None;
    substitute_placeholder(&mut payload, &wrapped);

    let index = anchor.index().expect("non-root anchor");
    let parent_path = anchor.parent().expect("non-root anchor");
    let payload_len = payload.len();
    {
        let parent = source
            .element_mut(&parent_path)
            .expect("anchor was located in this tree");
        for (offset, node) in payload.into_iter().enumerate() {
            parent.children.insert(index + offset, node);
        }
    }
    // The located node shifted right by the payload length; detaching it
    // merges its tail per the removal law.
    let shifted = parent_path.child(index + payload_len);
    source
        .detach(&shifted)
        .expect("anchor was located in this tree");
    Ok(source)
}

/// Append text after any existing children of `el`, before nodes appended
/// later.
fn add_text_inside(el: &mut Element, text: &str) {
    match el.children.last_mut() {
        Some(last) => push_text(last.tail_mut(), text),
        None => push_text(&mut el.text, text),
    }
}

fn ensure_not_root(
    anchor: &NodePath,
    context: &str,
    direction: &str,
) -> Result<(), ApplyError> {
    if anchor.is_root() {
        return Err(ApplyError::MalformedSpec {
            spec: context.to_string(),
            message: format!("cannot insert {direction} the root element"),
        });
    }
    Ok(())
}

/// Give every payload element whose text is exactly `$0` a deep copy of the
/// replaced node as its last child, clearing the marker text.
fn substitute_placeholder(nodes: &mut Vec<Node>, replaced: &Element) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.text.as_deref() == Some(WRAP_PLACEHOLDER) {
                el.text = None;
                el.append(Node::Element(replaced.clone()));
            } else {
                substitute_placeholder(&mut el.children, replaced);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{parse_document, to_xml};

    fn apply(
        source_xml: &str,
        anchor: &[usize],
        spec_xml: &str,
        branding: bool,
    ) -> Result<Element, ApplyError> {
        let source = parse_document(source_xml).unwrap();
        let spec = parse_document(spec_xml).unwrap();
        let mut noop = |_: &mut Element| {};
        apply_directive(
            source,
            NodePath::from(anchor.to_vec()),
            spec,
            branding,
            &mut noop,
        )
    }

    #[test]
    fn position_defaults_to_inside() {
        let spec = parse_document("<field name=\"a\"/>").unwrap();
        assert_eq!(Position::from_spec(&spec).unwrap(), Position::Inside);
    }

    #[test]
    fn unknown_position_is_rejected() {
        let spec = parse_document("<field name=\"a\" position=\"sideways\"/>").unwrap();
        assert!(matches!(
            Position::from_spec(&spec),
            Err(ApplyError::UnknownPosition { .. })
        ));
        // move is only valid on payload children
        let spec = parse_document("<field name=\"a\" position=\"move\"/>").unwrap();
        assert!(matches!(
            Position::from_spec(&spec),
            Err(ApplyError::UnknownPosition { .. })
        ));
    }

    #[test]
    fn inside_appends_payload_and_text() {
        let out = apply(
            "<form><group><a/></group></form>",
            &[0],
            "<group position=\"inside\">txt<b/></group>",
            false,
        )
        .unwrap();
        assert_eq!(to_xml(&out), "<form><group><a/>txt<b/></group></form>");
    }

    #[test]
    fn after_keeps_existing_tail_before_spec_text() {
        let out = apply(
            "<form><a/>old<b/></form>",
            &[0],
            "<a position=\"after\">new<c/></a>",
            false,
        )
        .unwrap();
        assert_eq!(to_xml(&out), "<form><a/>oldnew<c/><b/></form>");
    }

    #[test]
    fn before_puts_text_on_the_predecessor() {
        let out = apply(
            "<form><a/><b/></form>",
            &[1],
            "<b position=\"before\">lead<c/></b>",
            false,
        )
        .unwrap();
        assert_eq!(to_xml(&out), "<form><a/>lead<c/><b/></form>");
    }

    #[test]
    fn replace_splices_payload_and_merges_tail() {
        let out = apply(
            "<form><a/>tail<b/></form>",
            &[0],
            "<a position=\"replace\"><x/><y/></a>",
            false,
        )
        .unwrap();
        // <a/>'s tail survives on the last payload node.
        assert_eq!(to_xml(&out), "<form><x/><y/>tail<b/></form>");
    }

    #[test]
    fn replace_with_empty_payload_deletes_the_node() {
        let out = apply(
            "<form><a/>tail<b/></form>",
            &[0],
            "<a position=\"replace\"/>",
            false,
        )
        .unwrap();
        assert_eq!(to_xml(&out), "<form>tail<b/></form>");
    }

    #[test]
    fn replace_wraps_via_placeholder() {
        let out = apply(
            "<form><field name=\"a\"/></form>",
            &[0],
            "<field name=\"a\" position=\"replace\"><div class=\"wrap\">$0</div></field>",
            false,
        )
        .unwrap();
        assert_eq!(
            to_xml(&out),
            "<form><div class=\"wrap\"><field name=\"a\"/></div></form>"
        );
    }

    #[test]
    fn branding_records_the_replaced_tag() {
        let out = apply(
            "<form><field name=\"a\"/></form>",
            &[0],
            "<field name=\"a\" position=\"replace\"><div class=\"wrap\">$0</div></field>",
            true,
        )
        .unwrap();
        let div = out.children[0].as_element().unwrap();
        assert_eq!(div.attr(REPLACED_TAG_ATTR), Some("field"));
    }

    #[test]
    fn root_replace_carries_t_name() {
        let out = apply(
            "<t t-name=\"tmpl\"><span/></t>",
            &[],
            "<xpath expr=\"/t\" position=\"replace\"><div/></xpath>",
            false,
        )
        .unwrap();
        assert_eq!(to_xml(&out), "<div t-name=\"tmpl\"/>");
    }

    #[test]
    fn root_replace_keeps_a_leading_comment() {
        let out = apply(
            "<t><span/></t>",
            &[],
            "<xpath expr=\"/t\" position=\"replace\"><!-- why --><div>txt</div></xpath>",
            false,
        )
        .unwrap();
        assert_eq!(to_xml(&out), "<div><!-- why -->txt</div>");
    }

    #[test]
    fn root_replace_without_content_is_an_error() {
        let err = apply(
            "<t><span/></t>",
            &[],
            "<xpath expr=\"/t\" position=\"replace\"><!-- only --></xpath>",
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ApplyError::EmptyReplacement { .. }));
    }

    #[test]
    fn inserting_before_the_root_is_malformed() {
        let err = apply("<t/>", &[], "<t position=\"before\"><a/></t>", false).unwrap_err();
        assert!(matches!(err, ApplyError::MalformedSpec { .. }));
    }
}
