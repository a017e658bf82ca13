//! quick-xml events -> element tree.
//!
//! Text placement follows the text/tail model: character data before the
//! first child of an element fills the element's `text` slot, character data
//! after a child fills that child's `tail`. Whitespace is preserved
//! verbatim. Comments and processing instructions become tree nodes;
//! document-level misc (XML declaration, doctype, comments outside the root)
//! is dropped.

use crate::tree::errors::ParseError;
use crate::tree::{push_text, Comment, Element, Instruction, Node};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parse an XML document into its root element.
pub fn parse_document(xml: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::MultipleRoots);
                }
                stack.push(open_element(e, position)?);
            }
            Ok(Event::End(_)) => {
                let completed = match stack.pop() {
                    Some(el) => el,
                    None => return Err(ParseError::UnexpectedClose { position }),
                };
                attach(&mut stack, &mut root, Node::Element(completed));
            }
            Ok(Event::Empty(ref e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::MultipleRoots);
                }
                let el = open_element(e, position)?;
                attach(&mut stack, &mut root, Node::Element(el));
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(|err| ParseError::Malformed {
                    position,
                    message: err.to_string(),
                })?;
                place_text(&mut stack, &mut root, &text, position)?;
            }
            Ok(Event::CData(ref e)) => {
                let text =
                    std::str::from_utf8(e.as_ref()).map_err(|err| ParseError::Malformed {
                        position,
                        message: err.to_string(),
                    })?;
                place_text(&mut stack, &mut root, text, position)?;
            }
            Ok(Event::Comment(ref e)) => {
                let text =
                    std::str::from_utf8(e.as_ref()).map_err(|err| ParseError::Malformed {
                        position,
                        message: err.to_string(),
                    })?;
                if !stack.is_empty() {
                    attach(
                        &mut stack,
                        &mut root,
                        Node::Comment(Comment {
                            text: text.to_string(),
                            tail: None,
                        }),
                    );
                }
            }
            Ok(Event::PI(ref e)) => {
                let content = String::from_utf8_lossy(e).into_owned();
                if !stack.is_empty() {
                    attach(
                        &mut stack,
                        &mut root,
                        Node::Instruction(Instruction {
                            content,
                            tail: None,
                        }),
                    );
                }
            }
            Ok(Event::Eof) => {
                if !stack.is_empty() {
                    let unclosed: Vec<&str> = stack.iter().map(|el| el.tag.as_str()).collect();
                    return Err(ParseError::Unclosed {
                        tags: unclosed.join(">, <"),
                    });
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Malformed {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                })
            }
        }
    }

    root.ok_or(ParseError::NoRoot)
}

fn open_element(e: &BytesStart, position: u64) -> Result<Element, ParseError> {
    let tag = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| ParseError::Malformed {
            position,
            message: format!("invalid element name: {err}"),
        })?
        .to_string();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::Malformed {
            position,
            message: format!("invalid attribute: {err}"),
        })?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| ParseError::Malformed {
                position,
                message: format!("invalid attribute name: {err}"),
            })?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| ParseError::Malformed {
                position,
                message: format!("invalid attribute value: {err}"),
            })?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Element {
        tag,
        attrs,
        ..Element::default()
    })
}

/// Hang a completed node off the innermost open element, or make it the root.
fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if let Node::Element(el) = node {
        *root = Some(el);
    }
}

fn place_text(
    stack: &mut [Element],
    root: &mut Option<Element>,
    text: &str,
    position: u64,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        match parent.children.last_mut() {
            Some(last) => push_text(last.tail_mut(), text),
            None => push_text(&mut parent.text, text),
        }
        return Ok(());
    }
    // Character data at document level: keep a completed root's tail,
    // tolerate whitespace, reject anything else.
    if let Some(el) = root {
        push_text(&mut el.tail, text);
        return Ok(());
    }
    if text.chars().all(char::is_whitespace) {
        return Ok(());
    }
    Err(ParseError::Malformed {
        position,
        message: "character data outside the root element".to_string(),
    })
}
