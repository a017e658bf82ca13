//! The `attributes` directive: verbatim sets and token-list edits.

use crate::inherit::errors::ApplyError;
use crate::inherit::locator::{node_repr, spec_repr};
use crate::tree::{Element, Node};
use std::collections::HashSet;

/// Apply an `attributes` spec to the located element. Children must all be
/// `<attribute name="...">` elements carrying either a text body (the new
/// value; empty removes the attribute) or `add`/`remove` token lists.
pub(crate) fn apply_attributes(target: &mut Element, spec: &Element) -> Result<(), ApplyError> {
    for child in &spec.children {
        let attribute = match child {
            Node::Element(el) => el,
            // Comments and processing instructions between attribute
            // elements are tolerated.
            _ => continue,
        };
        if attribute.tag != "attribute" {
            return Err(ApplyError::BadAttributePayload {
                spec: spec_repr(spec),
            });
        }
        let Some(name) = attribute.attr("name") else {
            return Err(ApplyError::BadAttributePayload {
                spec: spec_repr(spec),
            });
        };

        let add = attribute.attr("add").unwrap_or("");
        let remove = attribute.attr("remove").unwrap_or("");
        let value = if add.is_empty() && remove.is_empty() {
            attribute.text.clone().unwrap_or_default()
        } else {
            if attribute.text.as_deref().is_some_and(|t| !t.is_empty()) {
                return Err(ApplyError::MixedAttributeValue {
                    spec: node_repr(child),
                });
            }
            let separator = attribute.attr("separator").unwrap_or(",");
            merge_tokens(target.attr(name), add, remove, separator)
        };

        if value.is_empty() {
            target.remove_attr(name);
        } else {
            target.set_attr(name, value);
        }
    }
    Ok(())
}

/// Rebuild a separator-delimited token list: drop `remove` tokens from the
/// current value, then append `add` tokens in order. Tokens are trimmed and
/// additions are not deduplicated. A separator of `" "` treats any
/// whitespace run as one separator, squashing empty tokens; other
/// separators preserve interior empties of the current value.
pub fn merge_tokens(
    current: Option<&str>,
    add: &str,
    remove: &str,
    separator: &str,
) -> String {
    let whitespace = separator == " ";
    let split = |s: &str| -> Vec<String> {
        if whitespace {
            s.split_whitespace().map(str::to_string).collect()
        } else {
            s.split(separator).map(|t| t.trim().to_string()).collect()
        }
    };

    let current_tokens = match current {
        None | Some("") => Vec::new(),
        Some(v) => split(v),
    };
    let to_remove: HashSet<String> = split(remove)
        .into_iter()
        .filter(|t| !t.is_empty())
        .collect();
    let to_add = split(add).into_iter().filter(|t| !t.is_empty());

    let tokens: Vec<String> = current_tokens
        .into_iter()
        .filter(|t| !to_remove.contains(t))
        .chain(to_add)
        .collect();
    tokens.join(if whitespace { " " } else { separator })
}
