//! Mapping a spec element to the node it addresses in the base tree.

use crate::inherit::errors::ApplyError;
use crate::tree::{writer, Element, Node, NodePath};
use crate::xpath;

/// How a spec addresses its target, derived from the spec's tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// `<xpath expr="...">`: first node selected by the expression.
    XPath { expr: String },

    /// `<field name="...">`: first `field` element with that name, at any
    /// depth. Within one inheritance level a field name is assumed unique.
    Field { name: String },

    /// Any other tag: first element with the same tag whose attributes all
    /// match the spec's (ignoring `position`); a `version` attribute on the
    /// spec must instead match the base root's `version`.
    Structural {
        tag: String,
        attrs: Vec<(String, String)>,
        version: Option<String>,
    },
}

impl Target {
    /// Derive the addressing mode from a spec element.
    pub fn from_spec(spec: &Element) -> Result<Target, ApplyError> {
        match spec.tag.as_str() {
            "xpath" => match spec.attr("expr") {
                Some(expr) => Ok(Target::XPath {
                    expr: expr.to_string(),
                }),
                None => Err(ApplyError::MalformedSpec {
                    spec: writer::to_xml(spec),
                    message: "xpath spec is missing its expr attribute".to_string(),
                }),
            },
            "field" => match spec.attr("name") {
                Some(name) => Ok(Target::Field {
                    name: name.to_string(),
                }),
                None => Err(ApplyError::MalformedSpec {
                    spec: writer::to_xml(spec),
                    message: "field spec is missing its name attribute".to_string(),
                }),
            },
            _ => Ok(Target::Structural {
                tag: spec.tag.clone(),
                attrs: spec
                    .attrs
                    .iter()
                    .filter(|(k, _)| k != "position" && k != "version")
                    .cloned()
                    .collect(),
                version: spec.attr("version").map(str::to_string),
            }),
        }
    }

    /// Resolve the target in `source`. `Ok(None)` means no match; the
    /// driver turns that into a fatal error with the spec context.
    pub fn locate(&self, source: &Element) -> Result<Option<NodePath>, ApplyError> {
        match self {
            Target::XPath { expr } => {
                let paths = xpath::select(source, expr).map_err(|e| ApplyError::XPathSyntax {
                    expr: expr.clone(),
                    message: e.to_string(),
                })?;
                Ok(paths.into_iter().next())
            }
            Target::Field { name } => Ok(source
                .find_element(|el| el.tag == "field" && el.attr("name") == Some(name))),
            Target::Structural {
                tag,
                attrs,
                version,
            } => {
                if let Some(required) = version {
                    if source.attr("version") != Some(required) {
                        return Ok(None);
                    }
                }
                Ok(source.find_element(|el| {
                    el.tag == *tag && attrs.iter().all(|(k, v)| el.attr(k) == Some(v))
                }))
            }
        }
    }
}

/// Serialized form of a spec for error messages, with enough of the parent
/// context to find the patch.
pub(crate) fn spec_repr(spec: &Element) -> String {
    writer::to_xml(spec)
}

/// Serialized form of a payload node for error messages.
pub(crate) fn node_repr(node: &Node) -> String {
    writer::node_to_xml(node)
}
