//! View-inheritance engine: apply declarative patch trees to a base tree.
//!
//! A patch is a spec element, or a `data` element wrapping a sequence of
//! specs. Each spec addresses a node of the base tree (see [`Target`]),
//! names a directive through its `position` attribute (see [`Position`])
//! and carries its children as payload. Specs are applied in document
//! order; every failure is fatal for the whole patch and leaves the base
//! tree in an unspecified partially-rewritten state.
//!
//! ```
//! use viewgraft::{apply_specs, parse_document, to_xml};
//!
//! let base = parse_document(r#"<form><group name="g"><field name="a"/></group></form>"#).unwrap();
//! let patch =
//!     parse_document(r#"<field name="a" position="after"><field name="b"/></field>"#).unwrap();
//! let patched = apply_specs(base, patch).unwrap();
//! assert_eq!(
//!     to_xml(&patched),
//!     r#"<form><group name="g"><field name="a"/><field name="b"/></group></form>"#
//! );
//! ```

pub mod attrs;
pub mod directive;
pub mod errors;
pub mod locator;
pub mod mover;

pub use directive::{Position, REPLACED_TAG_ATTR};
pub use errors::ApplyError;
pub use locator::Target;

use crate::tree::{Element, Node};
use locator::spec_repr;
use std::collections::VecDeque;

/// Applies inheritance specs to base trees.
///
/// The engine mutates the base tree in place and consumes the patch tree:
/// payload nodes are grafted into the output. It holds no state between
/// calls beyond its configuration.
pub struct Rewriter<'a> {
    branding: bool,
    pre_locate: Option<Box<dyn FnMut(&mut Element) + 'a>>,
}

impl Default for Rewriter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Rewriter<'a> {
    pub fn new() -> Self {
        Rewriter {
            branding: false,
            pre_locate: None,
        }
    }

    /// Stamp elements that replace other elements with
    /// [`REPLACED_TAG_ATTR`], recording the replaced tag for downstream
    /// tooling.
    pub fn branding(mut self, enabled: bool) -> Self {
        self.branding = enabled;
        self
    }

    /// Callback invoked with every spec (including move-children) before it
    /// is located, so callers can normalize specs in place.
    pub fn pre_locate<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut Element) + 'a,
    {
        self.pre_locate = Some(Box::new(callback));
        self
    }

    /// Apply one patch document. A `data`-tagged root is flattened to its
    /// child specs; comments and processing instructions between specs are
    /// skipped.
    pub fn apply(&mut self, source: Element, patch: Element) -> Result<Element, ApplyError> {
        let queue = if patch.tag == "data" {
            spec_children(patch)
        } else {
            VecDeque::from([patch])
        };
        self.run(source, queue)
    }

    /// Apply a sequence of specs in order.
    pub fn apply_all(
        &mut self,
        source: Element,
        specs: Vec<Element>,
    ) -> Result<Element, ApplyError> {
        self.run(source, specs.into())
    }

    fn run(
        &mut self,
        mut source: Element,
        mut queue: VecDeque<Element>,
    ) -> Result<Element, ApplyError> {
        let branding = self.branding;
        let mut noop = |_: &mut Element| {};
        let pre_locate: &mut dyn FnMut(&mut Element) = match self.pre_locate.as_mut() {
            Some(callback) => &mut **callback,
            None => &mut noop,
        };

        while let Some(mut spec) = queue.pop_front() {
            // Nested data wrappers flatten in place, keeping spec order.
            if spec.tag == "data" {
                for child in spec_children(spec).into_iter().rev() {
                    queue.push_front(child);
                }
                continue;
            }
            pre_locate(&mut spec);
            let target = Target::from_spec(&spec)?;
            let anchor = target
                .locate(&source)?
                .ok_or_else(|| ApplyError::TargetNotFound {
                    spec: spec_repr(&spec),
                })?;
            source = directive::apply_directive(source, anchor, spec, branding, pre_locate)?;
        }
        Ok(source)
    }
}

/// Apply a patch with default options.
pub fn apply_specs(source: Element, patch: Element) -> Result<Element, ApplyError> {
    Rewriter::new().apply(source, patch)
}

fn spec_children(wrapper: Element) -> VecDeque<Element> {
    wrapper
        .children
        .into_iter()
        .filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
        .collect()
}
