//! Viewgraft: XML view-inheritance engine
//!
//! A small tree-rewriting interpreter for declarative view patches. A base
//! XML tree is mutated by a sequence of *specs*: elements that address a
//! node of the base tree (by XPath, by field name, or by shallow structural
//! match) and splice their children in relative to it.
//!
//! # Architecture
//!
//! Four parts cooperate: the [`tree`] module holds the element model with
//! explicit text/tail slots, [`xpath`] resolves addressing expressions,
//! and [`inherit`] hosts the locator, the directive interpreter (`inside`,
//! `after`, `before`, `replace`, `attributes`), move resolution and the
//! driver. All failures are fatal for the patch being applied; the engine
//! never rolls back.
//!
//! # Example
//!
//! ```
//! use viewgraft::{apply_specs, parse_document, to_xml};
//!
//! let base = parse_document(r#"<form><field name="a"/></form>"#).unwrap();
//! let patch = parse_document(
//!     r#"<field name="a" position="replace"><div class="wrap">$0</div></field>"#,
//! )
//! .unwrap();
//! let patched = apply_specs(base, patch).unwrap();
//! assert_eq!(
//!     to_xml(&patched),
//!     r#"<form><div class="wrap"><field name="a"/></div></form>"#
//! );
//! ```

pub mod inherit;
pub mod tree;
pub mod xpath;

// Re-exports
pub use inherit::{apply_specs, ApplyError, Position, Rewriter, Target, REPLACED_TAG_ATTR};
pub use tree::{
    parse_document, to_xml, Comment, Element, Instruction, Node, NodePath, ParseError,
};
pub use xpath::XPathError;
