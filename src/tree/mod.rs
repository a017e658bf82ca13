//! Owned XML element tree with explicit text and tail slots.
//!
//! The rewriting engine manipulates a fully parsed tree. Each element owns
//! its tag, an ordered attribute list, a `text` slot (characters between the
//! opening tag and the first child) and the child nodes; every node owns a
//! `tail` slot (characters between its closing tag and the next sibling).
//! Keeping tails on the nodes themselves is what makes the removal law of
//! the engine expressible: detaching a node merges its tail into whatever
//! text logically precedes it.
//!
//! Nodes are addressed by [`NodePath`], a child-index path from the root,
//! so the tree can stay a plain owned value without parent pointers.

pub mod errors;
pub mod parser;
pub mod writer;

pub use errors::ParseError;
pub use parser::parse_document;
pub use writer::to_xml;

/// An XML element: tag, ordered attributes, text/tail slots and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    /// Attribute list in document order. Names are unique.
    pub attrs: Vec<(String, String)>,
    /// Text between the opening tag and the first child.
    pub text: Option<String>,
    /// Text between the closing tag and the next sibling.
    pub tail: Option<String>,
    pub children: Vec<Node>,
}

/// A comment node. Carries a tail like any other node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Comment {
    pub text: String,
    pub tail: Option<String>,
}

/// A processing instruction, stored as its raw `target content` body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instruction {
    pub content: String,
    pub tail: Option<String>,
}

/// Any node that can appear in an element's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Comment(Comment),
    Instruction(Instruction),
}

/// Child-index path from the root element to a node. The root element is the
/// empty path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The path of the root element.
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path of this node's parent; `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.0.is_empty() {
            return None;
        }
        Some(NodePath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Index of this node in its parent's child list; `None` for the root.
    pub fn index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path of the `i`-th child of this node.
    pub fn child(&self, i: usize) -> NodePath {
        let mut v = self.0.clone();
        v.push(i);
        NodePath(v)
    }

    /// True when `self` is `prefix` or a descendant of it.
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(v: Vec<usize>) -> Self {
        NodePath(v)
    }
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element(_))
    }

    pub fn tail(&self) -> Option<&str> {
        match self {
            Node::Element(el) => el.tail.as_deref(),
            Node::Comment(c) => c.tail.as_deref(),
            Node::Instruction(pi) => pi.tail.as_deref(),
        }
    }

    pub fn tail_mut(&mut self) -> &mut Option<String> {
        match self {
            Node::Element(el) => &mut el.tail,
            Node::Comment(c) => &mut c.tail,
            Node::Instruction(pi) => &mut pi.tail,
        }
    }

    pub fn take_tail(&mut self) -> Option<String> {
        self.tail_mut().take()
    }

    pub fn set_tail(&mut self, tail: Option<String>) {
        *self.tail_mut() = tail;
    }
}

/// Append `extra` to an optional text slot, allocating it if absent.
pub(crate) fn push_text(slot: &mut Option<String>, extra: &str) {
    if extra.is_empty() {
        return;
    }
    match slot {
        Some(s) => s.push_str(extra),
        None => *slot = Some(extra.to_string()),
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Element::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    /// Set an attribute, replacing an existing value in place so attribute
    /// order is stable.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let i = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(i).1)
    }

    /// Iterator over direct element children.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Node at `path`. The root element itself is not a [`Node`], so the
    /// root path yields `None`.
    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        let (&last, prefix) = path.0.split_last()?;
        self.element(&NodePath(prefix.to_vec()))?.children.get(last)
    }

    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let (&last, prefix) = path.0.split_last()?;
        self.element_mut(&NodePath(prefix.to_vec()))?
            .children
            .get_mut(last)
    }

    /// Element at `path`; the empty path is the root itself.
    pub fn element(&self, path: &NodePath) -> Option<&Element> {
        let mut cur = self;
        for &i in &path.0 {
            cur = cur.children.get(i)?.as_element()?;
        }
        Some(cur)
    }

    pub fn element_mut(&mut self, path: &NodePath) -> Option<&mut Element> {
        let mut cur = self;
        for &i in &path.0 {
            cur = cur.children.get_mut(i)?.as_element_mut()?;
        }
        Some(cur)
    }

    /// Insert `node` at `index` of the element at `parent`. Returns `false`
    /// when the parent path does not resolve to an element or the index is
    /// out of bounds.
    pub fn insert(&mut self, parent: &NodePath, index: usize, node: Node) -> bool {
        match self.element_mut(parent) {
            Some(el) if index <= el.children.len() => {
                el.children.insert(index, node);
                true
            }
            _ => false,
        }
    }

    /// Append `node` as the last child of this element.
    pub fn append(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Remove the node at `path` and return it with its tail cleared.
    ///
    /// The removed node's tail is merged into the text that logically
    /// precedes it: the preceding sibling's tail, or the parent's text slot
    /// when the node was the first child. The root cannot be detached.
    pub fn detach(&mut self, path: &NodePath) -> Option<Node> {
        let index = path.index()?;
        let parent = self.element_mut(&path.parent()?)?;
        if index >= parent.children.len() {
            return None;
        }
        let mut node = parent.children.remove(index);
        if let Some(tail) = node.take_tail() {
            if index > 0 {
                push_text(parent.children[index - 1].tail_mut(), &tail);
            } else {
                push_text(&mut parent.text, &tail);
            }
        }
        Some(node)
    }

    /// First element (document order, root included) satisfying `pred`.
    pub fn find_element<F>(&self, mut pred: F) -> Option<NodePath>
    where
        F: FnMut(&Element) -> bool,
    {
        fn walk<F: FnMut(&Element) -> bool>(
            el: &Element,
            path: &NodePath,
            pred: &mut F,
        ) -> Option<NodePath> {
            if pred(el) {
                return Some(path.clone());
            }
            for (i, child) in el.children.iter().enumerate() {
                if let Node::Element(e) = child {
                    if let Some(found) = walk(e, &path.child(i), pred) {
                        return Some(found);
                    }
                }
            }
            None
        }
        walk(self, &NodePath::root(), &mut pred)
    }

    /// Paths of all elements in document order, root first.
    pub fn element_paths(&self) -> Vec<NodePath> {
        fn walk(el: &Element, path: &NodePath, out: &mut Vec<NodePath>) {
            out.push(path.clone());
            for (i, child) in el.children.iter().enumerate() {
                if let Node::Element(e) = child {
                    walk(e, &path.child(i), out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &NodePath::root(), &mut out);
        out
    }

    /// Concatenated text content in document order: the element's own text
    /// followed, per child, by the child's content (elements only) and tail.
    pub fn string_value(&self) -> String {
        fn collect(el: &Element, out: &mut String) {
            if let Some(t) = &el.text {
                out.push_str(t);
            }
            for child in &el.children {
                if let Node::Element(e) = child {
                    collect(e, out);
                }
                if let Some(t) = child.tail() {
                    out.push_str(t);
                }
            }
        }
        let mut out = String::new();
        collect(self, &mut out);
        out
    }

    /// The text nodes directly inside this element: its text slot followed
    /// by each child's tail, in document order. Nested element content is
    /// not included; empty segments are skipped.
    pub fn text_segments(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(t) = &self.text {
            if !t.is_empty() {
                out.push(t.as_str());
            }
        }
        for child in &self.children {
            if let Some(t) = child.tail() {
                if !t.is_empty() {
                    out.push(t);
                }
            }
        }
        out
    }
}
