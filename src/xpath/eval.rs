//! XPath evaluation over the element tree.
//!
//! Node-sets are sets of [`NodePath`]s (plus the virtual document node for
//! absolute paths); lexicographic path order is document order, so result
//! sets are kept sorted and deduplicated. Predicates evaluate within each
//! parent's child list, so `position()` and `last()` are proximity
//! positions even on descendant steps. Attribute and `text()` steps yield
//! string sets (one string per text node) and are only valid in terminal
//! position.

use crate::tree::{Element, Node, NodePath};
use crate::xpath::ast::{BinaryOp, Expr, NameTest, Path, Step};
use crate::xpath::errors::XPathError;

/// A point in the tree an evaluation step can stand on. `Document` is the
/// virtual parent of the root element, variant order gives document order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum CtxNode {
    Document,
    Element(NodePath),
}

#[derive(Debug, Clone)]
struct Ctx {
    node: CtxNode,
    position: usize,
    size: usize,
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<CtxNode>),
    Strings(Vec<String>),
    Number(f64),
    Str(String),
    Bool(bool),
}

pub struct Evaluator<'a> {
    root: &'a Element,
}

impl<'a> Evaluator<'a> {
    pub fn new(root: &'a Element) -> Self {
        Evaluator { root }
    }

    /// Evaluate `expr` with the root element as context node and return the
    /// selected element paths in document order.
    pub fn select(&self, expr: &Expr) -> Result<Vec<NodePath>, XPathError> {
        let ctx = Ctx {
            node: CtxNode::Element(NodePath::root()),
            position: 1,
            size: 1,
        };
        match self.eval(expr, &ctx)? {
            Value::Nodes(nodes) => Ok(nodes
                .into_iter()
                .filter_map(|n| match n {
                    CtxNode::Element(p) => Some(p),
                    CtxNode::Document => None,
                })
                .collect()),
            _ => Err(XPathError::unsupported(
                "expression does not select elements",
            )),
        }
    }

    fn eval(&self, expr: &Expr, ctx: &Ctx) -> Result<Value, XPathError> {
        match expr {
            Expr::Path(path) => self.eval_path(path, ctx),
            Expr::Union(a, b) => {
                let mut left = self.node_set(a, ctx)?;
                let right = self.node_set(b, ctx)?;
                left.extend(right);
                left.sort();
                left.dedup();
                Ok(Value::Nodes(left))
            }
            Expr::Binary(op, a, b) => self.eval_binary(*op, a, b, ctx),
            Expr::Negate(inner) => {
                let v = self.eval(inner, ctx)?;
                Ok(Value::Number(-self.to_number(&v)))
            }
            Expr::Call(name, args) => self.eval_call(name, args, ctx),
            Expr::Literal(s) => Ok(Value::Str(s.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
        }
    }

    fn node_set(&self, expr: &Expr, ctx: &Ctx) -> Result<Vec<CtxNode>, XPathError> {
        match self.eval(expr, ctx)? {
            Value::Nodes(nodes) => Ok(nodes),
            _ => Err(XPathError::unsupported("expected a node-set operand")),
        }
    }

    fn eval_path(&self, path: &Path, ctx: &Ctx) -> Result<Value, XPathError> {
        let mut current: Vec<CtxNode> = if path.absolute {
            vec![CtxNode::Document]
        } else {
            vec![ctx.node.clone()]
        };
        let mut strings: Option<Vec<String>> = None;

        for step in &path.steps {
            if strings.is_some() {
                return Err(XPathError::unsupported(
                    "attribute and text() steps must come last",
                ));
            }
            match step {
                Step::SelfNode => {}
                Step::Parent => {
                    let mut next = Vec::new();
                    for node in &current {
                        if let CtxNode::Element(p) = node {
                            next.push(match p.parent() {
                                Some(parent) => CtxNode::Element(parent),
                                None => CtxNode::Document,
                            });
                        }
                    }
                    next.sort();
                    next.dedup();
                    current = next;
                }
                Step::Attribute(name) => {
                    let mut values = Vec::new();
                    for node in &current {
                        if let CtxNode::Element(p) = node {
                            if let Some(v) = self.elem(p).and_then(|el| el.attr(name)) {
                                values.push(v.to_string());
                            }
                        }
                    }
                    strings = Some(values);
                }
                Step::Text => {
                    // One entry per text node, so mixed content compares
                    // against each segment rather than a concatenation.
                    let mut values = Vec::new();
                    for node in &current {
                        if let CtxNode::Element(p) = node {
                            if let Some(el) = self.elem(p) {
                                values.extend(
                                    el.text_segments().into_iter().map(str::to_string),
                                );
                            }
                        }
                    }
                    strings = Some(values);
                }
                Step::Element {
                    descendant,
                    test,
                    predicates,
                } => {
                    let mut next = Vec::new();
                    for node in &current {
                        for mut group in self.candidate_groups(node, *descendant, test) {
                            for predicate in predicates {
                                group = self.filter(group, predicate)?;
                            }
                            next.extend(group.into_iter().map(CtxNode::Element));
                        }
                    }
                    next.sort();
                    next.dedup();
                    current = next;
                }
            }
        }

        Ok(match strings {
            Some(values) => Value::Strings(values),
            None => Value::Nodes(current),
        })
    }

    /// Candidate groups of one step from one context node. Each group holds
    /// the matching children of a single parent, so positional predicates
    /// see proximity positions within that parent's child list. A child
    /// step yields one group; a descendant step expands to
    /// descendant-or-self parents and yields one group per parent, in
    /// document order.
    fn candidate_groups(
        &self,
        node: &CtxNode,
        descendant: bool,
        test: &NameTest,
    ) -> Vec<Vec<NodePath>> {
        let mut groups = Vec::new();
        match node {
            CtxNode::Document => {
                // The document's only child is the root element.
                let doc_children = if test.matches(&self.root.tag) {
                    vec![NodePath::root()]
                } else {
                    Vec::new()
                };
                groups.push(doc_children);
                if descendant {
                    self.child_groups(&NodePath::root(), test, &mut groups);
                }
            }
            CtxNode::Element(p) => {
                if descendant {
                    self.child_groups(p, test, &mut groups);
                } else {
                    groups.push(self.matching_children(p, test));
                }
            }
        }
        groups
    }

    /// One group of matching children per element of `base`'s
    /// descendant-or-self axis, preorder.
    fn child_groups(&self, base: &NodePath, test: &NameTest, out: &mut Vec<Vec<NodePath>>) {
        out.push(self.matching_children(base, test));
        if let Some(el) = self.elem(base) {
            for (i, child) in el.children.iter().enumerate() {
                if child.is_element() {
                    self.child_groups(&base.child(i), test, out);
                }
            }
        }
    }

    fn matching_children(&self, base: &NodePath, test: &NameTest) -> Vec<NodePath> {
        let mut out = Vec::new();
        if let Some(el) = self.elem(base) {
            for (i, child) in el.children.iter().enumerate() {
                if let Node::Element(e) = child {
                    if test.matches(&e.tag) {
                        out.push(base.child(i));
                    }
                }
            }
        }
        out
    }

    fn filter(
        &self,
        candidates: Vec<NodePath>,
        predicate: &Expr,
    ) -> Result<Vec<NodePath>, XPathError> {
        let size = candidates.len();
        let mut kept = Vec::new();
        for (i, candidate) in candidates.into_iter().enumerate() {
            let ctx = Ctx {
                node: CtxNode::Element(candidate.clone()),
                position: i + 1,
                size,
            };
            let value = self.eval(predicate, &ctx)?;
            let keep = match value {
                // A numeric predicate is a position test.
                Value::Number(n) => (i + 1) as f64 == n,
                other => self.truthy(&other),
            };
            if keep {
                kept.push(candidate);
            }
        }
        Ok(kept)
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        a: &Expr,
        b: &Expr,
        ctx: &Ctx,
    ) -> Result<Value, XPathError> {
        match op {
            BinaryOp::And => {
                let left = self.eval(a, ctx)?;
                if !self.truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval(b, ctx)?;
                Ok(Value::Bool(self.truthy(&right)))
            }
            BinaryOp::Or => {
                let left = self.eval(a, ctx)?;
                if self.truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval(b, ctx)?;
                Ok(Value::Bool(self.truthy(&right)))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let left = self.eval(a, ctx)?;
                let right = self.eval(b, ctx)?;
                let eq = self.compare_eq(&left, &right);
                Ok(Value::Bool(if op == BinaryOp::Ne { !eq } else { eq }))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let left = self.eval(a, ctx)?;
                let right = self.eval(b, ctx)?;
                Ok(Value::Bool(self.compare_rel(op, &left, &right)))
            }
            BinaryOp::Add | BinaryOp::Sub => {
                let left = self.to_number(&self.eval(a, ctx)?);
                let right = self.to_number(&self.eval(b, ctx)?);
                Ok(Value::Number(if op == BinaryOp::Add {
                    left + right
                } else {
                    left - right
                }))
            }
        }
    }

    fn eval_call(&self, name: &str, args: &[Expr], ctx: &Ctx) -> Result<Value, XPathError> {
        let arity = |expected: usize| -> Result<(), XPathError> {
            if args.len() != expected {
                return Err(XPathError::syntax(format!(
                    "{name}() takes {expected} argument(s), got {}",
                    args.len()
                )));
            }
            Ok(())
        };
        match name {
            "position" => {
                arity(0)?;
                Ok(Value::Number(ctx.position as f64))
            }
            "last" => {
                arity(0)?;
                Ok(Value::Number(ctx.size as f64))
            }
            "count" => {
                arity(1)?;
                match self.eval(&args[0], ctx)? {
                    Value::Nodes(nodes) => Ok(Value::Number(nodes.len() as f64)),
                    Value::Strings(values) => Ok(Value::Number(values.len() as f64)),
                    _ => Err(XPathError::syntax("count() requires a node-set")),
                }
            }
            "not" => {
                arity(1)?;
                let v = self.eval(&args[0], ctx)?;
                Ok(Value::Bool(!self.truthy(&v)))
            }
            "contains" => {
                arity(2)?;
                let s = self.to_string_value(&self.eval(&args[0], ctx)?);
                let needle = self.to_string_value(&self.eval(&args[1], ctx)?);
                Ok(Value::Bool(s.contains(&needle)))
            }
            "starts-with" => {
                arity(2)?;
                let s = self.to_string_value(&self.eval(&args[0], ctx)?);
                let prefix = self.to_string_value(&self.eval(&args[1], ctx)?);
                Ok(Value::Bool(s.starts_with(&prefix)))
            }
            "name" => {
                if args.is_empty() {
                    return Ok(Value::Str(match &ctx.node {
                        CtxNode::Element(p) => {
                            self.elem(p).map(|el| el.tag.clone()).unwrap_or_default()
                        }
                        CtxNode::Document => String::new(),
                    }));
                }
                arity(1)?;
                let nodes = self.node_set(&args[0], ctx)?;
                Ok(Value::Str(match nodes.first() {
                    Some(CtxNode::Element(p)) => {
                        self.elem(p).map(|el| el.tag.clone()).unwrap_or_default()
                    }
                    _ => String::new(),
                }))
            }
            other => Err(XPathError::unsupported(format!(
                "unknown function {other}(); supported: position, last, count, not, \
                 contains, starts-with, name"
            ))),
        }
    }

    fn elem(&self, path: &NodePath) -> Option<&Element> {
        self.root.element(path)
    }

    fn truthy(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Strings(values) => !values.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn node_string(&self, node: &CtxNode) -> String {
        match node {
            CtxNode::Document => self.root.string_value(),
            CtxNode::Element(p) => self.elem(p).map(Element::string_value).unwrap_or_default(),
        }
    }

    /// Members of a set value as strings, or `None` for scalar values.
    fn members(&self, value: &Value) -> Option<Vec<String>> {
        match value {
            Value::Nodes(nodes) => Some(nodes.iter().map(|n| self.node_string(n)).collect()),
            Value::Strings(values) => Some(values.clone()),
            _ => None,
        }
    }

    fn to_string_value(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|n| self.node_string(n))
                .unwrap_or_default(),
            Value::Strings(values) => values.first().cloned().unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => (if *b { "true" } else { "false" }).to_string(),
        }
    }

    fn to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            _ => parse_number(&self.to_string_value(value)),
        }
    }

    fn compare_eq(&self, a: &Value, b: &Value) -> bool {
        match (self.members(a), self.members(b)) {
            (Some(left), Some(right)) => left.iter().any(|l| right.iter().any(|r| l == r)),
            (Some(set), None) => self.set_eq_scalar(&set, b),
            (None, Some(set)) => self.set_eq_scalar(&set, a),
            (None, None) => match (a, b) {
                (Value::Bool(_), _) | (_, Value::Bool(_)) => self.truthy(a) == self.truthy(b),
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    self.to_number(a) == self.to_number(b)
                }
                _ => self.to_string_value(a) == self.to_string_value(b),
            },
        }
    }

    fn set_eq_scalar(&self, set: &[String], scalar: &Value) -> bool {
        match scalar {
            Value::Bool(b) => !set.is_empty() == *b,
            Value::Number(n) => set.iter().any(|s| parse_number(s) == *n),
            _ => {
                let s = self.to_string_value(scalar);
                set.iter().any(|member| *member == s)
            }
        }
    }

    fn compare_rel(&self, op: BinaryOp, a: &Value, b: &Value) -> bool {
        let cmp = |l: f64, r: f64| match op {
            BinaryOp::Lt => l < r,
            BinaryOp::Le => l <= r,
            BinaryOp::Gt => l > r,
            BinaryOp::Ge => l >= r,
            _ => false,
        };
        match (self.members(a), self.members(b)) {
            (Some(left), Some(right)) => left
                .iter()
                .any(|l| right.iter().any(|r| cmp(parse_number(l), parse_number(r)))),
            (Some(set), None) => {
                let r = self.to_number(b);
                set.iter().any(|s| cmp(parse_number(s), r))
            }
            (None, Some(set)) => {
                let l = self.to_number(a);
                set.iter().any(|s| cmp(l, parse_number(s)))
            }
            (None, None) => cmp(self.to_number(a), self.to_number(b)),
        }
    }
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n == n.trunc() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_document;
    use crate::xpath::parser::parse;

    fn select(xml: &str, expr: &str) -> Vec<Vec<usize>> {
        let root = parse_document(xml).unwrap();
        let ast = parse(expr).unwrap();
        Evaluator::new(&root)
            .select(&ast)
            .unwrap()
            .into_iter()
            .map(|p| p.as_slice().to_vec())
            .collect()
    }

    const DOC: &str = r#"<form version="2"><group name="g1"><field name="a"/><field name="b"/></group><group name="g2"><field name="c" readonly="1"/></group></form>"#;

    #[test]
    fn descendant_by_name() {
        assert_eq!(select(DOC, "//field"), vec![vec![0, 0], vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn attribute_predicate() {
        assert_eq!(select(DOC, "//group[@name='g2']"), vec![vec![1]]);
        assert_eq!(select(DOC, "//field[@readonly]"), vec![vec![1, 0]]);
    }

    #[test]
    fn absolute_root_selection() {
        assert_eq!(select(DOC, "/form"), vec![Vec::<usize>::new()]);
        assert!(select(DOC, "/group").is_empty());
    }

    #[test]
    fn positional_predicates() {
        assert_eq!(select(DOC, "//group[2]"), vec![vec![1]]);
        assert_eq!(select(DOC, "//field[position() = last()]"),
            vec![vec![0, 1], vec![1, 0]]);
    }

    #[test]
    fn descendant_positions_are_per_parent() {
        // Every group contributes its first field, not just the first in
        // the whole document.
        assert_eq!(select(DOC, "//field[1]"), vec![vec![0, 0], vec![1, 0]]);
        assert_eq!(select(DOC, "//field[last()]"), vec![vec![0, 1], vec![1, 0]]);
        assert_eq!(select(DOC, "//field[2]"), vec![vec![0, 1]]);
    }

    #[test]
    fn multi_step_path() {
        assert_eq!(select(DOC, "/form/group/field[@name='b']"), vec![vec![0, 1]]);
    }

    #[test]
    fn not_and_boolean_connectives() {
        assert_eq!(
            select(DOC, "//field[not(@readonly)]"),
            vec![vec![0, 0], vec![0, 1]]
        );
        assert_eq!(
            select(DOC, "//field[@name='a' or @name='c']"),
            vec![vec![0, 0], vec![1, 0]]
        );
    }

    #[test]
    fn union_in_document_order() {
        assert_eq!(
            select(DOC, "//group[@name='g2'] | //field[@name='a']"),
            vec![vec![0, 0], vec![1]]
        );
    }

    #[test]
    fn parent_step() {
        assert_eq!(select(DOC, "//field[@name='c']/.."), vec![vec![1]]);
    }

    #[test]
    fn text_predicate() {
        let xml = "<t><p>keep</p><p>drop</p></t>";
        assert_eq!(select(xml, "//p[text()='keep']"), vec![vec![0]]);
    }

    #[test]
    fn text_predicate_matches_individual_segments() {
        // Mixed content holds several text nodes; any of them may match.
        let xml = "<t><p>a<b/>c</p><p>x</p></t>";
        assert_eq!(select(xml, "//p[text()='a']"), vec![vec![0]]);
        assert_eq!(select(xml, "//p[text()='c']"), vec![vec![0]]);
        assert!(select(xml, "//p[text()='ac']").is_empty());
    }

    #[test]
    fn contains_on_attribute() {
        assert_eq!(
            select(DOC, "//group[contains(@name, '2')]"),
            vec![vec![1]]
        );
    }

    #[test]
    fn count_comparison() {
        assert_eq!(select(DOC, "//group[count(field) = 2]"), vec![vec![0]]);
    }

    #[test]
    fn selecting_attributes_is_not_an_element_selection() {
        let root = parse_document(DOC).unwrap();
        let ast = parse("//field/@name").unwrap();
        assert!(matches!(
            Evaluator::new(&root).select(&ast),
            Err(XPathError::Unsupported { .. })
        ));
    }
}
