//! Resolution of `position="move"` payload children.
//!
//! Before a directive splices its payload, every move-child in it is
//! replaced by the node it addresses, detached from the base tree. One
//! preorder traversal handles moves at any payload depth, in document
//! order, so the same rules apply inside `inside`, `before`, `after` and
//! `replace` payloads alike.

use crate::inherit::errors::ApplyError;
use crate::inherit::locator::{spec_repr, Target};
use crate::tree::{Comment, Element, Node, NodePath};

/// Replace every `position="move"` element in `nodes` with its detached
/// target. `anchor` is the enclosing directive's located node; it is
/// re-based as removals shift sibling indices, and the enclosing spec
/// (serialized in `context`) becomes unlocatable when a move detaches the
/// subtree holding it.
pub(crate) fn resolve_moves(
    source: &mut Element,
    anchor: &mut NodePath,
    nodes: &mut Vec<Node>,
    pre_locate: &mut dyn FnMut(&mut Element),
    context: &str,
) -> Result<(), ApplyError> {
    for i in 0..nodes.len() {
        let is_move = matches!(
            &nodes[i],
            Node::Element(el) if el.attr("position") == Some("move")
        );
        if is_move {
            let placeholder = Node::Comment(Comment::default());
            let Node::Element(mut move_spec) = std::mem::replace(&mut nodes[i], placeholder)
            else {
                unreachable!("move child is an element");
            };
            if !move_spec.children.is_empty() {
                return Err(ApplyError::MoveSpecHasChildren {
                    spec: spec_repr(&move_spec),
                });
            }
            pre_locate(&mut move_spec);
            let target = Target::from_spec(&move_spec)?;
            let path = target
                .locate(source)?
                .ok_or_else(|| ApplyError::MoveTargetNotFound {
                    spec: spec_repr(&move_spec),
                })?;
            let mut detached = source
                .detach(&path)
                .ok_or_else(|| ApplyError::MoveTargetNotFound {
                    spec: spec_repr(&move_spec),
                })?;
            *anchor = rebase_after_removal(anchor, &path).ok_or_else(|| {
                ApplyError::TargetNotFound {
                    spec: context.to_string(),
                }
            })?;
            // The detached node's own tail was merged into the base tree by
            // the removal; it takes over the move marker's slot and tail.
            detached.set_tail(move_spec.tail.take());
            nodes[i] = detached;
        } else if let Node::Element(el) = &mut nodes[i] {
            resolve_moves(source, anchor, &mut el.children, pre_locate, context)?;
        }
    }
    Ok(())
}

/// Re-base `path` after the node at `removed` left the tree. `None` when
/// `path` pointed into the removed subtree.
fn rebase_after_removal(path: &NodePath, removed: &NodePath) -> Option<NodePath> {
    if path.starts_with(removed) {
        return None;
    }
    let slice = path.as_slice();
    let removed_slice = removed.as_slice();
    let depth = removed_slice.len() - 1;
    if slice.len() > depth
        && slice[..depth] == removed_slice[..depth]
        && slice[depth] > removed_slice[depth]
    {
        let mut rebased = slice.to_vec();
        rebased[depth] -= 1;
        return Some(NodePath::from(rebased));
    }
    Some(path.clone())
}
