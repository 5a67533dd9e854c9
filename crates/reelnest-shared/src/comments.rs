//! The comment forest attached to a media item.
//!
//! A forest is a plain `Vec<CommentNode>` where every node owns its replies.
//! All mutations here are pure: they borrow the current forest and return a
//! new one, copying only the nodes on the path from a root to the edited
//! node. Persistence lives in `reelnest-store`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CommentError;
use crate::identity::Actor;
use crate::types::{CommentId, UserId};

/// One comment or reply, including its own nested replies.
///
/// Field names on the wire match the documents already stored by the web
/// front-end (`comment`, `likes`, ...), so existing rows load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentNode {
    pub id: CommentId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Public avatar URL captured when the comment was written.
    #[serde(default, deserialize_with = "null_as_default")]
    pub avatar_path: String,
    #[serde(rename = "comment")]
    pub text: String,
    #[serde(rename = "likes", default, deserialize_with = "null_as_default")]
    pub like_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub liked_by: Vec<UserId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub replies: Vec<CommentNode>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl CommentNode {
    /// A fresh node with a new id, no likes and no replies. `text` is stored
    /// as given; run it through [`validate_comment_text`] first.
    pub fn authored_by(actor: &Actor, text: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            username: actor.username.clone(),
            avatar_path: actor.avatar_url.clone(),
            text: text.into(),
            like_count: 0,
            liked_by: Vec::new(),
            replies: Vec::new(),
        }
    }

    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.liked_by.contains(user)
    }
}

/// Result of a tree mutation. `found` is false when the parent or target id
/// did not match any node, in which case `forest` equals the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEdit {
    pub forest: Vec<CommentNode>,
    pub found: bool,
}

/// Turn whatever is stored in a media row's `comments` column into a forest.
///
/// Absent and `null` give an empty forest, a bare object is wrapped into a
/// singleton and a list is kept. Entries that do not decode are dropped.
pub fn normalize_forest(value: Option<&Value>) -> Vec<CommentNode> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| decode_node(item, index))
            .collect(),
        Some(item @ Value::Object(_)) => decode_node(item, 0).into_iter().collect(),
        Some(other) => {
            tracing::warn!(kind = value_kind(other), "ignoring non-list comment document");
            Vec::new()
        }
    }
}

fn decode_node(item: &Value, index: usize) -> Option<CommentNode> {
    match CommentNode::deserialize(serde_stacker::Deserializer::new(item)) {
        Ok(node) => Some(node),
        Err(e) => {
            tracing::warn!(index, error = %e, "dropping malformed comment entry");
            None
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Append `reply` under the node whose id is `parent_id`, searching the
/// whole forest depth-first. With no parent the reply becomes a new root.
pub fn insert_reply(
    forest: &[CommentNode],
    parent_id: Option<&CommentId>,
    reply: CommentNode,
) -> TreeEdit {
    let Some(parent_id) = parent_id else {
        let mut updated = forest.to_vec();
        updated.push(reply);
        return TreeEdit {
            forest: updated,
            found: true,
        };
    };

    match rewrite_path(forest, parent_id, &mut |parent| parent.replies.push(reply.clone())) {
        Some(updated) => TreeEdit {
            forest: updated,
            found: true,
        },
        None => {
            tracing::debug!(parent = %parent_id, "reply parent not found, forest unchanged");
            TreeEdit {
                forest: forest.to_vec(),
                found: false,
            }
        }
    }
}

/// Flip `user`'s like on the node `target_id`. Afterwards `like_count` is
/// recomputed from `liked_by`, so it never goes below zero.
pub fn toggle_like(forest: &[CommentNode], target_id: &CommentId, user: &UserId) -> TreeEdit {
    let edited = rewrite_path(forest, target_id, &mut |target| {
        if target.is_liked_by(user) {
            target.liked_by.retain(|u| u != user);
        } else {
            target.liked_by.push(user.clone());
        }
        target.like_count = target.liked_by.len() as u64;
    });

    match edited {
        Some(updated) => TreeEdit {
            forest: updated,
            found: true,
        },
        None => {
            tracing::debug!(target = %target_id, "like target not found, forest unchanged");
            TreeEdit {
                forest: forest.to_vec(),
                found: false,
            }
        }
    }
}

// Copy-on-write along the root-to-target path. Returns None when no node
// matches; ids are unique so the walk stops at the first hit.
fn rewrite_path(
    nodes: &[CommentNode],
    target_id: &CommentId,
    edit: &mut dyn FnMut(&mut CommentNode),
) -> Option<Vec<CommentNode>> {
    for (index, node) in nodes.iter().enumerate() {
        if node.id == *target_id {
            let mut updated = nodes.to_vec();
            edit(&mut updated[index]);
            return Some(updated);
        }
        if let Some(replies) = rewrite_path(&node.replies, target_id, edit) {
            let mut updated = nodes.to_vec();
            updated[index].replies = replies;
            return Some(updated);
        }
    }
    None
}

/// Depth-first lookup of a node by id.
pub fn find_comment<'a>(forest: &'a [CommentNode], id: &CommentId) -> Option<&'a CommentNode> {
    for node in forest {
        if node.id == *id {
            return Some(node);
        }
        if let Some(found) = find_comment(&node.replies, id) {
            return Some(found);
        }
    }
    None
}

/// Total number of comments and replies in the forest.
pub fn count_comments(forest: &[CommentNode]) -> usize {
    forest
        .iter()
        .map(|node| 1 + count_comments(&node.replies))
        .sum()
}

/// Trim a submitted comment body and check it against `max_chars`.
pub fn validate_comment_text(text: &str, max_chars: usize) -> Result<String, CommentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CommentError::EmptyText);
    }
    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(CommentError::TooLong {
            len,
            max: max_chars,
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use serde_json::json;

    fn node(id: &str, replies: Vec<CommentNode>) -> CommentNode {
        CommentNode {
            id: CommentId::from(id),
            username: format!("user-{id}"),
            avatar_path: "/avatar-placeholder.png".to_string(),
            text: format!("text of {id}"),
            like_count: 0,
            liked_by: Vec::new(),
            replies,
        }
    }

    fn sample_forest() -> Vec<CommentNode> {
        vec![
            node("a", vec![node("a1", vec![node("a1x", vec![])]), node("a2", vec![])]),
            node("b", vec![]),
        ]
    }

    fn actor(id: &str) -> Actor {
        Actor {
            user_id: UserId::from(id),
            username: id.to_string(),
            avatar_url: "/avatar-placeholder.png".to_string(),
        }
    }

    // Forest with `count` nodes, ids "n0".."n{count-1}", random shape.
    fn random_forest(rng: &mut StdRng, count: usize) -> Vec<CommentNode> {
        let mut forest: Vec<CommentNode> = Vec::new();
        let mut ids: Vec<CommentId> = Vec::new();
        for i in 0..count {
            let new = node(&format!("n{i}"), vec![]);
            let parent = if ids.is_empty() || rng.gen_bool(0.2) {
                None
            } else {
                Some(ids[rng.gen_range(0..ids.len())].clone())
            };
            ids.push(new.id.clone());
            forest = insert_reply(&forest, parent.as_ref(), new).forest;
        }
        forest
    }

    fn all_ids(forest: &[CommentNode], out: &mut Vec<CommentId>) {
        for n in forest {
            out.push(n.id.clone());
            all_ids(&n.replies, out);
        }
    }

    // Every node except `skip`, with replies stripped, keyed by id.
    fn flat_without(forest: &[CommentNode], skip: &CommentId) -> Vec<(CommentId, CommentNode)> {
        let mut ids = Vec::new();
        all_ids(forest, &mut ids);
        ids.into_iter()
            .filter(|id| id != skip)
            .map(|id| {
                let mut n = find_comment(forest, &id).unwrap().clone();
                n.replies = n.replies.iter().map(|r| node(r.id.as_str(), vec![])).collect();
                (id, n)
            })
            .collect()
    }

    #[test]
    fn test_normalize_absent_and_null() {
        assert!(normalize_forest(None).is_empty());
        assert!(normalize_forest(Some(&Value::Null)).is_empty());
        assert!(normalize_forest(Some(&json!([]))).is_empty());
    }

    #[test]
    fn test_normalize_wraps_single_object() {
        let raw = json!({
            "id": "solo",
            "username": "ann",
            "avatar_path": "/a.png",
            "comment": "hello",
            "likes": 0,
            "replies": []
        });
        let forest = normalize_forest(Some(&raw));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].id, CommentId::from("solo"));
        assert_eq!(forest[0].text, "hello");
        assert!(forest[0].liked_by.is_empty());
    }

    #[test]
    fn test_normalize_keeps_list() {
        let forest = sample_forest();
        let raw = serde_json::to_value(&forest).unwrap();
        assert_eq!(normalize_forest(Some(&raw)), forest);
    }

    #[test]
    fn test_normalize_tolerates_legacy_nulls_and_garbage() {
        let raw = json!([
            { "id": "x", "comment": "hi", "likes": null, "liked_by": null, "replies": null },
            42,
            { "no_id": true }
        ]);
        let forest = normalize_forest(Some(&raw));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].like_count, 0);
        assert!(forest[0].replies.is_empty());

        assert!(normalize_forest(Some(&json!("text"))).is_empty());
    }

    #[test]
    fn test_normalize_deep_chain() {
        const DEPTH: usize = 300;
        let mut raw = json!({ "id": format!("n{}", DEPTH - 1), "comment": "leaf" });
        for level in (0..DEPTH - 1).rev() {
            raw = json!({ "id": format!("n{level}"), "comment": "x", "replies": [raw] });
        }

        let forest = normalize_forest(Some(&json!([raw])));
        assert_eq!(count_comments(&forest), DEPTH);
        let leaf = find_comment(&forest, &CommentId::from("n299")).unwrap();
        assert_eq!(leaf.text, "leaf");
    }

    #[test]
    fn test_insert_root_when_no_parent() {
        let forest = sample_forest();
        let reply = node("c", vec![]);
        let edit = insert_reply(&forest, None, reply.clone());
        assert!(edit.found);
        assert_eq!(edit.forest.len(), 3);
        assert_eq!(edit.forest[2], reply);
        assert_eq!(&edit.forest[..2], &forest[..]);
    }

    #[test]
    fn test_insert_nested_reply() {
        let forest = sample_forest();
        let reply = node("new", vec![]);
        let edit = insert_reply(&forest, Some(&CommentId::from("a1x")), reply.clone());
        assert!(edit.found);

        let parent = find_comment(&edit.forest, &CommentId::from("a1x")).unwrap();
        assert_eq!(parent.replies, vec![reply]);
        assert_eq!(edit.forest[1], forest[1]);
        assert_eq!(edit.forest[0].replies[1], forest[0].replies[1]);
        assert_eq!(count_comments(&edit.forest), count_comments(&forest) + 1);
    }

    #[test]
    fn test_insert_under_missing_parent_is_noop() {
        let forest = sample_forest();
        let edit = insert_reply(&forest, Some(&CommentId::from("ghost")), node("new", vec![]));
        assert!(!edit.found);
        assert_eq!(edit.forest, forest);
    }

    #[test]
    fn test_insert_random_forests() {
        let mut rng = StdRng::seed_from_u64(7);
        for round in 0..50 {
            let forest = random_forest(&mut rng, 1 + round % 25);
            let mut ids = Vec::new();
            all_ids(&forest, &mut ids);
            let parent = ids[rng.gen_range(0..ids.len())].clone();
            let before = find_comment(&forest, &parent).unwrap().replies.len();

            let reply = node("inserted", vec![]);
            let edit = insert_reply(&forest, Some(&parent), reply.clone());
            assert!(edit.found);

            let after = find_comment(&edit.forest, &parent).unwrap();
            assert_eq!(after.replies.len(), before + 1);
            assert_eq!(after.replies.last(), Some(&reply));
            assert_eq!(
                flat_without(&edit.forest, &parent)
                    .into_iter()
                    .filter(|(id, _)| id.as_str() != "inserted")
                    .collect::<Vec<_>>(),
                flat_without(&forest, &parent)
            );
        }
    }

    #[test]
    fn test_toggle_like_then_unlike() {
        let forest = sample_forest();
        let user = UserId::from("u1");
        let target = CommentId::from("a2");

        let liked = toggle_like(&forest, &target, &user);
        assert!(liked.found);
        let n = find_comment(&liked.forest, &target).unwrap();
        assert_eq!(n.liked_by, vec![user.clone()]);
        assert_eq!(n.like_count, 1);
        assert_eq!(liked.forest[1], forest[1]);
        assert_eq!(liked.forest[0].replies[0], forest[0].replies[0]);

        let unliked = toggle_like(&liked.forest, &target, &user);
        assert_eq!(unliked.forest, forest);
    }

    #[test]
    fn test_toggle_keeps_other_likers() {
        let mut forest = sample_forest();
        forest[1].liked_by = vec![UserId::from("u1"), UserId::from("u2")];
        forest[1].like_count = 2;

        let edit = toggle_like(&forest, &CommentId::from("b"), &UserId::from("u1"));
        assert_eq!(edit.forest[1].liked_by, vec![UserId::from("u2")]);
        assert_eq!(edit.forest[1].like_count, 1);
    }

    #[test]
    fn test_toggle_missing_target_is_noop() {
        let forest = sample_forest();
        let edit = toggle_like(&forest, &CommentId::from("ghost"), &UserId::from("u1"));
        assert!(!edit.found);
        assert_eq!(edit.forest, forest);
    }

    #[test]
    fn test_toggle_count_matches_likers_random() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut forest = random_forest(&mut rng, 30);
        let mut ids = Vec::new();
        all_ids(&forest, &mut ids);
        for _ in 0..200 {
            let target = ids[rng.gen_range(0..ids.len())].clone();
            let user = UserId(format!("u{}", rng.gen_range(0..4)));
            let before = forest.clone();
            forest = toggle_like(&forest, &target, &user).forest;

            let n = find_comment(&forest, &target).unwrap();
            assert_eq!(n.like_count as usize, n.liked_by.len());
            assert_eq!(flat_without(&forest, &target), flat_without(&before, &target));
        }
    }

    #[test]
    fn test_like_reply_like_scenario() {
        let forest = vec![CommentNode {
            id: CommentId::from("a"),
            username: "ann".to_string(),
            avatar_path: "/a.png".to_string(),
            text: "first".to_string(),
            like_count: 0,
            liked_by: vec![],
            replies: vec![],
        }];
        let u1 = UserId::from("u1");
        let a = CommentId::from("a");

        let forest = toggle_like(&forest, &a, &u1).forest;
        assert_eq!(forest[0].liked_by, vec![u1.clone()]);
        assert_eq!(forest[0].like_count, 1);

        let reply = CommentNode::authored_by(&actor("u2"), "hi");
        let forest = insert_reply(&forest, Some(&a), reply.clone()).forest;
        assert_eq!(forest[0].replies.len(), 1);
        let r = &forest[0].replies[0];
        assert_eq!(r.id, reply.id);
        assert_eq!(r.text, "hi");
        assert_eq!(r.like_count, 0);
        assert!(r.liked_by.is_empty());
        assert!(r.replies.is_empty());

        let forest = toggle_like(&forest, &a, &u1).forest;
        assert!(forest[0].liked_by.is_empty());
        assert_eq!(forest[0].like_count, 0);
        assert_eq!(forest[0].replies.len(), 1);
    }

    #[test]
    fn test_wire_names_match_stored_documents() {
        let value = serde_json::to_value(node("a", vec![])).unwrap();
        assert_eq!(value["comment"], "text of a");
        assert_eq!(value["likes"], 0);
        assert!(value["liked_by"].is_array());
        assert!(value.get("text").is_none());
    }

    #[test]
    fn test_validate_comment_text() {
        assert_eq!(validate_comment_text("  hi there \n", 100).unwrap(), "hi there");
        assert_eq!(validate_comment_text("   ", 100), Err(CommentError::EmptyText));
        assert_eq!(
            validate_comment_text("héllo", 4),
            Err(CommentError::TooLong { len: 5, max: 4 })
        );
    }
}
