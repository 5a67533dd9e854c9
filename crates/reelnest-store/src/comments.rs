//! Comment mutations on a media item's forest.
//!
//! Both operations are a pure tree edit from `reelnest-shared` run inside
//! [`Database::update_comment_forest`].

use reelnest_shared::comments::{insert_reply, toggle_like};
use reelnest_shared::{CommentId, CommentNode, MediaId, TreeEdit, UserId};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Attach `node` under `parent_id` (or as a new top-level comment) and
    /// persist the whole forest. An unknown parent leaves the stored
    /// document alone and returns it with `found == false`.
    pub fn add_comment(
        &mut self,
        media_id: MediaId,
        parent_id: Option<&CommentId>,
        node: CommentNode,
    ) -> Result<TreeEdit> {
        let comment_id = node.id.clone();
        let edit = self.update_comment_forest(media_id, |forest| {
            insert_reply(forest, parent_id, node)
        })?;

        if edit.found {
            tracing::info!(media = %media_id, comment = %comment_id, "comment added");
        }
        Ok(edit)
    }

    /// Flip `user_id`'s like on `comment_id` and persist the whole forest.
    pub fn toggle_comment_like(
        &mut self,
        media_id: MediaId,
        comment_id: &CommentId,
        user_id: &UserId,
    ) -> Result<TreeEdit> {
        let edit = self.update_comment_forest(media_id, |forest| {
            toggle_like(forest, comment_id, user_id)
        })?;

        if edit.found {
            tracing::debug!(media = %media_id, comment = %comment_id, user = %user_id, "comment like toggled");
        }
        Ok(edit)
    }
}
