//! Comment drafting and thread reconstruction.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::entities::Comment;
use crate::domain::error::ValidationError;
use crate::domain::types::{CommentId, PostId};

#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub post_id: PostId,
    pub content: String,
    pub parent_comment_id: Option<CommentId>,
}

impl CommentDraft {
    pub fn new(post_id: PostId, content: impl Into<String>) -> Self {
        Self {
            post_id,
            content: content.into(),
            parent_comment_id: None,
        }
    }

    pub fn reply_to(mut self, parent: CommentId) -> Self {
        self.parent_comment_id = Some(parent);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::required("content"));
        }
        if self.post_id.is_empty() {
            return Err(ValidationError::required("postId"));
        }
        Ok(())
    }
}

/// A comment with its nested replies, oldest first at every level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Rebuild the reply tree from the flat list the boundary returns.
    ///
    /// Replies whose parent is not in the list are promoted to the top level.
    pub fn build(comments: Vec<Comment>) -> Vec<CommentThread> {
        let known: HashSet<CommentId> = comments.iter().map(|c| c.id.clone()).collect();

        let mut roots = Vec::new();
        let mut children: HashMap<CommentId, Vec<Comment>> = HashMap::new();
        for comment in comments {
            match &comment.parent_comment_id {
                Some(parent) if known.contains(parent) && parent != &comment.id => {
                    children.entry(parent.clone()).or_default().push(comment);
                }
                _ => roots.push(comment),
            }
        }

        sort_oldest_first(&mut roots);
        let mut threads: Vec<CommentThread> = roots
            .into_iter()
            .map(|root| attach(root, &mut children))
            .collect();

        // Parent cycles never reach a root; surface them flat.
        let mut stranded: Vec<Comment> = children.into_values().flatten().collect();
        sort_oldest_first(&mut stranded);
        threads.extend(stranded.into_iter().map(|comment| CommentThread {
            comment,
            replies: Vec::new(),
        }));
        threads
    }

    /// Number of comments in this thread, root included.
    pub fn count(&self) -> usize {
        1 + self.replies.iter().map(CommentThread::count).sum::<usize>()
    }
}

fn attach(comment: Comment, children: &mut HashMap<CommentId, Vec<Comment>>) -> CommentThread {
    let mut direct = children.remove(&comment.id).unwrap_or_default();
    sort_oldest_first(&mut direct);
    let replies = direct
        .into_iter()
        .map(|reply| attach(reply, children))
        .collect();
    CommentThread { comment, replies }
}

fn sort_oldest_first(comments: &mut [Comment]) {
    comments.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}
