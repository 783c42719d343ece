//! Composed post visibility predicates.
//!
//! The access policy evaluator produces a [`PostScope`]; forum stores compile
//! it into their own query language (or evaluate it directly via
//! [`PostScope::matches`]).
//!
//! ## Shape
//!
//! - Forums are `ORed`: a post is visible if its forum is in `full_access`,
//!   or if it satisfies the [`ForumConstraint`] of its forum.
//! - Filters inside one [`ForumConstraint`] are `ANDed`.
//! - An empty scope is deny-all.
//!
//! A post lives in exactly one discussion, which lives in exactly one forum,
//! so a post can match at most one forum entry and is never counted twice.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Discussion, Post};

/// A single restriction on posts within one forum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PostFilter {
    /// `discussion.group IS NULL OR discussion.group IN (groups)`
    GroupIn { groups: Vec<Uuid> },
    /// `discussion.author = author OR (start < at AND (end IS NULL OR end > at))`
    AuthoredOrVisibleAt { author: Uuid, at: i64 },
    /// `post.discussion IN (discussions) OR post.parent IS NULL`
    DiscussionInOrRoot { discussions: Vec<Uuid> },
    /// `post.parent IS NULL`
    RootOnly,
}

impl PostFilter {
    /// Evaluate the filter against a post and its discussion.
    #[must_use]
    pub fn matches(&self, post: &Post, discussion: &Discussion) -> bool {
        match self {
            Self::GroupIn { groups } => discussion.group_id.is_none_or(|g| groups.contains(&g)),
            Self::AuthoredOrVisibleAt { author, at } => {
                discussion.author_id == *author || discussion.is_visible_at(*at)
            }
            Self::DiscussionInOrRoot { discussions } => {
                discussions.contains(&discussion.id) || post.is_root()
            }
            Self::RootOnly => post.is_root(),
        }
    }
}

/// A conjunction (AND) of filters applied to one forum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumConstraint {
    forum_id: Uuid,
    filters: Vec<PostFilter>,
}

impl ForumConstraint {
    #[must_use]
    pub fn new(forum_id: Uuid, filters: Vec<PostFilter>) -> Self {
        Self { forum_id, filters }
    }

    #[inline]
    #[must_use]
    pub fn forum_id(&self) -> Uuid {
        self.forum_id
    }

    /// The filters in this constraint (AND-ed together).
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[PostFilter] {
        &self.filters
    }

    /// Whether the post passes every filter. Does not check the forum.
    #[must_use]
    pub fn matches(&self, post: &Post, discussion: &Discussion) -> bool {
        self.filters.iter().all(|f| f.matches(post, discussion))
    }
}

/// The set of forums, and per-forum restrictions, a viewer may count in.
///
/// # Examples
///
/// ```
/// use student_activity_sdk::scope::{ForumConstraint, PostFilter, PostScope};
/// use uuid::Uuid;
///
/// let scope = PostScope::default();
/// assert!(scope.is_deny_all());
///
/// let open = Uuid::new_v4();
/// let qanda = Uuid::new_v4();
/// let mut scope = PostScope::default();
/// scope.grant_full_access(open);
/// scope.restrict(ForumConstraint::new(qanda, vec![PostFilter::RootOnly]));
/// assert!(scope.has_full_access(open));
/// assert!(scope.constraint_for(qanda).is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostScope {
    full_access: BTreeSet<Uuid>,
    restricted: Vec<ForumConstraint>,
}

impl PostScope {
    /// Mark a forum as visible without restriction.
    ///
    /// A forum previously restricted stays restricted; full access never
    /// widens an existing constraint.
    pub fn grant_full_access(&mut self, forum_id: Uuid) {
        if self.constraint_for(forum_id).is_none() {
            self.full_access.insert(forum_id);
        }
    }

    /// Add a restricted forum. An empty constraint is treated as full access.
    pub fn restrict(&mut self, constraint: ForumConstraint) {
        if constraint.filters.is_empty() {
            self.grant_full_access(constraint.forum_id);
            return;
        }
        self.full_access.remove(&constraint.forum_id);
        self.restricted.retain(|c| c.forum_id != constraint.forum_id);
        self.restricted.push(constraint);
    }

    #[inline]
    #[must_use]
    pub fn full_access(&self) -> &BTreeSet<Uuid> {
        &self.full_access
    }

    #[inline]
    #[must_use]
    pub fn restricted(&self) -> &[ForumConstraint] {
        &self.restricted
    }

    #[must_use]
    pub fn has_full_access(&self, forum_id: Uuid) -> bool {
        self.full_access.contains(&forum_id)
    }

    #[must_use]
    pub fn constraint_for(&self, forum_id: Uuid) -> Option<&ForumConstraint> {
        self.restricted.iter().find(|c| c.forum_id == forum_id)
    }

    /// No forum is reachable at all.
    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        self.full_access.is_empty() && self.restricted.is_empty()
    }

    /// Every forum id referenced by the scope.
    #[must_use]
    pub fn forum_ids(&self) -> BTreeSet<Uuid> {
        self.full_access
            .iter()
            .copied()
            .chain(self.restricted.iter().map(ForumConstraint::forum_id))
            .collect()
    }

    /// Whether a post in `discussion` is visible under this scope.
    #[must_use]
    pub fn matches(&self, post: &Post, discussion: &Discussion) -> bool {
        if post.discussion_id != discussion.id {
            return false;
        }
        if self.has_full_access(discussion.forum_id) {
            return true;
        }
        self.constraint_for(discussion.forum_id)
            .is_some_and(|c| c.matches(post, discussion))
    }
}

/// Count posts by one author within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCountQuery {
    pub author_id: Uuid,
    pub scope: PostScope,
    /// Only count root posts (discussions started).
    pub discussions_only: bool,
}

impl PostCountQuery {
    /// Whether `post` (in `discussion`) is counted by this query.
    #[must_use]
    pub fn matches(&self, post: &Post, discussion: &Discussion) -> bool {
        post.author_id == self.author_id
            && (!self.discussions_only || post.is_root())
            && self.scope.matches(post, discussion)
    }
}
