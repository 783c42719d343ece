use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scope over which a capability is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "id", rename_all = "snake_case")]
pub enum ContextRef {
    Site,
    Course(Uuid),
    /// A course module; forums are addressed by their forum id.
    Module(Uuid),
    /// A user's own context (used for delegated access such as parents or mentors).
    User(Uuid),
}

/// `ViewerContext` identifies the acting user for one report request.
///
/// It is passed explicitly through every evaluator and counter call; nothing
/// in this module reads a "current user" from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerContext {
    /// The user on whose behalf the report is computed.
    subject_id: Uuid,
    /// Whether the request carries an authenticated session.
    logged_in: bool,
    /// Whether the session belongs to the guest account.
    guest: bool,
}

impl ViewerContext {
    #[must_use]
    pub fn builder() -> ViewerContextBuilder {
        ViewerContextBuilder::default()
    }

    /// A viewer with no session at all.
    #[must_use]
    pub fn anonymous() -> Self {
        ViewerContextBuilder::default().build()
    }

    /// Shorthand for a logged-in, non-guest viewer.
    #[must_use]
    pub fn user(subject_id: Uuid) -> Self {
        Self::builder().subject_id(subject_id).logged_in(true).build()
    }

    #[must_use]
    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.logged_in && self.guest
    }

    /// Logged in with a real (non-guest) account.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.logged_in && !self.guest
    }

    /// Whether this viewer is `user`.
    #[must_use]
    pub fn is_user(&self, user: Uuid) -> bool {
        self.logged_in && self.subject_id == user
    }
}

#[derive(Default)]
pub struct ViewerContextBuilder {
    subject_id: Option<Uuid>,
    logged_in: bool,
    guest: bool,
}

impl ViewerContextBuilder {
    #[must_use]
    pub fn subject_id(mut self, subject_id: Uuid) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    #[must_use]
    pub fn logged_in(mut self, logged_in: bool) -> Self {
        self.logged_in = logged_in;
        self
    }

    #[must_use]
    pub fn guest(mut self, guest: bool) -> Self {
        self.guest = guest;
        self
    }

    #[must_use]
    pub fn build(self) -> ViewerContext {
        ViewerContext {
            subject_id: self.subject_id.unwrap_or_default(),
            logged_in: self.logged_in,
            guest: self.guest,
        }
    }
}
