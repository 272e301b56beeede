use brigade_auth::AuthenticatedUser;
use brigade_core::UserId;

/// Caller identity for a request.
///
/// Inserted by the auth middleware; present on every route except `/health`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user: AuthenticatedUser,
}

impl UserContext {
    pub fn new(user: AuthenticatedUser) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.user_id
    }

    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.user.name.as_deref()
    }
}
