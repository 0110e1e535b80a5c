//! Current-user identity.

use std::sync::RwLock;

use doorstep_core::UserInfo;

/// Who is signed in, as far as the authentication layer knows.
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, or `None` for an anonymous session.
    fn current_user(&self) -> Option<UserInfo>;
}

/// A session whose identity is set explicitly, e.g. after a session check.
#[derive(Debug, Default)]
pub struct StaticSession {
    user: RwLock<Option<UserInfo>>,
}

impl StaticSession {
    /// A session signed in as `user`.
    #[must_use]
    pub fn signed_in(user: UserInfo) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// An anonymous session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replace the identity (sign in or out).
    pub fn set_user(&self, user: Option<UserInfo>) {
        if let Ok(mut slot) = self.user.write() {
            *slot = user;
        }
    }
}

impl SessionProvider for StaticSession {
    fn current_user(&self) -> Option<UserInfo> {
        self.user.read().ok().and_then(|user| user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let session = StaticSession::anonymous();
        assert!(session.current_user().is_none());

        session.set_user(Some(UserInfo::new("u1")));
        assert_eq!(
            session.current_user().map(|u| u.id.into_inner()),
            Some("u1".to_string())
        );

        session.set_user(None);
        assert!(session.current_user().is_none());
    }
}
