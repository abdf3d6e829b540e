use thiserror::Error;

use crate::model::User;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("not logged in")]
    NotLoggedIn,
}

/// Who is using the dashboard. Passed explicitly to anything that needs the
/// current user; replaced on login and logout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn require_user(&self) -> Result<&User, SessionError> {
        self.user.as_ref().ok_or(SessionError::NotLoggedIn)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: 4,
            created_at: Utc::now(),
            name: Some("Ada".into()),
            email: "ada@example.com".into(),
            domain: None,
            linkedin_url: None,
            facebook_url: None,
            instagram_url: None,
            twitter_url: None,
        }
    }

    #[test]
    fn anonymous_session_has_no_user() {
        let s = Session::anonymous();
        assert!(!s.is_authenticated());
        assert_eq!(s.user_id(), None);
        assert_eq!(s.require_user(), Err(SessionError::NotLoggedIn));
    }

    #[test]
    fn user_session_exposes_id() {
        let s = Session::for_user(user());
        assert_eq!(s.user_id(), Some(4));
        assert_eq!(s.require_user().unwrap().email, "ada@example.com");
    }
}
