use tracing::info;

use crate::config::themes::ThemeName;
use crate::error::{EngineError, EngineResult};
use crate::model::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Session collaborator. The engine only asks whether someone is signed in.
pub trait AuthProvider {
    fn is_authenticated(&self) -> bool;
    fn current_user(&self) -> Option<&User>;
    fn login(&mut self, username: &str, password: &str) -> EngineResult<&User>;
    fn logout(&mut self);
}

/// Signs in anyone with a non-empty username and password.
#[derive(Debug, Default)]
pub struct StubAuthProvider {
    user: Option<User>,
}

impl AuthProvider for StubAuthProvider {
    fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    fn login(&mut self, username: &str, password: &str) -> EngineResult<&User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(EngineError::validation("username and password are required"));
        }
        info!(username, "signed in");
        Ok(&*self.user.insert(User {
            id: "user-1".to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
        }))
    }

    fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            info!(username = %user.username, "signed out");
        }
    }
}

/// Collaborators injected into the application: session, theme and clock.
pub struct AppContext {
    auth: Box<dyn AuthProvider>,
    theme: ThemeName,
    clock: Box<dyn Clock>,
}

impl AppContext {
    pub fn new(auth: Box<dyn AuthProvider>, theme: ThemeName, clock: Box<dyn Clock>) -> Self {
        Self { auth, theme, clock }
    }

    pub fn auth(&self) -> &dyn AuthProvider {
        self.auth.as_ref()
    }

    pub fn auth_mut(&mut self) -> &mut dyn AuthProvider {
        self.auth.as_mut()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn theme(&self) -> ThemeName {
        self.theme
    }

    pub fn is_dark(&self) -> bool {
        self.theme.is_dark()
    }

    pub fn toggle_theme(&mut self) -> ThemeName {
        self.theme = self.theme.toggled();
        self.theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FixedClock;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    fn context() -> AppContext {
        AppContext::new(
            Box::<StubAuthProvider>::default(),
            ThemeName::Light,
            Box::new(FixedClock(datetime!(2025-12-20 0:00))),
        )
    }

    #[test]
    fn stub_login_accepts_any_non_empty_credentials() -> EngineResult<()> {
        let mut ctx = context();
        assert!(!ctx.auth().is_authenticated());
        let user = ctx.auth_mut().login("alice", "secret")?;
        assert_eq!(user.email, "alice@example.com");
        assert!(ctx.auth().is_authenticated());

        ctx.auth_mut().logout();
        assert!(ctx.auth().current_user().is_none());
        assert_matches!(
            ctx.auth_mut().login("  ", "secret"),
            Err(EngineError::Validation { .. })
        );
        assert_matches!(
            ctx.auth_mut().login("alice", ""),
            Err(EngineError::Validation { .. })
        );
        Ok(())
    }

    #[test]
    fn theme_toggles_and_clock_is_injected() {
        let mut ctx = context();
        assert!(!ctx.is_dark());
        assert_eq!(ctx.toggle_theme(), ThemeName::Dark);
        assert!(ctx.is_dark());
        assert_eq!(ctx.clock().now(), datetime!(2025-12-20 0:00));
    }
}
