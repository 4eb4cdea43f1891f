use crate::session::{
    error::{ErrorKind, SessionError},
    models::UserProfile,
    SessionService,
};
use secrecy::SecretString;
use std::sync::RwLock;
use tracing::{debug, instrument, warn};

/// Lifecycle of the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Unauthenticated,
    Authenticated,
}

/// The single source of truth consulted by every view.
///
/// Owned exclusively by the controller; consumers get snapshots, never
/// references into the lock.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    pub user: Option<UserProfile>,
    pub loading: bool,
    pub last_error: Option<SessionError>,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            phase: Phase::Initializing,
            user: None,
            loading: true,
            last_error: None,
        }
    }

    fn torn_down() -> Self {
        Self {
            phase: Phase::Unauthenticated,
            user: None,
            loading: false,
            last_error: None,
        }
    }

    /// False without a user; unconditionally true for the administrative
    /// role; otherwise a permission-map lookup defaulting to false.
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        let Some(user) = &self.user else {
            return false;
        };

        if user.is_admin() {
            return true;
        }

        user.permissions.get(name).copied().unwrap_or(false)
    }

    /// True iff the current user's role is a member of `roles`.
    #[must_use]
    pub fn has_role(&self, roles: &[&str]) -> bool {
        let Some(user) = &self.user else {
            return false;
        };

        roles.iter().any(|role| *role == user.role)
    }
}

/// Holds the in-memory session state and orchestrates startup restoration,
/// login and logout transitions.
pub struct SessionController {
    service: SessionService,
    state: RwLock<SessionState>,
}

impl SessionController {
    #[must_use]
    pub fn new(service: SessionService) -> Self {
        Self {
            service,
            state: RwLock::new(SessionState::initial()),
        }
    }

    #[must_use]
    pub fn service(&self) -> &SessionService {
        &self.service
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        apply(&mut state);
    }

    /// Clear a stored error only when the finished operation is of the same
    /// kind; unrelated operations never touch it.
    fn clear_error_of_kind(state: &mut SessionState, kind: ErrorKind) {
        if state.last_error.as_ref().map(SessionError::kind) == Some(kind) {
            state.last_error = None;
        }
    }

    /// Startup session restoration.
    ///
    /// With a stored access token: show the cached profile immediately, then
    /// refresh it from the backend. A profile-fetch failure keeps the cached
    /// data and still authenticates; a renewal failure is terminal. Without a
    /// token: straight to `Unauthenticated`.
    #[instrument(skip(self))]
    pub async fn initialize(&self) {
        if !self.service.is_authenticated() {
            self.update(|state| *state = SessionState::torn_down());
            return;
        }

        // Optimistic display while the fresh profile loads.
        let cached = self.service.cached_user();
        self.update(|state| state.user = cached);

        match self.service.fetch_current_user().await {
            Ok(user) => self.update(|state| {
                state.user = Some(user);
                state.phase = Phase::Authenticated;
                state.loading = false;
                Self::clear_error_of_kind(state, ErrorKind::Profile);
            }),
            Err(SessionError::RenewalFailed(detail)) => {
                warn!("session restoration hit a terminal renewal failure: {detail}");

                self.update(|state| {
                    *state = SessionState::torn_down();
                    state.last_error = Some(SessionError::RenewalFailed(detail));
                });
            }
            Err(e) => {
                // A background refresh failure does not log the user out.
                debug!("keeping cached profile, refresh failed: {e}");

                self.update(|state| {
                    state.phase = Phase::Authenticated;
                    state.loading = false;
                    state.last_error = Some(e);
                });
            }
        }
    }

    /// # Errors
    /// Re-raises the service error for inline UI handling after recording it
    /// as `last_error`.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserProfile, SessionError> {
        self.update(|state| state.loading = true);

        match self.service.login(email, password).await {
            Ok(outcome) => {
                self.update(|state| {
                    state.user = Some(outcome.user.clone());
                    state.phase = Phase::Authenticated;
                    state.loading = false;
                    Self::clear_error_of_kind(state, ErrorKind::Login);
                });

                Ok(outcome.user)
            }
            Err(e) => {
                self.update(|state| {
                    state.phase = Phase::Unauthenticated;
                    state.loading = false;
                    state.last_error = Some(e.clone());
                });

                Err(e)
            }
        }
    }

    /// Tear down regardless of the backend call's outcome.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.service.logout().await;

        self.update(|state| *state = SessionState::torn_down());
    }

    /// Reaction to a `SessionExpired` event from the gateway.
    pub fn mark_expired(&self) {
        self.update(|state| *state = SessionState::torn_down());
    }

    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.snapshot().has_permission(name)
    }

    #[must_use]
    pub fn has_role(&self, roles: &[&str]) -> bool {
        self.snapshot().has_role(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::models::ADMIN_ROLE;
    use std::collections::HashMap;

    fn user(role: &str, permissions: &[(&str, bool)]) -> UserProfile {
        UserProfile {
            id: 1,
            uuid: None,
            name: "Someone".to_string(),
            email: "someone@pdifinance.com".to_string(),
            role: role.to_string(),
            active: true,
            permissions: permissions
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        }
    }

    fn state_with(user: Option<UserProfile>) -> SessionState {
        SessionState {
            phase: if user.is_some() {
                Phase::Authenticated
            } else {
                Phase::Unauthenticated
            },
            user,
            loading: false,
            last_error: None,
        }
    }

    #[test]
    fn admin_has_every_permission() {
        let state = state_with(Some(user(ADMIN_ROLE, &[])));

        assert!(state.has_permission("can_manage_users"));
        assert!(state.has_permission("never_granted_anywhere"));
    }

    #[test]
    fn permission_lookup_defaults_to_false() {
        let state = state_with(Some(user(
            "Gestor",
            &[("can_edit_expenses", true), ("can_manage_users", false)],
        )));

        assert!(state.has_permission("can_edit_expenses"));
        assert!(!state.has_permission("can_manage_users"));
        assert!(!state.has_permission("can_delete_everything"));
    }

    #[test]
    fn no_user_means_no_permission_and_no_role() {
        let state = state_with(None);

        assert!(!state.has_permission("can_view_dashboard"));
        assert!(!state.has_role(&[ADMIN_ROLE, "Finance"]));
    }

    #[test]
    fn role_membership_is_exact() {
        let state = state_with(Some(user(ADMIN_ROLE, &[])));

        assert!(state.has_role(&[ADMIN_ROLE]));
        assert!(state.has_role(&["Admin", "Finance"]));
        assert!(!state.has_role(&["Finance"]));
        assert!(!state.has_role(&["admin"]));
        assert!(!state.has_role(&[]));
    }

    #[test]
    fn profile_without_permission_map_only_satisfies_admin() {
        let reduced = state_with(Some(user("Coordenador", &[])));
        assert!(!reduced.has_permission("can_import_files"));

        let admin = state_with(Some(UserProfile {
            permissions: HashMap::new(),
            ..user(ADMIN_ROLE, &[])
        }));
        assert!(admin.has_permission("can_import_files"));
    }
}
