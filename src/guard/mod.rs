use crate::state::{Phase, SessionState};

/// What a protected view demands before it may render.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewRequirement<'a> {
    pub permission: Option<&'a str>,
    pub roles: Option<&'a [&'a str]>,
}

impl<'a> ViewRequirement<'a> {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn permission(name: &'a str) -> Self {
        Self {
            permission: Some(name),
            roles: None,
        }
    }

    #[must_use]
    pub fn roles(roles: &'a [&'a str]) -> Self {
        Self {
            permission: None,
            roles: Some(roles),
        }
    }
}

/// Rendering decision for a protected view. Denials are decisions, never
/// errors: `AccessDenied` and `RoleRestricted` keep the user inside the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session restoration still running; render a placeholder and ask again.
    Loading,
    RedirectToLogin,
    AccessDenied { permission: String },
    RoleRestricted { required: Vec<String> },
    Allow,
}

/// Decide whether a protected view may render, in precedence order: still
/// initializing, unauthenticated, missing permission, missing role, allow.
#[must_use]
pub fn evaluate(state: &SessionState, requirement: &ViewRequirement<'_>) -> GuardDecision {
    if state.phase == Phase::Initializing {
        return GuardDecision::Loading;
    }

    if state.phase != Phase::Authenticated || state.user.is_none() {
        return GuardDecision::RedirectToLogin;
    }

    if let Some(permission) = requirement.permission {
        if !state.has_permission(permission) {
            return GuardDecision::AccessDenied {
                permission: permission.to_string(),
            };
        }
    }

    if let Some(roles) = requirement.roles {
        if !state.has_role(roles) {
            return GuardDecision::RoleRestricted {
                required: roles.iter().map(ToString::to_string).collect(),
            };
        }
    }

    GuardDecision::Allow
}
