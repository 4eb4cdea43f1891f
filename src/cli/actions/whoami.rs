use crate::{
    guard::{self, GuardDecision, ViewRequirement},
    state::SessionController,
};
use anyhow::Result;

/// Handle the whoami action: restore the session, then run the access guard
/// with the requested permission/role requirement before showing the profile.
pub async fn handle(
    controller: &SessionController,
    permission: Option<&str>,
    roles: &[String],
) -> Result<()> {
    controller.initialize().await;

    let role_refs: Vec<&str> = roles.iter().map(String::as_str).collect();

    let requirement = ViewRequirement {
        permission,
        roles: if role_refs.is_empty() {
            None
        } else {
            Some(&role_refs)
        },
    };

    let state = controller.snapshot();

    match guard::evaluate(&state, &requirement) {
        GuardDecision::Allow => {
            // The guard only allows when a user is present.
            if let Some(user) = &state.user {
                println!("{} <{}>", user.name, user.email);
                println!("role: {}", user.role);

                let mut granted: Vec<&str> = user
                    .permissions
                    .iter()
                    .filter(|(_, enabled)| **enabled)
                    .map(|(name, _)| name.as_str())
                    .collect();
                granted.sort_unstable();

                if !granted.is_empty() {
                    println!("permissions: {}", granted.join(", "));
                }
            }
        }
        GuardDecision::RedirectToLogin => println!("Not logged in, run: pdi-session login <email>"),
        GuardDecision::AccessDenied { permission } => {
            println!("Access denied, missing permission: {permission}");
        }
        GuardDecision::RoleRestricted { required } => {
            println!("Access restricted to roles: {}", required.join(", "));
        }
        GuardDecision::Loading => println!("Session restoration still in progress"),
    }

    Ok(())
}
