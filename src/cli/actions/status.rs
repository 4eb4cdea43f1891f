use crate::state::SessionController;
use anyhow::Result;

/// Handle the status action: report the stored session without any network
/// call. A present access token may still be expired; only the next request
/// finds out.
pub fn handle(controller: &SessionController) -> Result<()> {
    let service = controller.service();

    if service.is_authenticated() {
        println!("authenticated: yes (token presence only)");
    } else {
        println!("authenticated: no");
    }

    match service.cached_user() {
        Some(user) => println!("cached user: {} <{}> role {}", user.name, user.email, user.role),
        None => println!("cached user: none"),
    }

    Ok(())
}
