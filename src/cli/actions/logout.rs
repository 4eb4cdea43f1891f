use crate::state::SessionController;
use anyhow::Result;

/// Handle the logout action. Local teardown always succeeds, even when the
/// backend is unreachable.
pub async fn handle(controller: &SessionController) -> Result<()> {
    controller.logout().await;

    println!("Logged out");

    Ok(())
}
