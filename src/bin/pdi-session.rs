use anyhow::Result;
use pdi_session::{
    cli::{actions, actions::Action, start},
    gateway::Gateway,
    session::SessionService,
    state::SessionController,
    store::CredentialStore,
};
use std::sync::Arc;
use tokio::sync::mpsc;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (action, globals) = start()?;

    let store = Arc::new(CredentialStore::open(&globals.store_path));
    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel();
    let gateway = Arc::new(Gateway::new(&globals.api_url, store.clone(), expired_tx)?);
    let service = SessionService::new(gateway, store);
    let controller = SessionController::new(service);

    // Handle the action
    let outcome = match action {
        Action::Login { email, password } => {
            actions::login::handle(&controller, &email, password).await
        }
        Action::Logout => actions::logout::handle(&controller).await,
        Action::Whoami { permission, roles } => {
            actions::whoami::handle(&controller, permission.as_deref(), &roles).await
        }
        Action::Status => actions::status::handle(&controller),
    };

    // The gateway already cleared the store; this is the login redirect of a
    // command-line client.
    if let Ok(event) = expired_rx.try_recv() {
        controller.mark_expired();
        eprintln!("Session expired ({:?}), please login again", event.reason);
    }

    outcome
}
