use crate::state::SessionController;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use secrecy::SecretString;
use std::io::{self, BufRead, Write};
use tracing::info;

// Minimal shape check before any network call; the backend stays authoritative.
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

fn validate_email(email: &str) -> Result<()> {
    let re = Regex::new(EMAIL_PATTERN).context("invalid email pattern")?;

    if re.is_match(email) {
        Ok(())
    } else {
        Err(anyhow!("not a valid email address: {email}"))
    }
}

fn prompt_password() -> Result<SecretString> {
    eprint!("Password: ");
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;

    Ok(SecretString::from(line.trim_end().to_string()))
}

/// Handle the login action
pub async fn handle(
    controller: &SessionController,
    email: &str,
    password: Option<SecretString>,
) -> Result<()> {
    validate_email(email)?;

    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };

    let user = controller.login(email, &password).await?;

    info!(user_id = user.id, "session established");
    println!("Logged in as {} <{}> role {}", user.name, user.email, user.role);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_email;

    #[test]
    fn accepts_plausible_addresses() {
        assert!(validate_email("admin@pdifinance.com").is_ok());
        assert!(validate_email("gestor@empresa.com.br").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(validate_email("").is_err());
        assert!(validate_email("admin").is_err());
        assert!(validate_email("admin@").is_err());
        assert!(validate_email("admin@local host.com").is_err());
        assert!(validate_email("@pdifinance.com").is_err());
    }
}
