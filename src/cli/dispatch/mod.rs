use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Result};
use secrecy::SecretString;
use std::path::PathBuf;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let api_url = matches
        .get_one::<String>("api-url")
        .map(String::to_string)
        .ok_or_else(|| anyhow!("missing required argument: --api-url"))?;

    let store_path = matches
        .get_one::<String>("store")
        .map_or_else(GlobalArgs::default_store_path, PathBuf::from);

    let globals = GlobalArgs::new(api_url, store_path);

    let action = match matches.subcommand() {
        Some(("login", sub)) => Action::Login {
            email: sub
                .get_one::<String>("email")
                .map(String::to_string)
                .ok_or_else(|| anyhow!("missing required argument: email"))?,
            password: sub
                .get_one::<String>("password")
                .map(|s| SecretString::from(s.to_string())),
        },
        Some(("logout", _)) => Action::Logout,
        Some(("whoami", sub)) => Action::Whoami {
            permission: sub.get_one::<String>("permission").map(String::to_string),
            roles: sub
                .get_many::<String>("role")
                .map(|roles| roles.map(String::to_string).collect())
                .unwrap_or_default(),
        },
        Some(("status", _)) => Action::Status,
        _ => return Err(anyhow!("unknown subcommand")),
    };

    Ok((action, globals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn test_dispatch_login() {
        let matches = commands::new().get_matches_from(vec![
            "pdi-session",
            "--api-url",
            "https://api.pdifinance.com",
            "login",
            "admin@pdifinance.com",
        ]);

        let (action, globals) = handler(&matches).unwrap();

        assert_eq!(globals.api_url, "https://api.pdifinance.com");
        match action {
            Action::Login { email, password } => {
                assert_eq!(email, "admin@pdifinance.com");
                assert!(password.is_none());
            }
            other => panic!("expected login action, got {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_requires_api_url() {
        temp_env::with_vars([("PDI_SESSION_API_URL", None::<String>)], || {
            let matches = commands::new().get_matches_from(vec!["pdi-session", "status"]);

            assert!(handler(&matches).is_err());
        });
    }

    #[test]
    fn test_dispatch_whoami_defaults() {
        let matches = commands::new().get_matches_from(vec![
            "pdi-session",
            "--api-url",
            "http://localhost:8000",
            "whoami",
        ]);

        let (action, _) = handler(&matches).unwrap();

        match action {
            Action::Whoami { permission, roles } => {
                assert!(permission.is_none());
                assert!(roles.is_empty());
            }
            other => panic!("expected whoami action, got {other:?}"),
        }
    }
}
