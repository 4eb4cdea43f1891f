use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("pdi-session")
        .about("PDI Finance client session manager")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg(
            Arg::new("api-url")
                .short('u')
                .long("api-url")
                .help("Backend base URL, example: https://api.pdifinance.com")
                .env("PDI_SESSION_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("store")
                .short('s')
                .long("store")
                .help("Credential store file (survives restarts)")
                .env("PDI_SESSION_STORE")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PDI_SESSION_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(
            Command::new("login")
                .about("Authenticate and persist the session")
                .arg(Arg::new("email").help("Account email").required(true))
                .arg(
                    Arg::new("password")
                        .short('p')
                        .long("password")
                        .help("Account password (prompted when omitted)")
                        .env("PDI_SESSION_PASSWORD"),
                ),
        )
        .subcommand(
            Command::new("logout").about("Revoke the session and clear stored credentials"),
        )
        .subcommand(
            Command::new("whoami")
                .about("Restore the session and show the current user")
                .arg(
                    Arg::new("permission")
                        .long("permission")
                        .help("Require a permission before showing the profile"),
                )
                .arg(
                    Arg::new("role")
                        .long("role")
                        .help("Require one of the given roles (repeatable)")
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Show the stored session without contacting the backend"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "pdi-session");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "PDI Finance client session manager"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_login_args() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "pdi-session",
            "--api-url",
            "https://api.pdifinance.com",
            "--store",
            "/tmp/pdi-session.json",
            "login",
            "admin@pdifinance.com",
            "--password",
            "Admin@2025",
        ]);

        assert_eq!(
            matches.get_one::<String>("api-url").map(String::as_str),
            Some("https://api.pdifinance.com")
        );
        assert_eq!(
            matches.get_one::<String>("store").map(String::as_str),
            Some("/tmp/pdi-session.json")
        );

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "login");
        assert_eq!(
            sub.get_one::<String>("email").map(String::as_str),
            Some("admin@pdifinance.com")
        );
        assert_eq!(
            sub.get_one::<String>("password").map(String::as_str),
            Some("Admin@2025")
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("PDI_SESSION_API_URL", Some("https://api.pdifinance.com")),
                ("PDI_SESSION_STORE", Some("/tmp/pdi.json")),
                ("PDI_SESSION_LOG_LEVEL", Some("info")),
            ],
            || {
                let command = new();
                let matches = command.get_matches_from(vec!["pdi-session", "status"]);

                assert_eq!(
                    matches.get_one::<String>("api-url").map(String::as_str),
                    Some("https://api.pdifinance.com")
                );
                assert_eq!(
                    matches.get_one::<String>("store").map(String::as_str),
                    Some("/tmp/pdi.json")
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        let levels = vec!["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars([("PDI_SESSION_LOG_LEVEL", Some(level))], || {
                let command = new();
                let matches = command.get_matches_from(vec!["pdi-session", "status"]);
                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_whoami_requirements() {
        let command = new();
        let matches = command.get_matches_from(vec![
            "pdi-session",
            "whoami",
            "--permission",
            "can_manage_users",
            "--role",
            "Admin",
            "--role",
            "Gestor",
        ]);

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "whoami");
        assert_eq!(
            sub.get_one::<String>("permission").map(String::as_str),
            Some("can_manage_users")
        );
        assert_eq!(
            sub.get_many::<String>("role")
                .unwrap()
                .map(String::as_str)
                .collect::<Vec<_>>(),
            vec!["Admin", "Gestor"]
        );
    }
}
