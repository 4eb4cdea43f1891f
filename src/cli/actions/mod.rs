pub mod login;
pub mod logout;
pub mod status;
pub mod whoami;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Login {
        email: String,
        password: Option<SecretString>,
    },
    Logout,
    Whoami {
        permission: Option<String>,
        roles: Vec<String>,
    },
    Status,
}
