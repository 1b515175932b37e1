use clap::Subcommand;
use timekeep_core::{CredentialProvider, KeyringCredentials};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a bearer token in the OS keyring
    Login {
        /// Bearer token issued by the identity provider
        #[arg(long)]
        token: String,
    },
    /// Remove the stored token
    Logout,
    /// Show whether a token is stored
    Status,
}

pub fn run(action: AuthAction) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = KeyringCredentials::new();
    match action {
        AuthAction::Login { token } => {
            KeyringCredentials::store_token(&token)?;
            println!("token stored");
        }
        AuthAction::Logout => {
            credentials.invalidate();
            println!("signed out");
        }
        AuthAction::Status => {
            if credentials.is_signed_in() {
                println!("signed in");
            } else {
                println!("not signed in");
            }
        }
    }
    Ok(())
}
