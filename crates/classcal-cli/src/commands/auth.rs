use std::path::Path;

use clap::Subcommand;
use classcal_core::auth::{KeyringTokenStore, TokenStore};

use super::CliResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in with Google in the browser
    Login,
    /// Remove stored credentials
    Logout,
    /// Check authentication status
    Status,
}

pub async fn run(config_path: Option<&Path>, action: AuthAction) -> CliResult {
    match action {
        AuthAction::Login => {
            let credentials = super::credentials_path(config_path)?;
            let auth = super::authenticator(&credentials)?;
            auth.login().await?;
            println!("authenticated");
        }
        AuthAction::Logout => {
            KeyringTokenStore::new().clear()?;
            println!("logged out");
        }
        AuthAction::Status => {
            if KeyringTokenStore::new().load()?.is_some() {
                println!("authenticated");
            } else {
                println!("not authenticated");
            }
        }
    }
    Ok(())
}
