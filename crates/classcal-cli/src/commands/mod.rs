pub mod auth;
pub mod config;
pub mod sync;

use std::path::{Path, PathBuf};

use classcal_core::auth::{Authenticator, ClientSecrets, KeyringTokenStore};
use classcal_core::{Config, ResolvedConfig};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load and validate the configuration named on the command line, or the
/// first one found.
pub fn resolve_config(path: Option<&Path>) -> Result<ResolvedConfig, Box<dyn std::error::Error>> {
    let config = Config::load_or_discover(path)?;
    Ok(config.resolve()?)
}

/// Client secrets path from the configuration file. Term dates and the
/// schedule are not needed to sign in, so the rest is left unvalidated.
pub fn credentials_path(path: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(Config::load_or_discover(path)?.credentials_path())
}

/// Authenticator backed by the OS keyring, using the client secrets at `credentials`.
pub fn authenticator(
    credentials: &Path,
) -> Result<Authenticator<KeyringTokenStore>, Box<dyn std::error::Error>> {
    let secrets = ClientSecrets::load(credentials)?;
    Ok(Authenticator::new(secrets.oauth_config(), KeyringTokenStore::new()))
}
