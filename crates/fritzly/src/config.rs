//! CLI configuration: thin wrapper around `fritzly_config`.
//!
//! Adds the resolution step that respects `GlobalOpts` flag overrides
//! (--url, --username, --password, --insecure, --timeout).

use secrecy::SecretString;

use fritzly_api::ClientConfig;
use fritzly_config::{Config, Profile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ClientConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile the flags alone must name the router.
pub fn resolve_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = fritzly_config::load_config()?;
    let name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&name) {
        Some(p) => p.clone(),
        // An explicitly requested profile must exist.
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None if global.url.is_some() => Profile::default(),
        None => {
            return Err(CliError::NoConfig {
                path: fritzly_config::config_path().display().to_string(),
            });
        }
    };
    apply_overrides(&mut profile, global);

    let password = match global.password {
        Some(ref pw) => SecretString::from(pw.clone()),
        None => fritzly_config::resolve_password(&profile, &name)?,
    };
    Ok(fritzly_config::to_client_config(&profile, &cfg.defaults, password)?)
}

/// Flag values win over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username.clone_from(username);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }
}
