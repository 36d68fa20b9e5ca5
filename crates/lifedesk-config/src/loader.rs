// SPDX-FileCopyrightText: 2026 Lifedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered Figment loading.
//!
//! Lookup order: `./lifedesk.toml` > `~/.config/lifedesk/lifedesk.toml` > `/etc/lifedesk/lifedesk.toml`
//! with environment variable overrides via `LIFEDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::LifedeskConfig;

/// System-wide config file location.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/lifedesk/lifedesk.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "lifedesk.toml";

/// Env var key prefixes (lowercased, `LIFEDESK_` stripped) and the dotted
/// path they map to. Longer prefixes first so `engines_search_` wins over
/// any shorter match.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("engines_general_", "engines.general."),
    ("engines_search_", "engines.search."),
    ("engines_secondary_", "engines.secondary."),
    ("permissions_", "permissions."),
    ("quota_", "quota."),
    ("usage_", "usage."),
    ("app_", "app."),
];

/// Loads the full layered configuration.
///
/// Later layers win:
/// 1. Built-in defaults
/// 2. `/etc/lifedesk/lifedesk.toml` (system-wide)
/// 3. `~/.config/lifedesk/lifedesk.toml` (user XDG config)
/// 4. `./lifedesk.toml` (local directory)
/// 5. `LIFEDESK_*` environment variables
pub fn load_config() -> Result<LifedeskConfig, figment::Error> {
    build_figment().extract()
}

/// Loads defaults overlaid with `toml_content`; files and environment are ignored.
pub fn load_config_from_str(toml_content: &str) -> Result<LifedeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LifedeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Loads defaults, then `path`, then the `LIFEDESK_*` environment.
pub fn load_config_from_path(path: &Path) -> Result<LifedeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LifedeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The unextracted layered Figment, for callers that need provider metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LifedeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/lifedesk/lifedesk.toml`, when the platform has a config dir.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("lifedesk").join(LOCAL_CONFIG_FILE))
}

/// Create the environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: key names contain
/// underscores, so `LIFEDESK_ENGINES_SEARCH_API_KEY` must become
/// `engines.search.api_key`, not `engines.search.api.key`.
fn env_provider() -> Env {
    Env::prefixed("LIFEDESK_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for (prefix, section) in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}
