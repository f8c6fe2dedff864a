// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration.
//!
//! Defaults come from [`RuntimeConfig::default`]. With the `config-loaders`
//! feature a config can also be read from YAML:
//!
//! ```yaml
//! # objrt.yaml
//! scrub_on_release: true
//! panic_on_violation: false
//! max_live_objects: 4096
//! ```
//!
//! Environment variables override any source:
//! - `OBJRT_SCRUB_ON_RELEASE`: zero storage on destroy ("1" or "true")
//! - `OBJRT_PANIC_ON_VIOLATION`: panic after reporting a violation ("1" or "true")
//! - `OBJRT_MAX_LIVE_OBJECTS`: live object limit ("0" or "none" removes it)

use std::env;

/// Environment variable names
pub const ENV_SCRUB_ON_RELEASE: &str = "OBJRT_SCRUB_ON_RELEASE";
pub const ENV_PANIC_ON_VIOLATION: &str = "OBJRT_PANIC_ON_VIOLATION";
pub const ENV_MAX_LIVE_OBJECTS: &str = "OBJRT_MAX_LIVE_OBJECTS";

/// Knobs of a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-loaders", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-loaders", serde(default, deny_unknown_fields))]
pub struct RuntimeConfig {
    /// Zero object storage on destroy, before it goes back to the allocator.
    pub scrub_on_release: bool,
    /// Panic after the assert hook has seen a violation.
    pub panic_on_violation: bool,
    /// Refuse creation beyond this many live objects.
    pub max_live_objects: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            scrub_on_release: true,
            panic_on_violation: false,
            max_live_objects: None,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_scrub_on_release(mut self, enabled: bool) -> Self {
        self.scrub_on_release = enabled;
        self
    }

    #[must_use]
    pub fn with_panic_on_violation(mut self, enabled: bool) -> Self {
        self.panic_on_violation = enabled;
        self
    }

    #[must_use]
    pub fn with_max_live_objects(mut self, limit: Option<usize>) -> Self {
        self.max_live_objects = limit;
        self
    }

    /// Apply `OBJRT_*` environment variables on top of this config.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides from `lookup`; unparsable values are logged and ignored.
    #[must_use]
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        if let Some(value) = read(ENV_SCRUB_ON_RELEASE) {
            self.scrub_on_release = parse_flag(&value);
        }
        if let Some(value) = read(ENV_PANIC_ON_VIOLATION) {
            self.panic_on_violation = parse_flag(&value);
        }
        if let Some(value) = read(ENV_MAX_LIVE_OBJECTS) {
            if value == "0" || value.eq_ignore_ascii_case("none") {
                self.max_live_objects = None;
            } else {
                match value.parse::<usize>() {
                    Ok(limit) => self.max_live_objects = Some(limit),
                    Err(_) => log::warn!(
                        "[objrt] ignoring {}={:?}: not a number",
                        ENV_MAX_LIVE_OBJECTS,
                        value
                    ),
                }
            }
        }
        self
    }
}

#[cfg(feature = "config-loaders")]
impl RuntimeConfig {
    /// Parse a YAML document; missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| crate::Error::Config(format!("YAML parse error: {e}")))
    }

    /// Load a YAML file.
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(crate::Error::ConfigFileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        log::debug!("[objrt] loading runtime config from {}", path.display());
        Self::from_yaml_str(&content)
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
