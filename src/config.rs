//! Environment-driven configuration, read once at process start.
//!
//! Mirrors the teacher's `BashOptions`-style options struct: a plain data
//! bag with a `from_env` constructor, kept separate from `clap`'s CLI struct
//! so library callers (tests, the setter binary) can build one without
//! going through argv.

use std::env;

/// Config shared by the interactive shell and its discovery subprocess.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Root directory the namespace is discovered under.
    pub libexec_root: String,
    /// Root directory the setter persists configuration under.
    pub sysconf_root: String,
    /// Optional external line-editor binary path (history/completion UI
    /// integration is a non-goal of the core; this is passed through to
    /// whatever `LineSource` the binary wires up).
    pub editline: Option<String>,
    /// `;`-separated executable suffixes tried during discovery, mirroring
    /// `PATHEXT` semantics.
    pub pathext: Vec<String>,
    /// Environment variables forwarded verbatim to discovery/dispatch
    /// children. Spec default: `TERM LANG LC_ALL TMPDIR TZ USER`.
    pub env_passthrough: Vec<String>,
    /// Maximum stdout+stderr lines read from a discovery child before it is
    /// killed and treated as misbehaving.
    pub discovery_line_cap: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            libexec_root: "/usr/libexec/device".to_string(),
            sysconf_root: "/etc/device".to_string(),
            editline: None,
            pathext: Vec::new(),
            env_passthrough: default_passthrough(),
            discovery_line_cap: 1000,
        }
    }
}

fn default_passthrough() -> Vec<String> {
    ["TERM", "LANG", "LC_ALL", "TMPDIR", "TZ", "USER"].iter().map(|s| s.to_string()).collect()
}

impl ShellConfig {
    /// Load from environment variables, falling back to spec defaults for
    /// anything unset.
    pub fn from_env() -> Self {
        let mut cfg = ShellConfig::default();
        if let Ok(v) = env::var("DEVICE_LIBEXEC") {
            if !v.is_empty() {
                cfg.libexec_root = v;
            }
        }
        if let Ok(v) = env::var("DEVICE_SYSCONF") {
            if !v.is_empty() {
                cfg.sysconf_root = v;
            }
        }
        if let Ok(v) = env::var("DEVICE_EDITLINE") {
            if !v.is_empty() {
                cfg.editline = Some(v);
            }
        }
        if let Ok(v) = env::var("PATHEXT") {
            cfg.pathext = v.split(';').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect();
        }
        cfg
    }

    /// Build the sanitized environment passed to discovery/dispatch
    /// children: only the configured passthrough names, taken from the
    /// current process environment when present.
    pub fn child_env(&self) -> Vec<(String, String)> {
        self.env_passthrough
            .iter()
            .filter_map(|name| env::var(name).ok().map(|v| (name.clone(), v)))
            .collect()
    }
}

/// Config for the standalone setter binary: a narrower view over the same
/// sysconf root plus the registered value-type pairs it validates against.
#[derive(Debug, Clone)]
pub struct SetterConfig {
    pub sysconf_root: String,
}

impl Default for SetterConfig {
    fn default() -> Self {
        SetterConfig { sysconf_root: "/etc/device".to_string() }
    }
}

impl SetterConfig {
    pub fn from_env() -> Self {
        let mut cfg = SetterConfig::default();
        if let Ok(v) = env::var("DEVICE_SYSCONF") {
            if !v.is_empty() {
                cfg.sysconf_root = v;
            }
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passthrough_matches_spec_list() {
        let cfg = ShellConfig::default();
        assert_eq!(cfg.env_passthrough, vec!["TERM", "LANG", "LC_ALL", "TMPDIR", "TZ", "USER"]);
    }

    #[test]
    fn discovery_line_cap_defaults_to_1000() {
        assert_eq!(ShellConfig::default().discovery_line_cap, 1000);
    }
}
