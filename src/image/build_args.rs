//! Build-time variables
//!
//! A build arg is usable during substitution once it is declared with `ARG`,
//! or when it is one of the predefined proxy variables. User supplied values
//! take precedence over declared defaults, and the image environment takes
//! precedence over both.

use crate::image::config::lookup_env;
use std::collections::BTreeMap;

/// Variables that may be supplied without a matching `ARG`
pub const PREDEFINED_ARGS: &[&str] = &[
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "FTP_PROXY",
    "ftp_proxy",
    "NO_PROXY",
    "no_proxy",
    "ALL_PROXY",
    "all_proxy",
];

/// Overlay of build-time variables for one build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    /// Values supplied by the user, `None` when given without `=`
    user: BTreeMap<String, Option<String>>,
    /// Declared `ARG`s and their defaults
    declared: BTreeMap<String, Option<String>>,
}

impl BuildArgs {
    /// Create an empty overlay
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse user arguments of the form `KEY=VALUE` or `KEY`
    pub fn from_user_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut build_args = Self::new();
        for arg in args {
            match arg.as_ref().split_once('=') {
                Some((key, value)) => build_args.add_user_arg(key, Some(value)),
                None => build_args.add_user_arg(arg.as_ref(), None),
            }
        }
        build_args
    }

    /// Record a user supplied value
    pub fn add_user_arg(&mut self, key: impl Into<String>, value: Option<&str>) {
        self.user.insert(key.into(), value.map(str::to_string));
    }

    /// Declare an `ARG`, optionally with a default
    pub fn add_arg(&mut self, key: impl Into<String>, default: Option<&str>) {
        self.declared.insert(key.into(), default.map(str::to_string));
    }

    /// Resolved value of an allowed arg
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(default) = self.declared.get(key) {
            return self.user_value(key).or(default.as_deref());
        }
        if PREDEFINED_ARGS.contains(&key) {
            return self.user_value(key);
        }
        None
    }

    /// Every allowed arg with a value, sorted by key
    pub fn all_allowed(&self) -> BTreeMap<&str, &str> {
        let mut allowed = BTreeMap::new();
        for key in self.declared.keys() {
            if let Some(value) = self.get(key) {
                allowed.insert(key.as_str(), value);
            }
        }
        for key in PREDEFINED_ARGS {
            if let Some(value) = self.get(key) {
                allowed.insert(*key, value);
            }
        }
        allowed
    }

    /// Allowed args as `KEY=VALUE`, skipping keys already set in `env`
    pub fn filter_allowed(&self, env: &[String]) -> Vec<String> {
        self.all_allowed()
            .into_iter()
            .filter(|(key, _)| lookup_env(env, key).is_none())
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }

    /// Environment used for variable substitution.
    ///
    /// `base_env` is copied unchanged and the allowed build args it does not
    /// already define are appended, so image environment wins.
    pub fn replacement_envs(&self, base_env: &[String]) -> Vec<String> {
        let mut env = base_env.to_vec();
        env.extend(self.filter_allowed(base_env));
        env
    }

    fn user_value(&self, key: &str) -> Option<&str> {
        self.user.get(key).and_then(|value| value.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undeclared_user_arg_not_allowed() {
        let args = BuildArgs::from_user_args(["FOO=bar"]);
        assert_eq!(args.get("FOO"), None);
        assert!(args.replacement_envs(&[]).is_empty());
    }

    #[test]
    fn user_value_overrides_default() {
        let mut args = BuildArgs::from_user_args(["VERSION=2"]);
        args.add_arg("VERSION", Some("1"));
        args.add_arg("CHANNEL", Some("stable"));
        assert_eq!(args.get("VERSION"), Some("2"));
        assert_eq!(args.get("CHANNEL"), Some("stable"));
    }

    #[test]
    fn bare_user_arg_falls_back_to_default() {
        let mut args = BuildArgs::from_user_args(["VERSION"]);
        args.add_arg("VERSION", Some("1"));
        assert_eq!(args.get("VERSION"), Some("1"));
    }

    #[test]
    fn declared_without_value_is_skipped() {
        let mut args = BuildArgs::new();
        args.add_arg("UNSET", None);
        assert_eq!(args.get("UNSET"), None);
        assert!(args.all_allowed().is_empty());
    }

    #[test]
    fn predefined_proxy_args_allowed() {
        let args = BuildArgs::from_user_args(["HTTP_PROXY=http://proxy:3128"]);
        assert_eq!(args.get("HTTP_PROXY"), Some("http://proxy:3128"));
    }

    #[test]
    fn replacement_envs_image_env_wins() {
        let mut args = BuildArgs::from_user_args(["HOME=/build", "DIR=/src"]);
        args.add_arg("HOME", None);
        args.add_arg("DIR", None);
        let base = vec!["HOME=/root".to_string()];

        let env = args.replacement_envs(&base);

        assert_eq!(env, vec!["HOME=/root".to_string(), "DIR=/src".to_string()]);
        assert_eq!(base, vec!["HOME=/root".to_string()]);
    }

    #[test]
    fn replacement_envs_sorted_by_key() {
        let mut args = BuildArgs::from_user_args(["B=2", "A=1"]);
        args.add_arg("B", None);
        args.add_arg("A", None);
        assert_eq!(
            args.replacement_envs(&[]),
            vec!["A=1".to_string(), "B=2".to_string()]
        );
    }
}
