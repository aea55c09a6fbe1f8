// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Layered YAML configuration.
//!
//! A base file is loaded first, then the `environments/<env>.yaml` file next
//! to it (if any) is deep-merged on top:
//!
//! ```yaml
//! # config.yaml
//! app:
//!   environment: qa
//!   base:
//!     url: https://portal.example.com
//! test:
//!   parallel:
//!     count: 4
//!   retry:
//!     count: 2
//! ```
//!
//! Values are addressed by dotted keys, like `app.base.url`.

use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use derive_more::with_trait::{Display, Error};
use serde_yaml::{Mapping, Value};

/// Environment used when neither given explicitly nor configured.
pub const DEFAULT_ENVIRONMENT: &str = "qa";

/// Result of loading a [`Config`].
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error of loading a [`Config`].
#[derive(Debug, Display, Error)]
pub enum ConfigError {
    /// File cannot be read.
    #[display("failed to read `{}`: {source}", path.display())]
    Io {
        /// Path of the file.
        path: PathBuf,

        /// Underlying error.
        source: io::Error,
    },

    /// File isn't a valid YAML.
    #[display("invalid YAML{}: {source}", path.as_ref().map(|p| format!(" in `{}`", p.display())).unwrap_or_default())]
    Yaml {
        /// Path of the file, if read from one.
        path: Option<PathBuf>,

        /// Underlying error.
        source: serde_yaml::Error,
    },
}

/// Configuration tree addressed by dotted keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    root: Value,
}

impl Config {
    /// Loads the configuration file at `path` and merges the environment
    /// overlay `environments/<env>.yaml` next to it.
    ///
    /// The environment is the given `env`, or the `app.environment` value
    /// of the base file, or [`DEFAULT_ENVIRONMENT`]. A missing overlay file
    /// is not an error.
    ///
    /// # Errors
    ///
    /// If any of the files cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>, env: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::read(path)?;

        let env = env
            .map(ToOwned::to_owned)
            .or_else(|| config.get_str("app.environment"))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_owned());
        let overlay = path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("environments")
            .join(format!("{env}.yaml"));
        if overlay.is_file() {
            let Self { root } = Self::read(&overlay)?;
            merge(&mut config.root, root);
            tracing::debug!(path = %overlay.display(), %env, "merged environment config");
        } else {
            tracing::debug!(path = %overlay.display(), %env, "no environment config");
        }
        config.set("app.environment", env);

        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let input = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        parse(&input).map_err(|source| ConfigError::Yaml {
            path: Some(path.to_owned()),
            source,
        })
    }

    /// Returns the value under the dotted `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.root, |v, k| v.get(k))
            .filter(|v| !v.is_null())
    }

    /// Returns the scalar value under the `key` as text.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar)
    }

    /// Returns the value under the `key` as an integer, parsing strings.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value under the `key` as a boolean.
    ///
    /// Strings `true`, `yes`, `1` and `on` (in any case) are `true`, any
    /// other string is `false`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => Some(matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "yes" | "1" | "on",
            )),
            _ => None,
        }
    }

    /// Returns the value under the `key` as a list: a YAML sequence of
    /// scalars or a comma-separated string.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar).collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Returns the value under the `key` as a [`Duration`]: an integer number
    /// of seconds or a [`humantime`] string like `1m 30s`.
    #[must_use]
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64().map(Duration::from_secs),
            Value::String(s) => humantime::parse_duration(s).ok(),
            _ => None,
        }
    }

    /// Sets the `value` under the dotted `key`, creating intermediate
    /// mappings and replacing non-mapping values on the way.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let mut node = &mut self.root;
        for k in key.split('.') {
            if !node.is_mapping() {
                *node = Value::Mapping(Mapping::new());
            }
            let Value::Mapping(map) = node else { return };
            node = map.entry(Value::from(k)).or_insert(Value::Null);
        }
        *node = value.into();
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self> {
        parse(input).map_err(|source| ConfigError::Yaml { path: None, source })
    }
}

fn parse(input: &str) -> std::result::Result<Config, serde_yaml::Error> {
    let root = serde_yaml::from_str::<Value>(input)?;
    Ok(Config {
        root: if root.is_null() { Value::Mapping(Mapping::new()) } else { root },
    })
}

fn scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Deep-merges `overlay` into `base`: mappings are merged key by key, any
/// other value replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (k, v) in overlay {
                match base.get_mut(&k) {
                    Some(existing) => merge(existing, v),
                    None => {
                        _ = base.insert(k, v);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Runner options read from a [`Config`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunnerSettings {
    /// `test.parallel.count`.
    pub concurrency: Option<usize>,

    /// `test.retry.count`.
    pub retries: Option<usize>,

    /// `test.step.timeout`.
    pub step_timeout: Option<Duration>,

    /// `test.fail.fast`.
    pub fail_fast: bool,
}

impl From<&Config> for RunnerSettings {
    fn from(config: &Config) -> Self {
        let count = |key| config.get_int(key).and_then(|n| usize::try_from(n).ok());
        Self {
            concurrency: count("test.parallel.count"),
            retries: count("test.retry.count"),
            step_timeout: config.get_duration("test.step.timeout"),
            fail_fast: config.get_bool("test.fail.fast").unwrap_or_default(),
        }
    }
}

/// Application under test settings read from a [`Config`], consumed by the
/// step libraries.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AppSettings {
    /// `app.environment`.
    pub environment: String,

    /// `app.base.url` of the web application.
    pub base_url: String,

    /// `api.base.url` of the HTTP API.
    pub api_base_url: String,

    /// `app.default.username` used by the "I am logged in" steps.
    pub username: Option<String>,

    /// `app.default.password` used by the "I am logged in" steps.
    pub password: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_owned(),
            base_url: "https://www.saucedemo.com".to_owned(),
            api_base_url: "https://reqres.in/api".to_owned(),
            username: None,
            password: None,
        }
    }
}

impl From<&Config> for AppSettings {
    fn from(config: &Config) -> Self {
        let default = Self::default();
        Self {
            environment: config.get_str("app.environment").unwrap_or(default.environment),
            base_url: config.get_str("app.base.url").unwrap_or(default.base_url),
            api_base_url: config.get_str("api.base.url").unwrap_or(default.api_base_url),
            username: config.get_str("app.default.username"),
            password: config.get_str("app.default.password"),
        }
    }
}
