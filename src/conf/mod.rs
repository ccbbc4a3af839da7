//! Provides configuration options.
//!
//! Configuration options can be parsed from config files in TOML format and
//! overridden with `CALLS_RTC_`-prefixed environment variables.

#[cfg(test)]
macro_rules! try_overrided_by_env_conf {
    ($($env:expr => $value:expr),+ $(,)?) => {{
        $(::std::env::set_var($env, $value);)+
        let conf = crate::conf::Conf::parse();
        $(::std::env::remove_var($env);)+
        conf
    }};
}

#[cfg(test)]
macro_rules! overrided_by_env_conf {
    ($($env:expr => $value:expr),+ $(,)?) => {
        try_overrided_by_env_conf!($($env => $value),+).unwrap()
    };
}

pub mod ice;
pub mod peer;

use std::{collections::HashMap, env};

use config::{Config, ConfigError, Environment, File, Source, Value};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::platform::RtcConfiguration;

#[doc(inline)]
pub use self::{ice::Ice, peer::Peer};

/// CLI argument that is responsible for holding application configuration
/// file path.
static APP_CONF_PATH_CMD_ARG_NAME: &str = "--conf";

/// Environment variable that is responsible for holding application
/// configuration file path.
static APP_CONF_PATH_ENV_VAR_NAME: &str = "CALLS_RTC_CONF";

/// Holds all configuration settings.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Conf {
    /// [ICE] servers settings.
    ///
    /// [ICE]: https://webrtcglossary.com/ice
    pub ice: Ice,

    /// [`PeerConnection`] settings.
    ///
    /// [`PeerConnection`]: crate::peer::PeerConnection
    pub peer: Peer,
}

impl Source for Conf {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<HashMap<String, Value>, ConfigError> {
        Config::try_from(self)?.collect()
    }
}

impl Conf {
    /// Creates new [`Conf`] and applies values from such sources and in that
    /// order:
    /// - default values;
    /// - configuration file, the name of which is given as a command line
    ///   parameter or environment variable;
    /// - environment variables.
    ///
    /// # Errors
    ///
    /// Errors if parsing fails.
    pub fn parse() -> Result<Self, ConfigError> {
        let mut cfg = Config::new();

        cfg.merge(Self::default())?;

        if let Some(path) = get_conf_file_name(
            env::var(APP_CONF_PATH_ENV_VAR_NAME),
            env::args(),
        ) {
            cfg.merge(File::with_name(&path))?;
        }

        cfg.merge(Environment::with_prefix("CALLS_RTC").separator("__"))?;

        cfg.try_into()
    }
}

impl From<&Conf> for RtcConfiguration {
    fn from(conf: &Conf) -> Self {
        Self {
            ice_servers: conf.ice.ice_servers(),
            data_channel_label: conf.peer.data_channel_label.clone(),
        }
    }
}

/// Returns the path to a configuration file, if it's set via CLI `args` or
/// environment variable `env_var`.
///
/// The environment variable takes precedence over the CLI argument.
fn get_conf_file_name<T>(
    env_var: Result<String, env::VarError>,
    mut args: T,
) -> Option<String>
where
    T: Iterator<Item = String>,
{
    if let Ok(path) = env_var {
        if !path.is_empty() {
            return Some(path);
        }
    }
    args.by_ref()
        .find(|arg| arg == APP_CONF_PATH_CMD_ARG_NAME)
        .and_then(|_| args.next())
}
