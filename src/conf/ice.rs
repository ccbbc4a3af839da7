//! [ICE] servers settings.
//!
//! [ICE]: https://webrtcglossary.com/ice

use std::collections::BTreeMap;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use smart_default::SmartDefault;

use crate::platform::IceServer;

/// [ICE] servers settings.
///
/// [ICE]: https://webrtcglossary.com/ice
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Ice {
    /// Static [STUN]/[TURN] servers to be used by every connection, keyed by
    /// an arbitrary name.
    ///
    /// Defaults to none.
    ///
    /// [STUN]: https://webrtcglossary.com/stun
    /// [TURN]: https://webrtcglossary.com/turn
    pub servers: BTreeMap<String, Server>,
}

impl Ice {
    /// Returns all the configured [`IceServer`]s ordered by their names.
    #[must_use]
    pub fn ice_servers(&self) -> Vec<IceServer> {
        self.servers.values().map(IceServer::from).collect()
    }
}

/// [STUN]/[TURN] server settings.
///
/// [STUN]: https://webrtcglossary.com/stun
/// [TURN]: https://webrtcglossary.com/turn
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Server {
    /// URLs of this [TURN]/[STUN] server.
    ///
    /// [STUN]: https://webrtcglossary.com/stun
    /// [TURN]: https://webrtcglossary.com/turn
    #[serde(deserialize_with = "Server::parse_urls")]
    pub urls: Vec<String>,

    /// Username to use during the authentication process.
    pub user: Option<String>,

    /// The credential to use when logging into the server.
    pub pass: Option<String>,
}

impl Server {
    /// Parses [`Server::urls`] from the provided [`Deserializer`] either as a
    /// list or as a CSV (comma-separated values) string.
    ///
    /// # Errors
    ///
    /// - If the value is neither a string nor a list of strings.
    /// - If parsed [`Server::urls`] is empty or contains empty values.
    fn parse_urls<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde_json as json;

        let split = |urls: &str| {
            urls.split(',').map(|u| u.trim().to_owned()).collect::<Vec<_>>()
        };

        let out = match json::Value::deserialize(d)? {
            json::Value::String(urls) => split(&urls),
            json::Value::Array(list) => {
                let mut out = Vec::new();
                for val in list {
                    match val {
                        json::Value::String(urls) => out.extend(split(&urls)),
                        _ => return Err(D::Error::custom("Unexpected value")),
                    }
                }
                out
            }
            _ => return Err(D::Error::custom("Unexpected value")),
        };

        if out.is_empty() || out.iter().any(String::is_empty) {
            return Err(D::Error::custom("Empty values are not allowed"));
        }

        Ok(out)
    }
}

impl From<&Server> for IceServer {
    fn from(server: &Server) -> Self {
        Self {
            urls: server.urls.clone(),
            username: server.user.clone(),
            credential: server.pass.clone(),
        }
    }
}
