//! [`PeerConnection`] settings.
//!
//! [`PeerConnection`]: crate::peer::PeerConnection

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// [`PeerConnection`] settings.
///
/// [`PeerConnection`]: crate::peer::PeerConnection
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Peer {
    /// Label of the data channel opened right after a connection is created,
    /// so the initial negotiation starts before any media is attached.
    ///
    /// Defaults to `calls`.
    #[default = "calls"]
    pub data_channel_label: String,
}
