//! Signaling wire format of a single call participant's peer connection.
//!
//! Every message travelling through the external signaling relay is a JSON
//! object with a required `type` field:
//!
//! ```json
//! {"type": "candidate", "candidate": {"candidate": "candidate:1 1 udp ..."}}
//! {"type": "offer", "sdp": "v=0\r\n..."}
//! {"type": "answer", "sdp": "v=0\r\n..."}
//! ```
//!
//! For `offer` and `answer` the message envelope is the [RTCSessionDescription]
//! itself, so the envelope's `type` and the session description's `type` are
//! the same field.
//!
//! [RTCSessionDescription]: https://w3.org/TR/webrtc/#rtcsessiondescription-class

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod stats;

use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Representation of [RTCIceCandidateInit][1] object.
///
/// [1]: https://w3.org/TR/webrtc/#dom-rtcicecandidateinit
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    /// [`candidate-attribute`][1] grammar line.
    ///
    /// [1]: https://tools.ietf.org/html/rfc5245#section-15.1
    pub candidate: String,

    /// Media stream identification tag of the `m=` section this candidate
    /// belongs to.
    pub sdp_mid: Option<String>,

    /// Index of the `m=` section this candidate belongs to.
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,

    /// ICE username fragment this candidate was gathered for.
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    /// Creates a new [`IceCandidate`] out of its `candidate` line only.
    #[inline]
    #[must_use]
    pub fn new<C: Into<String>>(candidate: C) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// Representation of [RTCSdpType].
///
/// Rollbacks never travel through the signaling channel, so only `offer` and
/// `answer` are representable.
///
/// [RTCSdpType]: https://w3.org/TR/webrtc/#dom-rtcsdptype
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// [`offer` type][1] of SDP.
    ///
    /// [1]: https://w3.org/TR/webrtc/#dom-rtcsdptype-offer
    #[display(fmt = "offer")]
    Offer,

    /// [`answer` type][1] of SDP.
    ///
    /// [1]: https://w3.org/TR/webrtc/#dom-rtcsdptype-answer
    #[display(fmt = "answer")]
    Answer,
}

/// Representation of [RTCSessionDescriptionInit][1].
///
/// [1]: https://w3.org/TR/webrtc/#dom-rtcsessiondescriptioninit
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SessionDescription {
    /// Kind of this description.
    #[serde(rename = "type")]
    pub kind: SdpType,

    /// [SDP] text.
    ///
    /// [SDP]: https://tools.ietf.org/html/rfc4566
    pub sdp: String,
}

impl SessionDescription {
    /// Creates a new [`SdpType::Offer`] [`SessionDescription`].
    #[inline]
    #[must_use]
    pub fn offer<S: Into<String>>(sdp: S) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Creates a new [`SdpType::Answer`] [`SessionDescription`].
    #[inline]
    #[must_use]
    pub fn answer<S: Into<String>>(sdp: S) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Message exchanged through the signaling relay.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Signal {
    /// Remote [ICE] candidate discovered by the other side.
    ///
    /// [ICE]: https://webrtcglossary.com/ice
    Candidate {
        /// Discovered [`IceCandidate`].
        candidate: IceCandidate,
    },

    /// [SDP] offer of the other side.
    ///
    /// [SDP]: https://tools.ietf.org/html/rfc4566
    Offer {
        /// [SDP] text of the offer.
        ///
        /// [SDP]: https://tools.ietf.org/html/rfc4566
        sdp: String,
    },

    /// [SDP] answer of the other side.
    ///
    /// [SDP]: https://tools.ietf.org/html/rfc4566
    Answer {
        /// [SDP] text of the answer.
        ///
        /// [SDP]: https://tools.ietf.org/html/rfc4566
        sdp: String,
    },
}

impl Signal {
    /// Serializes this [`Signal`] into its wire representation.
    ///
    /// # Errors
    ///
    /// Never in practice, as every [`Signal`] is representable in JSON.
    #[inline]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl FromStr for Signal {
    type Err = serde_json::Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl From<SessionDescription> for Signal {
    #[inline]
    fn from(desc: SessionDescription) -> Self {
        match desc.kind {
            SdpType::Offer => Self::Offer { sdp: desc.sdp },
            SdpType::Answer => Self::Answer { sdp: desc.sdp },
        }
    }
}

impl From<IceCandidate> for Signal {
    #[inline]
    fn from(candidate: IceCandidate) -> Self {
        Self::Candidate { candidate }
    }
}
