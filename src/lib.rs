//! Call participant's side of a peer-to-peer media connection.
//!
//! [`peer::PeerConnection`] negotiates a single connection with the remote
//! media endpoint following the [perfect negotiation] pattern, as the polite
//! peer. [`peer::normalize()`] reshapes raw transport statistics into a table
//! keyed by [SSRC].
//!
//! The media transport itself is abstracted by
//! [`platform::RtcPeerConnection`], see the [`platform`] module for available
//! implementations.
//!
//! [perfect negotiation]: https://w3.org/TR/webrtc/#perfect-negotiation-example
//! [SSRC]: https://webrtcglossary.com/ssrc

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod conf;
pub mod log;
pub mod peer;
pub mod platform;
pub mod utils;

#[doc(inline)]
pub use calls_rtc_proto as proto;

#[doc(inline)]
pub use self::{
    conf::Conf,
    peer::{PeerConnection, PeerError, PeerEvent},
};
