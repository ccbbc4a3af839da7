//! Platform-specific functionality.
//!
//! [`RtcPeerConnection`] is the seam between the negotiation logic and the
//! actual media transport. Implementations:
//! - [`webrtc`] (`webrtc` feature) drives a native [webrtc-rs] connection;
//! - [`mock`] (`mockable` feature) is an in-memory transport recording every
//!   call, used by tests and hosts without a media stack.
//!
//! [webrtc-rs]: https://github.com/webrtc-rs/webrtc

mod error;
mod media;
mod peer_connection;

#[cfg(feature = "mockable")]
pub mod mock;
#[cfg(feature = "webrtc")]
pub mod webrtc;

use std::future::Future;

#[doc(inline)]
pub use self::{
    error::Error,
    media::{MediaStream, MediaStreamTrack, TrackEvent},
    peer_connection::{
        IceConnectionState, IceServer, PeerConnectionState, RtcConfiguration,
        RtcPeerConnection, RtcPeerConnectionError, RtcPeerConnectionResult,
        RtcStats, SignalingState,
    },
};

/// Runs a `!Send` [`Future`] on the current thread.
///
/// # Panics
///
/// If called outside of a [`tokio::task::LocalSet`] context.
#[inline]
pub fn spawn<F>(task: F)
where
    F: Future<Output = ()> + 'static,
{
    drop(tokio::task::spawn_local(task));
}
