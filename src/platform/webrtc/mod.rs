//! Native transport backed by [webrtc-rs].
//!
//! [webrtc-rs] invokes its callbacks on the [`tokio`] worker threads, so every
//! transport event is forwarded through a channel into a task running on the
//! thread owning the [`RtcPeerConnection`], and only there reaches the
//! registered handlers.
//!
//! [webrtc-rs]: https://github.com/webrtc-rs/webrtc

mod media_track;
mod peer_connection;
mod rtc_stats;

pub use self::{media_track::MediaStreamTrack, peer_connection::RtcPeerConnection};
