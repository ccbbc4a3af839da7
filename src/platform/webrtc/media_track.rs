//! Wrapper around [webrtc-rs] tracks.
//!
//! [webrtc-rs]: https://github.com/webrtc-rs/webrtc

use std::{fmt, sync::Arc};

use webrtc::track::{track_local::TrackLocal, track_remote::TrackRemote};

use crate::platform;

/// Track sent or received by a native [`RtcPeerConnection`].
///
/// [`RtcPeerConnection`]: super::RtcPeerConnection
#[derive(Clone)]
pub enum MediaStreamTrack {
    /// Track produced locally and sent to the remote side.
    Local(Arc<dyn TrackLocal + Send + Sync>),

    /// Track received from the remote side.
    Remote(Arc<TrackRemote>),
}

impl MediaStreamTrack {
    /// Returns the underlying local track, if this is one.
    #[inline]
    #[must_use]
    pub fn as_local(&self) -> Option<&Arc<dyn TrackLocal + Send + Sync>> {
        match self {
            Self::Local(track) => Some(track),
            Self::Remote(_) => None,
        }
    }
}

impl platform::MediaStreamTrack for MediaStreamTrack {
    fn id(&self) -> String {
        match self {
            Self::Local(track) => track.id().to_owned(),
            Self::Remote(track) => track.id(),
        }
    }
}

impl From<Arc<dyn TrackLocal + Send + Sync>> for MediaStreamTrack {
    #[inline]
    fn from(track: Arc<dyn TrackLocal + Send + Sync>) -> Self {
        Self::Local(track)
    }
}

impl fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, id) = match self {
            Self::Local(t) => ("Local", t.id().to_owned()),
            Self::Remote(t) => ("Remote", t.id()),
        };
        f.debug_tuple(kind).field(&id).finish()
    }
}
