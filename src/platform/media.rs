//! Media tracks and streams exchanged with a transport.

use std::{fmt, rc::Rc};

/// Media track which can be attached to a transport or received from it.
///
/// Cloning a [`MediaStreamTrack`] yields another handle to the same
/// underlying track.
pub trait MediaStreamTrack: Clone + fmt::Debug + 'static {
    /// Returns [`id`] of this track.
    ///
    /// [`id`]: https://w3.org/TR/mediacapture-streams/#dom-mediastreamtrack-id
    fn id(&self) -> String;
}

struct InnerMediaStream<T> {
    id: String,
    tracks: Vec<T>,
}

/// Grouping of [`MediaStreamTrack`]s, the [MediaStream][1] analogue.
///
/// Clones share identity, see [`MediaStream::ptr_eq()`].
///
/// [1]: https://w3.org/TR/mediacapture-streams/#mediastream
pub struct MediaStream<T>(Rc<InnerMediaStream<T>>);

impl<T: MediaStreamTrack> MediaStream<T> {
    /// Creates a new [`MediaStream`] with the provided `id` and `tracks`.
    #[must_use]
    pub fn new<I: Into<String>>(id: I, tracks: Vec<T>) -> Self {
        Self(Rc::new(InnerMediaStream {
            id: id.into(),
            tracks,
        }))
    }

    /// Wraps a single `track` into a new [`MediaStream`].
    ///
    /// The stream takes the identifier of its only track.
    #[must_use]
    pub fn from_track(track: T) -> Self {
        Self::new(track.id(), vec![track])
    }

    /// Returns [`id`] of this [`MediaStream`].
    ///
    /// [`id`]: https://w3.org/TR/mediacapture-streams/#dom-mediastream-id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Returns all the [`MediaStreamTrack`]s of this [`MediaStream`].
    #[inline]
    #[must_use]
    pub fn tracks(&self) -> &[T] {
        &self.0.tracks
    }

    /// Indicates whether both [`MediaStream`]s are handles to the same
    /// stream instance.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for MediaStream<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> fmt::Debug for MediaStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.0.id)
            .field("tracks", &self.0.tracks.len())
            .finish()
    }
}

/// [RTCTrackEvent][1] representation.
///
/// [1]: https://w3.org/TR/webrtc/#rtctrackevent
#[derive(Clone, Debug)]
pub struct TrackEvent<T> {
    /// Received track.
    pub track: T,

    /// [`MediaStream`]s the remote side associated the `track` with. May be
    /// empty.
    pub streams: Vec<MediaStream<T>>,
}
