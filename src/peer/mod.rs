//! Negotiation state machine of a single call participant's connection.
//!
//! [`PeerConnection`] follows the [perfect negotiation] pattern, always
//! playing the polite side: an incoming offer is never rejected, even if it
//! collides with an offer of its own.
//!
//! [perfect negotiation]: https://w3.org/TR/webrtc/#perfect-negotiation-example

pub mod stats;

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use calls_rtc_proto::{IceCandidate, SessionDescription, Signal};
use derive_more::Display;
use futures::stream::LocalBoxStream;
use tracerr::Traced;

use crate::{
    platform::{
        self, IceConnectionState, MediaStream, MediaStreamTrack as _,
        PeerConnectionState, RtcConfiguration, RtcPeerConnection,
        RtcPeerConnectionError, RtcStats, SignalingState, TrackEvent,
    },
    utils::Listeners,
};

#[doc(inline)]
pub use self::stats::{normalize, StatsTable};

/// Errors that may occur in a [`PeerConnection`].
#[derive(Clone, Debug, Display)]
pub enum PeerError {
    /// [`PeerConnection`] has been destroyed already and cannot be used.
    #[display(fmt = "PeerConnection is destroyed")]
    Destroyed,

    /// [`PeerConnection::destroy()`] has been called more than once.
    #[display(fmt = "PeerConnection is already destroyed")]
    AlreadyDestroyed,

    /// Inbound signaling message is malformed or has an unknown `type`.
    #[display(fmt = "Invalid signaling data: {}", _0)]
    InvalidSignalingData(Rc<serde_json::Error>),

    /// No sender is registered for the track with the provided ID.
    #[display(fmt = "Sender for track `{}` not found", _0)]
    SenderNotFound(String),

    /// Underlying transport has failed.
    #[display(fmt = "connection failed")]
    ConnectionFailed,

    /// Operation of the underlying transport has failed.
    #[display(fmt = "{}", _0)]
    Transport(RtcPeerConnectionError),
}

impl From<RtcPeerConnectionError> for PeerError {
    #[inline]
    fn from(err: RtcPeerConnectionError) -> Self {
        Self::Transport(err)
    }
}

type Result<T> = std::result::Result<T, Traced<PeerError>>;

/// Events emitted by a [`PeerConnection`].
#[derive(Clone, Debug)]
pub enum PeerEvent<T> {
    /// Local offer to be relayed to the remote side.
    Offer(SessionDescription),

    /// Local answer to be relayed to the remote side.
    Answer(SessionDescription),

    /// Local [ICE] candidate to be relayed to the remote side.
    ///
    /// [ICE]: https://webrtcglossary.com/ice
    Candidate(IceCandidate),

    /// [ICE] connectivity is established, media may flow.
    ///
    /// [ICE]: https://webrtcglossary.com/ice
    Connect,

    /// Connection is over. Carries [`PeerError::ConnectionFailed`] unless it
    /// has been closed cleanly.
    Close(Option<PeerError>),

    /// Remote side started sending media.
    Stream(MediaStream<T>),

    /// Local negotiation attempt has failed.
    Error(PeerError),
}

impl<T> PeerEvent<T> {
    /// Converts this [`PeerEvent`] into a [`Signal`] to be relayed to the
    /// remote side, if it is one.
    #[must_use]
    pub fn into_signal(self) -> Option<Signal> {
        match self {
            Self::Offer(desc) | Self::Answer(desc) => Some(desc.into()),
            Self::Candidate(candidate) => Some(candidate.into()),
            Self::Connect
            | Self::Close(_)
            | Self::Stream(_)
            | Self::Error(_) => None,
        }
    }
}

struct InnerPeerConnection<P: RtcPeerConnection> {
    /// Underlying transport. [`None`] once destroyed.
    peer: RefCell<Option<Rc<P>>>,

    /// Senders of the attached local tracks, keyed by track ID.
    senders: RefCell<HashMap<String, P::Sender>>,

    /// Indicator whether a local offer is being made at the moment.
    making_offer: Cell<bool>,

    /// Remote candidates received before any remote description.
    candidates: RefCell<VecDeque<IceCandidate>>,

    /// Indicator whether the transport has ever reached the `connected`
    /// state.
    connected: Cell<bool>,

    listeners: Listeners<PeerEvent<P::Track>>,
}

impl<P: RtcPeerConnection> InnerPeerConnection<P> {
    /// Returns the underlying transport unless destroyed.
    fn transport(&self) -> Result<Rc<P>> {
        self.peer
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or_else(|| tracerr::new!(PeerError::Destroyed))
    }

    /// Makes and applies a local offer, emitting [`PeerEvent::Offer`].
    async fn negotiate(self: Rc<Self>) {
        let peer = match self.transport() {
            Ok(peer) => peer,
            Err(_) => return,
        };

        self.making_offer.set(true);
        let offer = async {
            let offer = peer.create_offer().await?;
            peer.set_local_description(offer.clone()).await?;
            Ok::<_, Traced<RtcPeerConnectionError>>(offer)
        }
        .await
        .map_err(tracerr::map_from_and_wrap!(=> PeerError));
        self.making_offer.set(false);

        match offer {
            Ok(offer) => self.listeners.emit(PeerEvent::Offer(offer)),
            Err(e) => {
                log::error!("Failed to negotiate: {}\n{}", e, e.trace());
                self.listeners.emit(PeerEvent::Error(e.as_ref().clone()));
            }
        }
    }

    fn on_ice_connection_state_change(&self, state: IceConnectionState) {
        log::debug!("ICE connection state: {}", state);
        match state {
            IceConnectionState::Connected => {
                self.listeners.emit(PeerEvent::Connect);
            }
            IceConnectionState::Failed => {
                self.listeners
                    .emit(PeerEvent::Close(Some(PeerError::ConnectionFailed)));
            }
            IceConnectionState::Closed => {
                self.listeners.emit(PeerEvent::Close(None));
            }
            _ => {}
        }
    }

    fn on_connection_state_change(&self, state: PeerConnectionState) {
        log::debug!("Connection state: {}", state);
        match state {
            PeerConnectionState::Connected => self.connected.set(true),
            PeerConnectionState::Failed => {
                self.listeners
                    .emit(PeerEvent::Close(Some(PeerError::ConnectionFailed)));
            }
            _ => {}
        }
    }

    fn on_track(&self, event: TrackEvent<P::Track>) {
        let TrackEvent { track, streams } = event;
        let stream = streams
            .into_iter()
            .next()
            .unwrap_or_else(|| MediaStream::from_track(track));
        self.listeners.emit(PeerEvent::Stream(stream));
    }

    /// Applies the provided remote candidate, logging a failure.
    async fn apply_candidate(peer: &P, candidate: IceCandidate) {
        if let Err(e) = peer.add_ice_candidate(candidate).await {
            log::warn!("Failed to apply remote ICE candidate: {}", e);
        }
    }
}

/// Detaches every transport event handler.
fn unbind<P: RtcPeerConnection>(peer: &P) {
    peer.on_negotiation_needed(None);
    peer.on_ice_candidate(None);
    peer.on_ice_connection_state_change(None);
    peer.on_connection_state_change(None);
    peer.on_track(None);
}

impl<P: RtcPeerConnection> Drop for InnerPeerConnection<P> {
    fn drop(&mut self) {
        if let Some(peer) = self.peer.get_mut().take() {
            unbind(peer.as_ref());
            peer.close();
        }
    }
}

/// Connection of a single call participant with the remote media endpoint.
///
/// Inbound signaling is fed with [`PeerConnection::signal()`], outbound
/// signaling and lifecycle notifications are delivered as [`PeerEvent`]s to
/// every [`PeerConnection::subscribe()`]r.
pub struct PeerConnection<P: RtcPeerConnection>(Rc<InnerPeerConnection<P>>);

impl<P: RtcPeerConnection> PeerConnection<P> {
    /// Opens a new transport connection with the provided `config` and starts
    /// the negotiation over it.
    ///
    /// # Errors
    ///
    /// With [`PeerError::Transport`] if the transport cannot be created or
    /// its data channel cannot be opened.
    pub async fn new(config: &RtcConfiguration) -> Result<Self> {
        let peer = P::new(config)
            .await
            .map_err(tracerr::map_from_and_wrap!())?;
        Self::with_transport(peer, &config.data_channel_label).await
    }

    /// Builds a [`PeerConnection`] on top of an already created transport,
    /// opening a data channel with the provided `label` on it.
    ///
    /// # Errors
    ///
    /// With [`PeerError::Transport`] if the data channel cannot be opened.
    pub async fn with_transport(peer: P, label: &str) -> Result<Self> {
        let peer = Rc::new(peer);
        let inner = Rc::new(InnerPeerConnection {
            peer: RefCell::new(Some(Rc::clone(&peer))),
            senders: RefCell::new(HashMap::new()),
            making_offer: Cell::new(false),
            candidates: RefCell::new(VecDeque::new()),
            connected: Cell::new(false),
            listeners: Listeners::default(),
        });

        let weak = Rc::downgrade(&inner);
        peer.on_negotiation_needed(Some(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                platform::spawn(inner.negotiate());
            }
        })));

        let weak = Rc::downgrade(&inner);
        peer.on_ice_candidate(Some(Box::new(move |candidate| {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.emit(PeerEvent::Candidate(candidate));
            }
        })));

        let weak = Rc::downgrade(&inner);
        peer.on_ice_connection_state_change(Some(Box::new(move |state| {
            if let Some(inner) = weak.upgrade() {
                inner.on_ice_connection_state_change(state);
            }
        })));

        let weak = Rc::downgrade(&inner);
        peer.on_connection_state_change(Some(Box::new(move |state| {
            if let Some(inner) = weak.upgrade() {
                inner.on_connection_state_change(state);
            }
        })));

        let weak = Rc::downgrade(&inner);
        peer.on_track(Some(Box::new(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_track(event);
            }
        })));

        peer.create_data_channel(label)
            .await
            .map_err(tracerr::map_from_and_wrap!())?;

        Ok(Self(inner))
    }

    /// Registers a new listener of [`PeerEvent`]s.
    ///
    /// Dropping the returned stream unregisters the listener. Streams end
    /// once this [`PeerConnection`] is destroyed, and a stream obtained after
    /// that is already ended.
    pub fn subscribe(&self) -> LocalBoxStream<'static, PeerEvent<P::Track>> {
        let stream = self.0.listeners.subscribe();
        if self.0.peer.borrow().is_none() {
            self.0.listeners.clear();
        }
        stream
    }

    /// Handles an inbound signaling message.
    ///
    /// Remote candidates arriving before any remote description are queued
    /// until an answer is received. An offer is always accepted, rolling back
    /// a pending local one.
    ///
    /// # Errors
    ///
    /// - [`PeerError::Destroyed`] if this [`PeerConnection`] is destroyed.
    /// - [`PeerError::InvalidSignalingData`] if `data` is not a valid
    ///   [`Signal`].
    /// - [`PeerError::Transport`] if a remote description cannot be applied
    ///   or an answer cannot be made.
    pub async fn signal(&self, data: &str) -> Result<()> {
        let peer = self.0.transport()?;
        let signal: Signal = data
            .parse()
            .map_err(Rc::new)
            .map_err(PeerError::InvalidSignalingData)
            .map_err(tracerr::wrap!())?;

        match signal {
            Signal::Candidate { candidate } => {
                if peer.has_remote_description() {
                    InnerPeerConnection::<P>::apply_candidate(&peer, candidate)
                        .await;
                } else {
                    self.0.candidates.borrow_mut().push_back(candidate);
                }
            }
            Signal::Offer { sdp } => {
                if self.0.making_offer.get()
                    || peer.signaling_state() != SignalingState::Stable
                {
                    log::debug!(
                        "Offer collision (making offer: {}, signaling state: \
                         {}), accepting remote offer",
                        self.0.making_offer.get(),
                        peer.signaling_state(),
                    );
                }

                peer.set_remote_description(SessionDescription::offer(sdp))
                    .await
                    .map_err(tracerr::map_from_and_wrap!())?;
                let answer = peer
                    .create_answer()
                    .await
                    .map_err(tracerr::map_from_and_wrap!())?;
                peer.set_local_description(answer.clone())
                    .await
                    .map_err(tracerr::map_from_and_wrap!())?;
                self.0.listeners.emit(PeerEvent::Answer(answer));
            }
            Signal::Answer { sdp } => {
                peer.set_remote_description(SessionDescription::answer(sdp))
                    .await
                    .map_err(tracerr::map_from_and_wrap!())?;

                let queued: Vec<_> =
                    self.0.candidates.borrow_mut().drain(..).collect();
                for candidate in queued {
                    InnerPeerConnection::<P>::apply_candidate(&peer, candidate)
                        .await;
                }
            }
        }
        Ok(())
    }

    /// Attaches the provided local `track` of the provided `stream`.
    ///
    /// # Errors
    ///
    /// - [`PeerError::Destroyed`] if this [`PeerConnection`] is destroyed.
    /// - [`PeerError::Transport`] if the transport rejects the `track`.
    pub async fn add_track(
        &self,
        track: P::Track,
        stream: &MediaStream<P::Track>,
    ) -> Result<()> {
        let peer = self.0.transport()?;
        let id = track.id();
        let sender = peer
            .add_track(track, stream)
            .await
            .map_err(tracerr::map_from_and_wrap!())?;
        self.0.senders.borrow_mut().insert(id, sender);
        Ok(())
    }

    /// Attaches every track of the provided `stream`.
    ///
    /// # Errors
    ///
    /// Same as [`PeerConnection::add_track()`]. Tracks attached before the
    /// failed one stay attached.
    pub async fn add_stream(&self, stream: &MediaStream<P::Track>) -> Result<()> {
        for track in stream.tracks() {
            self.add_track(track.clone(), stream).await?;
        }
        Ok(())
    }

    /// Replaces the track sent instead of the one with the provided
    /// `old_track_id`.
    ///
    /// The sender becomes known by the ID of the `new_track`. [`None`] stops
    /// sending media while keeping the sender under its current ID.
    ///
    /// # Errors
    ///
    /// - [`PeerError::Destroyed`] if this [`PeerConnection`] is destroyed.
    /// - [`PeerError::SenderNotFound`] if no track with the provided
    ///   `old_track_id` is attached.
    /// - [`PeerError::Transport`] if the transport fails to replace the track.
    pub async fn replace_track(
        &self,
        old_track_id: &str,
        new_track: Option<P::Track>,
    ) -> Result<()> {
        let peer = self.0.transport()?;
        let sender = {
            let mut senders = self.0.senders.borrow_mut();
            let sender = senders.get(old_track_id).cloned().ok_or_else(|| {
                tracerr::new!(PeerError::SenderNotFound(
                    old_track_id.to_owned()
                ))
            })?;
            if let Some(new_id) = new_track.as_ref().map(|t| t.id()) {
                if new_id != old_track_id {
                    senders.remove(old_track_id);
                    senders.insert(new_id, sender.clone());
                }
            }
            sender
        };

        peer.replace_track(&sender, new_track)
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }

    /// Detaches the track with the provided `track_id`.
    ///
    /// # Errors
    ///
    /// - [`PeerError::Destroyed`] if this [`PeerConnection`] is destroyed.
    /// - [`PeerError::SenderNotFound`] if no such track is attached.
    /// - [`PeerError::Transport`] if the transport fails to detach the track.
    pub async fn remove_track(&self, track_id: &str) -> Result<()> {
        let peer = self.0.transport()?;
        let sender =
            self.0.senders.borrow_mut().remove(track_id).ok_or_else(|| {
                tracerr::new!(PeerError::SenderNotFound(track_id.to_owned()))
            })?;

        peer.remove_track(&sender)
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }

    /// Collects raw statistics of the underlying transport, to be passed to
    /// [`normalize()`].
    ///
    /// # Errors
    ///
    /// - [`PeerError::Destroyed`] if this [`PeerConnection`] is destroyed.
    /// - [`PeerError::Transport`] if the transport fails to collect them.
    pub async fn get_stats(&self) -> Result<RtcStats> {
        let peer = self.0.transport()?;
        peer.get_stats()
            .await
            .map_err(tracerr::map_from_and_wrap!())
    }

    /// Indicates whether the underlying transport has ever been connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.0.connected.get()
    }

    /// Returns the number of remote candidates waiting for a remote
    /// description.
    #[inline]
    #[must_use]
    pub fn buffered_candidates(&self) -> usize {
        self.0.candidates.borrow().len()
    }

    /// Destroys this [`PeerConnection`], closing the underlying transport and
    /// ending every listener's stream.
    ///
    /// Operations in flight are not aborted, though any further call fails
    /// with [`PeerError::Destroyed`].
    ///
    /// # Errors
    ///
    /// With [`PeerError::AlreadyDestroyed`] if called more than once.
    pub fn destroy(&self) -> Result<()> {
        let peer = self
            .0
            .peer
            .borrow_mut()
            .take()
            .ok_or_else(|| tracerr::new!(PeerError::AlreadyDestroyed))?;

        unbind(peer.as_ref());
        self.0.listeners.clear();
        peer.close();
        self.0.connected.set(false);
        self.0.senders.borrow_mut().clear();

        Ok(())
    }
}
