//! In-memory transport connection.
//!
//! Performs no networking: descriptions are synthesized, candidates are only
//! recorded, and transport events are fired explicitly by the owner of the
//! connection. Cloning an [`RtcPeerConnection`] yields another handle to the
//! same connection, so it can be inspected after being handed over to a
//! [`PeerConnection`](crate::peer::PeerConnection).

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    rc::Rc,
};

use async_trait::async_trait;
use calls_rtc_proto::{IceCandidate, SdpType, SessionDescription};

use super::{
    Error, IceConnectionState, MediaStream, MediaStreamTrack,
    PeerConnectionState, RtcConfiguration, RtcPeerConnectionError as E,
    RtcPeerConnectionResult as Result, RtcStats, SignalingState, TrackEvent,
};

/// Track of the in-memory [`RtcPeerConnection`].
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MediaTrack(String);

impl MediaTrack {
    /// Creates a new [`MediaTrack`] with the provided `id`.
    #[inline]
    #[must_use]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }
}

impl MediaStreamTrack for MediaTrack {
    #[inline]
    fn id(&self) -> String {
        self.0.clone()
    }
}

/// Sender of the in-memory [`RtcPeerConnection`].
#[derive(Clone, Debug)]
pub struct Sender {
    id: usize,
    track: Rc<RefCell<Option<MediaTrack>>>,
}

impl Sender {
    /// Returns [`MediaTrack`] currently sent by this [`Sender`].
    #[inline]
    #[must_use]
    pub fn track(&self) -> Option<MediaTrack> {
        self.track.borrow().clone()
    }
}

/// Registered handler slot.
type Handler<A> = RefCell<Option<Box<dyn FnMut(A)>>>;

#[derive(Default)]
struct Handlers {
    negotiation_needed: RefCell<Option<Box<dyn FnMut()>>>,
    ice_candidate: Handler<IceCandidate>,
    ice_connection_state: Handler<IceConnectionState>,
    connection_state: Handler<PeerConnectionState>,
    track: Handler<TrackEvent<MediaTrack>>,
}

struct Inner {
    config: RtcConfiguration,
    handlers: Handlers,
    signaling_state: Cell<SignalingState>,
    local_description: RefCell<Option<SessionDescription>>,
    remote_description: RefCell<Option<SessionDescription>>,
    descriptions_made: Cell<usize>,
    rollbacks: Cell<usize>,
    data_channels: RefCell<Vec<String>>,
    applied_candidates: RefCell<Vec<IceCandidate>>,
    failing_candidates: RefCell<HashSet<String>>,
    senders: RefCell<Vec<Sender>>,
    removed_senders: RefCell<Vec<usize>>,
    offers_held: Cell<bool>,
    pending_offers: Cell<usize>,
    fail_offers: Cell<bool>,
    stats: RefCell<RtcStats>,
    closed: Cell<bool>,
}

/// In-memory transport connection.
#[derive(Clone)]
pub struct RtcPeerConnection(Rc<Inner>);

impl RtcPeerConnection {
    /// Returns [`RtcConfiguration`] this connection was created with.
    #[must_use]
    pub fn config(&self) -> RtcConfiguration {
        self.0.config.clone()
    }

    /// Returns labels of all the opened data channels.
    #[must_use]
    pub fn data_channels(&self) -> Vec<String> {
        self.0.data_channels.borrow().clone()
    }

    /// Returns all the remote [`IceCandidate`]s applied so far, in the order
    /// of application.
    #[must_use]
    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.0.applied_candidates.borrow().clone()
    }

    /// Makes application of a candidate with the provided `candidate` line
    /// fail.
    pub fn fail_candidate<S: Into<String>>(&self, candidate: S) {
        self.0.failing_candidates.borrow_mut().insert(candidate.into());
    }

    /// Makes every following offer creation fail.
    pub fn fail_offers(&self, fail: bool) {
        self.0.fail_offers.set(fail);
    }

    /// Suspends offer creation until released with `hold_offers(false)`.
    pub fn hold_offers(&self, hold: bool) {
        self.0.offers_held.set(hold);
    }

    /// Returns number of offer creations currently in progress.
    #[must_use]
    pub fn pending_offers(&self) -> usize {
        self.0.pending_offers.get()
    }

    /// Returns number of local offers rolled back by remote offers.
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.0.rollbacks.get()
    }

    /// Returns the applied local [`SessionDescription`], if any.
    #[must_use]
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.0.local_description.borrow().clone()
    }

    /// Returns the applied remote [`SessionDescription`], if any.
    #[must_use]
    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.0.remote_description.borrow().clone()
    }

    /// Returns all the [`Sender`]s still attached to this connection.
    #[must_use]
    pub fn senders(&self) -> Vec<Sender> {
        let removed = self.0.removed_senders.borrow();
        self.0
            .senders
            .borrow()
            .iter()
            .filter(|s| !removed.contains(&s.id))
            .cloned()
            .collect()
    }

    /// Sets [`RtcStats`] returned by the following stats queries.
    pub fn set_stats(&self, stats: RtcStats) {
        *self.0.stats.borrow_mut() = stats;
    }

    /// Indicates whether this connection has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.closed.get()
    }

    /// Returns number of currently registered event handlers.
    #[must_use]
    pub fn handlers_count(&self) -> usize {
        let h = &self.0.handlers;
        [
            h.negotiation_needed.borrow().is_some(),
            h.ice_candidate.borrow().is_some(),
            h.ice_connection_state.borrow().is_some(),
            h.connection_state.borrow().is_some(),
            h.track.borrow().is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Fires the `negotiationneeded` event.
    pub fn negotiation_needed(&self) {
        if let Some(f) =
            self.0.handlers.negotiation_needed.borrow_mut().as_mut()
        {
            f();
        }
    }

    /// Fires the `icecandidate` event with the provided local `candidate`.
    pub fn ice_candidate(&self, candidate: IceCandidate) {
        dispatch(&self.0.handlers.ice_candidate, candidate);
    }

    /// Fires the `iceconnectionstatechange` event.
    pub fn ice_connection_state(&self, state: IceConnectionState) {
        dispatch(&self.0.handlers.ice_connection_state, state);
    }

    /// Fires the `connectionstatechange` event.
    pub fn connection_state(&self, state: PeerConnectionState) {
        dispatch(&self.0.handlers.connection_state, state);
    }

    /// Fires the `track` event with the provided `track` and `streams`.
    pub fn track(&self, track: MediaTrack, streams: Vec<MediaStream<MediaTrack>>) {
        dispatch(&self.0.handlers.track, TrackEvent { track, streams });
    }

    fn next_sdp(&self, kind: SdpType) -> String {
        let n = self.0.descriptions_made.get() + 1;
        self.0.descriptions_made.set(n);
        format!("v=0\r\no=- {} 2 IN IP4 127.0.0.1\r\ns=mock-{}\r\n", n, kind)
    }
}

/// Invokes the handler registered in the provided slot, if any.
fn dispatch<A>(slot: &Handler<A>, arg: A) {
    if let Some(f) = slot.borrow_mut().as_mut() {
        f(arg);
    }
}

#[async_trait(?Send)]
impl super::RtcPeerConnection for RtcPeerConnection {
    type Track = MediaTrack;
    type Sender = Sender;

    async fn new(config: &RtcConfiguration) -> Result<Self> {
        Ok(Self(Rc::new(Inner {
            config: config.clone(),
            handlers: Handlers::default(),
            signaling_state: Cell::new(SignalingState::Stable),
            local_description: RefCell::new(None),
            remote_description: RefCell::new(None),
            descriptions_made: Cell::new(0),
            rollbacks: Cell::new(0),
            data_channels: RefCell::new(Vec::new()),
            applied_candidates: RefCell::new(Vec::new()),
            failing_candidates: RefCell::new(HashSet::new()),
            senders: RefCell::new(Vec::new()),
            removed_senders: RefCell::new(Vec::new()),
            offers_held: Cell::new(false),
            pending_offers: Cell::new(0),
            fail_offers: Cell::new(false),
            stats: RefCell::new(RtcStats::default()),
            closed: Cell::new(false),
        })))
    }

    fn on_negotiation_needed(&self, f: Option<Box<dyn FnMut()>>) {
        *self.0.handlers.negotiation_needed.borrow_mut() = f;
    }

    fn on_ice_candidate(&self, f: Option<Box<dyn FnMut(IceCandidate)>>) {
        *self.0.handlers.ice_candidate.borrow_mut() = f;
    }

    fn on_ice_connection_state_change(
        &self,
        f: Option<Box<dyn FnMut(IceConnectionState)>>,
    ) {
        *self.0.handlers.ice_connection_state.borrow_mut() = f;
    }

    fn on_connection_state_change(
        &self,
        f: Option<Box<dyn FnMut(PeerConnectionState)>>,
    ) {
        *self.0.handlers.connection_state.borrow_mut() = f;
    }

    fn on_track(&self, f: Option<Box<dyn FnMut(TrackEvent<MediaTrack>)>>) {
        *self.0.handlers.track.borrow_mut() = f;
    }

    async fn create_data_channel(&self, label: &str) -> Result<()> {
        if self.0.closed.get() {
            return Err(tracerr::new!(E::CreateDataChannel(closed())));
        }
        self.0.data_channels.borrow_mut().push(label.to_owned());
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.0.pending_offers.set(self.0.pending_offers.get() + 1);
        while self.0.offers_held.get() {
            tokio::task::yield_now().await;
        }
        self.0.pending_offers.set(self.0.pending_offers.get() - 1);

        if self.0.fail_offers.get() {
            return Err(tracerr::new!(E::CreateOffer(Error::new(
                "OperationError",
                "offer creation failed",
            ))));
        }
        if self.0.closed.get() {
            return Err(tracerr::new!(E::CreateOffer(closed())));
        }
        Ok(SessionDescription::offer(self.next_sdp(SdpType::Offer)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        if self.0.signaling_state.get() != SignalingState::HaveRemoteOffer {
            return Err(tracerr::new!(E::CreateAnswer(invalid_state(
                self.0.signaling_state.get()
            ))));
        }
        Ok(SessionDescription::answer(self.next_sdp(SdpType::Answer)))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<()> {
        let state = self.0.signaling_state.get();
        let next = match (desc.kind, state) {
            (SdpType::Offer, SignalingState::Stable)
            | (SdpType::Offer, SignalingState::HaveLocalOffer) => {
                SignalingState::HaveLocalOffer
            }
            (SdpType::Answer, SignalingState::HaveRemoteOffer) => {
                SignalingState::Stable
            }
            _ => {
                return Err(tracerr::new!(E::SetLocalDescription(
                    invalid_state(state)
                )))
            }
        };
        self.0.signaling_state.set(next);
        *self.0.local_description.borrow_mut() = Some(desc);
        Ok(())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<()> {
        let state = self.0.signaling_state.get();
        let next = match (desc.kind, state) {
            (SdpType::Offer, SignalingState::Stable)
            | (SdpType::Offer, SignalingState::HaveRemoteOffer) => {
                SignalingState::HaveRemoteOffer
            }
            (SdpType::Offer, SignalingState::HaveLocalOffer) => {
                self.0.rollbacks.set(self.0.rollbacks.get() + 1);
                self.0.local_description.borrow_mut().take();
                SignalingState::HaveRemoteOffer
            }
            (SdpType::Answer, SignalingState::HaveLocalOffer) => {
                SignalingState::Stable
            }
            _ => {
                return Err(tracerr::new!(E::SetRemoteDescription(
                    invalid_state(state)
                )))
            }
        };
        self.0.signaling_state.set(next);
        *self.0.remote_description.borrow_mut() = Some(desc);
        Ok(())
    }

    fn has_remote_description(&self) -> bool {
        self.0.remote_description.borrow().is_some()
    }

    fn signaling_state(&self) -> SignalingState {
        self.0.signaling_state.get()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if !self.has_remote_description() {
            return Err(tracerr::new!(E::AddIceCandidate(Error::new(
                "InvalidStateError",
                "remote description is not set",
            ))));
        }
        if self
            .0
            .failing_candidates
            .borrow()
            .contains(&candidate.candidate)
        {
            return Err(tracerr::new!(E::AddIceCandidate(Error::new(
                "OperationError",
                format!("cannot apply {}", candidate.candidate),
            ))));
        }
        self.0.applied_candidates.borrow_mut().push(candidate);
        Ok(())
    }

    async fn add_track(
        &self,
        track: MediaTrack,
        _: &MediaStream<MediaTrack>,
    ) -> Result<Sender> {
        if self.0.closed.get() {
            return Err(tracerr::new!(E::AddTrack(closed())));
        }
        let mut senders = self.0.senders.borrow_mut();
        let sender = Sender {
            id: senders.len(),
            track: Rc::new(RefCell::new(Some(track))),
        };
        senders.push(sender.clone());
        Ok(sender)
    }

    async fn replace_track(
        &self,
        sender: &Sender,
        track: Option<MediaTrack>,
    ) -> Result<()> {
        if self.0.removed_senders.borrow().contains(&sender.id) {
            return Err(tracerr::new!(E::ReplaceTrack(Error::new(
                "InvalidStateError",
                "sender is removed",
            ))));
        }
        *sender.track.borrow_mut() = track;
        Ok(())
    }

    async fn remove_track(&self, sender: &Sender) -> Result<()> {
        sender.track.borrow_mut().take();
        self.0.removed_senders.borrow_mut().push(sender.id);
        Ok(())
    }

    async fn get_stats(&self) -> Result<RtcStats> {
        if self.0.closed.get() {
            return Err(tracerr::new!(E::GetStats(closed())));
        }
        Ok(self.0.stats.borrow().clone())
    }

    fn close(&self) {
        self.0.closed.set(true);
        self.0.signaling_state.set(SignalingState::Closed);
    }
}

fn closed() -> Error {
    Error::new("InvalidStateError", "connection is closed")
}

fn invalid_state(state: SignalingState) -> Error {
    Error::new(
        "InvalidStateError",
        format!("operation is not allowed in {} signaling state", state),
    )
}
