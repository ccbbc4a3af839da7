use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
    sync::Arc,
};

use async_trait::async_trait;
use calls_rtc_proto::{IceCandidate, SdpType, SessionDescription};
use tokio::{runtime::Handle, sync::mpsc};
use webrtc::{
    api::{
        interceptor_registry::register_default_interceptors,
        media_engine::MediaEngine, APIBuilder,
    },
    data_channel::RTCDataChannel,
    ice_transport::{
        ice_candidate::{RTCIceCandidate, RTCIceCandidateInit},
        ice_connection_state::RTCIceConnectionState,
        ice_server::RTCIceServer,
    },
    interceptor::registry::Registry,
    peer_connection::{
        configuration::RTCConfiguration,
        peer_connection_state::RTCPeerConnectionState,
        sdp::{sdp_type::RTCSdpType, session_description::RTCSessionDescription},
        signaling_state::RTCSignalingState,
        RTCPeerConnection,
    },
    rtp_transceiver::rtp_sender::RTCRtpSender,
    track::track_remote::TrackRemote,
};

use crate::platform::{
    self, Error, IceConnectionState, MediaStream, PeerConnectionState,
    RtcConfiguration, RtcPeerConnectionError as E,
    RtcPeerConnectionResult as Result, RtcStats, SignalingState, TrackEvent,
};

use super::MediaStreamTrack;

/// Transport event forwarded from the [webrtc-rs] callbacks.
///
/// [webrtc-rs]: https://github.com/webrtc-rs/webrtc
enum Event {
    NegotiationNeeded,
    IceCandidate(IceCandidate),
    IceConnectionState(IceConnectionState),
    ConnectionState(PeerConnectionState),
    Track(Arc<TrackRemote>),
}

type Handler<A> = RefCell<Option<Box<dyn FnMut(A)>>>;

/// Handlers registered on a [`RtcPeerConnection`].
#[derive(Default)]
struct Handlers {
    negotiation_needed: RefCell<Option<Box<dyn FnMut()>>>,
    ice_candidate: Handler<IceCandidate>,
    ice_connection_state: Handler<IceConnectionState>,
    connection_state: Handler<PeerConnectionState>,
    track: Handler<TrackEvent<MediaStreamTrack>>,
}

impl Handlers {
    /// Passes the provided [`Event`] to the matching handler, if any is
    /// registered.
    fn dispatch(&self, event: Event) {
        match event {
            Event::NegotiationNeeded => {
                if let Some(f) = self.negotiation_needed.borrow_mut().as_mut()
                {
                    f();
                }
            }
            Event::IceCandidate(c) => call(&self.ice_candidate, c),
            Event::IceConnectionState(s) => {
                call(&self.ice_connection_state, s);
            }
            Event::ConnectionState(s) => call(&self.connection_state, s),
            Event::Track(remote) => {
                let stream_id = remote.stream_id();
                let track = MediaStreamTrack::Remote(remote);
                let streams = if stream_id.is_empty() {
                    Vec::new()
                } else {
                    vec![MediaStream::new(stream_id, vec![track.clone()])]
                };
                call(&self.track, TrackEvent { track, streams });
            }
        }
    }
}

fn call<A>(slot: &Handler<A>, arg: A) {
    if let Some(f) = slot.borrow_mut().as_mut() {
        f(arg);
    }
}

/// [RTCPeerConnection][1] implementation over [webrtc-rs].
///
/// Must be created and used inside a [`tokio::task::LocalSet`].
///
/// [1]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
/// [webrtc-rs]: https://github.com/webrtc-rs/webrtc
pub struct RtcPeerConnection {
    peer: Arc<RTCPeerConnection>,
    handlers: Rc<Handlers>,
    has_remote_description: Cell<bool>,
    data_channels: RefCell<Vec<Arc<RTCDataChannel>>>,
}

impl RtcPeerConnection {
    /// Returns the underlying [webrtc-rs] connection.
    ///
    /// [webrtc-rs]: https://github.com/webrtc-rs/webrtc
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &Arc<RTCPeerConnection> {
        &self.peer
    }

    /// Subscribes to all the [webrtc-rs] callbacks and spawns the task
    /// delivering their events to the [`Handlers`].
    ///
    /// [webrtc-rs]: https://github.com/webrtc-rs/webrtc
    fn bind_events(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let events = tx.clone();
        self.peer.on_negotiation_needed(Box::new(move || {
            let _ = events.send(Event::NegotiationNeeded);
            Box::pin(async {})
        }));

        let events = tx.clone();
        self.peer.on_ice_candidate(Box::new(
            move |candidate: Option<RTCIceCandidate>| {
                // `None` signals the end of gathering.
                if let Some(c) = candidate {
                    match c.to_json() {
                        Ok(init) => {
                            let _ = events.send(Event::IceCandidate(
                                IceCandidate {
                                    candidate: init.candidate,
                                    sdp_mid: init.sdp_mid,
                                    sdp_m_line_index: init.sdp_mline_index,
                                    username_fragment: init.username_fragment,
                                },
                            ));
                        }
                        Err(e) => {
                            log::warn!("Cannot serialize ICE candidate: {}", e);
                        }
                    }
                }
                Box::pin(async {})
            },
        ));

        let events = tx.clone();
        self.peer.on_ice_connection_state_change(Box::new(
            move |state: RTCIceConnectionState| {
                if let Some(state) = ice_connection_state(state) {
                    let _ = events.send(Event::IceConnectionState(state));
                }
                Box::pin(async {})
            },
        ));

        let events = tx.clone();
        self.peer.on_peer_connection_state_change(Box::new(
            move |state: RTCPeerConnectionState| {
                if let Some(state) = peer_connection_state(state) {
                    let _ = events.send(Event::ConnectionState(state));
                }
                Box::pin(async {})
            },
        ));

        let events = tx;
        self.peer.on_track(Box::new(move |track, _, _| {
            let _ = events.send(Event::Track(track));
            Box::pin(async {})
        }));

        let handlers: Weak<Handlers> = Rc::downgrade(&self.handlers);
        platform::spawn(async move {
            while let Some(event) = rx.recv().await {
                match handlers.upgrade() {
                    Some(h) => h.dispatch(event),
                    None => break,
                }
            }
        });
    }
}

#[async_trait(?Send)]
impl platform::RtcPeerConnection for RtcPeerConnection {
    type Track = MediaStreamTrack;
    type Sender = Arc<RTCRtpSender>;

    async fn new(config: &RtcConfiguration) -> Result<Self> {
        let create = |e: webrtc::Error| tracerr::new!(E::CreatePeer(e.into()));

        let mut media = MediaEngine::default();
        media.register_default_codecs().map_err(create)?;
        let registry =
            register_default_interceptors(Registry::new(), &mut media)
                .map_err(create)?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let peer = api
            .new_peer_connection(RTCConfiguration {
                ice_servers: config
                    .ice_servers
                    .iter()
                    .map(|s| RTCIceServer {
                        urls: s.urls.clone(),
                        username: s.username.clone().unwrap_or_default(),
                        credential: s.credential.clone().unwrap_or_default(),
                        ..RTCIceServer::default()
                    })
                    .collect(),
                ..RTCConfiguration::default()
            })
            .await
            .map_err(create)?;

        let this = Self {
            peer: Arc::new(peer),
            handlers: Rc::new(Handlers::default()),
            has_remote_description: Cell::new(false),
            data_channels: RefCell::new(Vec::new()),
        };
        this.bind_events();
        Ok(this)
    }

    fn on_negotiation_needed(&self, f: Option<Box<dyn FnMut()>>) {
        *self.handlers.negotiation_needed.borrow_mut() = f;
    }

    fn on_ice_candidate(&self, f: Option<Box<dyn FnMut(IceCandidate)>>) {
        *self.handlers.ice_candidate.borrow_mut() = f;
    }

    fn on_ice_connection_state_change(
        &self,
        f: Option<Box<dyn FnMut(IceConnectionState)>>,
    ) {
        *self.handlers.ice_connection_state.borrow_mut() = f;
    }

    fn on_connection_state_change(
        &self,
        f: Option<Box<dyn FnMut(PeerConnectionState)>>,
    ) {
        *self.handlers.connection_state.borrow_mut() = f;
    }

    fn on_track(
        &self,
        f: Option<Box<dyn FnMut(TrackEvent<MediaStreamTrack>)>>,
    ) {
        *self.handlers.track.borrow_mut() = f;
    }

    async fn create_data_channel(&self, label: &str) -> Result<()> {
        let channel = self
            .peer
            .create_data_channel(label, None)
            .await
            .map_err(Error::from)
            .map_err(E::CreateDataChannel)
            .map_err(tracerr::wrap!())?;
        self.data_channels.borrow_mut().push(channel);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.peer
            .create_offer(None)
            .await
            .map_err(Error::from)
            .map_err(E::CreateOffer)
            .map_err(tracerr::wrap!())
            .map(|d| SessionDescription::offer(d.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.peer
            .create_answer(None)
            .await
            .map_err(Error::from)
            .map_err(E::CreateAnswer)
            .map_err(tracerr::wrap!())
            .map(|d| SessionDescription::answer(d.sdp))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<()> {
        let desc = into_rtc_description(desc)
            .map_err(E::SetLocalDescription)
            .map_err(tracerr::wrap!())?;
        self.peer
            .set_local_description(desc)
            .await
            .map_err(Error::from)
            .map_err(E::SetLocalDescription)
            .map_err(tracerr::wrap!())
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<()> {
        let is_offer = desc.kind == SdpType::Offer;
        let desc = into_rtc_description(desc)
            .map_err(E::SetRemoteDescription)
            .map_err(tracerr::wrap!())?;

        if is_offer
            && self.peer.signaling_state() == RTCSignalingState::HaveLocalOffer
        {
            // webrtc-rs parses the SDP of a rollback too, so the pending
            // offer is reused as its body.
            if let Some(mut rollback) =
                self.peer.pending_local_description().await
            {
                rollback.sdp_type = RTCSdpType::Rollback;
                self.peer
                    .set_local_description(rollback)
                    .await
                    .map_err(Error::from)
                    .map_err(E::SetRemoteDescription)
                    .map_err(tracerr::wrap!())?;
            }
        }

        self.peer
            .set_remote_description(desc)
            .await
            .map_err(Error::from)
            .map_err(E::SetRemoteDescription)
            .map_err(tracerr::wrap!())?;
        self.has_remote_description.set(true);
        Ok(())
    }

    #[inline]
    fn has_remote_description(&self) -> bool {
        self.has_remote_description.get()
    }

    fn signaling_state(&self) -> SignalingState {
        match self.peer.signaling_state() {
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => {
                SignalingState::HaveRemoteOffer
            }
            RTCSignalingState::HaveLocalPranswer => {
                SignalingState::HaveLocalPranswer
            }
            RTCSignalingState::HaveRemotePranswer => {
                SignalingState::HaveRemotePranswer
            }
            RTCSignalingState::Closed => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: candidate.username_fragment,
            })
            .await
            .map_err(Error::from)
            .map_err(E::AddIceCandidate)
            .map_err(tracerr::wrap!())
    }

    async fn add_track(
        &self,
        track: MediaStreamTrack,
        _: &MediaStream<MediaStreamTrack>,
    ) -> Result<Arc<RTCRtpSender>> {
        let local = into_local(track)
            .map_err(E::AddTrack)
            .map_err(tracerr::wrap!())?;
        self.peer
            .add_track(local)
            .await
            .map_err(Error::from)
            .map_err(E::AddTrack)
            .map_err(tracerr::wrap!())
    }

    async fn replace_track(
        &self,
        sender: &Arc<RTCRtpSender>,
        track: Option<MediaStreamTrack>,
    ) -> Result<()> {
        let local = track
            .map(into_local)
            .transpose()
            .map_err(E::ReplaceTrack)
            .map_err(tracerr::wrap!())?;
        sender
            .replace_track(local)
            .await
            .map_err(Error::from)
            .map_err(E::ReplaceTrack)
            .map_err(tracerr::wrap!())
    }

    async fn remove_track(&self, sender: &Arc<RTCRtpSender>) -> Result<()> {
        self.peer
            .remove_track(sender)
            .await
            .map_err(Error::from)
            .map_err(E::RemoveTrack)
            .map_err(tracerr::wrap!())
    }

    async fn get_stats(&self) -> Result<RtcStats> {
        Ok(self.peer.get_stats().await.into())
    }

    fn close(&self) {
        let rt = match Handle::try_current() {
            Ok(rt) => rt,
            Err(_) => {
                log::warn!(
                    "No Tokio runtime to close RTCPeerConnection on, its \
                     resources are released on drop",
                );
                return;
            }
        };
        let peer = Arc::clone(&self.peer);
        drop(rt.spawn(async move {
            if let Err(e) = peer.close().await {
                log::warn!("Failed to close RTCPeerConnection: {}", e);
            }
        }));
    }
}

/// Converts a [`SessionDescription`] into the [webrtc-rs] one.
///
/// [webrtc-rs]: https://github.com/webrtc-rs/webrtc
fn into_rtc_description(
    desc: SessionDescription,
) -> std::result::Result<RTCSessionDescription, Error> {
    match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
    }
    .map_err(Error::from)
}

/// Extracts a local track out of the provided [`MediaStreamTrack`].
fn into_local(
    track: MediaStreamTrack,
) -> std::result::Result<
    Arc<dyn webrtc::track::track_local::TrackLocal + Send + Sync>,
    Error,
> {
    match track {
        MediaStreamTrack::Local(track) => Ok(track),
        MediaStreamTrack::Remote(track) => Err(Error::new(
            "InvalidAccessError",
            format!("remote track `{}` cannot be sent", track.id()),
        )),
    }
}

fn ice_connection_state(
    state: RTCIceConnectionState,
) -> Option<IceConnectionState> {
    Some(match state {
        RTCIceConnectionState::New => IceConnectionState::New,
        RTCIceConnectionState::Checking => IceConnectionState::Checking,
        RTCIceConnectionState::Connected => IceConnectionState::Connected,
        RTCIceConnectionState::Completed => IceConnectionState::Completed,
        RTCIceConnectionState::Failed => IceConnectionState::Failed,
        RTCIceConnectionState::Disconnected => {
            IceConnectionState::Disconnected
        }
        RTCIceConnectionState::Closed => IceConnectionState::Closed,
        _ => return None,
    })
}

fn peer_connection_state(
    state: RTCPeerConnectionState,
) -> Option<PeerConnectionState> {
    Some(match state {
        RTCPeerConnectionState::New => PeerConnectionState::New,
        RTCPeerConnectionState::Connecting => PeerConnectionState::Connecting,
        RTCPeerConnectionState::Connected => PeerConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => {
            PeerConnectionState::Disconnected
        }
        RTCPeerConnectionState::Failed => PeerConnectionState::Failed,
        RTCPeerConnectionState::Closed => PeerConnectionState::Closed,
        _ => return None,
    })
}
