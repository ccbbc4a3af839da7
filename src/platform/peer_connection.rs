//! Capability interface of the transport connection a
//! [`PeerConnection`](crate::peer::PeerConnection) drives.

use async_trait::async_trait;
use calls_rtc_proto::{stats::RtcStat, IceCandidate, SessionDescription};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracerr::Traced;

use super::{Error, MediaStream, MediaStreamTrack, TrackEvent};

/// Representation of [RTCIceServer][1] (item of `iceServers` field from
/// [RTCConfiguration][2]).
///
/// [1]: https://w3.org/TR/webrtc/#dom-rtciceserver
/// [2]: https://w3.org/TR/webrtc/#dom-rtcconfiguration
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct IceServer {
    /// URLs of this [STUN]/[TURN] server.
    ///
    /// [STUN]: https://webrtcglossary.com/stun
    /// [TURN]: https://webrtcglossary.com/turn
    pub urls: Vec<String>,

    /// Username to use during the authentication process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Credential to use during the authentication process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Configuration a transport connection is created with.
#[derive(Clone, Debug, PartialEq)]
pub struct RtcConfiguration {
    /// [ICE] servers the connection may use.
    ///
    /// [ICE]: https://webrtcglossary.com/ice
    pub ice_servers: Vec<IceServer>,

    /// Label of the auxiliary data channel opened right after the connection
    /// is created to trigger initial negotiation.
    pub data_channel_label: String,
}

impl Default for RtcConfiguration {
    #[inline]
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            data_channel_label: "calls".to_owned(),
        }
    }
}

/// [RTCIceConnectionState][1] representation.
///
/// [1]: https://w3.org/TR/webrtc/#dom-rtciceconnectionstate
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum IceConnectionState {
    /// ICE agent is gathering addresses or is waiting to be given remote
    /// candidates.
    New,

    /// ICE agent has been given one or more remote candidates and is checking
    /// pairs of local and remote candidates against one another.
    Checking,

    /// Usable connection was found, checks may still be in progress.
    Connected,

    /// ICE agent has finished gathering candidates and found a connection.
    Completed,

    /// ICE agent has checked all the candidate pairs without success.
    Failed,

    /// Liveness checks have failed for one or more components.
    Disconnected,

    /// ICE agent has shut down and is no longer handling requests.
    Closed,
}

/// [RTCPeerConnectionState][1] representation.
///
/// [1]: https://w3.org/TR/webrtc/#dom-rtcpeerconnectionstate
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PeerConnectionState {
    /// At least one of the connection's transports is in the `new` state and
    /// none of them is in a failed, connecting or disconnected one.
    New,

    /// One or more transports are currently establishing a connection.
    Connecting,

    /// Every transport used by the connection is connected or closed.
    Connected,

    /// At least one transport is disconnected.
    Disconnected,

    /// One or more transports has terminated in an error.
    Failed,

    /// The connection is closed.
    Closed,
}

/// [RTCSignalingState][1] representation.
///
/// [1]: https://w3.org/TR/webrtc/#dom-rtcsignalingstate
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SignalingState {
    /// No offer/answer exchange is in progress.
    Stable,

    /// Local offer has been applied.
    HaveLocalOffer,

    /// Remote offer has been applied.
    HaveRemoteOffer,

    /// Remote offer and local provisional answer have been applied.
    HaveLocalPranswer,

    /// Local offer and remote provisional answer have been applied.
    HaveRemotePranswer,

    /// The connection is closed.
    Closed,
}

/// All the [`RtcStat`]s reported by a transport at some point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RtcStats(pub Vec<RtcStat>);

/// Errors that may occur while operating a transport connection.
#[derive(Clone, Debug, Display)]
pub enum RtcPeerConnectionError {
    /// Occurs when a remote candidate cannot be added to the connection.
    #[display(fmt = "Failed to add ICE candidate: {}", _0)]
    AddIceCandidate(Error),

    /// Occurs when a local track cannot be attached to the connection.
    #[display(fmt = "Failed to add track: {}", _0)]
    AddTrack(Error),

    /// Occurs when an SDP answer cannot be obtained.
    #[display(fmt = "Failed to create SDP answer: {}", _0)]
    CreateAnswer(Error),

    /// Occurs when the auxiliary data channel cannot be opened.
    #[display(fmt = "Failed to create data channel: {}", _0)]
    CreateDataChannel(Error),

    /// Occurs when an SDP offer cannot be obtained.
    #[display(fmt = "Failed to create SDP offer: {}", _0)]
    CreateOffer(Error),

    /// Occurs when a new transport connection cannot be created.
    #[display(fmt = "Failed to create PeerConnection: {}", _0)]
    CreatePeer(Error),

    /// Occurs when statistics cannot be collected.
    #[display(fmt = "Failed to get RTCStats: {}", _0)]
    GetStats(Error),

    /// Occurs when a sender cannot be detached from the connection.
    #[display(fmt = "Failed to remove track: {}", _0)]
    RemoveTrack(Error),

    /// Occurs when the track of a sender cannot be replaced.
    #[display(fmt = "Failed to replace track: {}", _0)]
    ReplaceTrack(Error),

    /// Occurs when a local description cannot be applied.
    #[display(fmt = "Failed to set local SDP description: {}", _0)]
    SetLocalDescription(Error),

    /// Occurs when a remote description cannot be applied.
    #[display(fmt = "Failed to set remote SDP description: {}", _0)]
    SetRemoteDescription(Error),
}

/// Shortcut for a [`Result`] of [`RtcPeerConnection`] operations.
pub type RtcPeerConnectionResult<T> =
    Result<T, Traced<RtcPeerConnectionError>>;

/// Transport connection driven by a
/// [`PeerConnection`](crate::peer::PeerConnection).
///
/// Handlers are registered with the `on_*` methods, passing [`None`] detaches
/// the previously registered one. Handlers are always invoked on the thread
/// owning the connection.
#[async_trait(?Send)]
pub trait RtcPeerConnection: Sized + 'static {
    /// Tracks this connection sends and receives.
    type Track: MediaStreamTrack;

    /// Handle of a track attached to this connection.
    type Sender: Clone + 'static;

    /// Opens a new transport connection with the provided `config`.
    async fn new(config: &RtcConfiguration) -> RtcPeerConnectionResult<Self>;

    /// Sets handler of the [`negotiationneeded`][1] event.
    ///
    /// [1]: https://w3.org/TR/webrtc/#event-negotiation
    fn on_negotiation_needed(&self, f: Option<Box<dyn FnMut()>>);

    /// Sets handler of the [`icecandidate`][1] event.
    ///
    /// [1]: https://w3.org/TR/webrtc/#event-icecandidate
    fn on_ice_candidate(&self, f: Option<Box<dyn FnMut(IceCandidate)>>);

    /// Sets handler of the [`iceconnectionstatechange`][1] event.
    ///
    /// [1]: https://w3.org/TR/webrtc/#event-iceconnectionstatechange
    fn on_ice_connection_state_change(
        &self,
        f: Option<Box<dyn FnMut(IceConnectionState)>>,
    );

    /// Sets handler of the [`connectionstatechange`][1] event.
    ///
    /// [1]: https://w3.org/TR/webrtc/#event-connectionstatechange
    fn on_connection_state_change(
        &self,
        f: Option<Box<dyn FnMut(PeerConnectionState)>>,
    );

    /// Sets handler of the [`track`][1] event.
    ///
    /// [1]: https://w3.org/TR/webrtc/#event-track
    fn on_track(&self, f: Option<Box<dyn FnMut(TrackEvent<Self::Track>)>>);

    /// Opens a data channel with the provided `label`.
    async fn create_data_channel(
        &self,
        label: &str,
    ) -> RtcPeerConnectionResult<()>;

    /// Obtains a new [SDP] offer.
    ///
    /// [SDP]: https://tools.ietf.org/html/rfc4566
    async fn create_offer(&self)
        -> RtcPeerConnectionResult<SessionDescription>;

    /// Obtains a new [SDP] answer to the applied remote offer.
    ///
    /// [SDP]: https://tools.ietf.org/html/rfc4566
    async fn create_answer(
        &self,
    ) -> RtcPeerConnectionResult<SessionDescription>;

    /// Applies the provided [`SessionDescription`] as the local one.
    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> RtcPeerConnectionResult<()>;

    /// Applies the provided [`SessionDescription`] as the remote one.
    ///
    /// Applying a remote offer while a local offer is pending rolls the local
    /// offer back.
    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> RtcPeerConnectionResult<()>;

    /// Indicates whether a remote description of any type has been applied.
    fn has_remote_description(&self) -> bool;

    /// Returns the current [`SignalingState`] of this connection.
    fn signaling_state(&self) -> SignalingState;

    /// Applies the provided remote [`IceCandidate`].
    async fn add_ice_candidate(
        &self,
        candidate: IceCandidate,
    ) -> RtcPeerConnectionResult<()>;

    /// Attaches the provided `track` of the provided `stream` to this
    /// connection.
    async fn add_track(
        &self,
        track: Self::Track,
        stream: &MediaStream<Self::Track>,
    ) -> RtcPeerConnectionResult<Self::Sender>;

    /// Replaces the track sent by the provided `sender`. [`None`] stops
    /// sending media without detaching the `sender`.
    async fn replace_track(
        &self,
        sender: &Self::Sender,
        track: Option<Self::Track>,
    ) -> RtcPeerConnectionResult<()>;

    /// Detaches the provided `sender` from this connection.
    async fn remove_track(
        &self,
        sender: &Self::Sender,
    ) -> RtcPeerConnectionResult<()>;

    /// Collects [`RtcStats`] of this connection.
    async fn get_stats(&self) -> RtcPeerConnectionResult<RtcStats>;

    /// Closes this connection.
    fn close(&self);
}
