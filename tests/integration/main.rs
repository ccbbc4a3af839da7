#![forbid(non_ascii_idents, unsafe_code)]

#[cfg(feature = "webrtc")]
mod native;
mod peer;
mod signaling;
mod stats;

use std::{future::Future, time::Duration};

use calls_rtc::{
    platform::{
        mock::{self, MediaTrack},
        RtcConfiguration, RtcPeerConnection as _,
    },
    proto::{IceCandidate, Signal},
    PeerConnection, PeerError, PeerEvent,
};
use futures::{stream::LocalBoxStream, FutureExt as _, StreamExt as _};
use tokio::task::LocalSet;
use tracerr::Traced;

/// [`PeerConnection`] over the in-memory transport.
pub type Peer = PeerConnection<mock::RtcPeerConnection>;

/// Stream of [`PeerEvent`]s of a [`Peer`].
pub type Events = LocalBoxStream<'static, PeerEvent<MediaTrack>>;

/// Runs the provided `test` inside a [`LocalSet`], so tasks spawned by the
/// [`Peer`] are driven.
pub async fn local<F: Future>(test: F) -> F::Output {
    LocalSet::new().run_until(test).await
}

/// Creates a new [`Peer`] returning it along with a handle to its transport.
pub async fn new_peer() -> (Peer, mock::RtcPeerConnection, Events) {
    let transport =
        mock::RtcPeerConnection::new(&RtcConfiguration::default())
            .await
            .unwrap();
    let peer = Peer::with_transport(transport.clone(), "calls")
        .await
        .unwrap();
    let events = peer.subscribe();
    (peer, transport, events)
}

/// Yields to the spawned tasks until `cond` holds.
///
/// # Panics
///
/// If `cond` doesn't hold after a reasonable amount of yields.
pub async fn yield_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition is not met");
}

/// Waits for the next [`PeerEvent`].
///
/// # Panics
///
/// If no [`PeerEvent`] is emitted within a second.
pub async fn next_event(events: &mut Events) -> PeerEvent<MediaTrack> {
    tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .expect("no event emitted")
        .expect("events stream ended")
}

/// Takes all the [`PeerEvent`]s emitted so far.
pub fn drain(events: &mut Events) -> Vec<PeerEvent<MediaTrack>> {
    let mut out = Vec::new();
    while let Some(Some(event)) = events.next().now_or_never() {
        out.push(event);
    }
    out
}

/// Serializes the provided [`Signal`] the way the relay delivers it.
pub fn wire<S: Into<Signal>>(signal: S) -> String {
    signal.into().to_json().unwrap()
}

/// Builds a wire `candidate` message.
pub fn candidate(line: &str) -> String {
    wire(IceCandidate::new(line))
}

/// Builds a wire `offer` message.
pub fn offer(sdp: &str) -> String {
    wire(Signal::Offer { sdp: sdp.into() })
}

/// Builds a wire `answer` message.
pub fn answer(sdp: &str) -> String {
    wire(Signal::Answer { sdp: sdp.into() })
}

/// Extracts the [`PeerError`] of a failed operation.
pub fn error<T: std::fmt::Debug>(res: Result<T, Traced<PeerError>>) -> PeerError {
    res.unwrap_err().as_ref().clone()
}
