use std::{sync::Arc, time::Duration};

use ::webrtc::peer_connection::{
    signaling_state::RTCSignalingState, RTCPeerConnection,
};
use calls_rtc::{
    peer::normalize,
    platform::{
        webrtc::{MediaStreamTrack, RtcPeerConnection as Transport},
        RtcConfiguration, RtcPeerConnection as _, SignalingState,
    },
    proto::{SdpType, SessionDescription},
    PeerConnection, PeerEvent,
};
use futures::{stream::LocalBoxStream, StreamExt as _};
use tokio::task::LocalSet;

use crate::{local, wire};

type Peer = PeerConnection<Transport>;

type Events = LocalBoxStream<'static, PeerEvent<MediaStreamTrack>>;

/// Creates a new [`Peer`] over a [webrtc-rs] transport, returning it along
/// with the underlying [`RTCPeerConnection`].
///
/// [webrtc-rs]: https://github.com/webrtc-rs/webrtc
async fn new_peer() -> (Peer, Arc<RTCPeerConnection>, Events) {
    let transport = Transport::new(&RtcConfiguration::default())
        .await
        .unwrap();
    let raw = Arc::clone(transport.inner());
    let peer = Peer::with_transport(transport, "calls").await.unwrap();
    let events = peer.subscribe();
    (peer, raw, events)
}

/// Waits for the next emitted [`SessionDescription`], skipping candidates.
///
/// # Panics
///
/// If nothing is emitted within 5 seconds, or a negotiation error is emitted.
async fn next_description(events: &mut Events) -> SessionDescription {
    let wait = async {
        loop {
            match events.next().await.expect("events stream ended") {
                PeerEvent::Offer(desc) | PeerEvent::Answer(desc) => {
                    return desc;
                }
                PeerEvent::Error(e) => panic!("negotiation failed: {}", e),
                _ => {}
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("no description emitted")
}

/// Makes an offer on a bare `transport` with a data channel on it.
async fn make_offer(transport: &Transport) -> SessionDescription {
    transport.create_data_channel("remote").await.unwrap();
    let offer = transport.create_offer().await.unwrap();
    transport.set_local_description(offer.clone()).await.unwrap();
    offer
}

#[tokio::test]
async fn completes_offer_answer_round() {
    local(async {
        let (peer, raw, mut events) = new_peer().await;
        let remote = Transport::new(&RtcConfiguration::default())
            .await
            .unwrap();

        let offer = next_description(&mut events).await;
        assert_eq!(offer.kind, SdpType::Offer);
        assert_eq!(raw.signaling_state(), RTCSignalingState::HaveLocalOffer);

        remote.set_remote_description(offer).await.unwrap();
        let answer = remote.create_answer().await.unwrap();
        remote.set_local_description(answer.clone()).await.unwrap();
        peer.signal(&wire(answer)).await.unwrap();

        assert_eq!(raw.signaling_state(), RTCSignalingState::Stable);
        assert!(raw.remote_description().await.is_some());
        assert_eq!(remote.signaling_state(), SignalingState::Stable);
        assert!(normalize(&peer.get_stats().await.unwrap()).is_empty());
    })
    .await;
}

#[tokio::test]
async fn answers_remote_offer() {
    local(async {
        let (peer, raw, mut events) = new_peer().await;
        let remote = Transport::new(&RtcConfiguration::default())
            .await
            .unwrap();
        let _ = next_description(&mut events).await;

        let offer = make_offer(&remote).await;
        peer.signal(&wire(offer)).await.unwrap();

        let answer = next_description(&mut events).await;
        assert_eq!(answer.kind, SdpType::Answer);
        remote.set_remote_description(answer).await.unwrap();
        assert_eq!(remote.signaling_state(), SignalingState::Stable);
        assert_eq!(raw.signaling_state(), RTCSignalingState::Stable);
    })
    .await;
}

#[tokio::test]
async fn rolls_back_pending_offer_on_glare() {
    local(async {
        let (peer, raw, mut events) = new_peer().await;
        let remote = Transport::new(&RtcConfiguration::default())
            .await
            .unwrap();

        let own = next_description(&mut events).await;
        assert_eq!(own.kind, SdpType::Offer);
        assert_eq!(raw.signaling_state(), RTCSignalingState::HaveLocalOffer);
        assert!(raw.pending_local_description().await.is_some());

        let offer = make_offer(&remote).await;
        peer.signal(&wire(offer.clone())).await.unwrap();

        let answer = next_description(&mut events).await;
        assert_eq!(answer.kind, SdpType::Answer);
        assert_eq!(raw.signaling_state(), RTCSignalingState::Stable);
        assert_eq!(
            raw.remote_description().await.map(|d| d.sdp),
            Some(offer.sdp),
        );
        remote.set_remote_description(answer).await.unwrap();
        assert_eq!(remote.signaling_state(), SignalingState::Stable);
    })
    .await;
}

#[test]
fn drops_outside_of_runtime() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let peer = LocalSet::new()
        .block_on(&rt, Peer::new(&RtcConfiguration::default()))
        .unwrap();
    drop(rt);

    drop(peer);
}
