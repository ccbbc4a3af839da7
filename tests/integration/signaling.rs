use calls_rtc::{
    platform::{
        RtcPeerConnection as _, RtcPeerConnectionError, SignalingState,
    },
    proto::{IceCandidate, SdpType},
    PeerError, PeerEvent,
};

use crate::{
    answer, candidate, drain, error, local, new_peer, next_event, offer,
    yield_until,
};

/// Makes the [`Peer`](crate::Peer) apply its own offer.
macro_rules! make_local_offer {
    ($transport:ident, $events:ident) => {{
        $transport.negotiation_needed();
        match next_event(&mut $events).await {
            PeerEvent::Offer(desc) => desc,
            e => panic!("expected offer, got {:?}", e),
        }
    }};
}

fn lines(candidates: Vec<IceCandidate>) -> Vec<String> {
    candidates.into_iter().map(|c| c.candidate).collect()
}

#[tokio::test]
async fn answers_offer_before_returning() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;

        peer.signal(&offer("v=0\r\ns=remote\r\n")).await.unwrap();

        let events = drain(&mut events);
        assert_eq!(events.len(), 1);
        let answer = match &events[0] {
            PeerEvent::Answer(desc) => desc.clone(),
            e => panic!("expected answer, got {:?}", e),
        };
        assert_eq!(answer.kind, SdpType::Answer);
        assert!(answer.sdp.starts_with("v=0"));
        assert_eq!(transport.local_description(), Some(answer));
        assert_eq!(
            transport.remote_description().map(|d| d.sdp),
            Some("v=0\r\ns=remote\r\n".to_owned()),
        );
        assert_eq!(transport.signaling_state(), SignalingState::Stable);
    })
    .await;
}

#[tokio::test]
async fn emits_offer_on_negotiation_needed() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;
        assert!(drain(&mut events).is_empty());

        let offer = make_local_offer!(transport, events);

        assert_eq!(offer.kind, SdpType::Offer);
        assert_eq!(transport.local_description(), Some(offer));
        assert_eq!(transport.signaling_state(), SignalingState::HaveLocalOffer);
    })
    .await;
}

#[tokio::test]
async fn applies_buffered_candidates_in_order_after_answer() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;
        make_local_offer!(transport, events);

        for line in &["candidate:1", "candidate:2", "candidate:3"] {
            peer.signal(&candidate(line)).await.unwrap();
        }
        assert!(transport.applied_candidates().is_empty());
        assert_eq!(peer.buffered_candidates(), 3);

        peer.signal(&answer("v=0\r\n")).await.unwrap();

        assert_eq!(
            lines(transport.applied_candidates()),
            vec!["candidate:1", "candidate:2", "candidate:3"],
        );
        assert_eq!(peer.buffered_candidates(), 0);
        assert_eq!(transport.signaling_state(), SignalingState::Stable);
    })
    .await;
}

#[tokio::test]
async fn applies_candidates_at_once_after_remote_description() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;
        make_local_offer!(transport, events);
        peer.signal(&answer("v=0\r\n")).await.unwrap();

        peer.signal(&candidate("candidate:1")).await.unwrap();

        assert_eq!(lines(transport.applied_candidates()), vec!["candidate:1"]);
        assert_eq!(peer.buffered_candidates(), 0);
    })
    .await;
}

#[tokio::test]
async fn skips_failed_buffered_candidate() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;
        transport.fail_candidate("candidate:2");
        make_local_offer!(transport, events);

        for line in &["candidate:1", "candidate:2", "candidate:3"] {
            peer.signal(&candidate(line)).await.unwrap();
        }
        peer.signal(&answer("v=0\r\n")).await.unwrap();

        assert_eq!(
            lines(transport.applied_candidates()),
            vec!["candidate:1", "candidate:3"],
        );
        assert_eq!(peer.buffered_candidates(), 0);
        assert!(drain(&mut events).is_empty());
    })
    .await;
}

#[tokio::test]
async fn failed_candidate_is_not_an_error() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        transport.fail_candidate("candidate:bad");
        peer.signal(&offer("v=0\r\n")).await.unwrap();

        peer.signal(&candidate("candidate:bad")).await.unwrap();
        peer.signal(&candidate("candidate:good")).await.unwrap();

        assert_eq!(
            lines(transport.applied_candidates()),
            vec!["candidate:good"],
        );
    })
    .await;
}

#[tokio::test]
async fn offer_leaves_buffered_candidates_queued() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;
        peer.signal(&candidate("candidate:early")).await.unwrap();

        peer.signal(&offer("v=0\r\n")).await.unwrap();

        assert!(matches!(drain(&mut events)[..], [PeerEvent::Answer(_)]));
        assert!(transport.applied_candidates().is_empty());
        assert_eq!(peer.buffered_candidates(), 1);

        peer.signal(&candidate("candidate:late")).await.unwrap();
        assert_eq!(
            lines(transport.applied_candidates()),
            vec!["candidate:late"],
        );
        assert_eq!(peer.buffered_candidates(), 1);
    })
    .await;
}

#[tokio::test]
async fn accepts_offer_while_making_offer() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;
        transport.hold_offers(true);
        transport.negotiation_needed();
        yield_until(|| transport.pending_offers() == 1).await;
        assert_eq!(transport.signaling_state(), SignalingState::Stable);

        peer.signal(&offer("v=0\r\ns=remote\r\n")).await.unwrap();

        assert!(matches!(drain(&mut events)[..], [PeerEvent::Answer(_)]));
        assert_eq!(
            transport.remote_description().map(|d| d.kind),
            Some(SdpType::Offer),
        );

        transport.hold_offers(false);
        assert!(matches!(next_event(&mut events).await, PeerEvent::Offer(_)));
        assert_eq!(transport.pending_offers(), 0);
        assert_eq!(transport.signaling_state(), SignalingState::HaveLocalOffer);
    })
    .await;
}

#[tokio::test]
async fn accepts_offer_over_pending_local_offer() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;
        make_local_offer!(transport, events);
        assert_eq!(transport.signaling_state(), SignalingState::HaveLocalOffer);

        peer.signal(&offer("v=0\r\ns=remote\r\n")).await.unwrap();

        assert_eq!(transport.rollbacks(), 1);
        assert!(matches!(drain(&mut events)[..], [PeerEvent::Answer(_)]));
        assert_eq!(transport.signaling_state(), SignalingState::Stable);
    })
    .await;
}

#[tokio::test]
async fn emits_error_when_offer_fails() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;
        transport.fail_offers(true);

        transport.negotiation_needed();

        assert!(matches!(
            next_event(&mut events).await,
            PeerEvent::Error(PeerError::Transport(
                RtcPeerConnectionError::CreateOffer(_)
            ))
        ));
        assert!(transport.local_description().is_none());

        transport.fail_offers(false);
        make_local_offer!(transport, events);
    })
    .await;
}

#[tokio::test]
async fn rejects_invalid_signaling_data() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;

        for data in &[
            "not a json",
            r#"{"type":"pranswer","sdp":"v=0"}"#,
            r#"{"sdp":"v=0"}"#,
            r#"{"type":"candidate"}"#,
        ] {
            assert!(matches!(
                error(peer.signal(data).await),
                PeerError::InvalidSignalingData(_)
            ));
        }
        assert!(transport.remote_description().is_none());
        assert!(drain(&mut events).is_empty());
    })
    .await;
}

#[tokio::test]
async fn unexpected_answer_fails() {
    local(async {
        let (peer, transport, _events) = new_peer().await;

        assert!(matches!(
            error(peer.signal(&answer("v=0\r\n")).await),
            PeerError::Transport(
                RtcPeerConnectionError::SetRemoteDescription(_)
            )
        ));
        assert!(!transport.has_remote_description());
    })
    .await;
}
