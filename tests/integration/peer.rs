use calls_rtc::{
    platform::{
        mock::MediaTrack, IceConnectionState, MediaStream,
        PeerConnectionState, RtcConfiguration,
    },
    proto::{IceCandidate, Signal},
    PeerError, PeerEvent,
};
use futures::{FutureExt as _, StreamExt as _};

use crate::{drain, error, local, new_peer, offer, Peer};

#[tokio::test]
async fn opens_data_channel_on_creation() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;

        assert_eq!(transport.data_channels(), vec!["calls".to_owned()]);
        assert_eq!(transport.handlers_count(), 5);
        assert!(!transport.is_closed());
        assert!(drain(&mut events).is_empty());
    })
    .await;
}

#[tokio::test]
async fn creates_transport_from_configuration() {
    local(async {
        let config = RtcConfiguration {
            data_channel_label: "chat".to_owned(),
            ..RtcConfiguration::default()
        };

        let peer = Peer::new(&config).await.unwrap();

        assert!(!peer.is_connected());
        assert_eq!(peer.buffered_candidates(), 0);
        peer.destroy().unwrap();
    })
    .await;
}

#[tokio::test]
async fn relays_local_candidates() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;

        transport.ice_candidate(IceCandidate::new("candidate:local"));

        let mut emitted = drain(&mut events);
        assert_eq!(emitted.len(), 1);
        match emitted.remove(0).into_signal() {
            Some(Signal::Candidate { candidate }) => {
                assert_eq!(candidate.candidate, "candidate:local");
            }
            s => panic!("expected candidate, got {:?}", s),
        }
    })
    .await;
}

#[tokio::test]
async fn emits_connect_on_ice_connected() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;

        transport.ice_connection_state(IceConnectionState::Checking);
        transport.ice_connection_state(IceConnectionState::Connected);

        assert!(matches!(drain(&mut events)[..], [PeerEvent::Connect]));
        assert!(!peer.is_connected());
    })
    .await;
}

#[tokio::test]
async fn emits_failed_close_on_ice_failure() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;

        transport.ice_connection_state(IceConnectionState::Failed);

        assert!(matches!(
            drain(&mut events)[..],
            [PeerEvent::Close(Some(PeerError::ConnectionFailed))]
        ));
    })
    .await;
}

#[tokio::test]
async fn emits_failed_close_on_connection_failure() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;

        transport.connection_state(PeerConnectionState::Connecting);
        transport.connection_state(PeerConnectionState::Failed);

        let emitted = drain(&mut events);
        assert_eq!(emitted.len(), 1);
        match &emitted[0] {
            PeerEvent::Close(Some(e)) => {
                assert_eq!(e.to_string(), "connection failed");
            }
            e => panic!("expected close, got {:?}", e),
        }
    })
    .await;
}

#[tokio::test]
async fn emits_clean_close_on_ice_closed() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;

        transport.ice_connection_state(IceConnectionState::Closed);

        assert!(matches!(drain(&mut events)[..], [PeerEvent::Close(None)]));
    })
    .await;
}

#[tokio::test]
async fn marks_connected_without_event() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;

        transport.connection_state(PeerConnectionState::Connected);

        assert!(peer.is_connected());
        assert!(drain(&mut events).is_empty());

        transport.connection_state(PeerConnectionState::Disconnected);
        assert!(peer.is_connected());
    })
    .await;
}

#[tokio::test]
async fn wraps_streamless_track_into_own_stream() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;

        transport.track(MediaTrack::new("remote-audio"), Vec::new());

        let emitted = drain(&mut events);
        assert_eq!(emitted.len(), 1);
        match &emitted[0] {
            PeerEvent::Stream(stream) => {
                assert_eq!(stream.id(), "remote-audio");
                assert_eq!(stream.tracks(), &[MediaTrack::new("remote-audio")]);
            }
            e => panic!("expected stream, got {:?}", e),
        }
    })
    .await;
}

#[tokio::test]
async fn emits_first_associated_stream() {
    local(async {
        let (_peer, transport, mut events) = new_peer().await;
        let track = MediaTrack::new("remote-video");
        let first = MediaStream::new("first", vec![track.clone()]);
        let second = MediaStream::new("second", vec![track.clone()]);

        transport.track(track, vec![first.clone(), second]);

        let emitted = drain(&mut events);
        assert_eq!(emitted.len(), 1);
        match &emitted[0] {
            PeerEvent::Stream(stream) => assert!(stream.ptr_eq(&first)),
            e => panic!("expected stream, got {:?}", e),
        }
    })
    .await;
}

#[tokio::test]
async fn rekeys_sender_on_track_replacement() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        let a = MediaTrack::new("a");
        peer.add_track(a.clone(), &MediaStream::from_track(a))
            .await
            .unwrap();

        peer.replace_track("a", Some(MediaTrack::new("b")))
            .await
            .unwrap();
        peer.replace_track("b", Some(MediaTrack::new("c")))
            .await
            .unwrap();

        let senders = transport.senders();
        assert_eq!(senders.len(), 1);
        assert_eq!(senders[0].track(), Some(MediaTrack::new("c")));
        assert!(matches!(
            error(peer.replace_track("a", None).await),
            PeerError::SenderNotFound(id) if id == "a"
        ));
        assert!(matches!(
            error(peer.replace_track("b", None).await),
            PeerError::SenderNotFound(_)
        ));
    })
    .await;
}

#[tokio::test]
async fn keeps_sender_key_when_stopping_track() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        let a = MediaTrack::new("a");
        peer.add_track(a.clone(), &MediaStream::from_track(a))
            .await
            .unwrap();

        peer.replace_track("a", None).await.unwrap();
        assert_eq!(transport.senders()[0].track(), None);

        peer.replace_track("a", Some(MediaTrack::new("a2")))
            .await
            .unwrap();
        assert_eq!(transport.senders()[0].track(), Some(MediaTrack::new("a2")));
    })
    .await;
}

#[tokio::test]
async fn adds_every_track_of_stream() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        let stream = MediaStream::new(
            "local",
            vec![MediaTrack::new("audio"), MediaTrack::new("video")],
        );

        peer.add_stream(&stream).await.unwrap();

        let tracks: Vec<_> = transport
            .senders()
            .into_iter()
            .filter_map(|s| s.track())
            .collect();
        assert_eq!(
            tracks,
            vec![MediaTrack::new("audio"), MediaTrack::new("video")],
        );
        peer.remove_track("video").await.unwrap();
        assert_eq!(transport.senders().len(), 1);
    })
    .await;
}

#[tokio::test]
async fn removes_track_once() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        let a = MediaTrack::new("a");
        peer.add_track(a.clone(), &MediaStream::from_track(a))
            .await
            .unwrap();

        peer.remove_track("a").await.unwrap();

        assert!(transport.senders().is_empty());
        assert!(matches!(
            error(peer.remove_track("a").await),
            PeerError::SenderNotFound(_)
        ));
    })
    .await;
}

#[tokio::test]
async fn destroy_disables_every_operation() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;
        transport.connection_state(PeerConnectionState::Connected);
        let a = MediaTrack::new("a");
        peer.add_track(a.clone(), &MediaStream::from_track(a.clone()))
            .await
            .unwrap();

        peer.destroy().unwrap();

        assert!(transport.is_closed());
        assert_eq!(transport.handlers_count(), 0);
        assert!(!peer.is_connected());
        assert!(matches!(events.next().now_or_never(), Some(None)));

        assert!(matches!(
            error(peer.signal(&offer("v=0\r\n")).await),
            PeerError::Destroyed
        ));
        assert!(matches!(
            error(
                peer.add_track(a.clone(), &MediaStream::from_track(a.clone()))
                    .await
            ),
            PeerError::Destroyed
        ));
        assert!(matches!(
            error(peer.replace_track("a", None).await),
            PeerError::Destroyed
        ));
        assert!(matches!(
            error(peer.remove_track("a").await),
            PeerError::Destroyed
        ));
        assert!(matches!(
            error(peer.get_stats().await),
            PeerError::Destroyed
        ));
        assert!(matches!(error(peer.destroy()), PeerError::AlreadyDestroyed));
    })
    .await;
}

#[tokio::test]
async fn ignores_transport_events_after_destroy() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        peer.destroy().unwrap();

        transport.ice_connection_state(IceConnectionState::Connected);
        transport.negotiation_needed();
        tokio::task::yield_now().await;

        assert!(transport.local_description().is_none());
        assert!(matches!(peer.subscribe().next().now_or_never(), Some(None)));
    })
    .await;
}

#[tokio::test]
async fn closes_transport_on_drop() {
    local(async {
        let (peer, transport, mut events) = new_peer().await;

        drop(peer);

        assert!(transport.is_closed());
        assert_eq!(transport.handlers_count(), 0);
        assert!(matches!(events.next().now_or_never(), Some(None)));
    })
    .await;
}
