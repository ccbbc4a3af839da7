use calls_rtc::{
    peer::normalize,
    platform::{RtcPeerConnectionError, RtcStats},
    proto::stats::{MediaKind, RtcStat},
    PeerError,
};
use serde_json::json;

use crate::{error, local, new_peer};

fn reports(reports: serde_json::Value) -> RtcStats {
    RtcStats(serde_json::from_value::<Vec<RtcStat>>(reports).unwrap())
}

#[tokio::test]
async fn normalizes_collected_stats() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        transport.set_stats(reports(json!([
            {
                "id": "OT01A1", "timestamp": 1_600_000_000_000.0,
                "type": "outbound-rtp", "ssrc": 1, "kind": "audio",
                "packetsSent": 100, "bytesSent": 16000,
            },
            {
                "id": "RI01A1", "timestamp": 1_600_000_000_000.0,
                "type": "remote-inbound-rtp", "ssrc": 1, "kind": "audio",
                "packetsLost": 2, "roundTripTime": 0.12,
            },
            {
                "id": "IT01V2", "timestamp": 1_600_000_000_000.0,
                "type": "inbound-rtp", "ssrc": 2, "kind": "video",
                "packetsReceived": 300, "framesDecoded": 90,
            },
            {
                "id": "T01", "timestamp": 1_600_000_000_000.0,
                "type": "transport", "bytesSent": 20000,
            },
        ])));

        let table = normalize(&peer.get_stats().await.unwrap());

        assert_eq!(
            serde_json::to_value(&table).unwrap(),
            json!({
                "1": {
                    "local": {
                        "out": {
                            "kind": "audio",
                            "packetsSent": 100,
                            "bytesSent": 16000,
                        },
                    },
                    "remote": {
                        "in": {
                            "kind": "audio",
                            "packetsLost": 2,
                            "roundTripTime": 0.12,
                        },
                    },
                },
                "2": {
                    "local": {
                        "in": {"kind": "video", "packetsReceived": 300},
                    },
                    "remote": {},
                },
            }),
        );
        assert_eq!(
            table[&2].local.inbound.as_ref().unwrap().kind,
            Some(MediaKind::Video),
        );
    })
    .await;
}

#[tokio::test]
async fn normalizes_empty_stats() {
    local(async {
        let (peer, _transport, _events) = new_peer().await;

        assert!(normalize(&peer.get_stats().await.unwrap()).is_empty());
    })
    .await;
}

#[tokio::test]
async fn fails_on_destroyed_peer() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        transport.set_stats(reports(json!([{
            "id": "OT01A1", "timestamp": 1.0, "type": "outbound-rtp",
            "ssrc": 1,
        }])));
        peer.destroy().unwrap();

        assert!(matches!(
            error(peer.get_stats().await),
            PeerError::Destroyed
        ));
    })
    .await;
}

#[tokio::test]
async fn fails_on_closed_transport() {
    local(async {
        let (peer, transport, _events) = new_peer().await;
        calls_rtc::platform::RtcPeerConnection::close(&transport);

        assert!(matches!(
            error(peer.get_stats().await),
            PeerError::Transport(RtcPeerConnectionError::GetStats(_))
        ));
    })
    .await;
}
