//! Contains DTOs for raw [RTCPeerConnection] statistics reports.
//!
//! Only the [RTP] stream reports are modeled, every other report type is
//! deserialized into [`RtcStatsType::Other`].
//!
//! [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
//! [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol

#![allow(clippy::module_name_repetitions)]

use std::time::{Duration, SystemTime};

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Unique ID that is associated with the object that was inspected to produce
/// [`RtcStat`] object.
#[derive(
    Clone, Debug, Deserialize, Display, Eq, From, Hash, PartialEq, Serialize,
)]
#[from(forward)]
pub struct StatId(pub String);

/// Represents the [stats object] constructed by inspecting a specific
/// [monitored object].
///
/// [stats object]: https://w3.org/TR/webrtc-stats/#dfn-stats-object
/// [monitored object]: https://w3.org/TR/webrtc-stats/#dfn-monitored-object
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RtcStat {
    /// Unique ID that is associated with the object that was inspected to
    /// produce this [RTCStats] object.
    ///
    /// [RTCStats]: https://w3.org/TR/webrtc/#dom-rtcstats
    pub id: StatId,

    /// Timestamp associated with this object.
    ///
    /// The time is relative to the UNIX epoch (Jan 1, 1970, UTC).
    pub timestamp: HighResTimeStamp,

    /// Actual stats of this [`RtcStat`].
    #[serde(flatten)]
    pub stats: RtcStatsType,
}

/// Known types of [`RtcStat`]s.
///
/// [List of all RTCStats types on W3C][1].
///
/// [1]: https://w3.org/TR/webrtc-stats/#rtctatstype-%2A
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RtcStatsType {
    /// Statistics for an inbound [RTP] stream that is currently received with
    /// [RTCPeerConnection] object.
    ///
    /// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
    /// [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
    InboundRtp(Box<RtcInboundRtpStreamStats>),

    /// Statistics for an outbound [RTP] stream that is currently sent with
    /// [RTCPeerConnection] object.
    ///
    /// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
    /// [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
    OutboundRtp(Box<RtcOutboundRtpStreamStats>),

    /// Statistics for the remote endpoint's inbound [RTP] stream corresponding
    /// to an outbound stream that is currently sent with [RTCPeerConnection]
    /// object.
    ///
    /// It is measured at the remote endpoint and reported in a RTCP Receiver
    /// Report (RR) or RTCP Extended Report (XR).
    ///
    /// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
    /// [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
    RemoteInboundRtp(Box<RtcRemoteInboundRtpStreamStats>),

    /// Statistics for the remote endpoint's outbound [RTP] stream
    /// corresponding to an inbound stream that is currently received with
    /// [RTCPeerConnection] object.
    ///
    /// It is measured at the remote endpoint and reported in an RTCP Sender
    /// Report (SR).
    ///
    /// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
    /// [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
    RemoteOutboundRtp(Box<RtcRemoteOutboundRtpStreamStats>),

    /// Any report type not listed above (`codec`, `candidate-pair`,
    /// `transport`, and so on).
    #[serde(other)]
    Other,
}

impl RtcStatsType {
    /// Returns the synchronization source identifier this report describes,
    /// if any.
    #[must_use]
    pub fn ssrc(&self) -> Option<u32> {
        match self {
            Self::InboundRtp(s) => s.ssrc,
            Self::OutboundRtp(s) => s.ssrc,
            Self::RemoteInboundRtp(s) => s.ssrc,
            Self::RemoteOutboundRtp(s) => s.ssrc,
            Self::Other => None,
        }
    }
}

/// Kind of the media an [RTP] stream carries.
///
/// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio stream.
    #[display(fmt = "audio")]
    Audio,

    /// Video stream.
    #[display(fmt = "video")]
    Video,
}

/// Representation of the measurement metrics for the incoming [RTP] media
/// stream.
///
/// [`RtcStatsType::InboundRtp`] variant.
///
/// [Full doc on W3C][1].
///
/// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
/// [1]: https://w3.org/TR/webrtc-stats/#dom-rtcinboundrtpstreamstats
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcInboundRtpStreamStats {
    /// Synchronization source identifier of this stream.
    pub ssrc: Option<u32>,

    /// Kind of the received media.
    pub kind: Option<MediaKind>,

    /// Total number of RTP data packets received for this SSRC.
    pub packets_received: Option<u64>,

    /// Total number of bytes received for this SSRC.
    pub bytes_received: Option<u64>,

    /// Total number of RTP data packets for this SSRC that have been lost
    /// since the beginning of reception.
    ///
    /// May be negative if there are duplicates.
    pub packets_lost: Option<i64>,

    /// Total number of RTP packets discarded by the jitter buffer due to late
    /// or early-arrival.
    pub packets_discarded: Option<u64>,

    /// Packet jitter measured in seconds for this SSRC.
    pub jitter: Option<f64>,

    /// Sum of the time, in seconds, each audio sample or video frame takes
    /// from the time it's received to the time it exits the jitter buffer.
    pub jitter_buffer_delay: Option<f64>,

    /// Total number of Negative ACKnowledgement packets sent by this
    /// receiver.
    pub nack_count: Option<u64>,

    /// Total number of Picture Loss Indication packets sent by this receiver.
    pub pli_count: Option<u64>,
}

/// Statistics for an outbound [RTP] stream that is currently sent with this
/// [RTCPeerConnection] object.
///
/// [`RtcStatsType::OutboundRtp`] variant.
///
/// [Full doc on W3C][1].
///
/// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
/// [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
/// [1]: https://w3.org/TR/webrtc-stats/#outboundrtpstats-dict%2A
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcOutboundRtpStreamStats {
    /// Synchronization source identifier of this stream.
    pub ssrc: Option<u32>,

    /// Kind of the sent media.
    pub kind: Option<MediaKind>,

    /// Total number of RTP packets sent for this SSRC.
    pub packets_sent: Option<u64>,

    /// Total number of bytes sent for this SSRC.
    pub bytes_sent: Option<u64>,

    /// Total number of packets that were retransmitted for this SSRC.
    pub retransmitted_packets_sent: Option<u64>,

    /// Total number of bytes that were retransmitted for this SSRC, only
    /// including payload bytes.
    pub retransmitted_bytes_sent: Option<u64>,

    /// Total number of Negative ACKnowledgement packets received by this
    /// sender.
    pub nack_count: Option<u64>,

    /// Total number of Picture Loss Indication packets received by this
    /// sender.
    pub pli_count: Option<u64>,

    /// Current encoder target in bits per second.
    pub target_bitrate: Option<f64>,
}

/// Statistics for the remote endpoint's inbound [RTP] stream corresponding
/// to an outbound stream that is currently sent with [RTCPeerConnection]
/// object.
///
/// [`RtcStatsType::RemoteInboundRtp`] variant.
///
/// [Full doc on W3C][1].
///
/// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
/// [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
/// [1]: https://w3.org/TR/webrtc-stats/#dom-rtcremoteinboundrtpstreamstats
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcRemoteInboundRtpStreamStats {
    /// Synchronization source identifier of this stream.
    pub ssrc: Option<u32>,

    /// Kind of the media the remote endpoint receives.
    pub kind: Option<MediaKind>,

    /// [`localId`] is used for looking up the local
    /// [RTCOutboundRtpStreamStats] object for the same SSRC.
    ///
    /// [`localId`]: https://tinyurl.com/r8uhbo9
    /// [RTCOutBoundRtpStreamStats]: https://tinyurl.com/r6f5vqg
    pub local_id: Option<String>,

    /// Total number of RTP data packets for this SSRC that the remote
    /// endpoint reported lost.
    pub packets_lost: Option<i64>,

    /// Fraction packet loss reported for this SSRC. Calculated as defined in
    /// [Section 6.4.1 of RFC 3550][1] and [Appendix A.3][2].
    ///
    /// [1]: https://tools.ietf.org/html/rfc3550#section-6.4.1
    /// [2]: https://tools.ietf.org/html/rfc3550#appendix-A.3
    pub fraction_lost: Option<f64>,

    /// Packet jitter measured in seconds for this SSRC.
    pub jitter: Option<f64>,

    /// Estimated round trip time for this SSRC based on the RTCP timestamps
    /// in the RTCP Receiver Report (RR) and measured in seconds.
    pub round_trip_time: Option<f64>,
}

/// Statistics for the remote endpoint's outbound [RTP] stream corresponding
/// to an inbound stream that is currently received with [RTCPeerConnection]
/// object.
///
/// [`RtcStatsType::RemoteOutboundRtp`] variant.
///
/// [Full doc on W3C][1].
///
/// [RTP]: https://en.wikipedia.org/wiki/Real-time_Transport_Protocol
/// [RTCPeerConnection]: https://w3.org/TR/webrtc/#dom-rtcpeerconnection
/// [1]: https://w3.org/TR/webrtc-stats/#remoteoutboundrtpstats-dict%2A
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcRemoteOutboundRtpStreamStats {
    /// Synchronization source identifier of this stream.
    pub ssrc: Option<u32>,

    /// Kind of the media the remote endpoint sends.
    pub kind: Option<MediaKind>,

    /// [`localId`] is used for looking up the local
    /// [RTCInboundRtpStreamStats][1] object for the same SSRC.
    ///
    /// [`localId`]: https://tinyurl.com/vu9tb2e
    /// [1]: https://w3.org/TR/webrtc-stats/#dom-rtcinboundrtpstreamstats
    pub local_id: Option<String>,

    /// Total number of RTP packets the remote endpoint sent for this SSRC.
    pub packets_sent: Option<u64>,

    /// Total number of bytes the remote endpoint sent for this SSRC.
    pub bytes_sent: Option<u64>,

    /// Remote timestamp at which these statistics were sent by the remote
    /// endpoint.
    pub remote_timestamp: Option<HighResTimeStamp>,
}

/// [DOMHighResTimeStamp][1] (which is simply a count of milliseconds).
///
/// [1]: https://developer.mozilla.org/docs/Web/API/DOMHighResTimeStamp
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct HighResTimeStamp(pub f64);

impl From<HighResTimeStamp> for SystemTime {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[inline]
    fn from(timestamp: HighResTimeStamp) -> Self {
        SystemTime::UNIX_EPOCH + Duration::from_millis(timestamp.0 as u64)
    }
}

impl From<SystemTime> for HighResTimeStamp {
    #[allow(clippy::cast_precision_loss)]
    #[inline]
    fn from(time: SystemTime) -> Self {
        HighResTimeStamp(
            time.duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as f64,
        )
    }
}
