//! Normalization of raw [`RtcStats`] into a per-[SSRC] table.
//!
//! [SSRC]: https://webrtcglossary.com/ssrc

use std::collections::BTreeMap;

use calls_rtc_proto::stats::{
    MediaKind, RtcInboundRtpStreamStats, RtcOutboundRtpStreamStats,
    RtcRemoteInboundRtpStreamStats, RtcRemoteOutboundRtpStreamStats,
    RtcStatsType,
};
use serde::Serialize;

use crate::platform::RtcStats;

/// Normalized statistics keyed by [SSRC].
///
/// [SSRC]: https://webrtcglossary.com/ssrc
pub type StatsTable = BTreeMap<u32, SsrcStats>;

/// Statistics of a single [SSRC].
///
/// [SSRC]: https://webrtcglossary.com/ssrc
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SsrcStats {
    /// Streams as observed by this side.
    pub local: Direction<LocalInbound, LocalOutbound>,

    /// Streams as reported by the remote side.
    pub remote: Direction<RemoteInbound, RemoteOutbound>,
}

/// Inbound and outbound slots of [`SsrcStats`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Direction<I, O> {
    /// Statistics of the received stream.
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub inbound: Option<I>,

    /// Statistics of the sent stream.
    #[serde(rename = "out", skip_serializing_if = "Option::is_none")]
    pub outbound: Option<O>,
}

impl<I, O> Default for Direction<I, O> {
    fn default() -> Self {
        Self {
            inbound: None,
            outbound: None,
        }
    }
}

/// Fields kept from an `inbound-rtp` report.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalInbound {
    /// Kind of the received media.
    pub kind: Option<MediaKind>,

    /// Total number of RTP packets received.
    pub packets_received: Option<u64>,

    /// Total number of payload bytes received.
    pub bytes_received: Option<u64>,

    /// Total number of RTP packets lost.
    pub packets_lost: Option<i64>,

    /// Number of RTP packets discarded by the jitter buffer.
    pub packets_discarded: Option<u64>,

    /// Packet jitter in seconds.
    pub jitter: Option<f64>,

    /// Sum of the time each sample spent in the jitter buffer, in
    /// seconds.
    pub jitter_buffer_delay: Option<f64>,

    /// Number of NACK packets sent.
    pub nack_count: Option<u64>,

    /// Number of PLI packets sent.
    pub pli_count: Option<u64>,
}

impl From<&RtcInboundRtpStreamStats> for LocalInbound {
    fn from(s: &RtcInboundRtpStreamStats) -> Self {
        Self {
            kind: s.kind,
            packets_received: s.packets_received,
            bytes_received: s.bytes_received,
            packets_lost: s.packets_lost,
            packets_discarded: s.packets_discarded,
            jitter: s.jitter,
            jitter_buffer_delay: s.jitter_buffer_delay,
            nack_count: s.nack_count,
            pli_count: s.pli_count,
        }
    }
}

/// Fields kept from an `outbound-rtp` report.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalOutbound {
    /// Kind of the sent media.
    pub kind: Option<MediaKind>,

    /// Total number of RTP packets sent.
    pub packets_sent: Option<u64>,

    /// Total number of payload bytes sent.
    pub bytes_sent: Option<u64>,

    /// Number of RTP packets retransmitted.
    pub retransmitted_packets_sent: Option<u64>,

    /// Number of payload bytes retransmitted.
    pub retransmitted_bytes_sent: Option<u64>,

    /// Number of NACK packets received.
    pub nack_count: Option<u64>,

    /// Number of PLI packets received.
    pub pli_count: Option<u64>,

    /// Current encoder target in bits per second.
    pub target_bitrate: Option<f64>,
}

impl From<&RtcOutboundRtpStreamStats> for LocalOutbound {
    fn from(s: &RtcOutboundRtpStreamStats) -> Self {
        Self {
            kind: s.kind,
            packets_sent: s.packets_sent,
            bytes_sent: s.bytes_sent,
            retransmitted_packets_sent: s.retransmitted_packets_sent,
            retransmitted_bytes_sent: s.retransmitted_bytes_sent,
            nack_count: s.nack_count,
            pli_count: s.pli_count,
            target_bitrate: s.target_bitrate,
        }
    }
}

/// Fields kept from a `remote-inbound-rtp` report.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInbound {
    /// Kind of the media sent to the remote side.
    pub kind: Option<MediaKind>,

    /// Total number of RTP packets lost, as reported by the remote side.
    pub packets_lost: Option<i64>,

    /// Fraction of packets lost since the previous receiver report.
    pub fraction_lost: Option<f64>,

    /// Packet jitter measured by the remote side, in seconds.
    pub jitter: Option<f64>,

    /// Latest round trip time in seconds.
    pub round_trip_time: Option<f64>,
}

impl From<&RtcRemoteInboundRtpStreamStats> for RemoteInbound {
    fn from(s: &RtcRemoteInboundRtpStreamStats) -> Self {
        Self {
            kind: s.kind,
            packets_lost: s.packets_lost,
            fraction_lost: s.fraction_lost,
            jitter: s.jitter,
            round_trip_time: s.round_trip_time,
        }
    }
}

/// Fields kept from a `remote-outbound-rtp` report.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOutbound {
    /// Kind of the media received from the remote side.
    pub kind: Option<MediaKind>,

    /// Total number of RTP packets sent by the remote side.
    pub packets_sent: Option<u64>,

    /// Total number of payload bytes sent by the remote side.
    pub bytes_sent: Option<u64>,
}

impl From<&RtcRemoteOutboundRtpStreamStats> for RemoteOutbound {
    fn from(s: &RtcRemoteOutboundRtpStreamStats) -> Self {
        Self {
            kind: s.kind,
            packets_sent: s.packets_sent,
            bytes_sent: s.bytes_sent,
        }
    }
}

/// Groups RTP stream reports of the provided [`RtcStats`] by their [SSRC].
///
/// Reports without an [SSRC] and reports of other types are skipped. If the
/// same slot is reported more than once, the last report wins.
///
/// [SSRC]: https://webrtcglossary.com/ssrc
#[must_use]
pub fn normalize(stats: &RtcStats) -> StatsTable {
    let mut table = StatsTable::new();
    for stat in &stats.0 {
        let ssrc = match stat.stats.ssrc() {
            Some(ssrc) => ssrc,
            None => continue,
        };
        let entry = table.entry(ssrc).or_default();
        match &stat.stats {
            RtcStatsType::InboundRtp(s) => {
                entry.local.inbound = Some(s.as_ref().into());
            }
            RtcStatsType::OutboundRtp(s) => {
                entry.local.outbound = Some(s.as_ref().into());
            }
            RtcStatsType::RemoteInboundRtp(s) => {
                entry.remote.inbound = Some(s.as_ref().into());
            }
            RtcStatsType::RemoteOutboundRtp(s) => {
                entry.remote.outbound = Some(s.as_ref().into());
            }
            RtcStatsType::Other => {}
        }
    }
    table
}
