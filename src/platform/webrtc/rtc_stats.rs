//! Conversion of [webrtc-rs] statistics reports into [`RtcStats`].
//!
//! [webrtc-rs]: https://github.com/webrtc-rs/webrtc

use std::time::SystemTime;

use calls_rtc_proto::stats::{
    HighResTimeStamp, MediaKind, RtcInboundRtpStreamStats,
    RtcOutboundRtpStreamStats, RtcRemoteInboundRtpStreamStats,
    RtcRemoteOutboundRtpStreamStats, RtcStat, RtcStatsType,
};
use webrtc::stats::{StatsReport, StatsReportType};

use crate::platform::RtcStats;

impl From<StatsReport> for RtcStats {
    fn from(report: StatsReport) -> Self {
        let timestamp: HighResTimeStamp = SystemTime::now().into();
        let mut stats: Vec<_> = report
            .reports
            .into_iter()
            .filter_map(|(id, report)| {
                Some(RtcStat {
                    id: id.into(),
                    timestamp,
                    stats: convert(report)?,
                })
            })
            .collect();
        stats.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Self(stats)
    }
}

/// Converts a single RTP stream report. Reports of other types are dropped.
fn convert(report: StatsReportType) -> Option<RtcStatsType> {
    Some(match report {
        StatsReportType::InboundRTP(s) => {
            RtcStatsType::InboundRtp(Box::new(RtcInboundRtpStreamStats {
                ssrc: Some(s.ssrc),
                kind: media_kind(&s.kind),
                packets_received: Some(s.packets_received),
                bytes_received: Some(s.bytes_received),
                nack_count: Some(s.nack_count),
                pli_count: s.pli_count,
                ..RtcInboundRtpStreamStats::default()
            }))
        }
        StatsReportType::OutboundRTP(s) => {
            RtcStatsType::OutboundRtp(Box::new(RtcOutboundRtpStreamStats {
                ssrc: Some(s.ssrc),
                kind: media_kind(&s.kind),
                packets_sent: Some(s.packets_sent),
                bytes_sent: Some(s.bytes_sent),
                nack_count: Some(s.nack_count),
                pli_count: s.pli_count,
                ..RtcOutboundRtpStreamStats::default()
            }))
        }
        StatsReportType::RemoteInboundRTP(s) => RtcStatsType::RemoteInboundRtp(
            Box::new(RtcRemoteInboundRtpStreamStats {
                ssrc: Some(s.ssrc),
                kind: media_kind(&s.kind),
                local_id: Some(s.local_id),
                packets_lost: Some(s.packets_lost),
                fraction_lost: Some(s.fraction_lost),
                round_trip_time: s.round_trip_time,
                ..RtcRemoteInboundRtpStreamStats::default()
            }),
        ),
        StatsReportType::RemoteOutboundRTP(s) => {
            RtcStatsType::RemoteOutboundRtp(Box::new(
                RtcRemoteOutboundRtpStreamStats {
                    ssrc: Some(s.ssrc),
                    kind: media_kind(&s.kind),
                    packets_sent: Some(s.packets_sent),
                    local_id: Some(s.local_id),
                    bytes_sent: Some(s.bytes_sent),
                    ..RtcRemoteOutboundRtpStreamStats::default()
                },
            ))
        }
        _ => return None,
    })
}

fn media_kind(kind: &str) -> Option<MediaKind> {
    match kind {
        "audio" => Some(MediaKind::Audio),
        "video" => Some(MediaKind::Video),
        _ => None,
    }
}
