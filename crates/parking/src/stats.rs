//! Simple counts over stored parking events.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::types::ParkingEvent;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingStats {
    pub total_events: usize,
    pub active_events: usize,
    /// Events that started on `now`'s calendar day in the reporting timezone.
    pub events_today: usize,
    /// Events that started in the seven days before `now`.
    pub events_this_week: usize,
    /// Mean duration of closed events; 0 when none have closed.
    pub average_duration_minutes: f64,
    pub last_event_time: Option<DateTime<FixedOffset>>,
}

impl ParkingStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_events<'a>(
        events: impl IntoIterator<Item = &'a ParkingEvent>, now: DateTime<Utc>, tz: Tz,
    ) -> Self {
        let today = now.with_timezone(&tz).date_naive();
        let week_start = now - TimeDelta::days(7);

        let mut stats = Self::default();
        let mut duration_sum = 0_i64;
        let mut closed = 0_usize;

        for event in events {
            stats.total_events += 1;
            if event.is_active {
                stats.active_events += 1;
            }
            if event.started_at.with_timezone(&tz).date_naive() == today {
                stats.events_today += 1;
            }
            if event.started_at.with_timezone(&Utc) > week_start {
                stats.events_this_week += 1;
            }
            if let Some(minutes) = event.total_duration_minutes {
                duration_sum += minutes;
                closed += 1;
            }
            if stats.last_event_time.is_none_or(|last| event.started_at > last) {
                stats.last_event_time = Some(event.started_at);
            }
        }

        if closed > 0 {
            stats.average_duration_minutes = duration_sum as f64 / closed as f64;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn event(started: &str, minutes: Option<i64>) -> ParkingEvent {
        let started_at = DateTime::parse_from_rfc3339(started).expect("should parse");
        ParkingEvent {
            id: Some(1),
            vehicle_id: "V1".to_string(),
            driver_id: None,
            route_id: None,
            started_at,
            ended_at: minutes.map(|m| started_at + TimeDelta::minutes(m)),
            total_duration_minutes: minutes,
            final_latitude: 4.7,
            final_longitude: -74.0,
            is_active: minutes.is_none(),
        }
    }

    #[test]
    fn counts() {
        let now = DateTime::parse_from_rfc3339("2025-03-10T12:00:00-05:00")
            .expect("should parse")
            .with_timezone(&Utc);
        let events = [
            event("2025-03-10T08:00:00-05:00", Some(20)),
            // 2025-03-10 in UTC but 2025-03-09 in Bogota
            event("2025-03-10T03:00:00Z", Some(40)),
            event("2025-03-10T11:30:00-05:00", None),
            event("2025-02-01T08:00:00-05:00", Some(30)),
        ];

        let stats = ParkingStats::from_events(&events, now, chrono_tz::America::Bogota);
        assert_eq!(
            stats,
            ParkingStats {
                total_events: 4,
                active_events: 1,
                events_today: 2,
                events_this_week: 3,
                average_duration_minutes: 30.0,
                last_event_time: Some(events[2].started_at),
            }
        );
    }

    #[test]
    fn empty() {
        let stats = ParkingStats::from_events(&[], Utc::now(), chrono_tz::UTC);
        assert_eq!(stats, ParkingStats::default());
    }
}
