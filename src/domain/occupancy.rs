use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::domain::charging_session::{ChargingSession, PowerType};

pub const MINUTES_PER_DAY: usize = 24 * 60;

/// One minute of presence for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinuteSlot<K> {
    pub minute: NaiveDateTime,
    pub session_id: usize,
    pub category: K,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyPoint<K> {
    pub minute: NaiveDateTime,
    pub category: K,
    pub active_sessions: usize,
}

pub type OccupancyCounts<K> = BTreeMap<(NaiveDateTime, K), usize>;

/// Rounds to the nearest minute. Exact half minutes go to the even minute
/// counted from the Unix epoch.
pub fn round_to_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    let Some(truncated) = timestamp
        .with_second(0)
        .and_then(|value| value.with_nanosecond(0))
    else {
        return timestamp;
    };

    let remainder = timestamp - truncated;
    let round_up = match remainder.cmp(&TimeDelta::seconds(30)) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => epoch_minute(truncated).rem_euclid(2) == 1,
    };

    if round_up {
        truncated + TimeDelta::minutes(1)
    } else {
        truncated
    }
}

fn epoch_minute(timestamp: NaiveDateTime) -> i64 {
    timestamp.and_utc().timestamp().div_euclid(60)
}

/// Every minute from rounded `started` through rounded `ended`, inclusive.
/// A reversed range yields nothing.
pub fn expand_session_minutes(started: NaiveDateTime, ended: NaiveDateTime) -> Vec<NaiveDateTime> {
    minute_range(round_to_minute(started), round_to_minute(ended))
}

/// Rounded bounds of `session` clipped to the minutes of `day`. `None` when the
/// session covers no minute of that day.
pub fn session_bounds_on_day(
    session: &ChargingSession,
    day: NaiveDate,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let midnight = day.and_time(NaiveTime::MIN);
    let last_minute = midnight + TimeDelta::minutes(MINUTES_PER_DAY as i64 - 1);

    let first = round_to_minute(session.started).max(midnight);
    let last = round_to_minute(session.ended).min(last_minute);

    (first <= last).then_some((first, last))
}

fn minute_range(first: NaiveDateTime, last: NaiveDateTime) -> Vec<NaiveDateTime> {
    let mut minutes = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        minutes.push(cursor);
        cursor += TimeDelta::minutes(1);
    }

    minutes
}

/// Minute slots of every session on `day`. Sessions whose category is `None`
/// are left out.
pub fn explode_sessions<'a, K, I, F>(
    sessions: I,
    day: NaiveDate,
    category_of: F,
) -> Vec<MinuteSlot<K>>
where
    I: IntoIterator<Item = &'a ChargingSession>,
    K: Clone,
    F: Fn(&ChargingSession) -> Option<K>,
{
    let mut slots = Vec::new();

    for session in sessions {
        let Some(category) = category_of(session) else {
            continue;
        };
        let Some((first, last)) = session_bounds_on_day(session, day) else {
            continue;
        };

        slots.extend(minute_range(first, last).into_iter().map(|minute| MinuteSlot {
            minute,
            session_id: session.id,
            category: category.clone(),
        }));
    }

    slots
}

/// Distinct sessions per (minute, category). Minutes without any session are absent.
pub fn aggregate_occupancy<K>(slots: &[MinuteSlot<K>]) -> OccupancyCounts<K>
where
    K: Ord + Clone,
{
    let mut sessions_per_key: BTreeMap<(NaiveDateTime, K), HashSet<usize>> = BTreeMap::new();

    for slot in slots {
        sessions_per_key
            .entry((slot.minute, slot.category.clone()))
            .or_default()
            .insert(slot.session_id);
    }

    sessions_per_key
        .into_iter()
        .map(|(key, sessions)| (key, sessions.len()))
        .collect()
}

/// Full minute grid of `day` crossed with `categories`, zero filled, ordered by
/// minute then category.
pub fn normalize_day<K>(
    day: NaiveDate,
    categories: &BTreeSet<K>,
    counts: &OccupancyCounts<K>,
) -> Vec<OccupancyPoint<K>>
where
    K: Ord + Clone,
{
    let midnight = day.and_time(NaiveTime::MIN);
    let mut points = Vec::with_capacity(MINUTES_PER_DAY * categories.len());

    for offset in 0..MINUTES_PER_DAY as i64 {
        let minute = midnight + TimeDelta::minutes(offset);
        for category in categories {
            let active_sessions = counts
                .get(&(minute, category.clone()))
                .copied()
                .unwrap_or(0);
            points.push(OccupancyPoint {
                minute,
                category: category.clone(),
                active_sessions,
            });
        }
    }

    points
}

/// Concurrent sessions per minute of `day`, 1440 points.
pub fn occupancy_timeline<'a, I>(sessions: I, day: NaiveDate) -> Vec<OccupancyPoint<()>>
where
    I: IntoIterator<Item = &'a ChargingSession>,
{
    let slots = explode_sessions(sessions, day, |_| Some(()));
    let counts = aggregate_occupancy(&slots);

    normalize_day(day, &BTreeSet::from([()]), &counts)
}

/// Concurrent sessions per minute and power type, over the power types seen
/// among the sessions of `day`.
pub fn occupancy_timeline_by_power_type<'a, I>(
    sessions: I,
    day: NaiveDate,
) -> Vec<OccupancyPoint<PowerType>>
where
    I: IntoIterator<Item = &'a ChargingSession>,
{
    let day_sessions: Vec<&ChargingSession> = sessions
        .into_iter()
        .filter(|session| session_bounds_on_day(session, day).is_some())
        .collect();
    let categories: BTreeSet<PowerType> = day_sessions
        .iter()
        .filter_map(|session| session.power_type())
        .collect();

    let slots = explode_sessions(day_sessions, day, ChargingSession::power_type);
    let counts = aggregate_occupancy(&slots);

    normalize_day(day, &categories, &counts)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    use super::{
        MINUTES_PER_DAY, MinuteSlot, aggregate_occupancy, expand_session_minutes,
        explode_sessions, normalize_day, occupancy_timeline, occupancy_timeline_by_power_type,
        round_to_minute, session_bounds_on_day,
    };
    use crate::domain::charging_session::{ChargingSession, PowerType};

    fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").expect("timestamp should parse")
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, 2).expect("valid date")
    }

    fn session(id: usize, started: &str, ended: &str, total_energy_wh: f64) -> ChargingSession {
        ChargingSession {
            id,
            started: at(started),
            ended: at(ended),
            charge_time_hours: 1.0,
            connected_time_hours: 1.0,
            total_energy_wh,
            max_power_w: 3700.0,
        }
    }

    #[test]
    fn rounds_to_nearest_minute() {
        assert_eq!(round_to_minute(at("2018-01-02 10:00:29")), at("2018-01-02 10:00:00"));
        assert_eq!(round_to_minute(at("2018-01-02 10:00:31")), at("2018-01-02 10:01:00"));
        assert_eq!(round_to_minute(at("2018-01-02 23:59:45")), at("2018-01-03 00:00:00"));
    }

    #[test]
    fn half_minute_rounds_to_even_minute() {
        assert_eq!(round_to_minute(at("2018-01-02 10:01:30")), at("2018-01-02 10:02:00"));
        assert_eq!(round_to_minute(at("2018-01-02 10:02:30")), at("2018-01-02 10:02:00"));
    }

    #[test]
    fn equal_rounded_bounds_expand_to_one_minute() {
        let minutes = expand_session_minutes(at("2018-01-02 10:01:30"), at("2018-01-02 10:01:45"));
        assert_eq!(minutes, vec![at("2018-01-02 10:02:00")]);
    }

    #[test]
    fn expands_inclusive_range_one_minute_apart() {
        let minutes = expand_session_minutes(at("2018-01-02 09:59:50"), at("2018-01-02 10:05:10"));

        assert_eq!(minutes.len(), 6);
        assert_eq!(minutes.first(), Some(&at("2018-01-02 10:00:00")));
        assert_eq!(minutes.last(), Some(&at("2018-01-02 10:05:00")));
        assert!(
            minutes
                .windows(2)
                .all(|pair| pair[1] - pair[0] == TimeDelta::minutes(1))
        );
    }

    #[test]
    fn reversed_range_expands_to_nothing() {
        let minutes = expand_session_minutes(at("2018-01-02 11:00:00"), at("2018-01-02 10:00:00"));
        assert!(minutes.is_empty());
    }

    #[test]
    fn aggregation_counts_distinct_sessions() {
        let minute = at("2018-01-02 10:00:00");
        let slots = vec![
            MinuteSlot {
                minute,
                session_id: 1,
                category: (),
            },
            MinuteSlot {
                minute,
                session_id: 1,
                category: (),
            },
            MinuteSlot {
                minute,
                session_id: 2,
                category: (),
            },
        ];

        let counts = aggregate_occupancy(&slots);

        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(&(minute, ())), Some(&2));
    }

    #[test]
    fn normalizer_fills_gaps_with_zero() {
        let slots = vec![MinuteSlot {
            minute: at("2018-01-02 12:00:00"),
            session_id: 7,
            category: (),
        }];
        let counts = aggregate_occupancy(&slots);

        let points = normalize_day(day(), &BTreeSet::from([()]), &counts);

        assert_eq!(points.len(), MINUTES_PER_DAY);
        assert_eq!(points[0].minute, at("2018-01-02 00:00:00"));
        assert_eq!(points[MINUTES_PER_DAY - 1].minute, at("2018-01-02 23:59:00"));
        assert_eq!(points[720].active_sessions, 1);
        assert_eq!(
            points.iter().map(|point| point.active_sessions).sum::<usize>(),
            1
        );
        assert!(points.windows(2).all(|pair| pair[0].minute < pair[1].minute));
    }

    #[test]
    fn overlapping_sessions_produce_expected_occupancy() {
        let sessions = vec![
            session(0, "2018-01-02 10:00:00", "2018-01-02 10:02:00", 1000.0),
            session(1, "2018-01-02 10:01:30", "2018-01-02 10:01:45", 1000.0),
        ];

        let points = occupancy_timeline(&sessions, day());

        assert_eq!(points.len(), MINUTES_PER_DAY);
        assert_eq!(points[599].active_sessions, 0);
        assert_eq!(points[600].active_sessions, 1);
        assert_eq!(points[601].active_sessions, 1);
        assert_eq!(points[602].active_sessions, 2);
        assert_eq!(points[603].active_sessions, 0);
    }

    #[test]
    fn timeline_clips_sessions_from_neighbouring_days() {
        let sessions = vec![
            session(0, "2018-01-01 23:58:00", "2018-01-02 00:01:00", 1000.0),
            session(1, "2018-01-03 00:00:00", "2018-01-03 01:00:00", 1000.0),
        ];

        let points = occupancy_timeline(&sessions, day());

        assert_eq!(points.len(), MINUTES_PER_DAY);
        assert_eq!(points[0].active_sessions, 1);
        assert_eq!(points[1].active_sessions, 1);
        assert_eq!(points[2].active_sessions, 0);
        assert_eq!(points[MINUTES_PER_DAY - 1].active_sessions, 0);
    }

    #[test]
    fn power_type_timeline_crosses_every_minute_with_each_type() {
        let sessions = vec![
            session(0, "2018-01-02 10:00:00", "2018-01-02 10:02:00", 1000.0),
            session(1, "2018-01-02 10:01:00", "2018-01-02 10:01:00", 50_000.0),
        ];

        let points = occupancy_timeline_by_power_type(&sessions, day());

        assert_eq!(points.len(), MINUTES_PER_DAY * 2);
        assert_eq!(points[0].category, PowerType::Ac);
        assert_eq!(points[1].category, PowerType::Dc);
        assert_eq!(points[0].minute, points[1].minute);

        let at_1001: Vec<_> = points
            .iter()
            .filter(|point| point.minute == at("2018-01-02 10:01:00"))
            .map(|point| (point.category, point.active_sessions))
            .collect();
        assert_eq!(at_1001, vec![(PowerType::Ac, 1), (PowerType::Dc, 1)]);
    }

    #[test]
    fn power_type_timeline_skips_sessions_without_charge_time() {
        let mut idle = session(0, "2018-01-02 10:00:00", "2018-01-02 11:00:00", 0.0);
        idle.charge_time_hours = 0.0;

        let points = occupancy_timeline_by_power_type(&[idle.clone()], day());
        assert!(points.is_empty());

        let plain = occupancy_timeline(&[idle], day());
        assert_eq!(plain[600].active_sessions, 1);
    }

    #[test]
    fn session_rounding_past_midnight_counts_on_next_day() {
        let late = session(0, "2018-01-01 23:50:00", "2018-01-01 23:59:45", 1000.0);

        assert_eq!(
            expand_session_minutes(late.started, late.ended).last(),
            Some(&at("2018-01-02 00:00:00"))
        );

        let points = occupancy_timeline(std::slice::from_ref(&late), day());
        assert_eq!(points[0].active_sessions, 1);
        assert_eq!(points[1].active_sessions, 0);

        let by_type = occupancy_timeline_by_power_type(std::slice::from_ref(&late), day());
        assert_eq!(by_type.len(), MINUTES_PER_DAY);
        assert_eq!(by_type[0].active_sessions, 1);
    }

    #[test]
    fn sessions_land_on_the_day_of_their_rounded_minutes() {
        let early = session(0, "2018-01-02 00:00:10", "2018-01-02 00:00:20", 1000.0);
        let next_day = NaiveDate::from_ymd_opt(2018, 1, 3).expect("valid date");
        let late = session(1, "2018-01-02 23:59:20", "2018-01-02 23:59:25", 1000.0);

        assert!(session_bounds_on_day(&early, day()).is_some());
        assert_eq!(session_bounds_on_day(&late, next_day), None);
    }

    #[test]
    fn long_sessions_expand_only_within_the_day() {
        let runaway = session(0, "2018-01-01 20:00:00", "2099-12-31 23:00:00", 1000.0);

        let slots = explode_sessions([&runaway], day(), |_| Some(()));

        assert_eq!(slots.len(), MINUTES_PER_DAY);
        assert_eq!(slots.first().map(|slot| slot.minute), Some(at("2018-01-02 00:00:00")));
        assert_eq!(slots.last().map(|slot| slot.minute), Some(at("2018-01-02 23:59:00")));
    }

    #[test]
    fn empty_day_yields_flat_zero_timeline() {
        let points = occupancy_timeline(&Vec::<ChargingSession>::new(), day());
        assert_eq!(points.len(), MINUTES_PER_DAY);
        assert!(points.iter().all(|point| point.active_sessions == 0));
    }
}
