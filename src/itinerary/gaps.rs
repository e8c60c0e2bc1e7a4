//! Open-gap discovery over a working timeline

use chrono::NaiveTime;

use crate::domain::Coordinate;

/// One occupied window on the working timeline
///
/// `coordinate` is None for unresolved commitments, which reserve time but
/// take no part in distance computation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimelineStop {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub coordinate: Option<Coordinate>,
}

/// An open interval between occupied windows, eligible to host a meal
#[derive(Debug, Clone, Copy)]
pub(crate) struct Gap {
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Coordinate of the stop ending at `start`, when it has one
    pub before: Option<Coordinate>,
    /// Coordinate of the stop beginning at `end`, when it has one
    pub after: Option<Coordinate>,
}

impl Gap {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Find the open gaps in a timeline, bounded by the day window
///
/// `stops` must be sorted by start time. Overlapping stops are walked with
/// a running latest-end cursor, so they simply yield no gap between them.
pub(crate) fn find_gaps(stops: &[TimelineStop], day_start: NaiveTime, day_end: NaiveTime) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let mut cursor = day_start;
    let mut cursor_coord: Option<Coordinate> = None;

    for stop in stops {
        if stop.start > cursor {
            gaps.push(Gap {
                start: cursor,
                end: stop.start.min(day_end),
                before: cursor_coord,
                after: stop.coordinate,
            });
        }
        if stop.end > cursor {
            cursor = stop.end;
            cursor_coord = stop.coordinate;
        }
        if cursor >= day_end {
            return gaps;
        }
    }

    if cursor < day_end {
        gaps.push(Gap {
            start: cursor,
            end: day_end,
            before: cursor_coord,
            after: None,
        });
    }

    gaps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn stop(s: NaiveTime, e: NaiveTime, coord: bool) -> TimelineStop {
        TimelineStop {
            start: s,
            end: e,
            coordinate: coord.then(|| Coordinate::new(52.2, 0.12)),
        }
    }

    #[test]
    fn test_empty_timeline_is_one_gap() {
        let gaps = find_gaps(&[], t(9, 0), t(22, 0));
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, t(9, 0));
        assert_eq!(gaps[0].end, t(22, 0));
        assert!(gaps[0].before.is_none());
        assert!(gaps[0].after.is_none());
    }

    #[test]
    fn test_leading_middle_trailing_gaps() {
        let stops = [stop(t(10, 0), t(11, 0), true), stop(t(13, 0), t(14, 0), true)];
        let gaps = find_gaps(&stops, t(9, 0), t(22, 0));

        assert_eq!(gaps.len(), 3);

        assert_eq!((gaps[0].start, gaps[0].end), (t(9, 0), t(10, 0)));
        assert!(gaps[0].before.is_none());
        assert!(gaps[0].after.is_some());

        assert_eq!((gaps[1].start, gaps[1].end), (t(11, 0), t(13, 0)));
        assert!(gaps[1].before.is_some());
        assert!(gaps[1].after.is_some());

        assert_eq!((gaps[2].start, gaps[2].end), (t(14, 0), t(22, 0)));
        assert!(gaps[2].after.is_none());
    }

    #[test]
    fn test_adjacent_stops_yield_no_gap() {
        let stops = [stop(t(9, 0), t(12, 0), true), stop(t(12, 0), t(14, 0), true)];
        let gaps = find_gaps(&stops, t(9, 0), t(14, 0));
        assert!(gaps.is_empty());
    }

    #[test]
    fn test_overlapping_stops_walked_by_latest_end() {
        let stops = [stop(t(9, 0), t(12, 0), true), stop(t(10, 0), t(11, 0), true)];
        let gaps = find_gaps(&stops, t(9, 0), t(14, 0));
        assert_eq!(gaps.len(), 1);
        assert_eq!((gaps[0].start, gaps[0].end), (t(12, 0), t(14, 0)));
    }

    #[test]
    fn test_unresolved_stop_reserves_time_without_coordinate() {
        let stops = [stop(t(11, 0), t(12, 0), false)];
        let gaps = find_gaps(&stops, t(9, 0), t(14, 0));

        assert_eq!(gaps.len(), 2);
        assert!(gaps[0].after.is_none());
        assert!(gaps[1].before.is_none());
    }

    #[test]
    fn test_stop_outside_day_bounds_clamped() {
        let stops = [stop(t(7, 0), t(8, 0), true), stop(t(21, 0), t(23, 0), true)];
        let gaps = find_gaps(&stops, t(9, 0), t(22, 0));

        assert_eq!(gaps.len(), 1);
        assert_eq!((gaps[0].start, gaps[0].end), (t(9, 0), t(21, 0)));
    }

    #[test]
    fn test_gap_minutes() {
        let gap = Gap {
            start: t(11, 0),
            end: t(12, 30),
            before: None,
            after: None,
        };
        assert_eq!(gap.minutes(), 90);
    }
}
