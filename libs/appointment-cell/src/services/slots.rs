use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Produces candidate start times for the alternative-slot search.
///
/// Implementations must yield finite sequences and be restartable: calling
/// the same method twice with the same arguments yields the same candidates.
pub trait SlotGrid: Send + Sync {
    /// Candidates later on the same day as the originally requested start.
    fn later_same_day(&self, from: NaiveDateTime) -> Box<dyn Iterator<Item = NaiveDateTime> + Send>;

    /// Candidates within business hours on the given day.
    fn business_day(&self, date: NaiveDate) -> Box<dyn Iterator<Item = NaiveDateTime> + Send>;
}

/// Fixed probing grid: the first same-day candidate is one hour after the
/// requested start, then every 30 minutes until the date rolls over.
/// Business days are probed at 09:00-12:30 and 14:00-16:30 on the half hour.
pub struct FixedGrid;

const STEP_MINUTES: i64 = 30;
const FIRST_PROBE_OFFSET_HOURS: i64 = 1;
const BUSINESS_HOURS: [u32; 7] = [9, 10, 11, 12, 14, 15, 16];

impl SlotGrid for FixedGrid {
    fn later_same_day(&self, from: NaiveDateTime) -> Box<dyn Iterator<Item = NaiveDateTime> + Send> {
        let date = from.date();
        let first = from + Duration::hours(FIRST_PROBE_OFFSET_HOURS);

        Box::new(
            std::iter::successors(Some(first), |t| Some(*t + Duration::minutes(STEP_MINUTES)))
                .take_while(move |t| t.date() == date),
        )
    }

    fn business_day(&self, date: NaiveDate) -> Box<dyn Iterator<Item = NaiveDateTime> + Send> {
        Box::new(BUSINESS_HOURS.into_iter().flat_map(move |hour| {
            [0u32, 30].into_iter().map(move |minute| {
                date.and_hms_opt(hour, minute, 0)
                    .expect("business-hour grid is within a valid day")
            })
        }))
    }
}
