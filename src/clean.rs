//! Record cleaning: a chain of stages over owned record sequences.
//!
//! Stage order matters and is fixed by [`clean`]:
//! dedup, passenger-count fill, distance filter, then timestamp parsing with
//! duration derivation.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime};
use tracing::debug;

use crate::error::{Result, TripDataError};
use crate::schema::{CanonicalField, NormalizedTrip, RawTimestamp};

/// Longest trip, in distance units, that is still considered plausible.
pub const MAX_TRIP_DISTANCE: f64 = 100.0;

const DEFAULT_PASSENGER_COUNT: f64 = 1.0;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A cleaned trip, ready for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTrip {
    pub vendor_id: Option<i64>,
    pub pickup_time: NaiveDateTime,
    pub dropoff_time: NaiveDateTime,
    pub passenger_count: i64,
    pub pickup_zone: Option<i64>,
    pub dropoff_zone: Option<i64>,
    pub trip_distance: f64,
    pub fare_amount: Option<f64>,
    pub tip_amount: Option<f64>,
    /// Whole minutes from pickup to drop-off, truncated toward zero. Negative
    /// when the drop-off precedes the pickup.
    pub trip_duration_minutes: i64,
}

/// Runs every cleaning stage in order.
pub fn clean(trips: Vec<NormalizedTrip>) -> Result<Vec<CanonicalTrip>> {
    let loaded = trips.len();
    let trips = deduplicate(trips);
    let unique = trips.len();
    let trips = fill_passenger_count(trips);
    let trips = filter_distance(trips);
    debug!(loaded, unique, kept = trips.len(), "Trips cleaned");

    derive_durations(trips)
}

/// Equality key over every canonical field. Floats compare by bit pattern,
/// with `-0.0` folded onto `0.0` and all NaNs onto one NaN.
#[derive(PartialEq, Eq, Hash)]
struct DedupKey {
    vendor_id: Option<i64>,
    pickup_time: RawTimestamp,
    dropoff_time: RawTimestamp,
    passenger_count: Option<u64>,
    pickup_zone: Option<i64>,
    dropoff_zone: Option<i64>,
    trip_distance: Option<u64>,
    fare_amount: Option<u64>,
    tip_amount: Option<u64>,
}

fn float_bits(v: Option<f64>) -> Option<u64> {
    v.map(|f| {
        if f == 0.0 {
            0.0f64.to_bits()
        } else if f.is_nan() {
            f64::NAN.to_bits()
        } else {
            f.to_bits()
        }
    })
}

impl From<&NormalizedTrip> for DedupKey {
    fn from(t: &NormalizedTrip) -> Self {
        Self {
            vendor_id: t.vendor_id,
            pickup_time: t.pickup_time.clone(),
            dropoff_time: t.dropoff_time.clone(),
            passenger_count: float_bits(t.passenger_count),
            pickup_zone: t.pickup_zone,
            dropoff_zone: t.dropoff_zone,
            trip_distance: float_bits(t.trip_distance),
            fare_amount: float_bits(t.fare_amount),
            tip_amount: float_bits(t.tip_amount),
        }
    }
}

/// Drops rows identical to an earlier row, keeping first occurrences in order.
pub fn deduplicate(trips: Vec<NormalizedTrip>) -> Vec<NormalizedTrip> {
    let mut seen = HashSet::with_capacity(trips.len());
    trips
        .into_iter()
        .filter(|t| seen.insert(DedupKey::from(t)))
        .collect()
}

/// Replaces a missing (or NaN) passenger count with 1 and truncates the rest
/// to whole passengers.
pub fn fill_passenger_count(trips: Vec<NormalizedTrip>) -> Vec<NormalizedTrip> {
    trips
        .into_iter()
        .map(|mut t| {
            let count = t
                .passenger_count
                .filter(|c| !c.is_nan())
                .unwrap_or(DEFAULT_PASSENGER_COUNT);
            t.passenger_count = Some(count.trunc());
            t
        })
        .collect()
}

/// Keeps trips whose distance is non-zero and at most [`MAX_TRIP_DISTANCE`].
/// A missing distance never passes.
pub fn filter_distance(trips: Vec<NormalizedTrip>) -> Vec<NormalizedTrip> {
    trips
        .into_iter()
        .filter(|t| {
            t.trip_distance
                .is_some_and(|d| d != 0.0 && d <= MAX_TRIP_DISTANCE)
        })
        .collect()
}

/// Parses both timestamps of every trip and derives its duration.
///
/// The first timestamp that cannot be parsed fails the whole sequence.
pub fn derive_durations(trips: Vec<NormalizedTrip>) -> Result<Vec<CanonicalTrip>> {
    trips
        .into_iter()
        .map(|t| {
            let pickup_time = parse_timestamp(&t.pickup_time, CanonicalField::PickupTime)?;
            let dropoff_time = parse_timestamp(&t.dropoff_time, CanonicalField::DropoffTime)?;

            Ok(CanonicalTrip {
                vendor_id: t.vendor_id,
                pickup_time,
                dropoff_time,
                passenger_count: t.passenger_count.unwrap_or(DEFAULT_PASSENGER_COUNT) as i64,
                pickup_zone: t.pickup_zone,
                dropoff_zone: t.dropoff_zone,
                // filter_distance guarantees presence
                trip_distance: t.trip_distance.unwrap_or_default(),
                fare_amount: t.fare_amount,
                tip_amount: t.tip_amount,
                trip_duration_minutes: duration_minutes(pickup_time, dropoff_time),
            })
        })
        .collect()
}

/// Elapsed whole minutes between `pickup` and `dropoff`, truncated toward zero.
pub fn duration_minutes(pickup: NaiveDateTime, dropoff: NaiveDateTime) -> i64 {
    (dropoff - pickup).num_seconds() / 60
}

fn parse_timestamp(raw: &RawTimestamp, field: CanonicalField) -> Result<NaiveDateTime> {
    let malformed = |value: String| TripDataError::MalformedTimestamp {
        column: field.name(),
        value,
    };

    match raw {
        RawTimestamp::Micros(us) => DateTime::from_timestamp_micros(*us)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| malformed(format!("{us}us since epoch"))),
        RawTimestamp::Text(text) => {
            let trimmed = text.trim();
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .ok_or_else(|| malformed(text.clone()))
        }
        RawTimestamp::Missing => Err(malformed("null".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trip(distance: f64) -> NormalizedTrip {
        NormalizedTrip {
            vendor_id: Some(1),
            pickup_time: RawTimestamp::Text("2023-01-01 08:00:00".to_string()),
            dropoff_time: RawTimestamp::Text("2023-01-01 08:10:00".to_string()),
            passenger_count: Some(1.0),
            pickup_zone: Some(100),
            dropoff_zone: Some(200),
            trip_distance: Some(distance),
            fare_amount: Some(10.0),
            tip_amount: Some(1.0),
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence_order() {
        let a = trip(1.0);
        let b = trip(2.0);
        let out = deduplicate(vec![a.clone(), b.clone(), a.clone(), b.clone(), a.clone()]);
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn test_deduplicate_is_idempotent() {
        let trips = vec![trip(1.0), trip(2.0), trip(1.0), trip(3.0)];
        let once = deduplicate(trips);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_deduplicate_requires_every_field_equal() {
        let a = trip(1.0);
        let mut b = trip(1.0);
        b.tip_amount = Some(1.5);
        assert_eq!(deduplicate(vec![a, b]).len(), 2);
    }

    #[test]
    fn test_deduplicate_treats_missing_values_as_equal() {
        let mut a = trip(1.0);
        a.passenger_count = None;
        a.fare_amount = Some(f64::NAN);
        assert_eq!(deduplicate(vec![a.clone(), a]).len(), 1);
    }

    #[test]
    fn test_missing_passenger_count_defaults_to_one() {
        let mut t = trip(1.0);
        t.passenger_count = None;
        let out = fill_passenger_count(vec![t]);
        assert_eq!(out[0].passenger_count, Some(1.0));
    }

    #[test]
    fn test_passenger_count_truncates() {
        let mut t = trip(1.0);
        t.passenger_count = Some(2.9);
        let out = fill_passenger_count(vec![t]);
        assert_eq!(out[0].passenger_count, Some(2.0));
    }

    #[test]
    fn test_distance_filter_boundaries() {
        let out = filter_distance(vec![trip(0.0), trip(100.0), trip(100.0001), trip(0.01)]);
        let kept: Vec<f64> = out.iter().filter_map(|t| t.trip_distance).collect();
        assert_eq!(kept, vec![100.0, 0.01]);
    }

    #[test]
    fn test_distance_filter_drops_missing_distance() {
        let mut t = trip(1.0);
        t.trip_distance = None;
        assert!(filter_distance(vec![t]).is_empty());
    }

    #[test]
    fn test_duration_truncates_toward_zero() {
        assert_eq!(duration_minutes(at(8, 0, 0), at(8, 10, 0)), 10);
        assert_eq!(duration_minutes(at(8, 0, 0), at(8, 10, 59)), 10);
        assert_eq!(duration_minutes(at(8, 10, 0), at(8, 0, 0)), -10);
        assert_eq!(duration_minutes(at(8, 0, 30), at(8, 0, 0)), 0);
    }

    #[test]
    fn test_negative_durations_pass_through() {
        let mut t = trip(1.0);
        t.pickup_time = RawTimestamp::Text("2023-01-01 09:00:00".to_string());
        let out = clean(vec![t]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].trip_duration_minutes, -50);
    }

    #[test]
    fn test_epoch_micros_timestamps() {
        let mut t = trip(1.0);
        t.pickup_time = RawTimestamp::Micros(0);
        t.dropoff_time = RawTimestamp::Micros(5 * 60 * 1_000_000);
        let out = derive_durations(vec![t]).unwrap();
        assert_eq!(out[0].trip_duration_minutes, 5);
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(out[0].pickup_time, epoch);
    }

    #[test]
    fn test_iso_and_fractional_text_timestamps() {
        let mut t = trip(1.0);
        t.pickup_time = RawTimestamp::Text("2023-01-01T08:00:00".to_string());
        t.dropoff_time = RawTimestamp::Text("2023-01-01 08:03:00.500".to_string());
        let out = derive_durations(vec![t]).unwrap();
        assert_eq!(out[0].trip_duration_minutes, 3);
    }

    #[test]
    fn test_malformed_timestamp_fails() {
        let mut t = trip(1.0);
        t.dropoff_time = RawTimestamp::Text("not a time".to_string());
        let err = clean(vec![t]).unwrap_err();
        match err {
            TripDataError::MalformedTimestamp { column, value } => {
                assert_eq!(column, "dropoff_datetime");
                assert_eq!(value, "not a time");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_filtered_rows_are_not_parsed() {
        let mut t = trip(0.0);
        t.pickup_time = RawTimestamp::Missing;
        assert!(clean(vec![t]).unwrap().is_empty());
    }

    #[test]
    fn test_clean_casts_passenger_count() {
        let mut t = trip(4.0);
        t.passenger_count = Some(3.0);
        let out = clean(vec![t]).unwrap();
        assert_eq!(out[0].passenger_count, 3);
        assert_eq!(out[0].trip_distance, 4.0);
    }
}
