use std::collections::BTreeMap;

use tracing::debug;

use crate::clean::CanonicalTrip;
use crate::summary::types::VendorAggregate;
use crate::summary::utility::{mean, mode};

/// Groups cleaned trips by vendor and summarizes each group.
///
/// Rows come back in ascending vendor order. Trips without a vendor
/// identifier belong to no group. Within a group, row order is the order of
/// `trips`, which is what the zone-mode tie-break relies on.
pub fn aggregate_by_vendor(trips: &[CanonicalTrip]) -> Vec<VendorAggregate> {
    let mut groups: BTreeMap<i64, Vec<&CanonicalTrip>> = BTreeMap::new();
    let mut ungrouped = 0usize;

    for trip in trips {
        match trip.vendor_id {
            Some(vendor_id) => groups.entry(vendor_id).or_default().push(trip),
            None => ungrouped += 1,
        }
    }

    debug!(vendors = groups.len(), ungrouped, "Trips grouped by vendor");

    groups
        .into_iter()
        .map(|(vendor_id, group)| summarize_vendor(vendor_id, &group))
        .collect()
}

fn summarize_vendor(vendor_id: i64, group: &[&CanonicalTrip]) -> VendorAggregate {
    // missing tips count as zero so the mean runs over every trip
    let tips: Vec<f64> = group
        .iter()
        .map(|t| t.tip_amount.filter(|v| !v.is_nan()).unwrap_or(0.0))
        .collect();

    VendorAggregate {
        vendor_id,
        trip_count: group.len(),
        sum_passengers: group.iter().map(|t| t.passenger_count).sum(),
        total_trip_duration_minutes: group.iter().map(|t| t.trip_duration_minutes).sum(),
        mode_pickup_zone: mode(group.iter().filter_map(|t| t.pickup_zone)),
        mode_dropoff_zone: mode(group.iter().filter_map(|t| t.dropoff_zone)),
        sum_trip_distance: group.iter().map(|t| t.trip_distance).sum(),
        sum_fare_amount: group
            .iter()
            .filter_map(|t| t.fare_amount)
            .filter(|v| !v.is_nan())
            .sum(),
        mean_tip_amount: mean(&tips),
    }
}
