//! Data types produced by the aggregation stage.

use serde::Serialize;

/// Summary statistics for one vendor, serialized as one output row.
///
/// Field renames are the on-disk column headers read by downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorAggregate {
    #[serde(rename = "VendorID")]
    pub vendor_id: i64,
    #[serde(rename = "trip_count")]
    pub trip_count: usize,
    #[serde(rename = "sum_passenger")]
    pub sum_passengers: i64,
    #[serde(rename = "total_trip_duration (min)")]
    pub total_trip_duration_minutes: i64,
    #[serde(rename = "mode_PULocationID")]
    pub mode_pickup_zone: Option<i64>,
    #[serde(rename = "mode_DOLocationID")]
    pub mode_dropoff_zone: Option<i64>,
    #[serde(rename = "sum_distance (km)")]
    pub sum_trip_distance: f64,
    #[serde(rename = "sum_fare_amount")]
    pub sum_fare_amount: f64,
    #[serde(rename = "mean_tipAmount")]
    pub mean_tip_amount: f64,
}

/// Column headers in output order, matching the serde renames above.
pub const SUMMARY_HEADERS: [&str; 9] = [
    "VendorID",
    "trip_count",
    "sum_passenger",
    "total_trip_duration (min)",
    "mode_PULocationID",
    "mode_DOLocationID",
    "sum_distance (km)",
    "sum_fare_amount",
    "mean_tipAmount",
];
