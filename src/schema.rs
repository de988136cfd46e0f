//! Schema normalization for the two trip-record layouts.
//!
//! Yellow and green files carry the same semantic fields but name the pickup
//! and drop-off timestamps differently (`tpep_*` vs `lpep_*`). Each layout is
//! described by a [`SourceSchema`] mapping table; [`SourceSchema::detect`]
//! picks the one whose timestamp columns are present, and [`normalize_batch`]
//! projects an Arrow batch onto [`NormalizedTrip`] records.

use arrow::array::{Array, ArrayRef, ArrowPrimitiveType, AsArray, PrimitiveArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Float64Type, Int64Type, Schema, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType,
};
use arrow::record_batch::RecordBatch;

use crate::catalog::Variant;
use crate::error::{Result, TripDataError};

/// Fields of the canonical trip record, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    VendorId,
    PickupTime,
    DropoffTime,
    PassengerCount,
    PickupZone,
    DropoffZone,
    TripDistance,
    FareAmount,
    TipAmount,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 9] = [
        CanonicalField::VendorId,
        CanonicalField::PickupTime,
        CanonicalField::DropoffTime,
        CanonicalField::PassengerCount,
        CanonicalField::PickupZone,
        CanonicalField::DropoffZone,
        CanonicalField::TripDistance,
        CanonicalField::FareAmount,
        CanonicalField::TipAmount,
    ];

    /// Canonical column name after renaming.
    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::VendorId => "VendorID",
            CanonicalField::PickupTime => "pickup_datetime",
            CanonicalField::DropoffTime => "dropoff_datetime",
            CanonicalField::PassengerCount => "passenger_count",
            CanonicalField::PickupZone => "PULocationID",
            CanonicalField::DropoffZone => "DOLocationID",
            CanonicalField::TripDistance => "trip_distance",
            CanonicalField::FareAmount => "fare_amount",
            CanonicalField::TipAmount => "tip_amount",
        }
    }
}

/// Column-name mapping for one source layout.
#[derive(Debug)]
pub struct SourceSchema {
    pub variant: Variant,
    pickup_column: &'static str,
    dropoff_column: &'static str,
}

pub static YELLOW_SCHEMA: SourceSchema = SourceSchema {
    variant: Variant::Yellow,
    pickup_column: "tpep_pickup_datetime",
    dropoff_column: "tpep_dropoff_datetime",
};

pub static GREEN_SCHEMA: SourceSchema = SourceSchema {
    variant: Variant::Green,
    pickup_column: "lpep_pickup_datetime",
    dropoff_column: "lpep_dropoff_datetime",
};

impl SourceSchema {
    /// Picks the layout by the presence of its pickup timestamp column.
    ///
    /// Only column names are inspected, never values. When both names are
    /// present the green layout wins.
    pub fn detect(schema: &Schema) -> Result<&'static SourceSchema> {
        let has = |name: &str| schema.column_with_name(name).is_some();

        match (has(GREEN_SCHEMA.pickup_column), has(YELLOW_SCHEMA.pickup_column)) {
            (true, _) => Ok(&GREEN_SCHEMA),
            (false, true) => Ok(&YELLOW_SCHEMA),
            (false, false) => Err(TripDataError::SchemaMismatch(format!(
                "neither '{}' nor '{}' is present",
                GREEN_SCHEMA.pickup_column, YELLOW_SCHEMA.pickup_column
            ))),
        }
    }

    /// Raw column name that feeds `field` in this layout.
    pub fn source_column(&self, field: CanonicalField) -> &'static str {
        match field {
            CanonicalField::PickupTime => self.pickup_column,
            CanonicalField::DropoffTime => self.dropoff_column,
            other => other.name(),
        }
    }

    /// Top-level column indices of every canonical field in `schema`.
    pub fn projection(&self, schema: &Schema) -> Result<Vec<usize>> {
        CanonicalField::ALL
            .iter()
            .map(|field| {
                let column = self.source_column(*field);
                schema
                    .index_of(column)
                    .map_err(|_| missing_column(column))
            })
            .collect()
    }
}

/// A timestamp as read from the source, before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawTimestamp {
    Missing,
    /// Microseconds since the Unix epoch, UTC.
    Micros(i64),
    Text(String),
}

/// One trip projected onto the canonical field set, prior to cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrip {
    pub vendor_id: Option<i64>,
    pub pickup_time: RawTimestamp,
    pub dropoff_time: RawTimestamp,
    pub passenger_count: Option<f64>,
    pub pickup_zone: Option<i64>,
    pub dropoff_zone: Option<i64>,
    pub trip_distance: Option<f64>,
    pub fare_amount: Option<f64>,
    pub tip_amount: Option<f64>,
}

/// Projects one Arrow batch onto canonical records using `source`'s mapping.
///
/// Every column other than the nine canonical ones is ignored.
pub fn normalize_batch(
    batch: &RecordBatch,
    source: &SourceSchema,
) -> Result<Vec<NormalizedTrip>> {
    let column = |field: CanonicalField| source_array(batch, source, field);

    let vendor_ids = int_values(column(CanonicalField::VendorId)?)?;
    let pickups = timestamp_values(column(CanonicalField::PickupTime)?)?;
    let dropoffs = timestamp_values(column(CanonicalField::DropoffTime)?)?;
    let passengers = float_values(column(CanonicalField::PassengerCount)?)?;
    let pickup_zones = int_values(column(CanonicalField::PickupZone)?)?;
    let dropoff_zones = int_values(column(CanonicalField::DropoffZone)?)?;
    let distances = float_values(column(CanonicalField::TripDistance)?)?;
    let fares = float_values(column(CanonicalField::FareAmount)?)?;
    let tips = float_values(column(CanonicalField::TipAmount)?)?;

    let mut pickups = pickups.into_iter();
    let mut dropoffs = dropoffs.into_iter();

    let trips = (0..batch.num_rows())
        .map(|i| NormalizedTrip {
            vendor_id: vendor_ids[i],
            pickup_time: pickups.next().unwrap_or(RawTimestamp::Missing),
            dropoff_time: dropoffs.next().unwrap_or(RawTimestamp::Missing),
            passenger_count: passengers[i],
            pickup_zone: pickup_zones[i],
            dropoff_zone: dropoff_zones[i],
            trip_distance: distances[i],
            fare_amount: fares[i],
            tip_amount: tips[i],
        })
        .collect();

    Ok(trips)
}

fn source_array<'a>(
    batch: &'a RecordBatch,
    source: &SourceSchema,
    field: CanonicalField,
) -> Result<(&'static str, &'a ArrayRef)> {
    let name = source.source_column(field);
    batch
        .column_by_name(name)
        .map(|array| (name, array))
        .ok_or_else(|| missing_column(name))
}

fn missing_column(name: &str) -> TripDataError {
    TripDataError::SchemaMismatch(format!("column '{name}' is missing"))
}

fn cast_to(name: &str, array: &ArrayRef, to: &DataType) -> Result<ArrayRef> {
    cast(array, to).map_err(|e| {
        TripDataError::SchemaMismatch(format!(
            "column '{name}' of type {} cannot be read as {to}: {e}",
            array.data_type()
        ))
    })
}

fn int_values((name, array): (&str, &ArrayRef)) -> Result<Vec<Option<i64>>> {
    let array = cast_to(name, array, &DataType::Int64)?;
    Ok(array.as_primitive::<Int64Type>().iter().collect())
}

fn float_values((name, array): (&str, &ArrayRef)) -> Result<Vec<Option<f64>>> {
    let array = cast_to(name, array, &DataType::Float64)?;
    Ok(array.as_primitive::<Float64Type>().iter().collect())
}

fn timestamp_values((name, array): (&str, &ArrayRef)) -> Result<Vec<RawTimestamp>> {
    match array.data_type() {
        DataType::Timestamp(TimeUnit::Second, _) => Ok(epoch_micros(
            array.as_primitive::<TimestampSecondType>(),
            |v| v.checked_mul(1_000_000),
        )),
        DataType::Timestamp(TimeUnit::Millisecond, _) => Ok(epoch_micros(
            array.as_primitive::<TimestampMillisecondType>(),
            |v| v.checked_mul(1_000),
        )),
        DataType::Timestamp(TimeUnit::Microsecond, _) => Ok(epoch_micros(
            array.as_primitive::<TimestampMicrosecondType>(),
            Some,
        )),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => Ok(epoch_micros(
            array.as_primitive::<TimestampNanosecondType>(),
            |v| Some(v.div_euclid(1_000)),
        )),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let text = cast_to(name, array, &DataType::Utf8)?;
            Ok(text
                .as_string::<i32>()
                .iter()
                .map(|v| {
                    v.map_or(RawTimestamp::Missing, |s| {
                        RawTimestamp::Text(s.to_string())
                    })
                })
                .collect())
        }
        other => Err(TripDataError::SchemaMismatch(format!(
            "column '{name}' has type {other}, expected a timestamp or text"
        ))),
    }
}

fn epoch_micros<T>(
    array: &PrimitiveArray<T>,
    to_micros: impl Fn(i64) -> Option<i64>,
) -> Vec<RawTimestamp>
where
    T: ArrowPrimitiveType<Native = i64>,
{
    array
        .iter()
        .map(|v| match v.and_then(&to_micros) {
            Some(us) => RawTimestamp::Micros(us),
            None => RawTimestamp::Missing,
        })
        .collect()
}
