//! Per-vendor trip summaries.
//!
//! Cleaned trips are grouped by vendor identifier and reduced to one
//! [`types::VendorAggregate`] row per vendor, in ascending vendor order.

pub mod aggregate;
pub mod types;
pub mod utility;
