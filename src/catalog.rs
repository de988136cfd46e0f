//! Monthly file catalog: which (month, variant) units exist on disk, and which
//! still need to be processed or downloaded.

use std::fmt;
use std::path::PathBuf;

/// Source feed a trip file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Yellow,
    Green,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Yellow, Variant::Green];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Yellow => "yellow",
            Variant::Green => "green",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root directories for raw inputs and processed outputs.
///
/// Files live one level down, in a per-year directory:
/// `{input_root}/{year}/` and `{output_root}/{year}/`.
#[derive(Debug, Clone)]
pub struct DataLayout {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
}

impl DataLayout {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
        }
    }

    pub fn input_dir(&self, year: i32) -> PathBuf {
        self.input_root.join(year.to_string())
    }

    pub fn output_dir(&self, year: i32) -> PathBuf {
        self.output_root.join(year.to_string())
    }
}

/// One (year, month, variant) job: one input file mapped to one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessingUnit {
    pub year: i32,
    pub month: u32,
    pub variant: Variant,
}

impl ProcessingUnit {
    pub fn new(year: i32, month: u32, variant: Variant) -> Self {
        Self {
            year,
            month,
            variant,
        }
    }

    /// Base name shared by the input and output file, e.g. `yellow_tripdata_2023-01`.
    pub fn stem(&self) -> String {
        format!("{}_tripdata_{}-{:02}", self.variant, self.year, self.month)
    }

    pub fn input_file_name(&self) -> String {
        format!("{}.parquet", self.stem())
    }

    pub fn output_file_name(&self) -> String {
        format!("processed_{}.csv", self.stem())
    }

    pub fn input_path(&self, layout: &DataLayout) -> PathBuf {
        layout.input_dir(self.year).join(self.input_file_name())
    }

    pub fn output_path(&self, layout: &DataLayout) -> PathBuf {
        layout.output_dir(self.year).join(self.output_file_name())
    }
}

impl fmt::Display for ProcessingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

fn month_units(year: i32, month: u32) -> [ProcessingUnit; 2] {
    Variant::ALL.map(|variant| ProcessingUnit::new(year, month, variant))
}

fn all_exist(paths: impl IntoIterator<Item = PathBuf>) -> bool {
    paths.into_iter().all(|p| p.exists())
}

/// Lists the units of `year` that have input but no output yet.
///
/// A month is pending when both variants' inputs exist and at least one of
/// its outputs is missing; in that case both of its units are returned. A
/// month with only one variant downloaded is not ready and is skipped.
pub fn pending_units(layout: &DataLayout, year: i32) -> Vec<ProcessingUnit> {
    let mut pending = Vec::new();

    for month in 1..=12 {
        let units = month_units(year, month);
        let inputs_ready = all_exist(units.iter().map(|u| u.input_path(layout)));
        let outputs_done = all_exist(units.iter().map(|u| u.output_path(layout)));

        if inputs_ready && !outputs_done {
            pending.extend(units);
        }
    }

    pending
}

/// Returns the units of the earliest month of `year` for which at least one
/// input file is missing, or `None` when every month is on disk.
pub fn next_missing_month(layout: &DataLayout, year: i32) -> Option<[ProcessingUnit; 2]> {
    (1..=12)
        .map(|month| month_units(year, month))
        .find(|units| !all_exist(units.iter().map(|u| u.input_path(layout))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn layout_in(dir: &TempDir) -> DataLayout {
        let layout = DataLayout::new(dir.path().join("input"), dir.path().join("output"));
        fs::create_dir_all(layout.input_dir(2023)).unwrap();
        fs::create_dir_all(layout.output_dir(2023)).unwrap();
        layout
    }

    fn touch(path: PathBuf) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_paths_follow_naming_convention() {
        let layout = DataLayout::new("input", "output");
        let unit = ProcessingUnit::new(2023, 3, Variant::Green);

        assert_eq!(
            unit.input_path(&layout),
            PathBuf::from("input/2023/green_tripdata_2023-03.parquet")
        );
        assert_eq!(
            unit.output_path(&layout),
            PathBuf::from("output/2023/processed_green_tripdata_2023-03.csv")
        );
    }

    #[test]
    fn test_no_inputs_means_nothing_pending() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        assert!(pending_units(&layout, 2023).is_empty());
    }

    #[test]
    fn test_month_with_inputs_and_no_outputs_is_pending() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        for unit in month_units(2023, 2) {
            touch(unit.input_path(&layout));
        }

        let pending = pending_units(&layout, 2023);
        assert_eq!(
            pending,
            vec![
                ProcessingUnit::new(2023, 2, Variant::Yellow),
                ProcessingUnit::new(2023, 2, Variant::Green),
            ]
        );
    }

    #[test]
    fn test_single_output_is_not_enough_to_skip() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        let units = month_units(2023, 5);
        for unit in units {
            touch(unit.input_path(&layout));
        }
        touch(units[0].output_path(&layout));

        assert_eq!(pending_units(&layout, 2023).len(), 2);
    }

    #[test]
    fn test_both_outputs_skip_month() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        for unit in month_units(2023, 7) {
            touch(unit.input_path(&layout));
            touch(unit.output_path(&layout));
        }

        assert!(pending_units(&layout, 2023).is_empty());
    }

    #[test]
    fn test_single_input_is_not_ready() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        touch(ProcessingUnit::new(2023, 1, Variant::Yellow).input_path(&layout));

        assert!(pending_units(&layout, 2023).is_empty());
    }

    #[test]
    fn test_pending_months_in_calendar_order() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        for month in [11, 4] {
            for unit in month_units(2023, month) {
                touch(unit.input_path(&layout));
            }
        }

        let months: Vec<u32> = pending_units(&layout, 2023)
            .iter()
            .map(|u| u.month)
            .collect();
        assert_eq!(months, vec![4, 4, 11, 11]);
    }

    #[test]
    fn test_next_missing_month() {
        let dir = TempDir::new().unwrap();
        let layout = layout_in(&dir);
        for unit in month_units(2023, 1) {
            touch(unit.input_path(&layout));
        }
        touch(ProcessingUnit::new(2023, 2, Variant::Green).input_path(&layout));

        let next = next_missing_month(&layout, 2023).unwrap();
        assert_eq!(next[0].month, 2);

        for month in 2..=12 {
            for unit in month_units(2023, month) {
                touch(unit.input_path(&layout));
            }
        }
        assert!(next_missing_month(&layout, 2023).is_none());
    }
}
