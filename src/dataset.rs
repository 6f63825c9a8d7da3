// Flat dataset of logged transitions for the nearest-neighbour strategy
//
// One record per line, nine comma-separated fields:
//   selfPos, adv1Pos, adv2Pos, adv3Pos, adv4Pos, distToNearest, tick, score, moveLabel
// Records are grouped by their move label. Records with an unknown label or a
// malformed field are skipped and reported, never inserted.

use log::{info, warn};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::DatasetError;
use crate::simulation::Simulation;
use crate::types::{AdversaryId, Move, ADVERSARY_COUNT};

/// Number of numeric features per record
pub const FEATURE_COUNT: usize = 8;

/// Number of fields per record (features plus the move label)
pub const FIELD_COUNT: usize = FEATURE_COUNT + 1;

/// Feature vector describing one game situation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub agent: i64,
    pub adversaries: [i64; ADVERSARY_COUNT],
    pub distance: i64,
    pub tick: i64,
    pub score: i64,
}

impl Features {
    /// Features of a live state, in the dataset schema
    pub fn from_state<S: Simulation>(state: &S) -> Self {
        let mut adversaries = [0; ADVERSARY_COUNT];
        for id in AdversaryId::all() {
            adversaries[id.0] = state.adversary_position(id) as i64;
        }
        Features {
            agent: state.agent_position() as i64,
            adversaries,
            distance: state.nearest_adversary_distance() as i64,
            tick: state.current_tick() as i64,
            score: state.score() as i64,
        }
    }

    pub fn from_array(values: [i64; FEATURE_COUNT]) -> Self {
        Features {
            agent: values[0],
            adversaries: [values[1], values[2], values[3], values[4]],
            distance: values[5],
            tick: values[6],
            score: values[7],
        }
    }

    pub fn as_array(&self) -> [i64; FEATURE_COUNT] {
        let a = &self.adversaries;
        [self.agent, a[0], a[1], a[2], a[3], self.distance, self.tick, self.score]
    }

    /// Squared Euclidean distance over all eight features, saturating on overflow
    pub fn squared_distance(&self, other: &Features) -> i64 {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .map(|(a, b)| {
                let diff = a.saturating_sub(*b).saturating_abs();
                diff.saturating_mul(diff)
            })
            .fold(0i64, |acc, sq| acc.saturating_add(sq))
    }
}

/// One labelled record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoricalSample {
    pub features: Features,
    pub label: Move,
}

impl HistoricalSample {
    /// Parses one record line
    ///
    /// # Arguments
    /// * `line_num` - 1-based line number used in error reports
    /// * `line` - The raw record
    pub fn parse_record(line_num: usize, line: &str) -> Result<Self, DatasetError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != FIELD_COUNT {
            return Err(DatasetError::MalformedRecord {
                line: line_num,
                reason: format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
            });
        }

        let mut values = [0i64; FEATURE_COUNT];
        for (slot, field) in values.iter_mut().zip(fields.iter()) {
            *slot = field.parse::<i64>().map_err(|e| DatasetError::MalformedRecord {
                line: line_num,
                reason: format!("'{}': {}", field, e),
            })?;
        }

        let label = fields[FEATURE_COUNT];
        let label = Move::from_label(label).ok_or_else(|| DatasetError::UnknownMoveLabel {
            line: line_num,
            label: label.to_string(),
        })?;

        Ok(HistoricalSample { features: Features::from_array(values), label })
    }

    /// Formats the sample as a dataset record (no trailing newline)
    pub fn to_record(&self) -> String {
        let mut fields: Vec<String> =
            self.features.as_array().iter().map(|v| v.to_string()).collect();
        fields.push(self.label.as_str().to_string());
        fields.join(",")
    }
}

/// Samples partitioned by move label
#[derive(Debug, Default)]
pub struct Dataset {
    groups: HashMap<Move, Vec<Features>>,
    skipped: Vec<DatasetError>,
}

impl Dataset {
    /// Reads and groups a dataset file
    ///
    /// # Returns
    /// * `Result<Dataset, DatasetError>` - `Unavailable` when the file cannot be read.
    ///   Bad records do not fail the load; they are listed in `skipped()`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| DatasetError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;

        let dataset = Self::parse(&contents);
        info!(
            "Loaded {} samples from {} ({} skipped)",
            dataset.len(),
            path.display(),
            dataset.skipped.len()
        );
        Ok(dataset)
    }

    /// Groups the records of an in-memory dataset
    pub fn parse(contents: &str) -> Self {
        let mut dataset = Dataset::default();
        for m in Move::all() {
            dataset.groups.insert(m, Vec::new());
        }

        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match HistoricalSample::parse_record(idx + 1, line) {
                Ok(sample) => dataset.insert(sample),
                Err(e) => {
                    warn!("Skipping dataset record: {}", e);
                    dataset.skipped.push(e);
                }
            }
        }
        dataset
    }

    pub fn insert(&mut self, sample: HistoricalSample) {
        self.groups.entry(sample.label).or_default().push(sample.features);
    }

    /// Samples labelled with `mv`
    pub fn group(&self, mv: Move) -> &[Features] {
        self.groups.get(&mv).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records rejected during parsing
    pub fn skipped(&self) -> &[DatasetError] {
        &self.skipped
    }
}

/// Appends one sample to a dataset file, creating it if needed
pub fn append_record<P: AsRef<Path>>(path: P, sample: &HistoricalSample) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
    writeln!(file, "{}", sample.to_record())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let sample = HistoricalSample::parse_record(1, "12, 3,4,5,6,9,120,340,LEFT").unwrap();
        assert_eq!(sample.label, Move::Left);
        assert_eq!(sample.features.as_array(), [12, 3, 4, 5, 6, 9, 120, 340]);
        assert_eq!(sample.to_record(), "12,3,4,5,6,9,120,340,LEFT");
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = HistoricalSample::parse_record(4, "1,2,3,4,5,6,7,8,SIDEWAYS").unwrap_err();
        assert!(matches!(err, DatasetError::UnknownMoveLabel { line: 4, .. }));
    }

    #[test]
    fn test_malformed_records_are_rejected() {
        assert!(matches!(
            HistoricalSample::parse_record(1, "1,2,3,LEFT").unwrap_err(),
            DatasetError::MalformedRecord { line: 1, .. }
        ));
        assert!(matches!(
            HistoricalSample::parse_record(2, "1,2,x,4,5,6,7,8,UP").unwrap_err(),
            DatasetError::MalformedRecord { line: 2, .. }
        ));
    }

    #[test]
    fn test_parse_groups_by_label_and_skips_bad_lines() {
        let contents = "1,2,3,4,5,6,7,8,UP\n\
                        1,2,3,4,5,6,7,8,SIDEWAYS\n\
                        \n\
                        9,9,9,9,9,9,9,9,UP\n\
                        0,0,0,0,0,0,0,0,NEUTRAL\n";
        let dataset = Dataset::parse(contents);
        assert_eq!(dataset.group(Move::Up).len(), 2);
        assert_eq!(dataset.group(Move::Neutral).len(), 1);
        assert!(dataset.group(Move::Left).is_empty());
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.skipped().len(), 1);
    }

    #[test]
    fn test_squared_distance() {
        let a = Features::from_array([0, 0, 0, 0, 0, 0, 0, 0]);
        let b = Features::from_array([1, 2, 0, 0, 0, 0, 0, 3]);
        assert_eq!(a.squared_distance(&b), 1 + 4 + 9);
        assert_eq!(b.squared_distance(&a), 14);
        assert_eq!(a.squared_distance(&a), 0);
    }

    #[test]
    fn test_squared_distance_saturates() {
        let a = Features::from_array([i64::MAX; FEATURE_COUNT]);
        let b = Features::from_array([i64::MIN; FEATURE_COUNT]);
        assert_eq!(a.squared_distance(&b), i64::MAX);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = Dataset::load("definitely/not/here/data.txt").unwrap_err();
        assert!(matches!(err, DatasetError::Unavailable { .. }));
    }
}
