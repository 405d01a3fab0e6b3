//! Timepoint alignment.
//!
//! Every patient owns a chronological list of samples. The grid places the
//! samples of all patients into shared, ordered timepoints: by default the
//! i-th sample of each patient sits at timepoint i. Moves shift one
//! patient's samples to earlier or later timepoints without ever changing
//! that patient's sample order.
//!
//! # Move walk
//!
//! Moving patient P from timepoint T removes P's entry at T and carries it
//! one step in the move direction. If P already has an entry there, the two
//! are swapped and the displaced entry is carried on; otherwise the carried
//! entry is placed and the walk stops. Walking past either end creates a new
//! timepoint holding only the carried entry. Timepoints left empty are
//! dropped.
//!
//! Labels follow the grid: a new timepoint gets the placeholder label, a
//! dropped one removes the label at the boundary opposite to the move, and
//! when P spans the whole grid afterwards the labels rotate by one.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::{EngineConfig, SameDayPolicy};
use crate::event::ClinicalEvent;
use crate::types::{Direction, PatientId, SampleId};

/// Errors from grid construction and moves.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("timepoint {index} out of range for {len} timepoints")]
    TimepointOutOfRange { index: usize, len: usize },

    #[error("patient {patient} has no sample at timepoint {index}")]
    PatientNotAtTimepoint { patient: PatientId, index: usize },

    #[error("unknown patient: {patient}")]
    UnknownPatient { patient: PatientId },

    /// Two specimen events (possibly of different patients) claim one id.
    #[error("sample {sample} appears more than once")]
    DuplicateSample { sample: SampleId },
}

/// A specimen collected from a patient.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: SampleId,
    pub patient: PatientId,
    /// Days relative to diagnosis.
    pub day: f64,
}

/// A patient's sample placed at a timepoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    pub patient: PatientId,
    pub sample: SampleId,
}

/// Extracts a patient's samples from their events.
///
/// Keeps specimen events that carry a sample id, orders them by day (stable,
/// so same-day events stay in source order) and collapses same-day events to
/// one sample according to `config.same_day_policy`.
pub fn specimen_samples(
    patient: &PatientId,
    events: &[ClinicalEvent],
    config: &EngineConfig,
) -> Vec<Sample> {
    let mut specimens: Vec<Sample> = events
        .iter()
        .filter(|e| e.event_type == config.specimen_event_type)
        .filter_map(|e| {
            if !e.start_day.is_finite() {
                tracing::warn!(%patient, day = e.start_day, "skipping specimen with non-finite day");
                return None;
            }
            let Some(raw) = e.attribute(&config.sample_id_attribute) else {
                tracing::warn!(
                    %patient,
                    key = %config.sample_id_attribute,
                    "skipping specimen without sample id"
                );
                return None;
            };
            match SampleId::new(raw) {
                Ok(id) => Some(Sample {
                    id,
                    patient: patient.clone(),
                    day: e.start_day,
                }),
                Err(err) => {
                    tracing::warn!(%patient, error = %err, "skipping specimen with invalid sample id");
                    None
                }
            }
        })
        .collect();
    specimens.sort_by(|a, b| a.day.total_cmp(&b.day));

    let mut samples: Vec<Sample> = Vec::with_capacity(specimens.len());
    for sample in specimens {
        match samples.last_mut() {
            Some(last) if last.day.total_cmp(&sample.day).is_eq() => {
                tracing::debug!(
                    %patient,
                    day = sample.day,
                    policy = %config.same_day_policy,
                    "collapsing same-day samples"
                );
                if config.same_day_policy == SameDayPolicy::Last {
                    *last = sample;
                }
            }
            _ => samples.push(sample),
        }
    }
    samples
}

/// The global timepoint grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TimepointGrid {
    /// Patients with at least one sample, in cohort order.
    patients: Vec<PatientId>,
    rank: HashMap<PatientId, usize>,
    samples: HashMap<PatientId, Vec<Sample>>,
    sample_index: HashMap<SampleId, (PatientId, usize)>,
    timepoints: Vec<Vec<Entry>>,
    labels: Vec<String>,
    label_prefix: String,
    placeholder_label: String,
    verbose: bool,
    version: u64,
}

impl TimepointGrid {
    /// Builds the default alignment from per-patient events.
    ///
    /// Patients without any usable specimen are left out of the grid.
    pub fn from_events(
        patients: &[PatientId],
        events: &HashMap<PatientId, Vec<ClinicalEvent>>,
        config: &EngineConfig,
    ) -> Result<Self, AlignmentError> {
        let per_patient = patients
            .iter()
            .map(|p| {
                let samples = events
                    .get(p)
                    .map(|e| specimen_samples(p, e, config))
                    .unwrap_or_default();
                (p.clone(), samples)
            })
            .collect();
        Self::new(per_patient, config)
    }

    /// Builds the default alignment from per-patient samples.
    pub fn new(
        patient_samples: Vec<(PatientId, Vec<Sample>)>,
        config: &EngineConfig,
    ) -> Result<Self, AlignmentError> {
        let mut patients = Vec::new();
        let mut samples = HashMap::new();
        let mut sample_index = HashMap::new();

        for (patient, mut list) in patient_samples {
            if list.is_empty() {
                tracing::debug!(%patient, "patient has no samples, leaving it out");
                continue;
            }
            list.sort_by(|a, b| a.day.total_cmp(&b.day));
            for (i, sample) in list.iter().enumerate() {
                if sample_index
                    .insert(sample.id.clone(), (patient.clone(), i))
                    .is_some()
                {
                    return Err(AlignmentError::DuplicateSample {
                        sample: sample.id.clone(),
                    });
                }
            }
            patients.push(patient.clone());
            samples.insert(patient, list);
        }

        let rank = patients
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();
        let mut grid = Self {
            patients,
            rank,
            samples,
            sample_index,
            timepoints: Vec::new(),
            labels: Vec::new(),
            label_prefix: config.label_prefix.clone(),
            placeholder_label: config.placeholder_label.clone(),
            verbose: config.verbose,
            version: 0,
        };
        grid.align_default();
        tracing::debug!(
            patients = grid.patients.len(),
            timepoints = grid.timepoints.len(),
            "built timepoint grid"
        );
        Ok(grid)
    }

    /// Restores the default alignment and labels.
    pub fn reset(&mut self) -> u64 {
        self.align_default();
        self.bump()
    }

    fn align_default(&mut self) {
        let mut timepoints: Vec<Vec<Entry>> = Vec::new();
        for patient in &self.patients {
            for (i, sample) in self.samples[patient].iter().enumerate() {
                if timepoints.len() == i {
                    timepoints.push(Vec::new());
                }
                timepoints[i].push(Entry {
                    patient: patient.clone(),
                    sample: sample.id.clone(),
                });
            }
        }
        self.labels = (0..timepoints.len())
            .map(|i| format!("{}{}", self.label_prefix, i + 1))
            .collect();
        self.timepoints = timepoints;
    }

    pub const fn version(&self) -> u64 {
        self.version
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Patients in the grid, in cohort order.
    pub fn patients(&self) -> &[PatientId] {
        &self.patients
    }

    pub fn len(&self) -> usize {
        self.timepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timepoints.is_empty()
    }

    /// Entries of every timepoint, in order.
    pub fn timepoints(&self) -> &[Vec<Entry>] {
        &self.timepoints
    }

    /// Entries of one timepoint.
    pub fn entries(&self, index: usize) -> Result<&[Entry], AlignmentError> {
        self.timepoints
            .get(index)
            .map(Vec::as_slice)
            .ok_or(AlignmentError::TimepointOutOfRange {
                index,
                len: self.timepoints.len(),
            })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Renames one timepoint.
    pub fn set_label(&mut self, index: usize, label: impl Into<String>) -> Result<u64, AlignmentError> {
        let len = self.labels.len();
        let slot = self
            .labels
            .get_mut(index)
            .ok_or(AlignmentError::TimepointOutOfRange { index, len })?;
        *slot = label.into();
        Ok(self.bump())
    }

    /// Chronological samples of a patient.
    pub fn samples(&self, patient: &PatientId) -> Result<&[Sample], AlignmentError> {
        self.samples
            .get(patient)
            .map(Vec::as_slice)
            .ok_or_else(|| AlignmentError::UnknownPatient {
                patient: patient.clone(),
            })
    }

    /// All real samples, patient by patient.
    pub fn all_samples(&self) -> impl Iterator<Item = &Sample> {
        self.patients
            .iter()
            .filter_map(|p| self.samples.get(p))
            .flatten()
    }

    pub fn sample(&self, id: &SampleId) -> Option<&Sample> {
        let (patient, i) = self.sample_index.get(id)?;
        self.samples.get(patient)?.get(*i)
    }

    /// The synthetic sample following a patient's last sample.
    pub fn post_sample(&self, patient: &PatientId) -> Option<SampleId> {
        self.samples.get(patient)?.last().map(|s| s.id.post())
    }

    /// Smallest number of samples of any patient.
    pub fn min_timepoints(&self) -> usize {
        self.samples.values().map(Vec::len).min().unwrap_or(0)
    }

    /// Largest number of samples of any patient.
    pub fn max_timepoints(&self) -> usize {
        self.samples.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Timepoint indices and samples of a patient, in grid order.
    pub fn patient_sequence(&self, patient: &PatientId) -> Vec<(usize, SampleId)> {
        self.timepoints
            .iter()
            .enumerate()
            .filter_map(|(i, tp)| {
                tp.iter()
                    .find(|e| e.patient == *patient)
                    .map(|e| (i, e.sample.clone()))
            })
            .collect()
    }

    /// Column structure used for transitions and event intervals.
    ///
    /// Has one more column than the grid. Column `i` holds timepoint `i` plus
    /// a `_post` entry for every patient present at `i - 1` but not at `i`;
    /// the last column holds `_post` entries for the patients of the last
    /// timepoint.
    pub fn transitions(&self) -> Vec<Vec<Entry>> {
        let Some(first) = self.timepoints.first() else {
            return Vec::new();
        };
        let post = |e: &Entry| Entry {
            patient: e.patient.clone(),
            sample: e.sample.post(),
        };
        let mut columns = vec![first.clone()];
        for pair in self.timepoints.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            let mut column = curr.clone();
            column.extend(
                prev.iter()
                    .filter(|e| !curr.iter().any(|c| c.patient == e.patient))
                    .map(post),
            );
            columns.push(column);
        }
        if let Some(last) = self.timepoints.last() {
            columns.push(last.iter().map(post).collect());
        }
        columns
    }

    /// Moves a patient's sample at `index` one step in `direction`.
    ///
    /// Returns the new version. On error the grid is unchanged.
    pub fn move_patient(
        &mut self,
        patient: &PatientId,
        index: usize,
        direction: Direction,
    ) -> Result<u64, AlignmentError> {
        if !self.rank.contains_key(patient) {
            return Err(AlignmentError::UnknownPatient {
                patient: patient.clone(),
            });
        }
        let old_len = self.timepoints.len();
        let timepoint = self
            .timepoints
            .get_mut(index)
            .ok_or(AlignmentError::TimepointOutOfRange {
                index,
                len: old_len,
            })?;
        let pos = timepoint
            .iter()
            .position(|e| e.patient == *patient)
            .ok_or_else(|| AlignmentError::PatientNotAtTimepoint {
                patient: patient.clone(),
                index,
            })?;

        let mut carried = timepoint.remove(pos);
        let mut current = index;
        loop {
            let next = match direction {
                Direction::Up => current.checked_sub(1),
                Direction::Down => Some(current + 1).filter(|&n| n < self.timepoints.len()),
            };
            let Some(next) = next else {
                match direction {
                    Direction::Up => self.timepoints.insert(0, vec![carried]),
                    Direction::Down => self.timepoints.push(vec![carried]),
                }
                break;
            };
            if let Some(slot) = self.timepoints[next]
                .iter_mut()
                .find(|e| e.patient == *patient)
            {
                carried = std::mem::replace(slot, carried);
                current = next;
            } else {
                self.place_in_patient_order(next, carried);
                break;
            }
        }
        self.timepoints.retain(|tp| !tp.is_empty());
        self.update_labels(patient, direction, old_len);

        if self.verbose {
            tracing::debug!(
                %patient,
                from = index,
                %direction,
                timepoints = self.timepoints.len(),
                "moved patient"
            );
        }
        Ok(self.bump())
    }

    fn place_in_patient_order(&mut self, index: usize, entry: Entry) {
        let rank = |p: &PatientId| self.rank.get(p).copied().unwrap_or(usize::MAX);
        let entry_rank = rank(&entry.patient);
        let at = self.timepoints[index]
            .iter()
            .position(|e| rank(&e.patient) > entry_rank)
            .unwrap_or(self.timepoints[index].len());
        self.timepoints[index].insert(at, entry);
    }

    fn update_labels(&mut self, patient: &PatientId, direction: Direction, old_len: usize) {
        let new_len = self.timepoints.len();
        match new_len.cmp(&old_len) {
            std::cmp::Ordering::Greater => match direction {
                Direction::Up => self.labels.insert(0, self.placeholder_label.clone()),
                Direction::Down => self.labels.push(self.placeholder_label.clone()),
            },
            std::cmp::Ordering::Less => match direction {
                Direction::Up => {
                    self.labels.pop();
                }
                Direction::Down => {
                    if !self.labels.is_empty() {
                        self.labels.remove(0);
                    }
                }
            },
            std::cmp::Ordering::Equal => {
                let spans_grid = self
                    .timepoints
                    .iter()
                    .all(|tp| tp.iter().any(|e| e.patient == *patient));
                if spans_grid && !self.labels.is_empty() {
                    match direction {
                        Direction::Down => self.labels.rotate_left(1),
                        Direction::Up => self.labels.rotate_right(1),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PatientId {
        PatientId::new(s).unwrap()
    }

    fn sid(s: &str) -> SampleId {
        SampleId::new(s).unwrap()
    }

    fn specimen(sample: &str, day: f64) -> ClinicalEvent {
        ClinicalEvent::point("SPECIMEN", day).with_attribute("SAMPLE_ID", sample)
    }

    /// p1: a0 (day 0), a1 (30), a2 (60); p2: b0 (0), b1 (40).
    fn scenario() -> TimepointGrid {
        let events = HashMap::from([
            (
                pid("p1"),
                vec![specimen("a2", 60.0), specimen("a0", 0.0), specimen("a1", 30.0)],
            ),
            (pid("p2"), vec![specimen("b0", 0.0), specimen("b1", 40.0)]),
        ]);
        TimepointGrid::from_events(&[pid("p1"), pid("p2")], &events, &EngineConfig::default())
            .unwrap()
    }

    fn layout(grid: &TimepointGrid) -> Vec<Vec<String>> {
        grid.timepoints()
            .iter()
            .map(|tp| tp.iter().map(|e| e.sample.to_string()).collect())
            .collect()
    }

    fn labels(grid: &TimepointGrid) -> Vec<&str> {
        grid.labels().iter().map(String::as_str).collect()
    }

    /// Every patient's samples appear in chronological order, once each.
    fn assert_consistent(grid: &TimepointGrid) {
        for patient in grid.patients() {
            let sequence: Vec<SampleId> = grid
                .patient_sequence(patient)
                .into_iter()
                .map(|(_, s)| s)
                .collect();
            let chronological: Vec<SampleId> = grid
                .samples(patient)
                .unwrap()
                .iter()
                .map(|s| s.id.clone())
                .collect();
            assert_eq!(sequence, chronological, "patient {patient}");
        }
        for tp in grid.timepoints() {
            assert!(!tp.is_empty());
            let mut seen: Vec<&PatientId> = tp.iter().map(|e| &e.patient).collect();
            seen.dedup();
            assert_eq!(seen.len(), tp.len());
        }
        assert_eq!(grid.labels().len(), grid.len());
    }

    #[test]
    fn default_alignment_places_ith_sample_at_ith_timepoint() {
        let grid = scenario();
        assert_eq!(
            layout(&grid),
            [vec!["a0", "b0"], vec!["a1", "b1"], vec!["a2"]]
        );
        assert_eq!(labels(&grid), ["TP1", "TP2", "TP3"]);
        assert_eq!(grid.min_timepoints(), 2);
        assert_eq!(grid.max_timepoints(), 3);
        assert_eq!(grid.sample(&sid("b1")).unwrap().day, 40.0);
        assert_eq!(grid.post_sample(&pid("p2")), Some(sid("b1_post")));
        assert_consistent(&grid);
    }

    #[test]
    fn construction_is_deterministic() {
        assert_eq!(scenario(), scenario());
    }

    #[test]
    fn same_day_policy_picks_first_or_last() {
        let events = vec![
            specimen("x", 10.0),
            specimen("y", 10.0),
            specimen("z", 5.0),
            ClinicalEvent::point("TREATMENT", 7.0),
            ClinicalEvent::point("SPECIMEN", 3.0),
        ];
        let first = specimen_samples(&pid("p"), &events, &EngineConfig::default());
        let ids: Vec<&str> = first.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["z", "x"]);

        let config = EngineConfig {
            same_day_policy: SameDayPolicy::Last,
            ..EngineConfig::default()
        };
        let last = specimen_samples(&pid("p"), &events, &config);
        let ids: Vec<&str> = last.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["z", "y"]);
    }

    #[test]
    fn patients_without_samples_are_left_out() {
        let events = HashMap::from([(pid("p1"), vec![specimen("a0", 0.0)])]);
        let grid = TimepointGrid::from_events(
            &[pid("p1"), pid("p2")],
            &events,
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(grid.patients(), [pid("p1")]);
        assert!(matches!(
            grid.samples(&pid("p2")),
            Err(AlignmentError::UnknownPatient { .. })
        ));
    }

    #[test]
    fn duplicate_sample_ids_are_rejected() {
        let events = HashMap::from([
            (pid("p1"), vec![specimen("s", 0.0)]),
            (pid("p2"), vec![specimen("s", 4.0)]),
        ]);
        let err = TimepointGrid::from_events(
            &[pid("p1"), pid("p2")],
            &events,
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, AlignmentError::DuplicateSample { sample: sid("s") });
    }

    #[test]
    fn move_down_into_free_slot() {
        let mut grid = scenario();
        grid.move_patient(&pid("p2"), 1, Direction::Down).unwrap();
        assert_eq!(
            layout(&grid),
            [vec!["a0", "b0"], vec!["a1"], vec!["a2", "b1"]]
        );
        assert_eq!(labels(&grid), ["TP1", "TP2", "TP3"]);
        assert_consistent(&grid);
    }

    #[test]
    fn move_down_past_the_end_appends_timepoint() {
        let mut grid = scenario();
        grid.move_patient(&pid("p2"), 1, Direction::Down).unwrap();
        grid.move_patient(&pid("p1"), 2, Direction::Down).unwrap();
        assert_eq!(
            layout(&grid),
            [vec!["a0", "b0"], vec!["a1"], vec!["b1"], vec!["a2"]]
        );
        assert_eq!(labels(&grid), ["TP1", "TP2", "TP3", "new"]);
        assert_consistent(&grid);
    }

    #[test]
    fn move_carries_displaced_samples() {
        let mut grid = scenario();
        grid.move_patient(&pid("p1"), 0, Direction::Down).unwrap();
        assert_eq!(
            layout(&grid),
            [vec!["b0"], vec!["a0", "b1"], vec!["a1"], vec!["a2"]]
        );
        assert_eq!(labels(&grid), ["TP1", "TP2", "TP3", "new"]);
        assert_consistent(&grid);
    }

    #[test]
    fn move_up_merges_and_drops_empty_timepoint() {
        let mut grid = scenario();
        grid.move_patient(&pid("p2"), 1, Direction::Down).unwrap();
        grid.move_patient(&pid("p1"), 2, Direction::Down).unwrap();
        grid.move_patient(&pid("p2"), 2, Direction::Up).unwrap();
        assert_eq!(
            layout(&grid),
            [vec!["a0", "b0"], vec!["a1", "b1"], vec!["a2"]]
        );
        assert_eq!(labels(&grid), ["TP1", "TP2", "TP3"]);
        assert_consistent(&grid);
    }

    #[test]
    fn move_up_from_first_timepoint_prepends() {
        let mut grid = scenario();
        grid.move_patient(&pid("p2"), 0, Direction::Up).unwrap();
        assert_eq!(
            layout(&grid),
            [vec!["b0"], vec!["a0"], vec!["a1", "b1"], vec!["a2"]]
        );
        assert_eq!(labels(&grid), ["new", "TP1", "TP2", "TP3"]);
        assert_consistent(&grid);
    }

    #[test]
    fn labels_rotate_when_patient_spans_grid() {
        let events = HashMap::from([(pid("p1"), vec![specimen("a0", 0.0), specimen("a1", 9.0)])]);
        let mut grid =
            TimepointGrid::from_events(&[pid("p1")], &events, &EngineConfig::default()).unwrap();

        grid.move_patient(&pid("p1"), 0, Direction::Down).unwrap();
        assert_eq!(layout(&grid), [vec!["a0"], vec!["a1"]]);
        assert_eq!(labels(&grid), ["TP2", "TP1"]);

        grid.move_patient(&pid("p1"), 1, Direction::Up).unwrap();
        assert_eq!(labels(&grid), ["TP1", "TP2"]);
        assert_consistent(&grid);
    }

    #[test]
    fn invalid_moves_leave_grid_unchanged() {
        let mut grid = scenario();
        let before = grid.clone();
        assert_eq!(
            grid.move_patient(&pid("p2"), 2, Direction::Down),
            Err(AlignmentError::PatientNotAtTimepoint {
                patient: pid("p2"),
                index: 2
            })
        );
        assert_eq!(
            grid.move_patient(&pid("p1"), 7, Direction::Up),
            Err(AlignmentError::TimepointOutOfRange { index: 7, len: 3 })
        );
        assert!(matches!(
            grid.move_patient(&pid("nobody"), 0, Direction::Up),
            Err(AlignmentError::UnknownPatient { .. })
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn transitions_add_post_entries() {
        let grid = scenario();
        let columns: Vec<Vec<String>> = grid
            .transitions()
            .iter()
            .map(|c| c.iter().map(|e| e.sample.to_string()).collect())
            .collect();
        assert_eq!(
            columns,
            [
                vec!["a0", "b0"],
                vec!["a1", "b1"],
                vec!["a2", "b1_post"],
                vec!["a2_post"],
            ]
        );
    }

    #[test]
    fn reset_restores_default_alignment() {
        let mut grid = scenario();
        let pristine = layout(&grid);
        grid.move_patient(&pid("p1"), 0, Direction::Down).unwrap();
        grid.set_label(0, "baseline").unwrap();
        let version = grid.reset();
        assert_eq!(layout(&grid), pristine);
        assert_eq!(labels(&grid), ["TP1", "TP2", "TP3"]);
        assert_eq!(grid.version(), version);
        assert_eq!(version, 3);
    }

    #[test]
    fn many_moves_keep_chronology() {
        let mut grid = scenario();
        let moves: [(&str, usize, Direction, &[&[&str]]); 5] = [
            ("p1", 0, Direction::Down, &[&["b0"], &["a0", "b1"], &["a1"], &["a2"]]),
            ("p2", 0, Direction::Down, &[&["a0", "b0"], &["a1", "b1"], &["a2"]]),
            ("p1", 1, Direction::Up, &[&["a0"], &["a1", "b0"], &["b1"], &["a2"]]),
            ("p2", 2, Direction::Up, &[&["a0", "b0"], &["a1", "b1"], &["a2"]]),
            ("p1", 1, Direction::Down, &[&["a0", "b0"], &["b1"], &["a1"], &["a2"]]),
        ];
        for (patient, index, direction, expected) in moves {
            grid.move_patient(&pid(patient), index, direction).unwrap();
            assert_eq!(layout(&grid), expected, "{patient}:{index}:{direction}");
            assert_eq!(grid.labels().len(), grid.len());
            assert_consistent(&grid);
        }

        let before = layout(&grid);
        let version = grid.version();
        assert_eq!(
            grid.move_patient(&pid("p2"), 3, Direction::Down),
            Err(AlignmentError::PatientNotAtTimepoint {
                patient: pid("p2"),
                index: 3,
            })
        );
        assert_eq!(
            grid.move_patient(&pid("p1"), 4, Direction::Up),
            Err(AlignmentError::TimepointOutOfRange { index: 4, len: 4 })
        );
        assert_eq!(layout(&grid), before);
        assert_eq!(grid.version(), version);
    }
}
