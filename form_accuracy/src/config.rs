// ********* Input data structures ***********

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::Display;
use std::ops::{Add, AddAssign};

/// The canonical client identifier, as returned by `normalize_identifier`.
pub type Identifier = String;

/// The value recorded for one field. `None` means that nothing was recorded.
pub type FieldValue = Option<String>;

/// All the values of one form, in the order of the fields of the `FormSpec`.
pub type FormRecord = Vec<FieldValue>;

/// A full source of forms, keyed by client identifier.
///
/// Ordered so that every pass over a dataset visits the forms in the same order.
pub type Dataset = BTreeMap<Identifier, FormRecord>;

/// One bubble of a "bubble many" field.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct BubbleOption {
    /// The numerical code used by the ground truth (e.g. "3").
    pub code: String,
    /// The text that the scanner outputs when the bubble is filled
    /// (e.g. "under the age of 20").
    pub label: String,
}

impl BubbleOption {
    pub fn new(code: &str, label: &str) -> BubbleOption {
        BubbleOption {
            code: code.to_string(),
            label: label.to_string(),
        }
    }
}

/// The comparison rule attached to a field.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum FieldKind {
    /// Nothing is declared: the rule is picked by looking at the expected value.
    Auto,
    /// A fixed-width client identifier. Both sides are zero-padded to `width`
    /// before being compared.
    Identifier { width: usize },
    /// A free-form digit string, compared right-aligned.
    Digits,
    /// A day/month/year date.
    Date,
    /// A "bubble many" field: the ground truth lists the selected codes, the
    /// scanner concatenates the labels of the filled bubbles.
    Bubble(Vec<BubbleOption>),
    /// A short categorical answer (yes/no, ...), compared for equality.
    Categorical,
}

/// The groups of fields summarized together in the final report.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Category {
    Digit,
    Bubble,
    Categorical,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Digit, Category::Bubble, Category::Categorical];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Digit => "digit",
            Category::Bubble => "bubble",
            Category::Categorical => "categorical",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind) -> FieldSpec {
        FieldSpec {
            name: name.to_string(),
            kind,
        }
    }

    pub fn bubble_options(&self) -> Option<&[BubbleOption]> {
        match &self.kind {
            FieldKind::Bubble(options) => Some(options.as_slice()),
            _ => None,
        }
    }

    pub fn category(&self) -> Category {
        match self.kind {
            FieldKind::Bubble(_) => Category::Bubble,
            FieldKind::Categorical => Category::Categorical,
            FieldKind::Auto | FieldKind::Identifier { .. } | FieldKind::Digits | FieldKind::Date => {
                Category::Digit
            }
        }
    }
}

/// The description of one type of paper form: the ordered list of fields that
/// are compared.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FormSpec {
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn new(fields: Vec<FieldSpec>) -> FormSpec {
        FormSpec { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ******** Output data structures *********

/// The outcome of comparing one field of one form: how many units (digits,
/// bubbles, ...) matched out of how many were compared.
///
/// A total of zero means that the field was not scored.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Default)]
pub struct ComparisonResult {
    pub correct: u32,
    pub total: u32,
}

impl ComparisonResult {
    pub const SKIPPED: ComparisonResult = ComparisonResult {
        correct: 0,
        total: 0,
    };

    pub fn new(correct: u32, total: u32) -> ComparisonResult {
        ComparisonResult { correct, total }
    }

    pub fn is_skipped(&self) -> bool {
        self.total == 0
    }

    pub fn is_perfect(&self) -> bool {
        self.correct == self.total
    }

    /// The percentage of correct units, if anything was compared.
    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 * 100.0 / self.total as f64)
        }
    }
}

impl Display for ComparisonResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

impl Add for ComparisonResult {
    type Output = ComparisonResult;
    fn add(self, rhs: ComparisonResult) -> ComparisonResult {
        ComparisonResult {
            correct: self.correct + rhs.correct,
            total: self.total + rhs.total,
        }
    }
}

impl AddAssign for ComparisonResult {
    fn add_assign(&mut self, rhs: ComparisonResult) {
        self.correct += rhs.correct;
        self.total += rhs.total;
    }
}

impl std::iter::Sum for ComparisonResult {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ComparisonResult::SKIPPED, |acc, r| acc + r)
    }
}

/// Running sums of the comparison results, one entry per field of the form.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AccuracyTally {
    pub fields: Vec<ComparisonResult>,
    pub forms_scored: u64,
}

impl AccuracyTally {
    pub fn new(num_fields: usize) -> AccuracyTally {
        AccuracyTally {
            fields: vec![ComparisonResult::SKIPPED; num_fields],
            forms_scored: 0,
        }
    }

    /// Adds the results of one form.
    ///
    /// Panics if the number of results differs from the number of fields.
    pub fn record(&mut self, form_results: &[ComparisonResult]) {
        assert_eq!(form_results.len(), self.fields.len());
        for (acc, r) in self.fields.iter_mut().zip(form_results.iter()) {
            *acc += *r;
        }
        self.forms_scored += 1;
    }

    /// Combines two partial tallies computed over disjoint sets of forms.
    pub fn merge(&self, other: &AccuracyTally) -> AccuracyTally {
        assert_eq!(self.fields.len(), other.fields.len());
        AccuracyTally {
            fields: self
                .fields
                .iter()
                .zip(other.fields.iter())
                .map(|(a, b)| *a + *b)
                .collect(),
            forms_scored: self.forms_scored + other.forms_scored,
        }
    }

    pub fn overall(&self) -> ComparisonResult {
        self.fields.iter().cloned().sum()
    }
}

/// The outcome of matching the scanner output against the ground truth.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Reconciliation {
    pub tally: AccuracyTally,
    /// Identifiers present in both datasets. These are the scored forms.
    pub matching: BTreeSet<Identifier>,
    /// Identifiers only present in the ground truth.
    pub only_expected: BTreeSet<Identifier>,
    /// Identifiers only present in the scanner output.
    pub only_actual: BTreeSet<Identifier>,
}

/// Errors that prevent a comparison from completing.
///
/// Badly formatted values are never errors: they are simply not scored.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AccuracyError {
    /// The records of one form do not line up with the declared fields.
    FieldCountMismatch {
        id: Option<Identifier>,
        fields: usize,
        expected: usize,
        actual: usize,
    },
}

impl Error for AccuracyError {}

impl Display for AccuracyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccuracyError::FieldCountMismatch {
                id,
                fields,
                expected,
                actual,
            } => write!(
                f,
                "field count mismatch for client id {}: {} declared fields, {} expected values, {} actual values",
                id.as_deref().unwrap_or("<unknown>"),
                fields,
                expected,
                actual
            ),
        }
    }
}
