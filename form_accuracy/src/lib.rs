mod config;
use log::{debug, info};

use std::collections::BTreeSet;

pub use crate::config::*;

pub mod alignment;
pub mod builder;
pub mod manual;
pub mod report;

/// The width of the client identifiers printed on the forms.
pub const DEFAULT_IDENTIFIER_WIDTH: usize = 5;

// Expected values that mean "nothing to compare against".
const UNSCORABLE_VALUES: [&str; 2] = ["null", "inconclusive"];

// **** Identifiers ****

/// Canonical form of a client identifier, used as the key of the datasets.
///
/// Surrounding whitespace and leading zeroes are removed. A value made only of
/// zeroes becomes "0".
pub fn normalize_identifier(raw: Option<&str>) -> Option<String> {
    let s = raw?.trim();
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() && !s.is_empty() {
        Some("0".to_string())
    } else {
        Some(trimmed.to_string())
    }
}

/// Left-pads an identifier with zeroes up to `width` characters.
///
/// Spaces inside the value are read as zeroes. Values that are already long
/// enough are returned unchanged.
pub fn pad_to_width(raw: &str, width: usize) -> String {
    let s = raw.trim().replace(' ', "0");
    let len = s.chars().count();
    if len >= width {
        s
    } else {
        format!("{}{}", "0".repeat(width - len), s)
    }
}

// **** Unit comparators ****

/// Compares two digit strings, starting from the right.
///
/// Positions where the expected string does not hold a digit are skipped on
/// both sides. Extra characters on the left of the longer string are never
/// visited, so an extra leading digit read by the scanner does not shift the
/// whole comparison.
pub fn compare_digits(actual: &str, expected: &str) -> ComparisonResult {
    let mut res = ComparisonResult::SKIPPED;
    for (a, e) in actual.chars().rev().zip(expected.chars().rev()) {
        if !e.is_ascii_digit() {
            continue;
        }
        res.total += 1;
        if a == e {
            res.correct += 1;
        }
    }
    res
}

/// True if the string looks like a day/month/year date such as "05/07/15".
pub fn is_date(s: &str) -> bool {
    if s.chars().count() <= 2 {
        return false;
    }
    let parts: Vec<&str> = s.split('/').collect();
    parts.len() == 3
        && parts.iter().all(|p| {
            let len = p.chars().count();
            (1..=4).contains(&len) && p.chars().all(|c| c.is_ascii_digit() || c == ' ')
        })
}

/// Compares two dates part by part (day, month, year).
///
/// Years were recorded with either two or four digits, so only the last two
/// digits of a four-digit year are compared. An actual value that is not a
/// date is not scored.
pub fn compare_dates(actual: &str, expected: &str) -> ComparisonResult {
    if !is_date(actual) || !is_date(expected) {
        debug!(
            "compare_dates: not comparable as dates: actual {:?} expected {:?}",
            actual, expected
        );
        return ComparisonResult::SKIPPED;
    }
    actual
        .split('/')
        .zip(expected.split('/'))
        .enumerate()
        .map(|(idx, (a, e))| {
            if idx == 2 {
                compare_digits(short_year(a), short_year(e))
            } else {
                compare_digits(a, e)
            }
        })
        .sum()
}

fn short_year(s: &str) -> &str {
    match s.char_indices().nth(2) {
        Some((pos, _)) if s.chars().count() == 4 => &s[pos..],
        _ => s,
    }
}

/// Compares a "bubble many" field.
///
/// `expected` is the comma-separated list of the selected codes ("3,6"),
/// `actual` is the concatenation of the labels of the bubbles that the scanner
/// found filled. Every option counts for one unit, whether it was selected or
/// not: a missed bubble and an extra bubble are equally wrong.
pub fn compare_bubbles(actual: &str, expected: &str, options: &[BubbleOption]) -> ComparisonResult {
    let selected: Vec<&str> = expected.split(',').map(|s| s.trim()).collect();
    let correct = options
        .iter()
        .filter(|opt| {
            let expected_selected = selected.contains(&opt.code.as_str());
            let actual_selected = actual.contains(opt.label.as_str());
            expected_selected == actual_selected
        })
        .count();
    ComparisonResult::new(correct as u32, options.len() as u32)
}

/// Compares a short categorical answer such as yes/no.
///
/// An answer always weighs 2 units, like a two-digit field.
pub fn compare_categorical(actual: &str, expected: &str) -> ComparisonResult {
    if actual.trim() == expected.trim() {
        ComparisonResult::new(2, 2)
    } else {
        ComparisonResult::new(0, 2)
    }
}

// **** Classifier ****

fn is_unscorable(expected: &str) -> bool {
    expected.is_empty()
        || UNSCORABLE_VALUES
            .iter()
            .any(|v| expected.eq_ignore_ascii_case(v))
}

fn contains_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

/// Compares one value read by the scanner with the verified value, using the
/// rule of the field.
///
/// When no field is given, or its kind is `Auto`, the rule is picked from the
/// expected value: dates first, then anything holding a digit, then
/// categorical answers.
pub fn classify_and_score(
    actual: &str,
    expected: &str,
    spec: Option<&FieldSpec>,
) -> ComparisonResult {
    let actual = actual.trim();
    let expected = expected.trim();
    if is_unscorable(expected) {
        return ComparisonResult::SKIPPED;
    }

    let kind = spec.map(|s| &s.kind).unwrap_or(&FieldKind::Auto);
    match kind {
        FieldKind::Date => compare_dates(actual, expected),
        FieldKind::Bubble(options) => compare_bubbles(actual, expected, options),
        FieldKind::Digits => compare_digits(actual, expected),
        FieldKind::Categorical => compare_categorical(actual, expected),
        FieldKind::Identifier { width } => {
            let actual = pad_to_width(actual, *width);
            let expected = pad_to_width(expected, *width);
            sniff_and_score(&actual, &expected)
        }
        FieldKind::Auto => sniff_and_score(actual, expected),
    }
}

fn sniff_and_score(actual: &str, expected: &str) -> ComparisonResult {
    if is_date(expected) {
        compare_dates(actual, expected)
    } else if contains_digit(expected) {
        compare_digits(actual, expected)
    } else {
        compare_categorical(actual, expected)
    }
}

// **** Scorer ****

/// Scores all the fields of one form.
///
/// The three slices must have the same length. Fields with a missing value on
/// either side are not scored.
pub fn score_form(
    actual: &[FieldValue],
    expected: &[FieldValue],
    form: &FormSpec,
) -> Result<Vec<ComparisonResult>, AccuracyError> {
    if actual.len() != form.len() || expected.len() != form.len() {
        return Err(AccuracyError::FieldCountMismatch {
            id: None,
            fields: form.len(),
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    let mut res: Vec<ComparisonResult> = Vec::with_capacity(form.len());
    for (idx, spec) in form.fields.iter().enumerate() {
        let (a, e) = match (&actual[idx], &expected[idx]) {
            (Some(a), Some(e)) => (a, e),
            _ => {
                res.push(ComparisonResult::SKIPPED);
                continue;
            }
        };
        let cr = classify_and_score(a, e, Some(spec));
        if !cr.is_perfect() {
            info!(
                "Field {} ({}): actual = {:?}, expected = {:?} ({} correct)",
                idx, spec.name, a, e, cr
            );
        }
        res.push(cr);
    }
    Ok(res)
}

// **** Reconciler ****

/// Matches the scanner output against the ground truth and scores every form
/// present in both.
pub fn reconcile(
    actual: &Dataset,
    expected: &Dataset,
    form: &FormSpec,
) -> Result<Reconciliation, AccuracyError> {
    info!(
        "Reconciling {} scanned forms with {} verified forms on {} fields",
        actual.len(),
        expected.len(),
        form.len()
    );

    let mut tally = AccuracyTally::new(form.len());
    let mut matching: BTreeSet<Identifier> = BTreeSet::new();
    let mut only_expected: BTreeSet<Identifier> = BTreeSet::new();

    for (id, expected_record) in expected.iter() {
        match actual.get(id) {
            Some(actual_record) => {
                debug!("reconcile: scoring client id {}", id);
                let form_res = score_form(actual_record, expected_record, form).map_err(
                    |e| match e {
                        AccuracyError::FieldCountMismatch {
                            fields,
                            expected,
                            actual,
                            ..
                        } => AccuracyError::FieldCountMismatch {
                            id: Some(id.clone()),
                            fields,
                            expected,
                            actual,
                        },
                    },
                )?;
                tally.record(&form_res);
                matching.insert(id.clone());
            }
            None => {
                debug!("reconcile: client id {} only in the ground truth", id);
                only_expected.insert(id.clone());
            }
        }
    }

    let only_actual: BTreeSet<Identifier> = actual
        .keys()
        .filter(|id| !expected.contains_key(*id))
        .cloned()
        .collect();

    info!(
        "Reconciled: {} matching, {} only in ground truth, {} only in scan output",
        matching.len(),
        only_expected.len(),
        only_actual.len()
    );

    Ok(Reconciliation {
        tally,
        matching,
        only_expected,
        only_actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn health_conditions() -> Vec<BubbleOption> {
        vec![
            BubbleOption::new("1", "hypertension/pre-eclampsia"),
            BubbleOption::new("2", "diabetes"),
            BubbleOption::new("3", "under the age of 20"),
            BubbleOption::new("4", "underweight"),
            BubbleOption::new("5", "carrying twins or triplets"),
            BubbleOption::new("6", "history of preterm delivery"),
            BubbleOption::new("7", "history of stillbirth or neonatal birth"),
            BubbleOption::new("8", "other1"),
            BubbleOption::new("9", "other2"),
        ]
    }

    fn bubble_spec() -> FieldSpec {
        FieldSpec::new("health_cond", FieldKind::Bubble(health_conditions()))
    }

    fn cr(correct: u32, total: u32) -> ComparisonResult {
        ComparisonResult::new(correct, total)
    }

    fn rec(values: &[Option<&str>]) -> FormRecord {
        values.iter().map(|v| v.map(|s| s.to_string())).collect()
    }

    fn small_form() -> FormSpec {
        FormSpec::new(vec![
            FieldSpec::new(
                "client_id",
                FieldKind::Identifier {
                    width: DEFAULT_IDENTIFIER_WIDTH,
                },
            ),
            FieldSpec::new("age", FieldKind::Digits),
            FieldSpec::new("edd", FieldKind::Date),
            FieldSpec::new("reg", FieldKind::Categorical),
        ])
    }

    #[test]
    fn normalize_ids() {
        assert_eq!(normalize_identifier(Some("00123")), Some("123".to_string()));
        assert_eq!(normalize_identifier(Some("  42 ")), Some("42".to_string()));
        assert_eq!(normalize_identifier(Some("000")), Some("0".to_string()));
        assert_eq!(normalize_identifier(Some("0")), Some("0".to_string()));
        assert_eq!(normalize_identifier(Some("1200")), Some("1200".to_string()));
        assert_eq!(normalize_identifier(Some("")), Some("".to_string()));
        assert_eq!(normalize_identifier(None), None);
    }

    #[test]
    fn pad_ids() {
        assert_eq!(pad_to_width("123", 5), "00123");
        assert_eq!(pad_to_width("1 3", 5), "00103");
        assert_eq!(pad_to_width(" 12 ", 5), "00012");
        assert_eq!(pad_to_width("12345", 5), "12345");
        assert_eq!(pad_to_width("123456", 5), "123456");
    }

    #[test]
    fn digits_identical() {
        for s in ["0", "7", "42", "12345", "0012300"] {
            let r = compare_digits(s, s);
            assert_eq!(r.correct, r.total);
            assert_eq!(r.total as usize, s.len());
        }
    }

    #[test]
    fn digits_right_aligned() {
        assert_eq!(compare_digits("9912345", "12345"), cr(5, 5));
        assert_eq!(compare_digits("12345", "12345"), cr(5, 5));
        // The actual value is shorter: only the overlapping part is compared.
        assert_eq!(compare_digits("45", "12345"), cr(2, 2));
        assert_eq!(compare_digits("12346", "12345"), cr(4, 5));
    }

    #[test]
    fn digits_skip_separators() {
        assert_eq!(compare_digits("1-2-345", "1-2-345"), cr(5, 5));
        assert_eq!(compare_digits("1x2y345", "1-2-345"), cr(5, 5));
        // Lock-step: the separator positions consume actual characters too.
        assert_eq!(compare_digits("12345", "1-2-345"), cr(3, 4));
        assert_eq!(compare_digits("1 2", "1 2"), cr(2, 2));
    }

    #[test]
    fn digits_empty() {
        assert_eq!(compare_digits("", "123"), ComparisonResult::SKIPPED);
        assert_eq!(compare_digits("123", ""), ComparisonResult::SKIPPED);
    }

    #[test]
    fn date_detection() {
        assert!(is_date("05/07/15"));
        assert!(is_date("5/7/2015"));
        assert!(is_date(" 5/ 7/15"));
        assert!(!is_date("1/2"));
        assert!(!is_date("1/2/3/4"));
        assert!(!is_date("1//2"));
        assert!(!is_date("12345/1/1"));
        assert!(!is_date("a/b/c"));
        assert!(!is_date("//"));
    }

    #[test]
    fn dates_with_four_digit_years() {
        assert_eq!(compare_dates("5/7/2015", "05/07/15"), cr(4, 4));
        assert_eq!(compare_dates("05/07/15", "05/07/2015"), cr(6, 6));
        assert_eq!(compare_dates("05/08/16", "05/07/15"), cr(4, 6));
    }

    #[test]
    fn dates_unparsable_actual() {
        assert_eq!(compare_dates("May 5th", "05/07/15"), ComparisonResult::SKIPPED);
        assert_eq!(compare_dates("", "05/07/15"), ComparisonResult::SKIPPED);
    }

    #[test]
    fn bubbles_full_match() {
        assert_eq!(
            compare_bubbles(
                "under the age of 20 history of preterm delivery",
                "3,6",
                &health_conditions()
            ),
            cr(9, 9)
        );
    }

    #[test]
    fn bubbles_partial_match() {
        // 1 agrees, 2 and 3 are extra, 6 is missing.
        assert_eq!(
            compare_bubbles(
                "hypertension/pre-eclampsia diabetes under the age of 20",
                "1,6",
                &health_conditions()
            ),
            cr(6, 9)
        );
    }

    #[test]
    fn bubbles_nothing_selected() {
        assert_eq!(compare_bubbles("", "0", &health_conditions()), cr(9, 9));
        assert_eq!(
            compare_bubbles("diabetes", "0", &health_conditions()),
            cr(8, 9)
        );
    }

    #[test]
    fn bubbles_labels_are_case_sensitive() {
        assert_eq!(
            compare_bubbles("Diabetes", "2", &health_conditions()),
            cr(8, 9)
        );
    }

    #[test]
    fn categorical() {
        init();
        assert_eq!(classify_and_score("yes", "null", None), ComparisonResult::SKIPPED);
        assert_eq!(classify_and_score("yes", "no", None), cr(0, 2));
        assert_eq!(classify_and_score("no", "no", None), cr(2, 2));
        assert_eq!(classify_and_score(" no", "no ", None), cr(2, 2));
    }

    #[test]
    fn degenerate_expected_values() {
        for e in ["", "  ", "null", "NULL", "inconclusive"] {
            assert_eq!(classify_and_score("12", e, None), ComparisonResult::SKIPPED);
        }
    }

    #[test]
    fn classify_without_declared_kind() {
        assert_eq!(classify_and_score("5/7/2015", "05/07/15", None), cr(4, 4));
        assert_eq!(classify_and_score("24", "25", None), cr(1, 2));
        assert_eq!(classify_and_score("yes", "yes", None), cr(2, 2));
    }

    #[test]
    fn classify_declared_kinds() {
        // A categorical answer holding a digit stays categorical.
        let cat = FieldSpec::new("regCCPF", FieldKind::Categorical);
        assert_eq!(classify_and_score("option 2", "option 2", Some(&cat)), cr(2, 2));
        assert_eq!(classify_and_score("option 3", "option 2", Some(&cat)), cr(0, 2));

        let bubbles = bubble_spec();
        assert_eq!(
            classify_and_score(
                "under the age of 20 history of preterm delivery",
                "3,6",
                Some(&bubbles)
            ),
            cr(9, 9)
        );

        let date = FieldSpec::new("edd", FieldKind::Date);
        assert_eq!(classify_and_score("12", "05/07/15", Some(&date)), ComparisonResult::SKIPPED);
    }

    #[test]
    fn classify_identifier() {
        let id = FieldSpec::new("client_id", FieldKind::Identifier { width: 5 });
        assert_eq!(classify_and_score("123", "00123", Some(&id)), cr(5, 5));
        assert_eq!(classify_and_score("1 3", "00103", Some(&id)), cr(5, 5));
        assert_eq!(classify_and_score("124", "123", Some(&id)), cr(4, 5));
    }

    #[test]
    fn score_form_skips_missing_values() {
        init();
        let form = small_form();
        let actual = rec(&[Some("123"), None, Some("5/7/2015"), Some("yes")]);
        let expected = rec(&[Some("00123"), Some("25"), Some("05/07/15"), Some("no")]);
        let res = score_form(&actual, &expected, &form).unwrap();
        assert_eq!(
            res,
            vec![cr(5, 5), ComparisonResult::SKIPPED, cr(4, 4), cr(0, 2)]
        );
    }

    #[test]
    fn score_form_length_mismatch() {
        let form = small_form();
        let actual = rec(&[Some("123")]);
        let expected = rec(&[Some("00123"), Some("25"), Some("05/07/15"), Some("no")]);
        let res = score_form(&actual, &expected, &form);
        assert!(matches!(
            res,
            Err(AccuracyError::FieldCountMismatch {
                fields: 4,
                expected: 4,
                actual: 1,
                ..
            })
        ));
    }

    fn datasets() -> (Dataset, Dataset) {
        let mut actual = Dataset::new();
        actual.insert(
            "123".to_string(),
            rec(&[Some("123"), Some("25"), Some("5/7/2015"), Some("yes")]),
        );
        actual.insert(
            "456".to_string(),
            rec(&[Some("456"), Some("31"), Some("1/1/16"), Some("no")]),
        );
        actual.insert(
            "789".to_string(),
            rec(&[Some("789"), Some("19"), None, Some("no")]),
        );

        let mut expected = Dataset::new();
        expected.insert(
            "123".to_string(),
            rec(&[Some("00123"), Some("25"), Some("05/07/15"), Some("yes")]),
        );
        expected.insert(
            "456".to_string(),
            rec(&[Some("00456"), Some("34"), Some("01/01/16"), Some("yes")]),
        );
        expected.insert(
            "999".to_string(),
            rec(&[Some("00999"), Some("40"), None, Some("no")]),
        );
        (actual, expected)
    }

    #[test]
    fn reconcile_datasets() {
        init();
        let (actual, expected) = datasets();
        let form = small_form();
        let r = reconcile(&actual, &expected, &form).unwrap();
        assert_eq!(r.matching.iter().cloned().collect::<Vec<_>>(), vec!["123", "456"]);
        assert_eq!(r.only_expected.iter().cloned().collect::<Vec<_>>(), vec!["999"]);
        assert_eq!(r.only_actual.iter().cloned().collect::<Vec<_>>(), vec!["789"]);
        assert_eq!(r.tally.forms_scored, 2);
        assert_eq!(
            r.tally.fields,
            vec![cr(10, 10), cr(3, 4), cr(8, 8), cr(2, 4)]
        );
        assert_eq!(r.tally.overall(), cr(23, 26));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let (actual, expected) = datasets();
        let form = small_form();
        let r1 = reconcile(&actual, &expected, &form).unwrap();
        let r2 = reconcile(&actual, &expected, &form).unwrap();
        assert_eq!(r1, r2);
    }

    #[test]
    fn reconcile_reports_the_faulty_id() {
        let (actual, mut expected) = datasets();
        expected.insert("123".to_string(), rec(&[Some("00123")]));
        let res = reconcile(&actual, &expected, &small_form());
        assert_eq!(
            res,
            Err(AccuracyError::FieldCountMismatch {
                id: Some("123".to_string()),
                fields: 4,
                expected: 1,
                actual: 4,
            })
        );
    }

    #[test]
    fn duplicate_ids_are_never_matched() {
        let mut b = builder::DatasetBuilder::new("ground truth");
        let raw_ids = ["00123", "00456", "123"];
        for raw in raw_ids {
            let id = normalize_identifier(Some(raw)).unwrap();
            b.add(&id, rec(&[Some(raw), Some("25"), None, None]));
        }
        let expected = b.build();
        assert!(!expected.contains_key("123"));

        let (actual, _) = datasets();
        let r = reconcile(&actual, &expected, &small_form()).unwrap();
        assert!(!r.matching.contains("123"));
        assert!(r.only_actual.contains("123"));
        assert!(r.matching.contains("456"));
    }

    #[test]
    fn tally_merge_is_associative() {
        let mut t1 = AccuracyTally::new(2);
        t1.record(&[cr(1, 2), cr(0, 0)]);
        let mut t2 = AccuracyTally::new(2);
        t2.record(&[cr(3, 3), cr(2, 2)]);
        let mut t3 = AccuracyTally::new(2);
        t3.record(&[cr(0, 5), cr(9, 9)]);
        t3.record(&[cr(1, 1), cr(0, 2)]);

        let left = t1.merge(&t2).merge(&t3);
        let right = t1.merge(&t2.merge(&t3));
        assert_eq!(left, right);
        assert_eq!(left.forms_scored, 4);
        assert_eq!(left.fields, vec![cr(5, 11), cr(11, 13)]);
        assert_eq!(left.merge(&AccuracyTally::new(2)), left);
    }
}
