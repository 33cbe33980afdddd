use log::{debug, info, warn};

use form_accuracy::report::AccuracyReport;
use form_accuracy::*;
use snafu::{prelude::*, Snafu};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::scan::config_reader::*;
use crate::scan::io_excel::{read_alignment_scores, read_ground_truth};
use crate::scan::io_folders::{copy_subset, folder_client_id, index_folders};
use crate::scan::io_scanner::read_scan_output;

pub mod config_reader;
pub mod io_common;
pub mod io_excel;
pub mod io_folders;
pub mod io_scanner;

#[derive(Debug, Snafu)]
pub enum ScanError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Sheet {sheet} not found in {path}"))]
    MissingSheet { sheet: String, path: String },
    #[snafu(display("Error reading file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error listing the folders of {path}"))]
    ReadingDirectory {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error copying {path}"))]
    CopyingFolder {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid column {column}"))]
    InvalidColumn { column: String },
    #[snafu(display("Invalid configuration: {message}"))]
    InvalidConfig { message: String },
    #[snafu(display("No {what} given, in the configuration or on the command line"))]
    MissingPath { what: String },
    #[snafu(display("Error while comparing the forms"))]
    Accuracy { source: AccuracyError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ScanResult<T> = Result<T, ScanError>;

pub fn run(args: &Args) -> ScanResult<()> {
    let config = match &args.config {
        Some(p) => read_config(p)?,
        None => {
            info!("No configuration given, using the built-in form");
            default_config()?
        }
    };
    match &args.command {
        Command::Check {
            workbook,
            input,
            out,
            reference,
        } => run_check(
            &config,
            workbook.as_deref(),
            input.as_deref(),
            out.as_deref(),
            reference.as_deref(),
        ),
        Command::Alignment { workbook, source } => {
            run_alignment(&config, workbook.as_deref(), source)
        }
        Command::Collect {
            destination,
            workbook,
            source,
        } => run_collect(&config, destination, workbook.as_deref(), source),
    }
}

fn run_check(
    config: &ScanConfig,
    workbook: Option<&str>,
    input: Option<&str>,
    out: Option<&str>,
    reference: Option<&str>,
) -> ScanResult<()> {
    let form = config.form_spec()?;
    let workbook_p = pick_path(workbook, config.workbook_path(), "ground truth workbook")?;
    let root_p = pick_path(input, config.scan_root(), "scan output directory")?;

    let expected = read_ground_truth(
        &workbook_p,
        &config.ground_truth.sheets,
        config.id_column()?,
        &config.columns()?,
    )?;
    let actual = read_scan_output(
        &root_p,
        config.scan_output.id_file_name(),
        config.scan_output.output_file_name(),
        &config.positions(),
    )?;

    let report = evaluate(&actual, &expected, &form)?;
    print_report(&report);

    let summary = summary_js(&report);
    let pretty_js_summary = serde_json::to_string_pretty(&summary).context(WritingJsonSnafu)?;
    match out {
        None | Some("") => {}
        Some("stdout") => println!("{}", pretty_js_summary),
        Some(p) => {
            fs::write(p, &pretty_js_summary).context(OpeningFileSnafu { path: p })?;
            info!("Summary written to {}", p);
        }
    }

    if let Some(reference_p) = reference {
        check_reference(&pretty_js_summary, reference_p)?;
    }
    Ok(())
}

fn run_alignment(config: &ScanConfig, workbook: Option<&str>, sources: &[String]) -> ScanResult<()> {
    let workbook_p = pick_path(workbook, config.workbook_path(), "ground truth workbook")?;
    let sources = pick_sources(config, sources)?;

    let scores = read_alignment_scores(
        &workbook_p,
        &config.ground_truth.sheets,
        config.id_column()?,
        &config.alignment_columns()?,
    )?;

    // Sorted by folder name.
    let mut folders: BTreeMap<String, Identifier> = BTreeMap::new();
    for source in sources.iter() {
        for folder in io_common::list_subdirectories(source)? {
            let name = io_common::simplify_file_name(&folder);
            if let Some(id) = folder_client_id(&name) {
                folders.insert(name, id);
            }
        }
    }

    for (name, id) in folders.iter() {
        match scores.get(id) {
            Some(Some(score)) => println!("{}: {:.2}", name, score),
            Some(None) => println!("{}: no rating", name),
            None => println!("{}: not in the ground truth", name),
        }
    }
    Ok(())
}

fn run_collect(
    config: &ScanConfig,
    destination: &str,
    workbook: Option<&str>,
    sources: &[String],
) -> ScanResult<()> {
    let workbook_p = pick_path(workbook, config.workbook_path(), "ground truth workbook")?;
    let sources = pick_sources(config, sources)?;

    let expected = read_ground_truth(
        &workbook_p,
        &config.ground_truth.sheets,
        config.id_column()?,
        &config.columns()?,
    )?;
    let ids: BTreeSet<Identifier> = expected.keys().cloned().collect();
    let index = index_folders(&sources)?;
    let missing = copy_subset(&ids, &index, Path::new(destination))?;

    println!(
        "Copied {} folders to {}",
        ids.len() - missing.len(),
        destination
    );
    if !missing.is_empty() {
        println!("No scanned folder for {} client ids: {:?}", missing.len(), missing);
    }
    Ok(())
}

/// Compares the scanner output with the ground truth.
pub fn evaluate(actual: &Dataset, expected: &Dataset, form: &FormSpec) -> ScanResult<AccuracyReport> {
    let rec = reconcile(actual, expected, form).context(AccuracySnafu)?;
    if !rec.only_expected.is_empty() {
        info!("Client ids only in the ground truth: {:?}", rec.only_expected);
    }
    if !rec.only_actual.is_empty() {
        info!("Client ids only in the scan output: {:?}", rec.only_actual);
    }
    debug!("evaluate: tally: {:?}", rec.tally);
    Ok(AccuracyReport::new(&rec, form))
}

fn pick_path(cli: Option<&str>, configured: Option<PathBuf>, what: &str) -> ScanResult<PathBuf> {
    match cli {
        Some(p) => Ok(PathBuf::from(p)),
        None => configured.context(MissingPathSnafu { what }),
    }
}

fn pick_sources(config: &ScanConfig, cli: &[String]) -> ScanResult<Vec<PathBuf>> {
    let sources: Vec<PathBuf> = if cli.is_empty() {
        config.alignment_sources()
    } else {
        cli.iter().map(PathBuf::from).collect()
    };
    ensure!(
        !sources.is_empty(),
        MissingPathSnafu {
            what: "directory of scanned folders"
        }
    );
    Ok(sources)
}

fn format_result(cr: &ComparisonResult) -> String {
    match cr.percentage() {
        Some(p) => format!("{} correct ({:.2}%)", cr, p),
        None => format!("{} correct (n/a)", cr),
    }
}

fn print_report(report: &AccuracyReport) {
    println!("FINAL RESULTS:");
    for f in report.fields.iter() {
        println!("Field {} ({}): {}", f.index, f.name, format_result(&f.result));
    }
    println!();
    for (cat, cr) in report.categories.iter() {
        println!("Total {} fields: {}", cat.name(), format_result(cr));
    }
    println!("Total: {}", format_result(&report.overall));
    println!();
    println!("Forms scored: {}", report.forms_scored);
    println!("Matching Client IDs: {}", report.num_matching);
    println!("Only in ground truth: {}", report.num_only_expected);
    println!("Only in scan output: {}", report.num_only_actual);
}

fn result_js(cr: &ComparisonResult) -> JSValue {
    json!({
        "correct": cr.correct,
        "total": cr.total,
        "percentage": cr.percentage().map(|p| format!("{:.2}", p)),
    })
}

fn summary_js(report: &AccuracyReport) -> JSValue {
    let fields: Vec<JSValue> = report
        .fields
        .iter()
        .map(|f| {
            json!({
                "index": f.index,
                "name": f.name,
                "category": f.category.name(),
                "result": result_js(&f.result),
            })
        })
        .collect();
    let mut categories: JSMap<String, JSValue> = JSMap::new();
    for (cat, cr) in report.categories.iter() {
        categories.insert(cat.name().to_string(), result_js(cr));
    }
    json!({
        "fields": fields,
        "categories": categories,
        "overall": result_js(&report.overall),
        "formsScored": report.forms_scored,
        "matchingClientIds": report.num_matching,
        "onlyInGroundTruth": report.num_only_expected,
        "onlyInScanOutput": report.num_only_actual,
    })
}

fn read_summary(path: &str) -> ScanResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path })
}

fn check_reference(pretty_js_summary: &str, reference_p: &str) -> ScanResult<()> {
    let summary_ref = read_summary(reference_p)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu)?;
    if pretty_js_summary_ref != pretty_js_summary {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_summary, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(values: &[Option<&str>]) -> FormRecord {
        values.iter().map(|v| v.map(|s| s.to_string())).collect()
    }

    fn form() -> FormSpec {
        FormSpec::new(vec![
            FieldSpec::new("client_id", FieldKind::Identifier { width: 5 }),
            FieldSpec::new("TTV2", FieldKind::Categorical),
        ])
    }

    fn datasets() -> (Dataset, Dataset) {
        let mut actual = Dataset::new();
        actual.insert("123".to_string(), rec(&[Some("00123"), Some("yes")]));
        actual.insert("9".to_string(), rec(&[Some("9"), Some("no")]));
        let mut expected = Dataset::new();
        expected.insert("123".to_string(), rec(&[Some("123"), Some("no")]));
        expected.insert("7".to_string(), rec(&[Some("7"), Some("no")]));
        (actual, expected)
    }

    #[test]
    fn evaluate_two_datasets() {
        let (actual, expected) = datasets();
        let report = evaluate(&actual, &expected, &form()).unwrap();
        assert_eq!(report.fields[0].result, ComparisonResult::new(5, 5));
        assert_eq!(report.fields[1].result, ComparisonResult::new(0, 2));
        assert_eq!(report.overall, ComparisonResult::new(5, 7));
        assert_eq!(report.num_matching, 1);
        assert_eq!(report.num_only_expected, 1);
        assert_eq!(report.num_only_actual, 1);
    }

    #[test]
    fn evaluate_mismatched_records() {
        let (mut actual, expected) = datasets();
        actual.insert("123".to_string(), rec(&[Some("123")]));
        assert!(matches!(
            evaluate(&actual, &expected, &form()),
            Err(ScanError::Accuracy { .. })
        ));
    }

    #[test]
    fn summary() {
        let (actual, expected) = datasets();
        let report = evaluate(&actual, &expected, &form()).unwrap();
        let js = summary_js(&report);
        assert_eq!(js["fields"][1]["name"], json!("TTV2"));
        assert_eq!(js["fields"][1]["category"], json!("categorical"));
        assert_eq!(js["overall"]["correct"], json!(5));
        assert_eq!(js["overall"]["total"], json!(7));
        assert_eq!(js["overall"]["percentage"], json!("71.43"));
        assert_eq!(js["matchingClientIds"], json!(1));
    }

    #[test]
    fn reference_summaries() {
        let (actual, expected) = datasets();
        let report = evaluate(&actual, &expected, &form()).unwrap();
        let pretty = serde_json::to_string_pretty(&summary_js(&report)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let same = dir.path().join("same.json");
        fs::write(&same, &pretty).unwrap();
        assert!(check_reference(&pretty, same.to_str().unwrap()).is_ok());

        let other = dir.path().join("other.json");
        fs::write(&other, json!({ "overall": {} }).to_string()).unwrap();
        assert!(matches!(
            check_reference(&pretty, other.to_str().unwrap()),
            Err(ScanError::Whatever { .. })
        ));
    }

    #[test]
    fn paths() {
        assert_eq!(
            pick_path(Some("a.xlsx"), Some(PathBuf::from("b.xlsx")), "x").unwrap(),
            PathBuf::from("a.xlsx")
        );
        assert_eq!(
            pick_path(None, Some(PathBuf::from("b.xlsx")), "x").unwrap(),
            PathBuf::from("b.xlsx")
        );
        assert!(matches!(
            pick_path(None, None, "x"),
            Err(ScanError::MissingPath { .. })
        ));
    }
}
