// Reads the values extracted by the scanner.
//
// Every scanned form has its own folder, holding a small text file with the
// client id and the JSON document produced by the scanner.

use form_accuracy::builder::DatasetBuilder;
use form_accuracy::{normalize_identifier, Dataset, FieldValue, FormRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

use crate::scan::io_common::{first_token, list_subdirectories, simplify_file_name};
use crate::scan::*;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ScanField {
    #[serde(default)]
    value: JSValue,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct ScanDocument {
    fields: Vec<ScanField>,
}

fn value_to_string(v: &JSValue) -> FieldValue {
    match v {
        JSValue::Null => None,
        JSValue::String(s) => Some(s.clone()),
        JSValue::Number(n) => Some(n.to_string()),
        JSValue::Bool(b) => Some(b.to_string()),
        other => {
            debug!("value_to_string: unexpected value {:?}", other);
            None
        }
    }
}

/// Extracts the values at the given positions of one scanner document.
pub fn read_scan_document(path: &Path, positions: &[usize]) -> ScanResult<FormRecord> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningFileSnafu {
        path: path_s.clone(),
    })?;
    let doc: ScanDocument =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path: path_s.clone() })?;
    let record: FormRecord = positions
        .iter()
        .map(|pos| match doc.fields.get(*pos) {
            Some(f) => value_to_string(&f.value),
            None => {
                warn!(
                    "{}: no field at position {} ({} fields)",
                    path_s,
                    pos,
                    doc.fields.len()
                );
                None
            }
        })
        .collect();
    Ok(record)
}

/// Reads the scanner output of every folder under `root`.
///
/// Folders without an id file or without a scanner document are skipped.
/// Client ids found in several folders are dropped.
pub fn read_scan_output(
    root: &Path,
    id_file_name: &str,
    output_file_name: &str,
    positions: &[usize],
) -> ScanResult<Dataset> {
    info!("Attempting to read scan output in {:?}", root);
    let mut builder: DatasetBuilder<FormRecord> = DatasetBuilder::new("scan output");
    for folder in list_subdirectories(root)? {
        let name = simplify_file_name(&folder);
        let id_path = folder.join(id_file_name);
        let output_path = folder.join(output_file_name);
        if !id_path.is_file() {
            warn!("{}: no {} file, folder skipped", name, id_file_name);
            continue;
        }
        if !output_path.is_file() {
            warn!("{}: no {} file, folder skipped", name, output_file_name);
            continue;
        }

        let id_contents = fs::read_to_string(&id_path).context(OpeningFileSnafu {
            path: id_path.display().to_string(),
        })?;
        let id = match normalize_identifier(first_token(&id_contents)) {
            Some(id) => id,
            None => {
                warn!("{}: empty {} file, folder skipped", name, id_file_name);
                continue;
            }
        };

        let record = read_scan_document(&output_path, positions)?;
        debug!("read_scan_output: {}: id: {:?} values: {:?}", name, id, record);
        builder.add(&id, record);
    }
    let dataset = builder.build();
    info!("Read {} scanned forms from {:?}", dataset.len(), root);
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_folder(root: &Path, name: &str, id: Option<&str>, doc: Option<&JSValue>) {
        let folder = root.join(name);
        fs::create_dir(&folder).unwrap();
        if let Some(id) = id {
            fs::write(folder.join("clientID.txt"), id).unwrap();
        }
        if let Some(doc) = doc {
            fs::write(folder.join("output.json"), doc.to_string()).unwrap();
        }
    }

    fn doc(values: &[JSValue]) -> JSValue {
        let fields: Vec<JSValue> = values.iter().map(|v| json!({ "value": v })).collect();
        json!({ "fields": fields })
    }

    #[test]
    fn values_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("output.json");
        let d = json!({
            "fields": [
                { "value": "00123" },
                { "value": 25 },
                { "value": null },
                { "label": "no value" },
                { "value": true }
            ]
        });
        fs::write(&p, d.to_string()).unwrap();
        let record = read_scan_document(&p, &[0, 1, 2, 3, 4, 9]).unwrap();
        assert_eq!(
            record,
            vec![
                Some("00123".to_string()),
                Some("25".to_string()),
                None,
                None,
                Some("true".to_string()),
                None
            ]
        );
    }

    #[test]
    fn broken_documents_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("output.json");
        fs::write(&p, "{ not json").unwrap();
        assert!(matches!(
            read_scan_document(&p, &[0]),
            Err(ScanError::ParsingJson { .. })
        ));
    }

    #[test]
    fn folders() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_folder(root, "a", Some("00123\n"), Some(&doc(&[json!("yes"), json!(3)])));
        write_folder(root, "b", Some("456 trailing"), Some(&doc(&[json!("no")])));
        // Same client as "a": both are dropped.
        write_folder(root, "c", Some("123"), Some(&doc(&[json!("no"), json!(4)])));
        write_folder(root, "d", None, Some(&doc(&[json!("x")])));
        write_folder(root, "e", Some("789"), None);
        write_folder(root, "f", Some("  "), Some(&doc(&[json!("x")])));
        write_folder(root, "g", Some("0042"), Some(&doc(&[json!(null), json!("12/3/2015")])));

        let d = read_scan_output(root, "clientID.txt", "output.json", &[0, 1]).unwrap();
        let ids: Vec<&str> = d.keys().map(|s| s.as_str()).collect();
        assert_eq!(ids, vec!["42", "456"]);
        assert_eq!(d["456"], vec![Some("no".to_string()), None]);
        assert_eq!(d["42"], vec![None, Some("12/3/2015".to_string())]);
    }
}
