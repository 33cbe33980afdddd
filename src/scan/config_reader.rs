use crate::scan::*;

use form_accuracy::{BubbleOption, FieldKind, FieldSpec, FormSpec, DEFAULT_IDENTIFIER_WIDTH};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

// The antenatal care form, used when no configuration file is given.
const DEFAULT_CONFIG: &str = include_str!("../../config/anc_form.json");

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthSettings {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub sheets: Vec<String>,
    #[serde(rename = "idColumn")]
    pub id_column: JSValue,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScanOutputSettings {
    #[serde(rename = "rootDirectory")]
    pub root_directory: Option<String>,
    #[serde(rename = "idFileName")]
    pub id_file_name: Option<String>,
    #[serde(rename = "outputFileName")]
    pub output_file_name: Option<String>,
}

impl ScanOutputSettings {
    pub fn id_file_name(&self) -> &str {
        self.id_file_name.as_deref().unwrap_or("clientID.txt")
    }

    pub fn output_file_name(&self) -> &str {
        self.output_file_name.as_deref().unwrap_or("output.json")
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BubbleOptionConfig {
    pub code: String,
    pub label: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Column of the workbook (letters or 1-based index).
    pub column: JSValue,
    /// Zero-based index in the `fields` array of the scanner document.
    pub position: usize,
    pub kind: Option<String>,
    pub width: Option<usize>,
    pub options: Option<Vec<BubbleOptionConfig>>,
}

impl FieldConfig {
    pub fn field_spec(&self) -> ScanResult<FieldSpec> {
        if self.options.is_some() && self.kind.as_deref() != Some("bubble") {
            return InvalidConfigSnafu {
                message: format!("field {}: options are only allowed for bubble fields", self.name),
            }
            .fail();
        }
        let kind = match self.kind.as_deref() {
            None | Some("auto") => FieldKind::Auto,
            Some("identifier") => FieldKind::Identifier {
                width: self.width.unwrap_or(DEFAULT_IDENTIFIER_WIDTH),
            },
            Some("digits") => FieldKind::Digits,
            Some("date") => FieldKind::Date,
            Some("categorical") => FieldKind::Categorical,
            Some("bubble") => {
                let options: Vec<BubbleOption> = self
                    .options
                    .iter()
                    .flatten()
                    .map(|o| BubbleOption::new(&o.code, &o.label))
                    .collect();
                ensure!(
                    !options.is_empty(),
                    InvalidConfigSnafu {
                        message: format!("field {}: a bubble field needs options", self.name),
                    }
                );
                FieldKind::Bubble(options)
            }
            Some(x) => {
                return InvalidConfigSnafu {
                    message: format!("field {}: unknown kind {:?}", self.name, x),
                }
                .fail();
            }
        };
        Ok(FieldSpec::new(&self.name, kind))
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentSettings {
    pub columns: Vec<JSValue>,
    pub sources: Option<Vec<String>>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(rename = "groundTruth")]
    pub ground_truth: GroundTruthSettings,
    #[serde(rename = "scanOutput", default)]
    pub scan_output: ScanOutputSettings,
    pub fields: Vec<FieldConfig>,
    pub alignment: Option<AlignmentSettings>,
    /// The directory of the configuration file. Relative paths start from there.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl ScanConfig {
    pub fn form_spec(&self) -> ScanResult<FormSpec> {
        let fields = self
            .fields
            .iter()
            .map(|f| f.field_spec())
            .collect::<ScanResult<Vec<FieldSpec>>>()?;
        Ok(FormSpec::new(fields))
    }

    pub fn id_column(&self) -> ScanResult<usize> {
        read_column(&self.ground_truth.id_column)
    }

    pub fn columns(&self) -> ScanResult<Vec<usize>> {
        self.fields.iter().map(|f| read_column(&f.column)).collect()
    }

    pub fn positions(&self) -> Vec<usize> {
        self.fields.iter().map(|f| f.position).collect()
    }

    pub fn alignment_columns(&self) -> ScanResult<Vec<usize>> {
        let settings = self.alignment.as_ref().context(InvalidConfigSnafu {
            message: "no alignment columns in the configuration",
        })?;
        settings.columns.iter().map(read_column).collect()
    }

    pub fn alignment_sources(&self) -> Vec<PathBuf> {
        self.alignment
            .iter()
            .flat_map(|a| a.sources.iter().flatten())
            .map(|s| self.resolve(s))
            .collect()
    }

    pub fn workbook_path(&self) -> Option<PathBuf> {
        self.ground_truth
            .file_path
            .as_ref()
            .map(|p| self.resolve(p))
    }

    pub fn scan_root(&self) -> Option<PathBuf> {
        self.scan_output
            .root_directory
            .as_ref()
            .map(|p| self.resolve(p))
    }

    pub fn resolve(&self, p: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) if Path::new(p).is_relative() => base.join(p),
            _ => PathBuf::from(p),
        }
    }
}

pub fn parse_config(contents: &str, path: &str) -> ScanResult<ScanConfig> {
    let config: ScanConfig =
        serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    // Catch configuration mistakes before any file is opened.
    config.form_spec()?;
    config.columns()?;
    config.id_column()?;
    Ok(config)
}

pub fn read_config(path: &str) -> ScanResult<ScanConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let mut config = parse_config(&contents, path)?;
    config.base_dir = Path::new(path).parent().map(|p| p.to_path_buf());
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn default_config() -> ScanResult<ScanConfig> {
    parse_config(DEFAULT_CONFIG, "<built-in configuration>")
}

/// Converts an Excel column name (A, Z, AA, GD, ...) to a zero-based index.
pub fn column_index(letters: &str) -> ScanResult<usize> {
    ensure!(
        !letters.is_empty() && letters.chars().all(|c| c.is_ascii_alphabetic()),
        InvalidColumnSnafu { column: letters }
    );
    let total = letters
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .fold(0usize, |acc, c| acc * 26 + (c as usize - 'A' as usize + 1));
    Ok(total - 1)
}

/// Reads a column selector: Excel letters, or a 1-based index given as a
/// number or a string.
fn read_column(x: &JSValue) -> ScanResult<usize> {
    let idx = match x {
        JSValue::String(s) if s.chars().all(|c| c.is_ascii_alphabetic()) => {
            return column_index(s)
        }
        JSValue::String(s) => s.trim().parse::<usize>().ok(),
        JSValue::Number(n) => n.as_u64().map(|x| x as usize),
        _ => None,
    };
    match idx {
        Some(i) if i >= 1 => Ok(i - 1),
        _ => InvalidColumnSnafu {
            column: x.to_string(),
        }
        .fail(),
    }
}
