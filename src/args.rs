use clap::{Parser, Subcommand};

/// Measures how accurately scanned paper forms were read, by comparing the scanner output with a verified
/// spreadsheet.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the form: the workbook, the scan output directory and the
    /// fields to compare. If not provided, the built-in antenatal care form is used, and the paths must be given
    /// with the options of the subcommand.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compares the scan output with the ground truth and prints the accuracy of every field.
    Check {
        /// (file path) The Excel workbook with the verified values. Overrides the path of the configuration.
        #[clap(short, long, value_parser)]
        workbook: Option<String>,

        /// (directory) The root of the scan output, with one sub-folder per scanned form. Overrides the path of the
        /// configuration.
        #[clap(short, long, value_parser)]
        input: Option<String>,

        /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
        /// location.
        #[clap(short, long, value_parser)]
        out: Option<String>,

        /// (file path) A reference summary in JSON format. If provided, scanacc will check that the computed
        /// summary matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Prints the mean misalignment rating of every scanned folder.
    Alignment {
        /// (file path) The Excel workbook with the misalignment ratings.
        #[clap(short, long, value_parser)]
        workbook: Option<String>,

        /// (directories) The folders containing the scanned forms, named `<anything>_id_<client id>`.
        #[clap(short, long, value_parser)]
        source: Vec<String>,
    },
    /// Copies the scanned folders of all the forms present in the ground truth to a new directory.
    Collect {
        /// (directory) Where the folders are copied.
        #[clap(short, long, value_parser)]
        destination: String,

        /// (file path) The Excel workbook with the verified values.
        #[clap(short, long, value_parser)]
        workbook: Option<String>,

        /// (directories) The folders containing the scanned forms, named `<anything>_id_<client id>`.
        #[clap(short, long, value_parser)]
        source: Vec<String>,
    },
}
