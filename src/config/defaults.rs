//! Default values for firmsim configuration.
//!
//! Path templates are relative to the firmware root and may use the
//! `{firmware_name}` (root basename) and `{firmware_dir}` (resolved
//! sub-directory under `output_json/`) placeholders.

/// Default overall score at or above which a pair is predicted similar.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Default module weights.
pub const DEFAULT_BINWALK_WEIGHT: f64 = 0.1;
pub const DEFAULT_INTERFACE_EXPOSURE_WEIGHT: f64 = 0.3;
pub const DEFAULT_PARAM_CHAIN_WEIGHT: f64 = 0.3;
pub const DEFAULT_SYMBOL_INVENTORY_WEIGHT: f64 = 0.1;
pub const DEFAULT_FILESYSTEM_PROFILE_WEIGHT: f64 = 0.2;

pub const DEFAULT_BINWALK_TEMPLATE: &str = "binwalk_docker_result/binwalk_log/{firmware_dir}.json";
pub const DEFAULT_NGRAM_SIZE: usize = 3;

pub const DEFAULT_INTERFACE_CANDIDATES: &[&str] = &[
    "output_json/{firmware_dir}/keyword_extract_result/simple/API_simple.result",
    "output_json/{firmware_dir}/API_simple.result",
    "output_json/{firmware_dir}/keyword_extract_result/API_simple.result",
];
pub const DEFAULT_PARAM_NAME_CANDIDATES: &[&str] = &[
    "output_json/{firmware_dir}/keyword_extract_result/simple/Prar_simple.result",
    "output_json/{firmware_dir}/Prar_simple.result",
    "output_json/{firmware_dir}/keyword_extract_result/Prar_simple.result",
];
pub const DEFAULT_FUNC_NAME_TEMPLATE: &str = "output_json/{firmware_dir}/func_name.txt";

pub const DEFAULT_PARAM_LINK_TEMPLATE: &str = "output_json/{firmware_name}/param_link.json";
pub const DEFAULT_MAX_LINKS_PER_LENGTH: usize = 5;

pub const DEFAULT_SYMBOL_FOLDER_TEMPLATE: &str = "output_json/{firmware_dir}";

pub const DEFAULT_OUTPUT_JSON_TEMPLATE: &str = "output_json/{firmware_name}/output.json";
pub const DEFAULT_STRING_FILE_TEMPLATE: &str = "output_json/{firmware_name}/string_name.txt";
pub const DEFAULT_ALL_STRINGS_TEMPLATE: &str = "output_json/{firmware_dir}/{firmware_dir}_all_strings";

/// Fuzzy-hash score (0-100) a candidate must exceed to count as a match.
pub const DEFAULT_FUZZY_THRESHOLD: u32 = 50;
pub const DEFAULT_MIN_STRING_LENGTH: usize = 4;

pub const DEFAULT_RESULT_DIR: &str = "comparison_results";
pub const DEFAULT_LOGS_DIR: &str = "logs";

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_STALL_POLLS: u32 = 30;
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

/// Column holding the label in dataset rows (column 0 is a row index).
pub const DEFAULT_LABEL_COLUMN: usize = 1;

pub(crate) fn templates(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
