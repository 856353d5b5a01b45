use crate::scrambler::ScrambleMode;
use fescate_core::frontend::ExternalParser;
use fescate_utils::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which built-in classes have their members protected from renaming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PolicyRepr", into = "PolicyRepr")]
pub enum PredefinedPolicy {
    #[default]
    All,
    None,
    /// Only the listed classes.
    Only(Vec<String>),
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PolicyRepr {
    Word(String),
    List(Vec<String>),
}

impl From<PolicyRepr> for PredefinedPolicy {
    fn from(repr: PolicyRepr) -> Self {
        match repr {
            PolicyRepr::Word(word) if word.eq_ignore_ascii_case("none") => Self::None,
            PolicyRepr::Word(_) => Self::All,
            PolicyRepr::List(classes) => Self::Only(classes),
        }
    }
}

impl From<PredefinedPolicy> for PolicyRepr {
    fn from(policy: PredefinedPolicy) -> Self {
        match policy {
            PredefinedPolicy::All => Self::Word("all".into()),
            PredefinedPolicy::None => Self::Word("none".into()),
            PredefinedPolicy::Only(classes) => Self::List(classes),
        }
    }
}

/// How statement chunks are sized when shuffling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Every chunk holds `min_chunk_size` statements.
    #[default]
    Fixed,
    /// Chunks hold `len / chunk_ratio` statements, at least `min_chunk_size`.
    Ratio,
}

/// Configuration for the obfuscation pipeline.
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObfuscationConfig {
    /// Seed for reproducible runs; the OS provides one when unset.
    pub seed: Option<u64>,

    // === Directory handling ===
    /// Remove the target directory before running.
    pub clean_mode: bool,
    pub max_nested_directory: usize,
    pub follow_symlinks: bool,
    /// Extensions of the files that get obfuscated; everything else is copied.
    pub obfuscate_extensions: Vec<String>,
    /// Path substrings whose files are copied verbatim.
    pub keep: Vec<String>,
    /// Path substrings that are left out of the output entirely.
    pub skip: Vec<String>,
    pub allow_overwrite_empty_files: bool,
    /// Stop at the first file that fails instead of copying it unchanged.
    pub abort_on_error: bool,

    // === Output ===
    /// Header comment placed after the opening tag of every output file.
    pub comment: Option<String>,
    pub remove_comments: bool,
    pub strip_indentation: bool,

    // === Renaming ===
    pub obfuscate_label: bool,
    pub obfuscate_string: bool,
    pub obfuscate_if_stmt: bool,
    pub obfuscate_loop_stmt: bool,
    pub obfuscate_variable: bool,
    pub obfuscate_constant: bool,
    pub obfuscate_property: bool,
    pub obfuscate_namespace: bool,
    pub obfuscate_trait_name: bool,
    pub obfuscate_class_name: bool,
    pub obfuscate_method_name: bool,
    pub obfuscate_function_name: bool,
    pub obfuscate_class_constant: bool,
    pub obfuscate_interface_name: bool,
    pub scramble_mode: ScrambleMode,
    pub scramble_length: usize,

    // === Shuffling ===
    pub shuffle_stmts: bool,
    pub chunk_mode: ChunkMode,
    pub chunk_ratio: usize,
    pub min_chunk_size: usize,

    // === Exclusions ===
    pub ignore_predefined_classes: PredefinedPolicy,
    /// Never rename methods whose name contains an underscore.
    pub ignore_snake_case_methods: bool,
    pub ignore_constants: Vec<String>,
    pub ignore_constants_prefix: Vec<String>,
    pub ignore_class_constants: Vec<String>,
    pub ignore_class_constants_prefix: Vec<String>,
    pub ignore_variables: Vec<String>,
    pub ignore_variables_prefix: Vec<String>,
    pub ignore_properties: Vec<String>,
    pub ignore_properties_prefix: Vec<String>,
    pub ignore_functions: Vec<String>,
    pub ignore_functions_prefix: Vec<String>,
    pub ignore_methods: Vec<String>,
    pub ignore_methods_prefix: Vec<String>,
    pub ignore_classes: Vec<String>,
    pub ignore_classes_prefix: Vec<String>,
    pub ignore_interfaces: Vec<String>,
    pub ignore_interfaces_prefix: Vec<String>,
    pub ignore_traits: Vec<String>,
    pub ignore_traits_prefix: Vec<String>,
    pub ignore_namespaces: Vec<String>,
    pub ignore_namespaces_prefix: Vec<String>,
    pub ignore_labels: Vec<String>,
    pub ignore_labels_prefix: Vec<String>,

    // === Host environment ===
    /// JSON dump of the interpreter's built-in symbols, merged over the shipped set.
    pub builtins_file: Option<PathBuf>,
    /// Command that turns a source file into a JSON syntax tree on stdout.
    pub parser_command: String,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            clean_mode: false,
            max_nested_directory: 99,
            follow_symlinks: false,
            obfuscate_extensions: vec!["php".into()],
            keep: Vec::new(),
            skip: Vec::new(),
            allow_overwrite_empty_files: false,
            abort_on_error: true,
            comment: None,
            remove_comments: true,
            strip_indentation: true,
            obfuscate_label: true,
            obfuscate_string: true,
            obfuscate_if_stmt: true,
            obfuscate_loop_stmt: true,
            obfuscate_variable: true,
            obfuscate_constant: true,
            obfuscate_property: true,
            obfuscate_namespace: true,
            obfuscate_trait_name: true,
            obfuscate_class_name: true,
            obfuscate_method_name: true,
            obfuscate_function_name: true,
            obfuscate_class_constant: true,
            obfuscate_interface_name: true,
            scramble_mode: ScrambleMode::Identifier,
            scramble_length: 5,
            shuffle_stmts: true,
            chunk_mode: ChunkMode::Fixed,
            chunk_ratio: 20,
            min_chunk_size: 1,
            ignore_predefined_classes: PredefinedPolicy::All,
            ignore_snake_case_methods: false,
            ignore_constants: Vec::new(),
            ignore_constants_prefix: Vec::new(),
            ignore_class_constants: Vec::new(),
            ignore_class_constants_prefix: Vec::new(),
            ignore_variables: Vec::new(),
            ignore_variables_prefix: Vec::new(),
            ignore_properties: Vec::new(),
            ignore_properties_prefix: Vec::new(),
            ignore_functions: Vec::new(),
            ignore_functions_prefix: Vec::new(),
            ignore_methods: Vec::new(),
            ignore_methods_prefix: Vec::new(),
            ignore_classes: Vec::new(),
            ignore_classes_prefix: Vec::new(),
            ignore_interfaces: Vec::new(),
            ignore_interfaces_prefix: Vec::new(),
            ignore_traits: Vec::new(),
            ignore_traits_prefix: Vec::new(),
            ignore_namespaces: Vec::new(),
            ignore_namespaces_prefix: Vec::new(),
            ignore_labels: Vec::new(),
            ignore_labels_prefix: Vec::new(),
            builtins_file: None,
            parser_command: ExternalParser::DEFAULT_COMMAND.to_string(),
        }
    }
}

impl ObfuscationConfig {
    /// Read a JSON config file and normalise it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.validate())
    }

    /// Clamp shuffling parameters into their usable ranges.
    ///
    /// The scramble length is clamped per mode by the scrambler itself.
    pub fn validate(mut self) -> Self {
        self.min_chunk_size = self.min_chunk_size.max(1);
        self.chunk_ratio = self.chunk_ratio.max(2);
        self.obfuscate_extensions = self
            .obfuscate_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Whether a file with this extension is obfuscated rather than copied.
    pub fn obfuscates_extension(&self, ext: &str) -> bool {
        self.obfuscate_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Switch every rename and rewrite off, leaving only printing.
    pub fn without_renaming(mut self) -> Self {
        self.obfuscate_label = false;
        self.obfuscate_string = false;
        self.obfuscate_if_stmt = false;
        self.obfuscate_loop_stmt = false;
        self.obfuscate_variable = false;
        self.obfuscate_constant = false;
        self.obfuscate_property = false;
        self.obfuscate_namespace = false;
        self.obfuscate_trait_name = false;
        self.obfuscate_class_name = false;
        self.obfuscate_method_name = false;
        self.obfuscate_function_name = false;
        self.obfuscate_class_constant = false;
        self.obfuscate_interface_name = false;
        self.shuffle_stmts = false;
        self
    }
}
