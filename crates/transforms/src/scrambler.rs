//! Collision-free replacement names, one independent namespace per symbol
//! category.
//!
//! Each [`Scrambler`] memoises `original -> replacement` and keeps the reverse
//! map so that a candidate already handed out is never reused. Candidates are
//! derived from a running Keccak seed that absorbs every name scrambled so far.

use crate::config::{ObfuscationConfig, PredefinedPolicy};
use fescate_core::reserved::{
    Builtins, RESERVED_KEYWORDS, RESERVED_METHODS, RESERVED_NAMES, RESERVED_VARIABLES,
};
use fescate_utils::errors::{ContextError, ScrambleError};
use indexmap::IndexMap;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Version tag written into every persisted context blob.
pub const CONTEXT_VERSION: &str = "1.0";
pub const MIN_LENGTH: usize = 2;
pub const DEFAULT_LENGTH: usize = 5;
/// Candidates tried for one name before giving up.
pub const RETRY_LIMIT: usize = 50;
/// Failed attempt after which the target length grows by one.
const GROW_AFTER: usize = 5;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERICS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const HEX_LETTERS: &[u8] = b"abcdefABCDEF";
const DIGITS: &[u8] = b"0123456789";

/// Symbol categories, each with its own scramble namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Label,
    Method,
    Property,
    Constant,
    Variable,
    ClassConstant,
    FunctionOrClass,
}

impl Category {
    pub const ALL: [Self; 7] = [
        Self::Label,
        Self::Method,
        Self::Property,
        Self::Constant,
        Self::Variable,
        Self::ClassConstant,
        Self::FunctionOrClass,
    ];

    /// Stable name, also used as the context file name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Label => "label",
            Self::Method => "method",
            Self::Property => "property",
            Self::Constant => "constant",
            Self::Variable => "variable",
            Self::ClassConstant => "class_constant",
            Self::FunctionOrClass => "function_or_class",
        }
    }

    /// Functions, classes and methods are resolved case-insensitively by the
    /// language; everything else is case-sensitive.
    pub const fn case_sensitive(self) -> bool {
        !matches!(self, Self::Method | Self::FunctionOrClass)
    }
}

/// Alphabet used for generated names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrambleMode {
    /// A letter followed by letters and digits.
    #[default]
    Identifier,
    /// A hex letter followed by hex digits.
    Hexa,
    /// `O` followed by digits.
    Numeric,
    /// Letters derived from a hash of the original name.
    Hash,
}

impl ScrambleMode {
    pub const fn max_length(self) -> usize {
        match self {
            Self::Identifier | Self::Hash => 16,
            Self::Hexa | Self::Numeric => 32,
        }
    }

    const fn first_chars(self) -> &'static [u8] {
        match self {
            Self::Identifier | Self::Hash => LETTERS,
            Self::Hexa => HEX_LETTERS,
            Self::Numeric => b"O",
        }
    }

    const fn salt_chars(self) -> &'static [u8] {
        match self {
            Self::Numeric => DIGITS,
            _ => ALPHANUMERICS,
        }
    }
}

/// Persisted form of a scrambler: `[version, name_map, length, label_counter]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScramblerState(
    pub String,
    pub IndexMap<String, String>,
    pub usize,
    pub u64,
);

/// Replacement-name generator for one [`Category`].
#[derive(Debug)]
pub struct Scrambler {
    category: Category,
    mode: ScrambleMode,
    length: usize,
    max_length: usize,
    ignores: HashSet<String>,
    ignore_prefixes: Vec<String>,
    scrambles: IndexMap<String, String>,
    reverse: HashMap<String, String>,
    label_counter: u64,
    seed: [u8; 32],
    rng: SmallRng,
}

impl Scrambler {
    /// Build the scrambler for `category`, computing its ignore rules from the
    /// configuration and the host's built-in symbols.
    pub fn new(category: Category, config: &ObfuscationConfig, builtins: &Builtins) -> Self {
        let (ignores, ignore_prefixes) = ignore_rules(category, config, builtins);
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(category as u64)),
            None => SmallRng::from_os_rng(),
        };
        let mut hasher = Keccak256::new();
        hasher.update(category.as_str());
        hasher.update(rng.random::<u64>().to_le_bytes());

        let mode = config.scramble_mode;
        let max_length = mode.max_length();
        let length = if (MIN_LENGTH..=max_length).contains(&config.scramble_length) {
            config.scramble_length
        } else {
            DEFAULT_LENGTH
        };

        Self {
            category,
            mode,
            length,
            max_length,
            ignores,
            ignore_prefixes,
            scrambles: IndexMap::new(),
            reverse: HashMap::new(),
            label_counter: 0,
            seed: hasher.finalize().into(),
            rng,
        }
    }

    pub const fn category(&self) -> Category {
        self.category
    }

    /// Current target length of generated names.
    pub const fn length(&self) -> usize {
        self.length
    }

    pub const fn label_counter(&self) -> u64 {
        self.label_counter
    }

    /// Number of names scrambled so far.
    pub fn len(&self) -> usize {
        self.scrambles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrambles.is_empty()
    }

    /// Canonical (lowercased when case-insensitive) replacement map.
    pub const fn mappings(&self) -> &IndexMap<String, String> {
        &self.scrambles
    }

    fn normalize(&self, name: &str) -> String {
        if self.category.case_sensitive() {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        }
    }

    /// Whether `name` passes through unchanged.
    pub fn is_ignored(&self, name: &str) -> bool {
        let value = self.normalize(name);
        self.ignores.contains(&value)
            || self
                .ignore_prefixes
                .iter()
                .any(|prefix| value.starts_with(prefix.as_str()))
    }

    /// Replacement for `name`, generating and recording one on first sight.
    ///
    /// Case-insensitive categories return the canonical replacement with its
    /// letters randomly re-cased on every call.
    pub fn scramble(&mut self, name: &str) -> Result<String, ScrambleError> {
        if self.is_ignored(name) {
            return Ok(name.to_string());
        }
        let value = self.normalize(name);
        let canonical = match self.scrambles.get(&value) {
            Some(existing) => existing.clone(),
            None => {
                let generated = self.generate(name)?;
                debug!("[{}] {} -> {}", self.category.as_str(), value, generated);
                self.reverse.insert(generated.clone(), value.clone());
                self.scrambles.insert(value, generated.clone());
                generated
            }
        };
        if self.category.case_sensitive() {
            Ok(canonical)
        } else {
            Ok(self.case_shuffle(&canonical))
        }
    }

    /// Original name behind a replacement, if this scrambler produced it.
    pub fn unscramble(&self, scrambled: &str) -> Option<&str> {
        self.reverse
            .get(&self.normalize(scrambled))
            .map(String::as_str)
    }

    /// Next raw label seed. The `!` keeps it apart from any user-written label.
    pub fn generate_label_name(&mut self) -> String {
        let name = format!("!label{}", self.label_counter);
        self.label_counter += 1;
        name
    }

    /// A fresh scrambled label.
    pub fn new_label(&mut self) -> Result<String, ScrambleError> {
        let raw = self.generate_label_name();
        self.scramble(&raw)
    }

    pub fn state(&self) -> ScramblerState {
        ScramblerState(
            CONTEXT_VERSION.to_string(),
            self.scrambles.clone(),
            self.length,
            self.label_counter,
        )
    }

    /// Replace the mapping, length and label counter with a persisted state.
    pub fn restore(&mut self, state: ScramblerState) -> Result<(), ContextError> {
        let ScramblerState(version, scrambles, length, label_counter) = state;
        if version != CONTEXT_VERSION {
            return Err(ContextError::VersionMismatch {
                category: self.category.as_str(),
                found: version,
                expected: CONTEXT_VERSION,
            });
        }
        self.reverse = scrambles
            .iter()
            .map(|(original, scrambled)| (scrambled.clone(), original.clone()))
            .collect();
        self.scrambles = scrambles;
        self.length = length.clamp(MIN_LENGTH, self.max_length);
        self.label_counter = label_counter;
        Ok(())
    }

    fn generate(&mut self, name: &str) -> Result<String, ScrambleError> {
        for attempt in 0..RETRY_LIMIT {
            let candidate = self.candidate(name, attempt);
            let lower = candidate.to_ascii_lowercase();
            let key = if self.category.case_sensitive() {
                candidate
            } else {
                lower.clone()
            };
            if self.reverse.contains_key(&key) || self.ignores.contains(&lower) {
                if attempt == GROW_AFTER && self.length < self.max_length {
                    self.length += 1;
                }
                continue;
            }
            return Ok(key);
        }
        Err(ScrambleError::Exhausted {
            category: self.category.as_str(),
            name: name.to_string(),
            attempts: RETRY_LIMIT,
        })
    }

    fn pick(&mut self, chars: &[u8]) -> char {
        chars[self.rng.random_range(0..chars.len())] as char
    }

    fn candidate(&mut self, name: &str, attempt: usize) -> String {
        let mut out = String::with_capacity(self.length);
        let (first_chars, salt_chars) = (self.mode.first_chars(), self.mode.salt_chars());
        out.push(self.pick(first_chars));
        let salt = self.pick(salt_chars);

        let mut hasher = Keccak256::new();
        hasher.update([salt as u8]);
        hasher.update(name.as_bytes());
        hasher.update(Keccak256::digest(self.seed));
        let mut seed: [u8; 32] = hasher.finalize().into();
        seed.shuffle(&mut self.rng);
        self.seed = seed;

        let rest = self.length - 1;
        match self.mode {
            ScrambleMode::Identifier => out.extend(
                seed.iter()
                    .take(rest)
                    .map(|b| ALPHANUMERICS[*b as usize % ALPHANUMERICS.len()] as char),
            ),
            ScrambleMode::Numeric => out.extend(
                seed.iter()
                    .take(rest)
                    .map(|b| DIGITS[*b as usize % DIGITS.len()] as char),
            ),
            ScrambleMode::Hexa => out.push_str(&hex::encode(seed)[..rest]),
            ScrambleMode::Hash => {
                let mut hasher = Keccak256::new();
                hasher.update(name.as_bytes());
                hasher.update(attempt.to_le_bytes());
                let digest = hasher.finalize();
                out = digest
                    .iter()
                    .take(self.max_length)
                    .map(|b| (b'a' + b % 26) as char)
                    .collect();
            }
        }
        out
    }

    fn case_shuffle(&mut self, value: &str) -> String {
        value
            .chars()
            .map(|c| {
                if self.rng.random_bool(0.5) {
                    c.to_ascii_uppercase()
                } else {
                    c.to_ascii_lowercase()
                }
            })
            .collect()
    }
}

fn lowered<'a>(names: impl IntoIterator<Item = &'a String> + 'a) -> impl Iterator<Item = String> + 'a {
    names.into_iter().map(|n| n.to_ascii_lowercase())
}

fn words(list: &'static [&'static str]) -> impl Iterator<Item = String> {
    list.iter().map(|w| w.to_string())
}

/// Member names of the built-in classes selected by `policy`.
fn predefined_members(
    builtins: &Builtins,
    policy: &PredefinedPolicy,
    members: impl Fn(&fescate_core::reserved::BuiltinClass) -> &Vec<String>,
) -> Vec<String> {
    match policy {
        PredefinedPolicy::None => Vec::new(),
        PredefinedPolicy::All => builtins
            .classes
            .values()
            .flat_map(|class| members(class).iter().cloned())
            .collect(),
        PredefinedPolicy::Only(names) => names
            .iter()
            .filter_map(|name| builtins.class(name))
            .flat_map(|class| members(class).iter().cloned())
            .collect(),
    }
}

/// Exact names and prefixes that `category` leaves untouched.
fn ignore_rules(
    category: Category,
    config: &ObfuscationConfig,
    builtins: &Builtins,
) -> (HashSet<String>, Vec<String>) {
    let policy = &config.ignore_predefined_classes;
    let mut ignores: HashSet<String> = HashSet::new();
    let mut prefixes: Vec<String> = Vec::new();

    match category {
        Category::Constant => {
            ignores.extend(words(RESERVED_KEYWORDS));
            ignores.extend(builtins.constants.iter().cloned());
            ignores.extend(config.ignore_constants.iter().cloned());
            prefixes.extend(config.ignore_constants_prefix.iter().cloned());
        }
        Category::ClassConstant => {
            ignores.extend(words(RESERVED_KEYWORDS));
            ignores.extend(builtins.constants.iter().cloned());
            ignores.extend(predefined_members(builtins, policy, |c| &c.constants));
            ignores.extend(config.ignore_class_constants.iter().cloned());
            prefixes.extend(config.ignore_class_constants_prefix.iter().cloned());
        }
        Category::Variable => {
            ignores.extend(words(RESERVED_VARIABLES));
            ignores.extend(config.ignore_variables.iter().cloned());
            prefixes.extend(config.ignore_variables_prefix.iter().cloned());
        }
        Category::Property => {
            ignores.extend(words(RESERVED_VARIABLES));
            ignores.extend(predefined_members(builtins, policy, |c| &c.properties));
            ignores.extend(config.ignore_properties.iter().cloned());
            prefixes.extend(config.ignore_properties_prefix.iter().cloned());
        }
        Category::FunctionOrClass => {
            ignores.extend(words(RESERVED_KEYWORDS));
            ignores.extend(builtins.functions.iter().cloned());
            ignores.extend(words(RESERVED_NAMES));
            ignores.extend(RESERVED_VARIABLES.iter().map(|v| v.to_ascii_lowercase()));
            match policy {
                PredefinedPolicy::None => {}
                PredefinedPolicy::All => ignores.extend(builtins.classes.keys().cloned()),
                PredefinedPolicy::Only(names) => ignores.extend(
                    lowered(names).filter(|name| builtins.classes.contains_key(name)),
                ),
            }
            for list in [
                &config.ignore_functions,
                &config.ignore_traits,
                &config.ignore_classes,
                &config.ignore_interfaces,
                &config.ignore_namespaces,
            ] {
                ignores.extend(lowered(list));
            }
            for list in [
                &config.ignore_functions_prefix,
                &config.ignore_traits_prefix,
                &config.ignore_classes_prefix,
                &config.ignore_interfaces_prefix,
                &config.ignore_namespaces_prefix,
            ] {
                prefixes.extend(lowered(list));
            }
        }
        Category::Method => {
            ignores.extend(words(RESERVED_KEYWORDS));
            ignores.extend(words(RESERVED_METHODS));
            ignores.extend(builtins.functions.iter().cloned());
            ignores.extend(predefined_members(builtins, policy, |c| &c.methods));
            ignores.extend(lowered(&config.ignore_methods));
            prefixes.extend(lowered(&config.ignore_methods_prefix));
        }
        Category::Label => {
            ignores.extend(words(RESERVED_KEYWORDS));
            ignores.extend(config.ignore_labels.iter().cloned());
            prefixes.extend(config.ignore_labels_prefix.iter().cloned());
        }
    }
    (ignores, prefixes)
}

/// One scrambler per [`Category`], plus the built-in symbols they were
/// built against.
#[derive(Debug)]
pub struct Scramblers {
    by_category: Vec<Scrambler>,
    builtins: Builtins,
}

impl Scramblers {
    pub fn new(config: &ObfuscationConfig, builtins: &Builtins) -> Self {
        Self {
            by_category: Category::ALL
                .iter()
                .map(|category| Scrambler::new(*category, config, builtins))
                .collect(),
            builtins: builtins.clone(),
        }
    }

    pub const fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    pub fn get(&self, category: Category) -> &Scrambler {
        &self.by_category[category as usize]
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Scrambler {
        &mut self.by_category[category as usize]
    }

    pub fn scramble(&mut self, category: Category, name: &str) -> Result<String, ScrambleError> {
        self.get_mut(category).scramble(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scrambler> {
        self.by_category.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Scrambler> {
        self.by_category.iter_mut()
    }

    /// Log how many names each category scrambled.
    pub fn report(&self) {
        for scrambler in self.iter() {
            info!(
                "[{:<17}] scrambled: {:>8}",
                scrambler.category().as_str(),
                scrambler.len()
            );
        }
    }
}
