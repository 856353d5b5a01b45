use crate::seeded;
use fescate_core::reserved::Builtins;
use fescate_transform::config::ObfuscationConfig;
use fescate_transform::scrambler::ScrambleMode;
use fescate_transform::{Category, Scrambler};
use std::collections::HashSet;

fn scrambler(category: Category, config: &ObfuscationConfig) -> Scrambler {
    Scrambler::new(category, config, &Builtins::standard())
}

#[test]
fn ten_thousand_variables_stay_distinct() {
    let mut vars = scrambler(Category::Variable, &seeded());
    let mut seen = HashSet::new();
    for i in 0..10_000 {
        let scrambled = vars.scramble(&format!("var{i}")).unwrap();
        assert!(seen.insert(scrambled), "collision at var{i}");
    }
    assert_eq!(vars.len(), 10_000);
    assert!(vars.length() >= 5);
}

#[test]
fn repeated_scrambles_agree() {
    let mut vars = scrambler(Category::Variable, &seeded());
    let first = vars.scramble("total").unwrap();
    assert_eq!(vars.scramble("total").unwrap(), first);
    assert_eq!(vars.unscramble(&first), Some("total"));

    let mut functions = scrambler(Category::FunctionOrClass, &seeded());
    let a = functions.scramble("Render").unwrap();
    let b = functions.scramble("render").unwrap();
    assert!(a.eq_ignore_ascii_case(&b));
    assert_eq!(functions.unscramble(&a), Some("render"));
    assert_eq!(functions.len(), 1);
}

#[test]
fn ignored_names_pass_through() {
    let config = ObfuscationConfig {
        ignore_variables: vec!["keep".into()],
        ignore_variables_prefix: vec!["tmp_".into()],
        ..seeded()
    };
    let mut vars = scrambler(Category::Variable, &config);
    assert_eq!(vars.scramble("keep").unwrap(), "keep");
    assert_eq!(vars.scramble("tmp_buffer").unwrap(), "tmp_buffer");
    assert_eq!(vars.scramble("this").unwrap(), "this");
    assert_eq!(vars.scramble("_GET").unwrap(), "_GET");
    assert_ne!(vars.scramble("other").unwrap(), "other");
    assert_eq!(vars.len(), 1);

    let mut functions = scrambler(Category::FunctionOrClass, &seeded());
    assert_eq!(functions.scramble("strlen").unwrap(), "strlen");
    assert_eq!(functions.scramble("StrLen").unwrap(), "StrLen");
}

#[test]
fn modes_shape_their_output() {
    let numeric = ObfuscationConfig {
        scramble_mode: ScrambleMode::Numeric,
        scramble_length: 8,
        ..seeded()
    };
    let name = scrambler(Category::Constant, &numeric).scramble("LIMIT").unwrap();
    assert_eq!(name.len(), 8);
    assert!(name.starts_with('O'));
    assert!(name[1..].chars().all(|c| c.is_ascii_digit()));

    let hexa = ObfuscationConfig {
        scramble_mode: ScrambleMode::Hexa,
        ..seeded()
    };
    let name = scrambler(Category::Constant, &hexa).scramble("LIMIT").unwrap();
    assert!(name.chars().next().is_some_and(|c| "abcdefABCDEF".contains(c)));
    assert!(name[1..].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn labels_count_up() {
    let mut labels = scrambler(Category::Label, &seeded());
    let a = labels.new_label().unwrap();
    let b = labels.new_label().unwrap();
    assert_ne!(a, b);
    assert_eq!(labels.label_counter(), 2);
    assert_eq!(labels.unscramble(&a), Some("!label0"));
}
