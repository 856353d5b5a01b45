use fescate_cli::mirror::{clean, Layout, Mirror, MirrorStats};
use fescate_core::ast::Stmt;
use fescate_core::frontend::{read_dump, SourceParser};
use fescate_core::reserved::Builtins;
use fescate_transform::context::ContextStore;
use fescate_transform::{Category, ObfuscationConfig, Obfuscator};
use fescate_utils::errors::{ObfuscateError, ParseError};
use std::fs;
use std::path::Path;

struct DumpParser;

impl SourceParser for DumpParser {
    fn parse(&self, source: &str) -> Result<Vec<Stmt>, ParseError> {
        read_dump(source)
    }
}

const GREETING: &str = r#"[
    {
        "nodeType": "Stmt_Expression",
        "expr": {
            "nodeType": "Expr_Assign",
            "var": {"nodeType": "Expr_Variable", "name": "greeting"},
            "expr": {"nodeType": "Scalar_String", "value": "hello"}
        }
    },
    {"nodeType": "Stmt_Echo", "exprs": [{"nodeType": "Expr_Variable", "name": "greeting"}]}
]"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn config() -> ObfuscationConfig {
    ObfuscationConfig {
        seed: Some(42),
        keep: vec!["vendor/".into()],
        skip: vec!["cache".into()],
        ..ObfuscationConfig::default()
    }
}

fn obfuscator(config: &ObfuscationConfig) -> Obfuscator {
    Obfuscator::with_parser(config.clone(), &Builtins::standard(), Box::new(DumpParser))
}

fn mirror_once(
    config: &ObfuscationConfig,
    source: &Path,
    layout: &Layout,
) -> Result<MirrorStats, ObfuscateError> {
    let store = ContextStore::new(&layout.context);
    let mirror = Mirror::new(config, source, &layout.obfuscated);
    mirror.run_with_context(&mut obfuscator(config), &store)
}

#[test]
fn mirrors_a_tree_and_skips_unchanged_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    write(&source, "app/main.php", GREETING);
    write(&source, "app/empty.php", "");
    write(&source, "vendor/lib.php", "<?php not a dump");
    write(&source, "cache/stale.php", GREETING);
    write(&source, "README.md", "# demo\n");

    let layout = Layout::new(&dir.path().join("out"));
    layout.create().unwrap();
    let config = config();

    let stats = mirror_once(&config, &source, &layout).unwrap();
    assert_eq!(stats.obfuscated, 1);
    assert_eq!(stats.copied, 2);
    assert_eq!(stats.failed, 1);

    let out = &layout.obfuscated;
    let main = fs::read_to_string(out.join("app/main.php")).unwrap();
    assert!(main.starts_with("<?php"));
    assert!(!main.contains("$greeting"));
    assert_eq!(fs::read_to_string(out.join("app/empty.php")).unwrap(), "");
    assert_eq!(
        fs::read_to_string(out.join("vendor/lib.php")).unwrap(),
        "<?php not a dump"
    );
    assert!(out.join("README.md").is_file());
    assert!(!out.join("cache").exists());
    assert!(layout.context.join("variable").is_file());

    let again = mirror_once(&config, &source, &layout).unwrap();
    assert_eq!(again.unchanged, 4);
    assert_eq!(again.obfuscated + again.copied + again.failed, 0);
}

#[test]
fn parse_failure_aborts_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    write(&source, "broken.php", "<?php echo 1;");
    let layout = Layout::new(&dir.path().join("out"));
    layout.create().unwrap();

    let strict = config();
    let mut obfuscator = obfuscator(&strict);
    let mirror = Mirror::new(&strict, &source, &layout.obfuscated);
    assert!(matches!(
        mirror.run(&mut obfuscator),
        Err(ObfuscateError::Aborted { .. })
    ));

    let lenient = ObfuscationConfig {
        abort_on_error: false,
        ..config()
    };
    let stats = mirror_once(&lenient, &source, &layout).unwrap();
    assert_eq!(stats.failed, 1);
    assert_eq!(
        fs::read_to_string(layout.obfuscated.join("broken.php")).unwrap(),
        "<?php echo 1;"
    );

    // The fallback copy is not mistaken for an up-to-date target.
    let again = mirror_once(&lenient, &source, &layout).unwrap();
    assert_eq!(again.failed, 1);
    assert_eq!(again.unchanged, 0);

    assert!(clean(&layout.root).unwrap());
    assert!(!layout.root.exists());
}

#[test]
fn missing_source_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = config();
    let mut obfuscator = obfuscator(&config);
    let missing = dir.path().join("nope");
    let mirror = Mirror::new(&config, &missing, dir.path());
    let err = mirror.grab(&mut obfuscator).unwrap_err();
    assert_eq!(err.exit_code(), 53);
}

#[test]
fn latin1_source_is_copied_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    write(&source, "app/main.php", GREETING);
    let latin1 = b"<?php echo 'caf\xe9';";
    fs::write(source.join("app/legacy.php"), latin1).unwrap();
    let layout = Layout::new(&dir.path().join("out"));
    layout.create().unwrap();

    let lenient = ObfuscationConfig {
        abort_on_error: false,
        ..config()
    };
    let stats = mirror_once(&lenient, &source, &layout).unwrap();
    assert_eq!(stats.obfuscated, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(fs::read(layout.obfuscated.join("app/legacy.php")).unwrap(), latin1);

    assert!(clean(&layout.root).unwrap());
    layout.create().unwrap();
    let err = mirror_once(&config(), &source, &layout).unwrap_err();
    assert_eq!(err.exit_code(), 57);
}

#[test]
fn contexts_are_saved_when_a_run_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src");
    write(&source, "a.php", GREETING);
    write(&source, "b.php", "<?php echo 1;");
    let layout = Layout::new(&dir.path().join("out"));
    layout.create().unwrap();

    let strict = config();
    assert!(matches!(
        mirror_once(&strict, &source, &layout),
        Err(ObfuscateError::Aborted { .. })
    ));
    let written = fs::read_to_string(layout.obfuscated.join("a.php")).unwrap();

    let mut next = obfuscator(&strict);
    assert!(next.restore_context(&ContextStore::new(&layout.context)).unwrap() > 0);
    let greeting = &next.scramblers().get(Category::Variable).mappings()["greeting"];
    assert!(written.contains(&format!("${greeting}")));
}
