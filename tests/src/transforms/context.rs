use crate::seeded;
use fescate_core::reserved::Builtins;
use fescate_transform::context::ContextStore;
use fescate_transform::{Category, Scramblers};
use fescate_utils::errors::ContextError;
use std::fs;

#[test]
fn state_survives_a_save_and_restore() {
    let dir = tempfile::tempdir().unwrap();
    let store = ContextStore::new(dir.path().join("context"));
    let builtins = Builtins::standard();

    let mut original = Scramblers::new(&seeded(), &builtins);
    for name in ["alpha", "beta", "gamma"] {
        original.scramble(Category::Variable, name).unwrap();
    }
    original.scramble(Category::FunctionOrClass, "Widget").unwrap();
    original.get_mut(Category::Label).new_label().unwrap();
    store.save_all(&original).unwrap();

    let mut restored = Scramblers::new(&seeded(), &builtins);
    assert_eq!(store.restore_all(&mut restored).unwrap(), Category::ALL.len());
    for category in Category::ALL {
        let (a, b) = (original.get(category), restored.get(category));
        assert_eq!(a.mappings(), b.mappings(), "{}", category.as_str());
        assert_eq!(a.length(), b.length());
        assert_eq!(a.label_counter(), b.label_counter());
    }

    let before = original.get(Category::Variable).mappings()["beta"].clone();
    assert_eq!(restored.scramble(Category::Variable, "beta").unwrap(), before);
    assert_eq!(restored.get(Category::Label).label_counter(), 1);
}

#[test]
fn foreign_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = ContextStore::new(dir.path());
    fs::write(store.path(Category::Method), r#"["0.9",{},5,0]"#).unwrap();

    let mut scramblers = Scramblers::new(&seeded(), &Builtins::standard());
    assert!(matches!(
        store.restore_all(&mut scramblers),
        Err(ContextError::VersionMismatch { .. })
    ));
}

#[test]
fn missing_context_restores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = ContextStore::new(dir.path().join("absent"));
    let mut scramblers = Scramblers::new(&seeded(), &Builtins::standard());
    assert_eq!(store.restore_all(&mut scramblers).unwrap(), 0);
}
