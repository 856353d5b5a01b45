//! Collection of constant values ahead of the rewrite.
//!
//! Every `const` declaration (global or class) is recorded by its local name.
//! Values are evaluated over a small literal subset: string literals,
//! concatenations, and references to other constants. A reference to a
//! constant not seen yet is kept as a [`Fragment::Deferred`] placeholder until
//! [`ConstantTable::resolve`] runs after all files have been grabbed.
//!
//! The same sweep notes which constructor parameters each class promotes to
//! properties, so that named arguments of `new` expressions in other files
//! can follow the property names.

use fescate_core::annotation::annotations_of;
use fescate_core::ast::{BinaryOp, ClassLike, Const, Expr, Stmt};
use fescate_core::traverse::{NodeMut, Visitor};
use fescate_core::tree::Ancestors;
use fescate_utils::errors::RewriteError;
use indexmap::IndexMap;
use tracing::debug;

/// One piece of a grabbed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    /// Value of the named constant, not known yet.
    Deferred(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabbedConstant {
    pub fragments: Vec<Fragment>,
    /// Set by an `encode` annotation on the declaration.
    pub encode: bool,
}

impl GrabbedConstant {
    pub fn is_resolved(&self) -> bool {
        self.fragments
            .iter()
            .all(|f| matches!(f, Fragment::Text(_)))
    }

    /// The full value, if no placeholder remains.
    pub fn value(&self) -> Option<String> {
        self.fragments
            .iter()
            .map(|f| match f {
                Fragment::Text(text) => Some(text.as_str()),
                Fragment::Deferred(_) => None,
            })
            .collect()
    }
}

/// Grabbed constants by local name. The first declaration of a name wins.
#[derive(Debug, Default, Clone)]
pub struct ConstantTable {
    entries: IndexMap<String, GrabbedConstant>,
    /// Promoted constructor parameters by lowercased class name.
    promoted: IndexMap<String, Vec<String>>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&GrabbedConstant> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GrabbedConstant)> {
        self.entries.iter()
    }

    /// Record `name` unless it is already known. Returns whether it was added.
    pub fn record(&mut self, name: &str, fragments: Vec<Fragment>, encode: bool) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries
            .insert(name.to_string(), GrabbedConstant { fragments, encode });
        true
    }

    /// Record the promoted constructor parameters of `class`.
    pub fn record_promoted(&mut self, class: &str, params: Vec<String>) {
        if !params.is_empty() {
            self.promoted.insert(class.to_ascii_lowercase(), params);
        }
    }

    /// Promoted constructor parameters of `class`, empty when unknown.
    pub fn promoted(&self, class: &str) -> &[String] {
        self.promoted
            .get(&class.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn encode(&self, name: &str) -> bool {
        self.get(name).is_some_and(|c| c.encode)
    }

    /// Evaluate a constant initialiser against what is known so far.
    pub fn evaluate(&self, expr: &Expr) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        self.evaluate_into(expr, &mut fragments);
        merge_text(fragments)
    }

    fn evaluate_into(&self, expr: &Expr, out: &mut Vec<Fragment>) {
        match expr {
            Expr::String(text) => out.push(Fragment::Text(text.clone())),
            Expr::Binary {
                op: BinaryOp::Concat,
                left,
                right,
            } => {
                self.evaluate_into(left, out);
                self.evaluate_into(right, out);
            }
            Expr::ConstFetch(name) if !is_literal_keyword(name.last()) => {
                out.push(self.reference(name.last()));
            }
            Expr::ClassConstFetch { name, .. } if !name.eq_ignore_ascii_case("class") => {
                out.push(self.reference(name));
            }
            _ => {}
        }
    }

    fn reference(&self, name: &str) -> Fragment {
        match self.get(name).and_then(GrabbedConstant::value) {
            Some(value) => Fragment::Text(value),
            None => Fragment::Deferred(name.to_string()),
        }
    }

    /// Substitute every placeholder with the value it names.
    ///
    /// Chains are followed until nothing changes; placeholders naming unknown
    /// or circular constants fall back to their lowercased name. Returns the
    /// number of constants that held placeholders.
    pub fn resolve(&mut self) -> usize {
        let pending: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, c)| !c.is_resolved())
            .map(|(name, _)| name.clone())
            .collect();

        for _ in 0..=pending.len() {
            let mut progressed = false;
            for name in &pending {
                let Some(fragments) = self.entries.get(name).map(|c| c.fragments.clone()) else {
                    continue;
                };
                let substituted: Vec<Fragment> = fragments
                    .iter()
                    .map(|f| match f {
                        Fragment::Deferred(key) => self.reference(key),
                        text => text.clone(),
                    })
                    .collect();
                if substituted != fragments {
                    progressed = true;
                    if let Some(entry) = self.entries.get_mut(name) {
                        entry.fragments = merge_text(substituted);
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        for name in &pending {
            if let Some(entry) = self.entries.get_mut(name) {
                let value: String = entry
                    .fragments
                    .iter()
                    .map(|f| match f {
                        Fragment::Text(text) => text.clone(),
                        Fragment::Deferred(key) => key.to_ascii_lowercase(),
                    })
                    .collect();
                debug!("constant {} resolved to {:?}", name, value);
                entry.fragments = vec![Fragment::Text(value)];
            }
        }
        pending.len()
    }
}

fn merge_text(fragments: Vec<Fragment>) -> Vec<Fragment> {
    let mut merged: Vec<Fragment> = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        if let (Some(Fragment::Text(acc)), Fragment::Text(text)) = (merged.last_mut(), &fragment) {
            acc.push_str(text);
            continue;
        }
        merged.push(fragment);
    }
    merged
}

/// `true`, `false` and `null` are constant fetches syntactically.
pub fn is_literal_keyword(name: &str) -> bool {
    ["true", "false", "null"]
        .iter()
        .any(|k| name.eq_ignore_ascii_case(k))
}

/// Parameters of the `__construct` method of `class` that carry a visibility
/// or `readonly` modifier.
pub fn promoted_params(class: &ClassLike) -> Vec<String> {
    class
        .stmts
        .iter()
        .find_map(|stmt| match stmt {
            Stmt::ClassMethod(method) if method.name.eq_ignore_ascii_case("__construct") => Some(
                method
                    .params
                    .iter()
                    .filter(|p| p.flags.0 != 0)
                    .map(|p| p.name.clone())
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default()
}

/// Visitor recording every constant declaration into a [`ConstantTable`].
#[derive(Debug)]
pub struct GrabVisitor<'t> {
    table: &'t mut ConstantTable,
}

impl<'t> GrabVisitor<'t> {
    pub fn new(table: &'t mut ConstantTable) -> Self {
        Self { table }
    }

    fn grab(&mut self, item: &Const, tree: &Ancestors) {
        if item.name.is_empty() {
            return;
        }
        let doc = item
            .doc
            .as_deref()
            .or_else(|| tree.parent().and_then(|p| p.doc.as_deref()));
        let encode = annotations_of(doc).iter().any(|a| a.encode);
        let fragments = self.table.evaluate(&item.value);
        if self.table.record(&item.name, fragments, encode) {
            debug!("grabbed constant {}{}", item.name, if encode { " (encode)" } else { "" });
        }
    }
}

impl Visitor for GrabVisitor<'_> {
    fn enter_stmt(&mut self, stmt: &mut Stmt, _tree: &Ancestors) -> Result<(), RewriteError> {
        if let Stmt::ClassLike(class) = stmt {
            if let Some(name) = &class.name {
                let params = promoted_params(class);
                if !params.is_empty() {
                    debug!("class {} promotes {:?}", name, params);
                }
                self.table.record_promoted(name, params);
            }
        }
        Ok(())
    }

    fn leave_node(&mut self, node: NodeMut<'_>, tree: &Ancestors) -> Result<(), RewriteError> {
        if let NodeMut::Const(item) = node {
            self.grab(item, tree);
        }
        Ok(())
    }
}
