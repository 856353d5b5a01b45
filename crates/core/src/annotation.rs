//! Reader for `@fescate(...)` directives in doc comments.
//!
//! ```text
//! /** @fescate(exclude, target="save,flush") */
//! /** @fescate(encode=true) */
//! ```

/// Tag recognised inside doc comments.
pub const TAG: &str = "@fescate";

/// Directives carried by one `@fescate(...)` tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Keep the annotated declaration or call unrenamed.
    pub exclude: bool,
    /// Flag a constant for encoded emission.
    pub encode: bool,
    pub remove: bool,
    /// Restricts `exclude` on call chains to the named calls.
    pub target: Vec<String>,
}

impl Annotation {
    /// Whether this annotation covers the call `name`, given the chain of calls
    /// from `name` out to the outermost call of the expression.
    ///
    /// Without a target only the outermost call is covered. A single target
    /// covers that call and every call applied after it. Several targets cover
    /// exactly the listed calls.
    pub fn covers_call(&self, name: &str, sequence: &[String]) -> bool {
        match self.target.as_slice() {
            [] => sequence.last().is_some_and(|last| last == name),
            [single] => match sequence.iter().position(|s| s == single) {
                Some(start) => sequence[start..].iter().any(|s| s == name),
                None => true,
            },
            many => many.iter().any(|t| t == name),
        }
    }
}

/// Parse every `@fescate` tag found in `doc`.
pub fn parse_annotations(doc: &str) -> Vec<Annotation> {
    let mut found = Vec::new();
    let mut rest = doc;
    while let Some(at) = rest.find(TAG) {
        rest = &rest[at + TAG.len()..];
        let trimmed = rest.trim_start();
        let Some(body) = trimmed.strip_prefix('(') else {
            continue;
        };
        let Some(end) = closing_paren(body) else {
            break;
        };
        found.push(parse_params(&body[..end]));
        rest = &body[end..];
    }
    found
}

/// Annotations of `doc`, or none when there is no doc comment.
pub fn annotations_of(doc: Option<&str>) -> Vec<Annotation> {
    doc.map(parse_annotations).unwrap_or_default()
}

fn closing_paren(body: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ')') => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_params(body: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ',') => {
                params.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&body[start..]);
    params
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for q in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}

fn truthy(value: Option<&str>) -> bool {
    !matches!(
        value.map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("false" | "0" | "no" | "off")
    )
}

fn parse_params(body: &str) -> Annotation {
    let mut annotation = Annotation::default();
    for param in split_params(body) {
        let (key, value) = match param.split_once('=') {
            Some((key, value)) => (key.trim(), Some(unquote(value))),
            None => (param.trim(), None),
        };
        match key {
            "exclude" => annotation.exclude = truthy(value),
            "encode" => annotation.encode = truthy(value),
            "remove" => annotation.remove = truthy(value),
            "target" => {
                annotation.target = value
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }
    annotation
}
