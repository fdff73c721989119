//! Prompt template rendering.
//!
//! A template is text with `{field}` references, resolved against a
//! [`PromptFields`] mapping. Each field is bound to a literal string or a
//! producer closure that is called on every render.
//!
//! Two entry points share one algorithm and differ only in how they treat a
//! field that cannot be resolved (unknown name, failing producer, bad format
//! spec):
//!
//! - [`format_prompt`] drops it from the output.
//! - [`partial_format_prompt`] leaves its original text in place.
//!
//! Neither ever fails. Malformed references are copied through as literal
//! text, and a template producer that errors yields [`FALLBACK_PROMPT`].
//!
//! # Field syntax
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `{name}` | value of `name` |
//! | `{name:spec}` | `spec` with `{}` replaced by the value; nothing if the value is empty |
//! | `{$VAR}` | `VAR` from the environment snapshot attached with [`PromptFields::with_env`] |
//! | `{{name` | same as `{name}`, kept for compatibility with older prompts |
//! | `{{` / `}}` | literal `{` / `}` when no field name follows |
//!
//! ## Example
//!
//! ```
//! use conch_env::prompt::{PromptFields, format_prompt};
//!
//! let fields = PromptFields::new()
//!     .literal("user", "wakka")
//!     .producer("branch", || Ok(Some("main".to_string())));
//!
//! assert_eq!(format_prompt("{user}{branch: ({})} $ ", &fields), "wakka (main) $ ");
//! ```

mod fields;
mod parse;

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use anyhow::{Context as _, anyhow, bail};

pub use fields::{collapse_home, default_fields, short_cwd};
use parse::{Piece, parse};

use crate::env::Env;
use crate::registry::DEFAULT_PROMPT;

/// Returned when the template itself cannot be produced.
pub const FALLBACK_PROMPT: &str = "$ ";

/// A producer of a field value. `Ok(None)` renders as the empty string.
pub type FieldFn = Box<dyn Fn() -> anyhow::Result<Option<String>>>;

/// Value bound to a prompt field.
pub enum FieldValue {
    /// Fixed text
    Literal(String),
    /// Called on every render
    Producer(FieldFn),
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            FieldValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl FieldValue {
    fn evaluate(&self) -> anyhow::Result<String> {
        match self {
            FieldValue::Literal(s) => Ok(s.clone()),
            FieldValue::Producer(f) => Ok(f()?.unwrap_or_default()),
        }
    }
}

/// Named fields available to a prompt template.
#[derive(Debug, Default)]
pub struct PromptFields {
    fields: HashMap<String, FieldValue>,
    env: Option<BTreeMap<String, String>>,
}

impl PromptFields {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to fixed text.
    pub fn literal(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, FieldValue::Literal(value.into()));
        self
    }

    /// Bind `name` to a producer.
    pub fn producer<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<Option<String>> + 'static,
    {
        self.insert(name, FieldValue::Producer(Box::new(f)));
        self
    }

    /// Attach a snapshot of `env`'s detyped view for `{$VAR}` fields.
    pub fn with_env(mut self, env: &Env) -> Self {
        self.env = Some(env.detype().clone());
        self
    }

    /// Bind `name`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// The value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Returns true if `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Resolve a field name to text.
    fn resolve(&self, name: &str) -> anyhow::Result<String> {
        if let Some(var) = name.strip_prefix('$') {
            let env = self.env.as_ref().context("no environment attached")?;
            return env
                .get(var)
                .cloned()
                .ok_or_else(|| anyhow!("${var} is not set"));
        }
        self.fields
            .get(name)
            .ok_or_else(|| anyhow!("unknown field {name}"))?
            .evaluate()
    }
}

/// A template: fixed text or a closure producing it.
pub enum Template<'a> {
    /// Template text
    Text(Cow<'a, str>),
    /// Called once per render to produce the template text
    Producer(&'a dyn Fn() -> anyhow::Result<String>),
}

impl fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Template::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl<'a> Template<'a> {
    /// Wrap a template-producing closure.
    pub fn from_fn(f: &'a dyn Fn() -> anyhow::Result<String>) -> Self {
        Template::Producer(f)
    }

    fn text(&self) -> anyhow::Result<Cow<'_, str>> {
        match self {
            Template::Text(s) => Ok(Cow::Borrowed(s.as_ref())),
            Template::Producer(f) => Ok(Cow::Owned(f()?)),
        }
    }
}

impl<'a> From<&'a str> for Template<'a> {
    fn from(s: &'a str) -> Self {
        Template::Text(Cow::Borrowed(s))
    }
}

impl From<String> for Template<'_> {
    fn from(s: String) -> Self {
        Template::Text(Cow::Owned(s))
    }
}

impl<'a> From<&'a dyn Fn() -> anyhow::Result<String>> for Template<'a> {
    fn from(f: &'a dyn Fn() -> anyhow::Result<String>) -> Self {
        Template::Producer(f)
    }
}

/// Render `template`, dropping fields that fail to resolve.
pub fn format_prompt<'a>(template: impl Into<Template<'a>>, fields: &PromptFields) -> String {
    render(&template.into(), fields, false)
}

/// Render `template`, leaving fields that fail to resolve as written.
pub fn partial_format_prompt<'a>(
    template: impl Into<Template<'a>>,
    fields: &PromptFields,
) -> String {
    render(&template.into(), fields, true)
}

/// Render the environment's `$PROMPT` with [`default_fields`].
pub fn render_prompt(env: &Env) -> String {
    let template = env
        .get_str("PROMPT")
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    format_prompt(template, &default_fields(env))
}

fn render(template: &Template<'_>, fields: &PromptFields, keep_failed: bool) -> String {
    let text = match template.text() {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("prompt template failed: {:#}", e);
            return FALLBACK_PROMPT.to_string();
        }
    };

    let mut out = String::with_capacity(text.len());
    for piece in parse(&text) {
        match piece {
            Piece::Literal(s) => out.push_str(s),
            Piece::Field { name, spec, raw } => {
                match fields.resolve(name).and_then(|v| apply_spec(v, spec)) {
                    Ok(value) => out.push_str(&value),
                    Err(e) => {
                        tracing::debug!(field = name, "prompt field failed: {:#}", e);
                        if keep_failed {
                            out.push_str(raw);
                        }
                    }
                }
            }
        }
    }
    out
}

fn apply_spec(value: String, spec: Option<&str>) -> anyhow::Result<String> {
    match spec {
        None | Some("") => Ok(value),
        Some(_) if value.is_empty() => Ok(value),
        Some(spec) if spec.contains("{}") => Ok(spec.replacen("{}", &value, 1)),
        Some(spec) => bail!("unsupported format spec {spec:?}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn formatter_fields() -> PromptFields {
        PromptFields::new()
            .literal("a_string", "cat")
            .producer("none", || Ok(None))
            .producer("f", || Ok(Some("wakka".to_string())))
    }

    fn failing() -> anyhow::Result<String> {
        bail!("bar is not defined")
    }

    #[test]
    fn test_format_prompt() {
        let fields = formatter_fields();
        for (inp, exp) in [
            ("my {a_string}", "my cat"),
            ("my {none}{a_string}", "my cat"),
            ("{f} jawaka", "wakka jawaka"),
        ] {
            assert_eq!(format_prompt(inp, &fields), exp);
            assert_eq!(partial_format_prompt(inp, &fields), exp);
        }
    }

    #[test]
    fn test_format_prompt_with_broken_template() {
        let fields = PromptFields::new();
        for p in ["{user", "{user}{hostname"] {
            assert_eq!(partial_format_prompt(p, &fields), p);
        }
        assert_eq!(format_prompt("{user", &fields), "{user");
        // strict mode drops the unbound field but keeps the unterminated text
        assert_eq!(format_prompt("{user}{hostname", &fields), "{hostname");

        let fields = PromptFields::new().literal("user", "wakka");
        for p in ["{{user}", "{{user"] {
            assert_eq!(partial_format_prompt(p, &fields), "wakka");
            assert_eq!(format_prompt(p, &fields), "wakka");
        }
        assert_eq!(format_prompt("{user}{hostname", &fields), "wakka{hostname");
    }

    #[test]
    fn test_double_brace_unknown_field() {
        let fields = PromptFields::new();
        assert_eq!(partial_format_prompt("{{user", &fields), "{{user");
        assert_eq!(format_prompt("{{user", &fields), "");
    }

    #[test]
    fn test_format_prompt_with_broken_template_in_func() {
        let fields = PromptFields::new().literal("user", "wakka");
        for (text, exp) in [
            ("{user", "{user"),
            ("{{user", "wakka"),
            ("{{user}", "wakka"),
            ("{user}{hostname", "wakka{hostname"),
        ] {
            let producer = move || -> anyhow::Result<String> { Ok(text.to_string()) };
            assert_eq!(partial_format_prompt(Template::from_fn(&producer), &fields), exp);
            assert_eq!(format_prompt(Template::from_fn(&producer), &fields), exp);
        }
    }

    #[test]
    fn test_format_prompt_with_invalid_func() {
        let fields = PromptFields::new();
        assert_eq!(partial_format_prompt(Template::from_fn(&failing), &fields), FALLBACK_PROMPT);
        assert_eq!(format_prompt(Template::from_fn(&failing), &fields), FALLBACK_PROMPT);
    }

    #[test]
    fn test_failing_producer_does_not_abort() {
        let fields = PromptFields::new()
            .literal("a", "1")
            .producer("bad", || bail!("boom"));
        assert_eq!(format_prompt("{a}{bad}{a}", &fields), "11");
        assert_eq!(partial_format_prompt("{a}{bad}{a}", &fields), "1{bad}1");
    }

    #[test]
    fn test_unknown_field_modes() {
        let fields = PromptFields::new().literal("a", "1");
        assert_eq!(format_prompt("{a} {b}", &fields), "1 ");
        assert_eq!(partial_format_prompt("{a} {b:[{}]}", &fields), "1 {b:[{}]}");
    }

    #[test]
    fn test_producers_are_called_every_render() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let fields = PromptFields::new().producer("n", move || {
            counter.set(counter.get() + 1);
            Ok(Some(counter.get().to_string()))
        });
        assert_eq!(format_prompt("{n}", &fields), "1");
        assert_eq!(format_prompt("{n}{n}", &fields), "23");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_format_spec() {
        let fields = PromptFields::new()
            .literal("branch", "main")
            .literal("empty", "")
            .literal("plain", "x");
        assert_eq!(format_prompt("{branch: ({})}", &fields), " (main)");
        assert_eq!(format_prompt("{empty: ({})}", &fields), "");
        assert_eq!(format_prompt("{plain:}", &fields), "x");
        assert_eq!(format_prompt("[{plain:>5}]", &fields), "[]");
        assert_eq!(partial_format_prompt("[{plain:>5}]", &fields), "[{plain:>5}]");
    }

    #[test]
    fn test_escaped_braces() {
        let fields = PromptFields::new();
        assert_eq!(format_prompt("{{ }}", &fields), "{ }");
    }

    #[test]
    fn test_env_fields() {
        let env = Env::from_vars([("VAR", "wakka")]).unwrap();
        let fields = PromptFields::new().with_env(&env);
        assert_eq!(format_prompt("<{$VAR}>", &fields), "<wakka>");
        assert_eq!(format_prompt("<{$MISSING}>", &fields), "<>");
        assert_eq!(partial_format_prompt("<{$MISSING}>", &fields), "<{$MISSING}>");

        let detached = PromptFields::new();
        assert_eq!(partial_format_prompt("{$VAR}", &detached), "{$VAR}");
    }

    #[test]
    fn test_modes_agree_when_everything_resolves() {
        let fields = formatter_fields();
        let template = "{{a_string}} {f:<{}>} {{ }} }";
        assert_eq!(
            format_prompt(template, &fields),
            partial_format_prompt(template, &fields)
        );
    }

    #[test]
    fn test_render_prompt_uses_env_template() {
        let env = Env::from_vars([("PROMPT", "{$GREETING}> "), ("GREETING", "hi")]).unwrap();
        assert_eq!(render_prompt(&env), "hi> ");
    }
}
