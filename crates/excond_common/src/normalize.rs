//! Condition normalization.
//!
//! Rewrites an engine-internal path condition into the closest readable form
//! of the source predicate:
//! - `constraint # = N` header removed
//! - `value_2_SYMREAL` becomes `value`
//! - `CONST_0` becomes `0`
//! - instance fields become `this.balance` when method context is known
//!
//! Operators, literals and parentheses pass through unchanged. Every function
//! here is total: a pattern that does not match leaves the text as it was.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::engine::MethodContext;

/// Leading bookkeeping line emitted by the path condition printer.
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\Aconstraint[ \t]*#[ \t]*=[ \t]*\d+[ \t]*(?:\r?\n)?").unwrap()
});

/// `_<n>_SYM<KIND>` suffix. The capture keeps the last identifier character
/// so the suffix is only stripped when it is attached to an identifier.
static SYM_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<tail>[\w$])_\d+_SYM(?:REAL|INT|STRING|REF)\b").unwrap()
});

/// `CONST_<number>` with optional sign, fraction and exponent.
static CONST_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bCONST_(?P<value>-?\d+(?:\.\d+)?(?:[Ee][+-]?\d+)?)\b").unwrap()
});

/// Double-quoted string literals (backslash escapes, unterminated runs to the
/// end) or maximal runs of identifier characters.
static LITERAL_OR_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"(?:[^"\\]|\\.)*"?|[\w$]+"#).unwrap());

/// Receiver prefix used for qualified fields.
pub const RECEIVER: &str = "this";

/// Steps 1-4: header strip, symbol de-suffixing, constant un-encoding, trim.
pub fn strip_bookkeeping(raw: &str) -> String {
    let without_header = HEADER.replace(raw, "");
    let without_suffix = SYM_SUFFIX.replace_all(&without_header, "${tail}");
    let without_consts = CONST_TOKEN.replace_all(&without_suffix, "${value}");
    without_consts.trim().to_string()
}

/// Qualify every whole-word field occurrence as `this.<name>`.
///
/// Names that are also parameters are left alone (parameters shadow fields).
/// An occurrence directly preceded by `.` is a member access on some
/// receiver already and is never rewritten, so qualifying twice is a no-op.
/// Text inside string literals is never touched.
pub fn qualify_fields(
    condition: &str,
    field_names: &BTreeSet<String>,
    param_names: &BTreeSet<String>,
) -> String {
    let targets: BTreeSet<&str> = field_names
        .iter()
        .map(String::as_str)
        .filter(|name| *name != RECEIVER && !param_names.contains(*name))
        .collect();
    if targets.is_empty() {
        return condition.to_string();
    }

    let mut out = String::with_capacity(condition.len() + 8);
    let mut last = 0;
    for token in LITERAL_OR_IDENT.find_iter(condition) {
        if token.as_str().starts_with('"') || !targets.contains(token.as_str()) {
            continue;
        }
        if condition[..token.start()].ends_with('.') {
            continue;
        }
        out.push_str(&condition[last..token.start()]);
        out.push_str(RECEIVER);
        out.push('.');
        out.push_str(token.as_str());
        last = token.end();
    }
    out.push_str(&condition[last..]);
    out
}

/// Full normalization of a raw condition.
///
/// Empty input is returned unchanged. Field qualification only runs when
/// `field_names` is non-empty.
pub fn normalize(
    raw: &str,
    field_names: &BTreeSet<String>,
    param_names: &BTreeSet<String>,
) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let stripped = strip_bookkeeping(raw);
    if field_names.is_empty() {
        return stripped;
    }
    qualify_fields(&stripped, field_names, param_names)
}

/// [`normalize`] for a condition that may be absent.
pub fn normalize_opt(
    raw: Option<&str>,
    field_names: &BTreeSet<String>,
    param_names: &BTreeSet<String>,
) -> Option<String> {
    raw.map(|s| normalize(s, field_names, param_names))
}

/// Normalize using whatever the method context knows about names.
pub fn format_condition(raw: &str, method: Option<&dyn MethodContext>) -> String {
    match method {
        Some(ctx) => normalize(raw, &ctx.field_names(), &ctx.parameter_names()),
        None => normalize(raw, &BTreeSet::new(), &BTreeSet::new()),
    }
}
