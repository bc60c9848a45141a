//! Human-readable method signatures.
//!
//! Turns `(class, name, descriptor)` triples as stored by the engine into
//! the form a test author writes: `Account.debit(double)` instead of
//! `br/ufpe/cin/witup/jpf/Account.debit(D)V`.

use crate::error::{ExcondError, Result};

/// Method name the engine uses for constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";
/// Method name the engine uses for static initializers.
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// How a method name renders in a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind<'a> {
    Constructor,
    StaticInitializer,
    Named(&'a str),
}

impl<'a> MethodKind<'a> {
    pub fn from_name(name: &'a str) -> Self {
        match name {
            CONSTRUCTOR_NAME => MethodKind::Constructor,
            STATIC_INITIALIZER_NAME => MethodKind::StaticInitializer,
            other => MethodKind::Named(other),
        }
    }
}

/// Last segment of a qualified type name (`a.b.Account` -> `Account`).
pub fn simple_type_name(class_name: &str) -> &str {
    let normalized = class_name.rsplit('/').next().unwrap_or(class_name);
    normalized.rsplit('.').next().unwrap_or(normalized)
}

/// Canonical source-level names of the argument types of a descriptor.
///
/// `(ILjava/lang/String;[D)V` yields `["int", "java.lang.String", "double[]"]`.
pub fn argument_type_names(descriptor: &str) -> Result<Vec<String>> {
    let body = descriptor
        .strip_prefix('(')
        .ok_or_else(|| ExcondError::descriptor(descriptor, "missing '('"))?;
    let (args, ret) = body
        .split_once(')')
        .ok_or_else(|| ExcondError::descriptor(descriptor, "missing ')'"))?;

    let mut names = Vec::new();
    let mut rest = args;
    while !rest.is_empty() {
        let (name, tail) = parse_field_type(rest, descriptor)?;
        names.push(name);
        rest = tail;
    }

    if ret != "V" {
        let (_, tail) = parse_field_type(ret, descriptor)?;
        if !tail.is_empty() {
            return Err(ExcondError::descriptor(descriptor, "trailing data after return type"));
        }
    }

    Ok(names)
}

/// Parse one field type from the front of `input`, returning its source name
/// and the unparsed remainder.
fn parse_field_type<'a>(input: &'a str, descriptor: &str) -> Result<(String, &'a str)> {
    let mut dims = 0;
    let mut rest = input;
    while let Some(tail) = rest.strip_prefix('[') {
        dims += 1;
        rest = tail;
    }

    let mut chars = rest.chars();
    let tag = chars
        .next()
        .ok_or_else(|| ExcondError::descriptor(descriptor, "truncated type"))?;
    let (base, tail) = match tag {
        'B' => ("byte".to_string(), chars.as_str()),
        'C' => ("char".to_string(), chars.as_str()),
        'D' => ("double".to_string(), chars.as_str()),
        'F' => ("float".to_string(), chars.as_str()),
        'I' => ("int".to_string(), chars.as_str()),
        'J' => ("long".to_string(), chars.as_str()),
        'S' => ("short".to_string(), chars.as_str()),
        'Z' => ("boolean".to_string(), chars.as_str()),
        'L' => {
            let after = chars.as_str();
            let (internal, tail) = after
                .split_once(';')
                .ok_or_else(|| ExcondError::descriptor(descriptor, "unterminated class type"))?;
            if internal.is_empty() {
                return Err(ExcondError::descriptor(descriptor, "empty class name"));
            }
            (internal.replace('/', "."), tail)
        }
        other => {
            return Err(ExcondError::descriptor(
                descriptor,
                format!("unknown type tag '{}'", other),
            ))
        }
    };

    let mut name = base;
    for _ in 0..dims {
        name.push_str("[]");
    }
    Ok((name, tail))
}

/// Render `SimpleType.method(arg1, arg2)`.
///
/// Constructors render without a method name (`Account(double)`), static
/// initializers as `Account.<clinit>()`.
pub fn readable_signature<S: AsRef<str>>(
    class_name: &str,
    method_name: &str,
    arg_types: &[S],
) -> String {
    let simple = if class_name.is_empty() {
        "?"
    } else {
        simple_type_name(class_name)
    };

    let mut sig = String::from(simple);
    match MethodKind::from_name(method_name) {
        MethodKind::Constructor => sig.push('('),
        MethodKind::StaticInitializer => {
            sig.push('.');
            sig.push_str(STATIC_INITIALIZER_NAME);
            sig.push('(');
        }
        MethodKind::Named(name) => {
            sig.push('.');
            sig.push_str(name);
            sig.push('(');
        }
    }
    let args: Vec<&str> = arg_types.iter().map(AsRef::as_ref).collect();
    sig.push_str(&args.join(", "));
    sig.push(')');
    sig
}

/// [`readable_signature`] straight from an engine descriptor.
pub fn signature_from_descriptor(
    class_name: &str,
    method_name: &str,
    descriptor: &str,
) -> Result<String> {
    let args = argument_type_names(descriptor)?;
    Ok(readable_signature(class_name, method_name, &args))
}
