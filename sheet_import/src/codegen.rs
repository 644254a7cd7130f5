//! Generates record type sources from a schema and reads them back as [`TypeDescriptor`]s.

use std::fmt::Write;

use utils::Discard;

use crate::record::{Member, TypeDescriptor};
use crate::schema::Schema;
use crate::value::TypeTag;

/// The first line of every generated source. Files without it are never loaded as record types.
pub const GENERATED_HEADER: &str = "// Generated by sheet_import. Changes are overwritten on the next import.";

// Rust keywords that are valid as raw identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

// Keywords that cannot be raw identifiers.
const RESERVED: &[&str] = &["crate", "self", "Self", "super"];

/// Generates the source of a record type named `record_name` with one member per named schema column.
///
/// Columns with a blank name are left out.
#[must_use]
pub fn generate_type_source(record_name: &str, schema: &Schema) -> String {
    render(&TypeDescriptor::from_schema(record_name, schema))
}

/// Renders a record type's source.
#[must_use]
pub fn render(ty: &TypeDescriptor) -> String {
    let mut out = String::new();
    writeln!(out, "{GENERATED_HEADER}").discard();
    writeln!(out).discard();
    writeln!(out, "#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]").discard();
    writeln!(out, "pub struct {} {{", ty.name()).discard();

    for member in ty.members() {
        if !is_field_name(&member.name) {
            log::warn!("Field `{}` of `{}` is not a valid identifier.", member.name, ty.name());
        }

        writeln!(out, "    pub {}: {},", escape_ident(&member.name), member.tag.rust_type()).discard();
    }

    writeln!(out, "}}").discard();
    out
}

/// Reads the record types declared in a generated source.
///
/// Returns nothing if `text` does not start with [`GENERATED_HEADER`].
#[must_use]
pub fn parse_type_source(text: &str) -> Vec<TypeDescriptor> {
    let mut lines = text.lines().map(str::trim);
    if lines.next() != Some(GENERATED_HEADER) {
        return Vec::new();
    }

    let mut types = Vec::new();
    let mut current: Option<(String, Vec<Member>)> = None;

    for line in lines {
        if let Some((name, members)) = current.as_mut() {
            if line == "}" {
                types.push(TypeDescriptor::new(std::mem::take(name), std::mem::take(members)));
                current = None;
            } else if let Some(member) = parse_member(line) {
                members.push(member);
            } else if !line.is_empty() {
                log::debug!("Ignoring line in generated type `{name}`: {line}");
            }
        } else if let Some(name) = line.strip_prefix("pub struct ").and_then(|s| s.strip_suffix('{')) {
            current = Some((name.trim().to_owned(), Vec::new()));
        }
    }

    types
}

/// Whether `name` can be used as a type or member name.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    (first.is_alphabetic() || first == '_')
        && name != "_"
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Whether `name` is a Rust keyword, including the ones that cannot be escaped.
#[must_use]
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name) || RESERVED.contains(&name)
}

/// Whether `name` can be emitted as a member name, escaped if necessary.
#[must_use]
pub fn is_field_name(name: &str) -> bool {
    is_identifier(name) && !RESERVED.contains(&name)
}

fn parse_member(line: &str) -> Option<Member> {
    let (name, ty) = line.strip_prefix("pub ")?
        .strip_suffix(',')?
        .rsplit_once(':')?;

    let name = name.trim();
    let name = name.strip_prefix("r#").unwrap_or(name);
    let tag = TypeTag::from_rust_type(ty.trim())?;

    Some(Member { name: name.to_owned(), tag })
}

fn escape_ident(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_owned()
    }
}
