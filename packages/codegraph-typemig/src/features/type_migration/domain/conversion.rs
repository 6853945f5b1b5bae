//! Conversion descriptors and failure records
//!
//! A conversion rewrites one expression so it keeps working after a type
//! change. Templates use `$` for the expression, `$q` for its qualifier,
//! `$0`..`$n` for call arguments, `$l`/`$r` for assignment sides and `$$` for
//! a literal dollar sign.

use super::program::{DeclId, ElementRef};
use super::types::JType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Replacement {
    /// Valid as written.
    Noop,
    /// Rewrite through a template such as `$.toString()`.
    Template(String),
    /// Replace with fixed text.
    Text(String),
    /// Keep the qualifier and arguments, call another member instead.
    Retarget { member: DeclId, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionDescriptor {
    pub replacement: Replacement,
    /// Type of the rewritten expression; `None` until the engine records it.
    pub result_type: Option<JType>,
    /// Root whose migration required this conversion.
    pub owner_root: Option<ElementRef>,
}

impl ConversionDescriptor {
    pub fn noop() -> Self {
        Self::new(Replacement::Noop)
    }

    pub fn template(template: impl Into<String>) -> Self {
        Self::new(Replacement::Template(template.into()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Replacement::Text(text.into()))
    }

    pub fn retarget(member: DeclId, name: impl Into<String>) -> Self {
        Self::new(Replacement::Retarget {
            member,
            name: name.into(),
        })
    }

    fn new(replacement: Replacement) -> Self {
        Self {
            replacement,
            result_type: None,
            owner_root: None,
        }
    }

    pub fn with_result(mut self, ty: JType) -> Self {
        self.result_type = Some(ty);
        self
    }

    pub fn is_noop(&self) -> bool {
        self.replacement == Replacement::Noop
    }
}

impl fmt::Display for ConversionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.replacement {
            Replacement::Noop => f.write_str("(unchanged)"),
            Replacement::Template(t) | Replacement::Text(t) => f.write_str(t),
            Replacement::Retarget { name, .. } => write!(f, "-> {name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Expr,
    Qualifier,
    Lhs,
    Rhs,
    Arg(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePiece {
    Text(String),
    Hole(Placeholder),
}

/// Split a template into literal text and placeholders.
pub fn parse_template(template: &str) -> Result<Vec<TemplatePiece>, String> {
    let chars: Vec<char> = template.chars().collect();
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut i = 0;
    let flush = |text: &mut String, pieces: &mut Vec<TemplatePiece>| {
        if !text.is_empty() {
            pieces.push(TemplatePiece::Text(std::mem::take(text)));
        }
    };
    while i < chars.len() {
        if chars[i] != '$' {
            text.push(chars[i]);
            i += 1;
            continue;
        }
        let next = chars.get(i + 1).copied();
        let after = chars.get(i + 2).copied();
        let ends_word = !matches!(after, Some(c) if c.is_alphanumeric() || c == '_');
        match next {
            Some('$') => {
                text.push('$');
                i += 2;
            }
            Some(c) if c.is_ascii_digit() => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                let digits: String = chars[start..end].iter().collect();
                let index = digits
                    .parse::<usize>()
                    .map_err(|e| format!("bad argument index '{digits}': {e}"))?;
                flush(&mut text, &mut pieces);
                pieces.push(TemplatePiece::Hole(Placeholder::Arg(index)));
                i = end;
            }
            Some(c @ ('q' | 'l' | 'r')) if ends_word => {
                flush(&mut text, &mut pieces);
                pieces.push(TemplatePiece::Hole(match c {
                    'q' => Placeholder::Qualifier,
                    'l' => Placeholder::Lhs,
                    _ => Placeholder::Rhs,
                }));
                i += 2;
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                return Err(format!("unknown placeholder '${c}' at offset {i}"));
            }
            _ => {
                flush(&mut text, &mut pieces);
                pieces.push(TemplatePiece::Hole(Placeholder::Expr));
                i += 1;
            }
        }
    }
    flush(&mut text, &mut pieces);
    Ok(pieces)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// No rule converts the expression and the types are not assignable.
    Unconvertible,
    /// A varargs call passes a number of arguments the new type cannot take.
    VarargsArity,
    /// The element belongs to a library signature that cannot change.
    LibraryMember,
    /// A local would need removing but elimination is disabled or unsafe.
    LocalElimination,
    /// A multi-variable declaration would need splitting but splitting is disabled.
    DeclarationSplit,
}

impl FailureKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FailureKind::Unconvertible => "cannot convert",
            FailureKind::VarargsArity => "argument count does not fit",
            FailureKind::LibraryMember => "library member cannot change",
            FailureKind::LocalElimination => "local cannot be removed",
            FailureKind::DeclarationSplit => "declaration cannot be split",
        }
    }
}

/// An element the migration could not bring to its required type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub element: ElementRef,
    pub ty: JType,
    pub kind: FailureKind,
    pub owner_root: Option<ElementRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template_placeholders() {
        let pieces = parse_template("$q.add($0, $)").unwrap();
        assert_eq!(
            pieces,
            vec![
                TemplatePiece::Hole(Placeholder::Qualifier),
                TemplatePiece::Text(".add(".into()),
                TemplatePiece::Hole(Placeholder::Arg(0)),
                TemplatePiece::Text(", ".into()),
                TemplatePiece::Hole(Placeholder::Expr),
                TemplatePiece::Text(")".into()),
            ]
        );
    }

    #[test]
    fn test_parse_template_plain_expression() {
        let pieces = parse_template("$.toString()").unwrap();
        assert_eq!(pieces[0], TemplatePiece::Hole(Placeholder::Expr));
        assert_eq!(pieces[1], TemplatePiece::Text(".toString()".into()));
    }

    #[test]
    fn test_parse_template_escape_and_errors() {
        assert_eq!(parse_template("$$").unwrap(), vec![TemplatePiece::Text("$".into())]);
        assert!(parse_template("$value").is_err());
        assert_eq!(
            parse_template("$l = $r").unwrap()[0],
            TemplatePiece::Hole(Placeholder::Lhs)
        );
    }

    #[test]
    fn test_descriptor_display() {
        assert_eq!(ConversionDescriptor::template("$.get()").to_string(), "$.get()");
        assert_eq!(ConversionDescriptor::noop().to_string(), "(unchanged)");
        assert!(ConversionDescriptor::noop().is_noop());
    }
}
