//! Java-like type model
//!
//! `JType` is the value the migration engine moves around: declared types,
//! evaluated expression types and migration targets all share it.
//!
//! Types serialize as their source text (`List<String>`, `int[]`, `T...`).
//! Identifiers made of one upper-case letter optionally followed by digits
//! (`T`, `E`, `K2`) parse as type parameters, everything else as a class.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Primitive kinds, `void` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 9] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Char,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::Void,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Void => "void",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Boolean | Self::Void)
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Short | Self::Char | Self::Int | Self::Long
        )
    }

    /// Position in the widening order used by numeric promotion.
    pub(crate) fn widening_rank(&self) -> u8 {
        match self {
            Self::Byte => 1,
            Self::Short | Self::Char => 2,
            Self::Int => 3,
            Self::Long => 4,
            Self::Float => 5,
            Self::Double => 6,
            Self::Boolean | Self::Void => 0,
        }
    }

    /// Name of the wrapper class (`int` -> `Integer`).
    pub fn box_name(&self) -> Option<&'static str> {
        match self {
            Self::Boolean => Some("Boolean"),
            Self::Byte => Some("Byte"),
            Self::Short => Some("Short"),
            Self::Char => Some("Character"),
            Self::Int => Some("Integer"),
            Self::Long => Some("Long"),
            Self::Float => Some("Float"),
            Self::Double => Some("Double"),
            Self::Void => None,
        }
    }

    pub fn from_box_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.box_name() == Some(name))
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type as the migration engine sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JType {
    Primitive(PrimitiveKind),
    /// Type of the `null` literal.
    Null,
    /// Class or interface, possibly parameterized. Empty `args` is the raw form.
    Class { name: String, args: Vec<JType> },
    Array(Box<JType>),
    /// Trailing variable-arity parameter type (`T...`).
    Varargs(Box<JType>),
    TypeParam(String),
}

impl JType {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        JType::Primitive(kind)
    }

    pub fn int() -> Self {
        JType::Primitive(PrimitiveKind::Int)
    }

    pub fn long() -> Self {
        JType::Primitive(PrimitiveKind::Long)
    }

    pub fn double() -> Self {
        JType::Primitive(PrimitiveKind::Double)
    }

    pub fn boolean() -> Self {
        JType::Primitive(PrimitiveKind::Boolean)
    }

    pub fn char() -> Self {
        JType::Primitive(PrimitiveKind::Char)
    }

    pub fn void() -> Self {
        JType::Primitive(PrimitiveKind::Void)
    }

    pub fn null() -> Self {
        JType::Null
    }

    pub fn class(name: impl Into<String>) -> Self {
        JType::Class {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<JType>) -> Self {
        JType::Class {
            name: name.into(),
            args,
        }
    }

    pub fn string() -> Self {
        Self::class("String")
    }

    pub fn object() -> Self {
        Self::class("Object")
    }

    pub fn array(component: JType) -> Self {
        JType::Array(Box::new(component))
    }

    pub fn varargs(component: JType) -> Self {
        JType::Varargs(Box::new(component))
    }

    pub fn type_param(name: impl Into<String>) -> Self {
        JType::TypeParam(name.into())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JType::Primitive(p) if *p != PrimitiveKind::Void)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, JType::Primitive(PrimitiveKind::Void))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JType::Null)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JType::Primitive(PrimitiveKind::Boolean))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            JType::Class { .. } | JType::Array(_) | JType::Varargs(_) | JType::TypeParam(_)
        )
    }

    pub fn is_array_like(&self) -> bool {
        matches!(self, JType::Array(_) | JType::Varargs(_))
    }

    pub fn is_varargs(&self) -> bool {
        matches!(self, JType::Varargs(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            JType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            JType::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn type_args(&self) -> &[JType] {
        match self {
            JType::Class { args, .. } => args,
            _ => &[],
        }
    }

    /// Element type of arrays and varargs.
    pub fn component(&self) -> Option<&JType> {
        match self {
            JType::Array(c) | JType::Varargs(c) => Some(c),
            _ => None,
        }
    }

    /// The innermost non-array type (`int[][]` -> `int`).
    pub fn deep_component(&self) -> &JType {
        let mut current = self;
        while let Some(c) = current.component() {
            current = c;
        }
        current
    }

    /// `T...` seen from inside the method body is `T[]`.
    pub fn varargs_to_array(&self) -> JType {
        match self {
            JType::Varargs(c) => JType::Array(c.clone()),
            other => other.clone(),
        }
    }

    pub fn erasure(&self) -> JType {
        match self {
            JType::Class { name, .. } => JType::class(name.clone()),
            JType::Array(c) => JType::array(c.erasure()),
            JType::Varargs(c) => JType::varargs(c.erasure()),
            JType::TypeParam(_) => JType::object(),
            other => other.clone(),
        }
    }

    /// Type parameters mentioned anywhere in the type.
    pub fn type_params(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_type_params(&mut out);
        out
    }

    fn collect_type_params(&self, out: &mut BTreeSet<String>) {
        match self {
            JType::TypeParam(name) => {
                out.insert(name.clone());
            }
            JType::Class { args, .. } => args.iter().for_each(|a| a.collect_type_params(out)),
            JType::Array(c) | JType::Varargs(c) => c.collect_type_params(out),
            JType::Primitive(_) | JType::Null => {}
        }
    }

    pub fn mentions_type_params(&self) -> bool {
        match self {
            JType::TypeParam(_) => true,
            JType::Class { args, .. } => args.iter().any(JType::mentions_type_params),
            JType::Array(c) | JType::Varargs(c) => c.mentions_type_params(),
            JType::Primitive(_) | JType::Null => false,
        }
    }

    /// Replace type parameters bound in `map`; unbound ones stay as they are.
    pub fn substitute(&self, map: &FxHashMap<String, JType>) -> JType {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            JType::TypeParam(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            JType::Class { name, args } => JType::Class {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            JType::Array(c) => JType::array(c.substitute(map)),
            JType::Varargs(c) => JType::varargs(c.substitute(map)),
            other => other.clone(),
        }
    }

    /// Parse source text such as `Map<String, List<Integer>>[]` or `T...`.
    pub fn parse(text: &str) -> Result<JType, String> {
        let mut parser = TypeParser {
            chars: text.chars().collect(),
            pos: 0,
        };
        let ty = parser.parse_type(true)?;
        parser.skip_ws();
        if parser.pos != parser.chars.len() {
            return Err(format!("unexpected trailing input in type '{text}'"));
        }
        Ok(ty)
    }
}

impl fmt::Display for JType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JType::Primitive(p) => write!(f, "{p}"),
            JType::Null => f.write_str("null"),
            JType::Class { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            JType::Array(c) => write!(f, "{c}[]"),
            JType::Varargs(c) => write!(f, "{c}..."),
            JType::TypeParam(name) => f.write_str(name),
        }
    }
}

impl TryFrom<String> for JType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        JType::parse(&value)
    }
}

impl From<JType> for String {
    fn from(value: JType) -> Self {
        value.to_string()
    }
}

fn is_type_param_name(ident: &str) -> bool {
    let mut chars = ident.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase()) && chars.all(|c| c.is_ascii_digit())
}

struct TypeParser {
    chars: Vec<char>,
    pos: usize,
}

impl TypeParser {
    fn skip_ws(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, s: &str) -> bool {
        self.skip_ws();
        let wanted: Vec<char> = s.chars().collect();
        if self.chars[self.pos..].starts_with(&wanted) {
            self.pos += wanted.len();
            true
        } else {
            false
        }
    }

    /// A possibly qualified name. A `.` belongs to the name only when an
    /// identifier character follows it, so `T...` stops before the dots.
    fn ident(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = self.pos;
        let is_ident_char = |c: char| c.is_alphanumeric() || c == '_';
        while let Some(&c) = self.chars.get(self.pos) {
            let qualifies = c == '.'
                && self.pos > start
                && self.chars.get(self.pos + 1).is_some_and(|next| is_ident_char(*next));
            if !is_ident_char(c) && !qualifies {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(format!("expected identifier at offset {start}"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_type(&mut self, allow_varargs: bool) -> Result<JType, String> {
        let ident = self.ident()?;
        if ident == "null" {
            return Ok(JType::Null);
        }
        let mut ty = if let Some(p) = PrimitiveKind::parse(&ident) {
            JType::Primitive(p)
        } else if is_type_param_name(&ident) {
            JType::TypeParam(ident)
        } else {
            let mut args = Vec::new();
            if self.eat("<") {
                loop {
                    args.push(self.parse_type(false)?);
                    if self.eat(",") {
                        continue;
                    }
                    if self.eat(">") {
                        break;
                    }
                    return Err(format!("expected ',' or '>' at offset {}", self.pos));
                }
            }
            JType::Class { name: ident, args }
        };
        while self.eat("[]") {
            ty = JType::array(ty);
        }
        if allow_varargs && self.eat("...") {
            ty = JType::varargs(ty);
        }
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested_generic() {
        let ty = JType::generic(
            "Map",
            vec![JType::string(), JType::generic("List", vec![JType::class("Integer")])],
        );
        assert_eq!(ty.to_string(), "Map<String, List<Integer>>");
        assert_eq!(JType::array(JType::int()).to_string(), "int[]");
        assert_eq!(JType::varargs(JType::string()).to_string(), "String...");
    }

    #[test]
    fn test_parse_matches_display() {
        for text in ["int", "long[][]", "List<T>", "Map<String, List<Integer>>", "T...", "Optional<E>[]"] {
            let ty = JType::parse(text).unwrap();
            assert_eq!(ty.to_string(), text);
        }
    }

    #[test]
    fn test_parse_varargs_structure() {
        assert_eq!(JType::parse("T...").unwrap(), JType::varargs(JType::type_param("T")));
        assert_eq!(JType::parse("String...").unwrap(), JType::varargs(JType::string()));
        assert_eq!(
            JType::parse("List<E>...").unwrap(),
            JType::varargs(JType::generic("List", vec![JType::type_param("E")]))
        );
        assert_eq!(JType::parse("java.util.List").unwrap(), JType::class("java.util.List"));
        assert!(JType::parse("String...").unwrap().is_varargs());
    }

    #[test]
    fn test_varargs_survive_serde() {
        let ty = JType::varargs(JType::type_param("T"));
        let back: JType = serde_json::from_str(&serde_json::to_string(&ty).unwrap()).unwrap();
        assert_eq!(back, ty);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(JType::parse("List<").is_err());
        assert!(JType::parse("int x").is_err());
        assert!(JType::parse("").is_err());
    }

    #[test]
    fn test_type_param_detection() {
        assert_eq!(JType::parse("T").unwrap(), JType::type_param("T"));
        assert_eq!(JType::parse("Item").unwrap(), JType::class("Item"));
        let ty = JType::parse("Map<K, List<V>>").unwrap();
        let params: Vec<_> = ty.type_params().into_iter().collect();
        assert_eq!(params, vec!["K".to_string(), "V".to_string()]);
    }

    #[test]
    fn test_substitute() {
        let mut map = FxHashMap::default();
        map.insert("E".to_string(), JType::string());
        let ty = JType::parse("List<E>[]").unwrap();
        assert_eq!(ty.substitute(&map).to_string(), "List<String>[]");
    }

    #[test]
    fn test_serde_as_text() {
        let ty = JType::parse("List<String>").unwrap();
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "\"List<String>\"");
        let back: JType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }

    #[test]
    fn test_box_names() {
        assert_eq!(PrimitiveKind::Int.box_name(), Some("Integer"));
        assert_eq!(PrimitiveKind::from_box_name("Character"), Some(PrimitiveKind::Char));
        assert_eq!(PrimitiveKind::Void.box_name(), None);
    }
}
