//! Declarations found in a source file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The kind of a nominal type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    /// `class Foo`.
    Class,
    /// `struct Foo`.
    Struct,
    /// `enum Foo`.
    Enum,
    /// `protocol Foo`.
    Protocol,
    /// `actor Foo`.
    Actor,
    /// `extension Foo`: adds members to a type declared elsewhere.
    Extension,
}

impl TypeKind {
    /// Maps a declaration keyword to its kind.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "class" => Some(Self::Class),
            "struct" => Some(Self::Struct),
            "enum" => Some(Self::Enum),
            "protocol" => Some(Self::Protocol),
            "actor" => Some(Self::Actor),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }

    /// Returns the declaration keyword for this kind.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Protocol => "protocol",
            Self::Actor => "actor",
            Self::Extension => "extension",
        }
    }
}

/// A variable or property declared inside a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// The variable name.
    pub name: String,
    /// The declared type name, empty when the type is inferred.
    pub type_name: String,
    /// Whether the variable has a getter body instead of storage.
    pub is_computed: bool,
    /// Whether the variable is `static` or `class`.
    pub is_static: bool,
    /// Whether the variable's getter is `async`.
    pub is_async: bool,
}

impl Variable {
    /// Returns `true` for per-instance stored properties.
    pub fn is_stored_instance(&self) -> bool {
        !self.is_computed && !self.is_static && !self.is_async
    }
}

/// A free function or a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    /// The function's base name.
    pub name: String,
    /// The declaration text from `func` up to the body, whitespace-trimmed.
    pub signature: String,
    /// Whether the function is `static` or `class`.
    pub is_static: bool,
    /// Documentation comment lines, without the `///` prefix.
    pub documentation: Vec<String>,
}

/// An enum case with its associated value types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumCase {
    /// The case name.
    pub name: String,
    /// Associated value type names, in declaration order.
    pub associated_values: Vec<String>,
}

/// A `typealias` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAlias {
    /// The alias name.
    pub name: String,
    /// The aliased type, as written.
    pub target: String,
}

/// A nominal type declaration or an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// The type name (for extensions, the extended type's name).
    pub name: String,
    /// The declaration kind.
    pub kind: TypeKind,
    /// The module the declaring file belongs to, if known.
    pub module: Option<String>,
    /// Inherited types and adopted protocols, in declaration order.
    pub inherits: Vec<String>,
    /// Properties declared directly in this declaration.
    pub variables: Vec<Variable>,
    /// Methods declared directly in this declaration.
    pub methods: Vec<Function>,
    /// Enum cases (empty for non-enums).
    pub cases: Vec<EnumCase>,
    /// Annotations attached via `// sourcery:` comments.
    pub annotations: BTreeMap<String, String>,
    /// Documentation comment lines.
    pub documentation: Vec<String>,
    /// The resolved superclass name. Set by a composer, never by a parser.
    pub supertype: Option<String>,
}

impl TypeDecl {
    /// Creates an empty declaration of the given kind.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            module: None,
            inherits: Vec::new(),
            variables: Vec::new(),
            methods: Vec::new(),
            cases: Vec::new(),
            annotations: BTreeMap::new(),
            documentation: Vec::new(),
            supertype: None,
        }
    }

    /// Returns `true` if this declaration is an extension.
    pub fn is_extension(&self) -> bool {
        self.kind == TypeKind::Extension
    }

    /// Returns `true` if the declaration carries the given annotation.
    pub fn has_annotation(&self, key: &str) -> bool {
        self.annotations.contains_key(key)
    }
}
