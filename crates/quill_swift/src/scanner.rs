//! Line-oriented Swift declaration scanner.
//!
//! The scanner does not build a syntax tree. It strips comments and string
//! contents from each line, recognises declarations by their leading
//! keyword, and tracks braces to know which type a member belongs to. This
//! is enough to extract the declarations code generation templates need
//! from conventionally formatted sources; one declaration per line is
//! assumed.

use std::collections::BTreeMap;

use quill_model::{
    EnumCase, Function, InlineRange, ParseArtifact, TypeAlias, TypeDecl, TypeKind, Variable,
};
use quill_parse::{ParseError, ParseInput, StructuralParser, GENERATION_MARKER};

use crate::lexer::{
    contains_word, is_ident_char, split_top_level, strip_attributes, take_ident, until_top_level,
    CodeFilter,
};

const ANNOTATION_PREFIX: &str = "// sourcery:";
const INLINE_PREFIX: &str = "// sourcery:inline:";
const INLINE_END: &str = "// sourcery:end";
const FILE_DIRECTIVE: &str = "file:";

const MODIFIERS: &[&str] = &[
    "public",
    "private",
    "fileprivate",
    "internal",
    "open",
    "package",
    "final",
    "mutating",
    "nonmutating",
    "override",
    "required",
    "convenience",
    "lazy",
    "weak",
    "unowned",
    "indirect",
    "dynamic",
    "nonisolated",
    "optional",
    "prefix",
    "postfix",
    "infix",
    "distributed",
];

/// Keywords after which `class` acts as a `static` modifier.
const CLASS_MEMBER_KEYWORDS: &[&str] = &["func", "var", "let", "subscript"];

const OPERATOR_CHARS: &str = "/=-+!*%<>&|^~?.";

/// Scans Swift sources for declarations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationScanner;

impl StructuralParser for DeclarationScanner {
    fn extensions(&self) -> &[&str] {
        &["swift"]
    }

    fn parse(&self, input: &ParseInput<'_>) -> Result<Option<ParseArtifact>, ParseError> {
        if !input.force_parse && input.content.starts_with(GENERATION_MARKER) {
            tracing::trace!(path = %input.path.display(), "generated file, not scanning");
            return Ok(None);
        }

        let mut artifact = ParseArtifact::empty(input.path, input.module.map(str::to_string));
        FileScan::new(&mut artifact, input.module, input.parse_documentation).run(input.content)?;
        Ok(Some(artifact))
    }
}

/// What an open brace belongs to.
#[derive(Debug, Clone, Copy)]
enum Frame {
    /// The body of `artifact.types[_]`.
    Type(usize),
    /// The accessor block of a property.
    Accessor { ty: usize, var: usize },
    /// Any other block.
    Body,
}

#[derive(Debug)]
struct OpenRegion {
    name: String,
    offset: usize,
    indentation: String,
    line: usize,
}

#[derive(Debug)]
struct Decl {
    is_static: bool,
    kind: DeclKind,
}

#[derive(Debug)]
enum DeclKind {
    Type {
        kind: TypeKind,
        name: String,
        inherits: Vec<String>,
    },
    Function {
        name: String,
        signature: String,
    },
    Variable(Variable),
    Cases(Vec<EnumCase>),
    Alias(TypeAlias),
    /// `init`, `deinit`, `subscript` and other declarations with opaque bodies.
    Opaque,
}

struct FileScan<'a> {
    artifact: &'a mut ParseArtifact,
    module: Option<&'a str>,
    parse_documentation: bool,
    filter: CodeFilter,
    stack: Vec<Frame>,
    /// A type whose header ended without `{`; the next brace opens it.
    pending_type: Option<usize>,
    annotations: BTreeMap<String, String>,
    docs: Vec<String>,
    region: Option<OpenRegion>,
}

impl<'a> FileScan<'a> {
    fn new(artifact: &'a mut ParseArtifact, module: Option<&'a str>, parse_documentation: bool) -> Self {
        Self {
            artifact,
            module,
            parse_documentation,
            filter: CodeFilter::default(),
            stack: Vec::new(),
            pending_type: None,
            annotations: BTreeMap::new(),
            docs: Vec::new(),
            region: None,
        }
    }

    fn run(mut self, content: &str) -> Result<(), ParseError> {
        let mut offset = 0;
        let mut line_no = 0;
        for raw in content.split_inclusive('\n') {
            line_no += 1;
            let start = offset;
            offset += raw.len();
            let line = raw.trim_end_matches(['\n', '\r']);
            self.line(line, line_no, start, offset)?;
        }

        if let Some(region) = self.region {
            return Err(ParseError::at_line(
                format!("unterminated inline region `{}`", region.name),
                region.line,
            ));
        }
        if !self.stack.is_empty() {
            return Err(ParseError::at_line(
                format!("unbalanced braces: {} block(s) left open", self.stack.len()),
                line_no,
            ));
        }
        Ok(())
    }

    /// `start..end` is the byte range of the line including its newline.
    fn line(&mut self, line: &str, line_no: usize, start: usize, end: usize) -> Result<(), ParseError> {
        let trimmed = line.trim();
        if self.filter.at_code() && trimmed.starts_with("//") {
            return self.comment(line, trimmed, line_no, start, end);
        }

        let code = strip_attributes(&self.filter.code_of(line));
        let code = code.trim();
        if code.is_empty() {
            return Ok(());
        }
        let frame = self.declare(code);
        self.braces(code, frame, line_no)?;
        self.annotations.clear();
        self.docs.clear();
        Ok(())
    }

    fn comment(
        &mut self,
        line: &str,
        trimmed: &str,
        line_no: usize,
        start: usize,
        end: usize,
    ) -> Result<(), ParseError> {
        if let Some(name) = trimmed.strip_prefix(INLINE_PREFIX) {
            if let Some(open) = &self.region {
                return Err(ParseError::at_line(
                    format!("inline region `{}` opened inside `{}`", name.trim(), open.name),
                    line_no,
                ));
            }
            let indentation = &line[..line.len() - line.trim_start().len()];
            self.region = Some(OpenRegion {
                name: name.trim().to_string(),
                offset: end,
                indentation: indentation.to_string(),
                line: line_no,
            });
        } else if trimmed.starts_with(INLINE_END) {
            let Some(region) = self.region.take() else {
                return Err(ParseError::at_line(
                    "`sourcery:end` without an open inline region",
                    line_no,
                ));
            };
            self.artifact.inline_ranges.insert(
                region.name.clone(),
                InlineRange {
                    offset: region.offset,
                    length: start - region.offset,
                },
            );
            self.artifact
                .inline_indentations
                .insert(region.name, region.indentation);
        } else if let Some(rest) = trimmed.strip_prefix(ANNOTATION_PREFIX) {
            if !rest.starts_with(FILE_DIRECTIVE) {
                parse_annotations(rest, &mut self.annotations);
            }
        } else if let Some(doc) = trimmed.strip_prefix("///") {
            if self.parse_documentation {
                self.docs.push(doc.strip_prefix(' ').unwrap_or(doc).to_string());
            }
        }
        Ok(())
    }

    /// Records the declaration on `code`, if any, and returns the frame its
    /// first brace opens.
    fn declare(&mut self, code: &str) -> Option<Frame> {
        let parent = match self.stack.last().copied() {
            None => None,
            Some(Frame::Type(ty)) => Some(ty),
            Some(Frame::Accessor { ty, var }) => {
                self.accessor(code, ty, var);
                return None;
            }
            Some(Frame::Body) => return None,
        };

        let decl = classify(code)?;
        self.pending_type = None;
        match decl.kind {
            DeclKind::Type {
                kind,
                name,
                inherits,
            } => {
                let name = match parent {
                    Some(p) if kind != TypeKind::Extension => {
                        format!("{}.{}", self.artifact.types[p].name, name)
                    }
                    _ => name,
                };
                let mut ty = TypeDecl::new(name, kind);
                ty.module = self.module.map(str::to_string);
                ty.inherits = inherits;
                ty.annotations = std::mem::take(&mut self.annotations);
                ty.documentation = std::mem::take(&mut self.docs);
                self.artifact.types.push(ty);
                let idx = self.artifact.types.len() - 1;
                if !code.contains('{') {
                    self.pending_type = Some(idx);
                }
                Some(Frame::Type(idx))
            }
            DeclKind::Function { name, signature } => {
                let function = Function {
                    name,
                    signature,
                    is_static: decl.is_static,
                    documentation: std::mem::take(&mut self.docs),
                };
                match parent {
                    Some(p) => self.artifact.types[p].methods.push(function),
                    None => self.artifact.functions.push(function),
                }
                Some(Frame::Body)
            }
            DeclKind::Variable(mut variable) => match parent {
                Some(p) => {
                    variable.is_static = decl.is_static;
                    let vars = &mut self.artifact.types[p].variables;
                    vars.push(variable);
                    Some(Frame::Accessor {
                        ty: p,
                        var: vars.len() - 1,
                    })
                }
                None => Some(Frame::Body),
            },
            DeclKind::Cases(cases) => {
                if let Some(p) = parent {
                    let ty = &mut self.artifact.types[p];
                    if ty.kind == TypeKind::Enum {
                        ty.cases.extend(cases);
                    }
                }
                None
            }
            DeclKind::Alias(mut alias) => {
                if let Some(p) = parent {
                    alias.name = format!("{}.{}", self.artifact.types[p].name, alias.name);
                }
                self.artifact.typealiases.push(alias);
                None
            }
            DeclKind::Opaque => Some(Frame::Body),
        }
    }

    /// Refines a property from a line directly inside its accessor block.
    fn accessor(&mut self, code: &str, ty: usize, var: usize) {
        let variable = &mut self.artifact.types[ty].variables[var];
        match take_ident(code).0 {
            "get" => {
                variable.is_computed = true;
                if contains_word(code, "async") {
                    variable.is_async = true;
                }
            }
            "willSet" | "didSet" => variable.is_computed = false,
            _ => {}
        }
    }

    fn braces(&mut self, code: &str, mut frame: Option<Frame>, line_no: usize) -> Result<(), ParseError> {
        for c in code.chars() {
            match c {
                '{' => {
                    let opened = frame
                        .take()
                        .or_else(|| self.pending_type.take().map(Frame::Type))
                        .unwrap_or(Frame::Body);
                    self.stack.push(opened);
                }
                '}' => {
                    if self.stack.pop().is_none() {
                        return Err(ParseError::at_line(
                            "unbalanced braces: unexpected `}`",
                            line_no,
                        ));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Parses `key = value, flag` pairs. Flags get the value `true`.
fn parse_annotations(text: &str, into: &mut BTreeMap<String, String>) {
    for part in split_top_level(text) {
        match part.split_once('=') {
            Some((key, value)) => {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                into.insert(key.trim().to_string(), value.to_string());
            }
            None => {
                into.insert(part.to_string(), "true".to_string());
            }
        }
    }
}

/// Recognises the declaration a line starts with.
fn classify(code: &str) -> Option<Decl> {
    let mut rest = code;
    let mut is_static = false;
    loop {
        let (word, after) = take_ident(rest);
        match word {
            "static" => is_static = true,
            "class" if is_class_modifier(after) => is_static = true,
            w if MODIFIERS.contains(&w) => {}
            _ => break,
        }
        rest = skip_parenthesized(after);
    }

    let at_keyword = rest.trim_start();
    let (keyword, after) = take_ident(at_keyword);
    let kind = if let Some(kind) = TypeKind::from_keyword(keyword) {
        type_header(kind, after)?
    } else {
        match keyword {
            "func" => function(at_keyword, after)?,
            "var" | "let" => variable(keyword, after),
            "case" => DeclKind::Cases(cases(after)),
            "typealias" => alias(after)?,
            "init" | "deinit" | "subscript" => DeclKind::Opaque,
            _ => return None,
        }
    };
    Some(Decl { is_static, kind })
}

fn is_class_modifier(after: &str) -> bool {
    let next = take_ident(after).0;
    CLASS_MEMBER_KEYWORDS.contains(&next) || MODIFIERS.contains(&next) || next == "static"
}

/// Skips a `(set)`-style modifier argument.
fn skip_parenthesized(s: &str) -> &str {
    let trimmed = s.trim_start();
    if trimmed.starts_with('(') {
        if let Some(close) = trimmed.find(')') {
            return &trimmed[close + 1..];
        }
    }
    s
}

fn type_header(kind: TypeKind, after: &str) -> Option<DeclKind> {
    let after = after.trim_start();
    let end = after
        .find(|c: char| !(is_ident_char(c) || c == '.'))
        .unwrap_or(after.len());
    let name = &after[..end];
    if name.is_empty() {
        return None;
    }

    let mut rest = after[end..].trim_start();
    if rest.starts_with('<') {
        let generics = until_top_level(rest, &[':', '{', ' ']);
        rest = rest[generics.len()..].trim_start();
    }
    let inherits = match rest.strip_prefix(':') {
        Some(clause) => {
            let clause = clause.split('{').next().unwrap_or_default();
            let clause = match clause.find(" where ") {
                Some(at) => &clause[..at],
                None => clause,
            };
            split_top_level(clause)
                .into_iter()
                .map(str::to_string)
                .collect()
        }
        None => Vec::new(),
    };

    Some(DeclKind::Type {
        kind,
        name: name.to_string(),
        inherits,
    })
}

fn function(at_keyword: &str, after: &str) -> Option<DeclKind> {
    let after = after.trim_start();
    let name = if after.starts_with(|c: char| is_ident_char(c) || c == '`') {
        take_ident(after).0
    } else {
        let end = after
            .find(|c: char| !OPERATOR_CHARS.contains(c))
            .unwrap_or(after.len());
        &after[..end]
    };
    if name.is_empty() {
        return None;
    }
    let signature = at_keyword.split('{').next().unwrap_or_default().trim();
    Some(DeclKind::Function {
        name: name.to_string(),
        signature: signature.to_string(),
    })
}

fn variable(keyword: &str, after: &str) -> DeclKind {
    let (name, tail) = take_ident(after);
    if name.is_empty() {
        // Tuple destructuring and other patterns.
        return DeclKind::Opaque;
    }

    let tail = tail.trim_start();
    let (type_name, tail) = match tail.strip_prefix(':') {
        Some(annotated) => {
            let ty = until_top_level(annotated, &['=', '{']);
            (ty.trim().to_string(), &annotated[ty.len()..])
        }
        None => (String::new(), tail),
    };

    let body = tail.trim_start().strip_prefix('{').map(str::trim_start);
    let is_computed = keyword == "var"
        && body.is_some_and(|b| !(b.starts_with("willSet") || b.starts_with("didSet")));
    let is_async = body.is_some_and(|b| contains_word(b, "async"));

    DeclKind::Variable(Variable {
        name: name.to_string(),
        type_name,
        is_computed,
        is_static: false,
        is_async,
    })
}

fn cases(after: &str) -> Vec<EnumCase> {
    split_top_level(after)
        .into_iter()
        .filter_map(|part| {
            let (name, tail) = take_ident(part);
            if name.is_empty() {
                return None;
            }
            let tail = tail.trim_start();
            let associated_values = match (tail.strip_prefix('('), tail.rfind(')')) {
                (Some(_), Some(close)) => split_top_level(&tail[1..close])
                    .into_iter()
                    .map(associated_type)
                    .collect(),
                _ => Vec::new(),
            };
            Some(EnumCase {
                name: name.to_string(),
                associated_values,
            })
        })
        .collect()
}

/// `label: Type = default` → `Type`.
fn associated_type(value: &str) -> String {
    let value = until_top_level(value, &['=']).trim();
    let label = until_top_level(value, &[':']);
    if label.len() == value.len() {
        value.to_string()
    } else {
        value[label.len() + 1..].trim().to_string()
    }
}

fn alias(after: &str) -> Option<DeclKind> {
    let (name, tail) = take_ident(after);
    let (_, target) = tail.split_once('=')?;
    if name.is_empty() {
        return None;
    }
    Some(DeclKind::Alias(TypeAlias {
        name: name.to_string(),
        target: target.trim().to_string(),
    }))
}
