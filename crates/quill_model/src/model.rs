//! Run-wide models: the raw merge of all artifacts and the composed result.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::artifact::ParseArtifact;
use crate::decl::{Function, TypeAlias, TypeDecl, Variable};

/// The concatenation of every artifact's declarations in a run.
///
/// Declaration order follows the order artifacts were folded in. Use
/// [`canonical`](Self::canonical) to compare two models regardless of order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedModel {
    /// All types and extensions.
    pub types: Vec<TypeDecl>,
    /// All free functions.
    pub functions: Vec<Function>,
    /// All type aliases.
    pub typealiases: Vec<TypeAlias>,
}

impl MergedModel {
    /// Appends the declarations of one artifact.
    pub fn extend_from(&mut self, artifact: &ParseArtifact) {
        self.types.extend(artifact.types.iter().cloned());
        self.functions.extend(artifact.functions.iter().cloned());
        self.typealiases.extend(artifact.typealiases.iter().cloned());
    }

    /// Returns a copy with every list sorted into a stable order.
    pub fn canonical(&self) -> Self {
        let mut out = self.clone();
        sort_types(&mut out.types);
        sort_functions(&mut out.functions);
        out.typealiases.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

/// The final model a composer produces from a [`MergedModel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedModel {
    /// Deduplicated types with extensions folded in.
    pub types: Vec<TypeDecl>,
    /// Free functions.
    pub functions: Vec<Function>,
    /// Type aliases.
    pub typealiases: Vec<TypeAlias>,
}

impl ComposedModel {
    /// Looks up a non-extension type by name.
    ///
    /// When modules declare types of the same name, the first in model
    /// order is returned; use [`resolve`](Self::resolve) to pick by module.
    pub fn type_named(&self, name: &str) -> Option<&TypeDecl> {
        self.types
            .iter()
            .find(|t| t.name == name && !t.is_extension())
    }

    /// Looks up the non-extension type `name` as seen from `module`.
    ///
    /// A type declared in `module` wins. Otherwise the name must be
    /// declared by exactly one module.
    pub fn resolve(&self, name: &str, module: Option<&str>) -> Option<&TypeDecl> {
        let candidates: Vec<&TypeDecl> = self
            .types
            .iter()
            .filter(|t| t.name == name && !t.is_extension())
            .collect();
        match candidates.iter().find(|t| t.module.as_deref() == module) {
            Some(local) => Some(*local),
            None if candidates.len() == 1 => Some(candidates[0]),
            None => None,
        }
    }

    /// Collects stored instance variables of `ty` and then of each supertype.
    ///
    /// Each supertype is resolved by name from the module of the type that
    /// names it. The walk stops at the first name that does not resolve or
    /// that was already visited.
    pub fn inherited_variables<'a>(&'a self, ty: &'a TypeDecl) -> Vec<&'a Variable> {
        let mut variables = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(ty);

        while let Some(decl) = current {
            if !visited.insert((decl.module.as_deref(), decl.name.as_str())) {
                break;
            }
            variables.extend(decl.variables.iter().filter(|v| v.is_stored_instance()));
            current = decl
                .supertype
                .as_deref()
                .and_then(|name| self.resolve(name, decl.module.as_deref()));
        }

        variables
    }

    /// Returns a copy with every list sorted into a stable order.
    pub fn canonical(&self) -> Self {
        let mut out = self.clone();
        sort_types(&mut out.types);
        sort_functions(&mut out.functions);
        out.typealiases.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

fn sort_types(types: &mut [TypeDecl]) {
    types.sort_by(|a, b| {
        (&a.name, a.kind.keyword(), &a.module).cmp(&(&b.name, b.kind.keyword(), &b.module))
    });
}

fn sort_functions(functions: &mut [Function]) {
    functions.sort_by(|a, b| (&a.name, &a.signature).cmp(&(&b.name, &b.signature)));
}
