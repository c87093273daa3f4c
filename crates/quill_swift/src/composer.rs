//! Resolution of merged declarations into the final model.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use quill_model::{ComposedModel, Function, MergedModel, TypeDecl, TypeKind};
use quill_parse::Composer;

/// A declaration's identity: its name and the module it was declared in.
type DeclKey = (String, Option<String>);

/// Folds extensions into their base types and links superclasses.
///
/// Types are identified by name and module, so modules may declare types of
/// the same name. An extension joins the base of its own module, or the only
/// base of that name when its module has none. The output does not depend on
/// the order of the input: declarations are put into canonical order before
/// folding and the result is sorted by name and module.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionComposer;

impl Composer for ExtensionComposer {
    fn compose(&self, merged: MergedModel) -> ComposedModel {
        let MergedModel {
            types,
            functions,
            typealiases,
        } = merged;

        let (mut extensions, mut bases): (Vec<_>, Vec<_>) =
            types.into_iter().partition(TypeDecl::is_extension);
        extensions.sort_by_cached_key(member_key);
        bases.sort_by_cached_key(member_key);

        let mut by_key: BTreeMap<DeclKey, TypeDecl> = BTreeMap::new();
        for base in bases {
            match by_key.entry(key_of(&base)) {
                Entry::Vacant(slot) => {
                    slot.insert(base);
                }
                Entry::Occupied(mut existing) => {
                    tracing::debug!(name = %base.name, module = ?base.module, "duplicate type declaration");
                    absorb(existing.get_mut(), base);
                }
            }
        }

        let mut orphans: BTreeMap<DeclKey, TypeDecl> = BTreeMap::new();
        for ext in extensions {
            if let Some(key) = resolve_key(&by_key, &ext.name, ext.module.as_deref()) {
                if let Some(base) = by_key.get_mut(&key) {
                    absorb(base, ext);
                    continue;
                }
            }
            match orphans.entry(key_of(&ext)) {
                Entry::Vacant(slot) => {
                    slot.insert(ext);
                }
                Entry::Occupied(mut existing) => absorb(existing.get_mut(), ext),
            }
        }

        let supertypes: Vec<(DeclKey, Option<String>)> = by_key
            .iter()
            .filter(|(_, ty)| ty.kind == TypeKind::Class)
            .map(|(key, ty)| (key.clone(), superclass_of(&by_key, key, ty)))
            .collect();
        for (key, supertype) in supertypes {
            if let Some(ty) = by_key.get_mut(&key) {
                ty.supertype = supertype;
            }
        }

        let mut types: Vec<TypeDecl> = by_key.into_values().chain(orphans.into_values()).collect();
        types.sort_by(|a, b| {
            (&a.name, a.is_extension(), &a.module).cmp(&(&b.name, b.is_extension(), &b.module))
        });

        ComposedModel {
            types,
            functions: unique_functions(functions),
            typealiases: {
                let mut aliases = typealiases;
                aliases.sort_by(|a, b| (&a.name, &a.target).cmp(&(&b.name, &b.target)));
                aliases.dedup_by(|a, b| a.name == b.name);
                aliases
            },
        }
    }
}

fn key_of(ty: &TypeDecl) -> DeclKey {
    (ty.name.clone(), ty.module.clone())
}

/// Finds the base type `name` as seen from `module`: the module's own
/// declaration, else the only declaration of that name.
fn resolve_key(
    bases: &BTreeMap<DeclKey, TypeDecl>,
    name: &str,
    module: Option<&str>,
) -> Option<DeclKey> {
    let own = (name.to_string(), module.map(str::to_string));
    if bases.contains_key(&own) {
        return Some(own);
    }
    let mut named = bases.keys().filter(|(n, _)| n == name);
    match (named.next(), named.next()) {
        (Some(only), None) => Some(only.clone()),
        _ => None,
    }
}

/// The first inherited name that resolves to a class other than `ty` itself.
fn superclass_of(
    bases: &BTreeMap<DeclKey, TypeDecl>,
    key: &DeclKey,
    ty: &TypeDecl,
) -> Option<String> {
    ty.inherits
        .iter()
        .find(|name| {
            resolve_key(bases, name, ty.module.as_deref())
                .filter(|resolved| resolved != key)
                .and_then(|resolved| bases.get(&resolved))
                .is_some_and(|decl| decl.kind == TypeKind::Class)
        })
        .cloned()
}

/// Merges the members of `other` into `into`, skipping members `into`
/// already declares.
fn absorb(into: &mut TypeDecl, other: TypeDecl) {
    for name in other.inherits {
        if !into.inherits.contains(&name) {
            into.inherits.push(name);
        }
    }
    for var in other.variables {
        if !into.variables.iter().any(|v| v.name == var.name) {
            into.variables.push(var);
        }
    }
    for method in other.methods {
        if !into.methods.iter().any(|m| m.signature == method.signature) {
            into.methods.push(method);
        }
    }
    for case in other.cases {
        if !into.cases.iter().any(|c| c.name == case.name) {
            into.cases.push(case);
        }
    }
    for (key, value) in other.annotations {
        into.annotations.entry(key).or_insert(value);
    }
    if into.documentation.is_empty() {
        into.documentation = other.documentation;
    }
}

/// A sort key covering a declaration's identity, kind and full contents.
fn member_key(ty: &TypeDecl) -> (String, Option<String>, &'static str, Vec<String>) {
    let members = ty
        .inherits
        .iter()
        .cloned()
        .chain(ty.variables.iter().map(|v| {
            let flags = (v.is_computed, v.is_static, v.is_async);
            format!("var {}: {} {flags:?}", v.name, v.type_name)
        }))
        .chain(ty.methods.iter().map(|m| format!("{} {}", m.signature, m.is_static)))
        .chain(
            ty.cases
                .iter()
                .map(|c| format!("case {}({})", c.name, c.associated_values.join(", "))),
        )
        .chain(ty.annotations.iter().map(|(k, v)| format!("@{k}={v}")))
        .chain(ty.documentation.iter().map(|d| format!("/// {d}")))
        .collect();
    (ty.name.clone(), ty.module.clone(), ty.kind.keyword(), members)
}

fn unique_functions(mut functions: Vec<Function>) -> Vec<Function> {
    functions.sort_by(|a, b| (&a.name, &a.signature).cmp(&(&b.name, &b.signature)));
    functions.dedup_by(|a, b| a.signature == b.signature);
    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_model::{TypeAlias, Variable};

    fn var(name: &str) -> Variable {
        Variable {
            name: name.to_string(),
            type_name: "Int".to_string(),
            is_computed: false,
            is_static: false,
            is_async: false,
        }
    }

    fn decl(name: &str, kind: TypeKind, inherits: &[&str], vars: &[&str]) -> TypeDecl {
        let mut t = TypeDecl::new(name, kind);
        t.inherits = inherits.iter().map(|s| s.to_string()).collect();
        t.variables = vars.iter().map(|v| var(v)).collect();
        t
    }

    fn merged(types: Vec<TypeDecl>) -> MergedModel {
        MergedModel {
            types,
            ..MergedModel::default()
        }
    }

    #[test]
    fn extensions_fold_into_base() {
        let model = ExtensionComposer.compose(merged(vec![
            decl("User", TypeKind::Extension, &["Equatable"], &["cached"]),
            decl("User", TypeKind::Struct, &["Codable"], &["id"]),
        ]));
        assert_eq!(model.types.len(), 1);
        let user = &model.types[0];
        assert_eq!(user.kind, TypeKind::Struct);
        assert_eq!(user.inherits, vec!["Codable", "Equatable"]);
        let vars: Vec<_> = user.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(vars, ["id", "cached"]);
    }

    #[test]
    fn orphan_extensions_are_kept_and_merged() {
        let model = ExtensionComposer.compose(merged(vec![
            decl("String", TypeKind::Extension, &["Identifiable"], &[]),
            decl("String", TypeKind::Extension, &["Describable"], &[]),
        ]));
        assert_eq!(model.types.len(), 1);
        assert!(model.types[0].is_extension());
        assert_eq!(model.types[0].inherits.len(), 2);
    }

    #[test]
    fn duplicates_are_collapsed() {
        let model = ExtensionComposer.compose(merged(vec![
            decl("A", TypeKind::Struct, &[], &["x"]),
            decl("A", TypeKind::Struct, &[], &["x"]),
        ]));
        assert_eq!(model.types.len(), 1);
        assert_eq!(model.types[0].variables.len(), 1);
    }

    #[test]
    fn supertype_is_first_known_class() {
        let model = ExtensionComposer.compose(merged(vec![
            decl("Dog", TypeKind::Class, &["Hashable", "Animal"], &["name"]),
            decl("Animal", TypeKind::Class, &["NSObject"], &["legs"]),
            decl("Hashable", TypeKind::Protocol, &[], &[]),
        ]));
        let dog = model.type_named("Dog").unwrap();
        assert_eq!(dog.supertype.as_deref(), Some("Animal"));
        let animal = model.type_named("Animal").unwrap();
        assert!(animal.supertype.is_none());

        let inherited: Vec<_> = model
            .inherited_variables(dog)
            .into_iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(inherited, ["name", "legs"]);
    }

    #[test]
    fn structs_never_get_a_supertype() {
        let model = ExtensionComposer.compose(merged(vec![
            decl("Base", TypeKind::Class, &[], &[]),
            decl("S", TypeKind::Struct, &["Base"], &[]),
        ]));
        assert!(model.type_named("S").unwrap().supertype.is_none());
    }

    #[test]
    fn output_is_order_independent() {
        let forward = vec![
            decl("B", TypeKind::Class, &["A"], &["b"]),
            decl("A", TypeKind::Class, &[], &["a"]),
            decl("A", TypeKind::Extension, &["P"], &["ext1"]),
            decl("A", TypeKind::Extension, &["Q"], &["ext2"]),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let one = ExtensionComposer.compose(merged(forward));
        let two = ExtensionComposer.compose(merged(backward));
        assert_eq!(one, two);
        let names: Vec<_> = one.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn functions_and_aliases_are_deduplicated() {
        let f = Function {
            name: "run".to_string(),
            signature: "func run()".to_string(),
            is_static: false,
            documentation: Vec::new(),
        };
        let alias = TypeAlias {
            name: "ID".to_string(),
            target: "String".to_string(),
        };
        let model = ExtensionComposer.compose(MergedModel {
            types: Vec::new(),
            functions: vec![f.clone(), f],
            typealiases: vec![alias.clone(), alias],
        });
        assert_eq!(model.functions.len(), 1);
        assert_eq!(model.typealiases.len(), 1);
    }

    fn in_module(mut decl: TypeDecl, module: &str) -> TypeDecl {
        decl.module = Some(module.to_string());
        decl
    }

    #[test]
    fn same_name_in_two_modules_stays_apart() {
        let model = ExtensionComposer.compose(merged(vec![
            in_module(decl("User", TypeKind::Class, &[], &["name"]), "Core"),
            in_module(decl("User", TypeKind::Struct, &[], &["id"]), "App"),
        ]));
        assert_eq!(model.types.len(), 2);
        let app = model.resolve("User", Some("App")).unwrap();
        let core = model.resolve("User", Some("Core")).unwrap();
        assert_eq!(app.kind, TypeKind::Struct);
        assert_eq!(app.variables.len(), 1);
        assert_eq!(core.kind, TypeKind::Class);
        assert_eq!(core.variables[0].name, "name");
    }

    #[test]
    fn extension_joins_its_own_module_first() {
        let model = ExtensionComposer.compose(merged(vec![
            in_module(decl("User", TypeKind::Struct, &[], &["id"]), "App"),
            in_module(decl("User", TypeKind::Class, &[], &["name"]), "Core"),
            in_module(decl("User", TypeKind::Extension, &["Codable"], &[]), "Core"),
        ]));
        assert_eq!(model.types.len(), 2);
        assert!(model.resolve("User", Some("Core")).unwrap().inherits.contains(&"Codable".to_string()));
        assert!(model.resolve("User", Some("App")).unwrap().inherits.is_empty());
    }

    #[test]
    fn extension_falls_back_to_the_only_base() {
        let model = ExtensionComposer.compose(merged(vec![
            in_module(decl("User", TypeKind::Class, &[], &["name"]), "Core"),
            in_module(decl("User", TypeKind::Extension, &["Codable"], &[]), "App"),
        ]));
        assert_eq!(model.types.len(), 1);
        assert_eq!(model.types[0].module.as_deref(), Some("Core"));
        assert_eq!(model.types[0].inherits, vec!["Codable"]);
    }

    #[test]
    fn ambiguous_extension_stays_standalone() {
        let model = ExtensionComposer.compose(merged(vec![
            in_module(decl("User", TypeKind::Struct, &[], &[]), "App"),
            in_module(decl("User", TypeKind::Class, &[], &[]), "Core"),
            in_module(decl("User", TypeKind::Extension, &["Codable"], &[]), "Tests"),
        ]));
        assert_eq!(model.types.len(), 3);
        assert!(model.types.iter().any(|t| t.is_extension()));
    }

    #[test]
    fn supertype_resolves_within_the_module() {
        let model = ExtensionComposer.compose(merged(vec![
            in_module(decl("Base", TypeKind::Protocol, &[], &[]), "App"),
            in_module(decl("Base", TypeKind::Class, &[], &["id"]), "Core"),
            in_module(decl("Leaf", TypeKind::Class, &["Base"], &["leaf"]), "App"),
            in_module(decl("Node", TypeKind::Class, &["Base"], &["node"]), "Core"),
        ]));
        assert!(model.type_named("Leaf").unwrap().supertype.is_none());
        let node = model.type_named("Node").unwrap();
        assert_eq!(node.supertype.as_deref(), Some("Base"));
        let names: Vec<_> = model
            .inherited_variables(node)
            .into_iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, ["node", "id"]);
    }

    #[test]
    fn duplicates_differing_in_kind_or_types_are_order_independent() {
        let mut typed = decl("Token", TypeKind::Struct, &[], &["value"]);
        typed.variables[0].type_name = "String".to_string();
        let forward = vec![
            decl("Token", TypeKind::Class, &[], &["value"]),
            typed,
            decl("Token", TypeKind::Struct, &[], &["value"]),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let one = ExtensionComposer.compose(merged(forward));
        let two = ExtensionComposer.compose(merged(backward));
        assert_eq!(one, two);
        assert_eq!(one.types.len(), 1);
    }
}
