//! Resolved ABI type graph.
//!
//! An [`ABIDefinition`] refers to types by name; resolving it materializes a
//! graph where every reference is an index into an arena of [`TypeNode`]s
//! owned by the [`ABI`]. Edges are plain indices, so nodes can be shared and
//! the graph may contain cycles (a struct referring to itself through an
//! array or an optional); the transcoder bounds its recursion instead of
//! assuming a DAG.

use std::collections::HashMap;

use snafu::ensure;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::{AntelopeType, Name, config};
use crate::abi::definition::{self, ABIDefinition};
use crate::abi::error::*;
use crate::abi::typename::TypeName;

type Result<T, E = ABIError> = core::result::Result<T, E>;


/// Index of a type node inside the [`ABI`] arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub struct FieldNode {
    pub name: String,
    pub type_: TypeId,
}

#[derive(Debug, Clone)]
pub struct StructNode {
    /// Base struct, if any. Its fields are already inlined at the front of
    /// `fields`, the id is kept for exporting back to an `ABIDefinition`.
    pub base: Option<TypeId>,
    /// All fields, base fields first, in declared order.
    pub fields: Vec<FieldNode>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Builtin(AntelopeType),
    /// Flattened: the target is never itself an alias.
    Alias(TypeId),
    Optional(TypeId),
    Array(TypeId),
    Extension(TypeId),
    Struct(StructNode),
    Variant(Vec<FieldNode>),

    // unresolved placeholders, only present while `from_definition` runs
    AliasDef(String),
    StructDef(usize),
    VariantDef(usize),
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    pub name: String,
    pub kind: TypeKind,
}

/// A fully resolved ABI: the type graph plus the action and table bindings.
#[derive(Debug, Clone)]
pub struct ABI {
    nodes: Vec<TypeNode>,
    by_name: HashMap<String, TypeId>,
    action_types: HashMap<Name, String>,
    table_types: HashMap<Name, String>,
}

/// A type reference obtained from a caller-supplied type name.
///
/// Wrapper suffixes (`?`, `[]`, `$`) are legal in queries even when the ABI
/// never declares the wrapped type, so a query may produce wrapper layers
/// that have no node in the arena.
#[derive(Debug)]
pub(crate) enum QueryRef {
    Node(TypeId),
    Optional(Box<QueryRef>),
    Array(Box<QueryRef>),
    Extension(Box<QueryRef>),
}

impl Default for ABI {
    fn default() -> Self {
        Self::new()
    }
}

impl ABI {
    /// An ABI knowing only the built-in types.
    pub fn new() -> Self {
        let mut abi = ABI {
            nodes: vec![],
            by_name: HashMap::new(),
            action_types: HashMap::new(),
            table_types: HashMap::new(),
        };

        for ty in AntelopeType::iter() {
            // `extended_asset` is not a builtin, it is injected as a struct
            // so that it transcodes like any user-defined object
            if ty == AntelopeType::ExtendedAsset { continue; }
            abi.insert_node(ty.to_string(), TypeKind::Builtin(ty));
        }

        let asset = abi.by_name["asset"];
        let name = abi.by_name["name"];
        abi.insert_node("extended_asset".to_owned(), TypeKind::Struct(StructNode {
            base: None,
            fields: vec![
                FieldNode { name: "quantity".to_owned(), type_: asset },
                FieldNode { name: "contract".to_owned(), type_: name },
            ],
        }));

        abi
    }

    // -----------------------------------------------------------------------------
    //     Constructors
    // -----------------------------------------------------------------------------

    pub fn from_definition(def: &ABIDefinition) -> Result<Self> {
        ensure!(def.version.starts_with("eosio::abi/1."),
                VersionSnafu { version: &def.version });

        let mut abi = Self::new();

        abi.action_types.extend(def.actions.iter().map(|a| (a.name, a.type_.clone())));
        abi.table_types.extend(def.tables.iter().map(|t| (t.name, t.type_.clone())));

        // insert placeholders for all user-defined types so that forward and
        // recursive references resolve
        for td in &def.types {
            ensure!(!td.new_type_name.is_empty(), MissingNameSnafu { what: "typedef" });
            abi.insert_placeholder(&td.new_type_name, TypeKind::AliasDef(td.type_.clone()))?;
        }
        for (i, s) in def.structs.iter().enumerate() {
            ensure!(!s.name.is_empty(), MissingNameSnafu { what: "struct" });
            abi.insert_placeholder(&s.name, TypeKind::StructDef(i))?;
        }
        for (i, v) in def.variants.iter().enumerate() {
            ensure!(!v.name.is_empty(), MissingNameSnafu { what: "variant" });
            abi.insert_placeholder(&v.name, TypeKind::VariantDef(i))?;
        }

        // resolve every node; wrapper nodes appended during the loop are
        // created fully resolved so they don't need another visit
        let mut i = 0;
        while i < abi.nodes.len() {
            abi.fill(TypeId(i), def, 0)?;
            i += 1;
        }

        abi.check_integrity()?;

        debug!("resolved ABI with {} type nodes", abi.nodes.len());
        Ok(abi)
    }

    pub fn from_str(abi: &str) -> Result<Self> {
        Self::from_definition(&ABIDefinition::from_str(abi)?)
    }

    pub fn from_hex_abi(abi: &str) -> Result<Self> {
        Self::from_bin_abi(&hex::decode(abi)?)
    }

    pub fn from_bin_abi(abi: &[u8]) -> Result<Self> {
        let mut data = crate::ByteStream::from(abi.to_owned());
        let abi_def = ABIDefinition::from_bin(&mut data)?;
        Self::from_definition(&abi_def)
    }

    // -----------------------------------------------------------------------------
    //     Accessors
    // -----------------------------------------------------------------------------

    pub(crate) fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.0]
    }

    /// The declared payload type for an action, if any.
    pub fn action_type(&self, action: Name) -> Option<&str> {
        self.action_types.get(&action).map(String::as_str)
    }

    /// The declared row type for a table, if any.
    pub fn table_type(&self, table: Name) -> Option<&str> {
        self.table_types.get(&table).map(String::as_str)
    }

    /// Whether `name` denotes a type usable with this ABI (including wrapper
    /// suffixes over known types).
    pub fn is_type(&self, name: &str) -> bool {
        self.resolve_query(name, 0).is_ok()
    }

    // -----------------------------------------------------------------------------
    //     Resolution
    // -----------------------------------------------------------------------------

    fn insert_node(&mut self, name: String, kind: TypeKind) -> TypeId {
        let id = TypeId(self.nodes.len());
        self.by_name.insert(name.clone(), id);
        self.nodes.push(TypeNode { name, kind });
        id
    }

    fn insert_placeholder(&mut self, name: &str, kind: TypeKind) -> Result<()> {
        ensure!(!self.by_name.contains_key(name), RedefinedTypeSnafu { name });
        self.insert_node(name.to_owned(), kind);
        Ok(())
    }

    /// Follow an alias edge; alias targets are terminal by construction.
    fn dealias(&self, id: TypeId) -> TypeId {
        match self.nodes[id.0].kind {
            TypeKind::Alias(target) => target,
            _ => id,
        }
    }

    fn is_wrapper(&self, id: TypeId) -> bool {
        matches!(self.nodes[id.0].kind,
                 TypeKind::Optional(_) | TypeKind::Array(_) | TypeKind::Extension(_))
    }

    /// Look `name` up in the graph, materializing wrapper types (`?`, `[]`,
    /// `$`) on demand and splicing aliases to their terminal target.
    fn get_type(&mut self, name: &str, def: &ABIDefinition, depth: usize) -> Result<TypeId> {
        ensure!(depth < config::MAX_RESOLVE_DEPTH, RecursionLimitReachedSnafu);

        if let Some(&id) = self.by_name.get(name) {
            return match &self.nodes[id.0].kind {
                TypeKind::Alias(target) => Ok(*target),
                TypeKind::AliasDef(target) => {
                    let target = target.clone();
                    let t = self.resolve_alias(name, &target, def, depth)?;
                    self.nodes[id.0].kind = TypeKind::Alias(t);
                    Ok(t)
                },
                _ => Ok(id),
            };
        }

        let tn = TypeName(name);
        if tn.is_optional() {
            let inner = self.get_type(tn.fundamental_type().0, def, depth + 1)?;
            ensure!(!self.is_wrapper(inner), InvalidNestingSnafu { name });
            Ok(self.insert_node(name.to_owned(), TypeKind::Optional(inner)))
        }
        else if tn.is_array() {
            let inner = self.get_type(tn.fundamental_type().0, def, depth + 1)?;
            ensure!(!self.is_wrapper(inner), InvalidNestingSnafu { name });
            Ok(self.insert_node(name.to_owned(), TypeKind::Array(inner)))
        }
        else if tn.has_bin_extension() {
            let inner = self.get_type(tn.fundamental_type().0, def, depth + 1)?;
            ensure!(!matches!(self.nodes[inner.0].kind, TypeKind::Extension(_)),
                    InvalidNestingSnafu { name });
            Ok(self.insert_node(name.to_owned(), TypeKind::Extension(inner)))
        }
        else {
            UnknownTypeSnafu { name }.fail()
        }
    }

    fn resolve_alias(&mut self, name: &str, target: &str, def: &ABIDefinition, depth: usize)
                     -> Result<TypeId> {
        let t = self.get_type(target, def, depth + 1)?;
        ensure!(!matches!(self.nodes[t.0].kind, TypeKind::Extension(_)),
                ExtensionTypedefSnafu { name });
        Ok(t)
    }

    fn resolve_struct(&mut self, s: &definition::Struct, def: &ABIDefinition, depth: usize)
                      -> Result<StructNode> {
        ensure!(depth < config::MAX_RESOLVE_DEPTH, RecursionLimitReachedSnafu);

        let mut base = None;
        let mut fields = vec![];

        if !s.base.is_empty() {
            let b = self.get_type(&s.base, def, depth + 1)?;

            // the base may still be an unresolved placeholder, resolve it
            // eagerly so its fields can be inlined
            if let TypeKind::StructDef(i) = self.nodes[b.0].kind {
                let resolved = self.resolve_struct(&def.structs[i], def, depth + 1)?;
                self.nodes[b.0].kind = TypeKind::Struct(resolved);
            }

            match &self.nodes[b.0].kind {
                TypeKind::Struct(base_node) => fields = base_node.fields.clone(),
                _ => return BaseNotAStructSnafu { name: &s.name, base: &s.base }.fail(),
            }
            base = Some(b);
        }

        for field in &s.fields {
            let t = self.get_type(&field.type_, def, depth + 1)?;
            fields.push(FieldNode { name: field.name.clone(), type_: t });
        }

        Ok(StructNode { base, fields })
    }

    fn resolve_variant(&mut self, v: &definition::Variant, def: &ABIDefinition, depth: usize)
                       -> Result<Vec<FieldNode>> {
        ensure!(depth < config::MAX_RESOLVE_DEPTH, RecursionLimitReachedSnafu);

        let mut cases = vec![];
        for typename in &v.types {
            let t = self.get_type(typename, def, depth + 1)?;
            cases.push(FieldNode { name: typename.clone(), type_: t });
        }
        Ok(cases)
    }

    fn fill(&mut self, id: TypeId, def: &ABIDefinition, depth: usize) -> Result<()> {
        match &self.nodes[id.0].kind {
            TypeKind::AliasDef(target) => {
                let target = target.clone();
                let name = self.nodes[id.0].name.clone();
                let t = self.resolve_alias(&name, &target, def, depth)?;
                self.nodes[id.0].kind = TypeKind::Alias(t);
            },
            TypeKind::StructDef(i) => {
                let s = self.resolve_struct(&def.structs[*i], def, depth)?;
                self.nodes[id.0].kind = TypeKind::Struct(s);
            },
            TypeKind::VariantDef(i) => {
                let v = self.resolve_variant(&def.variants[*i], def, depth)?;
                self.nodes[id.0].kind = TypeKind::Variant(v);
            },
            _ => {},
        }
        Ok(())
    }

    /// Post-resolution invariants that `fill` cannot check locally.
    fn check_integrity(&self) -> Result<()> {
        for node in &self.nodes {
            if let TypeKind::Struct(s) = &node.kind {
                // binary extension fields must form a trailing suffix
                let mut seen_extension = false;
                for field in &s.fields {
                    let is_ext = matches!(self.nodes[field.type_.0].kind, TypeKind::Extension(_));
                    if seen_extension && !is_ext {
                        return BadAbiSnafu { message: format!(
                            r#"non-extension field "{}" follows a binary extension in struct "{}""#,
                            field.name, node.name) }.fail();
                    }
                    seen_extension |= is_ext;
                }
            }

            // duplicate case names make the JSON form of a variant ambiguous
            if let TypeKind::Variant(cases) = &node.kind {
                for (i, case) in cases.iter().enumerate() {
                    if cases[..i].iter().any(|c| c.name == case.name) {
                        return BadAbiSnafu { message: format!(
                            r#"duplicate case "{}" in variant "{}""#, case.name, node.name) }.fail();
                    }
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------------
    //     Query-time type lookup
    // -----------------------------------------------------------------------------

    fn query_is_wrapper(&self, q: &QueryRef) -> bool {
        match q {
            QueryRef::Node(id) => self.is_wrapper(*id),
            _ => true,
        }
    }

    fn query_is_extension(&self, q: &QueryRef) -> bool {
        match q {
            QueryRef::Node(id) => matches!(self.nodes[id.0].kind, TypeKind::Extension(_)),
            QueryRef::Extension(_) => true,
            _ => false,
        }
    }

    /// Resolve a caller-supplied type name without mutating the graph.
    ///
    /// Names already in the graph resolve to their node; wrapper suffixes
    /// over known types produce transient wrapper layers following the same
    /// nesting rules as `get_type`.
    pub(crate) fn resolve_query(&self, name: &str, depth: usize) -> Result<QueryRef> {
        ensure!(depth < config::MAX_RESOLVE_DEPTH, RecursionLimitReachedSnafu);

        if let Some(&id) = self.by_name.get(name) {
            return Ok(QueryRef::Node(self.dealias(id)));
        }

        let tn = TypeName(name);
        if tn.is_optional() {
            let inner = self.resolve_query(tn.fundamental_type().0, depth + 1)?;
            ensure!(!self.query_is_wrapper(&inner), InvalidNestingSnafu { name });
            Ok(QueryRef::Optional(Box::new(inner)))
        }
        else if tn.is_array() {
            let inner = self.resolve_query(tn.fundamental_type().0, depth + 1)?;
            ensure!(!self.query_is_wrapper(&inner), InvalidNestingSnafu { name });
            Ok(QueryRef::Array(Box::new(inner)))
        }
        else if tn.has_bin_extension() {
            let inner = self.resolve_query(tn.fundamental_type().0, depth + 1)?;
            ensure!(!self.query_is_extension(&inner), InvalidNestingSnafu { name });
            Ok(QueryRef::Extension(Box::new(inner)))
        }
        else {
            UnknownTypeSnafu { name }.fail()
        }
    }

    // -----------------------------------------------------------------------------
    //     Export back to an ABIDefinition
    // -----------------------------------------------------------------------------

    /// Export the graph back into an [`ABIDefinition`].
    ///
    /// Builtins, wrapper nodes and the injected `extended_asset` struct are
    /// omitted; struct bases are un-inlined.
    pub fn to_definition(&self) -> ABIDefinition {
        let mut def = ABIDefinition {
            version: "eosio::abi/1.1".to_owned(),
            ..Default::default()
        };

        for node in &self.nodes {
            match &node.kind {
                TypeKind::Alias(target) => {
                    def.types.push(definition::TypeDef {
                        new_type_name: node.name.clone(),
                        type_: self.nodes[target.0].name.clone(),
                    });
                },
                TypeKind::Struct(s) => {
                    if node.name == "extended_asset" { continue; }
                    let (base, field_offset) = match s.base {
                        Some(b) => {
                            let base_node = &self.nodes[b.0];
                            let nfields = match &base_node.kind {
                                TypeKind::Struct(bs) => bs.fields.len(),
                                _ => 0,
                            };
                            (base_node.name.clone(), nfields)
                        },
                        None => (String::new(), 0),
                    };
                    def.structs.push(definition::Struct {
                        name: node.name.clone(),
                        base,
                        fields: s.fields[field_offset..].iter().map(|f| definition::Field {
                            name: f.name.clone(),
                            type_: self.nodes[f.type_.0].name.clone(),
                        }).collect(),
                    });
                },
                TypeKind::Variant(cases) => {
                    def.variants.push(definition::Variant {
                        name: node.name.clone(),
                        types: cases.iter().map(|c| self.nodes[c.type_.0].name.clone()).collect(),
                    });
                },
                _ => {},
            }
        }

        def.actions.extend(self.action_types.iter().map(|(name, type_)| definition::Action {
            name: *name,
            type_: type_.clone(),
            ricardian_contract: String::new(),
        }));
        def.tables.extend(self.table_types.iter().map(|(name, type_)| definition::Table {
            name: *name,
            type_: type_.clone(),
            index_type: String::new(),
            key_names: vec![],
            key_types: vec![],
        }));

        def
    }
}


// =============================================================================
//
//     Unittests
//
// =============================================================================
