//! Append-only declaration arena that derivation reads and extends.
//!
//! Declarations are owned by the [`DeclArena`] and referred to by [`DeclId`].
//! New members are inserted through [`DeclArena::add_member`], which returns
//! the handle of the inserted declaration; nothing is ever removed.

mod builder;
mod types;


pub use builder::{CaseParam, Field, Init, TypeBuilder};
pub use types::{Literal, Ty, TyDisplay};

use std::collections::HashMap;

use crate::body::LazyBody;
use crate::diagnostics::{FileId, Span};

/// Identifier for a declaration stored in the [`DeclArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Access {
    Private,
    FilePrivate,
    Internal,
    Public,
    Open,
}

impl Access {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Access::Private => "private",
            Access::FilePrivate => "fileprivate",
            Access::Internal => "internal",
            Access::Public => "public",
            Access::Open => "open",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NominalKind {
    Struct,
    Class,
    Enum,
    Protocol,
}

impl NominalKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NominalKind::Struct => "struct",
            NominalKind::Class => "class",
            NominalKind::Enum => "enum",
            NominalKind::Protocol => "protocol",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericParam {
    pub name: String,
    /// Protocol names the parameter is bounded by.
    pub bounds: Vec<String>,
}

/// `where Param: Protocol` requirement attached to a conditional conformance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericRequirement {
    pub param: String,
    pub protocol: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConformanceSite {
    /// Listed in the inheritance clause of the type declaration.
    TypeBody,
    Extension { file: FileId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredConformance {
    pub protocol: String,
    pub requirements: Vec<GenericRequirement>,
    pub site: ConformanceSite,
    pub span: Option<Span>,
}

#[derive(Clone, Debug)]
pub struct NominalDecl {
    pub kind: NominalKind,
    pub generic_params: Vec<GenericParam>,
    pub superclass: Option<Ty>,
    pub conformances: Vec<DeclaredConformance>,
    pub members: Vec<DeclId>,
    pub is_final: bool,
    /// File holding the primary declaration.
    pub file: FileId,
}

impl NominalDecl {
    #[must_use]
    pub fn new(kind: NominalKind) -> Self {
        Self {
            kind,
            generic_params: Vec::new(),
            superclass: None,
            conformances: Vec::new(),
            members: Vec::new(),
            is_final: false,
            file: FileId::UNKNOWN,
        }
    }
}

/// Payload parameter of an enum case.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamDecl {
    pub label: Option<String>,
    pub ty: Ty,
    pub default: Option<Literal>,
    pub span: Option<Span>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumCaseDecl {
    pub params: Vec<ParamDecl>,
}

impl EnumCaseDecl {
    #[must_use]
    pub fn has_any_unnamed_params(&self) -> bool {
        self.params.iter().any(|param| param.label.is_none())
    }

    #[must_use]
    pub fn param_named(&self, name: &str) -> Option<&ParamDecl> {
        self.params
            .iter()
            .find(|param| param.label.as_deref() == Some(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    Stored,
    Computed,
    Lazy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Introducer {
    Let,
    Var,
}

#[derive(Clone, Debug)]
pub struct VarDecl {
    pub ty: Ty,
    pub type_span: Option<Span>,
    pub introducer: Introducer,
    /// Location of the `let`/`var` keyword.
    pub introducer_span: Option<Span>,
    pub is_static: bool,
    pub storage: Storage,
    pub initial_value: Option<Literal>,
    /// Backing storage of a property with an attached wrapper.
    pub wrapper_backing: Option<DeclId>,
    /// For a wrapper backing store, the property it was generated for.
    pub wrapped_original: Option<DeclId>,
}

impl VarDecl {
    #[must_use]
    pub fn new(introducer: Introducer, ty: Ty) -> Self {
        Self {
            ty,
            type_span: None,
            introducer,
            introducer_span: None,
            is_static: false,
            storage: Storage::Stored,
            initial_value: None,
            wrapper_backing: None,
            wrapped_original: None,
        }
    }

    #[must_use]
    pub fn is_let(&self) -> bool {
        self.introducer == Introducer::Let
    }

    /// Lazy storage and computed properties are invisible to coding.
    #[must_use]
    pub fn is_user_accessible(&self) -> bool {
        self.storage == Storage::Stored
    }

    #[must_use]
    pub fn is_parent_initialized(&self) -> bool {
        self.initial_value.is_some()
    }

    /// Whether the property gets a value without being decoded: an explicit
    /// initial value, or an implicit `nil` for an optional `var`.
    #[must_use]
    pub fn is_default_initializable(&self) -> bool {
        self.is_parent_initialized() || (!self.is_let() && self.ty.is_optional())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAliasDecl {
    pub target: Ty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FnParam {
    pub label: Option<String>,
    pub name: String,
    pub ty: Ty,
}

impl FnParam {
    #[must_use]
    pub fn new(label: Option<&str>, name: &str, ty: Ty) -> Self {
        Self {
            label: label.map(str::to_string),
            name: name.to_string(),
            ty,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub params: Vec<FnParam>,
    pub throws: bool,
    pub is_override: bool,
    /// `None` for user-written bodies, which are opaque to this crate.
    pub body: Option<LazyBody>,
}

#[derive(Clone, Debug)]
pub struct ConstructorDecl {
    pub params: Vec<FnParam>,
    pub failable: bool,
    pub throws: bool,
    pub designated: bool,
    pub required: bool,
    pub body: Option<LazyBody>,
}

impl ConstructorDecl {
    #[must_use]
    pub fn labels(&self) -> Vec<Option<&str>> {
        self.params.iter().map(|param| param.label.as_deref()).collect()
    }
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Nominal(NominalDecl),
    EnumCase(EnumCaseDecl),
    Var(VarDecl),
    TypeAlias(TypeAliasDecl),
    Func(FuncDecl),
    Constructor(ConstructorDecl),
}

#[derive(Clone, Debug)]
pub struct Decl {
    pub name: String,
    pub span: Option<Span>,
    pub parent: Option<DeclId>,
    pub access: Access,
    /// Compiler-generated rather than user-written.
    pub is_implicit: bool,
    pub kind: DeclKind,
}

impl Decl {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            span: None,
            parent: None,
            access: Access::Internal,
            is_implicit: false,
            kind,
        }
    }

    #[must_use]
    pub fn implicit(mut self) -> Self {
        self.is_implicit = true;
        self
    }

    #[must_use]
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Option<Span>) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn as_nominal(&self) -> Option<&NominalDecl> {
        match &self.kind {
            DeclKind::Nominal(nominal) => Some(nominal),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_var(&self) -> Option<&VarDecl> {
        match &self.kind {
            DeclKind::Var(var) => Some(var),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_case(&self) -> Option<&EnumCaseDecl> {
        match &self.kind {
            DeclKind::EnumCase(case) => Some(case),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_type_alias(&self) -> Option<&TypeAliasDecl> {
        match &self.kind {
            DeclKind::TypeAlias(alias) => Some(alias),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_func(&self) -> Option<&FuncDecl> {
        match &self.kind {
            DeclKind::Func(func) => Some(func),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_constructor(&self) -> Option<&ConstructorDecl> {
        match &self.kind {
            DeclKind::Constructor(ctor) => Some(ctor),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_nominal_kind(&self, kind: NominalKind) -> bool {
        self.as_nominal().is_some_and(|nominal| nominal.kind == kind)
    }

    /// Compound name such as `encode(to:)` or `init(from:)` for functions and
    /// initializers; the plain name otherwise.
    #[must_use]
    pub fn full_name(&self) -> String {
        let params = match &self.kind {
            DeclKind::Func(func) => &func.params,
            DeclKind::Constructor(ctor) => &ctor.params,
            _ => return self.name.clone(),
        };
        let labels: String = params
            .iter()
            .map(|param| format!("{}:", param.label.as_deref().unwrap_or("_")))
            .collect();
        format!("{}({labels})", self.name)
    }
}

#[derive(Debug, Default, Clone)]
pub struct DeclArena {
    decls: Vec<Decl>,
}

impl DeclArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a top-level declaration.
    pub fn alloc(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len());
        self.decls.push(decl);
        id
    }

    /// Store `decl` and append it to the member list of `parent`.
    pub fn add_member(&mut self, parent: DeclId, mut decl: Decl) -> DeclId {
        decl.parent = Some(parent);
        let id = self.alloc(decl);
        if let DeclKind::Nominal(nominal) = &mut self.get_mut(parent).kind {
            nominal.members.push(id);
        }
        id
    }

    /// Panics when `id` was not produced by this arena.
    #[must_use]
    pub fn get(&self, id: DeclId) -> &Decl {
        &self.decls[id.0]
    }

    #[must_use]
    pub fn get_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.0]
    }

    #[must_use]
    pub fn try_get(&self, id: DeclId) -> Option<&Decl> {
        self.decls.get(id.0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(index, decl)| (DeclId(index), decl))
    }

    #[must_use]
    pub fn nominal(&self, id: DeclId) -> Option<&NominalDecl> {
        self.try_get(id).and_then(Decl::as_nominal)
    }

    #[must_use]
    pub fn members(&self, id: DeclId) -> &[DeclId] {
        self.nominal(id)
            .map(|nominal| nominal.members.as_slice())
            .unwrap_or_default()
    }

    /// Direct members named `name`, in declaration order.
    #[must_use]
    pub fn lookup_direct(&self, nominal: DeclId, name: &str) -> Vec<DeclId> {
        self.members(nominal)
            .iter()
            .copied()
            .filter(|member| self.get(*member).name == name)
            .collect()
    }

    /// Instance variables that occupy storage, including lazy storage and
    /// property-wrapper backing stores.
    #[must_use]
    pub fn stored_properties(&self, nominal: DeclId) -> Vec<DeclId> {
        self.members(nominal)
            .iter()
            .copied()
            .filter(|member| {
                self.get(*member).as_var().is_some_and(|var| {
                    !var.is_static && matches!(var.storage, Storage::Stored | Storage::Lazy)
                })
            })
            .collect()
    }

    #[must_use]
    pub fn cases(&self, nominal: DeclId) -> Vec<DeclId> {
        self.members(nominal)
            .iter()
            .copied()
            .filter(|member| self.get(*member).as_case().is_some())
            .collect()
    }

    #[must_use]
    pub fn enum_case_named(&self, enum_decl: DeclId, name: &str) -> Option<DeclId> {
        self.lookup_direct(enum_decl, name)
            .into_iter()
            .find(|member| self.get(*member).as_case().is_some())
    }

    #[must_use]
    pub fn superclass_decl(&self, class: DeclId) -> Option<DeclId> {
        self.nominal(class)?
            .superclass
            .as_ref()
            .and_then(|ty| self.resolve_ty_decl(ty))
    }

    /// Follow type aliases from `id` to the nominal type they name.
    #[must_use]
    pub fn resolve_type_decl(&self, id: DeclId) -> Option<DeclId> {
        let mut current = id;
        // Alias chains are short; the bound guards against cycles.
        for _ in 0..=self.decls.len() {
            let decl = self.try_get(current)?;
            match &decl.kind {
                DeclKind::Nominal(_) => return Some(current),
                DeclKind::TypeAlias(alias) => current = alias.target.nominal_decl()?,
                _ => return None,
            }
        }
        None
    }

    #[must_use]
    pub fn resolve_ty_decl(&self, ty: &Ty) -> Option<DeclId> {
        ty.nominal_decl()
            .and_then(|decl| self.resolve_type_decl(decl))
    }

    /// The type of `self` inside `nominal`: generic parameters stay abstract.
    #[must_use]
    pub fn declared_type(&self, nominal: DeclId) -> Ty {
        let args = self
            .nominal(nominal)
            .map(|decl| {
                decl.generic_params
                    .iter()
                    .map(|param| Ty::param(param.name.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Ty::generic(nominal, args)
    }

    /// Bindings from the generic parameters of the nominal type `ty` names to
    /// its generic arguments.
    #[must_use]
    pub fn generic_bindings(&self, ty: &Ty) -> HashMap<String, Ty> {
        let Ty::Nominal { decl, args } = ty else {
            return HashMap::new();
        };
        let Some(nominal) = self.nominal(*decl) else {
            return HashMap::new();
        };
        nominal
            .generic_params
            .iter()
            .zip(args)
            .map(|(param, arg)| (param.name.clone(), arg.clone()))
            .collect()
    }

    /// Initializers of `nominal` whose argument labels match `labels`.
    #[must_use]
    pub fn constructors_with_labels(&self, nominal: DeclId, labels: &[Option<&str>]) -> Vec<DeclId> {
        self.members(nominal)
            .iter()
            .copied()
            .filter(|member| {
                self.get(*member)
                    .as_constructor()
                    .is_some_and(|ctor| ctor.labels() == labels)
            })
            .collect()
    }

    /// Name of a type for diagnostics and printed bodies.
    #[must_use]
    pub fn type_name(&self, ty: &Ty) -> String {
        ty.display(self).to_string()
    }

    /// The file a declaration lives in, taken from its span or its enclosing type.
    #[must_use]
    pub fn file_of(&self, id: DeclId) -> FileId {
        let decl = self.get(id);
        if let Some(nominal) = decl.as_nominal() {
            if nominal.file != FileId::UNKNOWN {
                return nominal.file;
            }
        }
        if let Some(span) = decl.span {
            if span.file_id != FileId::UNKNOWN {
                return span.file_id;
            }
        }
        decl.parent
            .map(|parent| self.file_of(parent))
            .unwrap_or(FileId::UNKNOWN)
    }
}
