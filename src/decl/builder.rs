use super::{
    Access, ConformanceSite, ConstructorDecl, Decl, DeclArena, DeclId, DeclKind,
    DeclaredConformance, EnumCaseDecl, FnParam, FuncDecl, GenericParam, GenericRequirement,
    Introducer, Literal, NominalDecl, NominalKind, ParamDecl, Storage, Ty, TypeAliasDecl,
    VarDecl,
};
use crate::diagnostics::{FileId, Span};

/// Description of a property added through [`TypeBuilder::field`].
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    ty: Ty,
    introducer: Introducer,
    initial: Option<Literal>,
    storage: Storage,
    is_static: bool,
    wrapper: Option<Ty>,
    span: Option<Span>,
    type_span: Option<Span>,
    introducer_span: Option<Span>,
}

impl Field {
    #[must_use]
    pub fn var(name: &str, ty: Ty) -> Self {
        Self::new(name, ty, Introducer::Var)
    }

    #[must_use]
    pub fn constant(name: &str, ty: Ty) -> Self {
        Self::new(name, ty, Introducer::Let)
    }

    fn new(name: &str, ty: Ty, introducer: Introducer) -> Self {
        Self {
            name: name.to_string(),
            ty,
            introducer,
            initial: None,
            storage: Storage::Stored,
            is_static: false,
            wrapper: None,
            span: None,
            type_span: None,
            introducer_span: None,
        }
    }

    #[must_use]
    pub fn initial(mut self, value: Literal) -> Self {
        self.initial = Some(value);
        self
    }

    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.storage = Storage::Lazy;
        self
    }

    #[must_use]
    pub fn computed(mut self) -> Self {
        self.storage = Storage::Computed;
        self
    }

    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Attach a property wrapper whose backing store has type `wrapper`.
    #[must_use]
    pub fn wrapped_by(mut self, wrapper: Ty) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    #[must_use]
    pub fn type_span(mut self, span: Span) -> Self {
        self.type_span = Some(span);
        self
    }

    #[must_use]
    pub fn introducer_span(mut self, span: Span) -> Self {
        self.introducer_span = Some(span);
        self
    }
}

/// Enum case payload parameter.
#[derive(Clone, Debug)]
pub struct CaseParam {
    label: Option<String>,
    ty: Ty,
    default: Option<Literal>,
    span: Option<Span>,
}

impl CaseParam {
    #[must_use]
    pub fn labeled(label: &str, ty: Ty) -> Self {
        Self {
            label: Some(label.to_string()),
            ty,
            default: None,
            span: None,
        }
    }

    #[must_use]
    pub fn unnamed(ty: Ty) -> Self {
        Self {
            label: None,
            ty,
            default: None,
            span: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: Literal) -> Self {
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl From<CaseParam> for ParamDecl {
    fn from(param: CaseParam) -> Self {
        ParamDecl {
            label: param.label,
            ty: param.ty,
            default: param.default,
            span: param.span,
        }
    }
}

/// User-written initializer description.
#[derive(Clone, Debug)]
pub struct Init {
    params: Vec<FnParam>,
    failable: bool,
    throws: bool,
    designated: bool,
    required: bool,
    access: Access,
    span: Option<Span>,
}

impl Init {
    /// `init()`
    #[must_use]
    pub fn empty() -> Self {
        Self::with_params(Vec::new())
    }

    /// `init(from decoder: Decoder) throws`
    #[must_use]
    pub fn from_decoder() -> Self {
        let mut init = Self::with_params(vec![FnParam::new(
            Some("from"),
            "decoder",
            Ty::named("Decoder"),
        )]);
        init.throws = true;
        init
    }

    #[must_use]
    pub fn with_params(params: Vec<FnParam>) -> Self {
        Self {
            params,
            failable: false,
            throws: false,
            designated: true,
            required: false,
            access: Access::Internal,
            span: None,
        }
    }

    #[must_use]
    pub fn failable(mut self) -> Self {
        self.failable = true;
        self
    }

    #[must_use]
    pub fn throwing(mut self) -> Self {
        self.throws = true;
        self
    }

    #[must_use]
    pub fn convenience(mut self) -> Self {
        self.designated = false;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    #[must_use]
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl DeclArena {
    pub fn struct_type(&mut self, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, name, NominalKind::Struct)
    }

    pub fn class_type(&mut self, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, name, NominalKind::Class)
    }

    pub fn enum_type(&mut self, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, name, NominalKind::Enum)
    }

    pub fn protocol_type(&mut self, name: &str) -> TypeBuilder<'_> {
        TypeBuilder::new(self, name, NominalKind::Protocol)
    }
}

/// Fluent construction of a nominal type and its members.
pub struct TypeBuilder<'arena> {
    arena: &'arena mut DeclArena,
    id: DeclId,
}

impl<'arena> TypeBuilder<'arena> {
    fn new(arena: &'arena mut DeclArena, name: &str, kind: NominalKind) -> Self {
        let id = arena.alloc(Decl::new(name, DeclKind::Nominal(NominalDecl::new(kind))));
        Self { arena, id }
    }

    #[must_use]
    pub fn id(&self) -> DeclId {
        self.id
    }

    #[must_use]
    pub fn span(self, span: Span) -> Self {
        let decl = self.arena.get_mut(self.id);
        decl.span = Some(span);
        if span.file_id != FileId::UNKNOWN {
            if let DeclKind::Nominal(nominal) = &mut decl.kind {
                nominal.file = span.file_id;
            }
        }
        self
    }

    #[must_use]
    pub fn access(self, access: Access) -> Self {
        self.arena.get_mut(self.id).access = access;
        self
    }

    #[must_use]
    pub fn file(mut self, file: FileId) -> Self {
        self.nominal_mut().file = file;
        self
    }

    #[must_use]
    pub fn mark_final(mut self) -> Self {
        self.nominal_mut().is_final = true;
        self
    }

    #[must_use]
    pub fn generic_param(mut self, name: &str, bounds: &[&str]) -> Self {
        self.nominal_mut().generic_params.push(GenericParam {
            name: name.to_string(),
            bounds: bounds.iter().map(|bound| bound.to_string()).collect(),
        });
        self
    }

    #[must_use]
    pub fn superclass(mut self, ty: Ty) -> Self {
        self.nominal_mut().superclass = Some(ty);
        self
    }

    #[must_use]
    pub fn conforms_to(self, protocol: &str) -> Self {
        self.conformance(DeclaredConformance {
            protocol: protocol.to_string(),
            requirements: Vec::new(),
            site: ConformanceSite::TypeBody,
            span: None,
        })
    }

    /// Conditional conformance: `extension T: P where A: Q` in the same file.
    #[must_use]
    pub fn conforms_to_where(self, protocol: &str, requirements: &[(&str, &str)]) -> Self {
        let requirements = requirements
            .iter()
            .map(|(param, protocol)| GenericRequirement {
                param: param.to_string(),
                protocol: protocol.to_string(),
            })
            .collect();
        self.conformance(DeclaredConformance {
            protocol: protocol.to_string(),
            requirements,
            site: ConformanceSite::TypeBody,
            span: None,
        })
    }

    #[must_use]
    pub fn conforms_in_extension(self, protocol: &str, file: FileId) -> Self {
        self.conformance(DeclaredConformance {
            protocol: protocol.to_string(),
            requirements: Vec::new(),
            site: ConformanceSite::Extension { file },
            span: None,
        })
    }

    #[must_use]
    pub fn conformance(mut self, conformance: DeclaredConformance) -> Self {
        self.nominal_mut().conformances.push(conformance);
        self
    }

    #[must_use]
    pub fn stored(self, name: &str, ty: Ty) -> Self {
        self.field(Field::var(name, ty))
    }

    #[must_use]
    pub fn field(self, field: Field) -> Self {
        let Field {
            name,
            ty,
            introducer,
            initial,
            storage,
            is_static,
            wrapper,
            span,
            type_span,
            introducer_span,
        } = field;
        let mut var = VarDecl::new(introducer, ty);
        var.type_span = type_span;
        var.introducer_span = introducer_span;
        var.is_static = is_static;
        var.storage = storage;
        match wrapper {
            None => {
                var.initial_value = initial;
                self.arena
                    .add_member(self.id, Decl::new(name, DeclKind::Var(var)).with_span(span));
            }
            Some(wrapper_ty) => {
                var.storage = Storage::Computed;
                let original = self.arena.add_member(
                    self.id,
                    Decl::new(name.clone(), DeclKind::Var(var)).with_span(span),
                );
                let mut backing = VarDecl::new(Introducer::Var, wrapper_ty);
                backing.is_static = is_static;
                backing.initial_value = initial;
                backing.wrapped_original = Some(original);
                let backing = self.arena.add_member(
                    self.id,
                    Decl::new(format!("_{name}"), DeclKind::Var(backing))
                        .with_span(span)
                        .with_access(Access::Private)
                        .implicit(),
                );
                if let DeclKind::Var(var) = &mut self.arena.get_mut(original).kind {
                    var.wrapper_backing = Some(backing);
                }
            }
        }
        self
    }

    #[must_use]
    pub fn case(self, name: &str) -> Self {
        self.case_decl(name, Vec::new(), None)
    }

    #[must_use]
    pub fn case_with(self, name: &str, params: Vec<CaseParam>) -> Self {
        self.case_decl(name, params, None)
    }

    #[must_use]
    pub fn case_decl(self, name: &str, params: Vec<CaseParam>, span: Option<Span>) -> Self {
        let case = EnumCaseDecl {
            params: params.into_iter().map(ParamDecl::from).collect(),
        };
        self.arena
            .add_member(self.id, Decl::new(name, DeclKind::EnumCase(case)).with_span(span));
        self
    }

    /// Nested user-written `enum <name>: CodingKey` with the given cases.
    #[must_use]
    pub fn keys_enum(self, name: &str, cases: &[&str]) -> Self {
        let spanned: Vec<(&str, Option<Span>)> = cases.iter().map(|case| (*case, None)).collect();
        self.keys_enum_spanned(name, &spanned)
    }

    #[must_use]
    pub fn keys_enum_spanned(self, name: &str, cases: &[(&str, Option<Span>)]) -> Self {
        let mut keys = NominalDecl::new(NominalKind::Enum);
        keys.conformances.push(DeclaredConformance {
            protocol: "CodingKey".into(),
            requirements: Vec::new(),
            site: ConformanceSite::TypeBody,
            span: None,
        });
        let keys = self
            .arena
            .add_member(self.id, Decl::new(name, DeclKind::Nominal(keys)));
        for (case, span) in cases {
            self.arena.add_member(
                keys,
                Decl::new(*case, DeclKind::EnumCase(EnumCaseDecl::default())).with_span(*span),
            );
        }
        self
    }

    /// Nested type that is not a coding-key enumeration.
    #[must_use]
    pub fn nested(self, name: &str, kind: NominalKind, span: Option<Span>) -> Self {
        self.arena.add_member(
            self.id,
            Decl::new(name, DeclKind::Nominal(NominalDecl::new(kind))).with_span(span),
        );
        self
    }

    #[must_use]
    pub fn type_alias(self, name: &str, target: Ty) -> Self {
        self.arena.add_member(
            self.id,
            Decl::new(name, DeclKind::TypeAlias(TypeAliasDecl { target })),
        );
        self
    }

    #[must_use]
    pub fn constructor(self, init: Init) -> Self {
        let Init {
            params,
            failable,
            throws,
            designated,
            required,
            access,
            span,
        } = init;
        let ctor = ConstructorDecl {
            params,
            failable,
            throws,
            designated,
            required,
            body: None,
        };
        self.arena.add_member(
            self.id,
            Decl::new("init", DeclKind::Constructor(ctor))
                .with_access(access)
                .with_span(span),
        );
        self
    }

    /// User-written method with an opaque body.
    #[must_use]
    pub fn method(self, name: &str, params: Vec<FnParam>, throws: bool) -> Self {
        let func = FuncDecl {
            params,
            throws,
            is_override: false,
            body: None,
        };
        self.arena
            .add_member(self.id, Decl::new(name, DeclKind::Func(func)));
        self
    }

    pub fn finish(self) -> DeclId {
        self.id
    }

    fn nominal_mut(&mut self) -> &mut NominalDecl {
        match &mut self.arena.get_mut(self.id).kind {
            DeclKind::Nominal(nominal) => nominal,
            _ => unreachable!("type builders only allocate nominal declarations"),
        }
    }
}
