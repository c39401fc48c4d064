//! Protocol conformance queries used by derivation.


use std::collections::HashMap;
use std::fmt;

use crate::decl::{DeclArena, DeclId, DeclKind, GenericRequirement, Ty};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KnownProtocol {
    Encodable,
    Decodable,
    CodingKey,
}

impl KnownProtocol {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            KnownProtocol::Encodable => "Encodable",
            KnownProtocol::Decodable => "Decodable",
            KnownProtocol::CodingKey => "CodingKey",
        }
    }

    /// Protocols implied by a protocol name as written in source. `Codable`
    /// is the composition of `Encodable` and `Decodable`.
    #[must_use]
    pub fn expand(name: &str) -> &'static [KnownProtocol] {
        match name {
            "Encodable" => &[KnownProtocol::Encodable],
            "Decodable" => &[KnownProtocol::Decodable],
            "Codable" => &[KnownProtocol::Encodable, KnownProtocol::Decodable],
            "CodingKey" => &[KnownProtocol::CodingKey],
            _ => &[],
        }
    }

    /// Whether a conformance written as `name` provides `self`.
    #[must_use]
    pub fn is_provided_by(self, name: &str) -> bool {
        Self::expand(name).contains(&self)
    }
}

impl fmt::Display for KnownProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generic requirements in force inside a conformance: the bounds declared on
/// the type's generic parameters plus the conformance's own `where` clause.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenericContext {
    requirements: Vec<GenericRequirement>,
}

impl GenericContext {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Context for `nominal`'s conformance to `protocol`.
    #[must_use]
    pub fn for_conformance(arena: &DeclArena, nominal: DeclId, protocol: KnownProtocol) -> Self {
        let Some(decl) = arena.nominal(nominal) else {
            return Self::default();
        };
        let mut requirements: Vec<GenericRequirement> = decl
            .generic_params
            .iter()
            .flat_map(|param| {
                param.bounds.iter().map(|bound| GenericRequirement {
                    param: param.name.clone(),
                    protocol: bound.clone(),
                })
            })
            .collect();
        if let Some(conformance) = decl
            .conformances
            .iter()
            .find(|conformance| protocol.is_provided_by(&conformance.protocol))
        {
            requirements.extend(conformance.requirements.iter().cloned());
        }
        Self { requirements }
    }

    #[must_use]
    pub fn with_requirement(mut self, param: &str, protocol: &str) -> Self {
        self.requirements.push(GenericRequirement {
            param: param.to_string(),
            protocol: protocol.to_string(),
        });
        self
    }

    #[must_use]
    pub fn param_conforms(&self, param: &str, protocol: KnownProtocol) -> bool {
        self.requirements
            .iter()
            .any(|req| req.param == param && protocol.is_provided_by(&req.protocol))
    }

    #[must_use]
    pub fn requirements(&self) -> &[GenericRequirement] {
        &self.requirements
    }
}

/// Answers "does type T conform to protocol P in context C".
pub trait ConformanceOracle {
    fn conforms_to(
        &self,
        arena: &DeclArena,
        ty: &Ty,
        protocol: KnownProtocol,
        context: &GenericContext,
    ) -> bool;
}

/// Default oracle: a table of named library types plus structural and
/// declaration-driven rules.
#[derive(Clone, Debug)]
pub struct ConformanceTable {
    named: HashMap<String, Vec<KnownProtocol>>,
}

const STANDARD_CODABLE_TYPES: &[&str] = &[
    "Int", "Int8", "Int16", "Int32", "Int64", "UInt", "UInt8", "UInt16", "UInt32", "UInt64",
    "Float", "Double", "Bool", "String",
];

impl ConformanceTable {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            named: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_standard_library() -> Self {
        let mut table = Self::empty();
        for name in STANDARD_CODABLE_TYPES {
            table.register(name, &[KnownProtocol::Encodable, KnownProtocol::Decodable]);
        }
        table
    }

    /// Declare that the named type conforms to `protocols`.
    pub fn register(&mut self, name: &str, protocols: &[KnownProtocol]) {
        let entry = self.named.entry(name.to_string()).or_default();
        for protocol in protocols {
            if !entry.contains(protocol) {
                entry.push(*protocol);
            }
        }
    }

    fn check(
        &self,
        arena: &DeclArena,
        ty: &Ty,
        protocol: KnownProtocol,
        context: &GenericContext,
        depth: usize,
    ) -> bool {
        if depth > arena.len() + 1 {
            return false;
        }
        let codable_only = protocol != KnownProtocol::CodingKey;
        match ty {
            Ty::Named(name) => self
                .named
                .get(name)
                .is_some_and(|protocols| protocols.contains(&protocol)),
            Ty::Param(name) => context.param_conforms(name, protocol),
            Ty::Optional(inner) | Ty::Array(inner) | Ty::Set(inner) => {
                codable_only && self.check(arena, inner, protocol, context, depth + 1)
            }
            Ty::Dictionary(key, value) => {
                codable_only
                    && self.check(arena, key, protocol, context, depth + 1)
                    && self.check(arena, value, protocol, context, depth + 1)
            }
            Ty::Function(..) => false,
            Ty::Nominal { decl, args } => {
                self.nominal_conforms(arena, *decl, args, protocol, context, depth)
            }
        }
    }

    fn nominal_conforms(
        &self,
        arena: &DeclArena,
        decl: DeclId,
        args: &[Ty],
        protocol: KnownProtocol,
        context: &GenericContext,
        depth: usize,
    ) -> bool {
        let Some(target) = arena.try_get(decl) else {
            return false;
        };
        let nominal = match &target.kind {
            DeclKind::Nominal(nominal) => nominal,
            DeclKind::TypeAlias(alias) => {
                return self.check(arena, &alias.target, protocol, context, depth + 1);
            }
            _ => return false,
        };
        let bindings: HashMap<String, Ty> = nominal
            .generic_params
            .iter()
            .zip(args)
            .map(|(param, arg)| (param.name.clone(), arg.clone()))
            .collect();
        let declared = nominal
            .conformances
            .iter()
            .filter(|conformance| protocol.is_provided_by(&conformance.protocol))
            .any(|conformance| {
                conformance.requirements.iter().all(|req| {
                    let bound = bindings
                        .get(&req.param)
                        .cloned()
                        .unwrap_or_else(|| Ty::param(req.param.clone()));
                    // Requirements on protocols this oracle does not model are
                    // checked by the type checker proper.
                    KnownProtocol::expand(&req.protocol)
                        .iter()
                        .all(|required| self.check(arena, &bound, *required, context, depth + 1))
                })
            });
        if declared {
            return true;
        }
        // Subclasses inherit the conformances of their superclass.
        match &nominal.superclass {
            Some(superclass) => self.check(
                arena,
                &superclass.substitute(&bindings),
                protocol,
                context,
                depth + 1,
            ),
            None => false,
        }
    }
}

impl Default for ConformanceTable {
    fn default() -> Self {
        Self::with_standard_library()
    }
}

impl ConformanceOracle for ConformanceTable {
    fn conforms_to(
        &self,
        arena: &DeclArena,
        ty: &Ty,
        protocol: KnownProtocol,
        context: &GenericContext,
    ) -> bool {
        self.check(arena, ty, protocol, context, 0)
    }
}
