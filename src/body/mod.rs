//! Statement IR for synthesized method and initializer bodies.

pub mod pretty;

use once_cell::unsync::OnceCell;

use crate::decl::{DeclId, Literal, Ty};
use crate::error::Result;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

impl Block {
    #[must_use]
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        mutable: bool,
        value: Expr,
    },
    Expr(Expr),
    Assign {
        place: Expr,
        value: Expr,
    },
    Switch {
        subject: Expr,
        arms: Vec<SwitchArm>,
        default: Option<Block>,
    },
    Throw(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchArm {
    pub pattern: Pattern,
    pub body: Block,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    /// `case .bar(x: let a0, let a1)` over the value being encoded.
    EnumCase {
        enum_decl: DeclId,
        case: String,
        bindings: Vec<Binding>,
    },
    /// `case CodingKeys.bar?` over an optional coding key.
    Key { keys: DeclId, case: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub label: Option<String>,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorDomain {
    Encoding,
    Decoding,
}

impl ErrorDomain {
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            ErrorDomain::Encoding => "EncodingError",
            ErrorDomain::Decoding => "DecodingError",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Local(String),
    SelfRef,
    SuperRef,
    Member {
        base: Box<Expr>,
        name: String,
    },
    /// `T.self`
    Metatype(Ty),
    /// `CodingKeys.x`
    Key {
        keys: DeclId,
        case: String,
    },
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Arg>,
    },
    Try(Box<Expr>),
    /// `Foo.bar(x: ...)`, or the bare `Foo.bar` when `args` is empty.
    CaseValue {
        enum_decl: DeclId,
        case: String,
        args: Vec<Arg>,
    },
    Literal(Literal),
    /// `DecodingError.valueNotFound(T.self, DecodingError.Context(...))` and
    /// its encoding counterpart.
    Error {
        domain: ErrorDomain,
        kind: String,
        subject: Box<Expr>,
        coding_path: Box<Expr>,
        description: String,
    },
}

impl Expr {
    #[must_use]
    pub fn local(name: &str) -> Self {
        Expr::Local(name.to_string())
    }

    #[must_use]
    pub fn member(self, name: &str) -> Self {
        Expr::Member {
            base: Box::new(self),
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn call(self, method: &str, args: Vec<Arg>) -> Self {
        Expr::Call {
            receiver: Box::new(self),
            method: method.to_string(),
            args,
        }
    }

    #[must_use]
    pub fn try_(self) -> Self {
        Expr::Try(Box::new(self))
    }

    #[must_use]
    pub fn key(keys: DeclId, case: &str) -> Self {
        Expr::Key {
            keys,
            case: case.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Arg {
    pub label: Option<String>,
    pub value: Expr,
}

impl Arg {
    #[must_use]
    pub fn labeled(label: &str, value: Expr) -> Self {
        Self {
            label: Some(label.to_string()),
            value,
        }
    }

    #[must_use]
    pub fn positional(value: Expr) -> Self {
        Self { label: None, value }
    }
}

/// Which body synthesizer produces a lazily generated body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodySynthesizer {
    EncodeAggregate,
    EncodeUnion,
    DecodeAggregate,
    DecodeUnion,
}

/// Body attached to a synthesized declaration, generated on first request and
/// cached afterwards.
#[derive(Clone, Debug)]
pub struct LazyBody {
    synthesizer: BodySynthesizer,
    cell: OnceCell<Block>,
}

impl LazyBody {
    #[must_use]
    pub fn new(synthesizer: BodySynthesizer) -> Self {
        Self {
            synthesizer,
            cell: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn synthesizer(&self) -> BodySynthesizer {
        self.synthesizer
    }

    #[must_use]
    pub fn is_synthesized(&self) -> bool {
        self.cell.get().is_some()
    }

    #[must_use]
    pub fn get(&self) -> Option<&Block> {
        self.cell.get()
    }

    /// Run `synthesize` unless a body was already produced. A failed run
    /// leaves the cell empty.
    pub fn get_or_synthesize<F>(&self, synthesize: F) -> Result<&Block>
    where
        F: FnOnce(BodySynthesizer) -> Result<Block>,
    {
        self.cell
            .get_or_try_init(|| synthesize(self.synthesizer))
    }
}
