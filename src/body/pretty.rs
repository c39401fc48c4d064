//! Swift-like rendering of synthesized bodies.

use std::fmt::Write;

use super::{Arg, Block, Expr, Pattern, Stmt};
use crate::decl::DeclArena;

const INDENT: &str = "    ";

#[must_use]
pub fn format_block(arena: &DeclArena, block: &Block) -> String {
    let mut out = String::new();
    write_block(arena, block, 0, &mut out);
    out
}

#[must_use]
pub fn format_expr(arena: &DeclArena, expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(arena, expr, &mut out);
    out
}

fn write_block(arena: &DeclArena, block: &Block, depth: usize, out: &mut String) {
    for stmt in &block.stmts {
        write_stmt(arena, stmt, depth, out);
    }
}

fn write_stmt(arena: &DeclArena, stmt: &Stmt, depth: usize, out: &mut String) {
    let pad = INDENT.repeat(depth);
    match stmt {
        Stmt::Let {
            name,
            mutable,
            value,
        } => {
            let introducer = if *mutable { "var" } else { "let" };
            let _ = write!(out, "{pad}{introducer} {name} = ");
            write_expr(arena, value, out);
            out.push('\n');
        }
        Stmt::Expr(expr) => {
            out.push_str(&pad);
            write_expr(arena, expr, out);
            out.push('\n');
        }
        Stmt::Assign { place, value } => {
            out.push_str(&pad);
            write_expr(arena, place, out);
            out.push_str(" = ");
            write_expr(arena, value, out);
            out.push('\n');
        }
        Stmt::Throw(expr) => {
            let _ = write!(out, "{pad}throw ");
            write_expr(arena, expr, out);
            out.push('\n');
        }
        Stmt::Switch {
            subject,
            arms,
            default,
        } => {
            let _ = write!(out, "{pad}switch ");
            write_expr(arena, subject, out);
            out.push_str(" {\n");
            for arm in arms {
                let _ = write!(out, "{pad}case ");
                write_pattern(arena, &arm.pattern, out);
                out.push_str(":\n");
                write_arm_body(arena, &arm.body, depth + 1, out);
            }
            if let Some(default) = default {
                let _ = writeln!(out, "{pad}default:");
                write_arm_body(arena, default, depth + 1, out);
            }
            let _ = writeln!(out, "{pad}}}");
        }
    }
}

fn write_arm_body(arena: &DeclArena, body: &Block, depth: usize, out: &mut String) {
    if body.is_empty() {
        let _ = writeln!(out, "{}break", INDENT.repeat(depth));
    } else {
        write_block(arena, body, depth, out);
    }
}

fn write_pattern(arena: &DeclArena, pattern: &Pattern, out: &mut String) {
    match pattern {
        Pattern::EnumCase { case, bindings, .. } => {
            let _ = write!(out, ".{case}");
            if !bindings.is_empty() {
                out.push('(');
                for (index, binding) in bindings.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    if let Some(label) = &binding.label {
                        let _ = write!(out, "{label}: ");
                    }
                    let _ = write!(out, "let {}", binding.name);
                }
                out.push(')');
            }
        }
        Pattern::Key { keys, case } => {
            let _ = write!(out, "{}.{case}?", arena.get(*keys).name);
        }
    }
}

fn write_args(arena: &DeclArena, args: &[Arg], out: &mut String) {
    out.push('(');
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        if let Some(label) = &arg.label {
            let _ = write!(out, "{label}: ");
        }
        write_expr(arena, &arg.value, out);
    }
    out.push(')');
}

fn write_expr(arena: &DeclArena, expr: &Expr, out: &mut String) {
    match expr {
        Expr::Local(name) => out.push_str(name),
        Expr::SelfRef => out.push_str("self"),
        Expr::SuperRef => out.push_str("super"),
        Expr::Member { base, name } => {
            write_expr(arena, base, out);
            let _ = write!(out, ".{name}");
        }
        Expr::Metatype(ty) => {
            let _ = write!(out, "{}.self", ty.display(arena));
        }
        Expr::Key { keys, case } => {
            let _ = write!(out, "{}.{case}", arena.get(*keys).name);
        }
        Expr::Call {
            receiver,
            method,
            args,
        } => {
            write_expr(arena, receiver, out);
            let _ = write!(out, ".{method}");
            write_args(arena, args, out);
        }
        Expr::Try(inner) => {
            out.push_str("try ");
            write_expr(arena, inner, out);
        }
        Expr::CaseValue {
            enum_decl,
            case,
            args,
        } => {
            let _ = write!(out, "{}.{case}", arena.get(*enum_decl).name);
            if !args.is_empty() {
                write_args(arena, args, out);
            }
        }
        Expr::Literal(literal) => {
            let _ = write!(out, "{literal}");
        }
        Expr::Error {
            domain,
            kind,
            subject,
            coding_path,
            description,
        } => {
            let domain = domain.type_name();
            let _ = write!(out, "{domain}.{kind}(");
            write_expr(arena, subject, out);
            let _ = write!(out, ", {domain}.Context(codingPath: ");
            write_expr(arena, coding_path, out);
            let _ = write!(out, ", debugDescription: {description:?}))");
        }
    }
}
