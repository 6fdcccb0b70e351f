//! # Printer
//!
//! Renders the intermediate AST as JavaScript text.
//!
//! - K&R braces, four spaces per nesting level
//! - one blank line between neighbouring statements of different kinds,
//!   and between neighbouring block statements
//! - strings are double-quoted with JSON escaping
//!
//! The output is a pure function of the AST.

use super::ast::{Block, Expr, Literal, Stmt, UnaryOp};
use crate::metadata::is_identifier;

pub const INDENT: &str = "    ";

/// Prints a block at nesting depth zero, without a trailing newline.
pub fn print_block(stmts: &[Stmt]) -> String {
    let mut printer = Printer::default();
    printer.block(stmts, 0);
    printer.finish()
}

/// Prints a single expression.
pub fn print_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

/// Double-quoted, JSON-escaped string literal.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text.escape_default()))
}

/// Re-indents a code fragment to `base` spaces.
///
/// Leading and trailing blank lines are dropped, the common leading
/// whitespace of the non-blank lines is removed, every non-blank line is
/// prefixed with `base` spaces, and whitespace-only lines come out empty.
/// `indent_code(&indent_code(s, 0), n) == indent_code(s, n)`.
pub fn indent_code(code: &str, base: usize) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let is_blank = |line: &&str| line.trim().is_empty();

    let Some(first) = lines.iter().position(|line| !is_blank(line)) else {
        return String::new();
    };
    let last = lines
        .iter()
        .rposition(|line| !is_blank(line))
        .unwrap_or(first);
    let lines = &lines[first..=last];

    let common = lines
        .iter()
        .filter(|line| !is_blank(line))
        .map(|line| leading_whitespace(line))
        .min()
        .unwrap_or(0);

    let pad = " ".repeat(base);
    lines
        .iter()
        .map(|line| {
            if is_blank(line) {
                String::new()
            } else {
                format!("{}{}", pad, &line[common..])
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn leading_whitespace(line: &str) -> usize {
    line.len() - line.trim_start_matches(|c: char| c == ' ' || c == '\t').len()
}

#[derive(Default)]
struct Printer {
    lines: Vec<String>,
}

impl Printer {
    fn finish(self) -> String {
        self.lines.join("\n")
    }

    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(depth), text.as_ref()));
    }

    fn block(&mut self, stmts: &[Stmt], depth: usize) {
        let mut previous: Option<&Stmt> = None;
        for stmt in stmts {
            if let Some(prev) = previous {
                if needs_gap(prev, stmt) {
                    self.lines.push(String::new());
                }
            }
            self.stmt(stmt, depth);
            previous = Some(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt, depth: usize) {
        match stmt {
            Stmt::Expr(expr) => self.line(depth, format!("{};", print_expr(expr))),
            Stmt::VarDecl { .. } => self.line(depth, format!("{};", declaration(stmt))),
            Stmt::Return(None) => self.line(depth, "return;"),
            Stmt::Return(Some(value)) => {
                self.line(depth, format!("return {};", print_expr(value)))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.line(depth, format!("if ({}) {{", print_expr(test)));
                self.block(consequent, depth + 1);
                self.else_chain(alternate, depth);
            }
            Stmt::While { test, body } => {
                self.line(depth, format!("while ({}) {{", print_expr(test)));
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Stmt::DoWhile { body, test } => {
                self.line(depth, "do {");
                self.block(body, depth + 1);
                self.line(depth, format!("}} while ({});", print_expr(test)));
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.line(
                    depth,
                    format!(
                        "for ({}; {}; {}) {{",
                        declaration(init),
                        print_expr(test),
                        print_expr(update)
                    ),
                );
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Stmt::ForOf {
                binding,
                iterable,
                body,
            } => {
                self.line(
                    depth,
                    format!("for (const {} of {}) {{", binding, print_expr(iterable)),
                );
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Stmt::Function {
                name,
                params,
                is_async,
                body,
            } => {
                let prefix = if *is_async { "async " } else { "" };
                self.line(
                    depth,
                    format!("{}function {}({}) {{", prefix, name, params.join(", ")),
                );
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
        }
    }

    /// Closes an `if` body, folding a lone nested `if` into `else if`.
    fn else_chain(&mut self, alternate: &Block, depth: usize) {
        match alternate.as_slice() {
            [] => self.line(depth, "}"),
            [Stmt::If {
                test,
                consequent,
                alternate,
            }] => {
                self.line(depth, format!("}} else if ({}) {{", print_expr(test)));
                self.block(consequent, depth + 1);
                self.else_chain(alternate, depth);
            }
            _ => {
                self.line(depth, "} else {");
                self.block(alternate, depth + 1);
                self.line(depth, "}");
            }
        }
    }
}

fn needs_gap(prev: &Stmt, next: &Stmt) -> bool {
    std::mem::discriminant(prev) != std::mem::discriminant(next)
        || (prev.is_compound() && next.is_compound())
}

/// `const x = value` without the semicolon; anything else prints as an expression.
fn declaration(stmt: &Stmt) -> String {
    match stmt {
        Stmt::VarDecl {
            kind,
            name,
            init: Some(init),
        } => format!("{} {} = {}", kind.keyword(), name, print_expr(init)),
        Stmt::VarDecl {
            kind,
            name,
            init: None,
        } => format!("{} {}", kind.keyword(), name),
        Stmt::Expr(expr) => print_expr(expr),
        _ => String::new(),
    }
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Identifier(name) => out.push_str(name),
        Expr::Literal(literal) => write_literal(out, literal),
        Expr::Template(text) => {
            out.push('`');
            out.push_str(&text.replace('\\', "\\\\").replace('`', "\\`"));
            out.push('`');
        }
        Expr::Json(value) => out.push_str(&value.to_string()),
        Expr::Member { object, property } => {
            write_operand(out, object, expr.precedence());
            if is_identifier(property) {
                out.push('.');
                out.push_str(property);
            } else {
                out.push('[');
                out.push_str(&quote(property));
                out.push(']');
            }
        }
        Expr::Call { callee, args } => {
            write_operand(out, callee, expr.precedence());
            write_args(out, args);
        }
        Expr::New { callee, args } => {
            out.push_str("new ");
            write_operand(out, callee, 18);
            write_args(out, args);
        }
        Expr::Binary { op, left, right } => {
            let precedence = op.precedence();
            write_operand(out, left, precedence);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            write_operand(out, right, precedence + 1);
        }
        Expr::Unary { op, operand } => {
            out.push_str(match op {
                UnaryOp::Not => "!",
            });
            write_operand(out, operand, expr.precedence());
        }
        Expr::Await(inner) => {
            out.push_str("await ");
            write_operand(out, inner, expr.precedence());
        }
        Expr::Object(entries) => {
            if entries.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            for (index, (key, value)) in entries.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                if is_identifier(key) {
                    out.push_str(key);
                } else {
                    out.push_str(&quote(key));
                }
                out.push_str(": ");
                write_expr(out, value);
            }
            out.push_str(" }");
        }
        Expr::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_expr(out, item);
            }
            out.push(']');
        }
        Expr::Arrow { params, body } => {
            out.push('(');
            out.push_str(&params.join(", "));
            out.push_str(") => ");
            if matches!(body.as_ref(), Expr::Object(_)) {
                out.push('(');
                write_expr(out, body);
                out.push(')');
            } else {
                write_expr(out, body);
            }
        }
        Expr::Assign { op, target, value } => {
            write_operand(out, target, 18);
            out.push(' ');
            if let Some(op) = op {
                out.push_str(op.symbol());
            }
            out.push_str("= ");
            write_expr(out, value);
        }
    }
}

fn write_args(out: &mut String, args: &[Expr]) {
    out.push('(');
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        write_expr(out, arg);
    }
    out.push(')');
}

/// Writes `expr`, parenthesized when it binds looser than `min`.
fn write_operand(out: &mut String, expr: &Expr, min: u8) {
    if expr.precedence() < min {
        out.push('(');
        write_expr(out, expr);
        out.push(')');
    } else {
        write_expr(out, expr);
    }
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::String(text) => out.push_str(&quote(text)),
        Literal::Number(value) => out.push_str(&format_number(*value)),
        Literal::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
        Literal::Null => out.push_str("null"),
        Literal::Undefined => out.push_str("undefined"),
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::ast::{BinaryOp, VarKind};

    fn log(text: &str) -> Stmt {
        Stmt::expr(Expr::method(
            Expr::ident("console"),
            "log",
            vec![Expr::string(text)],
        ))
    }

    #[test]
    fn test_braces_and_indentation() {
        let code = print_block(&[Stmt::If {
            test: Expr::ident("ready"),
            consequent: vec![log("yes")],
            alternate: vec![log("no")],
        }]);
        assert_eq!(
            code,
            "if (ready) {\n    console.log(\"yes\");\n} else {\n    console.log(\"no\");\n}"
        );
    }

    #[test]
    fn test_blank_line_between_statement_kinds() {
        let code = print_block(&[
            Stmt::constant("x", Expr::number(1.0)),
            Stmt::constant("y", Expr::number(2.0)),
            log("a"),
            log("b"),
            Stmt::Return(None),
        ]);
        assert_eq!(
            code,
            "const x = 1;\nconst y = 2;\n\nconsole.log(\"a\");\nconsole.log(\"b\");\n\nreturn;"
        );
    }

    #[test]
    fn test_else_if_folding() {
        let code = print_block(&[Stmt::If {
            test: Expr::ident("a"),
            consequent: vec![log("a")],
            alternate: vec![Stmt::If {
                test: Expr::ident("b"),
                consequent: vec![log("b")],
                alternate: vec![],
            }],
        }]);
        assert_eq!(
            code,
            "if (a) {\n    console.log(\"a\");\n} else if (b) {\n    console.log(\"b\");\n}"
        );
    }

    #[test]
    fn test_loops() {
        let code = print_block(&[
            Stmt::For {
                init: Box::new(Stmt::VarDecl {
                    kind: VarKind::Let,
                    name: "i".into(),
                    init: Some(Expr::number(0.0)),
                }),
                test: Expr::binary(BinaryOp::Lt, Expr::ident("i"), Expr::number(3.0)),
                update: Expr::assign(Some(BinaryOp::Add), Expr::ident("i"), Expr::number(1.0)),
                body: vec![log("tick")],
            },
            Stmt::DoWhile {
                body: vec![],
                test: Expr::boolean(false),
            },
        ]);
        assert_eq!(
            code,
            "for (let i = 0; i < 3; i += 1) {\n    console.log(\"tick\");\n}\n\ndo {\n} while (false);"
        );
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(print_expr(&Expr::string("say \"hi\"\n")), r#""say \"hi\"\n""#);
        assert_eq!(print_expr(&Expr::Template("a`${b}".into())), "`a\\`${b}`");
    }

    #[test]
    fn test_operator_precedence() {
        let sum = Expr::binary(BinaryOp::Add, Expr::ident("a"), Expr::ident("b"));
        let product = Expr::binary(BinaryOp::Mul, sum.clone(), Expr::ident("c"));
        assert_eq!(print_expr(&product), "(a + b) * c");

        let nested = Expr::binary(
            BinaryOp::Sub,
            Expr::ident("a"),
            Expr::binary(BinaryOp::Sub, Expr::ident("b"), Expr::ident("c")),
        );
        assert_eq!(print_expr(&nested), "a - (b - c)");

        let member = Expr::member(Expr::awaited(Expr::ident("p")), "value");
        assert_eq!(print_expr(&member), "(await p).value");
        assert_eq!(
            print_expr(&Expr::unary(UnaryOp::Not, sum)),
            "!(a + b)"
        );
    }

    #[test]
    fn test_objects_and_members() {
        let payload = Expr::Object(vec![
            ("content".into(), Expr::string("hi")),
            ("my-key".into(), Expr::boolean(true)),
        ]);
        assert_eq!(print_expr(&payload), "{ content: \"hi\", \"my-key\": true }");
        assert_eq!(
            print_expr(&Expr::member(Expr::ident("data"), "first name")),
            "data[\"first name\"]"
        );
        assert_eq!(print_expr(&Expr::number(2.5)), "2.5");
        assert_eq!(print_expr(&Expr::number(-4.0)), "-4");
    }

    #[test]
    fn test_indent_code() {
        let code = "\n\n    if (x) {\n        y();\n   \n    }\n\n";
        assert_eq!(indent_code(code, 2), "  if (x) {\n      y();\n\n  }");
        assert_eq!(indent_code("   \n \n", 4), "");
    }

    #[test]
    fn test_indent_code_is_idempotent() {
        let samples = [
            "a();\n  b();\n\tc();",
            "\n        deep();\n    shallow();\n",
            "if (a) {\n    b();\n}\n\nc();",
        ];
        for sample in samples {
            for base in [0, 4, 8] {
                assert_eq!(
                    indent_code(&indent_code(sample, 0), base),
                    indent_code(sample, base)
                );
            }
        }
    }
}
