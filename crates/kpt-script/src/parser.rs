//! Parser for the scripted-transformer expression language.
//!
//! Grounded on `sherpack-convert::parser::GoTemplateParser`'s `pest_derive`
//! pattern: a `#[derive(Parser)]` struct over a `.pest` grammar file, with a
//! hand-written tree walk turning `Pairs` into the crate's own AST.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::{Expr, Literal, Program, Statement};
use crate::error::{Result, ScriptError};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct ScriptParser;

pub fn parse(input: &str) -> Result<Program> {
    let mut pairs = ScriptParser::parse(Rule::program, input)?;
    let program_pair = pairs.next().expect("program rule always produces one pair");

    let mut statements = Vec::new();
    for pair in program_pair.into_inner() {
        if pair.as_rule() == Rule::statement {
            statements.push(parse_statement(pair)?);
        }
    }
    Ok(Program(statements))
}

fn parse_statement(pair: Pair<Rule>) -> Result<Statement> {
    let mut inner = pair.into_inner();
    let path_pair = inner.next().expect("statement has a path");
    let expr_pair = inner.next().expect("statement has an expr");
    Ok(Statement {
        path: parse_path(path_pair),
        expr: parse_expr(expr_pair)?,
    })
}

fn parse_path(pair: Pair<Rule>) -> Vec<String> {
    pair.as_str()
        .trim_start_matches('.')
        .split('.')
        .map(|s| s.to_string())
        .collect()
}

fn parse_expr(pair: Pair<Rule>) -> Result<Expr> {
    let inner = pair.into_inner().next().expect("expr wraps or_expr");
    parse_or_expr(inner)
}

fn parse_or_expr(pair: Pair<Rule>) -> Result<Expr> {
    let mut parts = pair.into_inner();
    let mut acc = parse_and_expr(parts.next().expect("or_expr has at least one and_expr"))?;
    for next in parts {
        acc = Expr::Or(Box::new(acc), Box::new(parse_and_expr(next)?));
    }
    Ok(acc)
}

fn parse_and_expr(pair: Pair<Rule>) -> Result<Expr> {
    let mut parts = pair.into_inner();
    let mut acc = parse_not_expr(parts.next().expect("and_expr has at least one not_expr"))?;
    for next in parts {
        acc = Expr::And(Box::new(acc), Box::new(parse_not_expr(next)?));
    }
    Ok(acc)
}

fn parse_not_expr(pair: Pair<Rule>) -> Result<Expr> {
    let inner = pair.into_inner().next().expect("not_expr always wraps one child");
    match inner.as_rule() {
        Rule::not_expr => Ok(Expr::Not(Box::new(parse_not_expr(inner)?))),
        Rule::cmp_expr => parse_cmp_expr(inner),
        other => Err(ScriptError::Unexpected(format!("{:?}", other))),
    }
}

fn parse_cmp_expr(pair: Pair<Rule>) -> Result<Expr> {
    let mut parts = pair.into_inner();
    let lhs = parse_primary(parts.next().expect("cmp_expr has at least one primary"))?;
    match parts.next() {
        None => Ok(lhs),
        Some(op_pair) => {
            let rhs_pair = parts.next().expect("cmp_expr op is followed by a primary");
            let rhs = parse_primary(rhs_pair)?;
            match op_pair.as_rule() {
                Rule::op_eq => Ok(Expr::Eq(Box::new(lhs), Box::new(rhs))),
                Rule::op_ne => Ok(Expr::Ne(Box::new(lhs), Box::new(rhs))),
                other => Err(ScriptError::Unexpected(format!("{:?}", other))),
            }
        }
    }
}

fn parse_primary(pair: Pair<Rule>) -> Result<Expr> {
    let inner = pair.into_inner().next().expect("primary wraps literal or path");
    match inner.as_rule() {
        Rule::literal => Ok(Expr::Literal(parse_literal(inner)?)),
        Rule::path => Ok(Expr::Path(parse_path(inner))),
        other => Err(ScriptError::Unexpected(format!("{:?}", other))),
    }
}

fn parse_literal(pair: Pair<Rule>) -> Result<Literal> {
    let inner = pair.into_inner().next().expect("literal always wraps one child");
    match inner.as_rule() {
        Rule::string => {
            let text = inner
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            Ok(Literal::Str(text))
        }
        Rule::number => inner
            .as_str()
            .parse::<f64>()
            .map(Literal::Num)
            .map_err(|_| ScriptError::InvalidNumber(inner.as_str().to_string())),
        Rule::boolean => Ok(Literal::Bool(inner.as_str() == "true")),
        Rule::null => Ok(Literal::Null),
        other => Err(ScriptError::Unexpected(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_assignment() {
        let program = parse(".metadata.labels.tier = \"prod\"").unwrap();
        assert_eq!(program.0.len(), 1);
        assert_eq!(program.0[0].path, vec!["metadata", "labels", "tier"]);
        assert_eq!(program.0[0].expr, Expr::Literal(Literal::Str("prod".to_string())));
    }

    #[test]
    fn parses_multiple_statements() {
        let program = parse(".a = \"x\"\n.b = \"y\"").unwrap();
        assert_eq!(program.0.len(), 2);
    }

    #[test]
    fn parses_comparison_and_logic() {
        let program = parse(".enabled = .metadata.labels.tier == \"prod\" && !.metadata.labels.skip").unwrap();
        assert_eq!(program.0.len(), 1);
        assert!(matches!(program.0[0].expr, Expr::And(_, _)));
    }

    #[test]
    fn rejects_garbage_input() {
        assert!(parse("not valid at all {{{").is_err());
    }
}
