//! Evaluates a parsed [`Program`] against a resource's `serde_json::Value`
//! tree, applying each assignment statement in order (SPEC_FULL.md §9.1).

use serde_json::Value as JsonValue;

use crate::ast::{Expr, Literal, Program, Statement};
use crate::error::{Result, ScriptError};

fn literal_to_value(lit: &Literal) -> JsonValue {
    match lit {
        Literal::Str(s) => JsonValue::String(s.clone()),
        Literal::Num(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Literal::Bool(b) => JsonValue::Bool(*b),
        Literal::Null => JsonValue::Null,
    }
}

fn resolve_path<'a>(root: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    let mut current = root;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Null => false,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        JsonValue::Array(a) => !a.is_empty(),
        JsonValue::Object(o) => !o.is_empty(),
    }
}

fn eval_expr(expr: &Expr, root: &JsonValue) -> Result<JsonValue> {
    match expr {
        Expr::Literal(lit) => Ok(literal_to_value(lit)),
        Expr::Path(path) => Ok(resolve_path(root, path).cloned().unwrap_or(JsonValue::Null)),
        Expr::Not(inner) => Ok(JsonValue::Bool(!is_truthy(&eval_expr(inner, root)?))),
        Expr::Eq(lhs, rhs) => Ok(JsonValue::Bool(eval_expr(lhs, root)? == eval_expr(rhs, root)?)),
        Expr::Ne(lhs, rhs) => Ok(JsonValue::Bool(eval_expr(lhs, root)? != eval_expr(rhs, root)?)),
        Expr::And(lhs, rhs) => {
            let l = eval_expr(lhs, root)?;
            if !is_truthy(&l) {
                return Ok(JsonValue::Bool(false));
            }
            Ok(JsonValue::Bool(is_truthy(&eval_expr(rhs, root)?)))
        }
        Expr::Or(lhs, rhs) => {
            let l = eval_expr(lhs, root)?;
            if is_truthy(&l) {
                return Ok(JsonValue::Bool(true));
            }
            Ok(JsonValue::Bool(is_truthy(&eval_expr(rhs, root)?)))
        }
    }
}

/// Sets `value` at `path` within `root`, creating intermediate objects as
/// needed. Fails if an intermediate segment already exists as a non-object.
fn set_path(root: &mut JsonValue, path: &[String], value: JsonValue) -> Result<()> {
    let Some((last, prefix)) = path.split_last() else {
        return Ok(());
    };
    let mut current = root;
    for segment in prefix {
        if !current.is_object() {
            *current = JsonValue::Object(serde_json::Map::new());
        }
        current = current
            .as_object_mut()
            .expect("just normalized to object")
            .entry(segment.clone())
            .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
    }
    if !current.is_object() {
        return Err(ScriptError::TypeMismatch {
            path: path.join("."),
        });
    }
    current
        .as_object_mut()
        .expect("just checked is_object")
        .insert(last.clone(), value);
    Ok(())
}

fn run_statement(statement: &Statement, root: &mut JsonValue) -> Result<()> {
    let value = eval_expr(&statement.expr, root)?;
    set_path(root, &statement.path, value)
}

/// Runs every statement in `program` against `root`, in order.
pub fn run(program: &Program, root: &mut JsonValue) -> Result<()> {
    for statement in &program.0 {
        run_statement(statement, root)?;
    }
    Ok(())
}
