//! The two-phase expression evaluator: a full native evaluator (`simplify`), and a partial
//! fallback that preserves unresolvable sub-expressions as their original source text.
//!
//! Grounded in the original implementation's `variables.go` (`expr.Value(ctx)` calls) for the
//! simplify phase and `json.go`'s `convertExpression`/`rangeSource` for the fallback phase.

use std::ops::Range;

use hcl::edit::expr::{
    BinaryOperator, Conditional, Expression, ForExpr, FuncCall, Object, ObjectKey, Traversal,
    TraversalOperator, UnaryOp, UnaryOperator,
};
use hcl::edit::template::{Directive, Element, Template};
use hcl::edit::{Decorated, Number, Span};
use serde_json::Value as JsonValue;

use crate::error::EvalError;
use crate::hcl::env::Environment;
use crate::hcl::functions;
use crate::value::Value;

/// Evaluates `expr` against `source` (the byte string it was parsed from) and `env`, producing a
/// JSON value. Never fails: any expression this evaluator cannot fully resolve degrades to a
/// string embedding its own source text.
pub fn eval_to_json(expr: &Expression, source: &str, env: &Environment) -> JsonValue {
    match simplify(expr, env) {
        Ok(value) => value.to_json(),
        Err(_) => fallback(expr, source, env),
    }
}

/// Phase 1: attempt full evaluation. Fails as soon as any sub-expression can't be resolved.
pub fn simplify(expr: &Expression, env: &Environment) -> Result<Value, EvalError> {
    match expr {
        Expression::Null(_) => Ok(Value::Null),
        Expression::Bool(b) => Ok(Value::Bool(*b.value())),
        Expression::Number(n) => Ok(Value::Number(*n.value())),
        Expression::String(s) => Ok(Value::String(s.value().clone())),
        Expression::Parenthesis(p) => simplify(p.inner(), env),
        Expression::Variable(ident) => env
            .get(ident.as_str())
            .ok_or_else(|| EvalError::UndefinedVariable(ident.as_str().to_string())),
        Expression::Array(arr) => {
            let items = arr
                .iter()
                .map(|e| simplify(e, env))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Tuple(items))
        }
        Expression::Object(obj) => Ok(Value::Object(simplify_object(obj, env)?)),
        Expression::StringTemplate(t) => simplify_template(t, env),
        Expression::HeredocTemplate(h) => simplify_template(&h.template, env),
        Expression::UnaryOp(op) => simplify_unary(op, env),
        Expression::BinaryOp(op) => {
            let lhs = simplify(&op.lhs_expr, env)?;
            let rhs = simplify(&op.rhs_expr, env)?;
            apply_binary(*op.operator.value(), lhs, rhs)
        }
        Expression::Conditional(c) => simplify_conditional(c, env),
        Expression::FuncCall(call) => simplify_call(call, env),
        Expression::Traversal(t) => simplify_traversal(t, env),
        Expression::ForExpr(f) => simplify_for(f, env),
    }
}

fn simplify_object(obj: &Object, env: &Environment) -> Result<Vec<(String, Value)>, EvalError> {
    let mut out = Vec::with_capacity(obj.len());
    for (key, value) in obj.iter() {
        let k = object_key_string(key, env)?;
        let v = simplify(value.expr(), env)?;
        out.push((k, v));
    }
    Ok(out)
}

fn object_key_string(key: &ObjectKey, env: &Environment) -> Result<String, EvalError> {
    match key {
        ObjectKey::Ident(ident) => Ok(ident.as_str().to_string()),
        ObjectKey::Expression(expr) => Ok(simplify(expr, env)?.to_display_string()),
    }
}

fn simplify_template(t: &Template, env: &Environment) -> Result<Value, EvalError> {
    // A template with exactly one bare interpolation preserves the inner value's type
    // (`"${var.list}"` yields a list, not a stringified list).
    if let [Element::Interpolation(interp)] = t.iter().collect::<Vec<_>>().as_slice() {
        return simplify(&interp.expr, env);
    }
    let mut out = String::new();
    render_template_into(t, env, &mut out)?;
    Ok(Value::String(out))
}

fn render_template_into(t: &Template, env: &Environment, out: &mut String) -> Result<(), EvalError> {
    for el in t.iter() {
        match el {
            Element::Literal(lit) => out.push_str(lit.as_ref()),
            Element::Interpolation(interp) => {
                out.push_str(&simplify(&interp.expr, env)?.to_display_string());
            }
            Element::Directive(Directive::If(d)) => {
                let cond = simplify(&d.if_expr.cond_expr, env)?;
                if cond.as_bool().unwrap_or(false) {
                    render_template_into(&d.if_expr.template, env, out)?;
                } else if let Some(else_expr) = &d.else_expr {
                    render_template_into(&else_expr.template, env, out)?;
                }
            }
            Element::Directive(Directive::For(d)) => {
                let fe = &d.for_expr;
                let collection = simplify(&fe.collection_expr, env)?;
                for (key, value) in iterate(&collection)? {
                    let mut scoped = env.clone();
                    if let Some(key_var) = &fe.key_var {
                        scoped.set(key_var.as_str(), key);
                    }
                    scoped.set(fe.value_var.as_str(), value);
                    render_template_into(&fe.template, &scoped, out)?;
                }
            }
        }
    }
    Ok(())
}

fn simplify_unary(op: &UnaryOp, env: &Environment) -> Result<Value, EvalError> {
    let v = simplify(&op.expr, env)?;
    match op.operator.value() {
        UnaryOperator::Neg => {
            let n = v
                .as_f64()
                .ok_or_else(|| EvalError::TypeMismatch("unary - on non-number".into()))?;
            Ok(Value::Number(
                Number::from_f64(-n).unwrap_or_else(|| Number::from(0)),
            ))
        }
        UnaryOperator::Not => {
            let b = v
                .as_bool()
                .ok_or_else(|| EvalError::TypeMismatch("unary ! on non-bool".into()))?;
            Ok(Value::Bool(!b))
        }
    }
}

fn apply_binary(op: BinaryOperator, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use BinaryOperator::*;
    match op {
        Eq => Ok(Value::Bool(lhs == rhs)),
        NotEq => Ok(Value::Bool(lhs != rhs)),
        And => Ok(Value::Bool(bool_of(&lhs)? && bool_of(&rhs)?)),
        Or => Ok(Value::Bool(bool_of(&lhs)? || bool_of(&rhs)?)),
        Less | LessEq | Greater | GreaterEq => {
            let a = num_of(&lhs)?;
            let b = num_of(&rhs)?;
            let result = match op {
                Less => a < b,
                LessEq => a <= b,
                Greater => a > b,
                GreaterEq => a >= b,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        Plus | Minus | Mul | Div | Mod => {
            let a = num_of(&lhs)?;
            let b = num_of(&rhs)?;
            let result = match op {
                Plus => a + b,
                Minus => a - b,
                Mul => a * b,
                Div => a / b,
                Mod => a % b,
                _ => unreachable!(),
            };
            numeric_value(result)
        }
    }
}

fn bool_of(v: &Value) -> Result<bool, EvalError> {
    v.as_bool().ok_or_else(|| EvalError::TypeMismatch("expected bool".into()))
}

fn num_of(v: &Value) -> Result<f64, EvalError> {
    v.as_f64().ok_or_else(|| EvalError::TypeMismatch("expected number".into()))
}

fn numeric_value(f: f64) -> Result<Value, EvalError> {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Ok(Value::int(f as i64))
    } else {
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| EvalError::TypeMismatch("non-finite arithmetic result".into()))
    }
}

fn simplify_conditional(c: &Conditional, env: &Environment) -> Result<Value, EvalError> {
    let cond = simplify(&c.cond_expr, env)?;
    if bool_of(&cond)? {
        simplify(&c.true_expr, env)
    } else {
        simplify(&c.false_expr, env)
    }
}

fn simplify_call(call: &FuncCall, env: &Environment) -> Result<Value, EvalError> {
    let name = call.name.name.as_str();
    let args = call
        .args
        .iter()
        .map(|e| simplify(e, env))
        .collect::<Result<Vec<_>, _>>()?;
    functions::call(name, &args)
}

fn simplify_traversal(t: &Traversal, env: &Environment) -> Result<Value, EvalError> {
    let base = simplify(&t.expr, env)?;
    apply_traversal(base, &t.operators, env)
}

fn apply_traversal(
    base: Value,
    ops: &[Decorated<TraversalOperator>],
    env: &Environment,
) -> Result<Value, EvalError> {
    let mut current = base;
    for (i, op) in ops.iter().enumerate() {
        match op.value() {
            TraversalOperator::GetAttr(ident) => {
                current = get_attr(&current, ident.as_str())?;
            }
            TraversalOperator::Index(idx_expr) => {
                let idx = simplify(idx_expr, env)?;
                current = get_index(&current, &idx)?;
            }
            TraversalOperator::LegacyIndex(n) => {
                current = get_index(&current, &Value::int(*n.value() as i64))?;
            }
            TraversalOperator::AttrSplat(_) | TraversalOperator::FullSplat(_) => {
                let elements = match &current {
                    Value::List(v) | Value::Set(v) | Value::Tuple(v) => v.clone(),
                    other => vec![other.clone()],
                };
                let remaining = &ops[i + 1..];
                let mapped = elements
                    .into_iter()
                    .map(|e| apply_traversal(e, remaining, env))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Value::List(mapped));
            }
        }
    }
    Ok(current)
}

fn get_attr(value: &Value, name: &str) -> Result<Value, EvalError> {
    match value.as_entries() {
        Some(entries) => entries
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .ok_or_else(|| EvalError::NoSuchAttribute(name.to_string())),
        None => Err(EvalError::NoSuchAttribute(name.to_string())),
    }
}

fn get_index(value: &Value, idx: &Value) -> Result<Value, EvalError> {
    if let Some(list) = value.as_list() {
        let i = idx
            .as_f64()
            .ok_or_else(|| EvalError::TypeMismatch("index must be a number".into()))? as usize;
        return list.get(i).cloned().ok_or(EvalError::IndexOutOfRange);
    }
    if let Some(key) = idx.as_str() {
        return get_attr(value, key);
    }
    Err(EvalError::NotIterable)
}

/// Iterates a list or map/object value, yielding `(key, value)` pairs. For lists, the key is the
/// zero-based index.
fn iterate(value: &Value) -> Result<Vec<(Value, Value)>, EvalError> {
    if let Some(entries) = value.as_entries() {
        return Ok(entries
            .into_iter()
            .map(|(k, v)| (Value::string(k), v))
            .collect());
    }
    if let Some(list) = value.as_list() {
        return Ok(list
            .iter()
            .enumerate()
            .map(|(i, v)| (Value::int(i as i64), v.clone()))
            .collect());
    }
    Err(EvalError::NotIterable)
}

fn simplify_for(f: &ForExpr, env: &Environment) -> Result<Value, EvalError> {
    let collection = simplify(&f.intro.collection_expr, env)?;
    let mut pairs: Vec<(String, Value)> = Vec::new();
    let mut values: Vec<Value> = Vec::new();
    let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();

    for (key, value) in iterate(&collection)? {
        let mut scoped = env.clone();
        if let Some(key_var) = &f.intro.key_var {
            scoped.set(key_var.as_str(), key.clone());
        }
        scoped.set(f.intro.value_var.as_str(), value);

        if let Some(cond) = &f.cond {
            if !bool_of(&simplify(&cond.expr, &scoped)?)? {
                continue;
            }
        }

        let result_value = simplify(&f.value_expr, &scoped)?;

        if let Some(key_expr) = &f.key_expr {
            let result_key = simplify(key_expr, &scoped)?.to_display_string();
            if f.grouping {
                if let Some(slot) = grouped.iter_mut().find(|(k, _)| *k == result_key) {
                    slot.1.push(result_value);
                } else {
                    grouped.push((result_key, vec![result_value]));
                }
            } else if let Some(slot) = pairs.iter_mut().find(|(k, _)| *k == result_key) {
                slot.1 = result_value;
            } else {
                pairs.push((result_key, result_value));
            }
        } else {
            values.push(result_value);
        }
    }

    if f.key_expr.is_some() {
        if f.grouping {
            Ok(Value::Object(
                grouped
                    .into_iter()
                    .map(|(k, v)| (k, Value::List(v)))
                    .collect(),
            ))
        } else {
            Ok(Value::Object(pairs))
        }
    } else {
        Ok(Value::Tuple(values))
    }
}

// ---- Phase 2: partial fallback ----

fn range_source(source: &str, range: &Range<usize>) -> String {
    let mut end = range.end.min(source.len());
    if source.as_bytes().get(end) == Some(&b')') {
        end += 1;
    }
    source.get(range.start..end).unwrap_or_default().to_string()
}

fn wrap(source: &str, range: &Range<usize>) -> JsonValue {
    JsonValue::String(format!("${{{}}}", range_source(source, range)))
}

/// Phase 2: dispatches on the AST shape to preserve as much structure (and as much successfully
/// resolved content) as possible, falling back to the node's verbatim source text for anything
/// that can't be simplified.
fn fallback(expr: &Expression, source: &str, env: &Environment) -> JsonValue {
    match expr {
        Expression::Null(_) => JsonValue::Null,
        Expression::Bool(b) => JsonValue::Bool(*b.value()),
        Expression::Number(n) => Value::Number(*n.value()).to_json(),
        Expression::String(s) => JsonValue::String(s.value().clone()),
        Expression::Parenthesis(p) => fallback(p.inner(), source, env),
        Expression::UnaryOp(op) => match simplify(&op.expr, &Environment::empty()) {
            Ok(v) => apply_unary_literal(op, v).unwrap_or_else(|| wrap_node(expr, source)),
            Err(_) => wrap_node(expr, source),
        },
        Expression::StringTemplate(t) => fallback_template(t, source, env),
        Expression::HeredocTemplate(h) => fallback_template(&h.template, source, env),
        Expression::Array(arr) => {
            JsonValue::Array(arr.iter().map(|e| eval_to_json(e, source, env)).collect())
        }
        Expression::Object(obj) => {
            let mut map = serde_json::Map::new();
            for (key, value) in obj.iter() {
                let k = fallback_key(key, source, env);
                map.insert(k, eval_to_json(value.expr(), source, env));
            }
            JsonValue::Object(map)
        }
        _ => wrap_node(expr, source),
    }
}

fn apply_unary_literal(op: &UnaryOp, v: Value) -> Option<JsonValue> {
    match op.operator.value() {
        UnaryOperator::Neg => v.as_f64().map(|n| numeric_value(-n).unwrap().to_json()),
        UnaryOperator::Not => v.as_bool().map(|b| JsonValue::Bool(!b)),
    }
}

fn wrap_node(expr: &Expression, source: &str) -> JsonValue {
    match expr.span() {
        Some(range) => wrap(source, &range),
        None => JsonValue::Null,
    }
}

fn fallback_key(key: &ObjectKey, source: &str, env: &Environment) -> String {
    match key {
        ObjectKey::Ident(ident) => ident.as_str().to_string(),
        // Traversals (`a.b.c`) and bare variables always keep their verbatim source text as an
        // object key, even when they'd resolve fine — this is how `{ aws_instance.foo.id = ... }`
        // stays readable instead of collapsing to whatever `foo`'s id happens to be.
        ObjectKey::Expression(expr @ (Expression::Traversal(_) | Expression::Variable(_))) => {
            expr.span()
                .map(|r| range_source(source, &r))
                .unwrap_or_default()
        }
        ObjectKey::Expression(expr) => match simplify(expr, env) {
            Ok(v) => v.to_display_string(),
            Err(_) => expr
                .span()
                .map(|r| range_source(source, &r))
                .unwrap_or_default(),
        },
    }
}

fn fallback_template(t: &Template, source: &str, env: &Environment) -> JsonValue {
    // A bare single-interpolation template that fails to simplify type-preservingly still
    // degrades to the wrapped source text of its inner expression (so lists/objects referenced
    // this way still read back as `${...}` rather than double-encoded JSON).
    if let [Element::Interpolation(interp)] = t.iter().collect::<Vec<_>>().as_slice() {
        return eval_to_json(&interp.expr, source, env);
    }
    JsonValue::String(fallback_template_string(t, source, env))
}

fn fallback_template_string(t: &Template, source: &str, env: &Environment) -> String {
    let mut out = String::new();
    for el in t.iter() {
        match el {
            Element::Literal(lit) => out.push_str(lit.as_ref()),
            Element::Interpolation(interp) => match simplify(&interp.expr, env) {
                Ok(v) => out.push_str(&v.to_display_string()),
                Err(_) => {
                    if let Some(range) = interp.expr.span() {
                        out.push_str(&format!("${{{}}}", range_source(source, &range)));
                    }
                }
            },
            Element::Directive(Directive::If(d)) => {
                let cond_src = d
                    .if_expr
                    .cond_expr
                    .span()
                    .map(|r| range_source(source, &r))
                    .unwrap_or_default();
                out.push_str(&format!("%{{if {cond_src}}}"));
                out.push_str(&fallback_template_string(&d.if_expr.template, source, env));
                if let Some(else_expr) = &d.else_expr {
                    let rendered = fallback_template_string(&else_expr.template, source, env);
                    if !rendered.is_empty() {
                        out.push_str("%{else}");
                        out.push_str(&rendered);
                    }
                }
                out.push_str("%{endif}");
            }
            Element::Directive(Directive::For(d)) => {
                let fe = &d.for_expr;
                let coll_src = fe
                    .collection_expr
                    .span()
                    .map(|r| range_source(source, &r))
                    .unwrap_or_default();
                let key_prefix = fe
                    .key_var
                    .as_ref()
                    .map(|k| format!("{}, ", k.as_str()))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "%{{for {key_prefix}{} in {coll_src}}}",
                    fe.value_var.as_str()
                ));
                out.push_str(&fallback_template_string(&fe.template, source, env));
                out.push_str("%{endfor}");
            }
        }
    }
    out
}
