//! The constrained function library the evaluator exposes to expressions.
//!
//! The allowed and forbidden names are taken verbatim from the original implementation's
//! `functions.go` (`terraformFunctions` / `disallowedTerraformFunctions`). Forbidden names are
//! never registered here — calling one simply isn't found, so the expression falls back to its
//! source-text wrap like any other unresolvable call.

use chrono::{DateTime, Duration, Utc};

use crate::error::EvalError;
use crate::value::Value;

pub type FuncResult = Result<Value, EvalError>;

/// Names this evaluator explicitly refuses to resolve, even though nothing else stops a module
/// author from writing them. Kept only so a reader can see the boundary; `call` never consults
/// this list because these names are simply absent from `call`'s match.
pub const FORBIDDEN: &[&str] = &[
    "abspath",
    "dirname",
    "pathexpand",
    "basename",
    "file",
    "fileexists",
    "fileset",
    "filebase64",
    "templatefile",
];

/// Dispatches a function call by name. Returns `Err(EvalError::UnknownFunction)` for anything
/// not in the allowed list (including everything in [`FORBIDDEN`]).
pub fn call(name: &str, args: &[Value]) -> FuncResult {
    match name {
        "abs" => numeric1(args, name, f64::abs),
        "ceil" => numeric1(args, name, f64::ceil),
        "floor" => numeric1(args, name, f64::floor),
        "log" => log(args),
        "max" => fold_numeric(args, name, f64::max),
        "min" => fold_numeric(args, name, f64::min),
        "parseint" => parseint(args),
        "pow" => pow(args),
        "signum" => numeric1(args, name, f64::signum),

        "chomp" => chomp(args),
        "format" => format_fn(args),
        "formatlist" => formatlist(args),
        "indent" => indent(args),
        "join" => join(args),
        "split" => split(args),
        "strrev" => strrev(args),
        "trim" => trim(args),
        "trimprefix" => trimprefix(args),
        "trimsuffix" => trimsuffix(args),
        "trimspace" => trimspace(args),

        "chunklist" => chunklist(args),
        "concat" => concat(args),
        "distinct" => distinct(args),
        "flatten" => flatten(args),
        "length" => length(args),
        "merge" => merge(args),
        "reverse" => reverse(args),
        "sort" => sort(args),

        "csvdecode" => csvdecode(args),
        "jsondecode" => jsondecode(args),
        "jsonencode" => jsonencode(args),

        "formatdate" => formatdate(args),
        "timeadd" => timeadd(args),

        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

fn arity(args: &[Value], name: &str, n: usize) -> Result<(), EvalError> {
    if args.len() != n {
        Err(EvalError::Arity(name.to_string()))
    } else {
        Ok(())
    }
}

fn num(v: &Value, name: &str) -> Result<f64, EvalError> {
    v.as_f64()
        .ok_or_else(|| EvalError::InvalidArgument(name.to_string(), "expected number".into()))
}

fn str_arg(v: &Value, name: &str) -> Result<String, EvalError> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| EvalError::InvalidArgument(name.to_string(), "expected string".into()))
}

fn list_arg(v: &Value, name: &str) -> Result<Vec<Value>, EvalError> {
    v.as_list()
        .map(<[Value]>::to_vec)
        .ok_or_else(|| EvalError::InvalidArgument(name.to_string(), "expected list".into()))
}

fn numeric1(args: &[Value], name: &str, f: impl Fn(f64) -> f64) -> FuncResult {
    arity(args, name, 1)?;
    let n = num(&args[0], name)?;
    numeric_result(f(n))
}

fn fold_numeric(args: &[Value], name: &str, f: impl Fn(f64, f64) -> f64) -> FuncResult {
    if args.is_empty() {
        return Err(EvalError::Arity(name.to_string()));
    }
    let mut acc = num(&args[0], name)?;
    for a in &args[1..] {
        acc = f(acc, num(a, name)?);
    }
    numeric_result(acc)
}

fn numeric_result(f: f64) -> FuncResult {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Ok(Value::int(f as i64))
    } else {
        hcl::edit::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| EvalError::InvalidArgument("numeric".into(), "not finite".into()))
    }
}

fn log(args: &[Value]) -> FuncResult {
    arity(args, "log", 2)?;
    let x = num(&args[0], "log")?;
    let base = num(&args[1], "log")?;
    numeric_result(x.log(base))
}

fn pow(args: &[Value]) -> FuncResult {
    arity(args, "pow", 2)?;
    let base = num(&args[0], "pow")?;
    let exp = num(&args[1], "pow")?;
    numeric_result(base.powf(exp))
}

fn parseint(args: &[Value]) -> FuncResult {
    arity(args, "parseint", 2)?;
    let s = str_arg(&args[0], "parseint")?;
    let base = num(&args[1], "parseint")? as u32;
    i64::from_str_radix(s.trim(), base)
        .map(Value::int)
        .map_err(|_| EvalError::InvalidArgument("parseint".into(), format!("not a base-{base} integer: {s}")))
}

fn chomp(args: &[Value]) -> FuncResult {
    arity(args, "chomp", 1)?;
    let s = str_arg(&args[0], "chomp")?;
    let trimmed = s.strip_suffix("\r\n").or_else(|| s.strip_suffix('\n')).unwrap_or(&s);
    Ok(Value::string(trimmed))
}

fn format_fn(args: &[Value]) -> FuncResult {
    if args.is_empty() {
        return Err(EvalError::Arity("format".into()));
    }
    let spec = str_arg(&args[0], "format")?;
    Ok(Value::string(apply_format(&spec, &args[1..])?))
}

fn formatlist(args: &[Value]) -> FuncResult {
    if args.len() < 2 {
        return Err(EvalError::Arity("formatlist".into()));
    }
    let spec = str_arg(&args[0], "formatlist")?;
    let lists: Vec<Vec<Value>> = args[1..]
        .iter()
        .map(|a| match a.as_list() {
            Some(l) => l.to_vec(),
            None => vec![a.clone()],
        })
        .collect();
    let len = lists.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let row: Vec<Value> = lists
            .iter()
            .map(|l| l.get(i.min(l.len().saturating_sub(1))).cloned().unwrap_or(Value::Null))
            .collect();
        out.push(Value::string(apply_format(&spec, &row)?));
    }
    Ok(Value::List(out))
}

/// A small subset of Go's `fmt.Sprintf`/Terraform's `format`: `%s`, `%d`, `%v`, `%%`.
fn apply_format(spec: &str, args: &[Value]) -> Result<String, EvalError> {
    let mut out = String::new();
    let mut arg_iter = args.iter();
    let mut chars = spec.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') | Some('v') => {
                let a = arg_iter
                    .next()
                    .ok_or_else(|| EvalError::Arity("format".into()))?;
                out.push_str(&a.to_display_string());
            }
            Some('d') => {
                let a = arg_iter
                    .next()
                    .ok_or_else(|| EvalError::Arity("format".into()))?;
                out.push_str(&(num(a, "format")? as i64).to_string());
            }
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Ok(out)
}

fn indent(args: &[Value]) -> FuncResult {
    arity(args, "indent", 2)?;
    let spaces = num(&args[0], "indent")? as usize;
    let s = str_arg(&args[1], "indent")?;
    let pad = " ".repeat(spaces);
    let indented = s
        .split('\n')
        .enumerate()
        .map(|(i, line)| if i == 0 { line.to_string() } else { format!("{pad}{line}") })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Value::string(indented))
}

fn join(args: &[Value]) -> FuncResult {
    if args.len() < 2 {
        return Err(EvalError::Arity("join".into()));
    }
    let sep = str_arg(&args[0], "join")?;
    let mut parts = Vec::new();
    for a in &args[1..] {
        for item in list_arg(a, "join")? {
            parts.push(item.to_display_string());
        }
    }
    Ok(Value::string(parts.join(&sep)))
}

fn split(args: &[Value]) -> FuncResult {
    arity(args, "split", 2)?;
    let sep = str_arg(&args[0], "split")?;
    let s = str_arg(&args[1], "split")?;
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(Value::string).collect()
    };
    Ok(Value::Tuple(parts))
}

fn strrev(args: &[Value]) -> FuncResult {
    arity(args, "strrev", 1)?;
    let s = str_arg(&args[0], "strrev")?;
    Ok(Value::string(s.chars().rev().collect::<String>()))
}

fn trim(args: &[Value]) -> FuncResult {
    arity(args, "trim", 2)?;
    let s = str_arg(&args[0], "trim")?;
    let cutset = str_arg(&args[1], "trim")?;
    Ok(Value::string(s.trim_matches(|c| cutset.contains(c)).to_string()))
}

fn trimprefix(args: &[Value]) -> FuncResult {
    arity(args, "trimprefix", 2)?;
    let s = str_arg(&args[0], "trimprefix")?;
    let prefix = str_arg(&args[1], "trimprefix")?;
    Ok(Value::string(s.strip_prefix(prefix.as_str()).unwrap_or(&s).to_string()))
}

fn trimsuffix(args: &[Value]) -> FuncResult {
    arity(args, "trimsuffix", 2)?;
    let s = str_arg(&args[0], "trimsuffix")?;
    let suffix = str_arg(&args[1], "trimsuffix")?;
    Ok(Value::string(s.strip_suffix(suffix.as_str()).unwrap_or(&s).to_string()))
}

fn trimspace(args: &[Value]) -> FuncResult {
    arity(args, "trimspace", 1)?;
    let s = str_arg(&args[0], "trimspace")?;
    Ok(Value::string(s.trim().to_string()))
}

fn chunklist(args: &[Value]) -> FuncResult {
    arity(args, "chunklist", 2)?;
    let list = list_arg(&args[0], "chunklist")?;
    let size = num(&args[1], "chunklist")? as usize;
    if size == 0 {
        return Err(EvalError::InvalidArgument("chunklist".into(), "size must be > 0".into()));
    }
    let chunks: Vec<Value> = list.chunks(size).map(|c| Value::List(c.to_vec())).collect();
    Ok(Value::List(chunks))
}

fn concat(args: &[Value]) -> FuncResult {
    let mut out = Vec::new();
    for a in args {
        out.extend(list_arg(a, "concat")?);
    }
    Ok(Value::Tuple(out))
}

fn distinct(args: &[Value]) -> FuncResult {
    arity(args, "distinct", 1)?;
    let list = list_arg(&args[0], "distinct")?;
    let mut out: Vec<Value> = Vec::new();
    for item in list {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    Ok(Value::List(out))
}

fn flatten(args: &[Value]) -> FuncResult {
    arity(args, "flatten", 1)?;
    fn go(v: &Value, out: &mut Vec<Value>) {
        if let Some(list) = v.as_list() {
            for item in list {
                go(item, out);
            }
        } else {
            out.push(v.clone());
        }
    }
    let mut out = Vec::new();
    go(&args[0], &mut out);
    Ok(Value::List(out))
}

fn length(args: &[Value]) -> FuncResult {
    arity(args, "length", 1)?;
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        other => other
            .as_list()
            .map(<[Value]>::len)
            .or_else(|| other.as_entries().map(|e| e.len()))
            .ok_or_else(|| EvalError::InvalidArgument("length".into(), "expected collection or string".into()))?,
    };
    Ok(Value::int(n as i64))
}

fn merge(args: &[Value]) -> FuncResult {
    let mut out: Vec<(String, Value)> = Vec::new();
    for a in args {
        let entries = a
            .as_entries()
            .ok_or_else(|| EvalError::InvalidArgument("merge".into(), "expected map or object".into()))?;
        for (k, v) in entries {
            if let Some(slot) = out.iter_mut().find(|(ek, _)| *ek == k) {
                slot.1 = v;
            } else {
                out.push((k, v));
            }
        }
    }
    Ok(Value::Object(out))
}

fn reverse(args: &[Value]) -> FuncResult {
    arity(args, "reverse", 1)?;
    let mut list = list_arg(&args[0], "reverse")?;
    list.reverse();
    Ok(Value::List(list))
}

fn sort(args: &[Value]) -> FuncResult {
    arity(args, "sort", 1)?;
    let list = list_arg(&args[0], "sort")?;
    let mut strs: Vec<String> = list
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(|| {
            EvalError::InvalidArgument("sort".into(), "expected list of strings".into())
        }))
        .collect::<Result<_, _>>()?;
    strs.sort();
    Ok(Value::List(strs.into_iter().map(Value::string).collect()))
}

fn csvdecode(args: &[Value]) -> FuncResult {
    arity(args, "csvdecode", 1)?;
    let s = str_arg(&args[0], "csvdecode")?;
    let mut lines = s.lines().filter(|l| !l.is_empty());
    let header: Vec<String> = match lines.next() {
        Some(h) => split_csv_line(h),
        None => return Ok(Value::List(Vec::new())),
    };
    let mut rows = Vec::new();
    for line in lines {
        let fields = split_csv_line(line);
        let entries: Vec<(String, Value)> = header
            .iter()
            .cloned()
            .zip(fields.into_iter().map(Value::string))
            .collect();
        rows.push(Value::Object(entries));
    }
    Ok(Value::List(rows))
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            other => field.push(other),
        }
    }
    fields.push(field);
    fields
}

fn jsondecode(args: &[Value]) -> FuncResult {
    arity(args, "jsondecode", 1)?;
    let s = str_arg(&args[0], "jsondecode")?;
    let json: serde_json::Value = serde_json::from_str(&s)
        .map_err(|e| EvalError::InvalidArgument("jsondecode".into(), e.to_string()))?;
    Ok(Value::from_json(&json))
}

fn jsonencode(args: &[Value]) -> FuncResult {
    arity(args, "jsonencode", 1)?;
    Ok(Value::string(args[0].to_json().to_string()))
}

fn formatdate(args: &[Value]) -> FuncResult {
    arity(args, "formatdate", 2)?;
    let spec = str_arg(&args[0], "formatdate")?;
    let ts = str_arg(&args[1], "formatdate")?;
    let dt: DateTime<Utc> = ts
        .parse()
        .map_err(|_| EvalError::InvalidArgument("formatdate".into(), format!("not a valid RFC3339 timestamp: {ts}")))?;
    Ok(Value::string(render_go_date_format(&spec, &dt)))
}

fn timeadd(args: &[Value]) -> FuncResult {
    arity(args, "timeadd", 2)?;
    let ts = str_arg(&args[0], "timeadd")?;
    let duration = str_arg(&args[1], "timeadd")?;
    let dt: DateTime<Utc> = ts
        .parse()
        .map_err(|_| EvalError::InvalidArgument("timeadd".into(), format!("not a valid RFC3339 timestamp: {ts}")))?;
    let delta = parse_go_duration(&duration)
        .ok_or_else(|| EvalError::InvalidArgument("timeadd".into(), format!("not a valid duration: {duration}")))?;
    Ok(Value::string((dt + delta).to_rfc3339()))
}

/// Renders a subset of Terraform's Go-style date format tokens (`YYYY`, `MM`, `DD`, `hh`, `mm`,
/// `ss`).
fn render_go_date_format(spec: &str, dt: &DateTime<Utc>) -> String {
    spec.replace("YYYY", &format!("{:04}", dt.format("%Y")))
        .replace("MM", &format!("{:02}", dt.format("%m")))
        .replace("DD", &format!("{:02}", dt.format("%d")))
        .replace("hh", &format!("{:02}", dt.format("%H")))
        .replace("mm", &format!("{:02}", dt.format("%M")))
        .replace("ss", &format!("{:02}", dt.format("%S")))
}

/// Parses a Go-style duration string (`1h30m`, `5s`) as used by `timeadd`.
fn parse_go_duration(s: &str) -> Option<Duration> {
    let mut total = Duration::zero();
    let mut num_buf = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' || c == '-' {
            num_buf.push(c);
            continue;
        }
        let mut unit = String::from(c);
        if matches!(c, 'n' | 'u' | 'm') && chars.peek() == Some(&'s') {
            unit.push(chars.next().unwrap());
        }
        let n: f64 = num_buf.parse().ok()?;
        num_buf.clear();
        let millis = match unit.as_str() {
            "h" => n * 3_600_000.0,
            "m" => n * 60_000.0,
            "s" => n * 1_000.0,
            "ms" => n,
            "us" => n / 1_000.0,
            "ns" => n / 1_000_000.0,
            _ => return None,
        };
        total += Duration::milliseconds(millis as i64);
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_forbidden_functions() {
        assert!(matches!(call("abspath", &[]), Err(EvalError::UnknownFunction(_))));
        assert!(matches!(call("templatefile", &[]), Err(EvalError::UnknownFunction(_))));
    }

    #[test]
    fn pow_and_abs() {
        assert_eq!(call("pow", &[Value::int(2), Value::int(3)]).unwrap(), Value::int(8));
        assert_eq!(call("abs", &[Value::int(-4)]).unwrap(), Value::int(4));
    }

    #[test]
    fn join_and_split_roundtrip() {
        let parts = call("split", &[Value::string(","), Value::string("a,b,c")]).unwrap();
        assert_eq!(parts, Value::Tuple(vec![Value::string("a"), Value::string("b"), Value::string("c")]));
        let joined = call("join", &[Value::string("-"), parts]).unwrap();
        assert_eq!(joined, Value::string("a-b-c"));
    }

    #[test]
    fn csvdecode_basic() {
        let result = call("csvdecode", &[Value::string("a,b\n1,2\n3,4")]).unwrap();
        let rows = result.as_list().unwrap();
        assert_eq!(rows.len(), 2);
    }
}
