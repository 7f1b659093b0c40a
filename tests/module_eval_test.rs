use std::collections::BTreeMap;

use tfeval::hcl::driver::parse_module;

fn eval_one(name: &str, source: &str) -> serde_json::Value {
    let mut files = BTreeMap::new();
    files.insert(name.to_string(), source.to_string());
    let result = parse_module(&files);
    assert!(
        result.failed_files.is_empty(),
        "unexpected parse failures: {:?}",
        result.failed_files
    );
    serde_json::from_str(&result.parsed_files[name]).expect("valid JSON output")
}

#[test]
fn duplicate_blocks_promote_to_a_list() {
    let json = eval_one("main.tf", "block \"a\" {}\nblock \"a\" {}\n");
    assert_eq!(json, serde_json::json!({"block": {"a": [{}, {}]}}));
}

#[test]
fn labelled_blocks_nest_by_label_path() {
    let json = eval_one("main.tf", "block \"x\" \"y\" {\n  nested {}\n}\n");
    assert_eq!(
        json,
        serde_json::json!({"block": {"x": {"y": {"nested": {}}}}})
    );
}

#[test]
fn arithmetic_and_functions_simplify_to_literals() {
    let json = eval_one("main.tf", "locals {\n  x = 1 + 2\n  y = pow(2, 3)\n}\n");
    assert_eq!(json, serde_json::json!({"locals": {"x": 3, "y": 8}}));
}

#[test]
fn unresolvable_conditional_falls_back_to_source_text() {
    let json = eval_one("main.tf", "locals {\n  c = foo > 2 ? 1 : 0\n}\n");
    assert_eq!(
        json["locals"]["c"],
        serde_json::json!("${foo > 2 ? 1 : 0}")
    );
}

#[test]
fn heredoc_preserves_leading_whitespace() {
    let source = "locals {\n  doc = <<-EOT\n    line one\n    line two\n  EOT\n}\n";
    let json = eval_one("main.tf", source);
    assert_eq!(json["locals"]["doc"], serde_json::json!("line one\nline two\n"));
}

#[test]
fn tfvars_and_auto_tfvars_override_defaults_in_precedence_order() {
    let mut files = BTreeMap::new();
    files.insert(
        "main.tf".to_string(),
        "variable \"dummy\" {\n  default = \"dummy\"\n}\n\nresource \"r\" \"n\" {\n  cidr_blocks = var.dummy\n}\n".to_string(),
    );
    files.insert(
        "terraform.tfvars".to_string(),
        "dummy = \"dummy_override\"\n".to_string(),
    );
    files.insert(
        "b.auto.tfvars".to_string(),
        "dummy = \"b_dummy_override\"\n".to_string(),
    );

    let result = parse_module(&files);
    assert!(result.failed_files.is_empty());
    let json: serde_json::Value = serde_json::from_str(&result.parsed_files["main.tf"]).unwrap();
    assert_eq!(
        json["resource"]["r"]["n"]["cidr_blocks"],
        serde_json::json!("b_dummy_override")
    );
}

#[test]
fn a_local_can_reference_an_input_variable() {
    let source = "variable \"v\" {\n  default = \"X\"\n}\n\nlocals {\n  l = var.v\n}\n\nresource \"r\" \"n\" {\n  a = local.l\n}\n";
    let json = eval_one("main.tf", source);
    assert_eq!(json["resource"]["r"]["n"]["a"], serde_json::json!("X"));
}

#[test]
fn invalid_hcl_is_reported_without_blocking_other_files() {
    let mut files = BTreeMap::new();
    files.insert("broken.tf".to_string(), "resource \"a\" {\n".to_string());
    files.insert(
        "ok.tf".to_string(),
        "locals {\n  x = 1\n}\n".to_string(),
    );

    let result = parse_module(&files);
    assert!(result.failed_files.contains_key("broken.tf"));
    assert!(!result.parsed_files.contains_key("broken.tf"));
    let json: serde_json::Value = serde_json::from_str(&result.parsed_files["ok.tf"]).unwrap();
    assert_eq!(json["locals"]["x"], serde_json::json!(1));
}
