use std::path::Path;

use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{find_nodes, lower_binding, Binding, LiteralKind};
use crate::parser::GoParser;
use crate::ConverterConfig;

fn convert_with(config: ConverterConfig, source: &str) -> FileConversion {
    let converter = TableConverter::new(config);
    let mut parser = GoParser::new().unwrap();
    converter
        .convert_source(&mut parser, Path::new("sample_test.go"), source.to_string())
        .unwrap()
}

fn convert(source: &str) -> FileConversion {
    convert_with(ConverterConfig::default(), source)
}

fn output(source: &str) -> String {
    convert(source).output.expect("source was not modified")
}

fn bindings(source: &str) -> Vec<Binding> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .unwrap();
    let tree = parser.parse(source, None).unwrap();
    find_nodes(tree.root_node(), &["var_spec", "short_var_declaration"])
        .into_iter()
        .filter_map(|node| lower_binding(node, source))
        .collect()
}

fn rejection(source: &str) -> Rejection {
    let binding = bindings(source).into_iter().next().unwrap();
    match detect(&binding, &ConverterConfig::default()) {
        Detection::NotApplicable(rejection) => rejection,
        Detection::Eligible(table) => panic!("unexpectedly eligible: {table:?}"),
    }
}

const SUM_TABLE: &str = r#"package calc

import "testing"

func TestAdd(t *testing.T) {
	tests := []struct {
		name     string
		a        int
		b        int
		expected int
	}{
		{"simple sum", 1, 2, 3},
		{"negative", -1, -2, -3},
		{"zero", 0, 0, 0},
	}

	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) {
			if got := Add(tc.a, tc.b); got != tc.expected {
				t.Errorf("Add(%d, %d) = %d, want %d", tc.a, tc.b, got, tc.expected)
			}
		})
	}
}
"#;

const SUM_MAP: &str = r#"package calc

import "testing"

func TestAdd(t *testing.T) {
	tests := map[string]struct {
		a        int
		b        int
		expected int
	}{
		"simple sum": {1, 2, 3},
		"negative": {-1, -2, -3},
		"zero": {0, 0, 0},
	}

	for name, tc := range tests {
		t.Run(name, func(t *testing.T) {
			if got := Add(tc.a, tc.b); got != tc.expected {
				t.Errorf("Add(%d, %d) = %d, want %d", tc.a, tc.b, got, tc.expected)
			}
		})
	}
}
"#;

#[test]
fn test_convert_positional_table() {
    let conversion = convert(SUM_TABLE);

    assert_eq!(conversion.output.as_deref(), Some(SUM_MAP));
    assert!(conversion.outcome.modified);
    assert_eq!(conversion.outcome.tables_converted, 1);
    assert_eq!(
        conversion.outcome.rewrites,
        RewriteStats {
            loops: 1,
            run_calls: 1,
            field_reads: 0,
        }
    );
}

#[test]
fn test_converted_output_is_stable() {
    let conversion = convert(SUM_MAP);

    assert_eq!(conversion.output, None);
    assert!(!conversion.outcome.modified);
    assert_eq!(conversion.outcome.tables_converted, 0);
}

#[test]
fn test_computed_name_leaves_file_unchanged() {
    let source = r#"package calc

func TestAdd(t *testing.T) {
	tests := []struct {
		name string
		in   int
	}{
		{"literal", 1},
		{fmt.Sprintf("case %d", 2), 2},
	}
	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) {})
	}
}
"#;
    let conversion = convert(source);

    assert_eq!(conversion.output, None);
    assert_eq!(conversion.outcome.tables_converted, 0);
    assert_eq!(conversion.outcome.rewrites.total(), 0);
}

#[test]
fn test_desc_field_and_keyed_rows() {
    let source = r#"package calc

func TestSign(t *testing.T) {
	cases := []struct {
		desc string
		in   int
	}{
		{desc: "one", in: 1},
		{
			desc: "two",
			in:   2,
		},
	}
	for _, c := range cases {
		t.Run(c.desc, func(t *testing.T) {
			if c.in < 0 {
				t.Fatal(c.desc)
			}
		})
	}
}
"#;
    let expected = r#"package calc

func TestSign(t *testing.T) {
	cases := map[string]struct {
		in   int
	}{
		"one": {in: 1},
		"two": {
			in:   2,
		},
	}
	for name, c := range cases {
		t.Run(name, func(t *testing.T) {
			if c.in < 0 {
				t.Fatal(name)
			}
		})
	}
}
"#;
    let conversion = convert(source);

    assert_eq!(conversion.output.as_deref(), Some(expected));
    assert_eq!(conversion.outcome.rewrites.run_calls, 1);
    assert_eq!(conversion.outcome.rewrites.field_reads, 1);
}

#[test]
fn test_package_level_table() {
    let source = r#"package calc

var tests = []struct {
	name string
	in   int
}{
	{"a", 1},
}

func TestX(t *testing.T) {
	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) { _ = tc.in })
	}
}
"#;
    let expected = r#"package calc

var tests = map[string]struct {
	in   int
}{
	"a": {1},
}

func TestX(t *testing.T) {
	for name, tc := range tests {
		t.Run(name, func(t *testing.T) { _ = tc.in })
	}
}
"#;
    assert_eq!(output(source), expected);
}

#[test]
fn test_explicit_and_literal_types_both_rewritten() {
    let source = "package calc\n\nvar tests []struct{ name string; in int } = []struct{ name string; in int }{{\"a\", 1}}\n";
    let expected = "package calc\n\nvar tests map[string]struct{ in int } = map[string]struct{ in int }{\"a\": {1}}\n";
    assert_eq!(output(source), expected);
}

#[test]
fn test_multi_name_field_declaration() {
    let source = r#"package calc

var tests = []struct {
	name, label string
	in          int
}{
	{"a", "first", 1},
}
"#;
    let expected = r#"package calc

var tests = map[string]struct {
	label string
	in          int
}{
	"a": {"first", 1},
}
"#;
    assert_eq!(output(source), expected);
}

#[test]
fn test_indexed_loop_keeps_its_key() {
    let source = r#"package calc

func TestX(t *testing.T) {
	tests := []struct {
		name string
	}{
		{"a"},
	}
	for i, tc := range tests {
		t.Run(tc.name, nil)
	}
}
"#;
    let result = output(source);

    assert!(result.contains("for i, tc := range tests {"));
    assert!(result.contains("t.Run(i, nil)"));
    assert!(result.contains("\"a\": {},"));
}

#[test]
fn test_value_named_like_key_leaves_table_unchanged() {
    let source = r#"package calc

func TestX(t *testing.T) {
	tests := []struct {
		name string
		in   int
	}{
		{"a", 1},
	}
	for _, name := range tests {
		t.Run(name.name, nil)
	}
}
"#;
    let conversion = convert(source);

    assert_eq!(conversion.output, None);
    assert_eq!(conversion.outcome.tables_converted, 0);
    assert!(!conversion.outcome.modified);
}

#[test]
fn test_key_used_in_loop_body_leaves_only_that_table() {
    let source = r#"package calc

func TestX(t *testing.T) {
	tests := []struct {
		name string
		in   int
	}{
		{"a", 1},
	}
	for _, tc := range tests {
		t.Run(tc.name, func(t *testing.T) {
			name := "x"
			_ = name
		})
	}
	others := []struct {
		name string
	}{
		{"b"},
	}
	for _, tc := range others {
		t.Run(tc.name, nil)
	}
}
"#;
    let conversion = convert(source);
    let result = conversion.output.unwrap();

    assert_eq!(conversion.outcome.tables_converted, 1);
    assert!(result.contains("tests := []struct {"));
    assert!(result.contains("\t\t{\"a\", 1},\n"));
    assert!(result.contains("for _, tc := range tests {\n\t\tt.Run(tc.name, func"));
    assert!(result.contains("others := map[string]struct {"));
    assert!(result.contains("for name, tc := range others {\n\t\tt.Run(name, nil)"));
}

#[test]
fn test_analysis_reports_key_in_use() {
    let source = "package p\n\nfunc f() {\n\ttests := []struct{ name string }{{\"a\"}}\n\tfor _, name := range tests {\n\t\t_ = name\n\t}\n}\n";
    let mut parser = GoParser::new().unwrap();
    let analysis = analyze_source(
        &mut parser,
        Path::new("sample_test.go"),
        source.to_string(),
        &ConverterConfig::default(),
    )
    .unwrap();

    assert_eq!(analysis.eligible_tables(), 0);
    assert_eq!(analysis.bindings[0].verdict, "loop at line 5 already uses name");
}

#[test]
fn test_row_copies_are_followed() {
    let source = r#"package calc

func TestX(t *testing.T) {
	tests := []struct {
		name string
		in   int
	}{
		{"a", 1},
	}
	for _, tc := range tests {
		tc := tc
		t.Run(tc.name, func(t *testing.T) {
			t.Log(tc.name, tc.in)
		})
	}
}
"#;
    let conversion = convert(source);
    let result = conversion.output.unwrap();

    assert!(result.contains("t.Run(name, func"));
    assert!(result.contains("t.Log(name, tc.in)"));
    assert_eq!(conversion.outcome.rewrites.run_calls, 1);
    assert_eq!(conversion.outcome.rewrites.field_reads, 1);
}

#[test]
fn test_shadowed_table_name_is_not_rewritten() {
    let source = r#"package calc

func TestA(t *testing.T) {
	tests := []struct {
		name string
	}{
		{"a"},
	}
	for _, tc := range tests {
		t.Run(tc.name, nil)
	}
}

func TestB(t *testing.T) {
	tests := []testCase{{name: "b"}}
	for _, tc := range tests {
		t.Run(tc.name, nil)
	}
}
"#;
    let conversion = convert(source);
    let result = conversion.output.unwrap();

    assert_eq!(conversion.outcome.tables_converted, 1);
    assert_eq!(conversion.outcome.rewrites.run_calls, 1);
    let (first, second) = result.split_once("func TestB").unwrap();
    assert!(first.contains("for name, tc := range tests"));
    assert!(second.contains("for _, tc := range tests"));
    assert!(second.contains("t.Run(tc.name, nil)"));
}

#[test]
fn test_assignment_loop_is_unchanged() {
    let source = r#"package calc

func TestX(t *testing.T) {
	tests := []struct {
		name string
	}{
		{"a"},
	}
	var tc struct{}
	var k string
	for k, tc = range tests {
		t.Run(k, nil)
	}
}
"#;
    let conversion = convert(source);

    assert_eq!(conversion.outcome.tables_converted, 1);
    assert_eq!(conversion.outcome.rewrites.total(), 0);
    assert!(conversion
        .output
        .unwrap()
        .contains("for k, tc = range tests {"));
}

#[test]
fn test_custom_name_fields_and_key() {
    let config = ConverterConfig {
        name_fields: vec!["title".to_string()],
        key_ident: "key".to_string(),
        ..ConverterConfig::default()
    };
    let source = r#"package calc

func TestX(t *testing.T) {
	tests := []struct {
		name  int
		title string
	}{
		{1, "one"},
	}
	for _, tc := range tests {
		t.Run(tc.title, nil)
	}
}
"#;
    let result = convert_with(config, source).output.unwrap();

    assert!(result.contains("\"one\": {1},"));
    assert!(result.contains("for key, tc := range tests {"));
    assert!(result.contains("t.Run(key, nil)"));
}

#[test]
fn test_detect_rejections() {
    assert_eq!(
        rejection("package p\n\nvar a = [2]struct{ name string }{{\"x\"}, {\"y\"}}\n"),
        Rejection::SizedSequence
    );
    assert_eq!(
        rejection("package p\n\nvar a = []Case{{\"x\"}}\n"),
        Rejection::NamedElementType
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{ in int }{{1}}\n"),
        Rejection::NoNameField
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{}{}\n"),
        Rejection::NoNameField
    );
    assert_eq!(
        rejection("package p\n\nvar a = f()\n"),
        Rejection::NoLiteralValue
    );
    assert_eq!(
        rejection("package p\n\nvar a, b = []struct{ name string }{}, 1\n"),
        Rejection::MultipleBindings
    );
    assert_eq!(
        rejection("package p\n\nvar a = map[string]struct{ in int }{}\n"),
        Rejection::NotSliceOfStruct
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{ name string }{{\"x\"}, {\"x\"}}\n"),
        Rejection::DuplicateKey {
            key: "\"x\"".to_string()
        }
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{ name string }{{\"a\"}, {`a`}}\n"),
        Rejection::DuplicateKey {
            key: "`a`".to_string()
        }
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{ name int }{{0x10}, {16}}\n"),
        Rejection::DuplicateKey {
            key: "16".to_string()
        }
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{ name string; in int }{{in: 1}}\n"),
        Rejection::MissingKey { row: 0 }
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{ name string; in int }{{\"x\", 1}, {\"y\"}}\n"),
        Rejection::UnsupportedRow { row: 1 }
    );
    assert_eq!(
        rejection("package p\n\nvar a = []struct{ name string }{{label}}\n"),
        Rejection::ComputedKey { row: 0 }
    );
    assert_eq!(
        rejection("package p\n\nvar a []struct{ name string } = []struct{ desc string }{}\n"),
        Rejection::MismatchedTypes
    );
}

#[test]
fn test_detect_first_name_field_wins() {
    let source = "package p\n\nvar a = []struct{ desc string; name string }{{\"d\", \"n\"}}\n";
    let binding = bindings(source).into_iter().next().unwrap();

    let Detection::Eligible(table) = detect(&binding, &ConverterConfig::default()) else {
        panic!("table should be eligible");
    };
    assert_eq!(table.name_field.name, "desc");
    assert_eq!(table.name_field.index, 0);
    assert_eq!(table.rows[0].key, "\"d\"");
}

#[test]
fn test_detect_empty_table_is_eligible() {
    let source = "package p\n\nvar a = []struct{ name string }{}\n";
    let binding = bindings(source).into_iter().next().unwrap();

    let detection = detect(&binding, &ConverterConfig::default());
    assert!(detection.is_eligible());
}

#[test]
fn test_batch_result_success() {
    let mut result = BatchResult::new();
    assert!(result.success());

    result.record_error("a.go".into(), "Error processing a.go: boom".to_string());
    assert!(!result.success());

    result.record(&FileOutcome {
        path: "b.go".into(),
        modified: true,
        tables_converted: 2,
        rewrites: RewriteStats::default(),
    });
    assert!(result.success());
    assert_eq!(result.files_modified, 1);
    assert_eq!(result.tables_converted, 2);
}

#[test]
fn test_analysis_reports_shapes() {
    let mut parser = GoParser::new().unwrap();
    let analysis = analyze_source(
        &mut parser,
        Path::new("sample_test.go"),
        SUM_TABLE.to_string(),
        &ConverterConfig::default(),
    )
    .unwrap();

    assert_eq!(analysis.bindings.len(), 1);
    assert_eq!(analysis.eligible_tables(), 1);
    assert_eq!(analysis.bindings[0].variable, "tests");
    assert_eq!(analysis.bindings[0].rows, 3);
    assert_eq!(analysis.loops.len(), 1);
    assert_eq!(analysis.loops[0].key.as_deref(), Some("_"));
    assert_eq!(analysis.loops[0].value.as_deref(), Some("tc"));
    assert_eq!(analysis.run_calls.len(), 1);
    assert_eq!(
        analysis.run_calls[0].first_argument.as_deref(),
        Some("selector tc.name")
    );

    let text = analysis.to_string();
    assert!(text.starts_with("===== Analyzing sample_test.go ====="));
    assert!(text.contains("convertible, keyed by name"));
}

#[test]
fn test_key_values_compare_as_go_constants() {
    let string = |text| KeyValue::of(LiteralKind::String, text);
    let int = |text| KeyValue::of(LiteralKind::Int, text);
    let rune = |text| KeyValue::of(LiteralKind::Rune, text);

    assert_eq!(string(r#""a""#), KeyValue::of(LiteralKind::RawString, "`a`"));
    assert_eq!(string(r#""\x61\u0062""#), KeyValue::Str("ab".to_string()));
    assert_eq!(string(r#""\141\n""#), KeyValue::Str("a\n".to_string()));
    assert_ne!(string(r#""a""#), string(r#""b""#));
    assert_eq!(int("1_000"), KeyValue::Int(1000));
    assert_eq!(int("0o17"), int("017"));
    assert_eq!(int("0b11"), KeyValue::Int(3));
    assert_eq!(rune("'a'"), KeyValue::Int(97));
    assert_eq!(rune(r"'\n'"), KeyValue::Int(10));
    assert_eq!(
        KeyValue::of(LiteralKind::Float, "1.5"),
        KeyValue::Text("1.5".to_string())
    );
}

#[test]
fn test_results_serialize_for_reports() {
    let value = serde_json::to_value(Rejection::KeyInUse {
        ident: "name".to_string(),
        line: 7,
    })
    .unwrap();
    assert_eq!(
        value,
        serde_json::json!({ "reason": "key_in_use", "ident": "name", "line": 7 })
    );
    assert_eq!(
        serde_json::to_value(Rejection::NoNameField).unwrap(),
        serde_json::json!({ "reason": "no_name_field" })
    );

    let mut result = BatchResult::new();
    result.record(&convert(SUM_TABLE).outcome);
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["files_processed"], 1);
    assert_eq!(value["files_modified"], 1);
    assert_eq!(value["tables_converted"], 1);
    assert_eq!(
        value["rewrites"],
        serde_json::json!({ "loops": 1, "run_calls": 1, "field_reads": 0 })
    );
    assert_eq!(value["errors"], serde_json::json!([]));
}
