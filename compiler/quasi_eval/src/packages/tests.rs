use super::*;
use pretty_assertions::assert_eq;

#[test]
fn sprint_spaces_only_between_non_strings() {
    let args = [Value::int(1), Value::int(2), Value::string("a"), Value::int(3)];
    assert_eq!(sprint(&args), "1 2a3");
}

#[test]
fn sprintln_always_separates() {
    let args = [Value::string("a"), Value::int(2)];
    assert_eq!(sprintln(&args), "a 2\n");
}

#[test]
fn sprintf_common_verbs() {
    let args = [Value::int(42), Value::string("go"), Value::Bool(true)];
    assert_eq!(sprintf("%d %s %t", &args), "42 go true");
    assert_eq!(sprintf("%5d|%-4s|", &args[..2]), "   42|go  |");
    assert_eq!(sprintf("%05d", &[Value::int(-42)]), "-0042");
    assert_eq!(sprintf("%x %X %#x", &[Value::int(255), Value::int(255), Value::int(255)]), "ff FF 0xff");
    assert_eq!(sprintf("%q", &[Value::string("hi\n")]), "\"hi\\n\"");
    assert_eq!(sprintf("%c", &[Value::int(65)]), "A");
    assert_eq!(sprintf("100%%", &[]), "100%");
}

#[test]
fn sprintf_floats() {
    assert_eq!(sprintf("%.2f", &[Value::float64(3.14159)]), "3.14");
    assert_eq!(sprintf("%f", &[Value::float64(1.5)]), "1.500000");
    assert_eq!(sprintf("%e", &[Value::float64(1234.5)]), "1.234500e+03");
    assert_eq!(sprintf("%v", &[Value::float64(0.5)]), "0.5");
}

#[test]
fn sprintf_reports_bad_and_missing_arguments() {
    assert_eq!(sprintf("%d", &[Value::string("x")]), "%!d(string=x)");
    assert_eq!(sprintf("%d %d", &[Value::int(1)]), "1 %!d(MISSING)");
    assert_eq!(sprintf("%d", &[Value::int(1), Value::int(2)]), "1%!(EXTRA int=2)");
}

#[test]
fn sprintf_type_verb() {
    assert_eq!(sprintf("%T %T", &[Value::int(1), Value::string("s")]), "int string");
}

#[test]
fn registry_defaults() {
    let registry = PackageRegistry::with_defaults();
    let paths: Vec<String> = registry.paths().iter().map(ToString::to_string).collect();
    assert_eq!(paths, vec!["fmt".to_string(), "strings".to_string()]);
    let fmt = registry.get("fmt");
    assert!(fmt.is_some_and(|p| p.member(Name::intern("Sprintf")).is_some()));
    assert!(registry.get("os").is_none());
}

#[test]
fn registry_register_replaces() {
    let mut registry = PackageRegistry::new();
    let mut pkg = Package::new("example.com/answer", "answer");
    pkg.insert("Value", Value::int(42));
    registry.register(pkg);
    let got = registry
        .get("example.com/answer")
        .and_then(|p| p.member(Name::intern("Value")));
    assert_eq!(got, Some(Value::int(42)));
}
