use super::*;
use crate::errors::EvalErrorKind;
use crate::types::Type;
use crate::value::Value;
use pretty_assertions::assert_eq;
use quasi_ir::Name;

fn n(s: &str) -> Name {
    Name::intern(s)
}

#[test]
fn define_and_lookup() {
    let env = Environment::new();
    env.define(n("x"), Value::int(1)).unwrap();
    assert_eq!(env.lookup(n("x")).unwrap(), Value::int(1));
}

#[test]
fn lookup_searches_ancestors() {
    let root = Environment::new();
    root.define(n("x"), Value::int(1)).unwrap();
    let inner = root.child().child();
    assert_eq!(inner.lookup(n("x")).unwrap(), Value::int(1));
}

#[test]
fn undefined_name_is_reported() {
    let env = Environment::new().child();
    let err = env.lookup(n("nope")).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::UndefinedName { name: "nope".into() });
    let err = env.assign(n("nope"), Value::int(1)).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::UndefinedName { name: "nope".into() });
}

#[test]
fn duplicate_in_same_scope_fails() {
    let env = Environment::new();
    env.define(n("x"), Value::int(1)).unwrap();
    let err = env.define(n("x"), Value::int(2)).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DuplicateBinding { name: "x".into() });
}

#[test]
fn shadowing_in_child_is_allowed() {
    let root = Environment::new();
    root.define(n("x"), Value::int(1)).unwrap();
    let child = root.child();
    child.define(n("x"), Value::int(2)).unwrap();
    assert_eq!(child.lookup(n("x")).unwrap(), Value::int(2));
    assert_eq!(root.lookup(n("x")).unwrap(), Value::int(1));
}

#[test]
fn assign_mutates_nearest_owner() {
    let root = Environment::new();
    root.define(n("x"), Value::int(1)).unwrap();
    let child = root.child();
    child.assign(n("x"), Value::int(5)).unwrap();
    assert_eq!(root.lookup(n("x")).unwrap(), Value::int(5));
}

#[test]
fn top_level_allows_redefinition() {
    let universe = Environment::new();
    let top = Environment::new_top_level(&universe);
    top.define(n("x"), Value::int(1)).unwrap();
    top.define(n("x"), Value::string("s")).unwrap();
    assert_eq!(top.lookup(n("x")).unwrap(), Value::string("s"));
    assert_eq!(top.len(), 2);
}

#[test]
fn closures_keep_scope_alive() {
    let captured = {
        let block = Environment::new().child();
        block.define(n("y"), Value::int(7)).unwrap();
        block.clone()
    };
    assert_eq!(captured.lookup(n("y")).unwrap(), Value::int(7));
}

#[test]
fn binding_at_resolves_by_position() {
    let root = Environment::new();
    root.define(n("a"), Value::int(1)).unwrap();
    root.define(n("b"), Value::int(2)).unwrap();
    let child = root.child();
    child.define(n("c"), Value::int(3)).unwrap();
    assert_eq!(child.binding_at(1, 1).unwrap().get(), Value::int(2));
    assert_eq!(child.binding_at(0, 0).unwrap().get(), Value::int(3));
    assert!(child.binding_at(2, 0).is_none());
}

#[test]
fn blank_identifier_is_not_bound() {
    let env = Environment::new();
    env.define(n("_"), Value::int(1)).unwrap();
    env.define(n("_"), Value::int(2)).unwrap();
    assert!(env.is_empty());
}

#[test]
fn constants_reject_assignment() {
    let env = Environment::new();
    env.define_binding(n("k"), BindingKind::Const, Type::INT, Value::int(1))
        .unwrap();
    assert!(env.assign(n("k"), Value::int(2)).is_err());
}
