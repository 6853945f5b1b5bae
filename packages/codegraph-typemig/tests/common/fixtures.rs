//! Program fixtures
//!
//! Small programs built with [`ProgramBuilder`], each returned with the
//! declarations a test seeds or inspects.

use codegraph_typemig::features::type_migration::domain::{BinaryOp, DeclId, JType, Program, ProgramBuilder};
use codegraph_typemig::features::type_migration::infrastructure::NeverCancel;
use codegraph_typemig::{MigrationPreview, TypeMigrationProcessor, ValidatedConfig};

/// `class Chain { int a, b, c, d; void link() { a = b = c = d; } }`
pub struct ChainFixture {
    pub program: Program,
    pub fields: [DeclId; 4],
}

pub fn fixture_assignment_chain() -> ChainFixture {
    let mut b = ProgramBuilder::new();
    b.file("Chain.java").class("Chain");
    let a = b.field("a", JType::int(), None);
    let bf = b.field("b", JType::int(), None);
    let c = b.field("c", JType::int(), None);
    let d = b.field("d", JType::int(), None);
    b.method("link", JType::void(), &[]);
    let (ra, rb, rc, rd) = (b.var(a), b.var(bf), b.var(c), b.var(d));
    let inner = b.assign(rc, rd);
    let middle = b.assign(rb, inner);
    let outer = b.assign(ra, middle);
    b.expr_stmt(outer);
    b.end_method().end_class();
    ChainFixture {
        program: b.finish().expect("chain fixture"),
        fields: [a, bf, c, d],
    }
}

/// An abstract `int value()` with three implementations. Two return an
/// `int` field; the third returns the literal `42`.
pub struct FamilyFixture {
    pub program: Program,
    pub base: DeclId,
    pub impls: [DeclId; 3],
    pub fields: [DeclId; 2],
}

pub fn fixture_override_family() -> FamilyFixture {
    let mut b = ProgramBuilder::new();
    b.file("Base.java").class("Base");
    let base = b.abstract_method("value", JType::int(), &[]);
    b.end_class();

    let mut impls = Vec::new();
    let mut fields = Vec::new();
    for name in ["Impl1", "Impl2"] {
        b.file(&format!("{name}.java"))
            .class_with(name, &[], vec![JType::class("Base")]);
        let count = b.field("count", JType::int(), None);
        impls.push(b.method("value", JType::int(), &[]));
        let read = b.var(count);
        b.ret(Some(read));
        b.end_method().end_class();
        fields.push(count);
    }
    b.file("Impl3.java")
        .class_with("Impl3", &[], vec![JType::class("Base")]);
    impls.push(b.method("value", JType::int(), &[]));
    let answer = b.int(42);
    b.ret(Some(answer));
    b.end_method().end_class();

    FamilyFixture {
        program: b.finish().expect("family fixture"),
        base,
        impls: [impls[0], impls[1], impls[2]],
        fields: [fields[0], fields[1]],
    }
}

/// `class Label { String s; void show() { String r = s + 1; } }` plus an
/// empty `Text` class to migrate `s` to.
pub struct ConcatFixture {
    pub program: Program,
    pub text: DeclId,
}

pub fn fixture_string_concat() -> ConcatFixture {
    let mut b = ProgramBuilder::new();
    b.file("Label.java").class("Text").end_class();
    b.class("Label");
    let s = b.field("s", JType::string(), None);
    b.method("show", JType::void(), &[]);
    let read = b.var(s);
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, read, one);
    b.local("r", JType::string(), Some(sum));
    b.end_method().end_class();
    ConcatFixture {
        program: b.finish().expect("concat fixture"),
        text: s,
    }
}

/// `void check() { Object o = null; if (o == null) { } }`
pub struct NullCheckFixture {
    pub program: Program,
    pub local: DeclId,
}

pub fn fixture_null_check() -> NullCheckFixture {
    let mut b = ProgramBuilder::new();
    b.file("Check.java").class("Check");
    b.method("check", JType::void(), &[]);
    let null = b.null();
    let o = b.local("o", JType::object(), Some(null));
    let read = b.var(o);
    let other = b.null();
    let test = b.binary(BinaryOp::Eq, read, other);
    b.if_then(test, |_| {});
    b.end_method().end_class();
    NullCheckFixture {
        program: b.finish().expect("null check fixture"),
        local: o,
    }
}

/// `class Counter { int count; int next() { return count + 1; } }`
pub fn fixture_counter() -> Program {
    let mut b = ProgramBuilder::new();
    b.file("Counter.java").class("Counter");
    let count = b.field("count", JType::int(), None);
    b.method("next", JType::int(), &[]);
    let read = b.var(count);
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, read, one);
    b.ret(Some(sum));
    b.end_method().end_class();
    b.finish().expect("counter fixture")
}

/// Preview one seed with the default configuration.
pub fn preview_default(program: &Program, seed: DeclId, ty: JType) -> MigrationPreview {
    let processor = TypeMigrationProcessor::new(program, ValidatedConfig::default()).expect("processor");
    processor.preview(&[(seed, ty)], &NeverCancel).expect("preview")
}
