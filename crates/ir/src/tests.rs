use expect_test::expect;

use crate::builder::i32;
use crate::{FunctionBuilder, Inequality, Predicate, Type, assert_well_formed};

#[test]
fn counting_loop() {
    let mut b = FunctionBuilder::new("count");
    let n = b.param("n", Type::I32);

    let entry = b.block("entry");
    let body = b.block("loop");
    let exit = b.block("exit");

    b.switch_to(entry);
    b.br(body);

    b.switch_to(body);
    let i = b.phi(Type::I32, vec![(entry, i32(0))]);
    let next = b.add(i, i32(1));
    b.add_incoming(i, body, next);
    let cond = b.icmp(Predicate::Inequality(Inequality::Slt), next, n);
    b.cond_br(cond, body, exit);

    b.switch_to(exit);
    b.ret(Some(next));

    let func = b.finish();
    assert_well_formed(&func);

    assert_eq!(func.predecessors()[body.index()], [entry, body]);

    expect![[r#"
        fn count(%arg0: i32) {
        bb0: ; entry
            br bb1
        bb1: ; loop
            %0 = phi i32 [i32 0, bb0], [%1, bb1]
            %1 = add %0, i32 1
            %2 = icmp slt %1, %arg0
            br %2, bb1, bb2
        bb2: ; exit
            ret %1
        }"#]]
    .assert_eq(&func.display().to_string());
}

#[test]
#[should_panic(expected = "phi %0 must have exactly one value per predecessor")]
fn phi_missing_predecessor() {
    let mut b = FunctionBuilder::new("broken");

    let entry = b.block("entry");
    let body = b.block("loop");

    b.switch_to(entry);
    b.br(body);

    b.switch_to(body);
    let _ = b.phi(Type::I32, vec![(entry, i32(0))]);
    b.br(body);

    assert_well_formed(&b.finish());
}
