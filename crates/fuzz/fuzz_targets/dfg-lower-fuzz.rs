#![no_main]

use std::hint::black_box;

use libfuzzer_sys::fuzz_target;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use weft_dfg::lower::{NoAlias, SingleRegion};
use weft_dfg::{Error, Options, Session, Text};
use weft_ir::builder::{i1, i32};
use weft_ir::{BinOp, BlockId, Function, FunctionBuilder, Inequality, Predicate, Type, Value};

const BIN_OPS: [BinOp; 5] = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::And, BinOp::Xor];

enum Exit {
    Ret,
    Br(BlockId),
    CondBr(BlockId, BlockId),
}

/// A random function that's valid SSA, though not necessarily a reducible one.
///
/// Values only flow within a block or come from parameters and constants, phis only take
/// parameters and constants, so dominance always holds no matter the shape of the CFG.
fn generate(rng: &mut StdRng) -> Function {
    let len = rng.random_range(1..8_u32);

    // the entry can't be a branch target.
    let target = |rng: &mut StdRng| BlockId(rng.random_range(1..len.max(2)));

    let exits: Vec<Exit> = (0..len)
        .map(|_| match rng.random_range(..3_u8) {
            _ if len == 1 => Exit::Ret,
            0 => Exit::Ret,
            1 => Exit::Br(target(rng)),
            _ => Exit::CondBr(target(rng), target(rng)),
        })
        .collect();

    let mut preds = vec![Vec::new(); len as usize];
    for (idx, exit) in exits.iter().enumerate() {
        let targets = match *exit {
            Exit::Ret => [None, None],
            Exit::Br(a) => [Some(a), None],
            Exit::CondBr(a, b) => [Some(a), Some(b)],
        };

        for target in targets.into_iter().flatten() {
            let list: &mut Vec<BlockId> = &mut preds[target.index()];
            if !list.contains(&BlockId(idx as u32)) {
                list.push(BlockId(idx as u32));
            }
        }
    }

    let mut b = FunctionBuilder::new("fuzz");
    let x = b.param("x", Type::I32);
    let ptr = b.param("p", Type::Ptr);

    let blocks: Vec<BlockId> = (0..len).map(|idx| b.block(format!("b{idx}"))).collect();

    for (block, exit) in blocks.iter().zip(&exits) {
        b.switch_to(*block);

        let mut values = vec![x, i32(rng.random())];
        let block_preds = &preds[block.index()];

        if !block_preds.is_empty() && rng.random_bool(0.5) {
            let incoming = block_preds
                .iter()
                .map(|pred| (*pred, if rng.random_bool(0.5) { x } else { i32(rng.random()) }))
                .collect();

            values.push(b.phi(Type::I32, incoming));
        }

        for _ in 0..rng.random_range(..6_u8) {
            let lhs = values[rng.random_range(..values.len())];
            let rhs = values[rng.random_range(..values.len())];

            let value = match rng.random_range(..4_u8) {
                0 => b.load(Type::I32, ptr),
                1 => {
                    b.store(ptr, lhs);
                    continue;
                }
                _ => b.binary(BIN_OPS[rng.random_range(..BIN_OPS.len())], lhs, rhs),
            };

            values.push(value);
        }

        let last = values[values.len() - 1];
        match *exit {
            Exit::Ret => b.ret(Some(last)),
            Exit::Br(target) => b.br(target),
            Exit::CondBr(if_true, if_false) => {
                let cond = match rng.random_bool(0.8) {
                    true => b.icmp(Predicate::Inequality(Inequality::Slt), last, x),
                    false => i1(rng.random()),
                };

                b.cond_br(cond, if_true, if_false);
            }
        }
    }

    b.finish()
}

/// Strict lowering may refuse loops and memory it can't settle on its own, permissive lowering
/// only refuses input it can't represent at all.
fn check(result: Result<weft_dfg::Graph, Error>, strict: bool) {
    match result {
        Ok(graph) => {
            black_box(graph.emit(&Text::default()));
        }

        Err(Error::UnsupportedInput(_)) => {}

        Err(Error::UnresolvedLoopStructure { .. } | Error::UnboundMemoryAccess { .. })
            if strict => {}

        Err(err) => panic!("lowering produced a malformed graph: {err}"),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut seed = [0; 8];
    let len = data.len().min(8);
    seed[..len].copy_from_slice(&data[..len]);

    let mut rng = StdRng::seed_from_u64(u64::from_le_bytes(seed));
    let func = generate(&mut rng);
    weft_ir::assert_well_formed(&func);

    check(Session::new(Options::strict()).lower(&func, &mut SingleRegion), true);
    check(Session::new(Options::permissive()).lower(&func, &mut NoAlias), false);
});
