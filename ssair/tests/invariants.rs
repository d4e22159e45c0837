use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use ssair::value::{DefSite, UseSite};
use ssair::{BlockId, DataFile, DataType, EdgeKind, FunctionId, InsnId, Operation, Program, ProgramType, ValueId};

fn program() -> (Program, FunctionId) {
    let mut prog = Program::new(ProgramType::Compute);
    let func = prog.new_function("main", 0);
    (prog, func)
}

fn check_use_def(prog: &Program) {
    for value in prog.value_ids() {
        for &site in prog.value(value).uses() {
            assert_eq!(Some(value), prog.ref_at(site).get());
        }
        for &site in prog.value(value).defs() {
            assert_eq!(Some(value), prog.insn(site.insn).get_def(site.index as usize));
        }
    }

    for insn in prog.insn_ids() {
        let data = prog.insn(insn);
        for slot in data.ref_slots() {
            let site = UseSite { insn, slot };
            let value = prog.ref_at(site).get().unwrap();
            assert!(prog.value(value).uses().contains(&site));
        }
        for d in 0..data.def_count() {
            let value = data.get_def(d).unwrap();
            let site = DefSite { insn, index: d as u8 };
            assert!(prog.value(value).defs().contains(&site));
        }
        assert!(data.srcs().iter().all(|r| r.exists()));
        assert!(data.defs().iter().all(|d| d.exists()));
    }
}

fn check_segments(prog: &Program, bb: BlockId) {
    let insns: Vec<InsnId> = prog.block_insns(bb).collect();
    let block = prog.block(bb);
    assert_eq!(insns.len(), block.num_insns());

    let phis = insns.iter().take_while(|&&i| prog.insn(i).is_phi()).count();
    assert!(insns[phis..].iter().all(|&i| !prog.insn(i).is_phi()));

    assert_eq!(if phis > 0 { insns.first().copied() } else { None }, block.phi());
    assert_eq!(insns.get(phis).copied(), block.entry());
    assert_eq!(insns.last().copied(), block.exit());
    for &insn in &insns {
        assert_eq!(Some(bb), prog.insn(insn).bb());
    }
}

#[derive(Clone, Debug)]
enum Insert {
    Head(bool),
    Tail(bool),
}

fn inserts() -> impl Strategy<Value = Vec<Insert>> {
    prop::collection::vec(
        prop_oneof![any::<bool>().prop_map(Insert::Head), any::<bool>().prop_map(Insert::Tail)],
        0..24,
    )
}

#[derive(Clone, Debug)]
enum Edit {
    Set(usize, usize),
    Clear(usize),
    Modify(usize),
}

fn edits() -> impl Strategy<Value = Vec<Edit>> {
    prop::collection::vec(
        prop_oneof![
            (0..5usize, 0..4usize).prop_map(|(s, v)| Edit::Set(s, v)),
            (0..5usize).prop_map(Edit::Clear),
            (0..5usize).prop_map(Edit::Modify),
        ],
        0..32,
    )
}

// every node but the first gets a parent with a lower index, plus extra
// forward-pointing edges
fn dags() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..10usize).prop_flat_map(|n| {
        let parents: Vec<_> = (1..n).map(|j| (0..j).prop_map(move |p| (p, j))).collect();
        let extra = prop::collection::vec((0..n, 0..n), 0..n * 2);
        (Just(n), parents, extra).prop_map(|(n, parents, extra)| {
            let mut edges: BTreeSet<(usize, usize)> = parents.into_iter().collect();
            edges.extend(extra.into_iter().filter(|(a, b)| a < b));
            (n, edges.into_iter().collect())
        })
    })
}

proptest! {
    #[test]
    fn test_phis_stay_in_front(ops in inserts()) {
        let (mut prog, func) = program();
        let bb = prog.new_block(func);

        for op in &ops {
            let (head, phi) = match *op {
                Insert::Head(phi) => (true, phi),
                Insert::Tail(phi) => (false, phi),
            };
            let op = if phi { Operation::Phi } else { Operation::Nop };
            let insn = prog.new_insn(op, DataType::U32);
            if head {
                prog.insert_head(bb, insn);
            } else {
                prog.insert_tail(bb, insn);
            }
            check_segments(&prog, bb);
        }

        prop_assert_eq!(ops.len(), prog.block(bb).num_insns());
    }

    #[test]
    fn test_split_keeps_instruction_sequence(ops in inserts(), at in any::<prop::sample::Index>(), after in any::<bool>()) {
        let (mut prog, func) = program();
        let bb = prog.new_block(func);
        let next = prog.new_block(func);
        prog.set_entry(func, bb);
        prog.attach_blocks(bb, next, EdgeKind::Tree);

        for op in &ops {
            let (head, phi) = match *op {
                Insert::Head(phi) => (true, phi),
                Insert::Tail(phi) => (false, phi),
            };
            let insn = prog.new_insn(if phi { Operation::Phi } else { Operation::Nop }, DataType::U32);
            if head {
                prog.insert_head(bb, insn);
            } else {
                prog.insert_tail(bb, insn);
            }
        }

        let before: Vec<InsnId> = prog.block_insns(bb).collect();
        let plain: Vec<InsnId> = before.iter().copied().filter(|&i| !prog.insn(i).is_phi()).collect();
        let pivot = if plain.is_empty() { None } else { Some(plain[at.index(plain.len())]) };

        let tail = if after {
            prog.split_after(bb, pivot, true)
        } else {
            prog.split_before(bb, pivot, true)
        };

        let mut joined: Vec<InsnId> = prog.block_insns(bb).collect();
        joined.extend(prog.block_insns(tail));
        prop_assert_eq!(before, joined);
        check_segments(&prog, bb);
        check_segments(&prog, tail);

        prop_assert_eq!(vec![tail], prog.successors(bb));
        prop_assert_eq!(vec![next], prog.successors(tail));
    }

    #[test]
    fn test_sources_keep_use_lists(edits in edits()) {
        let (mut prog, func) = program();
        let values: Vec<ValueId> = (0..4)
            .map(|_| prog.new_lvalue_typed(func, DataFile::Gpr, DataType::F32))
            .collect();
        let insn = prog.new_insn(Operation::Mad, DataType::F32);
        prog.set_def(insn, 0, Some(values[0]));

        let mut model: Vec<ValueId> = Vec::new();
        for edit in edits {
            match edit {
                Edit::Set(s, v) => {
                    let s = s.min(model.len());
                    prog.set_src(insn, s, Some(values[v]));
                    if s == model.len() {
                        model.push(values[v]);
                    } else {
                        model[s] = values[v];
                    }
                }
                Edit::Clear(s) => {
                    prog.set_src(insn, s.min(model.len()), None);
                    if s < model.len() {
                        model.remove(s);
                    }
                }
                Edit::Modify(s) => {
                    if s < model.len() {
                        prog.set_src_modifier(insn, s, ssair::Modifier::NEG);
                    }
                }
            }

            check_use_def(&prog);
            let actual: Vec<ValueId> = (0..prog.insn(insn).src_count())
                .filter_map(|s| prog.insn(insn).get_src(s))
                .collect();
            prop_assert_eq!(&model, &actual);
        }

        for (v, &value) in values.iter().enumerate() {
            let count = model.iter().filter(|&&m| m == value).count();
            prop_assert_eq!(count, prog.value(value).use_count(), "value {}", v);
        }
    }

    #[test]
    fn test_cfg_order_follows_predecessors((n, edges) in dags()) {
        let (mut prog, func) = program();
        let blocks: Vec<BlockId> = (0..n).map(|_| prog.new_block(func)).collect();
        prog.set_entry(func, blocks[0]);
        for &(a, b) in &edges {
            prog.attach_blocks(blocks[a], blocks[b], EdgeKind::Unknown);
        }

        let order = prog.cfg_order(func);
        prop_assert_eq!(n, order.len());
        prop_assert_eq!(blocks[0], order[0]);

        let position: HashMap<BlockId, usize> = order.iter().enumerate().map(|(i, &bb)| (bb, i)).collect();
        for &(a, b) in &edges {
            prop_assert!(position[&blocks[a]] < position[&blocks[b]]);
        }

        prog.build_dominator_tree(func);
        for &bb in &blocks[1..] {
            let idom = prog.idom(bb).unwrap();
            prop_assert!(position[&idom] < position[&bb]);
            prop_assert!(prog.dominated_by(bb, blocks[0]));
        }
    }
}
