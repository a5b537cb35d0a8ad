//! Property tests for the versioned value cell: arbitrary operation
//! sequences must agree with a straightforward reference model of the
//! stage / promote / delete / prune rules.

use nogdb::version::VersionControl;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Stage(u32),
    DeleteLatest,
    DisableStaged,
    Promote,
    PruneBelow(u64),
}

#[derive(Clone, Debug, Default)]
struct Model {
    stable: Vec<(u64, bool, u32)>,
    staged: Option<(bool, u32)>,
}

impl Model {
    fn apply(&mut self, op: &Op, next_version: &mut u64) {
        match op {
            Op::Stage(value) => self.staged = Some((true, *value)),
            Op::DeleteLatest => {
                if self.staged.is_none() {
                    if let Some(&(_, _, value)) = self.stable.last() {
                        self.staged = Some((true, value));
                    }
                }
                if let Some(staged) = self.staged.as_mut() {
                    staged.0 = false;
                }
            }
            Op::DisableStaged => self.staged = None,
            Op::Promote => {
                if let Some((active, value)) = self.staged.take() {
                    *next_version += 1;
                    self.stable.push((*next_version, active, value));
                }
            }
            Op::PruneBelow(base) => {
                if !self.stable.is_empty() {
                    let keep_from = self.stable[..self.stable.len() - 1]
                        .iter()
                        .take_while(|(version, _, _)| version < base)
                        .count();
                    self.stable.drain(..keep_from);
                    if self.stable.len() == 1
                        && self.stable[0].0 < *base
                        && !self.stable[0].1
                    {
                        self.stable.clear();
                    }
                }
            }
        }
    }

    fn read_latest(&self) -> Option<u32> {
        match self.staged {
            Some((active, value)) => active.then_some(value),
            None => self
                .stable
                .last()
                .and_then(|&(_, active, value)| active.then_some(value)),
        }
    }

    fn read_at(&self, snapshot: u64) -> Option<u32> {
        self.stable
            .iter()
            .rev()
            .find(|&&(version, _, _)| version <= snapshot)
            .and_then(|&(_, active, value)| active.then_some(value))
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u32..100).prop_map(Op::Stage),
        1 => Just(Op::DeleteLatest),
        1 => Just(Op::DisableStaged),
        4 => Just(Op::Promote),
        1 => (0u64..30).prop_map(Op::PruneBelow),
    ]
}

proptest! {
    #[test]
    fn cell_agrees_with_the_model(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let cell = VersionControl::new();
        let mut model = Model::default();
        let mut next_version = 0u64;

        for op in &ops {
            let version_before = next_version;
            match op {
                Op::Stage(value) => cell.stage(*value),
                Op::DeleteLatest => cell.delete_latest(),
                Op::DisableStaged => cell.disable_staged(),
                Op::Promote => {
                    // Promote through the same version counter the model uses.
                    cell.promote(version_before + 1);
                }
                Op::PruneBelow(base) => {
                    cell.prune_stable_below(*base);
                }
            }
            model.apply(op, &mut next_version);

            prop_assert_eq!(cell.read_latest(), model.read_latest());
            for snapshot in 0..=next_version + 1 {
                prop_assert_eq!(
                    cell.read_at(snapshot),
                    model.read_at(snapshot),
                    "snapshot {} after {:?}",
                    snapshot,
                    op
                );
            }
        }
    }
}
