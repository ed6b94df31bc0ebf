#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wsb_core::{CapabilityMode, GroupId, RemoteEvent, StateGroup};
use wsb_state::{SessionState, StageOutcome, StateMirror};

const GROUPS: u8 = 4;

#[derive(Arbitrary, Debug)]
enum Op {
    RenameGroup { group: u8, path: String },
    RenameState { group: u8, state: u8, new_name: String },
    CurrentChanged { group: u8, name: String },
    Stage { group: u8, state: u8 },
    Acknowledge,
}

fn group_id(n: u8) -> GroupId {
    // One id past the fixture range exercises unknown references.
    GroupId::new(format!("g{}", n % (GROUPS + 1)))
}

fuzz_target!(|ops: Vec<Op>| {
    let groups = (0..GROUPS)
        .map(|i| {
            StateGroup::new(group_id(i), format!("\\G{}", i))
                .with_states(["A", "B", "C"])
                .with_current("A")
        })
        .collect();
    let mut state = SessionState::new(StateMirror::from_groups(groups), CapabilityMode::Full);

    for op in ops {
        match op {
            Op::RenameGroup { group, path } => {
                let _ = state.apply_event(&RemoteEvent::group_renamed(group_id(group), path));
            }
            Op::RenameState { group, state: index, new_name } => {
                let id = group_id(group);
                let old = state
                    .mirror
                    .get(&id)
                    .and_then(|g| g.states.get(index as usize % 3).cloned())
                    .unwrap_or_default();
                let _ = state.apply_event(&RemoteEvent::state_renamed(
                    id,
                    format!("s{}", index % 3),
                    old,
                    new_name,
                ));
            }
            Op::CurrentChanged { group, name } => {
                let _ = state.apply_event(&RemoteEvent::current_state_changed(group_id(group), name));
            }
            Op::Stage { group, state: index } => {
                let id = group_id(group);
                let Some(choice) = state
                    .mirror
                    .get(&id)
                    .and_then(|g| g.states.get(index as usize % 3).cloned())
                else {
                    assert!(state.stage_selection(&id, "A").is_err());
                    continue;
                };
                let outcome = state.stage_selection(&id, &choice).unwrap();
                assert_eq!(outcome == StageOutcome::Staged, state.pending.contains(&id));
            }
            Op::Acknowledge => state.journal.clear(),
        }

        assert_eq!(state.mirror.len(), GROUPS as usize);
        // Staged edits follow renames, so they always name a live state.
        for (id, staged) in state.pending.iter() {
            let group = state.mirror.get(id);
            assert!(group.is_some_and(|g| g.has_state(staged)));
        }
        for id in state.journal.renames().keys().chain(state.journal.current_states().keys()) {
            assert!(state.mirror.contains(id));
        }
    }
});
