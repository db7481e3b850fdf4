//! Route table → dispatch automaton.
//!
//! # Layout
//! ```text
//! routes (table order)       program
//! 0 /articles/:id            0  cmp "/"    else fail
//! 1 /users                   1  cmp "art"  else → 5
//! 2 /users/:id               2  cmp "icl"  else → 5
//! 3 /users/:id/edit          3  cmp "es/"  else → 5
//!                            4  route 0
//!                            5  set-cursor 1
//!                            6  cmp "use"  else fail
//!                            7  cmp "rs"   else fail
//!                            8  route 1
//!                            9  cmp "/"    else fail
//!                           10  route 2
//!                           11  route 3
//! ```
//! Adjacent routes sharing their next literal byte form one branch. A branch
//! opens with `set-cursor` (except where the cursor is already in place),
//! compares the bytes all its routes share, three at a time, then recurses.
//! A failed compare skips to the end of its branch. Route terminals come out
//! in table order and every jump points forward.

use crate::routing::automaton::{Automaton, Instruction, Jump, MAX_COMPARE};
use crate::routing::table::RouteTable;

/// Compile a route table snapshot into an automaton.
pub fn compile(table: &RouteTable) -> Automaton {
    let entries: Vec<(usize, &[u8])> = table
        .iter()
        .enumerate()
        .map(|(i, route)| (i, route.prefix().as_bytes()))
        .collect();

    let mut program = Vec::new();
    emit(&mut program, &entries, 0);

    // Falling off the end of the program is a miss.
    let end = program.len();
    for instruction in &mut program {
        if let Instruction::Compare { on_mismatch, .. } = instruction {
            if *on_mismatch == Jump::To(end) {
                *on_mismatch = Jump::Fail;
            }
        }
    }

    tracing::debug!(
        routes = table.len(),
        instructions = program.len(),
        "Compiled route automaton"
    );
    Automaton::new(program, table.clone())
}

/// Emit code for `entries`, all of which share `prefix[..depth]`.
fn emit(out: &mut Vec<Instruction>, entries: &[(usize, &[u8])], depth: usize) {
    let mut cursor_in_place = true;
    let mut i = 0;

    while i < entries.len() {
        let (index, prefix) = entries[i];
        if prefix.len() == depth {
            out.push(Instruction::Route(index));
            i += 1;
            continue;
        }

        let lead = prefix[depth];
        let run_len = entries[i..]
            .iter()
            .take_while(|(_, p)| p.len() > depth && p[depth] == lead)
            .count();
        let run = &entries[i..i + run_len];
        let shared = shared_len(run, depth);

        if !cursor_in_place {
            out.push(Instruction::SetCursor(depth));
        }

        let first_compare = out.len();
        for chunk in prefix[depth..shared].chunks(MAX_COMPARE) {
            let mut bytes = [0u8; MAX_COMPARE];
            bytes[..chunk.len()].copy_from_slice(chunk);
            out.push(Instruction::Compare {
                bytes,
                len: chunk.len() as u8,
                on_mismatch: Jump::Fail,
            });
        }

        emit(out, run, shared);

        let end = out.len();
        for instruction in &mut out[first_compare..] {
            if let Instruction::Compare { on_mismatch, .. } = instruction {
                // Nested branches already point at or before `end`.
                if *on_mismatch == Jump::Fail {
                    *on_mismatch = Jump::To(end);
                }
            }
        }

        cursor_in_place = false;
        i += run_len;
    }
}

/// Length of the prefix shared by every entry in `run`. Each entry is
/// longer than `depth` and agrees on the byte at `depth`.
fn shared_len(run: &[(usize, &[u8])], depth: usize) -> usize {
    let first = run[0].1;
    run[1..].iter().fold(first.len(), |len, (_, p)| {
        let common = first[depth..len]
            .iter()
            .zip(&p[depth..])
            .take_while(|(a, b)| a == b)
            .count();
        depth + common
    })
}
