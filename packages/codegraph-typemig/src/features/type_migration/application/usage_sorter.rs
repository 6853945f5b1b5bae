//! Usage ordering
//!
//! Edits are applied so that no edit invalidates the range of a later one:
//!
//! 1. Usages owned by roots closer to the seeds come first (a topological
//!    order of the root provenance graph, cycles collapsed by Tarjan's SCC)
//! 2. Within one owner, later text positions first
//! 3. Finally, an edit whose range contains another's always waits for the
//!    inner one, so the outer edit reads already-converted text
//!
//! Usages without an owner sort after every owned usage. The result does not
//! depend on the input order.

use super::labeler::RootGraph;
use crate::features::type_migration::domain::{ElementRef, NodeRef, Program, UsageInfo, UsageKind};
use crate::shared::models::TextRange;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// File and range an edit for `usage` rewrites.
pub fn edit_range<'p>(program: &'p Program, usage: &UsageInfo) -> (&'p str, TextRange) {
    match (&usage.kind, usage.element) {
        (UsageKind::EliminatedLocal, ElementRef::Decl(decl)) => {
            let d = program.decl(decl);
            let stmt = d
                .group()
                .and_then(|g| program.group(g).stmt)
                .or(match d.parent {
                    Some(NodeRef::Stmt(s)) => Some(s),
                    _ => None,
                });
            match stmt {
                Some(s) => {
                    let s = program.stmt(s);
                    (&s.file, s.range)
                }
                None => (&d.file, d.range),
            }
        }
        (_, element) => program.element_range(element),
    }
}

/// Position of each root in a topological order of `provenance`.
fn root_ranks(provenance: &RootGraph) -> FxHashMap<ElementRef, usize> {
    let mut graph: DiGraph<ElementRef, ()> = DiGraph::new();
    let mut nodes: FxHashMap<ElementRef, NodeIndex> = FxHashMap::default();
    let mut node = |graph: &mut DiGraph<ElementRef, ()>, element: ElementRef| {
        *nodes.entry(element).or_insert_with(|| graph.add_node(element))
    };
    for (from, targets) in provenance {
        let a = node(&mut graph, *from);
        for (to, _) in targets {
            let b = node(&mut graph, *to);
            if a != b {
                graph.update_edge(a, b, ());
            }
        }
    }

    // Components come out in reverse topological order.
    let components = tarjan_scc(&graph);
    let count = components.len();
    let mut ranks = FxHashMap::default();
    for (i, component) in components.into_iter().enumerate() {
        for index in component {
            ranks.insert(graph[index], count - 1 - i);
        }
    }
    ranks
}

fn kind_rank(kind: &UsageKind) -> u8 {
    match kind {
        UsageKind::Conversion(_) => 0,
        UsageKind::NewExpression { .. } => 1,
        UsageKind::Declaration { .. } => 2,
        UsageKind::EliminatedLocal => 3,
    }
}

/// Order `usages` for application.
pub fn sort_usages(program: &Program, usages: Vec<UsageInfo>, provenance: &RootGraph) -> Vec<UsageInfo> {
    let ranks = root_ranks(provenance);
    let mut keyed: Vec<_> = usages
        .into_iter()
        .map(|usage| {
            let (file, range) = edit_range(program, &usage);
            let owner = match usage.owner_root {
                Some(owner) => (0u8, ranks.get(&owner).copied().unwrap_or(0)),
                None => (1u8, 0),
            };
            let key = (
                owner,
                file.to_string(),
                Reverse(range.start),
                range.len(),
                usage.element,
                kind_rank(&usage.kind),
            );
            (key, range, usage)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    // Inner edits before the edits whose range contains them.
    let n = keyed.len();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut pending = vec![0usize; n];
    for inner in 0..n {
        for outer in 0..n {
            let (ki, ri, _) = &keyed[inner];
            let (ko, ro, _) = &keyed[outer];
            if inner != outer && ki.1 == ko.1 && ro.strictly_contains(ri) {
                successors[inner].push(outer);
                pending[outer] += 1;
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = (0..n).filter(|i| pending[*i] == 0).map(Reverse).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(next)) = ready.pop() {
        order.push(next);
        for &outer in &successors[next] {
            pending[outer] -= 1;
            if pending[outer] == 0 {
                ready.push(Reverse(outer));
            }
        }
    }

    let mut slots: Vec<Option<UsageInfo>> = keyed.into_iter().map(|(_, _, usage)| Some(usage)).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}
