//! Dependency Graph (C1): adjacency, cycle detection, levels, critical path.

use std::collections::{HashMap, HashSet};

use super::subtask::Subtask;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// subtask id -> ids of subtasks that depend on it
    pub forward: HashMap<String, Vec<String>>,
    /// subtask id -> ids it depends on
    pub reverse: HashMap<String, Vec<String>>,
    /// level index -> subtask ids at that level
    pub levels: Vec<Vec<String>>,
    pub cycles: Vec<Vec<String>>,
    pub has_cycles: bool,
    /// longest path by effort-hours, root to leaf
    pub critical_path: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl DependencyGraph {
    pub fn build(subtasks: &[Subtask]) -> Self {
        let mut forward: HashMap<String, Vec<String>> = HashMap::new();
        let mut reverse: HashMap<String, Vec<String>> = HashMap::new();

        for s in subtasks {
            forward.entry(s.id.clone()).or_default();
            reverse.entry(s.id.clone()).or_default();
        }
        for s in subtasks {
            for dep in &s.dependencies {
                forward.entry(dep.clone()).or_default().push(s.id.clone());
                reverse.entry(s.id.clone()).or_default().push(dep.clone());
            }
        }

        let cycles = detect_cycles(subtasks, &reverse);
        let has_cycles = !cycles.is_empty();
        let cyclic_ids: HashSet<&String> = cycles.iter().flatten().collect();

        let levels = if has_cycles {
            assign_levels(subtasks, &reverse, &cyclic_ids)
        } else {
            assign_levels(subtasks, &reverse, &HashSet::new())
        };

        let critical_path = if has_cycles { Vec::new() } else { critical_path(subtasks, &levels, &reverse) };

        Self { forward, reverse, levels, cycles, has_cycles, critical_path }
    }

    /// Per-level sets of size >= 2 (spec §4.1).
    pub fn parallel_groups(&self) -> Vec<Vec<String>> {
        self.levels.iter().filter(|level| level.len() >= 2).cloned().collect()
    }

    /// A valid topological order (partial, if cycles exist): concatenation of levels.
    pub fn topological_order(&self) -> Vec<String> {
        self.levels.iter().flatten().cloned().collect()
    }
}

/// DFS with three-colour marking; reports every simple cycle found, not just the first.
fn detect_cycles(subtasks: &[Subtask], reverse: &HashMap<String, Vec<String>>) -> Vec<Vec<String>> {
    let mut colors: HashMap<String, Color> = subtasks.iter().map(|s| (s.id.clone(), Color::White)).collect();
    let mut stack: Vec<String> = Vec::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    fn visit(
        id: &str,
        reverse: &HashMap<String, Vec<String>>,
        colors: &mut HashMap<String, Color>,
        stack: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        colors.insert(id.to_string(), Color::Gray);
        stack.push(id.to_string());

        if let Some(deps) = reverse.get(id) {
            for dep in deps {
                match colors.get(dep).copied().unwrap_or(Color::White) {
                    Color::White => visit(dep, reverse, colors, stack, cycles),
                    Color::Gray => {
                        let start = stack.iter().position(|x| x == dep).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[start..].to_vec();
                        cycle.push(dep.clone());
                        cycles.push(cycle);
                    }
                    Color::Black => {}
                }
            }
        }

        stack.pop();
        colors.insert(id.to_string(), Color::Black);
    }

    let mut ids: Vec<String> = subtasks.iter().map(|s| s.id.clone()).collect();
    ids.sort();
    for id in ids {
        if colors.get(&id).copied().unwrap_or(Color::White) == Color::White {
            visit(&id, reverse, &mut colors, &mut stack, &mut cycles);
        }
    }

    cycles
}

/// Kahn-style layering over the reverse graph (dependencies), excluding cyclic nodes.
fn assign_levels(subtasks: &[Subtask], reverse: &HashMap<String, Vec<String>>, exclude: &HashSet<&String>) -> Vec<Vec<String>> {
    let acyclic: Vec<&Subtask> = subtasks.iter().filter(|s| !exclude.contains(&s.id)).collect();
    let mut assigned: HashMap<String, usize> = HashMap::new();
    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut remaining: HashSet<String> = acyclic.iter().map(|s| s.id.clone()).collect();

    let mut level_idx = 0;
    while !remaining.is_empty() {
        let mut this_level: Vec<String> = remaining
            .iter()
            .filter(|id| {
                reverse
                    .get(*id)
                    .map(|deps| deps.iter().filter(|d| !exclude.contains(d)).all(|d| assigned.contains_key(d)))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        if this_level.is_empty() {
            // Remaining nodes depend on something outside the acyclic set entirely
            // (shouldn't happen for well-formed graphs); stop to avoid an infinite loop.
            break;
        }

        this_level.sort();
        for id in &this_level {
            assigned.insert(id.clone(), level_idx);
            remaining.remove(id);
        }
        levels.push(this_level);
        level_idx += 1;
    }

    levels
}

/// Longest path by cumulative effort-hours, root to leaf; ties broken by
/// lexicographic subtask id for determinism.
fn critical_path(subtasks: &[Subtask], levels: &[Vec<String>], reverse: &HashMap<String, Vec<String>>) -> Vec<String> {
    let by_id: HashMap<&String, &Subtask> = subtasks.iter().map(|s| (&s.id, s)).collect();
    let order: Vec<&String> = levels.iter().flatten().collect();

    // best_hours[id] = longest cumulative hours ending at id; best_prev[id] = predecessor on that path.
    let mut best_hours: HashMap<String, f64> = HashMap::new();
    let mut best_prev: HashMap<String, Option<String>> = HashMap::new();

    for id in &order {
        let subtask = match by_id.get(*id) {
            Some(s) => s,
            None => continue,
        };
        let deps = reverse.get(*id).cloned().unwrap_or_default();
        let own_hours = subtask.effort.hours;

        let mut best: Option<(f64, String)> = None;
        for dep in &deps {
            if let Some(&h) = best_hours.get(dep) {
                let candidate = (h, dep.clone());
                best = Some(match best {
                    None => candidate,
                    Some((bh, bid)) => {
                        if h > bh || (h == bh && dep < &bid) {
                            candidate
                        } else {
                            (bh, bid)
                        }
                    }
                });
            }
        }

        let (cumulative, prev) = match best {
            Some((h, id)) => (h + own_hours, Some(id)),
            None => (own_hours, None),
        };
        best_hours.insert((*id).clone(), cumulative);
        best_prev.insert((*id).clone(), prev);
    }

    let mut best_end: Option<(f64, String)> = None;
    for id in &order {
        if let Some(&h) = best_hours.get(*id) {
            best_end = Some(match best_end {
                None => (h, (*id).clone()),
                Some((bh, bid)) => {
                    if h > bh || (h == bh && *id < &bid) {
                        (h, (*id).clone())
                    } else {
                        (bh, bid)
                    }
                }
            });
        }
    }

    let mut path = Vec::new();
    if let Some((_, mut current)) = best_end {
        path.push(current.clone());
        while let Some(Some(prev)) = best_prev.get(&current) {
            path.push(prev.clone());
            current = prev.clone();
        }
        path.reverse();
    }
    path
}
