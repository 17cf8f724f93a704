//! Explicit task dependency graph.
//!
//! Replaces implicit "task X depends on [A, B, C]" ordering with a
//! validated DAG and a wave scheduler: a wave is the set of tasks whose
//! dependencies have all completed, waves run in order, tasks within a
//! wave are independent. Cycles and unknown dependencies are construction
//! errors, not runtime surprises.

use anyhow::{Result, anyhow, bail};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{Action, Task};

/// Validated task DAG.
#[derive(Debug)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: FxHashMap<&'static str, usize>,
}

impl TaskGraph {
    /// Build and validate a graph from task definitions.
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        let mut index = FxHashMap::default();
        for (i, task) in tasks.iter().enumerate() {
            if index.insert(task.name, i).is_some() {
                bail!("duplicate task name: {}", task.name);
            }
        }

        let graph = Self { tasks, index };
        graph.validate()?;
        Ok(graph)
    }

    /// Look up a task by name.
    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// All task names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tasks.iter().map(|t| t.name)
    }

    /// Check that every dependency exists and the graph is acyclic.
    fn validate(&self) -> Result<()> {
        for task in &self.tasks {
            for dep in task.deps {
                if !self.index.contains_key(dep) {
                    bail!("task `{}` depends on unknown task `{}`", task.name, dep);
                }
            }
        }

        // Three-color DFS cycle detection
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;

        fn visit(
            graph: &TaskGraph,
            name: &'static str,
            colors: &mut FxHashMap<&'static str, u8>,
        ) -> Result<()> {
            match colors.get(name).copied().unwrap_or(WHITE) {
                GRAY => bail!("task dependency cycle through `{name}`"),
                BLACK => return Ok(()),
                _ => {}
            }
            colors.insert(name, GRAY);
            // Task name is validated above
            for dep in graph.get(name).expect("validated").deps {
                visit(graph, dep, colors)?;
            }
            colors.insert(name, BLACK);
            Ok(())
        }

        let mut colors = FxHashMap::default();
        for task in &self.tasks {
            visit(self, task.name, &mut colors)?;
        }
        Ok(())
    }

    /// Compute execution waves for the given targets and their transitive
    /// dependencies. Every task appears exactly once; each wave's tasks
    /// have all their dependencies in earlier waves.
    pub fn execution_waves(&self, targets: &[&str]) -> Result<Vec<Vec<&'static str>>> {
        // Transitive closure of the requested targets
        let mut selected: FxHashSet<&'static str> = FxHashSet::default();
        let mut stack: Vec<&'static str> = Vec::new();
        for target in targets {
            let task = self
                .get(target)
                .ok_or_else(|| anyhow!("unknown task `{target}` (see `stamp tasks`)"))?;
            stack.push(task.name);
        }
        while let Some(name) = stack.pop() {
            if selected.insert(name) {
                stack.extend(self.get(name).expect("validated").deps);
            }
        }

        // Kahn layering over the induced subgraph
        let mut remaining: FxHashMap<&'static str, FxHashSet<&'static str>> = selected
            .iter()
            .map(|&name| {
                let deps = self
                    .get(name)
                    .expect("validated")
                    .deps
                    .iter()
                    .copied()
                    .filter(|d| selected.contains(d))
                    .collect();
                (name, deps)
            })
            .collect();

        let mut waves = Vec::new();
        while !remaining.is_empty() {
            let mut wave: Vec<&'static str> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(&name, _)| name)
                .collect();
            // validate() rejected cycles, so progress is guaranteed
            debug_assert!(!wave.is_empty());
            wave.sort_by_key(|name| self.index[name]);

            for name in &wave {
                remaining.remove(name);
            }
            for deps in remaining.values_mut() {
                for name in &wave {
                    deps.remove(name);
                }
            }
            waves.push(wave);
        }
        Ok(waves)
    }
}
