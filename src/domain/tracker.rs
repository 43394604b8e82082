use std::{
    collections::{BTreeSet, HashMap},
    time::Instant,
};

use itertools::Itertools;

use crate::constants::INDENT_WIDTH;

use super::{Category, CategoryKey, RunState, TrackerError, format_elapsed};

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Direction for reordering a category among its siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One line of the rendered tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    pub depth: usize,
    pub key: CategoryKey,
    pub name: String,
    pub running: bool,
    pub total_seconds: u64,
    pub elapsed: String,
}

/// Arena of categories addressed by shortcut key. Parent and child links are
/// keys resolved through `index`, so the tree never holds references to itself.
#[derive(Clone, Debug)]
pub struct Tracker {
    index: HashMap<CategoryKey, Category>,
    running: BTreeSet<CategoryKey>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(
            CategoryKey::ROOT,
            Category::new(CategoryKey::ROOT, "Total", None),
        );
        Self {
            index,
            running: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> &Category {
        &self.index[&CategoryKey::ROOT]
    }

    pub fn get(&self, key: CategoryKey) -> Option<&Category> {
        self.index.get(&key)
    }

    pub fn category(&self, key: CategoryKey) -> TrackerResult<&Category> {
        self.index.get(&key).ok_or(TrackerError::UnknownKey(key))
    }

    fn category_mut(&mut self, key: CategoryKey) -> TrackerResult<&mut Category> {
        self.index
            .get_mut(&key)
            .ok_or(TrackerError::UnknownKey(key))
    }

    pub fn contains(&self, key: CategoryKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Number of user categories, root excluded.
    pub fn len(&self) -> usize {
        self.index.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn running(&self) -> impl Iterator<Item = CategoryKey> + '_ {
        self.running.iter().copied()
    }

    pub fn is_in_running_set(&self, key: CategoryKey) -> bool {
        self.running.contains(&key)
    }

    pub fn toggle_running(&mut self, key: CategoryKey, now: Instant) -> TrackerResult<RunState> {
        if key.is_root() {
            return Err(TrackerError::RootProtected);
        }
        let state = self.category_mut(key)?.toggle(now);
        match state {
            RunState::Running => self.running.insert(key),
            RunState::Paused => self.running.remove(&key),
        };
        Ok(state)
    }

    /// Pauses every running category but keeps the running set intact, so a
    /// later `resume_all_running` restarts exactly the same clocks.
    pub fn pause_all_running(&mut self, now: Instant) {
        for key in &self.running {
            if let Some(category) = self.index.get_mut(key) {
                category.pause(now);
            }
        }
    }

    pub fn resume_all_running(&mut self, now: Instant) {
        for key in &self.running {
            if let Some(category) = self.index.get_mut(key) {
                category.play(now);
            }
        }
    }

    pub fn update_all(&mut self, now: Instant) {
        for category in self.index.values_mut() {
            category.update(now);
        }
    }

    pub fn insert_category(
        &mut self,
        key: char,
        name: impl Into<String>,
    ) -> TrackerResult<CategoryKey> {
        self.insert_category_under(key, name, CategoryKey::ROOT)
    }

    pub fn insert_category_under(
        &mut self,
        key: char,
        name: impl Into<String>,
        parent: CategoryKey,
    ) -> TrackerResult<CategoryKey> {
        if !CategoryKey::is_valid_shortcut(key) {
            return Err(TrackerError::InvalidKey(key));
        }
        let category_key = CategoryKey::new(key);
        if self.index.contains_key(&category_key) {
            return Err(TrackerError::DuplicateKey(key));
        }

        self.category_mut(parent)?.children.push(category_key);
        self.index.insert(
            category_key,
            Category::new(category_key, name, Some(parent)),
        );
        Ok(category_key)
    }

    /// Removes `key` and all of its descendants, children before parents.
    /// Returns the removed keys in that order.
    pub fn delete_subtree(&mut self, key: CategoryKey) -> TrackerResult<Vec<CategoryKey>> {
        if key.is_root() {
            return Err(TrackerError::RootProtected);
        }
        let parent = self.category(key)?.parent;

        let mut removed = Vec::new();
        self.remove_descendants(key, &mut removed);

        if let Some(parent) = parent.and_then(|parent| self.index.get_mut(&parent)) {
            parent.children.retain(|child| *child != key);
        }
        self.running.remove(&key);
        self.index.remove(&key);
        removed.push(key);

        Ok(removed)
    }

    fn remove_descendants(&mut self, key: CategoryKey, removed: &mut Vec<CategoryKey>) {
        let children = self
            .index
            .get(&key)
            .map(|category| category.children.clone())
            .unwrap_or_default();

        for child in children {
            self.remove_descendants(child, removed);
            self.running.remove(&child);
            self.index.remove(&child);
            removed.push(child);
        }
    }

    /// Moves a category one slot among its siblings. `Ok(false)` when it is
    /// already at that end.
    pub fn move_sibling(&mut self, key: CategoryKey, direction: Direction) -> TrackerResult<bool> {
        let parent = self.parent_of(key)?;
        let siblings = &mut self.category_mut(parent)?.children;
        let Some(position) = siblings.iter().position(|sibling| *sibling == key) else {
            return Ok(false);
        };

        let target = match direction {
            Direction::Up if position > 0 => position - 1,
            Direction::Down if position + 1 < siblings.len() => position + 1,
            _ => return Ok(false),
        };
        siblings.swap(position, target);
        Ok(true)
    }

    /// Makes a category the last child of its preceding sibling.
    pub fn indent(&mut self, key: CategoryKey) -> TrackerResult<bool> {
        let parent = self.parent_of(key)?;
        let siblings = &self.category(parent)?.children;
        let position = siblings.iter().position(|sibling| *sibling == key);

        match position {
            Some(position) if position > 0 => {
                let new_parent = siblings[position - 1];
                self.reparent(key, new_parent)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Moves a category up to its grandparent.
    pub fn outdent(&mut self, key: CategoryKey) -> TrackerResult<bool> {
        let parent = self.parent_of(key)?;
        match self.category(parent)?.parent {
            Some(grandparent) => {
                self.reparent(key, grandparent)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Detaches `key` from its parent and appends it to `new_parent`. Times,
    /// run states and the moved subtree itself are untouched.
    pub fn reparent(&mut self, key: CategoryKey, new_parent: CategoryKey) -> TrackerResult<()> {
        let old_parent = self.parent_of(key)?;
        if !self.contains(new_parent) {
            return Err(TrackerError::UnknownKey(new_parent));
        }
        if key == new_parent || self.is_ancestor(key, new_parent) {
            return Err(TrackerError::CyclicReparent {
                key,
                target: new_parent,
            });
        }

        self.category_mut(old_parent)?
            .children
            .retain(|child| *child != key);
        self.category_mut(new_parent)?.children.push(key);
        self.category_mut(key)?.parent = Some(new_parent);
        Ok(())
    }

    fn parent_of(&self, key: CategoryKey) -> TrackerResult<CategoryKey> {
        if key.is_root() {
            return Err(TrackerError::RootProtected);
        }
        self.category(key)?
            .parent
            .ok_or(TrackerError::RootProtected)
    }

    /// True when `ancestor` lies strictly above `key`.
    pub fn is_ancestor(&self, ancestor: CategoryKey, key: CategoryKey) -> bool {
        let mut current = self.index.get(&key).and_then(|category| category.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.index.get(&parent).and_then(|category| category.parent);
        }
        false
    }

    pub fn adjust_time(&mut self, key: CategoryKey, delta_seconds: i64) -> TrackerResult<u64> {
        Ok(self.category_mut(key)?.adjust_time(delta_seconds))
    }

    pub fn set_accumulated(&mut self, key: CategoryKey, seconds: u64) -> TrackerResult<()> {
        self.category_mut(key)?.accumulated_seconds = seconds;
        Ok(())
    }

    pub fn rename_category(&mut self, key: CategoryKey, name: impl Into<String>) -> TrackerResult<()> {
        if key.is_root() {
            return Err(TrackerError::RootProtected);
        }
        self.category_mut(key)?.name = name.into();
        Ok(())
    }

    /// Own banked seconds plus those of every descendant, as of the last
    /// `update_all`.
    pub fn effective_total(&self, key: CategoryKey) -> TrackerResult<u64> {
        let category = self.category(key)?;
        let mut total = category.accumulated_seconds;
        for child in &category.children {
            total = total.saturating_add(self.effective_total(*child)?);
        }
        Ok(total)
    }

    /// Pre-order walk of every user category with its depth below root
    /// (root's children are depth 0).
    pub fn walk(&self) -> Vec<(usize, CategoryKey)> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<(usize, CategoryKey)> = self
            .root()
            .children
            .iter()
            .rev()
            .map(|key| (0, *key))
            .collect();

        while let Some((depth, key)) = stack.pop() {
            out.push((depth, key));
            if let Some(category) = self.index.get(&key) {
                stack.extend(category.children.iter().rev().map(|child| (depth + 1, *child)));
            }
        }
        out
    }

    pub fn render(&self) -> Vec<ReportRow> {
        let mut rows: Vec<ReportRow> = self
            .walk()
            .into_iter()
            .filter_map(|(depth, key)| {
                let category = self.index.get(&key)?;
                let total_seconds = self.effective_total(key).ok()?;
                Some(ReportRow {
                    depth,
                    key: category.key,
                    name: category.name.clone(),
                    running: category.is_running(),
                    total_seconds,
                    elapsed: format_elapsed(total_seconds),
                })
            })
            .collect();

        let root = self.root();
        let root_total = self.effective_total(CategoryKey::ROOT).unwrap_or(0);
        rows.push(ReportRow {
            depth: 0,
            key: CategoryKey::ROOT,
            name: root.name.clone(),
            running: !self.running.is_empty(),
            total_seconds: root_total,
            elapsed: format_elapsed(root_total),
        });
        rows
    }

    pub fn render_text(&self) -> String {
        self.render()
            .iter()
            .map(|row| {
                if row.key.is_root() {
                    format!("{}  {}", row.name, row.elapsed)
                } else {
                    format!(
                        "{}{}: {}  {}{}",
                        " ".repeat(row.depth * INDENT_WIDTH),
                        row.key,
                        row.name,
                        row.elapsed,
                        if row.running { " *" } else { "" }
                    )
                }
            })
            .join("\n")
    }
}
