//! Flattening a relation and its dependencies into one statement.
//!
//! Parents are visited before the nodes depending on them, so the emitted
//! `WITH` list always defines a name before it is referenced. Relations in the
//! catalog are leaves: they are referenced by name and never inlined.

use std::collections::HashSet;

use super::DataFrame;

impl DataFrame {
    /// All relations this one depends on, followed by this relation itself.
    ///
    /// Every relation appears exactly once, after all of its parents.
    pub fn lineage(&self) -> Vec<DataFrame> {
        let mut visited = HashSet::new();
        let mut lineage = Vec::new();
        depth_first_search(self, &mut visited, &mut lineage);
        lineage
    }

    /// The complete statement for this relation.
    ///
    /// Produces `WITH a AS (...), b AS (...) <query>`, or just the query when
    /// there is nothing to inline.
    pub fn build_full_query(&self) -> String {
        let ctes: Vec<String> = self
            .lineage()
            .iter()
            .filter(|df| df.name() != self.name())
            .map(|df| format!("{} AS ({})", df.name(), df.query()))
            .collect();

        if ctes.is_empty() {
            return self.query().to_string();
        }
        format!("WITH {} {}", ctes.join(", "), self.query())
    }
}

fn depth_first_search<'a>(
    df: &'a DataFrame,
    visited: &mut HashSet<&'a str>,
    lineage: &mut Vec<DataFrame>,
) {
    visited.insert(df.name());
    for parent in df.parents() {
        if !visited.contains(parent.name()) && !parent.in_catalog() {
            depth_first_search(parent, visited, lineage);
        }
    }
    lineage.push(df.clone());
}
