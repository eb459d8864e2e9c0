use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    hash::Hash,
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use topological_sort::TopologicalSort;

pub trait DependencyId: Eq + PartialEq + Hash + Clone + Debug {}
impl<T: Eq + PartialEq + Hash + Clone + Debug> DependencyId for T {}

/// A reference from one item to another item it must load before or after.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Dependent<T> {
    Required(T),
    Full {
        id: T,
        #[serde(default)]
        optional: bool,
    },
}

impl<T: DependencyId> Dependent<T> {
    pub fn id(&self) -> T {
        match self {
            Self::Required(id) | Self::Full { id, .. } => id.clone(),
        }
    }

    pub fn optional(&self) -> bool {
        matches!(self, Self::Full { optional: true, .. })
    }
}

pub enum DependencyOrder {
    Before,
    After,
}

pub struct DependencyLink<T: DependencyId> {
    optional: bool,
    order: DependencyOrder,
    id: T,
}

pub trait Dependency {
    type UniqueId: DependencyId;

    fn id(&self) -> Self::UniqueId;

    fn dependencies(&self) -> impl Iterator<Item = DependencyLink<Self::UniqueId>> {
        self.loads_after()
            .iter()
            .map(|dep| DependencyLink {
                optional: dep.optional(),
                order: DependencyOrder::After,
                id: dep.id(),
            })
            .chain(self.loads_before().iter().map(|dep| DependencyLink {
                optional: dep.optional(),
                order: DependencyOrder::Before,
                id: dep.id(),
            }))
    }

    fn loads_after(&self) -> &[Dependent<Self::UniqueId>];

    fn loads_before(&self) -> &[Dependent<Self::UniqueId>];
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DependencyError<T: Debug> {
    #[error("{dependent:?} requires {missing:?}, which is not available")]
    Missing { dependent: T, missing: T },

    #[error("load order contains a cycle between {0:?}")]
    Cycle(Vec<T>),

    #[error("{0:?} is listed more than once")]
    Duplicate(T),
}

/// Orders `items` so that every item appears after the items it loads after and before the
/// items it loads before. Items with no ordering constraints keep their relative input order.
pub fn sort_dependencies<T: Dependency>(
    items: Vec<T>,
) -> Result<Vec<T>, DependencyError<T::UniqueId>> {
    let mut sorter = TopologicalSort::<T::UniqueId>::new();
    let order: Vec<T::UniqueId> = items.iter().map(Dependency::id).collect();
    let mut all = HashMap::with_capacity(items.len());

    for item in items {
        let id = item.id();

        if all.contains_key(&id) {
            return Err(DependencyError::Duplicate(id));
        }

        all.insert(id, item);
    }

    for item in all.values() {
        sorter.insert(item.id());

        for dep in item.dependencies() {
            if !all.contains_key(&dep.id) {
                if !dep.optional {
                    return Err(DependencyError::Missing {
                        dependent: item.id(),
                        missing: dep.id,
                    });
                }

                continue;
            }

            let (prec, succ) = match dep.order {
                DependencyOrder::Before => (item.id(), dep.id),
                DependencyOrder::After => (dep.id, item.id()),
            };

            sorter.add_dependency(prec, succ)
        }
    }

    let mut sorted = Vec::with_capacity(all.len());

    loop {
        let mut layer = sorter.pop_all();
        if layer.is_empty() {
            break;
        }

        // Stable within a layer: fall back to the order the items were given in.
        layer.sort_by_key(|id| order.iter().position(|other| other == id));

        for key in layer {
            if let Some(item) = all.remove(&key) {
                sorted.push(item);
            }
        }
    }

    if !all.is_empty() {
        let remaining: HashSet<_> = all.into_keys().collect();
        let cycle = order
            .into_iter()
            .filter(|id| remaining.contains(id))
            .collect();

        return Err(DependencyError::Cycle(cycle));
    }

    Ok(sorted)
}
