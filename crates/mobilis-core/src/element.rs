//! Declarative element trees and the name-keyed registry built from them.
//!
//! An activity describes its screen as a tree of [`DeviceElement`]s. Children
//! are owned by their parent; the parent link each child is later searched
//! under is derived when the tree is loaded into an [`ElementRegistry`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::AppiumError;
use crate::locator::{By, WaitStrategy};

/// A named element of an activity and the elements nested inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceElement {
    pub name: String,
    pub by: By,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub wait: WaitStrategy,
    #[serde(default)]
    pub children: Vec<DeviceElement>,
}

impl DeviceElement {
    pub fn new(name: impl Into<String>, by: By) -> Self {
        Self {
            name: name.into(),
            by,
            index: 0,
            wait: WaitStrategy::default(),
            children: Vec::new(),
        }
    }

    /// Pick the `index`-th match instead of the first.
    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn wait_until(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    pub fn child(mut self, child: DeviceElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = DeviceElement>) -> Self {
        self.children.extend(children);
        self
    }
}

/// A registered element with the name of the element it is searched under.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementEntry {
    pub name: String,
    pub by: By,
    pub parent: Option<String>,
    pub index: usize,
    pub wait: WaitStrategy,
}

/// Every element of an activity, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    entries: HashMap<String, ElementEntry>,
    root: Option<String>,
}

impl ElementRegistry {
    /// Registers `root` and all of its descendants.
    ///
    /// Fails with [`AppiumError::DuplicateElementName`] when a name appears
    /// twice anywhere in the tree.
    pub fn load(root: DeviceElement) -> Result<Self, AppiumError> {
        let mut registry = ElementRegistry {
            entries: HashMap::new(),
            root: Some(root.name.clone()),
        };
        let mut pending = vec![(root, None::<String>)];
        while let Some((element, parent)) = pending.pop() {
            if registry.entries.contains_key(&element.name) {
                return Err(AppiumError::DuplicateElementName(element.name));
            }
            trace!(name = %element.name, parent = ?parent, locator = %element.by, "registering element");
            // Reversed so siblings are visited in declaration order.
            for child in element.children.into_iter().rev() {
                pending.push((child, Some(element.name.clone())));
            }
            registry.entries.insert(
                element.name.clone(),
                ElementEntry {
                    name: element.name,
                    by: element.by,
                    parent,
                    index: element.index,
                    wait: element.wait,
                },
            );
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<&ElementEntry, AppiumError> {
        self.entries
            .get(name)
            .ok_or_else(|| AppiumError::ElementNameNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Name of the root element.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The chain of entries from the root down to `name`, inclusive.
    pub fn lineage(&self, name: &str) -> Result<Vec<&ElementEntry>, AppiumError> {
        let mut chain = vec![self.get(name)?];
        while let Some(parent) = chain.last().copied().and_then(|e| e.parent.as_deref()) {
            chain.push(self.get(parent)?);
        }
        chain.reverse();
        Ok(chain)
    }
}
