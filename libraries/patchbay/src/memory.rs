//! In-memory store backend for tests and native development.
//!
//! Behaves like the hosted service at the semantics level: merge-patch
//! creates missing parents, a `null` field value deletes that field, and
//! deleting an absent path succeeds. Clones share the same tree, so a test
//! can keep one handle for seeding and inspection while the repository
//! under test owns another.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::StoreError;
use crate::session::Session;
use crate::store::RemoteStore;

#[derive(Clone, Default)]
pub struct MemoryStore {
    root: Rc<RefCell<Value>>,
    fail_with: Rc<RefCell<Option<StoreError>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next operation fail with `error`, once.
    pub fn inject_failure(&self, error: StoreError) {
        *self.fail_with.borrow_mut() = Some(error);
    }

    fn take_failure(&self) -> Option<StoreError> {
        self.fail_with.borrow_mut().take()
    }

    fn read(&self, path: &str) -> Option<Value> {
        let root = self.root.borrow();
        let mut node = &*root;
        for segment in segments(path) {
            node = node.as_object()?.get(segment)?;
        }
        if node.is_null() { None } else { Some(node.clone()) }
    }

    fn patch(&self, path: &str, fields: Map<String, Value>) {
        let mut root = self.root.borrow_mut();
        let mut node = &mut *root;
        for segment in segments(path) {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = node
                .as_object_mut()
                .expect("node was just made an object")
                .entry(segment.to_string())
                .or_insert(Value::Null);
        }
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let target = node
            .as_object_mut()
            .expect("node was just made an object");
        for (field, value) in fields {
            if value.is_null() {
                target.remove(&field);
            } else {
                target.insert(field, value);
            }
        }
    }

    fn delete(&self, path: &str) {
        let mut parents: Vec<&str> = segments(path).collect();
        let Some(leaf) = parents.pop() else {
            *self.root.borrow_mut() = Value::Null;
            return;
        };
        let mut root = self.root.borrow_mut();
        let mut node = &mut *root;
        for segment in parents {
            match node.as_object_mut().and_then(|object| object.get_mut(segment)) {
                Some(next) => node = next,
                None => return,
            }
        }
        if let Some(object) = node.as_object_mut() {
            object.remove(leaf);
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl RemoteStore for MemoryStore {
    async fn get(&self, _session: &Session, path: &str) -> Result<Option<Value>, StoreError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        Ok(self.read(path))
    }

    async fn update(
        &self,
        _session: &Session,
        path: &str,
        fields: Value,
    ) -> Result<(), StoreError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        let Value::Object(fields) = fields else {
            return Err(StoreError::Store("merge-patch requires an object".to_string()));
        };
        self.patch(path, fields);
        Ok(())
    }

    async fn remove(&self, _session: &Session, path: &str) -> Result<(), StoreError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        self.delete(path);
        Ok(())
    }
}
