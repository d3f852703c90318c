use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use log::warn;

use crate::{
    message_meta::MessageMeta,
    tree::{
        address::{MessagePath, Segment},
        error::{ContainerError, ReceiveError, SnapshotError},
        node::{Node, NodeContext},
        snapshot::{ChildSnapshot, Snapshot},
    },
};

/// Separates the counter from the replica id in set member names. Statically
/// named children may not contain it, so the two naming schemes never collide.
pub const NAME_DELIMITER: char = ' ';

/// A node with a fixed set of named children, added at construction time.
/// The runtime's root registry is a Container, and application objects use
/// one to hold their registers, maps and nested sets.
#[derive(Clone)]
pub struct Container {
    inner: Rc<ContainerInner>,
}

struct ContainerInner {
    context: NodeContext,
    children: RefCell<BTreeMap<String, Rc<dyn Node>>>,
}

impl Container {
    pub fn new(context: NodeContext) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                context,
                children: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Constructs a child at `name` and registers it
    ///
    /// # Panics
    ///
    /// Panics if the name is taken or contains [`NAME_DELIMITER`].
    /// Consider using `try_add_child` for non-panicking error handling.
    pub fn add_child<N, F>(&self, name: &str, constructor: F) -> N
    where
        N: Node + Clone + 'static,
        F: FnOnce(NodeContext) -> N,
    {
        self.try_add_child(name, constructor)
            .expect("add_child called with an invalid name")
    }

    pub fn try_add_child<N, F>(&self, name: &str, constructor: F) -> Result<N, ContainerError>
    where
        N: Node + Clone + 'static,
        F: FnOnce(NodeContext) -> N,
    {
        let address = self.inner.context.address();
        if name.contains(NAME_DELIMITER) {
            return Err(ContainerError::ReservedDelimiter {
                address: address.clone(),
                name: name.to_string(),
                delimiter: NAME_DELIMITER,
            });
        }
        if self.inner.children.borrow().contains_key(name) {
            return Err(ContainerError::DuplicateName {
                address: address.clone(),
                name: name.to_string(),
            });
        }

        let child = constructor(self.inner.context.child(name));
        let node: Rc<dyn Node> = Rc::new(child.clone());
        self.inner
            .children
            .borrow_mut()
            .insert(name.to_string(), node);
        Ok(child)
    }

    pub fn child_names(&self) -> Vec<String> {
        self.inner.children.borrow().keys().cloned().collect()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.inner.children.borrow().contains_key(name)
    }

    fn child(&self, name: &str) -> Option<Rc<dyn Node>> {
        self.inner.children.borrow().get(name).cloned()
    }

    fn children(&self) -> Vec<(String, Rc<dyn Node>)> {
        self.inner
            .children
            .borrow()
            .iter()
            .map(|(name, node)| (name.clone(), node.clone()))
            .collect()
    }
}

impl Node for Container {
    fn context(&self) -> &NodeContext {
        &self.inner.context
    }

    fn receive(&self, path: &mut MessagePath, meta: &MessageMeta) -> Result<(), ReceiveError> {
        let address = self.inner.context.address();
        match path.next_segment() {
            Some(Segment::Name(name)) => match self.child(&name) {
                Some(child) => child.receive(path, meta),
                None => {
                    warn!("Dropping op for unknown child {:?} of {}", name, address);
                    Ok(())
                }
            },
            Some(Segment::Payload(_)) => Err(ReceiveError::UnexpectedPayload {
                address: address.clone(),
            }),
            None => Err(ReceiveError::EmptyPath {
                address: address.clone(),
            }),
        }
    }

    fn save(&self) -> Snapshot {
        let children = self
            .children()
            .into_iter()
            .map(|(name, child)| ChildSnapshot {
                name,
                snapshot: child.save(),
                args: None,
            })
            .collect();
        Snapshot::Children(children)
    }

    fn load(&self, snapshot: Option<Snapshot>) -> Result<(), SnapshotError> {
        let mut saved = match snapshot {
            None => BTreeMap::new(),
            Some(Snapshot::Children(children)) => children
                .into_iter()
                .map(|child| (child.name, child.snapshot))
                .collect(),
            Some(Snapshot::Leaf(_)) => {
                return Err(SnapshotError::UnexpectedShape {
                    address: self.inner.context.address().clone(),
                    expected: "container",
                })
            }
        };

        for (name, child) in self.children() {
            child.load(saved.remove(&name))?;
        }
        for name in saved.keys() {
            warn!(
                "Snapshot for {} has no matching child {:?}, skipping",
                self.inner.context.address(),
                name
            );
        }
        Ok(())
    }
}
