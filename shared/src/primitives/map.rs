use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::{Rc, Weak},
};

use canopy_serde::Serde;

use crate::{
    echo_policy::EchoPolicy,
    events::{EventEmitter, ListenerKey},
    message_meta::MessageMeta,
    primitives::{
        register::Register,
        serializer::{DefaultSerializer, OptionalSerializer, Serializer},
    },
    runtime::error::RuntimeError,
    tree::{
        address::{Address, MessagePath, Segment},
        error::{ReceiveError, SnapshotError},
        node::{Node, NodeContext},
        snapshot::{ChildSnapshot, Snapshot},
    },
};

/// Derived from the presence transitions of a key's bucket
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent<K, V> {
    /// Key became present, or its present value was replaced
    Set {
        key: K,
        previous: Option<V>,
        meta: MessageMeta,
    },
    /// A present key was deleted
    Delete {
        key: K,
        deleted: V,
        meta: MessageMeta,
    },
}

/// A replicated key/value map. Each key ever touched owns a bucket register
/// holding `Option<V>`; buckets are created lazily and never removed, so a
/// key's address stays stable across delete and re-set.
pub struct Map<K, V> {
    inner: Rc<MapInner<K, V>>,
}

struct MapInner<K, V> {
    context: NodeContext,
    policy: EchoPolicy,
    key_serializer: Rc<dyn Serializer<K>>,
    value_serializer: Rc<dyn Serializer<Option<V>>>,
    buckets: RefCell<BTreeMap<String, Bucket<K, V>>>,
    events: EventEmitter<MapEvent<K, V>>,
}

struct Bucket<K, V> {
    key: K,
    register: Register<Option<V>>,
}

impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: Serde + 'static, V: Serde + 'static> Map<K, V> {
    pub fn new(context: NodeContext, policy: EchoPolicy) -> Self {
        Self::with_serializers(
            context,
            policy,
            DefaultSerializer::shared(),
            DefaultSerializer::shared(),
        )
    }
}

impl<K: Clone + 'static, V: Clone + PartialEq + 'static> Map<K, V> {
    pub fn with_serializers(
        context: NodeContext,
        policy: EchoPolicy,
        key_serializer: Rc<dyn Serializer<K>>,
        value_serializer: Rc<dyn Serializer<V>>,
    ) -> Self {
        Self {
            inner: Rc::new(MapInner {
                context,
                policy,
                key_serializer,
                value_serializer: Rc::new(OptionalSerializer::new(value_serializer)),
                buckets: RefCell::new(BTreeMap::new()),
                events: EventEmitter::new(),
            }),
        }
    }

    /// # Panics
    ///
    /// Panics if the runtime isn't loaded or has been dropped.
    /// Consider using `try_set` for non-panicking error handling.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.try_set(key, value)
            .expect("Map::set called outside a loaded runtime")
    }

    /// Sets `key` to `value`. Returns the value read back after the local
    /// echo, or `None` if it will only be applied once relayed back.
    pub fn try_set(&self, key: K, value: V) -> Result<Option<V>, RuntimeError> {
        let register = self.bucket_or_insert(key);
        Ok(register.try_set(Some(value))?.flatten())
    }

    /// # Panics
    ///
    /// Panics if the runtime isn't loaded or has been dropped.
    /// Consider using `try_delete` for non-panicking error handling.
    pub fn delete(&self, key: &K) {
        self.try_delete(key)
            .expect("Map::delete called outside a loaded runtime")
    }

    /// Clears `key`. Keys that were never touched send nothing.
    pub fn try_delete(&self, key: &K) -> Result<(), RuntimeError> {
        if let Some(register) = self.bucket(key) {
            register.try_set(None)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.bucket(key).and_then(|register| register.get())
    }

    pub fn has(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of present keys
    pub fn size(&self) -> usize {
        self.inner
            .buckets
            .borrow()
            .values()
            .filter(|bucket| bucket.register.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Present entries, ordered by encoded key
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .buckets
            .borrow()
            .values()
            .filter_map(|bucket| {
                bucket
                    .register
                    .get()
                    .map(|value| (bucket.key.clone(), value))
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.entries().into_iter().map(|(_, value)| value).collect()
    }

    pub fn policy(&self) -> EchoPolicy {
        self.inner.policy
    }

    pub fn address(&self) -> &Address {
        self.inner.context.address()
    }

    pub fn on(&self, listener: impl FnMut(&MapEvent<K, V>) + 'static) -> ListenerKey {
        self.inner.events.on(listener)
    }

    pub fn off(&self, key: ListenerKey) -> bool {
        self.inner.events.off(key)
    }

    fn bucket_name(&self, key: &K) -> String {
        hex::encode(self.inner.key_serializer.serialize(key))
    }

    fn bucket(&self, key: &K) -> Option<Register<Option<V>>> {
        let name = self.bucket_name(key);
        self.inner
            .buckets
            .borrow()
            .get(&name)
            .map(|bucket| bucket.register.clone())
    }

    fn bucket_or_insert(&self, key: K) -> Register<Option<V>> {
        let name = self.bucket_name(&key);
        if let Some(bucket) = self.inner.buckets.borrow().get(&name) {
            return bucket.register.clone();
        }
        self.insert_bucket(name, key)
    }

    /// Creates the bucket for a name that arrived over the wire or in a
    /// snapshot, decoding the key from the name
    fn bucket_by_name(&self, name: &str) -> Option<Register<Option<V>>> {
        if let Some(bucket) = self.inner.buckets.borrow().get(name) {
            return Some(bucket.register.clone());
        }
        let bytes = hex::decode(name).ok()?;
        let key = self.inner.key_serializer.deserialize(&bytes).ok()?;
        // only the canonical encoding of a key may name its bucket
        if self.bucket_name(&key) != name {
            return None;
        }
        Some(self.insert_bucket(name.to_string(), key))
    }

    fn insert_bucket(&self, name: String, key: K) -> Register<Option<V>> {
        let register = Register::with_serializer(
            self.inner.context.child(&name),
            None,
            self.inner.policy,
            self.inner.value_serializer.clone(),
        );

        let map: Weak<MapInner<K, V>> = Rc::downgrade(&self.inner);
        let event_key = key.clone();
        register.on_change(move |event| {
            let Some(map) = map.upgrade() else {
                return;
            };
            let derived = match (&event.previous, &event.value) {
                (previous, Some(_)) => MapEvent::Set {
                    key: event_key.clone(),
                    previous: previous.clone(),
                    meta: event.meta.clone(),
                },
                (Some(deleted), None) => MapEvent::Delete {
                    key: event_key.clone(),
                    deleted: deleted.clone(),
                    meta: event.meta.clone(),
                },
                (None, None) => return,
            };
            map.events.emit(&derived);
        });

        self.inner.buckets.borrow_mut().insert(
            name,
            Bucket {
                key,
                register: register.clone(),
            },
        );
        register
    }
}

impl<K: Clone + 'static, V: Clone + PartialEq + 'static> Node for Map<K, V> {
    fn context(&self) -> &NodeContext {
        &self.inner.context
    }

    fn receive(&self, path: &mut MessagePath, meta: &MessageMeta) -> Result<(), ReceiveError> {
        let address = self.inner.context.address();
        match path.next_segment() {
            Some(Segment::Name(name)) => match self.bucket_by_name(&name) {
                Some(register) => register.receive(path, meta),
                None => Err(ReceiveError::InvalidChildName {
                    address: address.clone(),
                    name,
                }),
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
        let buckets: Vec<(String, Register<Option<V>>)> = self
            .inner
            .buckets
            .borrow()
            .iter()
            .map(|(name, bucket)| (name.clone(), bucket.register.clone()))
            .collect();
        Snapshot::Children(
            buckets
                .into_iter()
                .map(|(name, register)| ChildSnapshot {
                    name,
                    snapshot: register.save(),
                    args: None,
                })
                .collect(),
        )
    }

    fn load(&self, snapshot: Option<Snapshot>) -> Result<(), SnapshotError> {
        let address = self.inner.context.address();
        let children = match snapshot {
            None => return Ok(()),
            Some(Snapshot::Children(children)) => children,
            Some(Snapshot::Leaf(_)) => {
                return Err(SnapshotError::UnexpectedShape {
                    address: address.clone(),
                    expected: "map",
                })
            }
        };
        for child in children {
            let Some(register) = self.bucket_by_name(&child.name) else {
                return Err(SnapshotError::InvalidChildName {
                    address: address.clone(),
                    name: child.name,
                });
            };
            register.load(Some(child.snapshot))?;
        }
        Ok(())
    }
}
