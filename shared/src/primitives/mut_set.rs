use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use log::debug;

use canopy_serde::{
    decode, encode, BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger,
};

use crate::{
    echo_policy::EchoPolicy,
    events::{EventEmitter, ListenerKey},
    message_meta::MessageMeta,
    primitives::serializer::{DefaultSerializer, Serializer},
    replica_id::ReplicaId,
    runtime::error::RuntimeError,
    tree::{
        address::{Address, MessagePath, Segment},
        container::NAME_DELIMITER,
        error::{ReceiveError, SnapshotError},
        node::{Node, NodeContext},
        snapshot::{ChildSnapshot, Snapshot},
    },
};

/// Name of the member created by `sender`'s add op carrying `counter`
pub fn member_name(counter: u64, sender: &ReplicaId) -> String {
    format!("{}{}{}", to_base36(counter), NAME_DELIMITER, sender)
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// The set's own ops. Member ops travel with the member's name as a path
/// segment instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetOp {
    Add { counter: u64, args: Vec<u8> },
    Delete { name: String },
}

impl Serde for SetOp {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            SetOp::Add { counter, args } => {
                writer.write_bit(false);
                UnsignedVariableInteger::<7>::new(*counter).ser(writer);
                args.ser(writer);
            }
            SetOp::Delete { name } => {
                writer.write_bit(true);
                name.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(SetOp::Delete {
                name: String::de(reader)?,
            })
        } else {
            let counter = UnsignedVariableInteger::<7>::de(reader)?
                .try_to::<u64>()
                .ok_or(SerdeErr::IntegerOverflow {
                    type_name: "SetOp counter",
                })?;
            Ok(SetOp::Add {
                counter,
                args: Vec::<u8>::de(reader)?,
            })
        }
    }
}

#[derive(Clone, Debug)]
pub enum SetEvent<C> {
    Add { value: C, meta: MessageMeta },
    Delete { value: C, meta: MessageMeta },
}

type Constructor<C, Args> = Rc<dyn Fn(NodeContext, Args) -> C>;

/// A replicated collection of dynamically created members. Each member is
/// built from its constructor arguments by the same constructor on every
/// replica, and named after the replica that added it.
pub struct MutSet<C, Args> {
    inner: Rc<MutSetInner<C, Args>>,
}

struct MutSetInner<C, Args> {
    context: NodeContext,
    policy: EchoPolicy,
    constructor: Constructor<C, Args>,
    args_serializer: Rc<dyn Serializer<Args>>,
    members: RefCell<BTreeMap<String, Member<C>>>,
    // names whose delete has been applied; a late add never brings them back
    deleted: RefCell<BTreeSet<String>>,
    events: EventEmitter<SetEvent<C>>,
}

struct Member<C> {
    value: C,
    args: Vec<u8>,
}

impl<C, Args> Clone for MutSet<C, Args> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Node + Clone + 'static, Args: Serde + 'static> MutSet<C, Args> {
    pub fn new(
        context: NodeContext,
        policy: EchoPolicy,
        constructor: impl Fn(NodeContext, Args) -> C + 'static,
    ) -> Self {
        Self::with_serializer(context, policy, constructor, DefaultSerializer::shared())
    }
}

impl<C: Node + Clone + 'static, Args: 'static> MutSet<C, Args> {
    pub fn with_serializer(
        context: NodeContext,
        policy: EchoPolicy,
        constructor: impl Fn(NodeContext, Args) -> C + 'static,
        args_serializer: Rc<dyn Serializer<Args>>,
    ) -> Self {
        Self {
            inner: Rc::new(MutSetInner {
                context,
                policy,
                constructor: Rc::new(constructor),
                args_serializer,
                members: RefCell::new(BTreeMap::new()),
                deleted: RefCell::new(BTreeSet::new()),
                events: EventEmitter::new(),
            }),
        }
    }

    /// # Panics
    ///
    /// Panics if the runtime isn't loaded or has been dropped.
    /// Consider using `try_add` for non-panicking error handling.
    pub fn add(&self, args: Args) -> Option<C> {
        self.try_add(args)
            .expect("MutSet::add called outside a loaded runtime")
    }

    /// Sends an add op. Returns the new member if this replica builds it from
    /// the local echo, or `None` if it will only appear with the relayed copy.
    pub fn try_add(&self, args: Args) -> Result<Option<C>, RuntimeError> {
        let runtime = self.inner.context.runtime()?;
        if !runtime.is_loaded() {
            return Err(RuntimeError::NotLoaded);
        }
        let mut counter = runtime.next_counter();
        while counter < u64::MAX && self.is_taken(&member_name(counter, runtime.replica_id())) {
            counter = runtime.next_counter();
        }
        let name = member_name(counter, runtime.replica_id());
        let fresh = !self.is_taken(&name);
        let op = SetOp::Add {
            counter,
            args: self.inner.args_serializer.serialize(&args),
        };
        drop(runtime);

        self.inner.context.send(encode(&op))?;
        if fresh && self.processes_own_local_echo() {
            Ok(self.get(&name))
        } else {
            Ok(None)
        }
    }

    /// # Panics
    ///
    /// Panics if the runtime isn't loaded or has been dropped.
    /// Consider using `try_delete` for non-panicking error handling.
    pub fn delete(&self, value: &C) {
        self.try_delete(value)
            .expect("MutSet::delete called outside a loaded runtime")
    }

    /// Sends a delete op if `value` is a live member, otherwise does nothing
    pub fn try_delete(&self, value: &C) -> Result<(), RuntimeError> {
        let Some(name) = self.name_of(value) else {
            return Ok(());
        };
        self.inner.context.send(encode(&SetOp::Delete { name }))
    }

    pub fn has(&self, value: &C) -> bool {
        self.name_of(value).is_some()
    }

    /// Name of `value` if it is a live member of this set
    pub fn name_of(&self, value: &C) -> Option<String> {
        let address = value.context().address();
        let name = address.name()?;
        if address != &self.inner.context.address().child(name) {
            return None;
        }
        self.inner
            .members
            .borrow()
            .contains_key(name)
            .then(|| name.to_string())
    }

    pub fn get(&self, name: &str) -> Option<C> {
        self.inner
            .members
            .borrow()
            .get(name)
            .map(|member| member.value.clone())
    }

    /// Live members, ordered by name
    pub fn values(&self) -> Vec<C> {
        self.inner
            .members
            .borrow()
            .values()
            .map(|member| member.value.clone())
            .collect()
    }

    pub fn size(&self) -> usize {
        self.inner.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn policy(&self) -> EchoPolicy {
        self.inner.policy
    }

    pub fn address(&self) -> &Address {
        self.inner.context.address()
    }

    pub fn on(&self, listener: impl FnMut(&SetEvent<C>) + 'static) -> ListenerKey {
        self.inner.events.on(listener)
    }

    pub fn off(&self, key: ListenerKey) -> bool {
        self.inner.events.off(key)
    }

    /// Server replicas never hear their own ops relayed back, so they always
    /// build members from the local echo
    fn processes_own_local_echo(&self) -> bool {
        self.inner.policy.processes_local_echo() || self.inner.context.is_server()
    }

    fn should_process(&self, meta: &MessageMeta) -> bool {
        self.inner.policy.should_process(meta)
            || (meta.is_local_echo() && self.inner.context.is_server())
    }

    fn is_taken(&self, name: &str) -> bool {
        self.inner.members.borrow().contains_key(name)
            || self.inner.deleted.borrow().contains(name)
    }

    fn construct(&self, name: &str, args: &[u8]) -> Result<C, SerdeErr> {
        let decoded = self.inner.args_serializer.deserialize(args)?;
        let value = (self.inner.constructor)(self.inner.context.child(name), decoded);
        self.inner.members.borrow_mut().insert(
            name.to_string(),
            Member {
                value: value.clone(),
                args: args.to_vec(),
            },
        );
        Ok(value)
    }

    fn apply(&self, op: SetOp, meta: &MessageMeta) -> Result<(), ReceiveError> {
        let address = self.inner.context.address();
        match op {
            SetOp::Add { counter, args } => {
                if let Ok(runtime) = self.inner.context.runtime() {
                    runtime.observe_counter(counter);
                }
                let name = member_name(counter, meta.sender());
                if self.inner.members.borrow().contains_key(&name) {
                    debug!("Ignoring repeated add of {:?} under {}", name, address);
                    return Ok(());
                }
                if self.inner.deleted.borrow().contains(&name) {
                    debug!("Ignoring add of deleted {:?} under {}", name, address);
                    return Ok(());
                }
                let value = self
                    .construct(&name, &args)
                    .map_err(|source| ReceiveError::Decode {
                        address: address.clone(),
                        source,
                    })?;
                self.inner.events.emit(&SetEvent::Add {
                    value,
                    meta: meta.clone(),
                });
            }
            SetOp::Delete { name } => {
                let removed = self.inner.members.borrow_mut().remove(&name);
                if removed.is_some() {
                    self.inner.deleted.borrow_mut().insert(name.clone());
                }
                match removed {
                    Some(member) => self.inner.events.emit(&SetEvent::Delete {
                        value: member.value,
                        meta: meta.clone(),
                    }),
                    None => debug!("Ignoring delete of absent {:?} under {}", name, address),
                }
            }
        }
        Ok(())
    }
}

impl<C: Node + Clone + 'static, Args: 'static> Node for MutSet<C, Args> {
    fn context(&self) -> &NodeContext {
        &self.inner.context
    }

    fn receive(&self, path: &mut MessagePath, meta: &MessageMeta) -> Result<(), ReceiveError> {
        let address = self.inner.context.address();
        match path.next_segment() {
            Some(Segment::Name(name)) => match self.get(&name) {
                Some(member) => member.receive(path, meta),
                None => {
                    debug!("Dropping op for deleted member {:?} of {}", name, address);
                    Ok(())
                }
            },
            Some(Segment::Payload(payload)) => {
                if !path.is_empty() {
                    return Err(ReceiveError::TrailingSegments {
                        address: address.clone(),
                        remaining: path.len(),
                    });
                }
                if !self.should_process(meta) {
                    return Ok(());
                }
                let op = decode::<SetOp>(&payload).map_err(|source| ReceiveError::Decode {
                    address: address.clone(),
                    source,
                })?;
                self.apply(op, meta)
            }
            None => Err(ReceiveError::EmptyPath {
                address: address.clone(),
            }),
        }
    }

    fn save(&self) -> Snapshot {
        let members: Vec<(String, C, Vec<u8>)> = self
            .inner
            .members
            .borrow()
            .iter()
            .map(|(name, member)| (name.clone(), member.value.clone(), member.args.clone()))
            .collect();
        Snapshot::Children(
            members
                .into_iter()
                .map(|(name, value, args)| ChildSnapshot {
                    name,
                    snapshot: value.save(),
                    args: Some(args),
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
                    expected: "set",
                })
            }
        };
        for child in children {
            let Some(args) = child.args else {
                return Err(SnapshotError::MissingArgs {
                    address: address.clone(),
                    name: child.name,
                });
            };
            let value =
                self.construct(&child.name, &args)
                    .map_err(|source| SnapshotError::Decode {
                        address: address.clone(),
                        source,
                    })?;
            value.load(Some(child.snapshot))?;
        }
        Ok(())
    }
}
