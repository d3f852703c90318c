use canopy_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

/// Saved state of a subtree. Leaves save their encoded value; containers save
/// one entry per child, with the constructor arguments needed to recreate
/// dynamically created children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Snapshot {
    Leaf(Vec<u8>),
    Children(Vec<ChildSnapshot>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildSnapshot {
    pub name: String,
    pub snapshot: Snapshot,
    pub args: Option<Vec<u8>>,
}

impl Snapshot {
    pub fn children(&self) -> Option<&[ChildSnapshot]> {
        match self {
            Snapshot::Children(children) => Some(children),
            Snapshot::Leaf(_) => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&ChildSnapshot> {
        self.children()?.iter().find(|child| child.name == name)
    }
}

impl Serde for Snapshot {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Snapshot::Leaf(bytes) => {
                writer.write_bit(false);
                bytes.ser(writer);
            }
            Snapshot::Children(children) => {
                writer.write_bit(true);
                children.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Snapshot::Children(Vec::<ChildSnapshot>::de(reader)?))
        } else {
            Ok(Snapshot::Leaf(Vec::<u8>::de(reader)?))
        }
    }
}

impl Serde for ChildSnapshot {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.name.ser(writer);
        self.snapshot.ser(writer);
        self.args.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            name: String::de(reader)?,
            snapshot: Snapshot::de(reader)?,
            args: Option::<Vec<u8>>::de(reader)?,
        })
    }
}

/// What `Runtime::save` writes: the registered tree plus the member id
/// counter, so a replica reloading under the same id never reuses a name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedState {
    pub counter: u64,
    pub tree: Snapshot,
}

impl Serde for SavedState {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<7>::new(self.counter).ser(writer);
        self.tree.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let counter = UnsignedVariableInteger::<7>::de(reader)?
            .try_to::<u64>()
            .ok_or(SerdeErr::IntegerOverflow {
                type_name: "SavedState counter",
            })?;
        Ok(Self {
            counter,
            tree: Snapshot::de(reader)?,
        })
    }
}
