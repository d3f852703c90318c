use std::{collections::VecDeque, fmt};

use canopy_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::tree::error::ReceiveError;

/// Names from the root of the tree down to a node. The root registry has the
/// empty address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Address {
    names: Vec<String>,
}

impl Address {
    pub fn root() -> Self {
        Self { names: Vec::new() }
    }

    pub fn child(&self, name: &str) -> Self {
        let mut names = self.names.clone();
        names.push(name.to_string());
        Self { names }
    }

    /// Name of the addressed node among its siblings, `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_root(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.names.join("/"))
    }
}

impl From<Vec<String>> for Address {
    fn from(names: Vec<String>) -> Self {
        Self { names }
    }
}

/// One step of an op's path. Names route to a child; the payload is the op
/// for the node that consumes it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Name(String),
    Payload(Vec<u8>),
}

impl Serde for Segment {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Segment::Name(name) => {
                writer.write_bit(false);
                name.ser(writer);
            }
            Segment::Payload(payload) => {
                writer.write_bit(true);
                payload.ser(writer);
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Segment::Payload(Vec::<u8>::de(reader)?))
        } else {
            Ok(Segment::Name(String::de(reader)?))
        }
    }
}

/// The unconsumed remainder of an op's path while it is routed down the tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePath {
    segments: VecDeque<Segment>,
}

impl MessagePath {
    /// Path for an op with `payload` targeted at the node at `address`
    pub fn new(address: &Address, payload: Vec<u8>) -> Self {
        let mut segments: VecDeque<Segment> = address
            .names()
            .iter()
            .map(|name| Segment::Name(name.clone()))
            .collect();
        segments.push_back(Segment::Payload(payload));
        Self { segments }
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments: segments.into(),
        }
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments.into()
    }

    pub fn next_segment(&mut self) -> Option<Segment> {
        self.segments.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Consumes the final segment at a leaf, which must be its payload
    pub fn expect_payload(&mut self, address: &Address) -> Result<Vec<u8>, ReceiveError> {
        match self.next_segment() {
            Some(Segment::Payload(payload)) if self.is_empty() => Ok(payload),
            Some(Segment::Payload(_)) => Err(ReceiveError::TrailingSegments {
                address: address.clone(),
                remaining: self.len(),
            }),
            Some(Segment::Name(name)) => Err(ReceiveError::UnexpectedName {
                address: address.clone(),
                name,
            }),
            None => Err(ReceiveError::EmptyPath {
                address: address.clone(),
            }),
        }
    }
}
