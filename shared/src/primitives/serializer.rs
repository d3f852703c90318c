use std::{marker::PhantomData, rc::Rc};

use canopy_serde::{decode, encode, Serde, SerdeErr};

/// Converts values of one type to and from bytes. Every primitive falls back
/// to [`DefaultSerializer`]; a custom one can be supplied per instance.
pub trait Serializer<T> {
    fn serialize(&self, value: &T) -> Vec<u8>;
    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerdeErr>;
}

/// The structural codec from `canopy-serde`
pub struct DefaultSerializer<T> {
    phantom_t: PhantomData<T>,
}

impl<T: Serde + 'static> DefaultSerializer<T> {
    pub fn new() -> Self {
        Self {
            phantom_t: PhantomData,
        }
    }

    pub fn shared() -> Rc<dyn Serializer<T>> {
        Rc::new(Self::new())
    }
}

impl<T: Serde + 'static> Default for DefaultSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serde> Serializer<T> for DefaultSerializer<T> {
    fn serialize(&self, value: &T) -> Vec<u8> {
        encode(value)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T, SerdeErr> {
        decode(bytes)
    }
}

/// Wraps a value serializer to encode `Option<T>`: a presence flag followed by
/// the inner serializer's bytes
pub struct OptionalSerializer<T> {
    inner: Rc<dyn Serializer<T>>,
}

impl<T> OptionalSerializer<T> {
    pub fn new(inner: Rc<dyn Serializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Serializer<Option<T>> for OptionalSerializer<T> {
    fn serialize(&self, value: &Option<T>) -> Vec<u8> {
        let bytes = value.as_ref().map(|value| self.inner.serialize(value));
        encode(&bytes)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Option<T>, SerdeErr> {
        match decode::<Option<Vec<u8>>>(bytes)? {
            Some(inner) => Ok(Some(self.inner.deserialize(&inner)?)),
            None => Ok(None),
        }
    }
}
