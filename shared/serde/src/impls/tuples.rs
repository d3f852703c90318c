use crate::{BitReader, BitWrite, Serde, SerdeErr};

// Heterogeneous tuples encode each slot in order with no framing.
macro_rules! impl_serde_tuple {
    ($($name:ident),+) => {
        impl<$($name: Serde),+> Serde for ($($name,)+) {
            #[allow(non_snake_case)]
            fn ser(&self, writer: &mut dyn BitWrite) {
                let ($($name,)+) = self;
                $($name.ser(writer);)+
            }

            fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                Ok(($($name::de(reader)?,)+))
            }
        }
    };
}

impl_serde_tuple!(A);
impl_serde_tuple!(A, B);
impl_serde_tuple!(A, B, C);
impl_serde_tuple!(A, B, C, D);
impl_serde_tuple!(A, B, C, D, E);
impl_serde_tuple!(A, B, C, D, E, F);
impl_serde_tuple!(A, B, C, D, E, F, G);
impl_serde_tuple!(A, B, C, D, E, F, G, H);
