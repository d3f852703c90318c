pub mod map;
pub mod mut_set;
pub mod register;
pub mod serializer;
