//! # al-store
//!
//! Persistence for AffinityLoop: the typed record representation, the entity
//! persistence trait with its in-memory implementation, and blob storage for
//! generated documents. Numeric fields are held as exact decimals inside
//! records; `f64` appears only on the wire side of the adapters.

mod object_store;
mod persistence;
mod records;

pub use object_store::{FileObjectStore, MemoryObjectStore, ObjectStore};
pub use persistence::{EntityKind, MemoryStore, PersistenceService};
pub use records::{
    cycle_from_record, cycle_record, project_from_record, project_record, variant_from_record,
    variant_record, FieldValue, Record,
};
