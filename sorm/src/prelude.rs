//! Everything needed for everyday queries.

pub use crate::{
    Conditions, Config, FromRow, OrderSpec, Predicate, Record, Row, Schema, SearchOptions,
    Session, SormError, SormResult, TableSchema, Trigger, TriggerArgs, Value,
};
