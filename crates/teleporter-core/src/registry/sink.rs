//! Sink client tables. Identical across schema versions.

use super::Table;
use crate::schema::{FieldDescriptor as F, FieldSchema};

pub(super) const ALL: Table = &[
    ("kafka", kafka),
    ("jdbc", parallel_writer),
    ("elasticsearch", parallel_writer),
    ("kudu", kudu),
];

/// Kafka sinks take their producer settings from the referenced address.
/// Parallelism is an optional hint; an empty value is submittable.
fn kafka() -> FieldSchema {
    FieldSchema::new(vec![F::number("parallelism").default(1)])
}

/// Writer parallelism is the only tunable for these sinks.
fn parallel_writer() -> FieldSchema {
    FieldSchema::new(vec![F::number("parallelism").required().default(1)])
}

fn kudu() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("kuduMaster").required(),
        F::number("workerCount").required().default(1),
    ])
}
