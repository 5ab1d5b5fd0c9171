//! Address client tables.
//!
//! `v1` carries the thirteen connector categories. `v2` is the nine-category
//! table; it differs from `v1` only in the jdbc family, which takes a single
//! `jdbcUrl` instead of `host`.

use super::Table;
use crate::schema::{FieldDescriptor as F, FieldSchema};
use serde_json::json;

const BYTE_ARRAY_SERIALIZER: &str = "org.apache.kafka.common.serialization.ByteArraySerializer";

pub(super) const V1: Table = &[
    ("kafka_consumer", kafka_consumer),
    ("kafka_producer", kafka_producer),
    ("jdbc", jdbc_host),
    ("mysql", jdbc_host),
    ("hive", hive),
    ("mongo", mongo),
    ("influxdb", influxdb),
    ("taobao", taobao),
    ("elasticsearch2", elasticsearch),
    ("elasticsearch5", elasticsearch),
    ("hdfs", hdfs),
    ("hbase", hbase),
    ("kudu", kudu),
];

pub(super) const V2: Table = &[
    ("kafka_consumer", kafka_consumer),
    ("kafka_producer", kafka_producer),
    ("jdbc", jdbc_url),
    ("mysql", jdbc_url),
    ("hive", hive),
    ("elasticsearch2", elasticsearch),
    ("hdfs", hdfs),
    ("hbase", hbase),
    ("kudu", kudu),
];

fn kafka_consumer() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("zookeeper.connect"),
        F::text("group.id"),
        F::number("zookeeper.connection.timeout.ms").default(60000),
        F::number("zookeeper.session.timeout.ms").default(60000),
        F::number("zookeeper.sync.time.ms").default(30000),
        F::number("auto.commit.interval.ms").default(60000),
        F::text("auto.commit.enable").default("false"),
    ])
}

fn kafka_producer() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("bootstrap.servers"),
        F::number("acks").default(1),
        F::text("key.serializer").default(BYTE_ARRAY_SERIALIZER),
        F::text("value.serializer").default(BYTE_ARRAY_SERIALIZER),
        F::text("compression.type").default("gzip"),
    ])
}

fn jdbc_host() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("host").default("localhost:10000"),
        F::text("username"),
        F::text("password"),
        F::number("maximumPoolSize").default(1),
    ])
}

fn jdbc_url() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("jdbcUrl").required(),
        F::text("username"),
        F::text("password"),
        F::number("maximumPoolSize").default(1),
    ])
}

fn hive() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("host").default("localhost:10000"),
        F::text("database"),
        F::text("username"),
        F::text("password"),
    ])
}

fn mongo() -> FieldSchema {
    FieldSchema::new(vec![F::text("url")])
}

fn influxdb() -> FieldSchema {
    FieldSchema::new(vec![F::text("host"), F::text("port"), F::text("db")])
}

fn taobao() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("serverUrl").default("https://eco.taobao.com/router/rest"),
        F::text("appKey"),
        F::text("appSecret"),
        F::text("format").default("json"),
        F::number("connectTimeout").default(1000),
        F::number("readTimeout").default(5000),
    ])
}

/// Shared by elasticsearch2 and elasticsearch5.
fn elasticsearch() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("hosts").default("localhost:9300,localhost:9301"),
        F::dynamic_group("settings").default(json!({ "cluster.name": "elasticsearch" })),
    ])
}

fn hdfs() -> FieldSchema {
    FieldSchema::new(vec![
        F::multiline("hosts").placeholder("properties"),
        F::text("user"),
        F::multiline("core-site.xml"),
        F::multiline("hdfs-site.xml"),
        F::multiline("ssl-client.xml"),
    ])
}

fn hbase() -> FieldSchema {
    FieldSchema::new(vec![
        F::multiline("hosts").placeholder("properties"),
        F::multiline("core-site.xml"),
        F::multiline("hdfs-site.xml"),
        F::multiline("ssl-client.xml"),
        F::multiline("hbase-site.xml"),
    ])
}

fn kudu() -> FieldSchema {
    FieldSchema::new(vec![
        F::text("kuduMaster").required(),
        F::number("workerCount").required().default(1),
    ])
}
