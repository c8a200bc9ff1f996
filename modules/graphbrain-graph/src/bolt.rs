//! JSON parameter values → Bolt values.

use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType, Query,
};
use serde_json::Value;

use graphbrain_mapping::GraphOperation;

pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => BoltType::String(BoltString::from(s.as_str())),
        Value::Array(items) => BoltType::List(BoltList {
            value: items.iter().map(json_to_bolt).collect(),
        }),
        Value::Object(map) => BoltType::Map(BoltMap::from_iter(
            map.iter()
                .map(|(k, v)| (BoltString::from(k.as_str()), json_to_bolt(v))),
        )),
    }
}

/// Build the driver query for one operation, binding every parameter.
pub fn to_query(op: &GraphOperation) -> Query {
    op.params
        .iter()
        .fold(neo4rs::query(&op.cypher), |q, (name, value)| {
            q.param(name, json_to_bolt(value))
        })
}
