use graphql_parser::query::{Number, Value};
use serde_json::{Map, Value as JsonValue};

use crate::graph::{SchemaGraph, TypeDescriptor, TypeRef, TypeRefExt};

pub type AstValue = Value<'static, String>;

/// Converts a literal of a query document to JSON, reading variables from `variables`.
pub fn value_from_ast(value: &AstValue, variables: &Map<String, JsonValue>) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Enum(e) => JsonValue::String(e.clone()),
        Value::Int(n) => n.as_i64().map(JsonValue::from).unwrap_or(JsonValue::Null),
        Value::Float(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::List(l) => JsonValue::Array(l.iter().map(|v| value_from_ast(v, variables)).collect()),
        Value::Object(o) => JsonValue::Object(
            o.iter()
                .map(|(k, v)| (k.clone(), value_from_ast(v, variables)))
                .collect(),
        ),
        Value::Variable(name) => variables.get(name).cloned().unwrap_or(JsonValue::Null),
    }
}

/// Converts JSON back into a document literal of the given input type.
///
/// Strings become enum literals where `graph` declares the type as an enum; values
/// inside input objects are typed by the input object's fields.
pub fn value_to_ast(value: &JsonValue, value_type: Option<&TypeRef>, graph: &SchemaGraph) -> AstValue {
    let named = value_type.map(TypeRefExt::named_type);

    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Boolean(*b),
        JsonValue::String(s) => match named.and_then(|name| graph.type_by_name(name)) {
            Some(TypeDescriptor::Enum(_)) => Value::Enum(s.clone()),
            _ => Value::String(s.clone()),
        },
        JsonValue::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => Value::Int(Number::from(i)),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        JsonValue::Array(items) => {
            let item_type = value_type.and_then(list_item_type);
            Value::List(
                items
                    .iter()
                    .map(|item| value_to_ast(item, item_type, graph))
                    .collect(),
            )
        }
        JsonValue::Object(entries) => {
            let input = match named.and_then(|name| graph.type_by_name(name)) {
                Some(TypeDescriptor::InputObject(input)) => Some(input),
                _ => None,
            };

            Value::Object(
                entries
                    .iter()
                    .map(|(key, item)| {
                        let field_type = input
                            .and_then(|input| input.fields.iter().find(|f| &f.name == key))
                            .map(|f| &f.value_type);
                        (key.clone(), value_to_ast(item, field_type, graph))
                    })
                    .collect(),
            )
        }
    }
}

/// Replaces every variable inside `value` by the literal of its value, typed by `value_type`.
pub fn substitute_variables(
    value: &AstValue,
    value_type: Option<&TypeRef>,
    variables: &Map<String, JsonValue>,
    graph: &SchemaGraph,
) -> AstValue {
    match value {
        Value::Variable(name) => value_to_ast(
            variables.get(name).unwrap_or(&JsonValue::Null),
            value_type,
            graph,
        ),
        Value::List(items) => {
            let item_type = value_type.and_then(list_item_type);
            Value::List(
                items
                    .iter()
                    .map(|item| substitute_variables(item, item_type, variables, graph))
                    .collect(),
            )
        }
        Value::Object(entries) => {
            let input = match value_type.and_then(|t| graph.type_by_name(t.named_type())) {
                Some(TypeDescriptor::InputObject(input)) => Some(input),
                _ => None,
            };

            Value::Object(
                entries
                    .iter()
                    .map(|(key, item)| {
                        let field_type = input
                            .and_then(|input| input.fields.iter().find(|f| &f.name == key))
                            .map(|f| &f.value_type);
                        (key.clone(), substitute_variables(item, field_type, variables, graph))
                    })
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

fn list_item_type(type_ref: &TypeRef) -> Option<&TypeRef> {
    match type_ref {
        TypeRef::NonNullType(inner) => list_item_type(inner),
        TypeRef::ListType(inner) => Some(inner),
        TypeRef::NamedType(_) => None,
    }
}
