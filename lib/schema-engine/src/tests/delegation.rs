use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use crate::{
    error::ResolverError,
    execution::{ExecutionRequest, GraphQLError, PathSegment},
    graph::SchemaGraph,
    pipeline::{BuiltSchema, Pipeline},
    stitching::{
        merge, ChainedDelegation, OperationKind, RemoteError, RemoteExecutorArc, RemoteResponse,
        SchemaExtension, TransportError,
    },
    tests::testkit::{exchange, init_logger, parse, MockRemote},
};

const LOCAL_SCHEMA: &str = "type Query { me: String }";

const CREATE_ORDER: &str = r#"
mutation {
  ecommerceCreateOrder(input: { artworkId: "a1" }) {
    __typename
    ... on Ecommerce_Order { id }
    ... on Ecommerce_OrderFailure { error }
  }
}
"#;

fn public_schema(executor: RemoteExecutorArc, extensions: &[SchemaExtension]) -> BuiltSchema {
    let local = SchemaGraph::from_sdl("local", LOCAL_SCHEMA).expect("valid local schema");
    let merged = merge(local, &[exchange(executor)], extensions).expect("schemas merge");
    Pipeline::new().build(merged).expect("public schema builds")
}

fn responding(data: Value) -> Result<RemoteResponse, TransportError> {
    Ok(RemoteResponse {
        data: Some(data),
        errors: vec![],
    })
}

#[tokio::test]
async fn domain_failures_are_values() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::with_data(json!({
        "createOrder": { "__typename": "OrderFailure", "error": "artwork is no longer available" }
    }));

    let response = public_schema(remote.clone(), &[])
        .execute(ExecutionRequest::new(parse(CREATE_ORDER)))
        .await?;

    assert!(response.errors.is_empty());
    assert_eq!(
        response.data,
        json!({
            "ecommerceCreateOrder": {
                "__typename": "Ecommerce_OrderFailure",
                "error": "artwork is no longer available"
            }
        })
    );

    Ok(())
}

#[tokio::test]
async fn transport_failures_are_field_errors() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let response = public_schema(MockRemote::unreachable(), &[])
        .execute(ExecutionRequest::new(parse(CREATE_ORDER)))
        .await?;

    assert_eq!(response.data, json!({ "ecommerceCreateOrder": null }));
    assert_eq!(
        response.errors,
        vec![GraphQLError::new(
            "request to remote schema 'exchange' failed: connection refused",
            vec![PathSegment::Key("ecommerceCreateOrder".to_string())],
        )]
    );

    Ok(())
}

#[tokio::test]
async fn remote_errors_without_data_are_field_errors() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::new(|_| {
        Ok(RemoteResponse {
            data: Some(json!({ "order": null })),
            errors: vec![RemoteError {
                message: "Order not found".to_string(),
                path: Some(vec![json!("order")]),
            }],
        })
    });

    let response = public_schema(remote, &[])
        .execute(ExecutionRequest::new(parse(
            r#"{ ecommerceOrder(id: "missing") { id } }"#,
        )))
        .await?;

    assert_eq!(response.data, json!({ "ecommerceOrder": null }));
    assert_eq!(
        response.errors,
        vec![GraphQLError::new(
            "remote schema 'exchange' failed to resolve 'order': Order not found",
            vec![PathSegment::Key("ecommerceOrder".to_string())],
        )]
    );

    Ok(())
}

fn is_failure(value: &Value) -> bool {
    value.get("__typename").and_then(Value::as_str) == Some("Ecommerce_OrderFailure")
}

fn order_for_conversation(executor: RemoteExecutorArc) -> BuiltSchema {
    let exchange = exchange(executor);

    let create = exchange
        .delegate(OperationKind::Mutation, "createOrder")
        .with_args(|_, args| {
            let mut input = Map::new();
            input.insert(
                "artworkId".to_string(),
                args.get("artworkId").cloned().unwrap_or(Value::Null),
            );
            let mut remote_args = Map::new();
            remote_args.insert("input".to_string(), Value::Object(input));
            Ok(remote_args)
        });

    let link = exchange
        .delegate(OperationKind::Mutation, "linkConversation")
        .with_args(|order, args| {
            let order_id = order.get("id").cloned().ok_or_else(|| {
                ResolverError::message("the created order was selected without its id")
            })?;
            let mut remote_args = Map::new();
            remote_args.insert("orderId".to_string(), order_id);
            remote_args.insert(
                "conversationId".to_string(),
                args.get("conversationId").cloned().unwrap_or(Value::Null),
            );
            Ok(remote_args)
        })
        .with_selection("{ id }")
        .expect("valid selection");

    let extension = SchemaExtension::new(
        "conversation_orders",
        r#"
        extend type Mutation {
          createConversationOrder(artworkId: String!, conversationId: String!): Ecommerce_OrderOrFailure
        }
        "#,
    )
    .with_resolver(
        "Mutation",
        "createConversationOrder",
        Arc::new(ChainedDelegation::new(create, link).failing_when(is_failure)),
    );

    let local = SchemaGraph::from_sdl("local", LOCAL_SCHEMA).expect("valid local schema");
    let merged = merge(local, &[exchange], &[extension]).expect("schemas merge");
    Pipeline::new().build(merged).expect("public schema builds")
}

const CREATE_CONVERSATION_ORDER: &str = r#"
mutation {
  createConversationOrder(artworkId: "a1", conversationId: "conv_1") {
    ... on Ecommerce_Order { id state }
    ... on Ecommerce_OrderFailure { error }
  }
}
"#;

#[tokio::test]
async fn chained_delegation_runs_both_calls() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::new(|request| {
        if request.query.contains("linkConversation") {
            responding(json!({ "linkConversation": { "__typename": "Order", "id": "ord_1" } }))
        } else {
            responding(json!({
                "createOrder": { "__typename": "Order", "id": "ord_1", "state": "PENDING" }
            }))
        }
    });

    let response = order_for_conversation(remote.clone())
        .execute(ExecutionRequest::new(parse(CREATE_CONVERSATION_ORDER)))
        .await?;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({ "createConversationOrder": { "id": "ord_1", "state": "PENDING" } })
    );

    let queries = remote.queries();
    assert_eq!(queries.len(), 2);
    insta::assert_snapshot!(queries[1], @r#"
    mutation {
      linkConversation(conversationId: "conv_1", orderId: "ord_1") {
        __typename
        id
      }
    }
    "#);

    Ok(())
}

#[tokio::test]
async fn failed_first_call_skips_the_second() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::with_data(json!({
        "createOrder": { "__typename": "OrderFailure", "error": "artwork is no longer available" }
    }));

    let response = order_for_conversation(remote.clone())
        .execute(ExecutionRequest::new(parse(CREATE_CONVERSATION_ORDER)))
        .await?;

    assert!(response.errors.is_empty());
    assert_eq!(
        response.data,
        json!({ "createConversationOrder": { "error": "artwork is no longer available" } })
    );
    assert_eq!(remote.queries().len(), 1);

    Ok(())
}

#[tokio::test]
async fn failed_second_call_is_reported_as_dependent() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::new(|request| {
        if request.query.contains("linkConversation") {
            Err(TransportError::new("connection reset"))
        } else {
            responding(json!({
                "createOrder": { "__typename": "Order", "id": "ord_1", "state": "PENDING" }
            }))
        }
    });

    let response = order_for_conversation(remote.clone())
        .execute(ExecutionRequest::new(parse(CREATE_CONVERSATION_ORDER)))
        .await?;

    assert_eq!(response.data, json!({ "createConversationOrder": null }));
    insta::assert_snapshot!(response.errors[0].message, @"linkConversation failed after 'createOrder' succeeded: request to remote schema 'exchange' failed: connection reset");
    assert_eq!(remote.queries().len(), 2);

    let dependent = ResolverError::DependentDelegation {
        completed: "createOrder".to_string(),
        stage: "linkConversation".to_string(),
        source: Box::new(ResolverError::message("connection reset")),
    };
    assert!(dependent.is_dependent_failure());
    assert!(!ResolverError::message("connection reset").is_dependent_failure());

    Ok(())
}
