use gateway_config::id_policy::IdPolicyConfig;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use crate::{
    error::SchemaBuildError,
    execution::ExecutionRequest,
    graph::SchemaGraph,
    id_normalization::IdNormalization,
    pipeline::{BuiltSchema, Pipeline},
    stitching::{
        merge, OperationKind, RemoteResponse, RemoteSchema, RemoteSchemaOptions, SchemaExtension,
    },
    tests::testkit::{exchange, init_logger, parse, MockRemote},
};

const LOCAL_SCHEMA: &str = r#"
type Query {
  conversation(id: String!): Conversation
}

type Conversation {
  _id: String!
  initialMessage: String
}
"#;

fn public_schema(
    local: SchemaGraph,
    remotes: &[RemoteSchema],
    extensions: &[SchemaExtension],
) -> BuiltSchema {
    let merged = merge(local, remotes, extensions).expect("schemas merge");

    Pipeline::new()
        .with(
            IdNormalization::new(IdPolicyConfig {
                stitched_type_prefixes: vec!["Ecommerce_".to_string()],
                ..IdPolicyConfig::default()
            })
            .into_transform(),
        )
        .build(merged)
        .expect("public schema builds")
}

#[tokio::test]
async fn order_connection_is_delegated_with_the_conversation_id(
) -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::with_data(json!({
        "orders": {
            "__typename": "OrderConnection",
            "edges": [
                {
                    "__typename": "OrderEdge",
                    "node": { "__typename": "Order", "id": "ord_1", "code": "B-1", "state": "PENDING" }
                }
            ]
        }
    }));
    let exchange = exchange(remote.clone());

    let orders = exchange
        .delegate(OperationKind::Query, "orders")
        .with_args(|conversation, args| {
            let mut remote_args = Map::new();
            remote_args.insert(
                "buyerId".to_string(),
                conversation.get("_id").cloned().unwrap_or(Value::Null),
            );
            if let Some(first) = args.get("first") {
                remote_args.insert("first".to_string(), first.clone());
            }
            Ok(remote_args)
        });

    let extension = SchemaExtension::new(
        "conversation_orders",
        "extend type Conversation { orderConnection(first: Int): Ecommerce_OrderConnection }",
    )
    .with_delegation("Conversation", "orderConnection", orders);

    let built = public_schema(
        SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?,
        &[exchange],
        &[extension],
    );

    let response = built
        .execute(
            ExecutionRequest::new(parse(
                r#"
                {
                  conversation(id: "conv_1") {
                    internalID
                    orderConnection(first: 2) {
                      edges { node { internalID code state } }
                    }
                  }
                }
                "#,
            ))
            .with_root_value(json!({
                "conversation": { "_id": "conv_1", "initialMessage": "Is it available?" }
            })),
        )
        .await?;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({
            "conversation": {
                "internalID": "conv_1",
                "orderConnection": {
                    "edges": [
                        { "node": { "internalID": "ord_1", "code": "B-1", "state": "PENDING" } }
                    ]
                }
            }
        })
    );

    let queries = remote.queries();
    assert_eq!(queries.len(), 1);
    insta::assert_snapshot!(queries[0], @r#"
    query {
      orders(buyerId: "conv_1", first: 2) {
        __typename
        edges {
          __typename
          node {
            __typename
            id
            code
            state
          }
        }
      }
    }
    "#);

    Ok(())
}

#[tokio::test]
async fn prefixed_root_fields_pass_through() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::with_data(json!({
        "order": { "__typename": "Order", "ref": "ord_1", "code": "B-1" }
    }));

    let exchange = exchange(remote.clone());
    assert_eq!(
        exchange.root_field_renames().lookup("Query", "ecommerceOrder"),
        Some("order")
    );

    let built = public_schema(
        SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?,
        &[exchange],
        &[],
    );

    assert!(built.schema.field("Query", "ecommerceOrder").is_some());
    assert!(built.schema.field("Query", "order").is_none());
    assert!(built.schema.contains_type("Ecommerce_Order"));

    let response = built
        .execute(
            ExecutionRequest::new(parse(
                r#"
                query Order($id: ID!) {
                  ecommerceOrder(id: $id) { __typename ref: internalID code }
                }
                "#,
            ))
            .with_variables(
                json!({ "id": "ord_1" })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            ),
        )
        .await?;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({
            "ecommerceOrder": { "__typename": "Ecommerce_Order", "ref": "ord_1", "code": "B-1" }
        })
    );

    insta::assert_snapshot!(remote.queries()[0], @r#"
    query {
      order(id: "ord_1") {
        __typename
        ref: id
        code
      }
    }
    "#);

    Ok(())
}

#[tokio::test]
async fn delegated_fields_are_read_under_their_response_key() -> Result<(), Box<dyn std::error::Error>>
{
    init_logger();
    let remote = MockRemote::with_data(json!({
        "order": {
            "__typename": "Order",
            "code": "ord_1",
            "number": "B-1",
            "state": "PENDING",
            "kind": "Order"
        }
    }));

    let built = public_schema(
        SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?,
        &[exchange(remote.clone())],
        &[],
    );

    let response = built
        .execute(ExecutionRequest::new(parse(
            r#"{ ecommerceOrder(id: "ord_1") { code: internalID number: code state kind: __typename } }"#,
        )))
        .await?;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({
            "ecommerceOrder": {
                "code": "ord_1",
                "number": "B-1",
                "state": "PENDING",
                "kind": "Ecommerce_Order"
            }
        })
    );

    insta::assert_snapshot!(remote.queries()[0], @r#"
    query {
      order(id: "ord_1") {
        __typename
        code: id
        number: code
        state
        kind: __typename
      }
    }
    "#);

    Ok(())
}

#[tokio::test]
async fn remote_enums_and_input_objects_are_typed() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let remote = MockRemote::new(|_| {
        Ok(RemoteResponse {
            data: Some(json!({
                "createOrder": { "__typename": "Order", "id": "ord_2", "state": "SUBMITTED" }
            })),
            errors: vec![],
        })
    });

    let built = public_schema(
        SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?,
        &[exchange(remote.clone())],
        &[],
    );

    let response = built
        .execute(ExecutionRequest::new(parse(
            r#"
            mutation {
              ecommerceCreateOrder(input: { artworkId: "a1", state: SUBMITTED }) {
                ... on Ecommerce_Order { internalID state }
              }
            }
            "#,
        )))
        .await?;

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.data,
        json!({ "ecommerceCreateOrder": { "internalID": "ord_2", "state": "SUBMITTED" } })
    );

    insta::assert_snapshot!(remote.queries()[0], @r#"
    mutation {
      createOrder(input: {artworkId: "a1", state: SUBMITTED}) {
        __typename
        ... on Order {
          __typename
          id
          state
        }
      }
    }
    "#);

    Ok(())
}

#[test]
fn merge_reports_every_conflict() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let local = SchemaGraph::from_sdl(
        "local",
        r#"
        type Query { conversation: Conversation }
        type Conversation { _id: String!, orderConnection: String }
        type Ecommerce_Order { id: ID! }
        "#,
    )?;

    let remote = RemoteSchema::from_sdl(
        "exchange",
        "type Query { order: Order } type Order { id: ID! }",
        MockRemote::unreachable(),
        RemoteSchemaOptions {
            type_prefix: "Ecommerce_".to_string(),
            root_field_prefix: None,
            expose_root_fields: true,
        },
    )?;

    let order = remote.delegate(OperationKind::Query, "order");
    let extension = SchemaExtension::new(
        "conflicts",
        r#"
        type Ecommerce_Note { author: Ecommerce_Author }
        extend type Conversation {
          orderConnection: Ecommerce_Order
          buyer: Ecommerce_User
        }
        extend type Artwork { title: String }
        "#,
    )
    .with_delegation("Conversation", "orderConnection", order.clone())
    .with_delegation("Artwork", "title", order);

    let errors = merge(local, &[remote], &[extension]).expect_err("conflicting schemas");

    assert_eq!(
        errors.0,
        vec![
            SchemaBuildError::TypeCollision {
                type_name: "Ecommerce_Order".to_string()
            },
            SchemaBuildError::MissingExtensionResolver {
                type_name: "Conversation".to_string(),
                field: "buyer".to_string()
            },
            SchemaBuildError::DuplicateField {
                type_name: "Conversation".to_string(),
                field: "orderConnection".to_string()
            },
            SchemaBuildError::UnknownExtensionTarget {
                type_name: "Artwork".to_string()
            },
            SchemaBuildError::UnknownType {
                type_name: "Ecommerce_Author".to_string(),
                referenced_by: "Ecommerce_Note.author".to_string()
            },
        ]
    );

    Ok(())
}

#[test]
fn hidden_root_fields_are_not_merged() -> Result<(), Box<dyn std::error::Error>> {
    let remote = RemoteSchema::from_sdl(
        "exchange",
        "type Query { order: Order } type Order { id: ID! }",
        MockRemote::unreachable(),
        RemoteSchemaOptions {
            type_prefix: "Ecommerce_".to_string(),
            root_field_prefix: None,
            expose_root_fields: false,
        },
    )?;

    let merged = merge(SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?, &[remote], &[])?;

    assert!(merged.contains_type("Ecommerce_Order"));
    assert!(merged.field("Query", "order").is_none());
    assert!(merged.mutation_type().is_none());

    Ok(())
}
