use gateway_config::parse_yaml_config;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{
    error::SchemaBuildError,
    execution::{execute, ExecutionRequest},
    graph::SchemaGraph,
    pipeline::Pipeline,
    rewrite::RewritePlan,
    tests::testkit::{init_logger, parse},
    transform::{renamer, FieldRename, TransformFields},
};

const LOCAL_SCHEMA: &str = r#"
type Query {
  order: Order
  artwork: Artwork
  artist: Artist
}

type Order {
  "A type-specific ID likely used as a database ID."
  id: ID!
  code: String
}

type Artwork {
  "A slug ID."
  id: ID!
  title: String
}

type Artist {
  __id: ID!
  _id: String!
  displayName: String
}
"#;

fn config(transforms: &str) -> gateway_config::GatewayConfig {
    parse_yaml_config(transforms).expect("valid config")
}

#[tokio::test]
async fn tagged_internal_id_reads_the_original_field() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let local = SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?;
    let built = Pipeline::from_config(&config("transforms: [{ type: normalize_ids }]")).build(local)?;

    assert!(built.schema.field("Order", "internalID").is_some());
    assert!(built.schema.field("Order", "id").is_none());

    let document = parse("{ order { internalID } }");
    insta::assert_snapshot!(built.rewrite_document(&document), @r"
    {
      order {
        id
      }
    }
    ");

    let response = built
        .execute(
            ExecutionRequest::new(document).with_root_value(json!({ "order": { "id": "ord_1" } })),
        )
        .await?;

    assert!(response.errors.is_empty());
    assert_eq!(response.data, json!({ "order": { "internalID": "ord_1" } }));

    // The original name is not part of the public schema.
    let stale = parse("{ order { id } }");
    assert_eq!(built.rewrite_document(&stale), stale);
    let response = built
        .execute(ExecutionRequest::new(stale).with_root_value(json!({ "order": { "id": "ord_1" } })))
        .await?;
    assert_eq!(response.data, json!({ "order": { "id": null } }));
    assert_eq!(
        response.errors[0].message,
        "Cannot query field 'id' on type 'Order'"
    );

    Ok(())
}

#[tokio::test]
async fn rewritten_documents_resolve_the_same_on_the_original_schema(
) -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let local = SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?;
    let built = Pipeline::from_config(&config("transforms: [{ type: normalize_ids }]"))
        .build(local.clone())?;

    let root_value = json!({
        "order": { "id": "ord_1", "code": "B-1" },
        "artwork": { "id": "andy-warhol-skull", "title": "Skull" },
        "artist": { "__id": "QXJ0aXN0OjE=", "_id": "4d8b92", "displayName": "Andy Warhol" }
    });

    let document = parse(
        r#"
        {
          order { ref: internalID code }
          artwork { slug title }
          artist { id internalID displayName }
        }
        "#,
    );

    let public = built
        .execute(ExecutionRequest::new(document.clone()).with_root_value(root_value.clone()))
        .await?;

    let rewritten = built.rewrite_document(&document);
    insta::assert_snapshot!(rewritten, @r"
    {
      order {
        ref: id
        code
      }
      artwork {
        id
        title
      }
      artist {
        __id
        _id
        displayName
      }
    }
    ");

    let original = execute(
        &local,
        &RewritePlan::default(),
        ExecutionRequest::new(rewritten).with_root_value(root_value),
    )
    .await?;

    assert_eq!(
        public.data,
        json!({
            "order": { "ref": "ord_1", "code": "B-1" },
            "artwork": { "slug": "andy-warhol-skull", "title": "Skull" },
            "artist": { "id": "QXJ0aXN0OjE=", "internalID": "4d8b92", "displayName": "Andy Warhol" }
        })
    );
    // Aliases aside, each public field holds the value of the field it was renamed from.
    assert_eq!(public.data["order"], original.data["order"]);
    assert_eq!(
        original.data["artwork"],
        json!({ "id": "andy-warhol-skull", "title": "Skull" })
    );
    assert_eq!(
        original.data["artist"],
        json!({ "__id": "QXJ0aXN0OjE=", "_id": "4d8b92", "displayName": "Andy Warhol" })
    );

    Ok(())
}

#[tokio::test]
async fn aliases_read_the_field_they_select() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let local = SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?;
    let built = Pipeline::from_config(&config("transforms: [{ type: normalize_ids }]")).build(local)?;

    let root_value = json!({
        "artwork": { "id": "andy-warhol-skull", "title": "Skull" },
        "artist": { "__id": "QXJ0aXN0OjE=", "_id": "4d8b92", "displayName": "Andy Warhol" }
    });
    let document = parse(
        r#"
        query Artwork { artwork { id: title title: slug } }
        query Artist { artist { displayName: internalID _id: displayName } }
        "#,
    );

    let artwork = built
        .execute(
            ExecutionRequest::new(document.clone())
                .with_operation_name("Artwork")
                .with_root_value(root_value.clone()),
        )
        .await?;
    assert!(artwork.errors.is_empty(), "{:?}", artwork.errors);
    assert_eq!(
        artwork.data,
        json!({ "artwork": { "id": "Skull", "title": "andy-warhol-skull" } })
    );

    let artist = built
        .execute(
            ExecutionRequest::new(document)
                .with_operation_name("Artist")
                .with_root_value(root_value),
        )
        .await?;
    assert!(artist.errors.is_empty(), "{:?}", artist.errors);
    assert_eq!(
        artist.data,
        json!({ "artist": { "displayName": "4d8b92", "_id": "Andy Warhol" } })
    );

    Ok(())
}

#[tokio::test]
async fn one_public_name_maps_back_per_enclosing_type() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let local = SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?;
    let built = Pipeline::from_config(&config(
        r#"
        transforms:
          - type: rename_fields
            fields:
              - { on: Artwork, from: title, to: name }
              - { on: Artist, from: displayName, to: name }
        "#,
    ))
    .build(local)?;

    let document = parse("{ artwork { name } artist { name } }");
    insta::assert_snapshot!(built.rewrite_document(&document), @r"
    {
      artwork {
        title
      }
      artist {
        displayName
      }
    }
    ");

    let response = built
        .execute(ExecutionRequest::new(document).with_root_value(json!({
            "artwork": { "title": "Skull" },
            "artist": { "displayName": "Andy Warhol" }
        })))
        .await?;
    assert_eq!(
        response.data,
        json!({ "artwork": { "name": "Skull" }, "artist": { "name": "Andy Warhol" } })
    );

    Ok(())
}

#[tokio::test]
async fn typename_survives_every_transform() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let local = SchemaGraph::from_sdl("local", LOCAL_SCHEMA)?;
    let built = Pipeline::new()
        .with(TransformFields::new(
            "hostile",
            renamer(|_, field| match field.name.as_str() {
                "code" => FieldRename::Drop,
                _ => FieldRename::RenameTo(format!("x{}", field.name)),
            }),
        ))
        .build(local)?;

    let document = parse("{ xorder { __typename kind: __typename } }");
    insta::assert_snapshot!(built.rewrite_document(&document), @r"
    {
      order {
        __typename
        kind: __typename
      }
    }
    ");

    let response = built
        .execute(ExecutionRequest::new(document).with_root_value(json!({ "order": {} })))
        .await?;
    assert_eq!(
        response.data,
        json!({ "xorder": { "__typename": "Order", "kind": "Order" } })
    );

    Ok(())
}

#[test]
fn nullable_untagged_id_never_builds() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let local = SchemaGraph::from_sdl(
        "local",
        r#"
        type Query { show: Show, fair: Fair, partner: Partner }
        type Show { id: ID, name: String }
        type Fair { id: ID!, name: String }
        type Partner { id: ID }
        "#,
    )?;

    let config = config(
        r#"
        id_policy:
          allowed_untagged_id_types: [Partner]
        transforms:
          - type: normalize_ids
          - type: drop_deprecated
        "#,
    );

    let errors = Pipeline::from_config(&config)
        .build(local)
        .expect_err("untagged identifiers");

    assert_eq!(
        errors.0,
        vec![
            SchemaBuildError::NullableId {
                type_name: "Show".to_string()
            },
            SchemaBuildError::UntaggedId {
                type_name: "Fair".to_string()
            },
        ]
    );
    insta::assert_snapshot!(errors, @r"
    schema build failed with 2 error(s)
      - 'Show.id' is nullable; identifier fields must be non-null
      - 'Fair.id' has no identifier tag in its description; tag it or rename it
    ");

    Ok(())
}

#[test]
fn configured_steps_run_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let local = SchemaGraph::from_sdl(
        "local",
        r#"
        type Query { artwork: Artwork, sale: Sale }
        type Artwork {
          title: String
          price: String @deprecated(reason: "use priceListed")
          secret: String
        }
        type Sale { secret: String }
        "#,
    )?;

    let built = Pipeline::from_config(&config(
        r#"
        transforms:
          - type: filter_fields
            remove: [{ on: Artwork, field: secret }, { on: Sale, field: secret }]
          - type: drop_deprecated
          - type: drop_empty_types
          - type: rename_fields
            fields: [{ on: Artwork, from: title, to: name }]
        "#,
    ))
    .build(local)?;

    assert!(!built.schema.contains_type("Sale"));
    assert!(built.schema.field("Query", "sale").is_none());
    let artwork_fields = built
        .schema
        .type_by_name("Artwork")
        .and_then(|t| t.fields())
        .map(|fields| fields.keys().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(artwork_fields, Some(vec!["name"]));
    assert_eq!(built.rewrites.stages().len(), 1);

    Ok(())
}
