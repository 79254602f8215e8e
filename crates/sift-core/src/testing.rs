//! Shared fixtures for unit tests.

use crate::catalog::{Catalog, EntityDef, FieldDef, FieldType, ScalarType, SchemaBundle};

/// A small entity model:
///
/// - `User` with scalars, an embedded `Address`, a `company` reference,
///   a `roles` set and a `nicknames` list of embedded `Nickname` values
/// - `Company` with its own embedded `Address`
/// - `Role`
/// - `Membership`, identified by two attributes together
/// - `Account` with one attribute of each remaining numeric type
pub(crate) fn catalog() -> Catalog {
    let address = EntityDef::embeddable("Address")
        .with_field(FieldDef::new("city", FieldType::scalar(ScalarType::String)))
        .with_field(FieldDef::optional_scalar("zip", ScalarType::String));

    let nickname = EntityDef::embeddable("Nickname")
        .with_field(FieldDef::new("value", FieldType::scalar(ScalarType::String)));

    let user = EntityDef::new("User", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("name", FieldType::scalar(ScalarType::String)),
        FieldDef::optional_scalar("email", ScalarType::String),
        FieldDef::optional_scalar("age", ScalarType::Int32),
        FieldDef::optional(
            "status",
            FieldType::OptionalEnum {
                name: "Status".into(),
                variants: vec!["ACTIVE".into(), "PENDING".into(), "CLOSED".into()],
            },
        ),
        FieldDef::optional_scalar("created", ScalarType::Timestamp),
        FieldDef::optional_scalar("birthday", ScalarType::Date),
        FieldDef::optional_scalar("active", ScalarType::Bool),
        FieldDef::optional("address", FieldType::OptionalEmbedded {
            entity: "Address".into(),
        }),
        FieldDef::optional("company", FieldType::reference("Company")),
        FieldDef::optional("roles", FieldType::set("Role")),
        FieldDef::optional("nicknames", FieldType::list("Nickname")),
        FieldDef::optional_scalar("scratch", ScalarType::String).transient(),
    ]);

    let company = EntityDef::new("Company", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("name", FieldType::scalar(ScalarType::String)),
        FieldDef::optional("address", FieldType::OptionalEmbedded {
            entity: "Address".into(),
        }),
    ]);

    let role = EntityDef::new("Role", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("name", FieldType::scalar(ScalarType::String)),
        FieldDef::optional_scalar("level", ScalarType::Int32),
    ]);

    let membership = EntityDef::with_composite_identity("Membership", ["user_id", "group_id"])
        .with_fields([
            FieldDef::new("user_id", FieldType::scalar(ScalarType::Int64)),
            FieldDef::new("group_id", FieldType::scalar(ScalarType::Int64)),
            FieldDef::optional("roles", FieldType::list("Role")),
        ]);

    let account = EntityDef::new("Account", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::optional_scalar("rank", ScalarType::Int16),
        FieldDef::optional_scalar("score", ScalarType::Float64),
        FieldDef::optional_scalar(
            "balance",
            ScalarType::Decimal {
                precision: 12,
                scale: 2,
            },
        ),
        FieldDef::optional_scalar("points", ScalarType::BigInt),
    ]);

    let schema = SchemaBundle::new(1)
        .with_entity(address)
        .with_entity(nickname)
        .with_entity(user)
        .with_entity(company)
        .with_entity(role)
        .with_entity(membership)
        .with_entity(account);

    match Catalog::new(schema) {
        Ok(catalog) => catalog,
        Err(e) => panic!("fixture catalog is invalid: {e}"),
    }
}
