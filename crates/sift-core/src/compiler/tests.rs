use super::*;
use crate::filter::{Fallback, Operator, OperatorCategory, RestrictionValue};
use crate::testing;
use chrono::NaiveDateTime;
use pretty_assertions::assert_eq;
use serde_json::json;
use sift_proto::{ColumnFunction, Comparison, JoinKind, Operand, OrderDirection};

fn compile(spec: &FilterSpec) -> Result<CompiledQuery, Error> {
    let catalog = testing::catalog();
    let config = CompilerConfig::default();
    QueryCompiler::new(&catalog, &config).compile(spec)
}

fn user_template(template: serde_json::Value) -> FilterSpec {
    let mut spec = FilterSpec::new("User");
    spec.set_template(Some(template));
    spec
}

fn ts(text: &str) -> Value {
    Value::from_datetime(NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").unwrap())
}

fn cond(comparison: Comparison) -> Condition {
    Condition::Test(comparison)
}

#[test]
fn test_template_equality() {
    let spec = user_template(json!({"name": "Alice", "age": null, "email": null}));
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::eq(FieldRef::root("name"), "Alice"))]
    );
    assert!(compiled.page_plan.joins.is_empty());
    assert_eq!(
        compiled.page_plan.selection,
        Selection::Entities { distinct: false }
    );
}

#[test]
fn test_template_ignore_and_override() {
    let mut spec = user_template(json!({"name": "Alice", "age": 30, "status": "PEND"}));
    spec.ignore("age")
        .set_operator("status", Operator::LikeMatchAnywhere)
        .set_operator("email", Operator::IsNull);
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![
            cond(Comparison::eq(FieldRef::root("name"), "Alice")),
            cond(Comparison::IsNull {
                field: FieldRef::root("email")
            }),
            cond(Comparison::like(FieldRef::root("status"), "%PEND%")),
        ]
    );
}

#[test]
fn test_template_values_take_declared_type() {
    let spec = user_template(json!({"age": 30, "birthday": "2000-02-29"}));
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![
            cond(Comparison::eq(FieldRef::root("age"), Value::Int32(30))),
            cond(Comparison::eq(
                FieldRef::root("birthday"),
                Value::from_date(chrono::NaiveDate::from_ymd_opt(2000, 2, 29).unwrap())
            )),
        ]
    );
}

#[test]
fn test_template_nested_objects() {
    let spec = user_template(json!({
        "address": {"city": "Oslo", "zip": null},
        "company": {"name": null, "address": {"city": null}},
    }));
    let compiled = compile(&spec).unwrap();

    // The company template carries no values and adds no join.
    assert_eq!(compiled.page_plan.joins.len(), 1);
    assert_eq!(compiled.page_plan.joins[0].path, "address");
    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::eq(FieldRef::joined(0, "city"), "Oslo"))]
    );
}

#[test]
fn test_template_collection_elements_share_one_join() {
    let spec = user_template(json!({
        "roles": [{"name": "admin"}, {"name": "dev", "level": 2}],
    }));
    let compiled = compile(&spec).unwrap();

    assert_eq!(compiled.page_plan.joins.len(), 1);
    assert_eq!(
        compiled.page_plan.conditions,
        vec![
            cond(Comparison::eq(FieldRef::joined(0, "name"), "admin")),
            cond(Comparison::eq(FieldRef::joined(0, "name"), "dev")),
            cond(Comparison::eq(FieldRef::joined(0, "level"), Value::Int32(2))),
        ]
    );
    assert_eq!(
        compiled.page_plan.selection,
        Selection::Entities { distinct: true }
    );
}

#[test]
fn test_template_must_be_object() {
    let spec = user_template(json!(["not", "an", "object"]));
    assert!(matches!(compile(&spec), Err(Error::Config(_))));
}

#[test]
fn test_template_relationship_needs_object() {
    let spec = user_template(json!({"company": 1}));
    assert!(matches!(
        compile(&spec),
        Err(Error::InvalidRestriction { ref path, .. }) if path == "company"
    ));

    let spec = user_template(json!({"address": "Oslo"}));
    assert!(matches!(
        compile(&spec),
        Err(Error::InvalidRestriction { ref path, .. }) if path == "address"
    ));

    let spec = user_template(json!({"roles": {"name": "admin"}}));
    assert!(matches!(
        compile(&spec),
        Err(Error::InvalidRestriction { ref path, .. }) if path == "roles"
    ));
}

#[test]
fn test_unknown_entity() {
    let spec = FilterSpec::new("Ghost");
    assert!(matches!(compile(&spec), Err(Error::UnknownEntity(ref e)) if e == "Ghost"));
}

#[test]
fn test_collection_equal_is_disjunction() {
    let mut spec = FilterSpec::new("User");
    spec.add(
        "address.city",
        Operator::Equal,
        RestrictionValue::List(vec!["Oslo".into(), "Bergen".into()]),
    )
    .unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![Condition::AnyOf(vec![
            Comparison::eq(FieldRef::joined(0, "city"), "Oslo"),
            Comparison::eq(FieldRef::joined(0, "city"), "Bergen"),
        ])]
    );
}

#[test]
fn test_collection_not_equal_is_conjunction() {
    let mut spec = FilterSpec::new("User");
    spec.add(
        "name",
        Operator::NotEqual,
        RestrictionValue::List(vec!["a".into(), "b".into()]),
    )
    .unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![
            cond(Comparison::ne(FieldRef::root("name"), "a")),
            cond(Comparison::ne(FieldRef::root("name"), "b")),
        ]
    );
}

#[test]
fn test_text_between_on_timestamp() {
    let mut spec = FilterSpec::new("User");
    spec.apply_text("created", "2020-01-01 & 2020-12-31").unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::between(
            FieldRef::root("created"),
            ts("2020-01-01T00:00:00"),
            ts("2020-12-31T23:59:59.999"),
        ))]
    );
}

#[test]
fn test_text_on_string_keeps_token_text() {
    let mut spec = FilterSpec::new("User");
    spec.apply_text("address.zip", "(01234, 00501)").unwrap();
    let compiled = compile(&spec).unwrap();
    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::in_values(
            FieldRef::joined(0, "zip"),
            vec!["01234".into(), "00501".into()]
        ))]
    );

    let mut spec = FilterSpec::new("User");
    spec.apply_text("address.zip", ">=0100").unwrap();
    let compiled = compile(&spec).unwrap();
    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::Ge {
            left: Operand::Field(FieldRef::joined(0, "zip")),
            right: Operand::Literal("0100".into()),
        })]
    );

    let mut spec = FilterSpec::new("User");
    spec.apply_text("name", "<2.50").unwrap();
    let compiled = compile(&spec).unwrap();
    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::Lt {
            left: Operand::Field(FieldRef::root("name")),
            right: Operand::Literal("2.50".into()),
        })]
    );

    // A date-looking token stays as written, with no end-of-day bound.
    let mut spec = FilterSpec::new("User");
    spec.apply_text("email", "<=2020-01-01").unwrap();
    let compiled = compile(&spec).unwrap();
    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::Le {
            left: Operand::Field(FieldRef::root("email")),
            right: Operand::Literal("2020-01-01".into()),
        })]
    );
}

#[test]
fn test_text_on_numbers_still_typed() {
    let mut spec = FilterSpec::new("User");
    spec.apply_text("age", "(018, 21)").unwrap();
    let compiled = compile(&spec).unwrap();
    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::in_values(
            FieldRef::root("age"),
            vec![Value::Int32(18), Value::Int32(21)]
        ))]
    );
}

#[test]
fn test_between_numeric_types() {
    fn between(path: &str, token: &str) -> Vec<Condition> {
        let mut spec = FilterSpec::new("Account");
        assert!(spec.apply_text(path, token).unwrap());
        compile(&spec).unwrap().page_plan.conditions
    }

    assert_eq!(
        between("rank", "1 & 5"),
        vec![cond(Comparison::between(
            FieldRef::root("rank"),
            Value::Int16(1),
            Value::Int16(5)
        ))]
    );
    assert_eq!(
        between("score", "0.5 & 2"),
        vec![cond(Comparison::between(
            FieldRef::root("score"),
            Value::Float64(0.5),
            Value::Float64(2.0)
        ))]
    );
    assert_eq!(
        between("balance", "10.25 & 99.99"),
        vec![cond(Comparison::between(
            FieldRef::root("balance"),
            Value::Float64(10.25),
            Value::Float64(99.99)
        ))]
    );
    assert_eq!(
        between("points", "1 & 170141183460469231731687303715884105727"),
        vec![cond(Comparison::between(
            FieldRef::root("points"),
            Value::BigInt(1),
            Value::BigInt(i128::MAX)
        ))]
    );

    let mut spec = FilterSpec::new("Account");
    spec.add_where_between("rank", 1i64, 70_000i64).unwrap();
    assert!(matches!(
        compile(&spec),
        Err(Error::InvalidRestriction { operator: Operator::Between, .. })
    ));
}

#[test]
fn test_between_rejects_strings() {
    let mut spec = FilterSpec::new("User");
    spec.add_where_between("address.zip", "A", "M").unwrap();
    assert!(matches!(
        compile(&spec),
        Err(Error::UnsupportedType { operator: Operator::Between, ref path, .. }) if path == "address.zip"
    ));

    let mut spec = FilterSpec::new("User");
    spec.apply_text("name", "A & M").unwrap();
    assert!(matches!(
        compile(&spec),
        Err(Error::UnsupportedType { operator: Operator::Between, .. })
    ));
}

#[test]
fn test_text_comparison_keeps_end_of_day_on_dates() {
    let mut spec = FilterSpec::new("User");
    spec.apply_text("birthday", "<=2020-01-01").unwrap();
    spec.apply_text("birthday", ">2019-01-01").unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![
            cond(Comparison::Le {
                left: Operand::Field(FieldRef::root("birthday")),
                right: Operand::Literal(ts("2020-01-01T23:59:59.999")),
            }),
            cond(Comparison::Gt {
                left: Operand::Field(FieldRef::root("birthday")),
                right: Operand::Literal(ts("2019-01-01T00:00:00")),
            }),
        ]
    );
}

#[test]
fn test_text_like_and_membership() {
    let mut spec = FilterSpec::new("User");
    spec.apply_text("status", "%pend%").unwrap();
    spec.apply_text("age", "(18, 21)").unwrap();
    spec.apply_text_rule(
        "name",
        "ali",
        &[OperatorCategory::Null],
        Fallback::Required(Operator::ILikeMatchStart),
    )
    .unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![
            cond(Comparison::Like {
                operand: Operand::Upper(FieldRef::root("name")),
                pattern: "ALI%".into(),
            }),
            cond(Comparison::in_values(
                FieldRef::root("age"),
                vec![Value::Int32(18), Value::Int32(21)]
            )),
            cond(Comparison::like(FieldRef::root("status"), "%pend%")),
        ]
    );
}

#[test]
fn test_like_literal_is_escaped() {
    let mut spec = FilterSpec::new("User");
    spec.add_where("name", Operator::NotLikeMatchEnd, "50%_off").unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::NotLike {
            operand: Operand::Field(FieldRef::root("name")),
            pattern: r"%50\%\_off".into(),
        })]
    );
}

#[test]
fn test_single_join_per_path() {
    let mut spec = FilterSpec::new("User");
    spec.add_where_equal("roles.name", "admin").unwrap();
    spec.add_where("roles.level", Operator::GreaterThan, 1i64).unwrap();
    spec.add_where_equal("company.address.city", "Oslo").unwrap();
    spec.add_where_equal("address.city", "Oslo").unwrap();
    let compiled = compile(&spec).unwrap();

    let paths: Vec<&str> = compiled
        .page_plan
        .joins
        .iter()
        .map(|j| j.path.as_str())
        .collect();
    assert_eq!(paths, vec!["address", "company", "company.address", "roles"]);
    assert_eq!(compiled.page_plan.conditions.len(), 4);
}

#[test]
fn test_unknown_path_is_an_error() {
    let mut spec = FilterSpec::new("User");
    spec.add_where_equal("nmae", "Alice").unwrap();
    assert!(matches!(
        compile(&spec),
        Err(Error::UnknownField { ref path, .. }) if path == "nmae"
    ));

    let mut spec = FilterSpec::new("User");
    spec.add_where_equal("roles.title", "x").unwrap();
    assert!(matches!(
        compile(&spec),
        Err(Error::UnknownField { ref path, .. }) if path == "roles.title"
    ));

    let mut spec = FilterSpec::new("User");
    spec.add_where_equal("scratch", "x").unwrap();
    assert!(matches!(compile(&spec), Err(Error::UnknownField { .. })));
}

#[test]
fn test_unsupported_types() {
    let mut spec = FilterSpec::new("User");
    spec.add_where_between("active", true, false).unwrap();
    assert!(matches!(
        compile(&spec),
        Err(Error::UnsupportedType { operator: Operator::Between, .. })
    ));

    let mut spec = FilterSpec::new("User");
    spec.add_where("age", Operator::LikeMatchStart, "1").unwrap();
    assert!(matches!(compile(&spec), Err(Error::UnsupportedType { .. })));

    let mut spec = FilterSpec::new("User");
    spec.add_where_equal("company", 1i64).unwrap();
    assert!(matches!(compile(&spec), Err(Error::UnsupportedType { .. })));
}

#[test]
fn test_coercion_failure() {
    let mut spec = FilterSpec::new("User");
    spec.add_where_equal("age", "abc").unwrap();
    let err = compile(&spec).unwrap_err();
    assert!(matches!(err, Error::InvalidRestriction { ref path, .. } if path == "age"));
    assert!(err.is_configuration());
}

#[test]
fn test_field_comparison() {
    let mut spec = FilterSpec::new("User");
    spec.add_field_comparison("name", Operator::EqualField, "company.name")
        .unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(compiled.page_plan.joins[0].path, "company");
    assert_eq!(
        compiled.page_plan.conditions,
        vec![cond(Comparison::Eq {
            left: Operand::Field(FieldRef::root("name")),
            right: Operand::Field(FieldRef::joined(0, "name")),
        })]
    );
}

#[test]
fn test_null_check_on_relationship() {
    let mut spec = FilterSpec::new("User");
    spec.add_where_null("company").add_where_not_null("roles");
    let compiled = compile(&spec).unwrap();

    assert!(compiled.page_plan.joins.is_empty());
    assert_eq!(
        compiled.page_plan.conditions,
        vec![
            cond(Comparison::is_null(FieldRef::root("company"))),
            cond(Comparison::IsNotNull {
                field: FieldRef::root("roles")
            }),
        ]
    );
}

#[test]
fn test_forced_and_fetch_joins() {
    let mut spec = FilterSpec::new("User");
    spec.fetch("company").force_join("roles", JoinKind::Inner);
    let compiled = compile(&spec).unwrap();

    assert_eq!(compiled.page_plan.joins.len(), 2);
    assert_eq!(compiled.page_plan.joins[0].kind, JoinKind::Left);
    assert!(compiled.page_plan.joins[0].fetch);
    assert_eq!(
        compiled.page_plan.describe(),
        "SELECT DISTINCT root FROM User root LEFT JOIN FETCH root.company j0 INNER JOIN root.roles j1"
    );
}

#[test]
fn test_projection_defers_to_many() {
    let mut spec = FilterSpec::new("User");
    spec.select("name")
        .select("roles.name")
        .select_as("roles.level", "roles.rank")
        .order_asc("name")
        .order_desc("roles.level");
    spec.add_where_equal("roles.name", "admin").unwrap();
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.page_plan.column_aliases(),
        vec!["name", "__sift_id"]
    );
    assert_eq!(compiled.identifier_alias.as_deref(), Some("__sift_id"));
    assert_eq!(compiled.page_plan.order_by.len(), 1);
    // The restriction still filters the primary rows.
    assert_eq!(compiled.page_plan.joins.len(), 1);
    assert!(compiled.page_plan.group_by.is_empty());

    assert_eq!(compiled.deferred.len(), 1);
    let deferred = &compiled.deferred[0];
    assert_eq!(deferred.attribute, "roles");
    assert_eq!(deferred.kind, CollectionKind::Set);
    let sources: Vec<(&str, &str)> = deferred
        .filter
        .projections()
        .iter()
        .map(|p| (p.source.as_str(), p.alias.as_str()))
        .collect();
    assert_eq!(sources, vec![("name", "name"), ("level", "rank")]);
    assert_eq!(deferred.filter.restrictions_for("name").len(), 1);
    assert_eq!(deferred.filter.order()[0].path, "level");
}

#[test]
fn test_projection_only_collection_forces_group_by() {
    let mut spec = FilterSpec::new("User");
    spec.select("roles.name");
    let compiled = compile(&spec).unwrap();

    assert_eq!(compiled.page_plan.column_aliases(), vec!["__sift_id"]);
    assert_eq!(compiled.page_plan.group_by, vec![FieldRef::root("id")]);
    assert!(compiled.page_plan.joins.is_empty());
}

#[test]
fn test_projection_without_collection_selection() {
    let mut spec = FilterSpec::new("User");
    spec.select("name")
        .select("roles.name")
        .set_collection_selection(false);
    let compiled = compile(&spec).unwrap();

    assert!(compiled.deferred.is_empty());
    assert_eq!(
        compiled.page_plan.selection,
        Selection::Columns {
            columns: vec![
                sift_proto::Column::field(FieldRef::root("name"), "name"),
                sift_proto::Column::field(FieldRef::joined(0, "name"), "roles.name"),
            ],
            distinct: true,
        }
    );
}

#[test]
fn test_projection_aggregates() {
    let mut spec = FilterSpec::new("User");
    spec.select("status")
        .add_projection("age", ColumnFunction::Max, "oldest")
        .add_projection("id", ColumnFunction::Count, "total")
        .add_group_by("status");
    let compiled = compile(&spec).unwrap();

    assert_eq!(compiled.page_plan.group_by, vec![FieldRef::root("status")]);
    assert!(matches!(
        compiled.page_plan.selection,
        Selection::Columns { distinct: false, ref columns } if columns.len() == 3
    ));
}

#[test]
fn test_projecting_relationship_is_rejected() {
    let mut spec = FilterSpec::new("User");
    spec.select("address");
    assert!(matches!(compile(&spec), Err(Error::NotProjectable { .. })));
}

#[test]
fn test_deferred_requires_single_identifier() {
    let mut spec = FilterSpec::new("Membership");
    spec.select("roles.name");
    assert!(matches!(
        compile(&spec),
        Err(Error::CompositeIdentifier { ref entity, .. }) if entity == "Membership"
    ));
}

#[test]
fn test_count_plan() {
    let mut spec = FilterSpec::new("User");
    spec.add_where_equal("roles.name", "admin").unwrap();
    spec.order_desc("name").set_range(20, 10);
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.count_plan.selection,
        Selection::Count {
            field: Some(FieldRef::root("id")),
            distinct: true,
        }
    );
    assert!(compiled.count_plan.order_by.is_empty());
    assert!(compiled.count_plan.pagination.is_none());
    assert_eq!(compiled.count_plan.conditions, compiled.page_plan.conditions);
    assert_eq!(
        compiled.page_plan.pagination,
        Some(Pagination::new(10, 20))
    );
    assert_eq!(
        compiled.paged(Pagination::new(5, 0)).pagination,
        Some(Pagination::new(5, 0))
    );
    assert_eq!(compiled.page_plan.order_by[0].direction, OrderDirection::Desc);
}

#[test]
fn test_count_plan_composite_identifier() {
    let spec = FilterSpec::new("Membership");
    let compiled = compile(&spec).unwrap();

    assert_eq!(
        compiled.count_plan.selection,
        Selection::Count {
            field: None,
            distinct: false,
        }
    );
}

#[test]
fn test_deferred_root_spec() {
    let mut spec = FilterSpec::new("User");
    spec.select("name").select("roles.name").order_asc("roles.name");
    spec.add_where("roles.level", Operator::GreaterThanOrEqualTo, 2i64)
        .unwrap();
    let compiled = compile(&spec).unwrap();

    let root = compiled.deferred[0]
        .root_spec("User", "id", "__sift_id", vec![Value::Int64(1), Value::Int64(2)])
        .unwrap();
    let second = compile(&root).unwrap();

    assert!(second.deferred.is_empty());
    assert_eq!(
        second.page_plan.column_aliases(),
        vec!["name", "__sift_id"]
    );
    assert_eq!(
        second.page_plan.describe(),
        "SELECT DISTINCT j0.name AS name, root.id AS __sift_id FROM User root \
         INNER JOIN root.roles j0 WHERE root.id IN (1, 2) AND j0.level >= 2 \
         ORDER BY j0.name ASC"
    );
}
