//! The filter specification: a declarative description of one query.

use super::grammar;
use super::operator::{Operator, OperatorCategory};
use super::restriction::{Restriction, RestrictionValue};
use crate::config::DateFormats;
use crate::error::Error;
use serde::Serialize;
use sift_proto::{ColumnFunction, JoinKind, OrderDirection, Pagination, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Per-path override of how a template attribute is compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOverride {
    /// Compile the template value with this operator instead of `EQUAL`.
    Apply(Operator),
    /// Skip the attribute entirely.
    Ignore,
}

/// A projected column.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// Dotted attribute path on the root entity.
    pub source: String,
    /// Function applied to the attribute.
    pub aggregate: ColumnFunction,
    /// Dotted target path in the result object.
    pub alias: String,
}

/// One ordering key.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Dotted attribute path.
    pub path: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

/// How a path is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinDirective {
    /// Join kind.
    pub kind: JoinKind,
    /// Fetch the association with its owner.
    pub fetch: bool,
    /// Join the path even if nothing else references it.
    pub forced: bool,
}

impl JoinDirective {
    /// A directive with the given kind.
    pub fn new(kind: JoinKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Mark as fetch join.
    pub fn fetch(mut self) -> Self {
        self.fetch = true;
        self
    }

    /// Mark as forced.
    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }
}

/// What happens when a text token matches no whitelisted operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Decline the token.
    #[default]
    None,
    /// Retry as this operator; decline if that fails too.
    Optional(Operator),
    /// Retry as this operator; fail if that fails too.
    Required(Operator),
}

/// A declarative query over one entity type.
///
/// Holds an optional template object (an instance of the entity whose
/// non-null attributes become restrictions), complex restrictions keyed by
/// dotted attribute path, projections, ordering, grouping, join directives
/// and an optional result range.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    entity: String,
    template: Option<serde_json::Value>,
    overrides: HashMap<String, FieldOverride>,
    restrictions: Vec<(String, Vec<Restriction>)>,
    projections: Vec<Projection>,
    order: Vec<SortKey>,
    group_by: Vec<String>,
    joins: BTreeMap<String, JoinDirective>,
    collection_selection: Option<bool>,
    range: Option<Pagination>,
    date_formats: DateFormats,
}

impl FilterSpec {
    /// Create an empty specification for an entity type.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Default::default()
        }
    }

    /// Use these date formats when classifying text tokens.
    pub fn with_date_formats(mut self, formats: DateFormats) -> Self {
        self.date_formats = formats;
        self
    }

    /// Use an entity instance as the template.
    pub fn with_template<T: Serialize>(mut self, template: &T) -> Result<Self, Error> {
        self.template = Some(serde_json::to_value(template)?);
        Ok(self)
    }

    /// Set (or clear) the template as a JSON object.
    pub fn set_template(&mut self, template: Option<serde_json::Value>) -> &mut Self {
        self.template = template;
        self
    }

    /// Entity type this specification queries.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The template object, if any.
    pub fn template(&self) -> Option<&serde_json::Value> {
        self.template.as_ref()
    }

    /// Date formats used for text tokens.
    pub fn date_formats(&self) -> &DateFormats {
        &self.date_formats
    }

    // ---- template overrides ----

    /// Compile the template value at `path` with `operator`.
    pub fn set_operator(&mut self, path: impl Into<String>, operator: Operator) -> &mut Self {
        self.overrides
            .insert(path.into(), FieldOverride::Apply(operator));
        self
    }

    /// Skip the template value at `path`.
    pub fn ignore(&mut self, path: impl Into<String>) -> &mut Self {
        self.overrides.insert(path.into(), FieldOverride::Ignore);
        self
    }

    /// Override registered for a path.
    pub fn field_override(&self, path: &str) -> Option<FieldOverride> {
        self.overrides.get(path).copied()
    }

    // ---- complex restrictions ----

    /// Add a restriction on `path`. Restrictions on the same path accumulate.
    pub fn add_restriction(&mut self, path: impl Into<String>, restriction: Restriction) -> &mut Self {
        let path = path.into();
        match self.restrictions.iter_mut().find(|(p, _)| *p == path) {
            Some((_, list)) => list.push(restriction),
            None => self.restrictions.push((path, vec![restriction])),
        }
        self
    }

    /// Add a restriction built from an operator and a value.
    pub fn add(
        &mut self,
        path: impl Into<String>,
        operator: Operator,
        value: RestrictionValue,
    ) -> Result<&mut Self, Error> {
        let path = path.into();
        let restriction = Restriction::new(&path, operator, value)?;
        Ok(self.add_restriction(path, restriction))
    }

    /// `path = value`.
    pub fn add_where_equal(
        &mut self,
        path: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, Error> {
        self.add(path, Operator::Equal, RestrictionValue::Scalar(value.into()))
    }

    /// `path <> value`.
    pub fn add_where_not_equal(
        &mut self,
        path: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, Error> {
        self.add(path, Operator::NotEqual, RestrictionValue::Scalar(value.into()))
    }

    /// `path` compared to a single value with any single-valued operator.
    pub fn add_where(
        &mut self,
        path: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Result<&mut Self, Error> {
        self.add(path, operator, RestrictionValue::Scalar(value.into()))
    }

    /// `path LIKE '%text%'`, with `text` matched literally.
    pub fn add_where_like(
        &mut self,
        path: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<&mut Self, Error> {
        self.add(
            path,
            Operator::LikeMatchAnywhere,
            RestrictionValue::Scalar(Value::String(text.into())),
        )
    }

    /// `path IN (values)`.
    pub fn add_where_in<V: Into<Value>>(
        &mut self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Result<&mut Self, Error> {
        let values = values.into_iter().map(Into::into).collect();
        self.add(path, Operator::In, RestrictionValue::List(values))
    }

    /// `path BETWEEN low AND high`.
    pub fn add_where_between(
        &mut self,
        path: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<&mut Self, Error> {
        self.add(
            path,
            Operator::Between,
            RestrictionValue::Range(low.into(), high.into()),
        )
    }

    /// `path IS NULL`.
    pub fn add_where_null(&mut self, path: impl Into<String>) -> &mut Self {
        self.add_restriction(path, Restriction::null_check(Operator::IsNull))
    }

    /// `path IS NOT NULL`.
    pub fn add_where_not_null(&mut self, path: impl Into<String>) -> &mut Self {
        self.add_restriction(path, Restriction::null_check(Operator::IsNotNull))
    }

    /// `path` compared to the attribute at `other` with a field-to-field operator.
    pub fn add_field_comparison(
        &mut self,
        path: impl Into<String>,
        operator: Operator,
        other: impl Into<String>,
    ) -> Result<&mut Self, Error> {
        self.add(path, operator, RestrictionValue::Path(other.into()))
    }

    /// Classify a text token and add the resulting restrictions.
    ///
    /// Only operators in `categories` are tried. If none matches, the
    /// `fallback` decides: retry as one operator, and either decline
    /// (`Ok(false)`) or fail with [`Error::UnclassifiableToken`].
    pub fn apply_text_rule(
        &mut self,
        path: impl Into<String>,
        text: &str,
        categories: &[OperatorCategory],
        fallback: Fallback,
    ) -> Result<bool, Error> {
        let path = path.into();
        let token = text.trim();
        if token.is_empty() {
            return Ok(false);
        }

        let classified = grammar::classify(&path, token, categories, &self.date_formats)?;
        let parsed = match (classified, fallback) {
            (Some(restrictions), _) => Some(restrictions),
            (None, Fallback::None) => None,
            (None, Fallback::Optional(op)) | (None, Fallback::Required(op)) => {
                grammar::parse_as(&path, op, token, &self.date_formats)?
            }
        };

        match parsed {
            Some(restrictions) => {
                trace!(
                    path = %path,
                    token = token,
                    operators = restrictions.len(),
                    "Classified text restriction"
                );
                for restriction in restrictions {
                    self.add_restriction(path.clone(), restriction);
                }
                Ok(true)
            }
            None if matches!(fallback, Fallback::Required(_)) => Err(Error::UnclassifiableToken {
                path,
                token: token.to_string(),
            }),
            None => Ok(false),
        }
    }

    /// Classify a text token against every operator, declining silently.
    pub fn apply_text(&mut self, path: impl Into<String>, text: &str) -> Result<bool, Error> {
        self.apply_text_rule(path, text, &OperatorCategory::ALL, Fallback::None)
    }

    /// All restrictions, grouped by path in insertion order.
    pub fn restrictions(&self) -> &[(String, Vec<Restriction>)] {
        &self.restrictions
    }

    /// Restrictions on one path.
    pub fn restrictions_for(&self, path: &str) -> &[Restriction] {
        self.restrictions
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, list)| list.as_slice())
            .unwrap_or_default()
    }

    /// Check if any restriction sits strictly below `prefix`.
    pub fn has_restrictions_below(&self, prefix: &str) -> bool {
        self.restrictions
            .iter()
            .any(|(p, _)| is_below(p, prefix))
    }

    // ---- projection ----

    /// Add a projected column.
    pub fn add_projection(
        &mut self,
        source: impl Into<String>,
        aggregate: ColumnFunction,
        alias: impl Into<String>,
    ) -> &mut Self {
        self.projections.push(Projection {
            source: source.into(),
            aggregate,
            alias: alias.into(),
        });
        self
    }

    /// Project an attribute into the same path of the result.
    pub fn select(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        self.add_projection(path.clone(), ColumnFunction::Field, path)
    }

    /// Project an attribute into another path of the result.
    pub fn select_as(&mut self, path: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.add_projection(path, ColumnFunction::Field, alias)
    }

    /// Projected columns in order.
    pub fn projections(&self) -> &[Projection] {
        &self.projections
    }

    /// Set whether to-many projections load with a second query.
    pub fn set_collection_selection(&mut self, enabled: bool) -> &mut Self {
        self.collection_selection = Some(enabled);
        self
    }

    /// Explicit collection selection setting, if any.
    pub fn collection_selection(&self) -> Option<bool> {
        self.collection_selection
    }

    // ---- ordering, grouping, paging ----

    /// Add an ordering key.
    pub fn add_order(&mut self, path: impl Into<String>, direction: OrderDirection) -> &mut Self {
        self.order.push(SortKey {
            path: path.into(),
            direction,
        });
        self
    }

    /// Order ascending by `path`.
    pub fn order_asc(&mut self, path: impl Into<String>) -> &mut Self {
        self.add_order(path, OrderDirection::Asc)
    }

    /// Order descending by `path`.
    pub fn order_desc(&mut self, path: impl Into<String>) -> &mut Self {
        self.add_order(path, OrderDirection::Desc)
    }

    /// Ordering keys in order.
    pub fn order(&self) -> &[SortKey] {
        &self.order
    }

    /// Group by `path`. Adding the same path twice has no effect.
    pub fn add_group_by(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        if !self.group_by.contains(&path) {
            self.group_by.push(path);
        }
        self
    }

    /// Grouping paths.
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Restrict results to `limit` rows after skipping `offset`.
    pub fn set_range(&mut self, offset: u32, limit: u32) -> &mut Self {
        self.range = Some(Pagination::new(limit, offset));
        self
    }

    /// Result range, if any.
    pub fn range(&self) -> Option<&Pagination> {
        self.range.as_ref()
    }

    // ---- joins ----

    /// Set how `path` is joined.
    pub fn add_join(&mut self, path: impl Into<String>, directive: JoinDirective) -> &mut Self {
        self.joins.insert(path.into(), directive);
        self
    }

    /// Force a join of `path` with the given kind.
    pub fn force_join(&mut self, path: impl Into<String>, kind: JoinKind) -> &mut Self {
        self.add_join(path, JoinDirective::new(kind).forced())
    }

    /// Force a left fetch join of `path`.
    pub fn fetch(&mut self, path: impl Into<String>) -> &mut Self {
        self.add_join(path, JoinDirective::new(JoinKind::Left).fetch().forced())
    }

    /// Directive for a path, if any.
    pub fn join_directive(&self, path: &str) -> Option<&JoinDirective> {
        self.joins.get(path)
    }

    /// Join directives, parents before children.
    pub fn joins(&self) -> impl Iterator<Item = (&str, &JoinDirective)> {
        self.joins.iter().map(|(p, d)| (p.as_str(), d))
    }

    /// Restrictions on `attribute.*`, with that prefix removed.
    pub(crate) fn restrictions_under(&self, attribute: &str) -> Vec<(String, Vec<Restriction>)> {
        self.restrictions
            .iter()
            .filter(|(p, _)| is_below(p, attribute))
            .map(|(p, list)| (p[attribute.len() + 1..].to_string(), list.clone()))
            .collect()
    }
}

/// Check if `path` lies strictly below `prefix` (`prefix.x`, `prefix.x.y`, ...).
pub(crate) fn is_below(path: &str, prefix: &str) -> bool {
    path.len() > prefix.len() + 1
        && path.starts_with(prefix)
        && path.as_bytes()[prefix.len()] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restrictions_accumulate_per_path() {
        let mut spec = FilterSpec::new("User");
        spec.add_where_equal("name", "Alice").unwrap();
        spec.add_where_not_null("name");
        spec.add_where_between("age", 18i64, 30i64).unwrap();

        assert_eq!(spec.restrictions().len(), 2);
        assert_eq!(spec.restrictions_for("name").len(), 2);
        assert_eq!(spec.restrictions_for("age")[0].operator, Operator::Between);
        assert!(spec.restrictions_for("missing").is_empty());
    }

    #[test]
    fn test_overrides() {
        let mut spec = FilterSpec::new("User");
        spec.set_operator("status", Operator::LikeMatchAnywhere)
            .ignore("age");

        assert_eq!(
            spec.field_override("status"),
            Some(FieldOverride::Apply(Operator::LikeMatchAnywhere))
        );
        assert_eq!(spec.field_override("age"), Some(FieldOverride::Ignore));
        assert_eq!(spec.field_override("name"), None);
    }

    #[test]
    fn test_apply_text_rule() {
        let mut spec = FilterSpec::new("Order");
        assert!(spec.apply_text("created", ">=2020-01-01").unwrap());
        assert!(spec.apply_text("total", ">=1;<5").unwrap());
        assert!(!spec.apply_text("status", "pending").unwrap());
        assert!(!spec.apply_text("status", "   ").unwrap());

        assert_eq!(spec.restrictions_for("total").len(), 2);
        assert!(spec.restrictions_for("status").is_empty());
    }

    #[test]
    fn test_apply_text_rule_fallback() {
        let mut spec = FilterSpec::new("Order");
        let applied = spec
            .apply_text_rule(
                "status",
                "pend",
                &[OperatorCategory::Null],
                Fallback::Optional(Operator::LikeMatchAnywhere),
            )
            .unwrap();
        assert!(applied);
        assert_eq!(
            spec.restrictions_for("status")[0].operator,
            Operator::LikeMatchAnywhere
        );

        let declined = spec
            .apply_text_rule(
                "total",
                "abc",
                &[OperatorCategory::Range],
                Fallback::Optional(Operator::Between),
            )
            .unwrap();
        assert!(!declined);

        let err = spec
            .apply_text_rule(
                "total",
                "abc",
                &[OperatorCategory::Range],
                Fallback::Required(Operator::Between),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnclassifiableToken { ref path, ref token } if path == "total" && token == "abc"
        ));
    }

    #[test]
    fn test_projection_and_grouping() {
        let mut spec = FilterSpec::new("User");
        spec.select("name")
            .select_as("address.city", "city")
            .add_projection("age", ColumnFunction::Max, "oldest")
            .add_group_by("name")
            .add_group_by("name");

        assert_eq!(spec.projections().len(), 3);
        assert_eq!(spec.projections()[1].alias, "city");
        assert_eq!(spec.group_by(), ["name".to_string()]);
    }

    #[test]
    fn test_joins_sorted_parent_first() {
        let mut spec = FilterSpec::new("User");
        spec.force_join("company.address", JoinKind::Left)
            .fetch("company");

        let paths: Vec<&str> = spec.joins().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["company", "company.address"]);
        assert!(spec.join_directive("company").unwrap().fetch);
    }

    #[test]
    fn test_restrictions_under() {
        let mut spec = FilterSpec::new("User");
        spec.add_where_equal("roles.name", "admin").unwrap();
        spec.add_where_equal("rolesx", "nope").unwrap();
        spec.add_where_null("roles");

        let under = spec.restrictions_under("roles");
        assert_eq!(under.len(), 1);
        assert_eq!(under[0].0, "name");
        assert!(spec.has_restrictions_below("roles"));
        assert!(!spec.has_restrictions_below("name"));
    }

    #[test]
    fn test_template() {
        #[derive(Serialize)]
        struct Example {
            name: Option<String>,
        }

        let spec = FilterSpec::new("User")
            .with_template(&Example {
                name: Some("Alice".into()),
            })
            .unwrap();
        assert_eq!(spec.template(), Some(&serde_json::json!({"name": "Alice"})));
    }
}
