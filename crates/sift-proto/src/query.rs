//! Query plan IR produced by the compiler and executed by backends.
//!
//! A plan is a flat value: joins are an ordered list addressed by index, and
//! the WHERE clause is a conjunction of [`Condition`]s, each either a single
//! [`Comparison`] or a disjunction of comparisons. There is no recursive
//! expression tree, which keeps every type archivable with rkyv.

use std::fmt;

use crate::error::Error;
use crate::value::Value;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Relationship kind of an entity attribute.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum RelationKind {
    /// A plain column value.
    Scalar,
    /// A value object stored inline with its owner.
    Embedded,
    /// A single related entity.
    ToOne,
    /// A collection of related entities or embedded values.
    ToMany,
}

impl RelationKind {
    /// Check if the attribute must be traversed through a join.
    pub fn is_relationship(&self) -> bool {
        !matches!(self, RelationKind::Scalar)
    }
}

/// Join kind requested for a path.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum JoinKind {
    /// Rows without a related value are dropped.
    #[default]
    Inner,
    /// Rows without a related value are kept with the joined side empty.
    Left,
}

/// Where a field reference reads its value from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum Source {
    /// The root entity of the plan.
    Root,
    /// The join at this index in [`QueryPlan::joins`].
    Join(u32),
}

/// One join in a plan.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct JoinSpec {
    /// Full dotted path from the root up to and including the joined attribute.
    pub path: String,
    /// Source the joined attribute belongs to.
    pub parent: Source,
    /// Attribute name on the parent.
    pub attribute: String,
    /// Entity (or embeddable) type on the joined side.
    pub target_entity: String,
    /// Relationship kind of the joined attribute.
    pub relation: RelationKind,
    /// Join kind.
    pub kind: JoinKind,
    /// Whether the association should be fetched with the owner.
    pub fetch: bool,
}

/// A reference to an attribute of the root or of a joined source.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub struct FieldRef {
    /// Source of the attribute.
    pub source: Source,
    /// Attribute name on that source.
    pub field: String,
}

impl FieldRef {
    /// Reference an attribute of the root entity.
    pub fn root(field: impl Into<String>) -> Self {
        Self {
            source: Source::Root,
            field: field.into(),
        }
    }

    /// Reference an attribute of a joined source.
    pub fn joined(join: u32, field: impl Into<String>) -> Self {
        Self {
            source: Source::Join(join),
            field: field.into(),
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Operand {
    /// An attribute value.
    Field(FieldRef),
    /// An attribute value folded to upper case.
    Upper(FieldRef),
    /// A literal.
    Literal(Value),
}

impl Operand {
    /// The attribute this operand reads, if any.
    pub fn field_ref(&self) -> Option<&FieldRef> {
        match self {
            Operand::Field(f) | Operand::Upper(f) => Some(f),
            Operand::Literal(_) => None,
        }
    }
}

/// A single predicate.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Comparison {
    /// Left equals right.
    Eq { left: Operand, right: Operand },
    /// Left not equals right.
    Ne { left: Operand, right: Operand },
    /// Left less than right.
    Lt { left: Operand, right: Operand },
    /// Left less than or equal to right.
    Le { left: Operand, right: Operand },
    /// Left greater than right.
    Gt { left: Operand, right: Operand },
    /// Left greater than or equal to right.
    Ge { left: Operand, right: Operand },
    /// Operand is one of the values.
    In { operand: Operand, values: Vec<Value> },
    /// Operand is none of the values.
    NotIn { operand: Operand, values: Vec<Value> },
    /// Attribute is null (or an empty collection).
    IsNull { field: FieldRef },
    /// Attribute is not null.
    IsNotNull { field: FieldRef },
    /// Operand lies in the inclusive range.
    Between { operand: Operand, low: Value, high: Value },
    /// Operand matches a LIKE pattern (`%`, `_`, `\` escapes).
    Like { operand: Operand, pattern: String },
    /// Operand does not match a LIKE pattern.
    NotLike { operand: Operand, pattern: String },
}

impl Comparison {
    /// Field equals literal.
    pub fn eq(field: FieldRef, value: impl Into<Value>) -> Self {
        Comparison::Eq {
            left: Operand::Field(field),
            right: Operand::Literal(value.into()),
        }
    }

    /// Field not equals literal.
    pub fn ne(field: FieldRef, value: impl Into<Value>) -> Self {
        Comparison::Ne {
            left: Operand::Field(field),
            right: Operand::Literal(value.into()),
        }
    }

    /// Field is in a set of literals.
    pub fn in_values(field: FieldRef, values: Vec<Value>) -> Self {
        Comparison::In {
            operand: Operand::Field(field),
            values,
        }
    }

    /// Field is null.
    pub fn is_null(field: FieldRef) -> Self {
        Comparison::IsNull { field }
    }

    /// Field lies between two literals.
    pub fn between(field: FieldRef, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Comparison::Between {
            operand: Operand::Field(field),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Field matches a LIKE pattern.
    pub fn like(field: FieldRef, pattern: impl Into<String>) -> Self {
        Comparison::Like {
            operand: Operand::Field(field),
            pattern: pattern.into(),
        }
    }

    /// Attributes read by this comparison.
    pub fn field_refs(&self) -> Vec<&FieldRef> {
        match self {
            Comparison::Eq { left, right }
            | Comparison::Ne { left, right }
            | Comparison::Lt { left, right }
            | Comparison::Le { left, right }
            | Comparison::Gt { left, right }
            | Comparison::Ge { left, right } => {
                left.field_ref().into_iter().chain(right.field_ref()).collect()
            }
            Comparison::In { operand, .. }
            | Comparison::NotIn { operand, .. }
            | Comparison::Between { operand, .. }
            | Comparison::Like { operand, .. }
            | Comparison::NotLike { operand, .. } => operand.field_ref().into_iter().collect(),
            Comparison::IsNull { field } | Comparison::IsNotNull { field } => vec![field],
        }
    }
}

/// One conjunct of a plan's WHERE clause.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Condition {
    /// A single comparison.
    Test(Comparison),
    /// At least one of the comparisons holds (flat list, single level).
    AnyOf(Vec<Comparison>),
}

/// Function applied to a projected column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum ColumnFunction {
    /// The attribute value itself.
    Field,
    /// Number of non-null values.
    Count,
    /// Maximum value.
    Max,
    /// Minimum value.
    Min,
    /// Sum of numeric values.
    Sum,
    /// Upper-cased string.
    Upper,
    /// Lower-cased string.
    Lower,
}

impl ColumnFunction {
    /// Check if the function aggregates over a group.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            ColumnFunction::Count | ColumnFunction::Max | ColumnFunction::Min | ColumnFunction::Sum
        )
    }
}

/// A projected column.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Column {
    /// Function applied to the attribute.
    pub function: ColumnFunction,
    /// Projected attribute.
    pub field: FieldRef,
    /// Output alias; dots address nested target fields.
    pub alias: String,
}

impl Column {
    /// Project an attribute unchanged.
    pub fn field(field: FieldRef, alias: impl Into<String>) -> Self {
        Self {
            function: ColumnFunction::Field,
            field,
            alias: alias.into(),
        }
    }
}

/// What a plan returns.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub enum Selection {
    /// Whole root entities.
    Entities {
        /// Collapse rows fanned out by to-many joins.
        distinct: bool,
    },
    /// Aliased columns.
    Columns {
        /// Projected columns in output order.
        columns: Vec<Column>,
        /// Collapse identical tuples.
        distinct: bool,
    },
    /// A single row count.
    Count {
        /// Counted attribute; `None` counts rows.
        field: Option<FieldRef>,
        /// Count distinct values of the attribute.
        distinct: bool,
    },
}

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct OrderSpec {
    /// Attribute to order by.
    pub field: FieldRef,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(field: FieldRef) -> Self {
        Self {
            field,
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(field: FieldRef) -> Self {
        Self {
            field,
            direction: OrderDirection::Desc,
        }
    }
}

/// Sort direction.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Pagination parameters.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct Pagination {
    /// Maximum number of results to return.
    pub limit: u32,
    /// Number of results to skip.
    pub offset: u32,
}

impl Pagination {
    /// Create pagination with limit and offset.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Create pagination with just a limit.
    pub fn limit(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }
}

/// A compiled, immutable query plan.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct QueryPlan {
    /// Root entity type.
    pub root_entity: String,
    /// Joins in creation order; a join's parent always precedes it.
    pub joins: Vec<JoinSpec>,
    /// Conjunction of conditions.
    pub conditions: Vec<Condition>,
    /// What the plan returns.
    pub selection: Selection,
    /// Grouping attributes.
    pub group_by: Vec<FieldRef>,
    /// Ordering specification.
    pub order_by: Vec<OrderSpec>,
    /// Pagination parameters.
    pub pagination: Option<Pagination>,
}

impl QueryPlan {
    /// Create a plan that returns every root entity.
    pub fn new(root_entity: impl Into<String>) -> Self {
        Self {
            root_entity: root_entity.into(),
            joins: vec![],
            conditions: vec![],
            selection: Selection::Entities { distinct: false },
            group_by: vec![],
            order_by: vec![],
            pagination: None,
        }
    }

    /// Get a join by source, if the source is a join.
    pub fn join(&self, source: Source) -> Option<&JoinSpec> {
        match source {
            Source::Root => None,
            Source::Join(index) => self.joins.get(index as usize),
        }
    }

    /// Find a join by its full dotted path.
    pub fn join_by_path(&self, path: &str) -> Option<(u32, &JoinSpec)> {
        self.joins
            .iter()
            .enumerate()
            .find(|(_, j)| j.path == path)
            .map(|(i, j)| (i as u32, j))
    }

    /// Entity type bound to a source.
    pub fn source_entity(&self, source: Source) -> Result<&str, Error> {
        match source {
            Source::Root => Ok(&self.root_entity),
            Source::Join(index) => self
                .joins
                .get(index as usize)
                .map(|j| j.target_entity.as_str())
                .ok_or(Error::UnknownJoin(index)),
        }
    }

    /// Check that every join's parent precedes it and every field
    /// reference names an existing source.
    pub fn validate(&self) -> Result<(), Error> {
        for (index, join) in self.joins.iter().enumerate() {
            if let Source::Join(parent) = join.parent {
                if parent as usize >= index {
                    return Err(Error::InvalidPlan(format!(
                        "join j{} on '{}' is declared before its parent j{}",
                        index, join.path, parent
                    )));
                }
            }
        }

        let mut fields: Vec<&FieldRef> = Vec::new();
        for condition in &self.conditions {
            match condition {
                Condition::Test(c) => fields.extend(c.field_refs()),
                Condition::AnyOf(cs) => fields.extend(cs.iter().flat_map(Comparison::field_refs)),
            }
        }
        match &self.selection {
            Selection::Columns { columns, .. } => fields.extend(columns.iter().map(|c| &c.field)),
            Selection::Count {
                field: Some(field), ..
            } => fields.push(field),
            _ => {}
        }
        fields.extend(&self.group_by);
        fields.extend(self.order_by.iter().map(|o| &o.field));

        for field in fields {
            self.source_entity(field.source)?;
        }
        Ok(())
    }

    /// Check if any join fans rows out over a to-many attribute.
    pub fn has_to_many_join(&self) -> bool {
        self.joins.iter().any(|j| j.relation == RelationKind::ToMany)
    }

    /// Output aliases of a column selection (empty for other selections).
    pub fn column_aliases(&self) -> Vec<&str> {
        match &self.selection {
            Selection::Columns { columns, .. } => columns.iter().map(|c| c.alias.as_str()).collect(),
            _ => vec![],
        }
    }

    /// Render the plan as compact SQL-like text for diagnostics.
    pub fn describe(&self) -> String {
        let mut out = String::from("SELECT ");
        match &self.selection {
            Selection::Entities { distinct } => {
                if *distinct {
                    out.push_str("DISTINCT ");
                }
                out.push_str("root");
            }
            Selection::Columns { columns, distinct } => {
                if *distinct {
                    out.push_str("DISTINCT ");
                }
                let rendered: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
                out.push_str(&rendered.join(", "));
            }
            Selection::Count { field, distinct } => match field {
                Some(f) if *distinct => out.push_str(&format!("COUNT(DISTINCT {})", f)),
                Some(f) => out.push_str(&format!("COUNT({})", f)),
                None => out.push_str("COUNT(*)"),
            },
        }

        out.push_str(&format!(" FROM {} root", self.root_entity));
        for (index, join) in self.joins.iter().enumerate() {
            let kind = match join.kind {
                JoinKind::Inner => "INNER",
                JoinKind::Left => "LEFT",
            };
            let fetch = if join.fetch { "FETCH " } else { "" };
            out.push_str(&format!(
                " {} JOIN {}{}.{} j{}",
                kind,
                fetch,
                SourceName(join.parent),
                join.attribute,
                index
            ));
        }

        if !self.conditions.is_empty() {
            let rendered: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
            out.push_str(" WHERE ");
            out.push_str(&rendered.join(" AND "));
        }

        if !self.group_by.is_empty() {
            let rendered: Vec<String> = self.group_by.iter().map(|f| f.to_string()).collect();
            out.push_str(" GROUP BY ");
            out.push_str(&rendered.join(", "));
        }

        if !self.order_by.is_empty() {
            let rendered: Vec<String> = self
                .order_by
                .iter()
                .map(|o| match o.direction {
                    OrderDirection::Asc => format!("{} ASC", o.field),
                    OrderDirection::Desc => format!("{} DESC", o.field),
                })
                .collect();
            out.push_str(" ORDER BY ");
            out.push_str(&rendered.join(", "));
        }

        if let Some(p) = &self.pagination {
            out.push_str(&format!(" LIMIT {} OFFSET {}", p.limit, p.offset));
        }

        out
    }
}

struct SourceName(Source);

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Source::Root => write!(f, "root"),
            Source::Join(i) => write!(f, "j{}", i),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", SourceName(self.source), self.field)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(field) => write!(f, "{}", field),
            Operand::Upper(field) => write!(f, "UPPER({})", field),
            Operand::Literal(value) => write!(f, "{}", value),
        }
    }
}

fn render_list(values: &[Value]) -> String {
    let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    rendered.join(", ")
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Eq { left, right } => write!(f, "{} = {}", left, right),
            Comparison::Ne { left, right } => write!(f, "{} <> {}", left, right),
            Comparison::Lt { left, right } => write!(f, "{} < {}", left, right),
            Comparison::Le { left, right } => write!(f, "{} <= {}", left, right),
            Comparison::Gt { left, right } => write!(f, "{} > {}", left, right),
            Comparison::Ge { left, right } => write!(f, "{} >= {}", left, right),
            Comparison::In { operand, values } => {
                write!(f, "{} IN ({})", operand, render_list(values))
            }
            Comparison::NotIn { operand, values } => {
                write!(f, "{} NOT IN ({})", operand, render_list(values))
            }
            Comparison::IsNull { field } => write!(f, "{} IS NULL", field),
            Comparison::IsNotNull { field } => write!(f, "{} IS NOT NULL", field),
            Comparison::Between { operand, low, high } => {
                write!(f, "{} BETWEEN {} AND {}", operand, low, high)
            }
            Comparison::Like { operand, pattern } => write!(f, "{} LIKE '{}'", operand, pattern),
            Comparison::NotLike { operand, pattern } => {
                write!(f, "{} NOT LIKE '{}'", operand, pattern)
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Test(c) => write!(f, "{}", c),
            Condition::AnyOf(cs) => {
                let rendered: Vec<String> = cs.iter().map(|c| c.to_string()).collect();
                write!(f, "({})", rendered.join(" OR "))
            }
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expr = match self.function {
            ColumnFunction::Field => self.field.to_string(),
            ColumnFunction::Count => format!("COUNT({})", self.field),
            ColumnFunction::Max => format!("MAX({})", self.field),
            ColumnFunction::Min => format!("MIN({})", self.field),
            ColumnFunction::Sum => format!("SUM({})", self.field),
            ColumnFunction::Upper => format!("UPPER({})", self.field),
            ColumnFunction::Lower => format!("LOWER({})", self.field),
        };
        write!(f, "{} AS {}", expr, self.alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> QueryPlan {
        let mut plan = QueryPlan::new("User");
        plan.joins.push(JoinSpec {
            path: "address".into(),
            parent: Source::Root,
            attribute: "address".into(),
            target_entity: "Address".into(),
            relation: RelationKind::ToOne,
            kind: JoinKind::Inner,
            fetch: false,
        });
        plan.conditions.push(Condition::Test(Comparison::like(
            FieldRef::root("status"),
            "%pend%",
        )));
        plan.conditions.push(Condition::AnyOf(vec![
            Comparison::eq(FieldRef::joined(0, "city"), "Oslo"),
            Comparison::eq(FieldRef::joined(0, "city"), "Bergen"),
        ]));
        plan.order_by.push(OrderSpec::desc(FieldRef::root("name")));
        plan.pagination = Some(Pagination::new(10, 20));
        plan
    }

    #[test]
    fn test_describe_plan() {
        let plan = sample_plan();
        assert_eq!(
            plan.describe(),
            "SELECT root FROM User root INNER JOIN root.address j0 \
             WHERE root.status LIKE '%pend%' AND (j0.city = 'Oslo' OR j0.city = 'Bergen') \
             ORDER BY root.name DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_describe_columns_and_count() {
        let mut plan = QueryPlan::new("User");
        plan.selection = Selection::Columns {
            columns: vec![
                Column::field(FieldRef::root("name"), "name"),
                Column {
                    function: ColumnFunction::Upper,
                    field: FieldRef::root("email"),
                    alias: "contact.email".into(),
                },
            ],
            distinct: true,
        };
        assert_eq!(
            plan.describe(),
            "SELECT DISTINCT root.name AS name, UPPER(root.email) AS contact.email FROM User root"
        );
        assert_eq!(plan.column_aliases(), vec!["name", "contact.email"]);

        plan.selection = Selection::Count {
            field: Some(FieldRef::root("id")),
            distinct: false,
        };
        assert_eq!(plan.describe(), "SELECT COUNT(root.id) FROM User root");
    }

    #[test]
    fn test_join_lookup() {
        let plan = sample_plan();
        assert!(plan.join(Source::Root).is_none());
        assert_eq!(plan.join(Source::Join(0)).map(|j| j.attribute.as_str()), Some("address"));
        assert_eq!(plan.join_by_path("address").map(|(i, _)| i), Some(0));
        assert!(!plan.has_to_many_join());
        assert_eq!(plan.source_entity(Source::Join(0)), Ok("Address"));
        assert_eq!(plan.source_entity(Source::Join(3)), Err(Error::UnknownJoin(3)));
    }

    #[test]
    fn test_validate_plan() {
        let mut plan = sample_plan();
        assert_eq!(plan.validate(), Ok(()));

        plan.order_by.push(OrderSpec::asc(FieldRef::joined(2, "zip")));
        assert_eq!(plan.validate(), Err(Error::UnknownJoin(2)));

        let mut plan = sample_plan();
        plan.joins[0].parent = Source::Join(0);
        assert!(matches!(plan.validate(), Err(Error::InvalidPlan(_))));
    }

    #[test]
    fn test_comparison_field_refs() {
        let cmp = Comparison::Lt {
            left: Operand::Field(FieldRef::root("start")),
            right: Operand::Field(FieldRef::joined(1, "end")),
        };
        assert_eq!(cmp.field_refs().len(), 2);
        assert_eq!(Comparison::is_null(FieldRef::root("x")).field_refs().len(), 1);
    }

    #[test]
    fn test_plan_serialization_roundtrip() {
        let plan = sample_plan();

        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&plan).unwrap();
        let archived = rkyv::access::<ArchivedQueryPlan, rkyv::rancor::Error>(&bytes).unwrap();
        let deserialized: QueryPlan =
            rkyv::deserialize::<QueryPlan, rkyv::rancor::Error>(archived).unwrap();
        assert_eq!(plan, deserialized);

        let json = serde_json::to_string(&plan).unwrap();
        let from_json: QueryPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(plan, from_json);
    }
}
