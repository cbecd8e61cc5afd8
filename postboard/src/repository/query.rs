//! Composable query specifications
//!
//! A [`Query`] is an ordered list of predicates, each an opaque clause with
//! `?` placeholders plus the values bound to them. Predicates are AND-combined
//! in declaration order and an empty query matches every row. The store is the
//! only thing that interprets a clause, so malformed SQL surfaces when the
//! query runs, not while it is built.
//!
//! # Example
//!
//! ```rust
//! use postboard::repository::{FilterCondition, OrderDirection, Query};
//!
//! let query = Query::new()
//!     .filter("email = ?", ["ada@example.com"])
//!     .condition(FilterCondition::is_null("deleted_at"))
//!     .order_by("created_at", OrderDirection::Descending)
//!     .preload("address");
//!
//! assert_eq!(query.predicates().len(), 2);
//! assert_eq!(query.preloads(), ["address"]);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl OrderDirection {
    /// SQL keyword for this direction
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A value bound to a `?` placeholder
///
/// List values expand to a comma-separated placeholder list, so a clause
/// such as `id IN (?)` accepts a whole list through one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
    /// List of string values (for IN)
    StringList(Vec<String>),
    /// List of integer values (for IN)
    IntegerList(Vec<i64>),
    /// SQL NULL
    Null,
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<&String> for FilterValue {
    fn from(s: &String) -> Self {
        Self::String(s.clone())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(list: Vec<String>) -> Self {
        Self::StringList(list)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(list: Vec<i64>) -> Self {
        Self::IntegerList(list)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Comparison operators for [`FilterCondition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (=)
    Equal,
    /// Not equal to (!=)
    NotEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal to (>=)
    GreaterThanOrEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal to (<=)
    LessThanOrEqual,
    /// Pattern matching (LIKE)
    Like,
    /// Value is in a list (IN)
    In,
    /// Value is null (IS NULL)
    IsNull,
    /// Value is not null (IS NOT NULL)
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanOrEqual => write!(f, ">="),
            Self::LessThan => write!(f, "<"),
            Self::LessThanOrEqual => write!(f, "<="),
            Self::Like => write!(f, "LIKE"),
            Self::In => write!(f, "IN"),
            Self::IsNull => write!(f, "IS NULL"),
            Self::IsNotNull => write!(f, "IS NOT NULL"),
        }
    }
}

/// Structured single-field condition that compiles to a [`Predicate`]
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// The field name to filter on
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// field = value
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// field != value
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// field > value
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// field >= value
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// field < value
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// field <= value
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// field LIKE pattern
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// field IN (strings...)
    pub fn in_strings(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::StringList(values))
    }

    /// field IN (integers...)
    pub fn in_integers(field: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(field, FilterOperator::In, FilterValue::IntegerList(values))
    }

    /// field IS NULL
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// field IS NOT NULL
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }

    /// Compile into a placeholder clause with its bound values
    ///
    /// The field name is spliced into the clause, so the predicate records it
    /// and the store rejects anything that is not a plain identifier.
    pub fn into_predicate(self) -> Predicate {
        let (clause, params) = match self.operator {
            FilterOperator::IsNull | FilterOperator::IsNotNull => {
                (format!("{} {}", self.field, self.operator), Vec::new())
            }
            FilterOperator::In => (format!("{} IN (?)", self.field), vec![self.value]),
            op => (format!("{} {} ?", self.field, op), vec![self.value]),
        };
        Predicate {
            clause,
            params,
            field: Some(self.field),
        }
    }
}

/// One AND-combined condition of a [`Query`]
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Storage-specific clause with `?` placeholders
    pub clause: String,
    /// Values bound to the placeholders, in order
    pub params: Vec<FilterValue>,
    /// Column named by a [`FilterCondition`]; `None` for opaque clauses
    pub field: Option<String>,
}

impl Predicate {
    /// Clause text between placeholders
    ///
    /// A `?` inside a quoted literal or quoted identifier is text, not a
    /// placeholder. SQL's doubled-quote escape (`'it''s'`) closes and reopens
    /// the literal, which leaves the split unchanged.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut quote: Option<char> = None;
        let mut start = 0;

        for (i, c) in self.clause.char_indices() {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None => match c {
                    '\'' | '"' | '`' => quote = Some(c),
                    '?' => {
                        segments.push(&self.clause[start..i]);
                        start = i + 1;
                    }
                    _ => {}
                },
            }
        }
        segments.push(&self.clause[start..]);
        segments
    }

    /// Number of `?` placeholders in the clause, ignoring quoted text
    pub fn placeholder_count(&self) -> usize {
        self.segments().len() - 1
    }
}

/// Filter, ordering and preload specification handed to a repository
///
/// Builder methods consume and return the query, so a value already passed
/// to a repository call cannot be changed by later building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    predicates: Vec<Predicate>,
    order: Vec<(String, OrderDirection)>,
    preloads: Vec<String>,
}

impl Query {
    /// An empty query, which matches every row
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Query::new().filter("id = ?", [id])`
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self::new().filter("id = ?", [id])
    }

    /// Append a clause with its bound parameters
    #[must_use]
    pub fn filter<I>(mut self, clause: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<FilterValue>,
    {
        self.predicates.push(Predicate {
            clause: clause.into(),
            params: params.into_iter().map(Into::into).collect(),
            field: None,
        });
        self
    }

    /// Append a clause that binds nothing
    #[must_use]
    pub fn filter_clause(mut self, clause: impl Into<String>) -> Self {
        self.predicates.push(Predicate {
            clause: clause.into(),
            params: Vec::new(),
            field: None,
        });
        self
    }

    /// Append a structured condition
    #[must_use]
    pub fn condition(mut self, condition: FilterCondition) -> Self {
        self.predicates.push(condition.into_predicate());
        self
    }

    /// Append an ordering term
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order.push((field.into(), direction));
        self
    }

    /// Ask the store to load a named association
    #[must_use]
    pub fn preload(mut self, association: impl Into<String>) -> Self {
        self.preloads.push(association.into());
        self
    }

    /// Append several preload hints at once
    #[must_use]
    pub fn with_preloads(mut self, associations: &[&str]) -> Self {
        self.preloads
            .extend(associations.iter().map(|a| (*a).to_string()));
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn ordering(&self) -> &[(String, OrderDirection)] {
        &self.order
    }

    pub fn preloads(&self) -> &[String] {
        &self.preloads
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether the named association was requested (case-insensitive)
    pub fn wants(&self, association: &str) -> bool {
        self.preloads
            .iter()
            .any(|p| p.eq_ignore_ascii_case(association))
    }
}
