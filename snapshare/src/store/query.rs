//! Collection queries: equality, array membership and range filters with one
//! optional ordering field and a limit.
//!
//! Both store backends evaluate queries with [`Query::apply`], so the matching
//! rules live in one place:
//!
//! | Operator        | Matches when                                         |
//! |-----------------|------------------------------------------------------|
//! | `Eq`            | field equals the value (JSON equality)               |
//! | `ArrayContains` | field is an array holding the value                  |
//! | `Gt/Gte/Lt/Lte` | field and value are the same kind and compare so     |
//!
//! Documents missing the `order_by` field are excluded from ordered results.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound appended to a prefix to emulate `starts_with` with a range filter.
pub const PREFIX_UPPER_BOUND: char = '\u{f8ff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    ArrayContains,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, document: &Value) -> bool {
        let Some(candidate) = lookup(document, &self.field) else {
            return false;
        };
        match self.operator {
            FilterOperator::Eq => candidate == &self.value,
            FilterOperator::ArrayContains => candidate
                .as_array()
                .is_some_and(|items| items.contains(&self.value)),
            FilterOperator::Gt => compare_values(candidate, &self.value) == Some(Ordering::Greater),
            FilterOperator::Gte => matches!(
                compare_values(candidate, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lt => compare_values(candidate, &self.value) == Some(Ordering::Less),
            FilterOperator::Lte => matches!(
                compare_values(candidate, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    fn filter(mut self, field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOperator::Eq, value)
    }

    pub fn where_array_contains(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOperator::ArrayContains, value)
    }

    pub fn where_gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOperator::Gt, value)
    }

    pub fn where_gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOperator::Gte, value)
    }

    pub fn where_lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOperator::Lt, value)
    }

    pub fn where_lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOperator::Lte, value)
    }

    /// Lexicographic range `[prefix, prefix + U+F8FF]` on a string field.
    pub fn where_prefix(self, field: impl Into<String>, prefix: &str) -> Self {
        let field = field.into();
        let upper = format!("{prefix}{PREFIX_UPPER_BOUND}");
        self.where_gte(field.clone(), prefix).where_lte(field, upper)
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(document))
    }

    /// Filters, orders and truncates a collection's documents.
    pub fn apply(&self, documents: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut matched: Vec<Value> = documents.into_iter().filter(|doc| self.matches(doc)).collect();

        if let Some((field, order)) = &self.order_by {
            matched.retain(|doc| lookup(doc, field).is_some());
            matched.sort_by(|a, b| {
                let ordering = match (lookup(a, field), lookup(b, field)) {
                    (Some(left), Some(right)) => compare_values(left, right).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Resolves a dotted field path (`user.username`) inside a document.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.as_object()?.get(segment))
        .filter(|value| !value.is_null())
}

/// Orders two JSON values of the same kind. Values of different kinds are unordered.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
