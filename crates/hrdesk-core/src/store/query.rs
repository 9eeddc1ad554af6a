//! Filter/order specifications for live queries.

use std::cmp::Ordering;

use serde_json::Value;

use super::document::Document;

/// An equality filter on one document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Field name to compare.
    pub field: String,
    /// Value the field must equal.
    pub equals: Value,
}

/// A live query: one collection, equality filters, optional ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Collection the query runs against.
    pub collection: String,
    /// Equality filters; all must match.
    pub filters: Vec<FieldFilter>,
    /// Field to order results by, ascending. Documents missing the field
    /// sort after all documents that have it.
    pub order_by: Option<String>,
}

impl Query {
    /// Creates a query over a whole collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    /// Adds an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            equals: value.into(),
        });
        self
    }

    /// Orders results by a field, ascending.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Returns true if the document satisfies every filter.
    pub fn matches(&self, document: &Document) -> bool {
        self.filters
            .iter()
            .all(|filter| document.field(&filter.field) == Some(&filter.equals))
    }

    /// Sorts documents according to `order_by`.
    ///
    /// Missing values sort last; ties keep the incoming (id) order, so the
    /// result is stable across repeated evaluation of the same state.
    pub fn sort(&self, documents: &mut [Document]) {
        let Some(field) = &self.order_by else {
            return;
        };
        documents.sort_by(|a, b| compare_optional(a.field(field), b.field(field)));
    }
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_values(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (a.as_f64(), b.as_f64()) {
        return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
    }
    if let (Some(a), Some(b)) = (a.as_str(), b.as_str()) {
        return a.cmp(b);
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, fields: Value) -> Document {
        Document {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_where_eq_matches() {
        let query = Query::collection("messages").where_eq("senderId", "HR");

        assert!(query.matches(&doc("a", json!({"senderId": "HR"}))));
        assert!(!query.matches(&doc("b", json!({"senderId": "jane"}))));
        assert!(!query.matches(&doc("c", json!({}))));
    }

    #[test]
    fn test_sort_missing_field_last() {
        let query = Query::collection("messages").order_by("timestamp");
        let mut docs = vec![
            doc("pending", json!({})),
            doc("late", json!({"timestamp": 200})),
            doc("early", json!({"timestamp": 100})),
        ];

        query.sort(&mut docs);

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "pending"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let query = Query::collection("messages").order_by("timestamp");
        let mut docs = vec![
            doc("first", json!({"timestamp": 100})),
            doc("second", json!({"timestamp": 100})),
        ];

        query.sort(&mut docs);

        assert_eq!(docs[0].id, "first");
        assert_eq!(docs[1].id, "second");
    }
}
