use crate::entity::{Entity, Value};
use std::cmp::Ordering;

/// Row predicate built from a fixed set of shapes.
///
/// Column names are `&'static str` so they always come from code, never from
/// request input; only values are bound as statement arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`; a `Value::Null` value matches null columns.
    Eq { column: &'static str, value: Value },
    /// Case-sensitive substring match on a text column.
    Contains { column: &'static str, needle: String },
    /// Inclusive range; a missing bound is open.
    Range {
        column: &'static str,
        from: Option<Value>,
        to: Option<Value>,
    },
    /// Conjunction; empty means "every row".
    All(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column,
            value: value.into(),
        }
    }

    pub fn contains(column: &'static str, needle: impl Into<String>) -> Self {
        Filter::Contains {
            column,
            needle: needle.into(),
        }
    }

    pub fn between(column: &'static str, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Filter::Range {
            column,
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    pub fn range(column: &'static str, from: Option<Value>, to: Option<Value>) -> Self {
        Filter::Range { column, from, to }
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All(mut filters) => {
                filters.push(other);
                Filter::All(filters)
            }
            filter => Filter::All(vec![filter, other]),
        }
    }

    pub fn matches<T: Entity>(&self, entity: &T) -> bool {
        match self {
            Filter::Eq { column, value } => entity.value(column).as_ref() == Some(value),
            Filter::Contains { column, needle } => matches!(
                entity.value(column),
                Some(Value::Text(text)) if text.contains(needle.as_str())
            ),
            Filter::Range { column, from, to } => {
                let Some(current) = entity.value(column) else {
                    return false;
                };
                if current == Value::Null {
                    return false;
                }
                let above = from.as_ref().is_none_or(|from| {
                    matches!(
                        current.compare(from),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                });
                let below = to.as_ref().is_none_or(|to| {
                    matches!(current.compare(to), Some(Ordering::Less | Ordering::Equal))
                });
                above && below
            }
            Filter::All(filters) => filters.iter().all(|filter| filter.matches(entity)),
        }
    }

    /// Renders the predicate with `$n` placeholders, pushing bind values onto
    /// `params` so numbering continues across calls.
    pub fn to_sql(&self, params: &mut Vec<Value>) -> String {
        match self {
            Filter::Eq {
                column,
                value: Value::Null,
            } => format!("{column} IS NULL"),
            Filter::Eq { column, value } => {
                params.push(value.clone());
                format!("{column} = ${}", params.len())
            }
            Filter::Contains { column, needle } => {
                params.push(Value::Text(needle.clone()));
                format!("strpos({column}, ${}) > 0", params.len())
            }
            Filter::Range { column, from, to } => {
                let mut bounds = Vec::new();
                if let Some(from) = from {
                    params.push(from.clone());
                    bounds.push(format!("{column} >= ${}", params.len()));
                }
                if let Some(to) = to {
                    params.push(to.clone());
                    bounds.push(format!("{column} <= ${}", params.len()));
                }
                if bounds.is_empty() {
                    format!("{column} IS NOT NULL")
                } else {
                    bounds.join(" AND ")
                }
            }
            Filter::All(filters) if filters.is_empty() => "TRUE".to_owned(),
            Filter::All(filters) => filters
                .iter()
                .map(|filter| format!("({})", filter.to_sql(params)))
                .collect::<Vec<String>>()
                .join(" AND "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{Gadget, gadget};
    use chrono::{TimeZone, Utc};

    #[test]
    fn renders_placeholders_in_order() {
        let filter = Filter::eq("name", "lamp")
            .and(Filter::contains("serial", "AB"))
            .and(Filter::eq("active", true));
        let mut params = Vec::new();
        let sql = filter.to_sql(&mut params);
        assert_eq!(
            sql,
            "(name = $1) AND (strpos(serial, $2) > 0) AND (active = $3)"
        );
        assert_eq!(
            params,
            vec![Value::from("lamp"), Value::from("AB"), Value::Bool(true)]
        );
    }

    #[test]
    fn null_equality_renders_is_null_without_binding() {
        let mut params = vec![Value::Int(7)];
        let sql = Filter::eq("note", None::<String>).to_sql(&mut params);
        assert_eq!(sql, "note IS NULL");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn open_range_keeps_single_bound() {
        let since = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut params = Vec::new();
        let sql = Filter::range("created_at", Some(since.into()), None).to_sql(&mut params);
        assert_eq!(sql, "created_at >= $1");
        assert_eq!(params, vec![Value::Timestamp(since)]);
    }

    #[test]
    fn range_is_inclusive_on_both_bounds() {
        let item: Gadget = gadget("lamp", "S-1");
        let at = item.created_at;
        assert!(Filter::between("created_at", at, at).matches(&item));
        let later = Filter::between(
            "created_at",
            at + chrono::Duration::seconds(1),
            at + chrono::Duration::days(1),
        );
        assert!(!later.matches(&item));
    }

    #[test]
    fn contains_is_case_sensitive() {
        let item = gadget("Desk Lamp", "S-1");
        assert!(Filter::contains("name", "Lamp").matches(&item));
        assert!(!Filter::contains("name", "lamp").matches(&item));
    }

    #[test]
    fn unknown_columns_never_match() {
        let item = gadget("lamp", "S-1");
        assert!(!Filter::eq("colour", "red").matches(&item));
        assert!(Filter::All(Vec::new()).matches(&item));
    }
}
