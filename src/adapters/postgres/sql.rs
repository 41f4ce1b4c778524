//! Translation of port filters and sorts into PostgreSQL JSONB SQL.
//!
//! Every document lives in `doc JSONB`, with `_id` mirrored into the `id TEXT`
//! primary key. Field paths are bound as `text[]` parameters (`doc #> $n`),
//! never spliced into the statement text.

use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use crate::ports::{Condition, Direction, Filter, SortKey};

/// Appends a boolean SQL expression for `filter`.
pub fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::Eq { path, value } => push_eq(qb, "doc", path, value),
        Filter::Lt { path, value } => push_lt(qb, path, value),
        Filter::ElemMatch { array, conditions } => push_elem_match(qb, array, conditions),
        Filter::ArraySize { array, size } => {
            qb.push("(CASE WHEN jsonb_typeof(");
            push_path(qb, "doc", array);
            qb.push(") = 'array' THEN jsonb_array_length(");
            push_path(qb, "doc", array);
            qb.push(") = ");
            qb.push_bind(i64::try_from(*size).unwrap_or(i64::MAX));
            qb.push(" ELSE FALSE END)");
        }
        Filter::And(filters) if filters.is_empty() => {
            qb.push("TRUE");
        }
        Filter::And(filters) => {
            qb.push("(");
            for (i, inner) in filters.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_filter(qb, inner);
            }
            qb.push(")");
        }
    }
}

/// Appends `ORDER BY ...`, always ending with `id` so paging is deterministic.
pub fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, sort: &[SortKey]) {
    qb.push(" ORDER BY ");
    for key in sort {
        if key.path == "_id" {
            qb.push("id COLLATE \"C\"");
        } else {
            qb.push("(");
            push_text_path(qb, "doc", &key.path);
            qb.push(") COLLATE \"C\"");
        }
        qb.push(match key.direction {
            Direction::Asc => " ASC NULLS FIRST, ",
            Direction::Desc => " DESC NULLS LAST, ",
        });
    }
    qb.push("id COLLATE \"C\" ASC");
}

fn push_eq(qb: &mut QueryBuilder<'_, Postgres>, root: &str, path: &str, value: &Value) {
    if root == "doc" && path == "_id" {
        if let Value::String(id) = value {
            qb.push("id = ");
            qb.push_bind(id.clone());
            return;
        }
    }

    let empty = match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        // null, missing and {} are interchangeable
        qb.push("COALESCE(NULLIF(");
        push_path(qb, root, path);
        qb.push(", 'null'::jsonb), '{}'::jsonb) = '{}'::jsonb");
    } else {
        qb.push("(");
        push_path(qb, root, path);
        qb.push(") = ");
        qb.push_bind(value.clone());
    }
}

fn push_lt(qb: &mut QueryBuilder<'_, Postgres>, path: &str, value: &Value) {
    match value {
        Value::String(bound) if path == "_id" => {
            qb.push("id COLLATE \"C\" < ");
            qb.push_bind(bound.clone());
        }
        Value::String(bound) => {
            qb.push("(jsonb_typeof(");
            push_path(qb, "doc", path);
            qb.push(") = 'string' AND (");
            push_text_path(qb, "doc", path);
            qb.push(") COLLATE \"C\" < ");
            qb.push_bind(bound.clone());
            qb.push(")");
        }
        Value::Number(_) => {
            qb.push("(jsonb_typeof(");
            push_path(qb, "doc", path);
            qb.push(") = 'number' AND (");
            push_path(qb, "doc", path);
            qb.push(") < ");
            qb.push_bind(value.clone());
            qb.push(")");
        }
        _ => {
            qb.push("FALSE");
        }
    }
}

fn push_elem_match(qb: &mut QueryBuilder<'_, Postgres>, array: &str, conditions: &[Condition]) {
    qb.push("EXISTS (SELECT 1 FROM jsonb_array_elements(CASE WHEN jsonb_typeof(");
    push_path(qb, "doc", array);
    qb.push(") = 'array' THEN ");
    push_path(qb, "doc", array);
    qb.push(" ELSE '[]'::jsonb END) AS elem WHERE TRUE");
    for condition in conditions {
        qb.push(" AND ");
        push_eq(qb, "elem", &condition.path, &condition.value);
    }
    qb.push(")");
}

fn push_path(qb: &mut QueryBuilder<'_, Postgres>, root: &str, path: &str) {
    qb.push(root);
    qb.push(" #> ");
    qb.push_bind(segments(path));
}

fn push_text_path(qb: &mut QueryBuilder<'_, Postgres>, root: &str, path: &str) {
    qb.push(root);
    qb.push(" #>> ");
    qb.push_bind(segments(path));
}

fn segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(filter: &Filter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("");
        push_filter(&mut qb, filter);
        qb.sql().to_string()
    }

    #[test]
    fn id_equality_uses_the_primary_key() {
        assert_eq!(render(&Filter::id("abc")), "id = $1");
    }

    #[test]
    fn field_equality_binds_path_and_value() {
        assert_eq!(render(&Filter::eq("conversation_id", "c1")), "(doc #> $1) = $2");
    }

    #[test]
    fn empty_object_equality_accepts_null_and_missing() {
        assert_eq!(
            render(&Filter::eq("metadata", json!({}))),
            "COALESCE(NULLIF(doc #> $1, 'null'::jsonb), '{}'::jsonb) = '{}'::jsonb"
        );
    }

    #[test]
    fn id_cursor_compares_bytewise() {
        assert_eq!(render(&Filter::lt("_id", "m5")), "id COLLATE \"C\" < $1");
    }

    #[test]
    fn elem_match_correlates_conditions_on_one_element() {
        let sql = render(&Filter::elem_match(
            "participants",
            vec![Condition::eq("participant_id", "p1"), Condition::eq("metadata", json!({"b": 1}))],
        ));
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM jsonb_array_elements(CASE WHEN jsonb_typeof(doc #> $1) = 'array' \
             THEN doc #> $2 ELSE '[]'::jsonb END) AS elem WHERE TRUE AND (elem #> $3) = $4 AND (elem #> $5) = $6)"
        );
    }

    #[test]
    fn array_size_guards_non_arrays() {
        assert_eq!(
            render(&Filter::array_size("participants", 2)),
            "(CASE WHEN jsonb_typeof(doc #> $1) = 'array' THEN jsonb_array_length(doc #> $2) = $3 ELSE FALSE END)"
        );
    }

    #[test]
    fn and_joins_inner_filters() {
        let sql = render(&Filter::and(vec![Filter::id("a"), Filter::eq("kind", "general")]));
        assert_eq!(sql, "(id = $1 AND (doc #> $2) = $3)");
        assert_eq!(render(&Filter::and(vec![])), "TRUE");
    }

    #[test]
    fn order_by_ends_with_id() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM t");
        push_order_by(&mut qb, &[SortKey::desc("updated_at")]);
        assert_eq!(
            qb.sql(),
            "SELECT doc FROM t ORDER BY (doc #>> $1) COLLATE \"C\" DESC NULLS LAST, id COLLATE \"C\" ASC"
        );
    }
}
