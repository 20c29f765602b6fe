//! Binding `SqlValue`s into statements and
//! decoding rows back into them.

use sqlx::postgres::PgRow;
use sqlx::query::Query;
use sqlx::sqlite::SqliteRow;
use sqlx::{
  Database,
  Postgres,
  Row,
  Sqlite,
  TypeInfo,
  ValueRef
};

use crate::domain::model::SqlValue;

type PgQuery<'q> = Query<
  'q,
  Postgres,
  <Postgres as Database>::Arguments<'q>
>;
type SqliteQuery<'q> = Query<
  'q,
  Sqlite,
  <Sqlite as Database>::Arguments<'q>
>;

pub(crate) fn bind_pg<'q>(
  mut query: PgQuery<'q>,
  values: &[SqlValue]
) -> PgQuery<'q> {
  for value in values {
    query = match value {
      | SqlValue::Null => {
        query.bind(None::<String>)
      }
      | SqlValue::Bool(v) => query.bind(*v),
      | SqlValue::Int(v) => query.bind(*v),
      | SqlValue::Float(v) => query.bind(*v),
      | SqlValue::Text(v) => {
        query.bind(v.clone())
      }
    };
  }
  query
}

pub(crate) fn bind_sqlite<'q>(
  mut query: SqliteQuery<'q>,
  values: &[SqlValue]
) -> SqliteQuery<'q> {
  for value in values {
    query = match value {
      | SqlValue::Null => {
        query.bind(None::<String>)
      }
      | SqlValue::Bool(v) => query.bind(*v),
      | SqlValue::Int(v) => query.bind(*v),
      | SqlValue::Float(v) => query.bind(*v),
      | SqlValue::Text(v) => {
        query.bind(v.clone())
      }
    };
  }
  query
}

pub(crate) fn decode_pg_row(
  row: &PgRow
) -> Vec<SqlValue> {
  (0..row.len())
    .map(|i| decode_pg_cell(row, i))
    .collect()
}

pub(crate) fn decode_sqlite_row(
  row: &SqliteRow
) -> Vec<SqlValue> {
  (0..row.len())
    .map(|i| decode_sqlite_cell(row, i))
    .collect()
}

fn decode_pg_cell(
  row: &PgRow,
  i: usize
) -> SqlValue {
  let (is_null, type_name) =
    match row.try_get_raw(i) {
      | Ok(raw) => {
        (
          raw.is_null(),
          raw.type_info().name().to_string()
        )
      }
      | Err(_) => return SqlValue::Null
    };
  if is_null {
    return SqlValue::Null;
  }

  let decoded = match type_name.as_str() {
    | "BOOL" => {
      row
        .try_get::<bool, _>(i)
        .map(SqlValue::Bool)
    }
    | "INT2" => {
      row
        .try_get::<i16, _>(i)
        .map(|v| SqlValue::Int(v.into()))
    }
    | "INT4" => {
      row
        .try_get::<i32, _>(i)
        .map(|v| SqlValue::Int(v.into()))
    }
    | "INT8" => {
      row
        .try_get::<i64, _>(i)
        .map(SqlValue::Int)
    }
    | "FLOAT4" => {
      row
        .try_get::<f32, _>(i)
        .map(|v| SqlValue::Float(v.into()))
    }
    | "FLOAT8" => {
      row
        .try_get::<f64, _>(i)
        .map(SqlValue::Float)
    }
    | _ => {
      row
        .try_get::<String, _>(i)
        .map(SqlValue::Text)
    }
  };

  decoded.unwrap_or_else(|_| {
    SqlValue::Text(format!("<{type_name}>"))
  })
}

fn decode_sqlite_cell(
  row: &SqliteRow,
  i: usize
) -> SqlValue {
  let (is_null, type_name) =
    match row.try_get_raw(i) {
      | Ok(raw) => {
        (
          raw.is_null(),
          raw.type_info().name().to_string()
        )
      }
      | Err(_) => return SqlValue::Null
    };
  if is_null {
    return SqlValue::Null;
  }

  let decoded = match type_name.as_str() {
    | "BOOLEAN" => {
      row
        .try_get::<bool, _>(i)
        .map(SqlValue::Bool)
    }
    | "INTEGER" | "INT8" | "BIGINT" => {
      row
        .try_get::<i64, _>(i)
        .map(SqlValue::Int)
    }
    | "REAL" | "FLOAT" | "DOUBLE" => {
      row
        .try_get::<f64, _>(i)
        .map(SqlValue::Float)
    }
    | _ => {
      row
        .try_get::<String, _>(i)
        .map(SqlValue::Text)
    }
  };

  decoded.unwrap_or_else(|_| {
    SqlValue::Text(format!("<{type_name}>"))
  })
}
