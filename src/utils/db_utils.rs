use crate::error::ApiError;
use sqlx::MySqlPool;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    U64(u64),
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Column names come from a typed field list assembled by the handler,
/// never from the request payload.
pub fn build_update_sql(
    table: &str,
    fields: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, ApiError> {
    if fields.is_empty() {
        return Err(ApiError::Validation("No fields provided for update".into()));
    }

    // Build SET clause
    let set_clause = fields
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = fields.into_iter().map(|(_, value)| value).collect();

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_set_clause_in_field_order() {
        let update = build_update_sql(
            "accounts",
            vec![
                ("first_name", SqlValue::String("Ann".into())),
                ("email", SqlValue::String("ann@co.com".into())),
            ],
            "id",
            9,
        )
        .unwrap();

        assert_eq!(
            update.sql,
            "UPDATE accounts SET first_name = ?, email = ? WHERE id = ?"
        );
        assert_eq!(update.values.len(), 3);
        assert!(matches!(update.values[2], SqlValue::U64(9)));
    }

    #[test]
    fn empty_field_list_is_a_validation_error() {
        let err = build_update_sql("accounts", vec![], "id", 1).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
