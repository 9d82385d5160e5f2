use sqlx::{PgConnection, Row};

use payx_schemas::enums::PaymentMethod;
use payx_schemas::LimitsPolicy;

use crate::decode_err;

pub async fn get_policy_by_rail(
    conn: &mut PgConnection,
    rail: PaymentMethod,
) -> Result<Option<LimitsPolicy>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        select rail, min_amount, max_amount, daily_limit_amount,
               velocity_limit_count, velocity_window_seconds
          from limits_policies
         where rail = $1
        "#,
    )
    .bind(rail.as_str())
    .fetch_optional(conn)
    .await?;

    let Some(row) = row else { return Ok(None) };

    let rail_value: String = row.try_get("rail")?;
    Ok(Some(LimitsPolicy {
        rail: PaymentMethod::parse(&rail_value).map_err(decode_err)?,
        min_amount: row.try_get("min_amount")?,
        max_amount: row.try_get("max_amount")?,
        daily_limit_amount: row.try_get("daily_limit_amount")?,
        velocity_limit_count: row.try_get("velocity_limit_count")?,
        velocity_window_seconds: row.try_get("velocity_window_seconds")?,
    }))
}
