use sqlx::{PgConnection, Row};

use payx_schemas::enums::{CustomerStatus, KycLevel};
use payx_schemas::Customer;

use crate::decode_err;

pub async fn get_by_id(
    conn: &mut PgConnection,
    customer_id: &str,
) -> Result<Option<Customer>, sqlx::Error> {
    let row = sqlx::query(
        "select customer_id, kyc_level, status, created_at from customers where customer_id = $1",
    )
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;

    let Some(row) = row else { return Ok(None) };

    let kyc_level: String = row.try_get("kyc_level")?;
    let status: String = row.try_get("status")?;
    Ok(Some(Customer {
        customer_id: row.try_get("customer_id")?,
        kyc_level: KycLevel::parse(&kyc_level).map_err(decode_err)?,
        status: CustomerStatus::parse(&status).map_err(decode_err)?,
        created_at: row.try_get("created_at")?,
    }))
}
