use sqlx::PgPool;

use crate::DbError;

struct DefaultUser {
    username: &'static str,
    email: &'static str,
    role: &'static str,
    first_name: &'static str,
    last_name: &'static str,
}

const DEFAULT_USERS: [DefaultUser; 2] = [
    DefaultUser {
        username: "admin",
        email: "admin@whatsapp-ui.com",
        role: "admin",
        first_name: "System",
        last_name: "Administrator",
    },
    DefaultUser {
        username: "user",
        email: "user@whatsapp-ui.com",
        role: "user",
        first_name: "Default",
        last_name: "User",
    },
];

/// Inserts the default admin and user accounts if they are missing.
///
/// Returns the number of accounts created; existing rows are left untouched,
/// so running it again returns zero. All inserts share one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails.
pub async fn seed_default_users(pool: &PgPool) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut created = 0usize;

    for user in &DEFAULT_USERS {
        let result = sqlx::query(
            "INSERT INTO users (username, email, role, first_name, last_name) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user.username)
        .bind(user.email)
        .bind(user.role)
        .bind(user.first_name)
        .bind(user.last_name)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            created += 1;
        }
    }

    tx.commit().await?;
    Ok(created)
}
