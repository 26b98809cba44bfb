//! Database row types. These map directly to SQLite rows and stay
//! independent of the hermes-types API models.

#[derive(Debug)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_key: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: i64,
    pub owner_id: i64,
    pub text: String,
    pub palindrome: bool,
    /// Filled from the `recipients` link table, ascending.
    pub recipient_ids: Vec<i64>,
    pub created_at: String,
}
