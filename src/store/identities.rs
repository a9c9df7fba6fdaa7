use crate::db::{Identity, NewIdentity, Role, UserId};

use super::Store;

impl Store {
    pub async fn create_identity(&self, new: NewIdentity) -> Result<Identity, sqlx::Error> {
        let id = sqlx::query("INSERT INTO users (username,role,first_name,last_name) VALUES (?,?,?,?)")
            .bind(&new.username)
            .bind(new.role)
            .bind(&new.first_name)
            .bind(&new.last_name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Identity {
            id,
            username: new.username,
            role: new.role,
            first_name: new.first_name,
            last_name: new.last_name,
        })
    }

    pub async fn find_identity(&self, id: UserId) -> Result<Option<Identity>, sqlx::Error> {
        sqlx::query_as("SELECT id,username,role,first_name,last_name FROM users WHERE id=?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn identity_ids_by_role(&self, role: Role) -> Result<Vec<UserId>, sqlx::Error> {
        let rows: Vec<(UserId,)> = sqlx::query_as("SELECT id FROM users WHERE role=? ORDER BY id")
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
