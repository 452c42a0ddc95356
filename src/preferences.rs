// src/preferences.rs
//
// Per-user "auto-save" switch used by the client/contact forms.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;

use sqlx::PgPool;
use uuid::Uuid;

/// Persistence for the auto-save flag. Unset means disabled.
#[axum::async_trait]
pub trait AutoSaveStore: Send + Sync {
    async fn read(&self, user_id: Uuid) -> Result<bool, sqlx::Error>;
    async fn write(&self, user_id: Uuid, enabled: bool) -> Result<(), sqlx::Error>;
}

pub struct PgAutoSaveStore {
    pool: PgPool,
}

impl PgAutoSaveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::async_trait]
impl AutoSaveStore for PgAutoSaveStore {
    async fn read(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let row: Option<(bool,)> =
            sqlx::query_as(r#"SELECT auto_save FROM public.user_preferences WHERE user_id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(v,)| v).unwrap_or(false))
    }

    async fn write(&self, user_id: Uuid, enabled: bool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO public.user_preferences(user_id, auto_save, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id)
            DO UPDATE SET auto_save = EXCLUDED.auto_save, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryAutoSaveStore {
    flags: Mutex<HashMap<Uuid, bool>>,
}

#[cfg(test)]
#[axum::async_trait]
impl AutoSaveStore for MemoryAutoSaveStore {
    async fn read(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let flags = self.flags.lock().unwrap_or_else(|p| p.into_inner());
        Ok(flags.get(&user_id).copied().unwrap_or(false))
    }

    async fn write(&self, user_id: Uuid, enabled: bool) -> Result<(), sqlx::Error> {
        let mut flags = self.flags.lock().unwrap_or_else(|p| p.into_inner());
        flags.insert(user_id, enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_defaults_off_and_remembers_per_user() {
        let store = MemoryAutoSaveStore::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(!store.read(a).await.unwrap());
        store.write(a, true).await.unwrap();
        assert!(store.read(a).await.unwrap());
        assert!(!store.read(b).await.unwrap());

        store.write(a, false).await.unwrap();
        assert!(!store.read(a).await.unwrap());
    }
}
