//! Chat/Participant persistence, grounded in
//! `fechatter_server::domains::chat::repository::ChatRepository`'s
//! transaction style, adapted to this schema and to 128-bit ids.

use std::sync::Arc;

use chat_core::error::CoreError;
use chat_core::{Chat, ChatId, ChatRole, Participant, UserId};
use sqlx::PgPool;

pub struct ChatRepository {
    pool: Arc<PgPool>,
}

impl ChatRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// `CreateChat(creator, participants, name?, isGroup) → Chat`. For a 1:1
    /// chat, fails with `Conflict` if an undeleted chat between the same pair
    /// already exists, enforced by the `participant_pairs_unique_live`
    /// partial unique index rather than a check-then-insert race.
    pub async fn create_chat(
        &self,
        created_by: UserId,
        mut participants: Vec<UserId>,
        name: Option<String>,
        is_group: bool,
    ) -> Result<Chat, CoreError> {
        if !participants.contains(&created_by) {
            participants.push(created_by);
        }
        if !is_group && participants.len() != 2 {
            return Err(CoreError::Validation(
                "a 1:1 chat must have exactly two participants".into(),
            ));
        }
        if is_group && name.as_deref().unwrap_or("").trim().is_empty() {
            return Err(CoreError::Validation(
                "a group chat requires a non-empty name".into(),
            ));
        }

        let chat_id = ChatId::new();
        let mut tx = self.pool.begin().await.map_err(CoreError::from_database_error)?;

        let chat = sqlx::query_as::<_, Chat>(
            r#"insert into chats (id, is_group, name, created_by)
                  values ($1, $2, $3, $4)
                  returning id, is_group, name, created_by, created_at, updated_at, deleted_at"#,
        )
        .bind(chat_id)
        .bind(is_group)
        .bind(&name)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(CoreError::from_database_error)?;

        for &user_id in &participants {
            let is_admin = user_id == created_by;
            sqlx::query(
                r#"insert into participants (chat_id, user_id, is_admin) values ($1, $2, $3)
                      on conflict (chat_id, user_id) do nothing"#,
            )
            .bind(chat_id)
            .bind(user_id)
            .bind(is_admin)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from_database_error)?;
        }

        if !is_group {
            let (user_a, user_b) = if participants[0].inner() < participants[1].inner() {
                (participants[0], participants[1])
            } else {
                (participants[1], participants[0])
            };
            sqlx::query(
                r#"insert into participant_pairs (chat_id, user_a, user_b) values ($1, $2, $3)"#,
            )
            .bind(chat_id)
            .bind(user_a)
            .bind(user_b)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from_database_error)?;
        }

        tx.commit().await.map_err(CoreError::from_database_error)?;
        Ok(chat)
    }

    pub async fn get_chat(&self, chat_id: ChatId) -> Result<Option<Chat>, CoreError> {
        sqlx::query_as::<_, Chat>(
            r#"select id, is_group, name, created_by, created_at, updated_at, deleted_at
                  from chats where id = $1"#,
        )
        .bind(chat_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)
    }

    /// Chats visible to `user_id`: undeleted chats minus the ones this user
    /// has tombstoned for themselves.
    pub async fn list_chats_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, CoreError> {
        sqlx::query_as::<_, Chat>(
            r#"select c.id, c.is_group, c.name, c.created_by, c.created_at, c.updated_at, c.deleted_at
                  from chats c
                  join participants p on p.chat_id = c.id and p.user_id = $1
                  left join per_user_chat_deletions d on d.chat_id = c.id and d.user_id = $1
                  where c.deleted_at is null and d.user_id is null
                  order by c.updated_at desc"#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)
    }

    pub async fn soft_delete_chat_for_user(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r#"insert into per_user_chat_deletions (chat_id, user_id) values ($1, $2)
                  on conflict (chat_id, user_id) do nothing"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)?;
        Ok(())
    }

    /// Cheap membership probe used on every send (`IsParticipant`).
    pub async fn role_of(&self, chat_id: ChatId, user_id: UserId) -> Result<ChatRole, CoreError> {
        let row: Option<(bool,)> = sqlx::query_as(
            r#"select is_admin from participants where chat_id = $1 and user_id = $2"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)?;

        Ok(match row {
            None => ChatRole::NonMember,
            Some((true,)) => ChatRole::Admin,
            Some((false,)) => ChatRole::Member,
        })
    }

    /// Locks the chat's admin rows (`for update`, so a concurrent call on the
    /// same chat blocks until this transaction commits) and refuses if
    /// `user_id` is the chat's sole admin. `count(*) ... for update` isn't
    /// valid Postgres since locking clauses can't be combined with
    /// aggregates, so the admin rows are selected and counted in memory
    /// instead.
    async fn guard_last_admin(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        let admins: Vec<(UserId,)> = sqlx::query_as(
            r#"select user_id from participants where chat_id = $1 and is_admin for update"#,
        )
        .bind(chat_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(CoreError::from_database_error)?;

        if admins.len() <= 1 && admins.iter().any(|(id,)| *id == user_id) {
            return Err(CoreError::LastAdmin);
        }
        Ok(())
    }

    pub async fn add_participant(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<Participant, CoreError> {
        sqlx::query_as::<_, Participant>(
            r#"insert into participants (chat_id, user_id, is_admin) values ($1, $2, false)
                  returning chat_id, user_id, joined_at, is_admin"#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(CoreError::from_database_error)
    }

    /// Refuses if it would leave the group with zero admins. The check and
    /// the delete run in one transaction with the admin rows locked, so two
    /// concurrent removals against a chat's last two admins can't both
    /// observe the same admin count and both succeed.
    pub async fn remove_participant(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from_database_error)?;
        self.guard_last_admin(&mut tx, chat_id, user_id).await?;

        sqlx::query(r#"delete from participants where chat_id = $1 and user_id = $2"#)
            .bind(chat_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from_database_error)?;

        tx.commit().await.map_err(CoreError::from_database_error)?;
        Ok(())
    }

    pub async fn promote_participant(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        sqlx::query(r#"update participants set is_admin = true where chat_id = $1 and user_id = $2"#)
            .bind(chat_id)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(CoreError::from_database_error)?;
        Ok(())
    }

    /// `DemoteParticipant`: same last-admin guard and transactional locking
    /// as `remove_participant`.
    pub async fn demote_participant(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(CoreError::from_database_error)?;
        self.guard_last_admin(&mut tx, chat_id, user_id).await?;

        sqlx::query(r#"update participants set is_admin = false where chat_id = $1 and user_id = $2"#)
            .bind(chat_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::from_database_error)?;

        tx.commit().await.map_err(CoreError::from_database_error)?;
        Ok(())
    }

    pub async fn list_participant_ids(&self, chat_id: ChatId) -> Result<Vec<UserId>, CoreError> {
        let rows: Vec<(UserId,)> =
            sqlx::query_as(r#"select user_id from participants where chat_id = $1"#)
                .bind(chat_id)
                .fetch_all(self.pool.as_ref())
                .await
                .map_err(CoreError::from_database_error)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
