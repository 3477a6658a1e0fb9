//! The last-admin invariant: a group chat always keeps at least one
//! admin, and the guard holds under concurrent attempts against the
//! same chat's final two admins.

mod common;

use chat_core::error::CoreError;
use chat_core::UserId;
use common::TestDb;

#[tokio::test]
async fn demoting_the_sole_admin_is_refused() {
        let db = TestDb::new().await;
        let repo = db.chat_repository();

        let admin = UserId::new();
        let member = UserId::new();
        let chat = repo
                .create_chat(admin, vec![admin, member], Some("squad".into()), true)
                .await
                .expect("create_chat");

        let err = repo
                .demote_participant(chat.id, admin)
                .await
                .expect_err("demoting the only admin must fail");
        assert!(matches!(err, CoreError::LastAdmin));

        // the admin is still an admin afterward
        assert_eq!(repo.role_of(chat.id, admin).await.unwrap(), chat_core::ChatRole::Admin);
}

#[tokio::test]
async fn removing_the_sole_admin_is_refused() {
        let db = TestDb::new().await;
        let repo = db.chat_repository();

        let admin = UserId::new();
        let member = UserId::new();
        let chat = repo
                .create_chat(admin, vec![admin, member], Some("squad".into()), true)
                .await
                .expect("create_chat");

        let err = repo
                .remove_participant(chat.id, admin)
                .await
                .expect_err("removing the only admin must fail");
        assert!(matches!(err, CoreError::LastAdmin));
}

#[tokio::test]
async fn demoting_one_of_two_admins_succeeds() {
        let db = TestDb::new().await;
        let repo = db.chat_repository();

        let admin_a = UserId::new();
        let admin_b = UserId::new();
        let chat = repo
                .create_chat(admin_a, vec![admin_a, admin_b], Some("squad".into()), true)
                .await
                .expect("create_chat");
        repo.promote_participant(chat.id, admin_b).await.unwrap();

        repo.demote_participant(chat.id, admin_b).await.expect("demote should succeed with two admins");
        assert_eq!(repo.role_of(chat.id, admin_b).await.unwrap(), chat_core::ChatRole::Member);
        assert_eq!(repo.role_of(chat.id, admin_a).await.unwrap(), chat_core::ChatRole::Admin);
}

#[tokio::test]
async fn concurrent_demotes_against_the_last_two_admins_leave_one_standing() {
        let db = TestDb::new().await;
        let repo = std::sync::Arc::new(db.chat_repository());

        let admin_a = UserId::new();
        let admin_b = UserId::new();
        let chat = repo
                .create_chat(admin_a, vec![admin_a, admin_b], Some("squad".into()), true)
                .await
                .expect("create_chat");
        repo.promote_participant(chat.id, admin_b).await.unwrap();

        let (repo_a, repo_b) = (repo.clone(), repo.clone());
        let chat_id = chat.id;
        let (res_a, res_b) = tokio::join!(
                tokio::spawn(async move { repo_a.demote_participant(chat_id, admin_a).await }),
                tokio::spawn(async move { repo_b.demote_participant(chat_id, admin_b).await }),
        );

        let outcomes = [res_a.unwrap(), res_b.unwrap()];
        let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
        let refused = outcomes
                .iter()
                .filter(|r| matches!(r, Err(CoreError::LastAdmin)))
                .count();

        // exactly one of the two concurrent demotes may win; the row locking
        // in `ChatRepository::guard_last_admin` serializes the other behind
        // it and it observes the now-single admin and is refused.
        assert_eq!(succeeded, 1, "expected exactly one demote to succeed, got {outcomes:?}");
        assert_eq!(refused, 1, "expected exactly one demote to be refused, got {outcomes:?}");
}
