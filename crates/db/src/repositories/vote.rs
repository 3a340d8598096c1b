//! Vote repository.
//!
//! The statements the voting engine runs inside one transaction. They are
//! generic over [`ConnectionTrait`] so the caller passes its
//! `DatabaseTransaction` and receives raw [`DbErr`]s to classify.

use crate::entities::{
    Chapter, Choice, DecisionPoint, Story, Vote, choice, decision_point, story, vote,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect,
    sea_query::{Expr, OnConflict},
};

/// Vote statements, run on the caller's connection or transaction.
pub struct VoteRepository;

impl VoteRepository {
    /// Load a choice and its decision point, holding a shared lock on the
    /// decision point row until the transaction ends.
    pub async fn choice_with_locked_decision_point<C: ConnectionTrait>(
        conn: &C,
        choice_id: &str,
    ) -> Result<Option<(choice::Model, decision_point::Model)>, DbErr> {
        let Some(choice) = Choice::find_by_id(choice_id).one(conn).await? else {
            return Ok(None);
        };

        let decision_point = DecisionPoint::find_by_id(choice.decision_point_id.as_str())
            .lock_shared()
            .one(conn)
            .await?;

        Ok(decision_point.map(|dp| (choice, dp)))
    }

    /// Load a decision point, locked for update, and the id of the author of
    /// the story it belongs to.
    pub async fn decision_point_with_author<C: ConnectionTrait>(
        conn: &C,
        decision_point_id: &str,
    ) -> Result<Option<(decision_point::Model, String)>, DbErr> {
        let Some(dp) = DecisionPoint::find_by_id(decision_point_id)
            .lock_exclusive()
            .one(conn)
            .await?
        else {
            return Ok(None);
        };

        let Some(chapter) = Chapter::find_by_id(dp.chapter_id.as_str()).one(conn).await? else {
            return Ok(None);
        };

        let author_id = Story::find_by_id(chapter.story_id.as_str())
            .one(conn)
            .await?
            .map(|s: story::Model| s.author_id);

        Ok(author_id.map(|author_id| (dp, author_id)))
    }

    /// Insert a vote unless the user already voted on the decision point.
    ///
    /// Returns `false` when the unique index on `(user_id, decision_point_id)`
    /// kept the row out, whether through `ON CONFLICT DO NOTHING` or a
    /// unique violation raised by a concurrent insert.
    pub async fn insert_if_absent<C: ConnectionTrait>(
        conn: &C,
        model: vote::ActiveModel,
    ) -> Result<bool, DbErr> {
        let result = Vote::insert(model)
            .on_conflict(
                OnConflict::columns([vote::Column::UserId, vote::Column::DecisionPointId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await;

        match result {
            Ok(rows) => Ok(rows > 0),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) if crate::is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Add one to a choice's tally in a single `UPDATE ... RETURNING`.
    ///
    /// Returns the post-increment count, or `None` if the choice is gone.
    pub async fn increment_choice_votes<C: ConnectionTrait>(
        conn: &C,
        choice_id: &str,
    ) -> Result<Option<i32>, DbErr> {
        let updated = Choice::update_many()
            .col_expr(choice::Column::Votes, Expr::col(choice::Column::Votes).add(1))
            .filter(choice::Column::Id.eq(choice_id))
            .exec_with_returning(conn)
            .await?;

        Ok(updated.into_iter().next().map(|c| c.votes))
    }

    /// Mark a decision point inactive. Returns whether the row changed.
    pub async fn deactivate_decision_point<C: ConnectionTrait>(
        conn: &C,
        decision_point_id: &str,
    ) -> Result<bool, DbErr> {
        let result = DecisionPoint::update_many()
            .col_expr(decision_point::Column::IsActive, Expr::value(false))
            .filter(decision_point::Column::Id.eq(decision_point_id))
            .filter(decision_point::Column::IsActive.eq(true))
            .exec(conn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Set};

    fn test_choice(votes: i32) -> choice::Model {
        choice::Model {
            id: "c1".to_string(),
            decision_point_id: "dp1".to_string(),
            text: "Left".to_string(),
            votes,
            created_at: Utc::now().into(),
        }
    }

    fn test_decision_point(is_active: bool) -> decision_point::Model {
        decision_point::Model {
            id: "dp1".to_string(),
            chapter_id: "ch1".to_string(),
            question: "Which way?".to_string(),
            created_at: Utc::now().into(),
            expires_at: None,
            is_active,
        }
    }

    fn new_vote() -> vote::ActiveModel {
        vote::ActiveModel {
            id: Set("v1".to_string()),
            user_id: Set("u1".to_string()),
            choice_id: Set("c1".to_string()),
            decision_point_id: Set("dp1".to_string()),
            created_at: Set(Utc::now().into()),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_choice_with_locked_decision_point() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_choice(0)]])
            .append_query_results([[test_decision_point(true)]])
            .into_connection();

        let (choice, dp) = VoteRepository::choice_with_locked_decision_point(&db, "c1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(choice.decision_point_id, dp.id);

        let log = db.into_transaction_log();
        let sql = &log[1].statements()[0].sql;
        assert!(sql.contains("FOR SHARE"), "{sql}");
    }

    #[tokio::test]
    async fn test_choice_with_locked_decision_point_missing_choice() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<choice::Model>::new()])
            .into_connection();

        let result = VoteRepository::choice_with_locked_decision_point(&db, "nope")
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_insert_if_absent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(0)])
            .into_connection();

        assert!(VoteRepository::insert_if_absent(&db, new_vote()).await.unwrap());
        assert!(!VoteRepository::insert_if_absent(&db, new_vote()).await.unwrap());

        let log = db.into_transaction_log();
        let sql = &log[0].statements()[0].sql;
        assert!(sql.contains("ON CONFLICT"), "{sql}");
        assert!(sql.contains("DO NOTHING"), "{sql}");
    }

    #[tokio::test]
    async fn test_increment_choice_votes_is_single_update() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_choice(4)]])
            .into_connection();

        let votes = VoteRepository::increment_choice_votes(&db, "c1")
            .await
            .unwrap();

        assert_eq!(votes, Some(4));

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = &log[0].statements()[0].sql;
        assert!(sql.contains(r#""votes" = "votes" + "#), "{sql}");
    }

    #[tokio::test]
    async fn test_deactivate_decision_point_reports_change() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(0)])
            .into_connection();

        assert!(VoteRepository::deactivate_decision_point(&db, "dp1").await.unwrap());
        assert!(!VoteRepository::deactivate_decision_point(&db, "dp1").await.unwrap());
    }
}
