//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `AssessmentStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use ai_chat_core::domain::AssessmentRecord;
use ai_chat_core::ports::{AssessmentStore, PortError, PortResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `AssessmentStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AiChatTestRecord {
    chat_test_id: Uuid,
    user_id: String,
    topic_id: String,
    chat_date: DateTime<Utc>,
    fluency: Option<i64>,
    grammar: Option<i64>,
    vocabulary: Option<i64>,
    content: Option<i64>,
    simple_evaluation: String,
}
impl AiChatTestRecord {
    fn to_domain(self) -> AssessmentRecord {
        AssessmentRecord {
            record_id: self.chat_test_id,
            user_id: self.user_id,
            topic_id: self.topic_id,
            timestamp: self.chat_date,
            fluency: self.fluency,
            grammar: self.grammar,
            vocabulary: self.vocabulary,
            content: self.content,
            evaluation_text: self.simple_evaluation,
        }
    }
}

//=========================================================================================
// `AssessmentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssessmentStore for DbAdapter {
    async fn save_assessment(&self, record: AssessmentRecord) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO ai_chat_tests \
             (chat_test_id, user_id, topic_id, chat_date, fluency, grammar, vocabulary, content, simple_evaluation) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.record_id)
        .bind(&record.user_id)
        .bind(&record.topic_id)
        .bind(record.timestamp)
        .bind(record.fluency)
        .bind(record.grammar)
        .bind(record.vocabulary)
        .bind(record.content)
        .bind(&record.evaluation_text)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_assessments_for_user(&self, user_id: &str) -> PortResult<Vec<AssessmentRecord>> {
        let records = sqlx::query_as::<_, AiChatTestRecord>(
            "SELECT chat_test_id, user_id, topic_id, chat_date, fluency, grammar, vocabulary, content, simple_evaluation \
             FROM ai_chat_tests WHERE user_id = $1 ORDER BY chat_date ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Storage(e.to_string()))?;

        let assessments = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(assessments)
    }
}
