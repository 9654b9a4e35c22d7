//! MySQL persistence for processed videos.
//!
//! One connection is opened per run and revalidated with a ping before
//! reuse. The schema is self-applied on startup from `migrations/schema.sql`;
//! statements that fail because the schema already exists are treated as
//! success, so the migration is idempotent.

use crate::config::DatabaseSettings;
use crate::contract::ProcessedVideo;
use crate::error::Result;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Executor};
use tracing::{debug, info, instrument, warn};

/// The idempotent DDL applied on startup.
const SCHEMA_SQL: &str = include_str!("../../migrations/schema.sql");

/// MySQL error numbers that an idempotent migration swallows:
/// table exists, duplicate column, duplicate key.
const BENIGN_MIGRATION_ERRORS: &[u16] = &[1050, 1060, 1061];

pub struct Database {
    conn: MySqlConnection,
    options: MySqlConnectOptions,
}

impl Database {
    /// Open the single per-run connection.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database)
            .charset("utf8mb4");

        let conn = MySqlConnection::connect_with(&options).await?;
        info!("Connected to MySQL at {}:{}", settings.host, settings.port);

        Ok(Self { conn, options })
    }

    /// Apply the DDL, tolerating duplicate-schema errors per statement.
    #[instrument(skip(self))]
    pub async fn migrate(&mut self) -> Result<()> {
        for statement in SCHEMA_SQL.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            match self.conn.execute(statement).await {
                Ok(_) => {}
                Err(e) if is_benign_migration_error(&e) => {
                    debug!("Migration statement already applied: {}", first_line(statement));
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!("Schema migration complete");
        Ok(())
    }

    /// Ping the connection; reconnect once on failure.
    pub async fn ensure_connected(&mut self) -> Result<()> {
        if let Err(e) = self.conn.ping().await {
            warn!("Database connection lost ({}); reconnecting", e);
            self.conn = MySqlConnection::connect_with(&self.options).await?;
        }
        Ok(())
    }

    /// Insert the composite record plus one `video_topics` row per topic.
    /// Returns the autogenerated id.
    #[instrument(skip(self, video), fields(video_name = %video.video_name))]
    pub async fn insert_video(&mut self, video: &ProcessedVideo) -> Result<u64> {
        self.ensure_connected().await?;

        let topics_json = serde_json::to_string(&video.analysis.topics)?;
        let phrase_chunks = serde_json::to_string(&video.transcription.phrases.chunks)?;
        let word_chunks = serde_json::to_string(&video.transcription.words.chunks)?;
        let translation_chunks = serde_json::to_string(&video.translation.chunks)?;
        let exercises = serde_json::to_string(&video.exercises)?;

        let result = sqlx::query(
            r#"
            INSERT INTO video_learning_content
                (video_name, video_url, cefr_level, speech_speed, grammar_complexity,
                 vocabulary_complexity, topics, transcription_chunks,
                 transcription_word_chunks, translation_chunks, full_transcription,
                 full_translation, exercises, duration_seconds, status, likes_count,
                 is_adult_content)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'completed', 0, ?)
            "#,
        )
        .bind(&video.video_name)
        .bind(&video.video_url)
        .bind(video.analysis.cefr_level.as_str())
        .bind(video.analysis.speech_speed.as_str())
        .bind(video.analysis.grammar_complexity.as_str())
        .bind(video.analysis.vocabulary_complexity.as_str())
        .bind(&topics_json)
        .bind(&phrase_chunks)
        .bind(&word_chunks)
        .bind(&translation_chunks)
        .bind(&video.transcription.full_text)
        .bind(&video.translation.full_text)
        .bind(&exercises)
        .bind(video.duration_seconds.map(|d| d as i64))
        .bind(video.is_adult_content)
        .execute(&mut self.conn)
        .await?;

        let video_id = result.last_insert_id();

        for topic in &video.analysis.topics {
            sqlx::query("INSERT INTO video_topics (video_id, topic) VALUES (?, ?)")
                .bind(video_id)
                .bind(topic)
                .execute(&mut self.conn)
                .await?;
        }

        info!("Persisted {} as row {}", video.video_name, video_id);
        Ok(video_id)
    }

    /// Close the connection cleanly.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

fn is_benign_migration_error(err: &sqlx::Error) -> bool {
    let Some(db_err) = err.as_database_error() else {
        return false;
    };
    let Some(mysql_err) = db_err.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>() else {
        return false;
    };
    BENIGN_MIGRATION_ERRORS.contains(&mysql_err.number())
}

fn first_line(statement: &str) -> &str {
    statement.lines().next().unwrap_or(statement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_contains_all_columns() {
        for column in [
            "video_name",
            "video_url",
            "cefr_level",
            "speech_speed",
            "grammar_complexity",
            "vocabulary_complexity",
            "topics",
            "transcription_chunks",
            "transcription_word_chunks",
            "translation_chunks",
            "full_transcription",
            "full_translation",
            "exercises",
            "duration_seconds",
            "status",
            "likes_count",
            "is_adult_content",
        ] {
            assert!(
                SCHEMA_SQL.contains(column),
                "schema is missing column {}",
                column
            );
        }
        assert!(SCHEMA_SQL.contains("video_topics"));
        assert!(SCHEMA_SQL.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn test_schema_statements_are_idempotent_forms() {
        for statement in SCHEMA_SQL.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            // Only the two tolerated shapes appear: conditional creates and
            // column additions whose duplicate errors are swallowed.
            assert!(
                statement.starts_with("CREATE TABLE IF NOT EXISTS")
                    || statement.starts_with("ALTER TABLE"),
                "unexpected statement shape: {}",
                first_line(statement)
            );
        }
    }
}
