//! Song catalog queries

use crate::uow::TxContext;
use songs_common::db::{NewSong, Song};
use songs_common::Result;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// Rows per multi-row INSERT during seeding
const INSERT_CHUNK: usize = 100;

#[derive(Clone)]
pub struct SongsRepository {
    ctx: TxContext,
}

impl SongsRepository {
    pub fn new(ctx: TxContext) -> Self {
        Self { ctx }
    }

    /// One page of songs in insertion order plus the catalog size
    pub async fn list(&self, skip: i64, limit: i64) -> Result<(Vec<Song>, i64)> {
        let mut conn = self.ctx.conn().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&mut *conn)
            .await?;

        let songs = sqlx::query_as::<_, Song>(
            r#"
            SELECT id, artist, title, difficulty, level, released
            FROM songs
            ORDER BY rowid
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *conn)
        .await?;

        Ok((songs, total))
    }

    /// Case-insensitive substring match against artist or title
    ///
    /// Matches against the lowercased `*_folded` columns, so folding covers
    /// non-ASCII letters as well.
    pub async fn search(&self, query: &str, skip: i64, limit: i64) -> Result<(Vec<Song>, i64)> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let mut conn = self.ctx.conn().await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM songs
            WHERE artist_folded LIKE ?1 ESCAPE '\' OR title_folded LIKE ?1 ESCAPE '\'
            "#,
        )
        .bind(&pattern)
        .fetch_one(&mut *conn)
        .await?;

        let songs = sqlx::query_as::<_, Song>(
            r#"
            SELECT id, artist, title, difficulty, level, released
            FROM songs
            WHERE artist_folded LIKE ?1 ESCAPE '\' OR title_folded LIKE ?1 ESCAPE '\'
            ORDER BY rowid
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *conn)
        .await?;

        Ok((songs, total))
    }

    /// Mean difficulty, optionally for one level; `None` when nothing matches
    pub async fn average_difficulty(&self, level: Option<i64>) -> Result<Option<f64>> {
        let mut conn = self.ctx.conn().await?;
        let avg: Option<f64> =
            sqlx::query_scalar("SELECT AVG(difficulty) FROM songs WHERE ?1 IS NULL OR level = ?1")
                .bind(level)
                .fetch_one(&mut *conn)
                .await?;
        Ok(avg)
    }

    /// Song by id; a malformed id is treated as absent
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Song>> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let mut conn = self.ctx.conn().await?;
        let song = sqlx::query_as::<_, Song>(
            "SELECT id, artist, title, difficulty, level, released FROM songs WHERE id = ?",
        )
        .bind(uuid.to_string())
        .fetch_optional(&mut *conn)
        .await?;
        Ok(song)
    }

    pub async fn count(&self) -> Result<i64> {
        let mut conn = self.ctx.conn().await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
            .fetch_one(&mut *conn)
            .await?;
        Ok(total)
    }

    /// Insert seed songs with fresh ids, returning how many were written
    pub async fn bulk_insert(&self, songs: &[NewSong]) -> Result<usize> {
        let mut conn = self.ctx.conn().await?;
        let mut inserted = 0;

        for chunk in songs.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::<Sqlite>::new(
                "INSERT INTO songs (id, artist, title, difficulty, level, released, artist_folded, title_folded) ",
            );
            builder.push_values(chunk, |mut row, song| {
                row.push_bind(Uuid::new_v4().to_string())
                    .push_bind(&song.artist)
                    .push_bind(&song.title)
                    .push_bind(song.difficulty)
                    .push_bind(song.level)
                    .push_bind(song.released)
                    .push_bind(song.artist.to_lowercase())
                    .push_bind(song.title.to_lowercase());
            });

            let result = builder.build().execute(&mut *conn).await?;
            inserted += result.rows_affected() as usize;
        }

        Ok(inserted)
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
