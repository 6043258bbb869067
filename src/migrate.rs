use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::sqlite_sink;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = sqlite_sink::connect(&config.db).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the three ingest tables and their indexes. Idempotent.
///
/// List-valued columns (dates, lineups, fielders) hold JSON text.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Create match_info table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS match_info (
            match_id TEXT NOT NULL,
            balls_per_over INTEGER NOT NULL,
            dates TEXT NOT NULL,
            venue TEXT NOT NULL,
            city TEXT NOT NULL,
            country TEXT,
            team_1 TEXT NOT NULL,
            team_1_players TEXT NOT NULL,
            team_2 TEXT NOT NULL,
            team_2_players TEXT NOT NULL,
            home_team TEXT,
            gender TEXT NOT NULL,
            season TEXT NOT NULL,
            team_type TEXT NOT NULL,
            toss_winner TEXT NOT NULL,
            toss_winner_decision TEXT NOT NULL,
            match_type TEXT NOT NULL,
            winner TEXT,
            won_by_runs INTEGER,
            won_by_wickets INTEGER,
            umpire_1 TEXT NOT NULL,
            umpire_2 TEXT NOT NULL,
            third_umpire TEXT,
            match_referee TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create ball_by_ball table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ball_by_ball (
            match_id TEXT NOT NULL,
            innings INTEGER NOT NULL,
            "over" INTEGER NOT NULL,
            batting_team TEXT NOT NULL,
            batsman TEXT NOT NULL,
            bowler TEXT NOT NULL,
            non_striker TEXT NOT NULL,
            runs_by_batsman INTEGER NOT NULL,
            extras_type TEXT,
            runs_from_extras INTEGER NOT NULL,
            dismissed_batsman TEXT,
            dismissal_type TEXT,
            fielders_in_dismissal TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create player_ids table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_ids (
            player TEXT NOT NULL,
            player_id TEXT NOT NULL,
            match_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_match_info_match_id ON match_info(match_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ball_by_ball_match_id ON ball_by_ball(match_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_player_ids_player_id ON player_ids(player_id)")
        .execute(pool)
        .await?;

    Ok(())
}
