// Courtside league report entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout carries the report)
// 2. Load config
// 3. Open the durable cache database and build the result cache
// 4. Load league data from CSV
// 5. Print standings, leaders and game MVPs
//
// Usage: courtside [season-id|all] [sort-column]

use std::sync::Arc;

use anyhow::Context;
use courtside_core::cache::{ResultCache, TtlPolicy};
use courtside_core::config;
use courtside_core::db::Database;
use courtside_stats::leaders::{Leader, TopPlayers};
use courtside_stats::source;
use courtside_stats::standings::{SortDirection, StandingsColumn, StandingsScope};
use courtside_stats::{Leaderboard, LeaderboardSettings};
use tracing::info;

/// How many of the most recent games get an MVP line.
const RECENT_GAMES: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Courtside starting up");

    let mut args = std::env::args().skip(1);
    let scope = match args.next().as_deref() {
        None | Some("all") => StandingsScope::All,
        Some(season) => StandingsScope::Season(season.to_string()),
    };
    let column = match args.next() {
        Some(name) => name
            .parse::<StandingsColumn>()
            .map_err(anyhow::Error::msg)?,
        None => StandingsColumn::WinPercentage,
    };

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: stats ttl {}s, top players window {} days",
        config.cache.stats_ttl_secs, config.leaderboard.top_players_window_days
    );

    // 3. Open database and build the cache
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);
    let cache = Arc::new(ResultCache::new(
        Box::new(db),
        TtlPolicy::from_config(&config.cache),
    ));

    // 4. Load league data
    let stat_source = source::load_source(&config).context("failed to load league data")?;
    let board = Leaderboard::new(
        Arc::new(stat_source),
        cache.clone(),
        LeaderboardSettings::from(&config.leaderboard),
    );

    // 5. Report
    let seasons = board.get_seasons().await?;
    println!("Seasons:");
    for season in &seasons {
        println!(
            "  {:<16} {:>3} games  {} .. {}",
            season.season_id, season.games, season.first_game, season.last_game
        );
    }

    let table = board.get_season_standings_table(&scope).await?;
    println!();
    println!("Standings ({}) by {}:", table.scope, column.name());
    println!(
        "  {:<14} {:>3} {:>3} {:>3} {:>6} {:>4} {:>6} {:>6} {:>6} {:>6}",
        "player", "gp", "w", "l", "win%", "strk", "ppg", "rpg", "apg", "eff"
    );
    for row in table.sorted_by(column, SortDirection::Descending) {
        println!(
            "  {:<14} {:>3} {:>3} {:>3} {:>6.1} {:>4} {:>6.1} {:>6.1} {:>6.1} {:>6.1}",
            row.player_id,
            row.games_played,
            row.wins,
            row.losses,
            row.win_percentage,
            row.current_win_streak,
            row.avg_points,
            row.avg_rebounds,
            row.avg_assists,
            row.avg_efficiency
        );
    }

    let top = board.get_default_top_players().await?;
    println!();
    print_top_players(&top);

    let mut games = board.get_games().await?;
    games.sort_by(|a, b| b.played_on.cmp(&a.played_on));
    println!();
    println!("Recent MVPs:");
    for game in games.iter().take(RECENT_GAMES) {
        let ratings = board.get_game_ratings(&game.game_id).await?;
        let score = format!("{}-{}", game.team_a_score, game.team_b_score);
        match ratings.mvp {
            Some(mvp) => println!(
                "  {} {:<10} {:>7}  {} ({} voters)",
                game.played_on, game.game_id, score, mvp, ratings.total_voters
            ),
            None => println!(
                "  {} {:<10} {:>7}  no votes",
                game.played_on, game.game_id, score
            ),
        }
    }

    let stats = cache.stats();
    info!(
        "Cache: {} volatile hits, {} durable hits, {} misses, {} durable errors",
        stats.volatile_hits, stats.durable_hits, stats.misses, stats.durable_errors
    );
    info!("Courtside shut down cleanly");
    Ok(())
}

fn print_top_players(top: &TopPlayers) {
    let line = |label: &str, leader: &Option<Leader>, suffix: &str| match leader {
        Some(l) => println!("  {label:<20} {:<14} {:.1}{suffix}", l.player_id, l.value),
        None => println!("  {label:<20} -"),
    };

    println!(
        "Top players, last {} days ({} .. {}):",
        top.window_days, top.from, top.to
    );
    line("Most points", &top.most_points, "");
    line("Best shooting", &top.best_shooting, "%");
    line("Most rebounds", &top.most_rebounds, "");
    line("Most assists", &top.most_assists, "");
    line("Dominant 2P", &top.dominant_two_point, "%");
    line("Dominant 3P", &top.dominant_three_point, "%");
    for (i, leader) in top.top_efficiency.iter().enumerate() {
        println!(
            "  {:<20} {:<14} {:.1}",
            format!("Efficiency #{}", i + 1),
            leader.player_id,
            leader.value
        );
    }
}

/// Initialize tracing to log to a file, keeping stdout for the report.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("courtside.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courtside=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
