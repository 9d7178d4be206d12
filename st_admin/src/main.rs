//! Operator CLI for tournament match generation and results.
//!
//! Every command talks to PostgreSQL through the library's tournament manager
//! and prints its result as JSON on stdout.

mod config;
mod logging;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Error;
use config::AdminConfig;
use log::info;
use pico_args::Arguments;
use studio_tournament::{
    TournamentManager, TournamentResult,
    db::{CompetitionRepository, Database},
    tournament::{CompetitionId, GenerationConfig, MatchId, TournamentFormat},
};

const HELP: &str = "\
Generate and run tournament brackets

USAGE:
  st_admin [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
  generate  <COMPETITION>      Generate groups and matches
  record    <MATCH> <A> <B>    Record a final score
  start     <MATCH>            Mark a match as being played
  cancel    <MATCH>            Cancel a match
  advance   <COMPETITION>      Schedule the next knockout round if ready
  standings <COMPETITION>      Print standings
  matches   <COMPETITION>      List matches by round and slot
  groups    <COMPETITION>      List groups and members
  preview   <COMPETITION>      Show the expected knockout rounds
  migrate                      Apply database migrations

OPTIONS:
  --db-url      URL            Database connection string  [default: env DATABASE_URL]
  --format      FORMAT         round_robin or group_knockout  (generate)
  --tables      N              Number of tables  (generate)
  --interval    MINUTES        Minutes per slot  (generate)
  --group-size  N              Fixed group size  (generate)
  --seed        N              Shuffle seed  (generate)
  --group       LABEL          Restrict standings to one group  (standings)

FLAGS:
  -h, --help                   Print help information

ENVIRONMENT:
  DATABASE_URL                 PostgreSQL connection string
  DEFAULT_TABLE_COUNT          Table count used when --tables is absent
  DEFAULT_SLOT_INTERVAL_MINS   Interval used when --interval is absent
  DEFAULT_GROUP_SIZE           Group size used when --group-size is absent
  RUST_LOG                     Log filter  [default: info,sqlx=warn]
";

/// Overrides accepted by `generate`
#[derive(Debug, Default, PartialEq, Eq)]
struct GenerateArgs {
    format: Option<TournamentFormat>,
    tables: Option<u32>,
    interval: Option<u32>,
    group_size: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Generate(CompetitionId, GenerateArgs),
    Record(MatchId, i64, i64),
    Start(MatchId),
    Cancel(MatchId),
    Advance(CompetitionId),
    Standings(CompetitionId, Option<String>),
    Matches(CompetitionId),
    Groups(CompetitionId),
    Preview(CompetitionId),
    Migrate,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Generate(..) => "generate",
            Command::Record(..) => "record",
            Command::Start(_) => "start",
            Command::Cancel(_) => "cancel",
            Command::Advance(_) => "advance",
            Command::Standings(..) => "standings",
            Command::Matches(_) => "matches",
            Command::Groups(_) => "groups",
            Command::Preview(_) => "preview",
            Command::Migrate => "migrate",
        }
    }

    /// Short description of the target used in performance logs
    fn target(&self) -> Option<String> {
        match self {
            Command::Generate(id, _)
            | Command::Advance(id)
            | Command::Standings(id, _)
            | Command::Matches(id)
            | Command::Groups(id)
            | Command::Preview(id) => Some(format!("competition={id}")),
            Command::Record(id, ..) | Command::Start(id) | Command::Cancel(id) => {
                Some(format!("match={id}"))
            }
            Command::Migrate => None,
        }
    }
}

struct Args {
    database_url: Option<String>,
    command: Command,
}

fn parse_args(mut pargs: Arguments) -> Result<Args, Error> {
    let database_url = pargs.opt_value_from_str("--db-url")?;

    // Options come out before positionals so flags can go anywhere on the line
    let generate = GenerateArgs {
        format: pargs.opt_value_from_str("--format")?,
        tables: pargs.opt_value_from_str("--tables")?,
        interval: pargs.opt_value_from_str("--interval")?,
        group_size: pargs.opt_value_from_str("--group-size")?,
        seed: pargs.opt_value_from_str("--seed")?,
    };
    let group: Option<String> = pargs.opt_value_from_str("--group")?;

    let subcommand: String = pargs
        .subcommand()?
        .ok_or_else(|| anyhow::anyhow!("Missing command, see --help"))?;

    let command = match subcommand.as_str() {
        "generate" => Command::Generate(pargs.free_from_str()?, generate),
        "record" => Command::Record(
            pargs.free_from_str()?,
            pargs.free_from_str()?,
            pargs.free_from_str()?,
        ),
        "start" => Command::Start(pargs.free_from_str()?),
        "cancel" => Command::Cancel(pargs.free_from_str()?),
        "advance" => Command::Advance(pargs.free_from_str()?),
        "standings" => Command::Standings(pargs.free_from_str()?, group),
        "matches" => Command::Matches(pargs.free_from_str()?),
        "groups" => Command::Groups(pargs.free_from_str()?),
        "preview" => Command::Preview(pargs.free_from_str()?),
        "migrate" => Command::Migrate,
        other => anyhow::bail!("Unknown command: {other}"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}", remaining);
    }

    Ok(Args {
        database_url,
        command,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = parse_args(pargs)?;

    logging::init();

    let config = AdminConfig::from_env(args.database_url)?;
    config.validate()?;

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    info!("Database connected");

    let started = Instant::now();
    let operation = args.command.name();
    let target = args.command.target();

    let manager = TournamentManager::with_pool(Arc::new(db.pool().clone()));
    let output = match run(&db, &manager, &config, args.command).await {
        Ok(value) => value,
        Err(e) => {
            logging::log_rejection(operation, &e);
            db.close().await;
            anyhow::bail!(e.client_message());
        }
    };

    logging::log_performance(
        operation,
        started.elapsed().as_millis() as u64,
        target.as_deref(),
    );

    println!("{}", serde_json::to_string_pretty(&output)?);
    db.close().await;

    Ok(())
}

/// Execute one command and render its result as JSON
async fn run(
    db: &Database,
    manager: &TournamentManager,
    config: &AdminConfig,
    command: Command,
) -> TournamentResult<serde_json::Value> {
    let value = match command {
        Command::Generate(competition_id, overrides) => {
            let competition = manager.repository().get_competition(competition_id).await?;
            let generation = generation_config(
                config,
                GenerationConfig::for_competition(&competition),
                overrides,
            );
            serde_json::to_value(manager.generate_matches(competition_id, generation).await?)?
        }
        Command::Record(match_id, score_a, score_b) => serde_json::to_value(
            manager
                .record_result(match_id, Some(score_a), Some(score_b))
                .await?,
        )?,
        Command::Start(match_id) => serde_json::to_value(manager.start_match(match_id).await?)?,
        Command::Cancel(match_id) => serde_json::to_value(manager.cancel_match(match_id).await?)?,
        Command::Advance(competition_id) => {
            serde_json::to_value(manager.advance_knockout(competition_id).await?)?
        }
        Command::Standings(competition_id, group) => serde_json::to_value(
            manager
                .standings(competition_id, group.as_deref())
                .await?,
        )?,
        Command::Matches(competition_id) => {
            serde_json::to_value(manager.list_matches(competition_id).await?)?
        }
        Command::Groups(competition_id) => {
            serde_json::to_value(manager.list_groups(competition_id).await?)?
        }
        Command::Preview(competition_id) => {
            serde_json::to_value(manager.knockout_preview(competition_id).await?)?
        }
        Command::Migrate => {
            db.migrate().await?;
            info!("Migrations applied");
            serde_json::json!({ "migrated": true })
        }
    };

    Ok(value)
}

/// Layer environment defaults, then command-line overrides, on the competition's settings
fn generation_config(
    config: &AdminConfig,
    base: GenerationConfig,
    overrides: GenerateArgs,
) -> GenerationConfig {
    let mut generation = config.defaults.apply(base);

    if let Some(format) = overrides.format {
        generation.format = format;
    }
    if let Some(tables) = overrides.tables {
        generation = generation.with_tables(tables);
    }
    if let Some(minutes) = overrides.interval {
        generation = generation.with_slot_interval(minutes);
    }
    if let Some(size) = overrides.group_size {
        generation = generation.with_group_size(size);
    }
    if let Some(seed) = overrides.seed {
        generation = generation.with_seed(seed);
    }

    generation
}
