//! Command-line front end over the quiz/room repositories.
//!
//! # Responsibility
//! - Map `create|get|patch|delete|list` commands onto repository calls.
//! - Print stored entities as JSON and failures with their stable error code.
//!
//! Settings come from `QUIZROOM_*` environment variables; without
//! `QUIZROOM_DB_PATH` every run starts from an empty in-memory database.

use log::info;
use quizroom_core::db::{open_db, open_db_in_memory};
use quizroom_core::{
    init_from_config, CoreConfig, DocumentFilter, DocumentStore, EntityId, EntitySchema,
    FieldPolicy, Repositories, Repository, SqliteDocumentStore,
};
use serde::Serialize;
use serde_json::Value;
use std::process::ExitCode;

const USAGE: &str = "usage:
  quizroom_cli ping
  quizroom_cli create <quiz|room> <json>
  quizroom_cli get <quiz|room> <id>
  quizroom_cli patch <quiz|room> <id> <json-patch>
  quizroom_cli delete <quiz|room> <id>
  quizroom_cli list <quiz|room> [limit] [offset]
  quizroom_cli titles <owner>
  quizroom_cli join <code>";

enum Command {
    Create(Value),
    Get(EntityId),
    Patch(EntityId, Value),
    Delete(EntityId),
    List(DocumentFilter),
}

fn main() -> ExitCode {
    match run(std::env::args().skip(1).collect()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<String, String> {
    let config = CoreConfig::from_env().map_err(|err| format!("config error: {err}"))?;
    init_from_config(&config).map_err(|err| format!("logging error: {err}"))?;

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    if args.first() == Some(&"ping") {
        return Ok(format!(
            "quizroom_core ping={} version={}",
            quizroom_core::ping(),
            quizroom_core::core_version()
        ));
    }

    let conn = match &config.db_path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| format!("database error: {err}"))?;
    let store = SqliteDocumentStore::try_new(&conn).map_err(|err| format!("store error: {err}"))?;
    let repos = Repositories::new(store, &config).map_err(|err| format!("config error: {err}"))?;

    match args.as_slice() {
        ["titles", owner] => {
            let owner = parse_id(owner)?;
            let titles = repos.quizzes.titles_by_owner(owner).map_err(describe)?;
            to_json(&titles)
        }
        ["join", code] => match repos.rooms.find_active_by_code(code).map_err(describe)? {
            Some(room) => to_json(&room),
            None => Err(format!("no active room with code `{code}`")),
        },
        [verb, kind, rest @ ..] => {
            let command = parse_command(verb, rest)?;
            info!("event=cli_command module=cli status=start verb={verb} kind={kind}");
            match *kind {
                "quiz" => execute(&repos.quizzes, command),
                "room" => execute(&repos.rooms, command),
                other => Err(format!("unknown entity kind `{other}`\n{USAGE}")),
            }
        }
        _ => Err(USAGE.to_string()),
    }
}

fn parse_command(verb: &str, rest: &[&str]) -> Result<Command, String> {
    match (verb, rest) {
        ("create", [body]) => Ok(Command::Create(parse_json(body)?)),
        ("get", [id]) => Ok(Command::Get(parse_id(id)?)),
        ("patch", [id, body]) => Ok(Command::Patch(parse_id(id)?, parse_json(body)?)),
        ("delete", [id]) => Ok(Command::Delete(parse_id(id)?)),
        ("list", page) => {
            let mut filter = DocumentFilter::new();
            if let Some(limit) = page.first() {
                filter = filter.limit(parse_count(limit)?);
            }
            if let Some(offset) = page.get(1) {
                filter = filter.offset(parse_count(offset)?);
            }
            Ok(Command::List(filter))
        }
        _ => Err(USAGE.to_string()),
    }
}

fn execute<S, St>(repo: &Repository<S, St>, command: Command) -> Result<String, String>
where
    S: EntitySchema + FieldPolicy,
    St: DocumentStore,
{
    match command {
        Command::Create(body) => to_json(&repo.create_document(body).map_err(describe)?),
        Command::Get(id) => match repo.get(id).map_err(describe)? {
            Some(entity) => to_json(&entity),
            None => Err(format!("not_found: {} {id} does not exist", repo.kind())),
        },
        Command::Patch(id, body) => to_json(&repo.patch(id, &body).map_err(describe)?),
        Command::Delete(id) => Ok(format!("removed={}", repo.delete(id).map_err(describe)?)),
        Command::List(filter) => to_json(&repo.list(&filter).map_err(describe)?),
    }
}

fn describe(err: quizroom_core::RepoError) -> String {
    format!("{}: {err}", err.code())
}

fn parse_id(raw: &str) -> Result<EntityId, String> {
    raw.parse()
        .map_err(|_| format!("invalid id `{raw}`; expected an integer"))
}

fn parse_count(raw: &str) -> Result<u32, String> {
    raw.parse()
        .map_err(|_| format!("invalid count `{raw}`; expected a non-negative integer"))
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|err| format!("invalid JSON argument: {err}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("failed to encode output: {err}"))
}
