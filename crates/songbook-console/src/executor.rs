use songbook_core::{CompositeKey, Music, MusicRepository, PlannedOperation, StoreClient};
use tracing::debug;

use crate::commands::Command;

/// Result of executing a command.
#[derive(Debug)]
pub enum CommandResult {
    /// Operation succeeded with a message.
    Ok(String),
    /// A saved song, with any generated attributes filled in.
    Saved(Music),
    /// Single song (or not found).
    Item(Option<Music>),
    /// Multiple songs.
    Items(Vec<Music>),
    /// Planned operation for an EXPLAIN.
    Plan(PlannedOperation),
    Count(usize),
    /// Help text (optional topic).
    Help(Option<String>),
    /// Exit the console.
    Exit,
}

/// Execute a parsed command against the repository.
pub fn execute<S: StoreClient>(
    repo: &MusicRepository<S>,
    cmd: Command,
) -> songbook_core::Result<CommandResult> {
    debug!(?cmd, "executing command");
    match cmd {
        Command::Save { song } => Ok(CommandResult::Saved(repo.save(song)?)),
        Command::Get { artist, song_title } => {
            let key = CompositeKey::new(artist, song_title);
            Ok(CommandResult::Item(repo.find_by_id(&key)?))
        }
        Command::Delete { artist, song_title } => {
            let key = CompositeKey::new(artist, song_title);
            repo.delete_by_id(&key)?;
            Ok(CommandResult::Ok(format!("Deleted {key}")))
        }
        Command::FindAll => {
            let songs = repo.find_all()?.collect::<Result<Vec<_>, _>>()?;
            Ok(CommandResult::Items(songs))
        }
        Command::FindBy { predicate } => {
            let songs = repo.find_by(&predicate)?.collect::<Result<Vec<_>, _>>()?;
            Ok(CommandResult::Items(songs))
        }
        Command::Explain { predicate } => Ok(CommandResult::Plan(repo.explain(&predicate)?)),
        Command::Count => Ok(CommandResult::Count(repo.count()?)),
        Command::Help(topic) => Ok(CommandResult::Help(topic)),
        Command::Exit => Ok(CommandResult::Exit),
    }
}
