use songbook_core::{Music, Predicate};

/// A parsed console command.
#[derive(Debug)]
pub enum Command {
    Save {
        song: Music,
    },
    Get {
        artist: String,
        song_title: String,
    },
    Delete {
        artist: String,
        song_title: String,
    },
    FindAll,
    FindBy {
        predicate: Predicate,
    },
    /// Show the planned store operation for a FIND BY without running it.
    Explain {
        predicate: Predicate,
    },
    Count,
    Help(Option<String>),
    Exit,
}
