pub mod toml_loader;

pub use toml_loader::{load_roster_file, parse_roster, DeadlineRecord, RawDifficulty, RosterFile};
