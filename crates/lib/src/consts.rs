/// Optional per-project configuration file, looked up in the working directory.
pub const PROJECT_FILE: &str = "distforge.json";

/// Environment variable overriding the working directory.
pub const WORKDIR_ENV: &str = "DISTFORGE_WORKDIR";

/// Lock file held in the working directory while an orchestration runs.
pub const LOCK_FILENAME: &str = ".distforge.lock";
