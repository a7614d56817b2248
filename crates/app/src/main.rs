use std::fmt;
use std::path::PathBuf;

use quiz_core::time::from_millis;
use services::{SessionStore, backup_filename, to_json};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFile,
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFile => write!(f, "import requires a backup file"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app history          [--db <sqlite_url>]");
    eprintln!("  app import <file>    [--db <sqlite_url>]");
    eprintln!("  app export           [--db <sqlite_url>] [--out <path>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    History,
    Import { file: PathBuf },
    Export { out: Option<PathBuf> },
}

#[derive(Debug)]
struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);

        let Some(name) = args.next() else {
            return Ok(None);
        };
        let mut file: Option<PathBuf> = None;
        let mut out: Option<PathBuf> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--out" if name == "export" => {
                    out = Some(require_value(&mut args, "--out")?.into());
                }
                "--help" | "-h" => return Ok(None),
                _ if name == "import" && file.is_none() && !arg.starts_with("--") => {
                    file = Some(arg.into());
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_str() {
            "history" => Command::History,
            "import" => Command::Import {
                file: file.ok_or(ArgsError::MissingFile)?,
            },
            "export" => Command::Export { out },
            "--help" | "-h" => return Ok(None),
            _ => return Err(ArgsError::UnknownArg(name)),
        };
        Ok(Some(Self { db_url, command }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Args::parse(std::env::args().skip(1)).map_err(|e| {
        print_usage();
        e
    })?;
    let Some(args) = parsed else {
        print_usage();
        return Ok(());
    };

    // Binary glue owns the database file; services only see the URL.
    prepare_sqlite_file(&args.db_url)?;
    let store = SessionStore::open_sqlite(&args.db_url).await?;
    info!(db = %args.db_url, "opened session store");

    match args.command {
        Command::History => {
            let items = store.history_items().await?;
            if items.is_empty() {
                println!("no exams recorded");
            }
            for item in items {
                println!(
                    "{:>6}  {:<24}  {}  correct {:>3}  wrong {:>3}  skipped {:>3}  of {:>3}  score {:.2} (-{})",
                    item.label.to_string(),
                    item.exam_name.as_deref().unwrap_or("-"),
                    item.recorded_at.format("%Y-%m-%d %H:%M"),
                    item.correct,
                    item.wrong,
                    item.skipped,
                    item.total,
                    item.score,
                    item.negative_mark,
                );
            }
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let summary = store.import_json(&json).await?;
            println!(
                "imported {} new result(s){}",
                summary.added,
                if summary.legacy {
                    " from a history-only file"
                } else {
                    ""
                }
            );
        }
        Command::Export { out } => {
            let backup = store.export().await?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(backup_filename(None, from_millis(backup.timestamp)))
            });
            std::fs::write(&path, to_json(&backup)?)?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_string()))
    }

    #[test]
    fn parses_commands() {
        let args = parse(&["import", "backup.json", "--db", "sqlite::memory:"])
            .unwrap()
            .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(
            args.command,
            Command::Import {
                file: PathBuf::from("backup.json")
            }
        );

        let args = parse(&["export", "--out", "x.json"]).unwrap().unwrap();
        assert_eq!(
            args.command,
            Command::Export {
                out: Some(PathBuf::from("x.json"))
            }
        );
        assert!(parse(&[]).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(parse(&["import"]), Err(ArgsError::MissingFile)));
        assert!(matches!(
            parse(&["history", "--out", "x"]),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            parse(&["history", "--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(parse(&["grade"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/quiz.db".into());
        assert!(url.starts_with("sqlite:///") || url.starts_with("sqlite://"));
        assert!(url.ends_with("data/quiz.db"));
        assert_eq!(
            normalize_sqlite_url("sqlite://already.db".into()),
            "sqlite://already.db"
        );
    }
}
