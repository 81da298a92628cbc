// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! promptvc CLI
//!
//! Command-line interface over a persisted prompt repository.

mod state;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use promptvc_core::{DiffEngine, DiffStats, ImportSummary, PromptRepository, Version};
use serde::Serialize;
use serde_json::{json, Value};
use state::StateDir;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "promptvc")]
#[command(about = "promptvc - version control for prompts", long_about = None)]
struct Cli {
    /// Repository state directory
    #[arg(short, long, default_value = "./.promptvc")]
    dir: PathBuf,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty repository
    Init,

    /// Commit new content for a prompt on the current branch
    Commit {
        /// Prompt ID
        prompt: String,

        /// Commit message
        #[arg(short, long, default_value = "")]
        message: String,

        /// Author name
        #[arg(long, default_value = "unknown")]
        author: String,

        /// Exempt this version from retention
        #[arg(long)]
        checkpoint: bool,

        /// Read content from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show a prompt's history, newest first
    Log {
        /// Prompt ID
        prompt: String,

        /// Only versions committed to this branch
        #[arg(long)]
        branch: Option<String>,
    },

    /// Print the latest version of a prompt
    Show {
        /// Prompt ID
        prompt: String,

        /// Branch (default branch if omitted)
        #[arg(long)]
        branch: Option<String>,
    },

    /// Line diff between two versions
    Diff {
        /// "Before" version ID
        before: String,

        /// "After" version ID
        after: String,
    },

    /// Re-commit an old version's content
    Restore {
        /// Version ID
        version: String,
    },

    /// Branch management
    Branch {
        #[command(subcommand)]
        command: BranchCommands,
    },

    /// Switch the current branch
    Checkout {
        /// Branch name
        name: String,
    },

    /// Merge a prompt from one branch into another
    Merge {
        /// Source branch
        source: String,

        /// Target branch (checked out afterwards)
        target: String,

        /// Prompt ID
        prompt: String,

        /// Keep the target's content instead of the source's
        #[arg(long)]
        prefer_target: bool,
    },

    /// Tag a version
    Tag {
        /// Version ID
        version: String,

        /// Tag name
        tag: String,
    },

    /// Export a prompt's history as JSON
    Export {
        /// Prompt ID
        prompt: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a JSON history document
    Import {
        /// Input file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum BranchCommands {
    /// Create a branch
    Create {
        /// Branch name
        name: String,

        /// Version the branch starts at
        #[arg(long)]
        from: Option<String>,

        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// List all branches
    List,
}

/// What a command did to the repository
enum Outcome {
    /// State changed and must be saved
    Changed,
    /// Read-only command succeeded
    Unchanged,
    /// Unknown id/branch or rejected input; nothing saved
    Miss,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let default_filter = if cli.verbose {
        "promptvc=debug,promptvc_core=debug"
    } else {
        "promptvc=info,promptvc_core=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let state = StateDir::new(&cli.dir);

    if let Commands::Init = cli.command {
        let created = !state.exists();
        if created {
            let repo = state.load()?;
            state.save(&repo)?;
            info!("Initialized repository at {:?}", state.root());
        }

        if cli.json {
            print_json(&init_report(state.root(), created))?;
        } else if created {
            println!("✓ Repository initialized at {:?}", state.root());
        } else {
            println!("Repository already initialized at {:?}", state.root());
        }
        return Ok(true);
    }

    let mut repo = state.load()?;

    let outcome = execute(&mut repo, cli.command, cli.json)?;
    match outcome {
        Outcome::Changed => {
            state.save(&repo)?;
            Ok(true)
        }
        Outcome::Unchanged => Ok(true),
        Outcome::Miss => Ok(false),
    }
}

fn execute(repo: &mut PromptRepository, command: Commands, json: bool) -> Result<Outcome> {
    let outcome = match command {
        Commands::Init => Outcome::Unchanged, // Handled in run()

        Commands::Commit {
            prompt,
            message,
            author,
            checkpoint,
            file,
        } => {
            let content = read_content(file.as_ref())?;
            let version = repo.create_version(&prompt, &content, &message, &author, checkpoint)?;

            if json {
                print_json(&version)?;
            } else {
                println!(
                    "✓ [{} {}] {}",
                    version.branch_name,
                    version.id.short(),
                    version.commit_message
                );
            }
            Outcome::Changed
        }

        Commands::Log { prompt, branch } => {
            let history = repo.get_version_history(&prompt, branch.as_deref());
            if json {
                print_json(&history)?;
            } else if history.is_empty() {
                println!("No versions for '{}'", prompt);
            } else {
                for version in &history {
                    print_log_line(version);
                }
            }
            Outcome::Unchanged
        }

        Commands::Show { prompt, branch } => {
            match repo.get_head_version(&prompt, branch.as_deref()) {
                Some(version) => {
                    if json {
                        print_json(&version)?;
                    } else {
                        print_log_line(&version);
                        println!();
                        println!("{}", version.content);
                    }
                    Outcome::Unchanged
                }
                None => {
                    eprintln!("No version of '{}' on that branch", prompt);
                    Outcome::Miss
                }
            }
        }

        Commands::Diff { before, after } => {
            if repo.get_version(&before).is_none() || repo.get_version(&after).is_none() {
                eprintln!("Unknown version: {} or {}", before, after);
                return Ok(Outcome::Miss);
            }

            let entries = repo.create_diff(&before, &after);
            if json {
                print_json(&entries)?;
            } else {
                let stats = DiffStats::from_entries(&entries);
                print!("{}", DiffEngine::new().render(&entries));
                println!(
                    "{} added, {} removed, {} unchanged",
                    stats.lines_added, stats.lines_removed, stats.lines_unchanged
                );
            }
            Outcome::Unchanged
        }

        Commands::Restore { version } => match repo.restore_version(&version)? {
            Some(restored) => {
                if json {
                    print_json(&restored)?;
                } else {
                    println!("✓ {} ({})", restored.commit_message, restored.id.short());
                }
                Outcome::Changed
            }
            None => {
                eprintln!("Unknown version: {}", version);
                Outcome::Miss
            }
        },

        Commands::Branch { command } => match command {
            BranchCommands::Create {
                name,
                from,
                description,
            } => match repo.create_branch(&name, from.as_deref(), &description) {
                Some(branch) => {
                    if json {
                        print_json(&branch)?;
                    } else {
                        println!("✓ Created branch '{}'", branch.name);
                    }
                    Outcome::Changed
                }
                None => {
                    eprintln!(
                        "Cannot create branch '{}' (exists, invalid name, or unknown start version)",
                        name
                    );
                    Outcome::Miss
                }
            },
            BranchCommands::List => {
                let branches = repo.get_all_branches();
                if json {
                    print_json(&branches)?;
                } else {
                    for branch in &branches {
                        let marker = if branch.name == repo.current_branch() { '*' } else { ' ' };
                        let head = branch
                            .head_version_id
                            .as_ref()
                            .map(|id| id.short().to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!("{} {:<24} {:<8} {}", marker, branch.name, head, branch.description);
                    }
                }
                Outcome::Unchanged
            }
        },

        Commands::Checkout { name } => {
            if repo.checkout_branch(&name) {
                if json {
                    print_json(&checkout_report(&name))?;
                } else {
                    println!("✓ Switched to branch '{}'", name);
                }
                Outcome::Changed
            } else {
                eprintln!("Unknown branch: {}", name);
                Outcome::Miss
            }
        }

        Commands::Merge {
            source,
            target,
            prompt,
            prefer_target,
        } => {
            let merged = if prefer_target {
                repo.merge_branch_with(&source, &target, &prompt, |_, target| target.to_string())?
            } else {
                repo.merge_branch(&source, &target, &prompt)?
            };

            match merged {
                Some(version) => {
                    if json {
                        print_json(&version)?;
                    } else {
                        println!("✓ {} ({})", version.commit_message, version.id.short());
                    }
                    Outcome::Changed
                }
                None => {
                    eprintln!(
                        "Nothing to merge: '{}' needs a version on both '{}' and '{}'",
                        prompt, source, target
                    );
                    Outcome::Miss
                }
            }
        }

        Commands::Tag { version, tag } => {
            if repo.tag_version(&version, &tag) {
                if json {
                    print_json(&tag_report(&version, &tag))?;
                } else {
                    println!("✓ Tagged {} as '{}'", version, tag);
                }
                Outcome::Changed
            } else {
                eprintln!("Unknown version: {}", version);
                Outcome::Miss
            }
        }

        Commands::Export { prompt, output } => {
            let document = repo
                .export_history(&prompt)
                .to_json()
                .context("Failed to serialize history")?;

            match output {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    if json {
                        print_json(&export_report(&prompt, &path))?;
                    } else {
                        println!("✓ Exported '{}' to {:?}", prompt, path);
                    }
                }
                None => println!("{}", document),
            }
            Outcome::Unchanged
        }

        Commands::Import { file } => {
            let data = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;

            match repo.try_import_history(&data) {
                Ok(summary) => {
                    if json {
                        print_json(&import_report(&summary))?;
                    } else {
                        println!(
                            "✓ Imported {} versions and {} branches (current branch: {})",
                            summary.versions, summary.branches, summary.current_branch
                        );
                    }
                    Outcome::Changed
                }
                Err(e) => {
                    eprintln!("Import rejected: {}", e);
                    Outcome::Miss
                }
            }
        }
    };

    Ok(outcome)
}

/// Content from a file, or all of stdin
fn read_content(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))
        }
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read content from stdin")?;
            Ok(content)
        }
    }
}

fn print_log_line(version: &Version) {
    let mut line = format!(
        "{}  {}  [{}]  {}  {}",
        version.id.short(),
        version.timestamp.format("%Y-%m-%d %H:%M:%S"),
        version.branch_name,
        version.author,
        version.commit_message
    );
    if version.is_checkpoint {
        line.push_str("  (checkpoint)");
    }
    if !version.tags.is_empty() {
        let tags: Vec<&str> = version.tags.iter().map(String::as_str).collect();
        line.push_str(&format!("  tags: {}", tags.join(", ")));
    }
    println!("{}", line);
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// JSON acknowledgements for commands that have no record of their own

fn init_report(dir: &Path, created: bool) -> Value {
    json!({ "dir": dir.display().to_string(), "created": created })
}

fn checkout_report(branch: &str) -> Value {
    json!({ "branch": branch })
}

fn tag_report(version_id: &str, tag: &str) -> Value {
    json!({ "versionId": version_id, "tag": tag })
}

fn export_report(prompt_id: &str, path: &Path) -> Value {
    json!({ "promptId": prompt_id, "path": path.display().to_string() })
}

fn import_report(summary: &ImportSummary) -> Value {
    json!({
        "versions": summary.versions,
        "branches": summary.branches,
        "currentBranch": summary.current_branch,
    })
}
