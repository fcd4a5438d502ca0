mod client;
mod error;
mod profiles;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use chirp_types::CreateUserRequest;
use client::ApiClient;

/// Chirp profile utility
///
/// Creates accounts on a running Chirp server, one at a time or in bulk from
/// a JSON file, and can have every account comment on a post.
#[derive(Parser, Debug)]
#[command(name = "chirp-profiles")]
#[command(about = "Create and seed profiles on a Chirp server", long_about = None)]
#[command(version)]
struct Cli {
    /// Server URL to talk to
    #[arg(long, short, env = "CHIRP_SERVER", default_value = "http://localhost:3000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a single profile
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        bio: Option<String>,
        /// Picture file; its extension decides the mime type
        #[arg(long)]
        picture: Option<PathBuf>,
        /// Every existing and future user follows a superuser
        #[arg(long)]
        super_user: bool,
    },
    /// Create every profile in a JSON array file
    Import {
        file: PathBuf,
    },
    /// Have every ordinary user comment on a post
    CommentAll {
        #[arg(long)]
        post_id: Uuid,
        #[arg(long)]
        text: String,
    },
}

/// Outcome of a bulk run
#[derive(Debug, Default)]
struct RunStats {
    succeeded: usize,
    errors: Vec<String>,
}

impl RunStats {
    fn record_error(&mut self, error: String) {
        eprintln!("  {}", error);
        self.errors.push(error);
    }

    fn display(&self, what: &str) {
        println!();
        println!("{} {} succeeded, {} failed", what, self.succeeded, self.errors.len());
    }
}

async fn create(
    api: &ApiClient,
    name: String,
    username: String,
    bio: Option<String>,
    picture: Option<PathBuf>,
    super_user: bool,
) -> Result<()> {
    let (profile_picture, mime_type) = match picture {
        Some(path) => {
            let (data, mime_type) = profiles::encode_picture(&path)?;
            (Some(data), Some(mime_type))
        }
        None => (None, None),
    };

    let request = CreateUserRequest {
        name,
        username,
        bio,
        profile_picture,
        mime_type,
        super_user: Some(super_user),
    };
    let user = api
        .create_user(&request)
        .await
        .context("Failed to create user")?;

    println!("Created @{} ({})", user.username, user.id);
    Ok(())
}

async fn import(api: &ApiClient, file: PathBuf) -> Result<()> {
    let entries = profiles::load_entries(&file)?;
    println!("Importing {} profiles from {}", entries.len(), file.display());

    let mut stats = RunStats::default();
    for entry in &entries {
        let user = match api.create_user(&entry.to_request()).await {
            Ok(user) => user,
            Err(e) => {
                stats.record_error(format!("{}: {}", entry.name, e));
                continue;
            }
        };
        println!("Created @{} ({})", user.username, user.id);

        if let Some(text) = entry.first_post.as_deref() {
            match api.create_post(user.id, text).await {
                Ok(post) => println!("  posted {}", post.id),
                Err(e) => {
                    stats.record_error(format!("{}: first post failed: {}", entry.name, e));
                    continue;
                }
            }
        }
        stats.succeeded += 1;
    }

    stats.display("Profiles:");
    Ok(())
}

async fn comment_all(api: &ApiClient, post_id: Uuid, text: String) -> Result<()> {
    let post = api
        .get_post(post_id)
        .await
        .with_context(|| format!("Failed to load post {}", post_id))?;
    println!("Post by @{}: {}", post.post.author.username, post.post.text);

    let user_ids = api.list_user_ids().await.context("Failed to list users")?;
    let mut stats = RunStats::default();
    for user_id in user_ids {
        let username = match api.get_user_by_id(user_id).await {
            Ok(profile) => profile.username,
            Err(e) => {
                stats.record_error(format!("{}: {}", user_id, e));
                continue;
            }
        };
        match api.create_comment(post_id, user_id, &text).await {
            Ok(_) => {
                println!("@{} commented", username);
                stats.succeeded += 1;
            }
            Err(e) => stats.record_error(format!("@{}: {}", username, e)),
        }
    }

    stats.display("Comments:");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = ApiClient::new(cli.server);

    match cli.command {
        Command::Create {
            name,
            username,
            bio,
            picture,
            super_user,
        } => create(&api, name, username, bio, picture, super_user).await,
        Command::Import { file } => import(&api, file).await,
        Command::CommentAll { post_id, text } => comment_all(&api, post_id, text).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "chirp-profiles",
            "--server",
            "http://example.test",
            "create",
            "--name",
            "Ada",
            "--username",
            "ada",
            "--super-user",
        ])
        .unwrap();
        assert_eq!(cli.server, "http://example.test");
        assert!(matches!(cli.command, Command::Create { super_user: true, .. }));

        let post_id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "chirp-profiles",
            "comment-all",
            "--post-id",
            &post_id,
            "--text",
            "nice",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::CommentAll { .. }));
    }

    #[test]
    fn test_cli_rejects_bad_post_id() {
        assert!(Cli::try_parse_from([
            "chirp-profiles",
            "comment-all",
            "--post-id",
            "42",
            "--text",
            "nice",
        ])
        .is_err());
    }
}
