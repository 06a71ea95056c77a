use std::path::PathBuf;

use catalog::CATALOG_PATH;
use clap::{Parser, Subcommand};
use curate::models::NewEdit;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Catalog file to read and write.
    #[arg(long, default_value = CATALOG_PATH)]
    path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate ids, slugs and tags.
    Check,

    /// Print every edit.
    List,

    /// Same matching as the gallery search box.
    Search {
        #[arg(default_value = "")]
        query: String,

        #[arg(long, default_value = "all")]
        filter: String,
    },

    /// Edit counts per category.
    Stats,

    /// Append an edit with the next free id.
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        anime: String,

        #[arg(long = "type")]
        category: String,

        #[arg(long)]
        video: String,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Check => println!("{}", curate::check(&args.path)?),
        Command::List => print!("{}", curate::list(&args.path, "all", "")?),
        Command::Search { query, filter } => print!("{}", curate::list(&args.path, &filter, &query)?),
        Command::Stats => print!("{}", curate::stats(&args.path)?),
        Command::Add {
            title,
            anime,
            category,
            video,
            tags,
        } => {
            let edit = curate::add(
                &args.path,
                NewEdit {
                    title,
                    anime,
                    category,
                    video_url: video,
                    tags,
                },
            )?;
            println!("Added edit {}: {}", edit.id, edit.title);
        }
    }

    Ok(())
}
