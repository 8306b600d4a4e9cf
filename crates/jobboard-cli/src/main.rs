use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobboard_core::{
    translate, PaginationStyle, Projection, RawQuery, JOBS, JOB_LISTING_SELECT, OWNER_SELECT, USERS,
};
use jobboard_storage::{snapshot, Expansion, Pager, Shape};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Job board listing admin CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the filter and pagination a listing query string translates to
    Translate { query: String },
    /// Run a listing query against a directory of JSONL collection dumps
    List {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value_t = PaginationStyle::Offset)]
        style: PaginationStyle,
        /// Leave `userId` as a raw id
        #[arg(long)]
        no_expand: bool,
        #[arg(default_value = "")]
        query: String,
    },
}

fn parse_query(qs: &str) -> RawQuery {
    url::form_urlencoded::parse(qs.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

fn listing_shape(expand_owner: bool) -> Result<Shape> {
    let expand = if expand_owner {
        Some(Expansion {
            field: "userId".into(),
            collection: USERS.into(),
            projection: Projection::parse(OWNER_SELECT)?,
        })
    } else {
        None
    };
    Ok(Shape {
        projection: Projection::parse(JOB_LISTING_SELECT)?,
        expand,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Translate { query } => {
            let (filter, pagination) = translate(&parse_query(&query));
            let out = serde_json::json!({ "filter": filter, "pagination": pagination });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Cmd::List {
            data,
            style,
            no_expand,
            query,
        } => {
            let store = snapshot::load_dir(&data)
                .with_context(|| format!("loading {}", data.display()))?;
            let shape = listing_shape(!no_expand)?;
            let envelope = Pager::new(&store, JOBS, style)
                .list(&parse_query(&query), &shape)
                .await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
    }
    Ok(())
}
