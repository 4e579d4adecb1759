//! list command - List uploaded files
//!
//! Shows the first page the service returns; there is no pagination.

use clap::Args;
use comfy_table::{presets, ContentArrangement, Table};
use jiff::tz::TimeZone;
use jiff::Timestamp;
use ut_core::{list_files, FileListing, ListedFile};

use super::{fail, open_session};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// List uploaded files
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Show size, upload time and ID for each file
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the list command
pub async fn execute(args: ListArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (session, _) = match open_session() {
        Ok(s) => s,
        Err(e) => return fail(&formatter, &e),
    };

    let listing = match list_files(&session).await {
        Ok(l) => l,
        Err(e) => return fail(&formatter, &e),
    };

    if formatter.is_json() {
        formatter.json(&listing);
        return ExitCode::Success;
    }

    if listing.files.is_empty() {
        formatter.println("No files found.");
        return ExitCode::Success;
    }

    formatter.println(&format!("Found {} files:\n", listing.files.len()));
    if args.verbose {
        formatter.println(&render_table(&listing, &TimeZone::system()));
    } else {
        for file in &listing.files {
            formatter.println(&format!("📄 {:<30} {}", file.name, file.key));
        }
    }

    if listing.has_more {
        formatter.println(&formatter.dim("\n... more files available (pagination not implemented)"));
    }

    ExitCode::Success
}

fn render_table(listing: &FileListing, tz: &TimeZone) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Name", "File Key", "Size", "Uploaded", "ID"]);

    for file in &listing.files {
        table.add_row(vec![
            file.name.clone(),
            file.key.clone(),
            humansize::format_size(file.size, humansize::BINARY),
            format_uploaded(file, tz),
            file.id.clone(),
        ]);
    }

    table.to_string()
}

fn format_uploaded(file: &ListedFile, tz: &TimeZone) -> String {
    match Timestamp::from_second(file.uploaded_at) {
        Ok(ts) => ts
            .to_zoned(tz.clone())
            .strftime("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(_) => "-".to_string(),
    }
}
