//! Colorized diagnostic output for the `test` and `test-status` subcommands.

use colored::Colorize;

use mastodon_sync_core::mastodon::StatusContext;
use mastodon_sync_core::render;

/// Dump one status: its raw JSON and the Markdown it renders to.
pub fn print_status(item: &StatusContext) {
    println!();
    println!("----------------------");

    println!("{}", "status JSON:".green());
    match serde_json::to_string_pretty(&item.status) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("<failed to serialize status: {e}>"),
    }

    println!();
    println!("{} {}", "status.id".yellow(), item.status.id);
    println!("{}", "body:".blue());
    println!("{}", render::render(item).body);
}
