//! Output functions for consistent build log formatting

use super::context::UiContext;
use console::style;

const TOPIC_MARKER: &str = "----->";
const DETAIL_INDENT: &str = "       ";
const WARNING_MARKER: &str = " !     ";

/// Display a topic header (`-----> message`)
pub fn topic(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("{} {}", style(TOPIC_MARKER).cyan().bold(), style(message).bold());
    } else {
        println!("{} {}", TOPIC_MARKER, message);
    }
}

/// Display an indented detail line under the current topic
pub fn detail(ctx: &UiContext, message: &str) {
    for line in message.lines() {
        if ctx.use_fancy_output() {
            println!("{}{}", DETAIL_INDENT, style(line).dim());
        } else {
            println!("{}{}", DETAIL_INDENT, line);
        }
    }
}

/// Display a single warning line
pub fn warning(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("{}{}", style(WARNING_MARKER).yellow().bold(), message);
    } else {
        println!("{}{}", WARNING_MARKER, message);
    }
}

/// Display a multi-line warning, every line carrying the marker
pub fn warning_block(ctx: &UiContext, message: &str) {
    println!();
    for line in message.lines() {
        warning(ctx, line);
    }
    println!();
}

/// Echo one line of streamed child process output
pub fn stream_line(line: &str) {
    println!("{}{}", DETAIL_INDENT, line);
}
