/// Standard output utilities for consistent command formatting
use colored::*;

pub fn section_header(title: &str) {
    println!("\n{}", title.bold().cyan());
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Warnings go to stderr so stdout stays parseable
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message);
}

pub fn action(message: &str) {
    println!("{} {}", "▶".cyan(), message);
}

pub fn tree_item(is_last: bool, label: &str, value: Option<&str>) {
    let prefix = if is_last { "└─" } else { "├─" };
    if let Some(val) = value {
        println!("{} {}: {}", prefix.dimmed(), label, val);
    } else {
        println!("{} {}", prefix.dimmed(), label);
    }
}

/// Print `(label, value)` pairs as a tree; empty values show as "(none)"
pub fn tree_items(items: &[(&str, String)]) {
    for (i, (label, value)) in items.iter().enumerate() {
        let value = if value.is_empty() { "(none)" } else { value.as_str() };
        tree_item(i + 1 == items.len(), label, Some(value));
    }
}
