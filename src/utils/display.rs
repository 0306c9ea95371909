use crate::analysis::{AnalysisResult, ContentIdea};
use crate::novelty::Flagged;
use colored::*;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_success(text: &str) {
    println!("{}", text.green());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

pub fn print_flagged(items: &[Flagged]) {
    for item in items {
        if item.is_new {
            println!("{} {}", "NEW".green().bold(), item.id);
        } else {
            println!("    {}", item.id.dimmed());
        }
    }
}

pub fn print_idea(index: usize, idea: &ContentIdea) {
    println!(
        "\n{} {} {}",
        format!("{}.", index).bright_cyan().bold(),
        idea.title.bold(),
        format!("({})", idea.content_type).yellow()
    );
    println!("   {} {}", "Theme:".blue(), idea.theme);
    println!("   {} {}", "Caption:".blue(), idea.caption_draft);
    println!("   {} {}", "Hashtags:".blue(), idea.hashtag_suggestions.join(" "));
    println!("   {} {}", "Why:".blue(), idea.reason);
}

pub fn print_analysis(result: &AnalysisResult) {
    print_header("Account summary");
    println!("{}", result.account_summary);

    print_header("Content ideas");
    if result.fallback_used {
        print_info("No tailored ideas came back; showing a generic one.");
    }
    for (i, idea) in result.content_ideas.iter().enumerate() {
        print_idea(i + 1, idea);
    }
}
