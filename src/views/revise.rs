//! Revision topics and per-topic detail
//!
//! The topic list loads when the view is entered; a topic's detail loads
//! when it is selected and replaces whatever detail was shown before.

use colored::Colorize;
use prettytable::{format, row, Table};

use super::Effect;
use crate::api::{TopicCard, TopicDetail};
use crate::route::Route;

/// Width of the confidence bar in cells
const BAR_WIDTH: usize = 10;

/// Events the revise view reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum ReviseEvent {
    /// The view became active
    Entered,
    TopicsLoaded(Vec<TopicCard>),
    TopicsFailed(String),
    /// The user picked a topic
    Select(String),
    DetailLoaded(TopicDetail),
    DetailFailed(String),
    BackToChat,
}

/// State of the revise view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviseView {
    pub topics: Vec<TopicCard>,
    /// Most recently selected topic
    pub selected: Option<String>,
    /// Detail for `selected`, once loaded
    pub detail: Option<TopicDetail>,
    /// A detail request is in flight
    pub detail_loading: bool,
    /// Why the last detail request failed
    pub detail_error: Option<String>,
}

impl ReviseView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Topic name at a 1-based position in the list
    pub fn topic_at(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|i| self.topics.get(i))
            .map(|card| card.topic.as_str())
    }

    /// Apply one event
    pub fn update(&mut self, event: ReviseEvent) -> Option<Effect> {
        match event {
            ReviseEvent::Entered => Some(Effect::FetchTopics),
            ReviseEvent::TopicsLoaded(topics) => {
                self.topics = topics;
                None
            }
            ReviseEvent::TopicsFailed(error) => {
                tracing::warn!("Failed to load revision topics: {}", error);
                None
            }
            ReviseEvent::Select(topic) => {
                if self.detail_loading {
                    tracing::debug!("Ignoring selection of {} while a detail is loading", topic);
                    return None;
                }
                self.selected = Some(topic.clone());
                self.detail_loading = true;
                self.detail_error = None;
                Some(Effect::FetchTopicDetail(topic))
            }
            ReviseEvent::DetailLoaded(detail) => {
                self.detail_loading = false;
                self.detail = Some(detail);
                None
            }
            ReviseEvent::DetailFailed(error) => {
                self.detail_loading = false;
                self.detail = None;
                self.detail_error = Some(error);
                None
            }
            ReviseEvent::BackToChat => Some(Effect::Navigate(Route::Chat)),
        }
    }

    /// Topic table followed by the detail panel
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}\n{}\n\n",
            "Revise".bold(),
            "Topics you've asked before (personalized, with confidence).".dimmed()
        );
        out.push_str(&self.render_topics());
        out.push('\n');
        out.push_str(&self.render_detail());
        out
    }

    /// Numbered topic table, or the empty-state hint
    pub fn render_topics(&self) -> String {
        if self.topics.is_empty() {
            return "No topics yet. Ask something in chat first.\n".to_string();
        }

        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.set_titles(row!["#", "Topic", "Confidence"]);
        for (i, card) in self.topics.iter().enumerate() {
            table.add_row(row![i + 1, card.topic, confidence_bar(card)]);
        }
        table.to_string()
    }

    /// Detail panel for the current selection
    pub fn render_detail(&self) -> String {
        let Some(selected) = &self.selected else {
            return "Select a topic to view your personalized revision notes.\n".to_string();
        };
        if self.detail_loading {
            return format!("Loading {}...\n", selected);
        }
        if let Some(error) = &self.detail_error {
            return format!("{}\n", error.red());
        }
        let Some(detail) = &self.detail else {
            return String::new();
        };

        let mut out = format!("{}\n\n", detail.topic.bold());

        out.push_str(&format!("{}\n", "Your recurring mistakes".dimmed()));
        if detail.mistakes.is_empty() {
            out.push_str("  No mistake memory yet for this topic.\n");
        } else {
            for m in &detail.mistakes {
                out.push_str(&format!(
                    "  • {} {}\n",
                    m.mistake,
                    format!("(x{})", m.frequency).dimmed()
                ));
            }
        }

        out.push_str(&format!("\n{}\n", "Recent explanations".dimmed()));
        for r in &detail.recents {
            out.push_str(&format!("  {}\n", r.created_at_display().dimmed()));
            out.push_str(&format!("  {} {}\n", "Q:".dimmed(), r.user_input));
            for line in r.response.lines() {
                out.push_str(&format!("  {}\n", line));
            }
            out.push('\n');
        }
        out
    }
}

/// `[#######---]  80%` style bar for a topic's confidence
pub fn confidence_bar(card: &TopicCard) -> String {
    let percent = card.confidence_percent() as usize;
    let filled = (percent * BAR_WIDTH + 50) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}
