//! What the user sees: the answer region and search-result cards.
//!
//! Everything here is plain data plus formatting; terminal output lives in
//! `cli::Output` and the web page in [`html`].

pub mod html;

use crate::error::{ErrorKind, PodqueryError, Result};
use crate::retrieval::{GuestFilter, SearchHit};
use serde::Serialize;
use tracing::warn;
use url::Url;

/// Shown when search worked but no hit fits the prompt budget.
pub const NO_CONTEXT_MESSAGE: &str =
    "No context available: even the best search result is too long to fit the prompt.";
/// Shown when search returned nothing.
pub const NO_RESULTS_MESSAGE: &str = "No matching transcript excerpts were found.";

/// Format a duration in seconds as `H:MM:SS`, with a day prefix past 24 hours.
///
/// `303` becomes `0:05:03`; `100000` becomes `1 day, 3:46:40`.
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let rem = seconds % 86_400;
    let clock = format!("{}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60);

    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

/// A display-ready search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    /// Position in the ranked results, starting at 1.
    pub index: usize,
    /// Short title: everything before the first `|`.
    pub caption: String,
    pub title: String,
    pub guest: String,
    /// Transcript excerpt the hit matched on.
    pub content: String,
    pub episode_url: String,
    pub thumbnail_url: String,
    /// Episode length as `H:MM:SS`.
    pub duration: String,
    pub score: f32,
}

impl ResultCard {
    /// Build the card for `hit`, rejecting links that are not absolute http(s) URLs.
    pub fn try_from_hit(index: usize, hit: &SearchHit) -> Result<Self> {
        let episode_url = checked_url("episode_url", &hit.episode_url)?;
        let thumbnail_url = checked_url("thumbnail_url", &hit.thumbnail_url)?;

        let caption = hit.title.split('|').next().unwrap_or_default().trim();
        let caption = if caption.is_empty() {
            hit.title.trim()
        } else {
            caption
        };

        Ok(Self {
            index,
            caption: caption.to_string(),
            title: hit.title.clone(),
            guest: hit.guest.clone(),
            content: hit.content.clone(),
            episode_url,
            thumbnail_url,
            duration: format_duration(hit.length),
            score: hit.score,
        })
    }
}

fn checked_url(field: &str, raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| PodqueryError::Render(format!("Invalid {} {:?}: {}", field, raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(PodqueryError::Render(format!(
            "Unsupported {} scheme: {}",
            field, other
        ))),
    }
}

/// One position in the results grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardSlot {
    Card(ResultCard),
    /// The hit at `index` could not be rendered; its siblings are unaffected.
    Failed { index: usize, reason: String },
}

impl CardSlot {
    pub fn index(&self) -> usize {
        match self {
            CardSlot::Card(card) => card.index,
            CardSlot::Failed { index, .. } => *index,
        }
    }

    pub fn is_card(&self) -> bool {
        matches!(self, CardSlot::Card(_))
    }
}

/// Render every hit as a card, isolating failures to their own slot.
pub fn render_cards(hits: &[SearchHit]) -> Vec<CardSlot> {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| match ResultCard::try_from_hit(i + 1, hit) {
            Ok(card) => CardSlot::Card(card),
            Err(e) => {
                warn!("Card {} failed to render: {}", i + 1, e);
                CardSlot::Failed {
                    index: i + 1,
                    reason: e.to_string(),
                }
            }
        })
        .collect()
}

/// Content of the answer region.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum AnswerSlot {
    /// Generated answer text.
    Answered(String),
    /// Generation failed; the configured fallback message.
    Fallback(String),
    /// Search worked but nothing fit the prompt budget; generation skipped.
    NoContext,
    /// Search found nothing; generation skipped.
    NoResults,
    /// Retrieval or reranking failed; no cards and no answer.
    SearchUnavailable(String),
    /// The question was rejected before searching.
    InvalidQuestion(String),
    /// Any other failure before an answer could be attempted.
    Failed(String),
}

impl AnswerSlot {
    /// Text for the answer region.
    pub fn message(&self) -> String {
        match self {
            AnswerSlot::Answered(text) | AnswerSlot::Fallback(text) => text.clone(),
            AnswerSlot::NoContext => NO_CONTEXT_MESSAGE.to_string(),
            AnswerSlot::NoResults => NO_RESULTS_MESSAGE.to_string(),
            AnswerSlot::SearchUnavailable(reason) => format!("Search is unavailable: {}", reason),
            AnswerSlot::InvalidQuestion(reason) => reason.clone(),
            AnswerSlot::Failed(reason) => format!("Something went wrong: {}", reason),
        }
    }

    /// Answer region for a run whose search stage returned `err`.
    pub fn for_search_error(err: &PodqueryError) -> Self {
        match err.kind() {
            ErrorKind::SearchUnavailable => AnswerSlot::SearchUnavailable(err.to_string()),
            ErrorKind::InvalidInput => AnswerSlot::InvalidQuestion(err.to_string()),
            ErrorKind::NoContext => AnswerSlot::NoContext,
            ErrorKind::Generation | ErrorKind::Other => AnswerSlot::Failed(err.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, AnswerSlot::Answered(_))
    }
}

/// Notice for a guest selection the search does not apply.
pub fn guest_notice(filter: &GuestFilter) -> Option<String> {
    filter.guest().map(|guest| {
        format!(
            "Guest filter \"{}\" is not applied yet; results include all guests.",
            guest
        )
    })
}

/// Everything one interaction shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskReport {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_notice: Option<String>,
    pub answer: AnswerSlot,
    pub cards: Vec<CardSlot>,
}

impl AskReport {
    pub fn new(query: &str, filter: &GuestFilter, answer: AnswerSlot, cards: Vec<CardSlot>) -> Self {
        Self {
            query: query.to_string(),
            guest_notice: guest_notice(filter),
            answer,
            cards,
        }
    }

    /// Report for a run whose search stage failed; there are no cards to show.
    pub fn search_failed(query: &str, filter: &GuestFilter, err: &PodqueryError) -> Self {
        Self::new(query, filter, AnswerSlot::for_search_error(err), Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, length: u64) -> SearchHit {
        SearchHit {
            content: "Discipline equals freedom.".to_string(),
            title: title.to_string(),
            guest: "Jocko Willink".to_string(),
            episode_url: "https://www.youtube.com/watch?v=abc123".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/abc123/hqdefault.jpg".to_string(),
            length,
            score: 0.9,
            ..SearchHit::default()
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00:00");
        assert_eq!(format_duration(303), "0:05:03");
        assert_eq!(format_duration(3723), "1:02:03");
        assert_eq!(format_duration(86_399), "23:59:59");
        assert_eq!(format_duration(100_000), "1 day, 3:46:40");
        assert_eq!(format_duration(2 * 86_400 + 61), "2 days, 0:01:01");
    }

    #[test]
    fn test_caption_is_title_before_pipe() {
        let card =
            ResultCard::try_from_hit(1, &hit("How To Master Discipline | Jocko Willink", 3723)).unwrap();
        assert_eq!(card.caption, "How To Master Discipline");
        assert_eq!(card.duration, "1:02:03");
        assert_eq!(card.index, 1);

        let card = ResultCard::try_from_hit(2, &hit("No separator here", 10)).unwrap();
        assert_eq!(card.caption, "No separator here");
    }

    #[test]
    fn test_bad_card_does_not_affect_siblings() {
        let mut broken = hit("Broken", 60);
        broken.episode_url = "not a url".to_string();
        let mut script = hit("Script", 60);
        script.thumbnail_url = "javascript:alert(1)".to_string();

        let slots = render_cards(&[hit("First", 60), broken, hit("Third", 60), script]);

        assert_eq!(slots.len(), 4);
        assert!(slots[0].is_card());
        assert!(matches!(slots[1], CardSlot::Failed { index: 2, .. }));
        assert!(slots[2].is_card());
        assert!(matches!(slots[3], CardSlot::Failed { index: 4, .. }));
        assert_eq!(slots.iter().map(CardSlot::index).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_guest_notice() {
        assert!(guest_notice(&GuestFilter::none()).is_none());
        let notice = guest_notice(&GuestFilter::new(Some("Jocko Willink".into()))).unwrap();
        assert!(notice.contains("Jocko Willink"));
    }

    #[test]
    fn test_answer_slot_serialization() {
        let json = serde_json::to_value(AnswerSlot::Answered("hi".into())).unwrap();
        assert_eq!(json["status"], "answered");
        assert_eq!(json["text"], "hi");

        let json = serde_json::to_value(AnswerSlot::NoContext).unwrap();
        assert_eq!(json["status"], "no_context");
    }

    #[test]
    fn test_search_failed_report_has_no_cards() {
        let err = PodqueryError::Retrieval("timeout".into());
        let report = AskReport::search_failed("q", &GuestFilter::none(), &err);
        assert!(report.cards.is_empty());
        assert!(matches!(report.answer, AnswerSlot::SearchUnavailable(_)));
        assert!(report.answer.message().contains("timeout"));
    }

    #[test]
    fn test_search_errors_keep_their_kind() {
        let slot = AnswerSlot::for_search_error(&PodqueryError::InvalidInput(
            "Question must not be empty".into(),
        ));
        assert!(matches!(slot, AnswerSlot::InvalidQuestion(_)));
        assert!(slot.is_failure());
        assert!(!slot.message().contains("unavailable"));

        let slot = AnswerSlot::for_search_error(&PodqueryError::Tokenizer("no encoding".into()));
        assert!(matches!(slot, AnswerSlot::Failed(_)));
        assert!(!slot.message().contains("unavailable"));

        let json = serde_json::to_value(AnswerSlot::InvalidQuestion("blank".into())).unwrap();
        assert_eq!(json["status"], "invalid_question");
    }
}
