use serde_json::{Value, json};

use crate::model::CardFacts;
use crate::view::{DashboardPage, DashboardView};

pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";
const CARD_VERSION: &str = "1.4";
const ATTACHMENT_ID: &str = "ac-card-1";

/// Wraps a card as a native attachment so Teams renders it in full fidelity.
pub fn channel_message_body(card: &Value) -> Value {
    json!({
        "body": {
            "content": format!("<attachment id=\"{ATTACHMENT_ID}\"></attachment>"),
            "contentType": "html"
        },
        "attachments": [{
            "id": ATTACHMENT_ID,
            "contentType": ADAPTIVE_CARD_CONTENT_TYPE,
            "contentUrl": null,
            "content": serde_json::to_string(card).unwrap_or_default(),
            "name": null,
            "thumbnailUrl": null
        }]
    })
}

pub fn wellbeing_card(facts: &CardFacts) -> Value {
    json!({
        "type": "AdaptiveCard",
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": "Mindful Self Discipline",
                "weight": "Bolder",
                "size": "Medium"
            },
            {
                "type": "FactSet",
                "facts": [
                    { "title": "meditationMinutes", "value": facts.meditation_minutes.to_string() },
                    { "title": "reflectionComplete", "value": facts.reflection_complete.to_string() }
                ]
            }
        ]
    })
}

/// Summarizes the rendered page as a card; `None` while the host context is missing.
pub fn dashboard_card(view: &DashboardView) -> Option<Value> {
    view.as_page().map(page_card)
}

fn page_card(page: &DashboardPage) -> Value {
    let scores: Vec<Value> = page
        .wellbeing
        .iter()
        .map(|card| json!({ "title": card.label, "value": format!("{}/10", card.score) }))
        .collect();
    let progress: Vec<Value> = page
        .progress
        .points
        .iter()
        .map(|point| {
            json!({
                "title": point.due_date_time.as_deref().unwrap_or("-"),
                "value": point
                    .completion_rate
                    .map(|rate| format!("{rate:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
            })
        })
        .collect();
    json!({
        "type": "AdaptiveCard",
        "version": CARD_VERSION,
        "body": [
            { "type": "TextBlock", "text": page.student_name, "weight": "Bolder", "size": "Large" },
            { "type": "TextBlock", "text": page.course_label, "isSubtle": true },
            { "type": "FactSet", "facts": scores },
            { "type": "TextBlock", "text": page.progress.title, "weight": "Bolder" },
            { "type": "FactSet", "facts": progress }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wellbeing_card_carries_both_facts() {
        let card = wellbeing_card(&CardFacts {
            meditation_minutes: 20,
            reflection_complete: false,
        });
        let facts = card["body"][1]["facts"].as_array().unwrap();
        assert_eq!(facts[0]["title"], "meditationMinutes");
        assert_eq!(facts[0]["value"], "20");
        assert_eq!(facts[1]["title"], "reflectionComplete");
        assert_eq!(facts[1]["value"], "false");
    }

    #[test]
    fn message_body_embeds_card_as_attachment() {
        let card = json!({"type": "AdaptiveCard"});
        let body = channel_message_body(&card);
        let attachment = &body["attachments"][0];
        assert_eq!(attachment["contentType"], ADAPTIVE_CARD_CONTENT_TYPE);
        assert_eq!(attachment["id"], "ac-card-1");
        let inner: Value =
            serde_json::from_str(attachment["content"].as_str().unwrap()).unwrap();
        assert_eq!(inner, card);
        assert!(body["body"]["content"]
            .as_str()
            .unwrap()
            .contains("ac-card-1"));
    }

    #[test]
    fn loading_view_has_no_card() {
        assert!(dashboard_card(&DashboardView::loading()).is_none());
    }
}
