use common::configuration::EscalationConfig;
use tracing::{debug, info};

use super::{Outcome, Transcript, Turn};
use crate::errors::AnalysisError;

/// Label a transcript ESCALATED when its intent or its reason for calling
/// contains one of the configured escalation keywords (case-insensitive).
pub fn label_outcome(transcript: &Transcript, config: &EscalationConfig) -> Outcome {
    let intent = transcript.intent.to_lowercase();
    let reason = transcript.reason_for_call.to_lowercase();

    let escalated = config
        .intent_keywords
        .iter()
        .any(|k| intent.contains(&k.to_lowercase()))
        || config
            .reason_keywords
            .iter()
            .any(|k| reason.contains(&k.to_lowercase()));

    if escalated {
        Outcome::Escalated
    } else {
        Outcome::Resolved
    }
}

/// Flatten transcripts into turns numbered from 1 within each conversation.
///
/// Fails on the first message without a speaker or text.
pub fn preprocess_transcripts(
    transcripts: &[Transcript],
    config: &EscalationConfig,
) -> Result<Vec<Turn>, AnalysisError> {
    let mut turns = Vec::with_capacity(transcripts.iter().map(|t| t.conversation.len()).sum());
    let mut escalated = 0usize;

    for transcript in transcripts {
        let outcome = label_outcome(transcript, config);
        if outcome == Outcome::Escalated {
            escalated += 1;
        }

        for (idx, message) in transcript.conversation.iter().enumerate() {
            let turn_number = idx as u32 + 1;
            let malformed = |field| AnalysisError::MalformedTurn {
                transcript_id: transcript.transcript_id.clone(),
                turn_number,
                field,
            };

            let speaker = message.speaker.as_ref().ok_or_else(|| malformed("speaker"))?;
            let text = message.text.as_ref().ok_or_else(|| malformed("text"))?;

            turns.push(Turn {
                transcript_id: transcript.transcript_id.clone(),
                domain: transcript.domain.clone(),
                intent: transcript.intent.clone(),
                outcome,
                turn_number,
                speaker: speaker.clone(),
                text: text.clone(),
            });
        }

        debug!(
            transcript_id = %transcript.transcript_id,
            outcome = %outcome,
            turns = transcript.conversation.len(),
            "preprocessed transcript"
        );
    }

    info!(
        transcripts = transcripts.len(),
        escalated,
        turns = turns.len(),
        "preprocessed transcripts"
    );
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcripts::RawMessage;
    use pretty_assertions::assert_eq;

    fn transcript(id: &str, intent: &str, reason: &str, messages: Vec<RawMessage>) -> Transcript {
        Transcript {
            transcript_id: id.to_string(),
            domain: "Retail".to_string(),
            intent: intent.to_string(),
            reason_for_call: reason.to_string(),
            conversation: messages,
        }
    }

    #[test]
    fn test_label_outcome_intent_keywords() {
        let config = EscalationConfig::default();
        let t = transcript("1", "Escalation Request", "", vec![]);
        assert_eq!(label_outcome(&t, &config), Outcome::Escalated);

        let t = transcript("2", "Product COMPLAINT", "", vec![]);
        assert_eq!(label_outcome(&t, &config), Outcome::Escalated);

        let t = transcript("3", "Order Status", "late delivery", vec![]);
        assert_eq!(label_outcome(&t, &config), Outcome::Resolved);
    }

    #[test]
    fn test_label_outcome_reason_keywords() {
        let config = EscalationConfig::default();
        let t = transcript("1", "Refund", "Asked for a Supervisor", vec![]);
        assert_eq!(label_outcome(&t, &config), Outcome::Escalated);

        let t = transcript("2", "Refund", "filed a complaint", vec![]);
        assert_eq!(label_outcome(&t, &config), Outcome::Escalated);

        // "supervisor" only counts in the reason field
        let t = transcript("3", "supervisor callback", "billing", vec![]);
        assert_eq!(label_outcome(&t, &config), Outcome::Resolved);
    }

    #[test]
    fn test_preprocess_numbers_turns_per_conversation() {
        let transcripts = vec![
            transcript(
                "A",
                "Complaint",
                "",
                vec![
                    RawMessage::new("Customer", "This is the third time"),
                    RawMessage::new("Agent", "Let me check"),
                ],
            ),
            transcript(
                "B",
                "Order Status",
                "",
                vec![RawMessage::new("Customer", "Where is my order?")],
            ),
        ];

        let turns = preprocess_transcripts(&transcripts, &EscalationConfig::default()).unwrap();
        let summary: Vec<(&str, u32, Outcome)> = turns
            .iter()
            .map(|t| (t.transcript_id.as_str(), t.turn_number, t.outcome))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A", 1, Outcome::Escalated),
                ("A", 2, Outcome::Escalated),
                ("B", 1, Outcome::Resolved),
            ]
        );
        assert_eq!(turns[1].speaker, "Agent");
        assert_eq!(turns[0].domain, "Retail");
    }

    #[test]
    fn test_preprocess_fails_fast_on_missing_text() {
        let transcripts = vec![transcript(
            "A",
            "Refund",
            "",
            vec![
                RawMessage::new("Customer", "hello"),
                RawMessage {
                    speaker: Some("Agent".to_string()),
                    text: None,
                },
            ],
        )];

        let err = preprocess_transcripts(&transcripts, &EscalationConfig::default()).unwrap_err();
        match err {
            AnalysisError::MalformedTurn {
                transcript_id,
                turn_number,
                field,
            } => {
                assert_eq!(transcript_id, "A");
                assert_eq!(turn_number, 2);
                assert_eq!(field, "text");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_preprocess_fails_fast_on_missing_speaker() {
        let transcripts = vec![transcript(
            "A",
            "Refund",
            "",
            vec![RawMessage {
                speaker: None,
                text: Some("hi".to_string()),
            }],
        )];

        let err = preprocess_transcripts(&transcripts, &EscalationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::MalformedTurn {
                field: "speaker",
                ..
            }
        ));
    }

    #[test]
    fn test_preprocess_empty() {
        let turns = preprocess_transcripts(&[], &EscalationConfig::default()).unwrap();
        assert!(turns.is_empty());
    }
}
