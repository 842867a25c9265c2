//! Trigger evaluation: decides whether a playbook applies to an alert.

use crate::models::{Alert, Playbook};

/// Evaluates a playbook's trigger condition against an alert.
///
/// All present conditions must hold (logical AND); absent conditions are
/// vacuously true. Pure, no side effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct TriggerEvaluator;

impl TriggerEvaluator {
    pub fn matches(&self, playbook: &Playbook, alert: &Alert) -> bool {
        if !playbook.enabled {
            return false;
        }

        let trigger = &playbook.trigger;

        if let Some(min_severity) = trigger.min_severity {
            if alert.severity < min_severity {
                return false;
            }
        }

        if let Some(source_types) = &trigger.source_types {
            if !source_types.contains(&alert.source) {
                return false;
            }
        }

        if let Some(keywords) = &trigger.keywords {
            let text = format!(
                "{} {}",
                alert.title,
                alert.description.as_deref().unwrap_or("")
            )
            .to_lowercase();
            if !keywords.iter().any(|kw| text.contains(&kw.to_lowercase())) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ActionType, AlertSeverity, AlertSource, PlaybookAction, TriggerCondition,
    };
    use uuid::Uuid;

    fn playbook_with_trigger(trigger: TriggerCondition) -> Playbook {
        Playbook {
            id: Uuid::new_v4(),
            name: "test".to_string(),
            description: None,
            enabled: true,
            trigger,
            actions: vec![PlaybookAction::new(ActionType::EnrichAll)],
        }
    }

    fn alert(severity: AlertSeverity, source: AlertSource, title: &str) -> Alert {
        Alert::new(title, severity, source)
    }

    #[test]
    fn empty_trigger_matches_everything() {
        let playbook = playbook_with_trigger(TriggerCondition::default());
        let evaluator = TriggerEvaluator;
        assert!(evaluator.matches(
            &playbook,
            &alert(AlertSeverity::Low, AlertSource::Custom, "anything")
        ));
    }

    #[test]
    fn disabled_playbook_never_matches() {
        let mut playbook = playbook_with_trigger(TriggerCondition::default());
        playbook.enabled = false;
        let evaluator = TriggerEvaluator;
        assert!(!evaluator.matches(
            &playbook,
            &alert(AlertSeverity::Critical, AlertSource::Edr, "ransomware")
        ));
    }

    #[test]
    fn min_severity_compares_by_ordinal() {
        let playbook = playbook_with_trigger(TriggerCondition {
            min_severity: Some(AlertSeverity::High),
            ..Default::default()
        });
        let evaluator = TriggerEvaluator;

        for (severity, expected) in [
            (AlertSeverity::Low, false),
            (AlertSeverity::Medium, false),
            (AlertSeverity::High, true),
            (AlertSeverity::Critical, true),
        ] {
            assert_eq!(
                evaluator.matches(&playbook, &alert(severity, AlertSource::Siem, "event")),
                expected,
                "severity {:?}",
                severity
            );
        }
    }

    #[test]
    fn source_types_require_membership() {
        let playbook = playbook_with_trigger(TriggerCondition {
            source_types: Some(vec![AlertSource::Edr, AlertSource::Ids]),
            ..Default::default()
        });
        let evaluator = TriggerEvaluator;

        assert!(evaluator.matches(
            &playbook,
            &alert(AlertSeverity::Low, AlertSource::Edr, "event")
        ));
        assert!(!evaluator.matches(
            &playbook,
            &alert(AlertSeverity::Critical, AlertSource::Email, "event")
        ));
    }

    #[test]
    fn keywords_match_case_insensitively_in_title_or_description() {
        let playbook = playbook_with_trigger(TriggerCondition {
            keywords: Some(vec!["Ransomware".to_string(), "trojan".to_string()]),
            ..Default::default()
        });
        let evaluator = TriggerEvaluator;

        assert!(evaluator.matches(
            &playbook,
            &alert(AlertSeverity::Low, AlertSource::Edr, "RANSOMWARE detected")
        ));

        let mut described = alert(AlertSeverity::Low, AlertSource::Edr, "odd binary");
        described.description = Some("looks like a Trojan dropper".to_string());
        assert!(evaluator.matches(&playbook, &described));

        assert!(!evaluator.matches(
            &playbook,
            &alert(AlertSeverity::Critical, AlertSource::Edr, "port scan")
        ));
    }

    #[test]
    fn all_present_conditions_must_hold() {
        let playbook = playbook_with_trigger(TriggerCondition {
            min_severity: Some(AlertSeverity::Medium),
            source_types: Some(vec![AlertSource::Edr]),
            keywords: Some(vec!["malware".to_string()]),
        });
        let evaluator = TriggerEvaluator;

        assert!(evaluator.matches(
            &playbook,
            &alert(AlertSeverity::High, AlertSource::Edr, "malware beacon")
        ));
        // Right source and keyword, severity below threshold.
        assert!(!evaluator.matches(
            &playbook,
            &alert(AlertSeverity::Low, AlertSource::Edr, "malware beacon")
        ));
        // Right severity and keyword, wrong source.
        assert!(!evaluator.matches(
            &playbook,
            &alert(AlertSeverity::High, AlertSource::Siem, "malware beacon")
        ));
    }
}
