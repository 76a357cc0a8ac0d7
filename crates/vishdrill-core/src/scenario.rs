//! Scripted training scenarios and the read-only catalog that serves them.
//!
//! A scenario is an ordered sequence of alternating lines: attacker lines on
//! odd turns, callee turns on even ones. The catalog validates that shape at
//! construction and is never mutated afterwards, so lookups need no locking.

use crate::error::{CoreError, CoreResult};
use crate::model::Speaker;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One line of a scripted conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptLine {
    pub turn: u32,
    pub speaker: Speaker,
    pub text: String,
    /// Pre-generated audio for attacker lines, if synthesis has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl ScriptLine {
    fn attacker(turn: u32, text: &str) -> Self {
        Self {
            turn,
            speaker: Speaker::Attacker,
            text: text.to_string(),
            audio_url: None,
        }
    }

    fn callee(turn: u32) -> Self {
        Self {
            turn,
            speaker: Speaker::Callee,
            text: "[Callee response expected]".to_string(),
            audio_url: None,
        }
    }
}

/// An immutable scripted conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub description: String,
    /// "easy" | "medium" | "hard"
    pub difficulty: String,
    pub lines: Vec<ScriptLine>,
}

impl Scenario {
    /// The line at `turn` spoken by `speaker`, if the script has one.
    pub fn line_at(&self, turn: u32, speaker: Speaker) -> Option<&ScriptLine> {
        self.lines
            .iter()
            .find(|l| l.turn == turn && l.speaker == speaker)
    }

    /// Whether any line exists strictly after `turn` with the given speaker.
    /// Drives the decision to gather another reply or hang up.
    pub fn has_line_after(&self, turn: u32, speaker: Speaker) -> bool {
        self.lines.iter().any(|l| l.turn > turn && l.speaker == speaker)
    }

    fn validate(&self) -> CoreResult<()> {
        let malformed = |reason: String| CoreError::MalformedScenario {
            id: self.id.clone(),
            reason,
        };
        let first = self
            .lines
            .first()
            .ok_or_else(|| malformed("script has no lines".to_string()))?;
        if first.turn != 1 {
            return Err(malformed(format!("first turn is {}, expected 1", first.turn)));
        }
        let mut prev = 0u32;
        for line in &self.lines {
            if line.turn <= prev {
                return Err(malformed(format!(
                    "turn {} is not strictly increasing after {}",
                    line.turn, prev
                )));
            }
            let expected = if line.turn % 2 == 1 {
                Speaker::Attacker
            } else {
                Speaker::Callee
            };
            if line.speaker != expected {
                return Err(malformed(format!(
                    "turn {} spoken by {}, expected {}",
                    line.turn,
                    line.speaker.as_str(),
                    expected.as_str()
                )));
            }
            prev = line.turn;
        }
        Ok(())
    }
}

/// Read-only set of scripted conversations, loaded once at process start.
pub struct ScenarioCatalog {
    scenarios: Vec<Scenario>,
    index: HashMap<String, usize>,
}

impl ScenarioCatalog {
    /// Build a catalog, rejecting any script that violates the turn ordering
    /// or speaker-parity invariants. A bad script is a configuration defect
    /// and fails here rather than mis-stepping mid-call.
    pub fn with_scenarios(scenarios: Vec<Scenario>) -> CoreResult<Self> {
        let mut index = HashMap::new();
        for (i, scenario) in scenarios.iter().enumerate() {
            scenario.validate()?;
            index.insert(scenario.id.clone(), i);
        }
        Ok(Self { scenarios, index })
    }

    /// Catalog of the built-in training scripts.
    pub fn builtin() -> Self {
        Self::with_scenarios(builtin_scenarios()).expect("built-in scenarios are well-formed")
    }

    pub fn get(&self, scenario_id: &str) -> CoreResult<&Scenario> {
        self.index
            .get(scenario_id)
            .map(|&i| &self.scenarios[i])
            .ok_or_else(|| CoreError::ScenarioNotFound(scenario_id.to_string()))
    }

    /// All scenarios in insertion order.
    pub fn list(&self) -> &[Scenario] {
        &self.scenarios
    }
}

fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            id: "bank_fraud".to_string(),
            name: "Bank Fraud Department".to_string(),
            description: "Caller pretends to be from the bank's fraud department warning about suspicious activity".to_string(),
            difficulty: "medium".to_string(),
            lines: vec![
                ScriptLine::attacker(1, "Hello, this is David from the fraud department at your bank. We've detected some suspicious activity on your account ending in 4567. Are you available to verify some information?"),
                ScriptLine::callee(2),
                ScriptLine::attacker(3, "We're showing a charge of $2,500 attempting to process from an online retailer in California. Did you authorize this transaction?"),
                ScriptLine::callee(4),
                ScriptLine::attacker(5, "I understand. For security purposes, I need to verify your identity. Can you please confirm the full account number on the card?"),
                ScriptLine::callee(6),
                ScriptLine::attacker(7, "Thank you. I'm sending a verification code to your phone right now. When you receive it, please read me that 6-digit code so I can cancel this fraudulent transaction immediately."),
                ScriptLine::callee(8),
                ScriptLine::attacker(9, "Perfect. Your account is now secured and the fraudulent charge has been blocked. You should see a confirmation email within 24 hours. Is there anything else I can help you with today?"),
                ScriptLine::callee(10),
                ScriptLine::attacker(11, "Thank you for your time. Have a great day and remember to monitor your account regularly."),
            ],
        },
        Scenario {
            id: "tech_support".to_string(),
            name: "Tech Support Scam".to_string(),
            description: "Caller claims to be from Microsoft warning about a virus on the computer".to_string(),
            difficulty: "easy".to_string(),
            lines: vec![
                ScriptLine::attacker(1, "Hello, this is Michael from Microsoft Technical Support. We've detected malicious software on your computer that's sending your personal data to hackers. Is this a good time to help you remove it?"),
                ScriptLine::callee(2),
                ScriptLine::attacker(3, "I need you to go to your computer right now. Can you tell me what you see on your screen? Are there any error messages or pop-ups?"),
                ScriptLine::callee(4),
                ScriptLine::attacker(5, "Okay, I'm going to give you a website to visit so I can remote into your computer and remove the virus. Please write this down: support-dot-microsoft-dash-secure.com. Can you open that in your browser?"),
                ScriptLine::callee(6),
                ScriptLine::attacker(7, "Great. Now you should see a download button. Click that and tell me the 6-digit access code that appears on your screen."),
                ScriptLine::callee(8),
                ScriptLine::attacker(9, "Perfect. I'm connecting now to scan your system. This will take about 30 seconds."),
            ],
        },
        Scenario {
            id: "irs_tax".to_string(),
            name: "IRS Tax Warrant".to_string(),
            description: "Caller impersonates an IRS agent threatening arrest for unpaid taxes".to_string(),
            difficulty: "hard".to_string(),
            lines: vec![
                ScriptLine::attacker(1, "This is Officer Jenkins from the Internal Revenue Service. We have issued a warrant for your arrest due to unpaid taxes from 2022 and 2023 totaling $8,450. This is your final notice before we dispatch local law enforcement. Do you understand the severity of this situation?"),
                ScriptLine::callee(2),
                ScriptLine::attacker(3, "You can avoid arrest if you settle this debt immediately. I'm authorized to accept payment over the phone right now. Do you have access to your bank account or a credit card?"),
                ScriptLine::callee(4),
                ScriptLine::attacker(5, "Time is critical here. I can only hold this warrant for the next 15 minutes. Please provide your social security number so I can verify your identity and process the payment to clear this warrant."),
                ScriptLine::callee(6),
                ScriptLine::attacker(7, "I need the payment immediately. You can pay using gift cards from any major retailer. Purchase $8,450 in iTunes or Google Play cards and read me the codes. This is the only way to stop the arrest warrant."),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_scripts_pass_validation() {
        let catalog = ScenarioCatalog::builtin();
        assert_eq!(catalog.list().len(), 3);
        for scenario in catalog.list() {
            assert_eq!(scenario.lines[0].turn, 1);
            let mut prev = 0;
            for line in &scenario.lines {
                assert!(line.turn > prev, "turns strictly increasing");
                prev = line.turn;
            }
        }
    }

    #[test]
    fn unknown_scenario_is_not_found() {
        let catalog = ScenarioCatalog::builtin();
        assert!(matches!(
            catalog.get("no_such_script"),
            Err(CoreError::ScenarioNotFound(_))
        ));
    }

    #[test]
    fn parity_violation_rejected_at_load() {
        let bad = Scenario {
            id: "bad".to_string(),
            name: "Bad".to_string(),
            description: String::new(),
            difficulty: "easy".to_string(),
            lines: vec![
                ScriptLine::attacker(1, "hello"),
                ScriptLine::attacker(2, "still me"),
            ],
        };
        assert!(matches!(
            ScenarioCatalog::with_scenarios(vec![bad]),
            Err(CoreError::MalformedScenario { .. })
        ));
    }

    #[test]
    fn non_increasing_turns_rejected_at_load() {
        let bad = Scenario {
            id: "bad".to_string(),
            name: "Bad".to_string(),
            description: String::new(),
            difficulty: "easy".to_string(),
            lines: vec![
                ScriptLine::attacker(1, "hello"),
                ScriptLine::callee(2),
                ScriptLine::attacker(1, "again"),
            ],
        };
        assert!(ScenarioCatalog::with_scenarios(vec![bad]).is_err());
    }

    #[test]
    fn line_lookup_by_turn_and_speaker() {
        let catalog = ScenarioCatalog::builtin();
        let scenario = catalog.get("bank_fraud").unwrap();
        assert!(scenario.line_at(1, Speaker::Attacker).is_some());
        assert!(scenario.line_at(1, Speaker::Callee).is_none());
        assert!(scenario.has_line_after(9, Speaker::Callee));
        assert!(!scenario.has_line_after(11, Speaker::Callee));
    }
}
