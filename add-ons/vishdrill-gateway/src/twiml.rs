//! Renders a [`CallDirective`] to the provider's TwiML voice-response XML.

use vishdrill_core::{CallDirective, DirectiveStep};

/// Serialize a directive into a complete TwiML document.
pub fn render(directive: &CallDirective) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
    for step in &directive.steps {
        match step {
            DirectiveStep::Play { url } => {
                xml.push_str(&format!("<Play>{}</Play>", escape(url)));
            }
            DirectiveStep::Say { text } => {
                xml.push_str(&format!("<Say>{}</Say>", escape(text)));
            }
            DirectiveStep::GatherSpeech {
                action,
                timeout_secs,
            } => {
                xml.push_str(&format!(
                    r#"<Gather input="speech" action="{}" method="POST" timeout="{}" speechTimeout="auto"/>"#,
                    escape(action),
                    timeout_secs
                ));
            }
            DirectiveStep::Redirect { url } => {
                xml.push_str(&format!("<Redirect>{}</Redirect>", escape(url)));
            }
            DirectiveStep::Pause { seconds } => {
                xml.push_str(&format!(r#"<Pause length="{seconds}"/>"#));
            }
            DirectiveStep::Hangup => xml.push_str("<Hangup/>"),
        }
    }
    xml.push_str("</Response>");
    xml
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
