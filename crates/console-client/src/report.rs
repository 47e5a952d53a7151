//! Human-readable rendering of a sample run

use std::io::{self, Write};

use crate::sample::SampleOutcome;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, Default)]
pub struct Style {
    pub color: bool,
}

impl Style {
    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

pub fn render(outcome: &SampleOutcome, out: &mut impl Write, style: Style) -> io::Result<()> {
    match outcome {
        SampleOutcome::NotProtected { body } => {
            writeln!(out, "{}", style.paint(RED, "YOU ARE NOT PROTECTED!!!"))?;
            writeln!(out, "The API answered an invalid token with: {}", body)?;
        }
        SampleOutcome::ProtectionCheckFailed(e) => {
            writeln!(out, "{}", style.paint(RED, "Could not reach the API:"))?;
            writeln!(out, "{}", e)?;
        }
        SampleOutcome::LoginFailed(e) => {
            writeln!(out, "{}", style.paint(RED, "Failed to login with error:"))?;
            match e {
                crate::ClientError::TokenRequest {
                    error,
                    error_description,
                } => {
                    writeln!(out, "{}", error)?;
                    if let Some(description) = error_description {
                        writeln!(out, "{}", description)?;
                    }
                }
                other => writeln!(out, "{}", other)?,
            }
        }
        SampleOutcome::CallFailed {
            access_token,
            error,
        } => {
            writeln!(out, "{}", style.paint(GREEN, "SUCCESS!!"))?;
            writeln!(out, "Access Token:")?;
            writeln!(out, "{}", access_token)?;
            writeln!(out, "{}", style.paint(RED, "API call failed:"))?;
            writeln!(out, "{}", error)?;
        }
        SampleOutcome::Success { access_token, body } => {
            writeln!(out, "{}", style.paint(GREEN, "SUCCESS!!"))?;
            writeln!(out, "Access Token:")?;
            writeln!(out, "{}", access_token)?;
            writeln!(out, "API response:")?;
            writeln!(out, "{}", body)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;

    fn rendered(outcome: &SampleOutcome, style: Style) -> String {
        let mut buf = Vec::new();
        render(outcome, &mut buf, style).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_success_plain() {
        let text = rendered(
            &SampleOutcome::Success {
                access_token: "tok".to_string(),
                body: "Hello, sup homie.".to_string(),
            },
            Style::default(),
        );
        assert_eq!(
            text,
            "SUCCESS!!\nAccess Token:\ntok\nAPI response:\nHello, sup homie.\n"
        );
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_login_failure_shows_error_and_description() {
        let text = rendered(
            &SampleOutcome::LoginFailed(ClientError::TokenRequest {
                error: "invalid_grant".to_string(),
                error_description: Some("Invalid username or password".to_string()),
            }),
            Style::default(),
        );
        assert!(text.starts_with("Failed to login with error:\n"));
        assert!(text.contains("invalid_grant\n"));
        assert!(text.contains("Invalid username or password\n"));
    }

    #[test]
    fn test_not_protected_colored() {
        let text = rendered(
            &SampleOutcome::NotProtected {
                body: "hi".to_string(),
            },
            Style { color: true },
        );
        assert!(text.starts_with(RED));
        assert!(text.contains("YOU ARE NOT PROTECTED!!!"));
    }
}
