//! Mail Templates
//!
//! Activation and reset messages. Codes are only ever sent by mail, never
//! logged or echoed in responses.

use std::time::Duration;

use crate::domain::entity::user::User;
use crate::domain::port::OutgoingMail;
use crate::domain::value_object::one_time_code::OneTimeCode;

pub fn activation_mail(user: &User, code: &OneTimeCode, ttl: Duration) -> OutgoingMail {
    let html = layout(
        "Activate your account",
        &format!(
            r#"<p>Hi {name},</p>
    <p>Thanks for signing up. Enter this code to activate your account:</p>
    {code}
    <p style="color: #999; font-size: 12px;">The code expires in {minutes} minutes. If you did not sign up, you can ignore this email.</p>"#,
            name = escape_html(user.first_name.as_str()),
            code = code_block(code),
            minutes = ttl.as_secs() / 60,
        ),
    );

    OutgoingMail {
        to: user.email.clone(),
        subject: "Your activation code".to_string(),
        html,
    }
}

pub fn reset_mail(user: &User, code: &OneTimeCode, ttl: Duration) -> OutgoingMail {
    let html = layout(
        "Reset your password",
        &format!(
            r#"<p>Hi {name},</p>
    <p>We received a request to reset your password. Enter this code to choose a new one:</p>
    {code}
    <p style="color: #999; font-size: 12px;">The code expires in {minutes} minutes. If you did not request a reset, you can ignore this email.</p>"#,
            name = escape_html(user.first_name.as_str()),
            code = code_block(code),
            minutes = ttl.as_secs() / 60,
        ),
    );

    OutgoingMail {
        to: user.email.clone(),
        subject: "Your password reset code".to_string(),
        html,
    }
}

fn code_block(code: &OneTimeCode) -> String {
    format!(
        r#"<p style="font-size: 28px; letter-spacing: 6px; font-weight: bold; text-align: center;">{}</p>"#,
        code.as_str()
    )
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
</head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1 style="color: #333;">{title}</h1>
    {body}
</body>
</html>"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{email::Email, person_name::PersonName};
    use chrono::Utc;

    #[test]
    fn test_activation_mail_contains_code_and_escapes_name() {
        let user = User::new_google(
            Email::new("x@example.com").unwrap(),
            PersonName::new("<b>Eve</b>").unwrap(),
            PersonName::new("Doe").unwrap(),
            "sub".into(),
            Utc::now(),
        );
        let mail = activation_mail(
            &user,
            &OneTimeCode::from_db("314159"),
            Duration::from_secs(900),
        );

        assert_eq!(mail.to.as_str(), "x@example.com");
        assert!(mail.html.contains("314159"));
        assert!(mail.html.contains("15 minutes"));
        assert!(mail.html.contains("&lt;b&gt;Eve"));
        assert!(!mail.html.contains("<b>Eve"));
    }
}
