use crate::{
    AppState,
    email::{EmailMessage, EmailProvider},
};
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{error, info, warn};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;
const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@<>]+@[^\s@<>]+\.[^\s@<>]+$").expect("email pattern is valid")
});

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// A submission that passed validation, with every field trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

pub fn is_valid_email(address: &str) -> bool {
    address.len() <= MAX_EMAIL_LEN && EMAIL_ADDRESS.is_match(address)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl ContactForm {
    pub fn validate(&self) -> Result<ContactSubmission, Vec<FieldError>> {
        let mut errors = Vec::new();
        let fields = [
            ("name", self.name.trim(), MAX_NAME_LEN),
            ("email", self.email.trim(), MAX_EMAIL_LEN),
            ("subject", self.subject.trim(), MAX_SUBJECT_LEN),
            ("message", self.message.trim(), MAX_MESSAGE_LEN),
        ];

        for (field, value, max) in fields {
            if value.is_empty() {
                errors.push(FieldError {
                    field,
                    message: format!("{} is required", field),
                });
            } else if value.chars().count() > max {
                errors.push(FieldError {
                    field,
                    message: format!("{} must be at most {} characters", field, max),
                });
            }
        }

        let email = self.email.trim();
        if !email.is_empty() && !errors.iter().any(|e| e.field == "email") && !is_valid_email(email)
        {
            errors.push(FieldError {
                field: "email",
                message: "email address is not valid".to_string(),
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ContactSubmission {
            name: self.name.trim().to_string(),
            email: email.to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
        })
    }
}

impl ContactSubmission {
    pub fn to_email(&self, to: &str, from: &str, subject_prefix: &str) -> EmailMessage {
        let text = format!(
            "Name: {}\nEmail: {}\nSubject: {}\n\n{}",
            self.name, self.email, self.subject, self.message
        );
        let html = format!(
            "<p><strong>Name:</strong> {}<br><strong>Email:</strong> {}<br><strong>Subject:</strong> {}</p><p>{}</p>",
            escape_html(&self.name),
            escape_html(&self.email),
            escape_html(&self.subject),
            escape_html(&self.message).replace('\n', "<br>")
        );

        EmailMessage::new(to, from, format!("{}{}", subject_prefix, self.subject))
            .with_both(text, html)
            .with_reply_to(self.email.clone())
    }
}

fn reply(status: StatusCode, success: bool, message: &str, errors: Option<Vec<FieldError>>) -> Response {
    (
        status,
        Json(ContactResponse {
            success,
            message: message.to_string(),
            errors,
        }),
    )
        .into_response()
}

pub async fn contact_handler(
    State(app_state): State<AppState>,
    Form(form): Form<ContactForm>,
) -> Response {
    let submission = match form.validate() {
        Ok(submission) => submission,
        Err(errors) => {
            warn!("Contact form rejected with {} errors", errors.len());
            return reply(
                StatusCode::UNPROCESSABLE_ENTITY,
                false,
                "Please correct the highlighted fields",
                Some(errors),
            );
        }
    };

    let (Some(provider), Some(email_config), Some(recipient)) = (
        app_state.email_provider.as_ref(),
        app_state.config.email.as_ref(),
        app_state.config.contact.recipient.as_deref(),
    ) else {
        warn!("Contact form submitted but email delivery is not configured");
        return reply(
            StatusCode::SERVICE_UNAVAILABLE,
            false,
            "Contact form is currently unavailable",
            None,
        );
    };

    let message = submission.to_email(
        recipient,
        &email_config.format_from(),
        &app_state.config.contact.subject_prefix,
    );

    match provider.send_email(message).await {
        Ok(()) => {
            info!(provider = provider.name(), "Contact message delivered");
            reply(StatusCode::OK, true, "Thank you, your message has been sent", None)
        }
        Err(e) => {
            error!("Failed to deliver contact message: {}", e);
            reply(
                StatusCode::BAD_GATEWAY,
                false,
                "Your message could not be sent, please try again later",
                None,
            )
        }
    }
}
