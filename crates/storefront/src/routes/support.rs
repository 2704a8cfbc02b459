//! Support, contact and newsletter route handlers.
//!
//! Submissions are validated, acknowledged and logged. Nothing is persisted.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use maison_core::Email;

use crate::error::{AppError, Result};

/// One FAQ topic.
#[derive(Debug, Serialize)]
pub struct SupportCategory {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub faqs: &'static [Faq],
}

#[derive(Debug, Serialize)]
pub struct Faq {
    pub question: &'static str,
    pub answer: &'static str,
}

pub static SUPPORT_CATEGORIES: &[SupportCategory] = &[
    SupportCategory {
        id: "warranty",
        title: "Warranty & Guarantee",
        description: "Information about your warranty and international guarantee",
        faqs: &[
            Faq {
                question: "How long is the warranty?",
                answer: "Every watch comes with a 5-year international warranty from the date of purchase.",
            },
            Faq {
                question: "What does the warranty cover?",
                answer: "The warranty covers any manufacturing defects and malfunctions occurring under normal use.",
            },
            Faq {
                question: "Can I extend my warranty?",
                answer: "Contact your authorized boutique for information about extended service plans.",
            },
        ],
    },
    SupportCategory {
        id: "service",
        title: "Servicing & Repairs",
        description: "Professional maintenance and repair services for your timepiece",
        faqs: &[
            Faq {
                question: "How often should I service my watch?",
                answer: "We recommend a service approximately every 10 years, depending on the model and real-life usage.",
            },
            Faq {
                question: "Where can I get my watch serviced?",
                answer: "All servicing should be performed by authorized service centers or boutiques.",
            },
            Faq {
                question: "How long does servicing take?",
                answer: "A complete service typically takes 4-6 weeks, depending on the model and required work.",
            },
        ],
    },
    SupportCategory {
        id: "authenticity",
        title: "Authenticity Verification",
        description: "Verify the authenticity of your timepiece",
        faqs: &[
            Faq {
                question: "How can I verify my watch is authentic?",
                answer: "Visit an authorized boutique with your watch and papers for official verification.",
            },
            Faq {
                question: "What documents should come with my watch?",
                answer: "Every genuine watch includes a warranty card, instruction manual, and certificate.",
            },
            Faq {
                question: "Can I check authenticity online?",
                answer: "Full authenticity verification must be done in person at an authorized location.",
            },
        ],
    },
    SupportCategory {
        id: "care",
        title: "Care Instructions",
        description: "Learn how to properly care for and maintain your watch",
        faqs: &[
            Faq {
                question: "How should I clean my watch?",
                answer: "Clean your watch with a soft cloth. For deeper cleaning, use lukewarm water and a soft brush.",
            },
            Faq {
                question: "Can I wear my watch while swimming?",
                answer: "Yes, Oyster models are waterproof and suitable for swimming. Ensure the crown is screwed down.",
            },
            Faq {
                question: "How should I store my watch?",
                answer: "Store in a clean, dry place away from magnets and extreme temperatures.",
            },
        ],
    },
];

/// FAQ categories.
///
/// GET /api/support/faq
pub async fn faq() -> Json<&'static [SupportCategory]> {
    Json(SUPPORT_CATEGORIES)
}

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Response for form submission.
#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub success: bool,
    pub message: String,
}

/// Submit a support request.
///
/// POST /api/support/contact
#[instrument(skip(form), fields(subject = %form.subject))]
pub async fn contact(Json(form): Json<ContactForm>) -> Result<Json<Acknowledgement>> {
    if [&form.name, &form.subject, &form.message]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(AppError::BadRequest(
            "Name, email, subject and message are required.".to_string(),
        ));
    }
    let email = Email::parse(&form.email)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address.".to_string()))?;

    tracing::info!(
        email = %email,
        has_phone = form.phone.as_deref().is_some_and(|p| !p.trim().is_empty()),
        message_len = form.message.trim().len(),
        "Support request received"
    );

    Ok(Json(Acknowledgement {
        success: true,
        message: "Thank you for contacting us. Our team will respond within 24 hours.".to_string(),
    }))
}

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
}

/// Subscribe to the newsletter.
///
/// POST /api/newsletter
#[instrument(skip(form))]
pub async fn subscribe(
    Json(form): Json<SubscribeForm>,
) -> Result<(StatusCode, Json<Acknowledgement>)> {
    let email = Email::parse(&form.email)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address.".to_string()))?;
    tracing::info!(email = %email, "Newsletter subscription received");

    Ok((
        StatusCode::OK,
        Json(Acknowledgement {
            success: true,
            message: format!("{email} is now subscribed."),
        }),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, subject: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_faq_categories() {
        let ids: Vec<_> = SUPPORT_CATEGORIES.iter().map(|c| c.id).collect();
        assert_eq!(ids, ["warranty", "service", "authenticity", "care"]);
        assert!(SUPPORT_CATEGORIES.iter().all(|c| c.faqs.len() == 3));
    }

    #[tokio::test]
    async fn test_contact_acknowledged() {
        let Json(ack) = contact(Json(form("Ada", "ada@example.com", "Service", "Hello")))
            .await
            .unwrap();
        assert!(ack.success);
        assert!(ack.message.contains("24 hours"));
    }

    #[tokio::test]
    async fn test_contact_requires_fields() {
        let missing = contact(Json(form("Ada", "ada@example.com", " ", "Hello"))).await;
        assert!(matches!(missing, Err(AppError::BadRequest(_))));

        let bad_email = contact(Json(form("Ada", "not-an-email", "Service", "Hello"))).await;
        assert!(matches!(bad_email, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_newsletter_validates_email() {
        assert!(
            subscribe(Json(SubscribeForm {
                email: "ada@example.com".to_string()
            }))
            .await
            .is_ok()
        );
        assert!(
            subscribe(Json(SubscribeForm {
                email: "ada".to_string()
            }))
            .await
            .is_err()
        );
    }
}
