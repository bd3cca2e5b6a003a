use reqwest::Client;
use serde::Serialize;

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

#[derive(Debug, Serialize)]
struct ResendRequest {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        }
    }

    pub async fn send_email(
        &self,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), String> {
        let request = ResendRequest {
            from: format!("{} <{}>", self.from_name, self.from_email),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: html.to_string(),
        };

        let response = self.client
            .post("https://api.resend.com/emails")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("email send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("email API error: {body}"));
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }

    pub async fn send_lesson_completed(&self, to: &str, class_title: &str) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #0f766e;">Tutora - Lesson Completed</h2>
            <p>Your lesson <strong>{class_title}</strong> has been marked as completed.</p>
            <p style="color: #666; margin-top: 20px;">If you believe this is a mistake, please contact support.</p>
            </div>"#
        );

        self.send_email(to, "Tutora - Lesson completed", &html).await
    }

    pub async fn send_lesson_reversed(&self, to: &str, class_title: &str, reason: &str) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #0f766e;">Tutora - Lesson Completion Reversed</h2>
            <p>The completion of your lesson <strong>{class_title}</strong> has been reversed by an administrator.</p>
            <p>Reason: {reason}</p>
            <p style="color: #666; margin-top: 20px;">The class credit and earnings have been restored to their previous state.</p>
            </div>"#
        );

        self.send_email(to, "Tutora - Lesson completion reversed", &html).await
    }

    pub async fn send_dispute_resolved(&self, to: &str, class_title: &str, outcome: &str) -> Result<(), String> {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
            <h2 style="color: #0f766e;">Tutora - Dispute Resolved</h2>
            <p>The dispute for your lesson <strong>{class_title}</strong> has been resolved: {outcome}.</p>
            <p style="color: #666; margin-top: 20px;">If you have questions about this decision, please contact support.</p>
            </div>"#
        );

        self.send_email(to, "Tutora - Dispute resolved", &html).await
    }
}
