pub mod templates;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::export::ExportedDocument;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Email not configured")]
    NotConfigured,
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Failed to build email: {0}")]
    Build(String),
    #[error("Failed to send email: {0}")]
    Transport(String),
}

pub struct SystemMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SystemMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.user.clone(), config.pass.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("System SMTP error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    /// Deliver an approved document with the PDF attached.
    pub async fn send_biodata_pdf(
        &self,
        to_email: &str,
        to_name: &str,
        download_link: &str,
        document: &ExportedDocument,
    ) -> Result<(), DeliveryError> {
        let text = templates::render_delivery_text(to_name, download_link);
        let html = templates::render_delivery_html(to_name, download_link)
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        let body = MultiPart::mixed()
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(text))
                    .singlepart(SinglePart::html(html)),
            )
            .singlepart(
                Attachment::new(document.filename.clone()).body(
                    document.pdf.clone(),
                    ContentType::parse("application/pdf")
                        .map_err(|e| DeliveryError::Build(e.to_string()))?,
                ),
            );

        let message = self
            .envelope(to_email)?
            .subject(templates::DELIVERY_SUBJECT)
            .multipart(body)
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        self.deliver(message).await
    }

    /// Plain message used to verify SMTP settings from the command line.
    pub async fn send_test(&self, to_email: &str) -> Result<(), DeliveryError> {
        let message = self
            .envelope(to_email)?
            .subject(templates::TEST_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(templates::render_test_text())
            .map_err(|e| DeliveryError::Build(e.to_string()))?;

        self.deliver(message).await
    }

    fn envelope(&self, to: &str) -> Result<lettre::message::MessageBuilder, DeliveryError> {
        let from = self.from.parse().map_err(|e: lettre::address::AddressError| {
            DeliveryError::InvalidAddress {
                address: self.from.clone(),
                reason: e.to_string(),
            }
        })?;
        let to = to.parse().map_err(|e: lettre::address::AddressError| {
            DeliveryError::InvalidAddress {
                address: to.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Message::builder().from(from).to(to))
    }

    async fn deliver(&self, message: Message) -> Result<(), DeliveryError> {
        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(())
    }
}
