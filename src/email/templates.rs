use askama::Template;

pub const DELIVERY_SUBJECT: &str = "Your Biodata PDF is Attached!";
pub const TEST_SUBJECT: &str = "Test email from the biodata server";

#[derive(Template)]
#[template(path = "email/delivery.html")]
struct DeliveryHtml<'a> {
    greeting: &'a str,
    download_link: &'a str,
}

fn greeting(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() { "there" } else { name }
}

pub fn render_delivery_text(name: &str, download_link: &str) -> String {
    format!(
        "Dear {},\n\n\
         Your biodata has been approved and the PDF is attached.\n\n\
         You can also download it here for the next few days:\n{download_link}\n",
        greeting(name)
    )
}

pub fn render_delivery_html(name: &str, download_link: &str) -> Result<String, askama::Error> {
    DeliveryHtml {
        greeting: greeting(name),
        download_link,
    }
    .render()
}

pub fn render_test_text() -> String {
    "This is a test email sent from the biodata server to verify SMTP settings.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_mentions_link_and_falls_back_on_blank_name() {
        let text = render_delivery_text("  ", "https://example.com/api/v1/download/5/tok");
        assert!(text.starts_with("Dear there,"));
        assert!(text.contains("/api/v1/download/5/tok"));

        let html = render_delivery_html("Asha", "https://example.com/d").unwrap();
        assert!(html.contains("Dear Asha,"));
        assert!(html.contains("https://example.com/d"));
    }

    #[test]
    fn delivery_html_escapes_submitted_names() {
        let html = render_delivery_html("<b>Asha</b>", "https://example.com/d").unwrap();
        assert!(!html.contains("<b>Asha</b>"));
        assert!(html.contains("&#60;b&#62;Asha"));
    }
}
