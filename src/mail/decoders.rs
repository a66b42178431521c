use mailparse::{MailHeaderMap, ParsedMail};

/// Decode HTML character references (`&amp;`, `&#8212;`, `&nbsp;`, ...).
pub fn decode_entities(body: &str) -> String {
    html_escape::decode_html_entities(body).into_owned()
}

/// Subject, sender and markup body of a raw RFC 822 message.
pub struct ParsedAlert {
    pub subject: String,
    pub sender: String,
    pub body: String,
}

pub fn parse_alert(raw_rfc822: &[u8]) -> ParsedAlert {
    match mailparse::parse_mail(raw_rfc822) {
        Ok(parsed) => {
            let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();
            let sender = parsed.headers.get_first_value("From").unwrap_or_default();
            let body = find_part(&parsed, "text/html")
                .or_else(|| find_part(&parsed, "text/plain"))
                .or_else(|| parsed.get_body().ok())
                .unwrap_or_else(|| String::from_utf8_lossy(raw_rfc822).into_owned());
            ParsedAlert {
                subject: subject.trim().to_string(),
                sender: sender.trim().to_string(),
                body: decode_entities(&body),
            }
        }
        Err(_) => ParsedAlert {
            subject: String::new(),
            sender: String::new(),
            body: decode_entities(&String::from_utf8_lossy(raw_rfc822)),
        },
    }
}

// Depth-first search for the first part of the given mime type.
fn find_part(p: &ParsedMail, mime: &str) -> Option<String> {
    if p.ctype.mimetype.eq_ignore_ascii_case(mime) {
        return p.get_body().ok();
    }
    p.subparts.iter().find_map(|sp| find_part(sp, mime))
}
