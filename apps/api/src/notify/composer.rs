//! Renders the eligible / not-eligible candidate emails.

use crate::notify::NotificationMessage;

pub const DEFAULT_CANDIDATE_NAME: &str = "Candidate";

/// Inputs for one rendered message.
pub struct ComposeParams<'a> {
    pub recipient: &'a str,
    pub candidate_name: &'a str,
    pub target_role: &'a str,
    pub eligible: bool,
    pub candidate_id: i64,
}

/// Holds the deployment-specific template values.
#[derive(Debug, Clone)]
pub struct Composer {
    exam_link_base: String,
    company_name: String,
}

impl Composer {
    pub fn new(exam_link_base: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            exam_link_base: exam_link_base.into(),
            company_name: company_name.into(),
        }
    }

    /// Scheduling link for a candidate; the id is always the final component.
    pub fn exam_link(&self, candidate_id: i64) -> String {
        let separator = if self.exam_link_base.contains('?') {
            '&'
        } else {
            '?'
        };
        format!("{}{separator}candidate_id={candidate_id}", self.exam_link_base)
    }

    pub fn compose(&self, params: ComposeParams<'_>) -> NotificationMessage {
        let ComposeParams {
            recipient,
            candidate_name,
            target_role,
            eligible,
            candidate_id,
        } = params;

        let name = match candidate_name.trim() {
            "" => DEFAULT_CANDIDATE_NAME,
            trimmed => trimmed,
        };
        let role = humanize_role(target_role);
        let subject = format!("Application received for {role}");

        if !eligible {
            // The rejection quotes the role exactly as submitted.
            let submitted_role = target_role.trim();
            let plain_body = format!(
                "Hi {name},\n\n\
                 We received your application for the role: {submitted_role}.\n\
                 Unfortunately, you are not eligible at this time.\n\n\
                 Thanks!\n"
            );
            return NotificationMessage {
                recipient: recipient.to_string(),
                subject,
                plain_body,
                html_body: None,
            };
        }

        let link = self.exam_link(candidate_id);
        let company = &self.company_name;
        let plain_body = format!(
            "Dear {name},\n\n\
             Thank you for applying for the position of {role} at {company}.\n\
             We have reviewed your resume and are pleased to inform you that you have been shortlisted for the next stage.\n\n\
             Schedule your exam here: {link}\n\n\
             Best regards,\n\
             Your HR Team\n"
        );

        let html_body = format!(
            "<html>\n<body>\n\
             <p>Dear {name},</p>\n\
             <p>Thank you for applying for the position of <b>{role}</b> at <b>{company}</b>.</p>\n\
             <p>We have reviewed your resume and are pleased to inform you that you have been shortlisted for the next stage.</p>\n\
             <p><a href=\"{link}\" style=\"background-color:#4CAF50;color:white;padding:10px 20px;text-decoration:none;border-radius:5px;\">Schedule Your Exam</a></p>\n\
             <p>Best regards,<br>Your HR Team</p>\n\
             </body>\n</html>\n",
            name = escape_html(name),
            role = escape_html(&role),
            company = escape_html(company),
            link = escape_html(&link),
        );

        NotificationMessage {
            recipient: recipient.to_string(),
            subject,
            plain_body,
            html_body: Some(html_body),
        }
    }
}

/// `"data_entry"` -> `"Data Entry"`. Separators become spaces and each word is title-cased.
pub fn humanize_role(role: &str) -> String {
    role.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                None => String::new(),
                Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
