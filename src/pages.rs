//! Static public pages

use crate::config::SiteConfig;
use serde::Serialize;

/// Date the policy text below last changed
pub const PRIVACY_POLICY_UPDATED: &str = "2024-01-15";

#[derive(Debug, Clone, Serialize)]
pub struct PageSection {
    pub id: &'static str,
    pub heading: &'static str,
    pub paragraphs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageDocument {
    pub slug: &'static str,
    pub title: String,
    pub last_updated: &'static str,
    pub contact_email: String,
    pub sections: Vec<PageSection>,
}

fn section(id: &'static str, heading: &'static str, paragraphs: Vec<String>, items: &[&str]) -> PageSection {
    PageSection {
        id,
        heading,
        paragraphs,
        items: items.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn privacy_policy(site: &SiteConfig) -> PageDocument {
    let name = &site.name;
    let email = &site.contact_email;

    let sections = vec![
        section(
            "introduction",
            "Introduction",
            vec![format!(
                "{name} respects your privacy. This policy explains what information we collect \
                 when you use {name}, how we use it and the choices you have."
            )],
            &[],
        ),
        section(
            "information-we-collect",
            "Information we collect",
            vec!["We collect only what is needed to run the site:".to_string()],
            &[
                "Account details you provide when signing in, such as your name and email address",
                "Content you submit, such as quiz answers and lab progress",
                "Aggregated usage statistics from privacy-friendly analytics",
                "Technical data such as browser type and request logs kept for security",
            ],
        ),
        section(
            "how-we-use-information",
            "How we use information",
            vec![format!("{name} uses this information to:")],
            &[
                "Provide courses, tutorials, labs and other learning content",
                "Keep the service secure and prevent abuse",
                "Understand which content is useful so we can improve it",
                "Send service emails you have asked for",
            ],
        ),
        section(
            "cookies",
            "Cookies",
            vec![
                "We use essential cookies to keep you signed in. Analytics are configured without \
                 cross-site tracking cookies."
                    .to_string(),
            ],
            &[],
        ),
        section(
            "third-parties",
            "Third-party services",
            vec![
                "Some features rely on third-party providers such as analytics services, email \
                 delivery and model metadata from HuggingFace. They receive only the data needed \
                 for that feature."
                    .to_string(),
            ],
            &[],
        ),
        section(
            "data-retention",
            "Data retention",
            vec![
                "We keep personal data only as long as your account is active or as required by law. \
                 Request logs are rotated regularly."
                    .to_string(),
            ],
            &[],
        ),
        section(
            "your-rights",
            "Your rights",
            vec!["Depending on where you live, you may have the right to:".to_string()],
            &[
                "Access the personal data we hold about you",
                "Ask us to correct or delete it",
                "Object to or restrict certain processing",
                "Receive a copy of your data in a portable format",
            ],
        ),
        section(
            "contact",
            "Contact",
            vec![format!(
                "Questions about this policy can be sent to {email}. We will reply within 30 days."
            )],
            &[],
        ),
    ];

    PageDocument {
        slug: "privacy-policy",
        title: format!("{} Privacy Policy", name),
        last_updated: PRIVACY_POLICY_UPDATED,
        contact_email: email.clone(),
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_policy_uses_site_identity() {
        let site = SiteConfig {
            name: "ExampleLabs".to_string(),
            contact_email: "privacy@example.com".to_string(),
        };
        let page = privacy_policy(&site);
        assert_eq!(page.title, "ExampleLabs Privacy Policy");
        assert_eq!(page.contact_email, "privacy@example.com");
        assert!(page.sections[0].paragraphs[0].contains("ExampleLabs"));

        let contact = page.sections.iter().find(|s| s.id == "contact").unwrap();
        assert!(contact.paragraphs[0].contains("privacy@example.com"));
    }

    #[test]
    fn test_section_ids_are_unique() {
        let page = privacy_policy(&SiteConfig::default());
        let mut ids: Vec<&str> = page.sections.iter().map(|s| s.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_empty_items_are_omitted() {
        let json = serde_json::to_value(privacy_policy(&SiteConfig::default())).unwrap();
        assert!(json["sections"][0].get("items").is_none());
        assert!(json["sections"][1]["items"].is_array());
    }
}
