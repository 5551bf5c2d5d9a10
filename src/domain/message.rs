use super::lead::Lead;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label used when a lead's SKU is absent or unknown.
pub const GENERIC_SERVICE_LABEL: &str = "our services";

/// Maps service SKUs to the names shown to customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog(BTreeMap<String, String>);

impl Default for ServiceCatalog {
    fn default() -> Self {
        let entries = [
            ("website-starter", "Starter Website"),
            ("website-pro", "Professional Website"),
            ("ecommerce-store", "E-commerce Store"),
            ("seo-audit", "SEO Audit"),
            ("maintenance-plan", "Website Maintenance Plan"),
            ("migration-report", "Code Migration Report"),
        ];
        Self(
            entries
                .into_iter()
                .map(|(sku, name)| (sku.to_string(), name.to_string()))
                .collect(),
        )
    }
}

impl ServiceCatalog {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Adds or replaces entries, keeping the rest.
    pub fn extend(&mut self, overrides: impl IntoIterator<Item = (String, String)>) {
        self.0.extend(overrides);
    }

    pub fn service_name(&self, sku: Option<&str>) -> &str {
        sku.and_then(|s| self.0.get(s.trim()))
            .map(String::as_str)
            .unwrap_or(GENERIC_SERVICE_LABEL)
    }
}

/// A rendered reminder email, ready for the notification gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ReminderMessage {
    /// Renders reminder number `reminder_number` out of `emails_total` for `lead`.
    pub fn compose(
        lead: &Lead,
        catalog: &ServiceCatalog,
        reminder_number: u32,
        emails_total: u32,
        payment_url: Option<&str>,
    ) -> Self {
        let service = catalog.service_name(lead.service_sku.as_deref());
        let greeting = lead.name.as_deref().unwrap_or("there");

        let mut body = format!(
            "Hi {greeting},\n\nThanks again for your interest in {service}. \
             We noticed your payment hasn't been completed yet.\n"
        );
        if let Some(amount) = lead.quoted_amount() {
            body.push_str(&format!("\nAmount due: ${amount:.2}\n"));
        }
        if let Some(url) = payment_url {
            body.push_str(&format!("\nComplete your payment here: {url}\n"));
        }
        body.push_str(&format!(
            "\nThis is reminder {reminder_number} of {emails_total}. \
             Reply to this email if you have any questions.\n"
        ));

        Self {
            to: lead.email.clone(),
            subject: format!("Reminder: complete your payment for {service}"),
            body,
        }
    }
}
