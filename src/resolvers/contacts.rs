//! Recipient and sender resolvers.
//!
//! Both read the address book through [`ComposeHost::search_contacts`]
//! (crate::host::ComposeHost::search_contacts) and expose every property of a
//! matching card under its lowercased name, so `[[TO=nickname]]` or
//! `[[FROM=jobtitle]]` work for whatever the card carries.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::core::QuicktextError;
use crate::engine::{CachedValue, ExpansionSession, Resolver};
use crate::host::{ComposeHost, ContactCard};
use crate::utils::{join_with_last, parse_display_name, separator_arg};

async fn find_card(compose: &dyn ComposeHost, email: &str) -> Result<Option<ContactCard>> {
    let cards = compose
        .search_contacts(email)
        .await
        .with_context(|| format!("Failed to search contacts for {email}"))?;
    Ok(cards.into_iter().find(|card| card.matches_email(email)))
}

/// `[[TO=field|separator|last separator]]` - recipients of the message.
///
/// Built-in fields are `email`, `firstname`, `lastname` and `fullname`. Names
/// come from the address book when a card matches; otherwise they are derived
/// from the display name, and `Doe, John` style names are swapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToResolver;

#[derive(Debug, Default)]
struct Recipients {
    fields: BTreeMap<String, Vec<String>>,
}

impl Recipients {
    fn set(&mut self, field: &str, index: usize, value: String) {
        let column = self.fields.entry(field.to_string()).or_default();
        if column.len() <= index {
            column.resize(index + 1, String::new());
        }
        column[index] = value;
    }

    fn get(&self, field: &str, index: usize) -> String {
        self.fields.get(field).and_then(|column| column.get(index)).cloned().unwrap_or_default()
    }

    fn merge_card(&mut self, index: usize, card: &ContactCard) {
        for (name, value) in &card.properties {
            let name = name.to_lowercase();
            if !value.is_empty() || self.get(&name, index).is_empty() {
                self.set(&name, index, value.trim().to_string());
            }
        }
    }

    fn derive_names(&mut self, index: usize) {
        let first = self.get("firstname", index);
        let last = self.get("lastname", index);
        let known: Vec<&str> = [first.as_str(), last.as_str()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect();

        if known.is_empty() {
            let fullname = self.get("fullname", index).replace(',', ", ");
            let parts: Vec<&str> = fullname.split(' ').filter(|part| !part.trim().is_empty()).collect();
            let (first, last) = match parts.split_first() {
                Some((head, rest)) if !rest.is_empty() => (head.trim().to_string(), rest.join(" ")),
                _ => (String::new(), parts.join(" ")),
            };
            self.set("firstname", index, first);
            self.set("lastname", index, last.trim().to_string());
        } else {
            let fullname = known.join(" ");
            self.set("fullname", index, fullname);
        }

        let first = self.get("firstname", index);
        if first.ends_with(',') {
            let swapped_last = first.replace(',', "");
            let swapped_first = self.get("lastname", index);
            self.set("fullname", index, format!("{swapped_first} {swapped_last}"));
            self.set("firstname", index, swapped_first);
            self.set("lastname", index, swapped_last);
        }
    }

    fn finish(mut self, count: usize) -> BTreeMap<String, Vec<String>> {
        for column in self.fields.values_mut() {
            column.resize(count, String::new());
        }
        self.fields
    }
}

#[async_trait]
impl Resolver for ToResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let details = session.details().await?;
        let compose = Arc::clone(&session.host().compose);

        let mut recipients = Recipients::default();
        for field in ["email", "firstname", "lastname", "fullname"] {
            recipients.fields.insert(field.to_string(), Vec::new());
        }

        for (index, address) in details.to.iter().enumerate() {
            let mailbox = parse_display_name(address);
            let email = mailbox.email.to_lowercase();
            recipients.set("email", index, email.clone());
            recipients.set("fullname", index, mailbox.name.trim().to_string());
            recipients.set("firstname", index, String::new());
            recipients.set("lastname", index, String::new());

            if let Some(card) = find_card(compose.as_ref(), &email).await? {
                recipients.merge_card(index, &card);
            }
            recipients.derive_names(index);
        }

        Ok(CachedValue::MultiMap(recipients.finish(details.to.len())))
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        let CachedValue::MultiMap(fields) = value else {
            return String::new();
        };
        let Some(entries) = arguments.first().and_then(|field| fields.get(field)) else {
            return String::new();
        };
        let separator = separator_arg(arguments, 1, ", ");
        let last_separator = separator_arg(arguments, 2, &separator);
        join_with_last(entries, &separator, &last_separator)
    }
}

/// `[[FROM=field]]` - the sending identity.
///
/// Built-in fields are `email` and `displayname`; `firstname`, `lastname`,
/// `fullname` and other card properties are available when the identity's
/// address has an address book entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct FromResolver;

#[async_trait]
impl Resolver for FromResolver {
    async fn fetch(&self, _arguments: &[String], session: &mut ExpansionSession) -> Result<CachedValue> {
        let details = session.details().await?;
        let compose = Arc::clone(&session.host().compose);

        let identity_id = details.identity_id.ok_or_else(|| {
            QuicktextError::host_call("get identity", "the message has no sending identity")
        })?;
        let identity = compose.identity(&identity_id).await?;

        let mut fields = BTreeMap::from([
            ("email".to_string(), identity.email.clone()),
            ("displayname".to_string(), identity.name.clone()),
            ("firstname".to_string(), String::new()),
            ("lastname".to_string(), String::new()),
        ]);

        if let Some(card) = find_card(compose.as_ref(), &identity.email.to_lowercase()).await? {
            for (name, value) in card.properties {
                fields.insert(name.to_lowercase(), value);
            }
            let fullname = format!("{} {}", fields["firstname"], fields["lastname"]);
            fields.insert("fullname".to_string(), fullname.trim().to_string());
        }

        Ok(CachedValue::Map(fields))
    }

    fn render(&self, value: &CachedValue, arguments: &[String]) -> String {
        let CachedValue::Map(fields) = value else {
            return String::new();
        };
        arguments
            .first()
            .and_then(|field| fields.get(field))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ComposeDetails, Identity};
    use crate::test_utils::TestSession;

    fn card(pairs: &[(&str, &str)]) -> ContactCard {
        ContactCard {
            properties: pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        }
    }

    fn session_with(to: &[&str], contacts: Vec<ContactCard>) -> ExpansionSession {
        let mut test = TestSession::new(ComposeDetails {
            to: to.iter().map(|s| (*s).to_string()).collect(),
            identity_id: Some("id1".into()),
            ..Default::default()
        });
        test.context.contacts = contacts;
        test.context.identities = vec![Identity {
            id: "id1".into(),
            email: "Charles@Example.com".into(),
            name: "Charles B.".into(),
        }];
        test.build()
    }

    #[tokio::test]
    async fn test_to_name_derivation() {
        let mut session = session_with(
            &["Ada Lovelace <ADA@example.com>", "\"Doe, John\" <john@example.com>", "solo@example.com"],
            vec![],
        );
        assert_eq!(
            session.parse("[[TO=email]]").await.unwrap(),
            "ada@example.com, john@example.com, solo@example.com"
        );
        assert_eq!(session.parse("[[TO=firstname|, | and ]]").await.unwrap(), "Ada, John and ");
        assert_eq!(session.parse("[[TO=lastname|;]]").await.unwrap(), "Lovelace;Doe;");
        assert_eq!(session.parse("[[TO=fullname|\\n]]").await.unwrap(), "Ada Lovelace\nJohn Doe\n");
    }

    #[tokio::test]
    async fn test_to_prefers_card_names() {
        let mut session = session_with(
            &["A. L. <ada@example.com>"],
            vec![card(&[
                ("PrimaryEmail", "ada@example.com"),
                ("FirstName", "Ada"),
                ("LastName", "Lovelace"),
                ("NickName", " Countess "),
            ])],
        );
        assert_eq!(
            session.parse("[[TO=fullname]] / [[TO=nickname]]").await.unwrap(),
            "Ada Lovelace / Countess"
        );
        assert_eq!(session.parse("[[TO=unknown]]").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_from_fields() {
        let mut session = session_with(
            &[],
            vec![card(&[
                ("PrimaryEmail", "charles@example.com"),
                ("FirstName", "Charles"),
                ("LastName", "Babbage"),
            ])],
        );
        assert_eq!(
            session.parse("[[FROM=email]]|[[FROM=displayname]]|[[FROM=fullname]]").await.unwrap(),
            "Charles@Example.com|Charles B.|Charles Babbage"
        );
    }

    #[tokio::test]
    async fn test_from_without_identity_is_reported() {
        let test = TestSession::new(ComposeDetails::default());
        let prompter = test.prompter();
        let mut session = test.build();
        assert_eq!(session.parse("[[FROM=email]]").await.unwrap(), "");
        assert_eq!(prompter.alerts().len(), 1);
    }
}
