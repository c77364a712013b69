//! Whitelist lookup capability.
//!
//! Contacts are owned by the external record store; this crate only reads
//! them. Lookups are expected to complete in well under 10ms since they gate
//! the fast path of every inbound call.

use crate::types::Contact;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait ContactLookup: Send + Sync {
    async fn find_by_phone(&self, user_id: &str, phone_number: &str) -> Option<Contact>;
}

/// In-memory lookup seeded from configuration. Doubles as the test fake.
#[derive(Default)]
pub struct StaticContacts {
    by_user: HashMap<String, Vec<Contact>>,
}

impl StaticContacts {
    pub fn new() -> Self {
        StaticContacts {
            by_user: HashMap::new(),
        }
    }

    pub fn insert(&mut self, user_id: &str, contact: Contact) {
        self.by_user
            .entry(user_id.to_string())
            .or_default()
            .push(contact);
    }

    pub fn len(&self) -> usize {
        self.by_user.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContactLookup for StaticContacts {
    async fn find_by_phone(&self, user_id: &str, phone_number: &str) -> Option<Contact> {
        self.by_user
            .get(user_id)
            .and_then(|contacts| {
                contacts
                    .iter()
                    .find(|c| c.phone_number == phone_number)
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(number: &str, auto_pass: bool) -> Contact {
        Contact {
            phone_number: number.to_string(),
            display_name: "John Smith".to_string(),
            relationship: "friend".to_string(),
            auto_pass,
        }
    }

    #[tokio::test]
    async fn lookup_is_scoped_per_user() {
        let mut contacts = StaticContacts::new();
        contacts.insert("user_1", contact("+15551234567", true));

        assert!(contacts
            .find_by_phone("user_1", "+15551234567")
            .await
            .is_some());
        assert!(contacts
            .find_by_phone("user_2", "+15551234567")
            .await
            .is_none());
        assert!(contacts
            .find_by_phone("user_1", "+15559999999")
            .await
            .is_none());
    }
}
