//! Recipient classification for the fan-out engine

use std::collections::HashSet;

use tracing::debug;

use crate::common::{AppError, AppResult, PhoneNumber, UserId};
use crate::domains::users::User;
use crate::kernel::BaseStore;

/// Canonical recipient, resolved once from whatever shape the caller sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
    ByUserId(UserId),
    ByPhoneNumber(PhoneNumber),
}

/// Disjoint buckets; every recipient lands in exactly one.
#[derive(Debug, Default)]
pub struct ClassifiedRecipients {
    /// Have the app; message plus push
    pub registered: Vec<User>,
    /// Stub accounts without the app; message plus SMS invite
    pub onboarding: Vec<User>,
    /// No account at all; a stub is created for each
    pub unmatched: Vec<PhoneNumber>,
}

impl ClassifiedRecipients {
    /// Whether any recipient will be reached by SMS
    pub fn needs_sms(&self) -> bool {
        !self.onboarding.is_empty() || !self.unmatched.is_empty()
    }
}

/// Look up every recipient and bucket them.
///
/// An unknown user id is a validation error. Phone numbers with no user
/// become `unmatched`.
pub async fn classify_recipients(
    recipients: &[Recipient],
    store: &dyn BaseStore,
) -> AppResult<ClassifiedRecipients> {
    let mut user_ids: Vec<UserId> = Vec::new();
    let mut phones: Vec<PhoneNumber> = Vec::new();
    for recipient in recipients {
        match recipient {
            Recipient::ByUserId(id) if !user_ids.contains(id) => user_ids.push(*id),
            Recipient::ByPhoneNumber(phone) if !phones.contains(phone) => {
                phones.push(phone.clone())
            }
            _ => {}
        }
    }

    let by_id = if user_ids.is_empty() {
        Vec::new()
    } else {
        store.find_users(&user_ids).await?
    };

    if let Some(missing) = user_ids
        .iter()
        .find(|id| !by_id.iter().any(|u| &u.id == *id))
    {
        return Err(AppError::validation(format!("Receiver {} not found", missing)));
    }

    let by_phone = if phones.is_empty() {
        Vec::new()
    } else {
        store.find_users_by_phone(&phones).await?
    };

    let classified = partition(order_by(&user_ids, by_id), by_phone, phones);
    debug!(
        registered = classified.registered.len(),
        onboarding = classified.onboarding.len(),
        unmatched = classified.unmatched.len(),
        "classified recipients"
    );
    Ok(classified)
}

fn order_by(ids: &[UserId], mut users: Vec<User>) -> Vec<User> {
    users.sort_by_key(|u| ids.iter().position(|id| *id == u.id));
    users
}

/// Bucket users found by id and by phone. Users reachable both ways count once.
pub fn partition(
    by_id: Vec<User>,
    by_phone: Vec<User>,
    phones: Vec<PhoneNumber>,
) -> ClassifiedRecipients {
    let mut seen: HashSet<UserId> = HashSet::new();
    let mut classified = ClassifiedRecipients::default();

    let matched: HashSet<PhoneNumber> = by_phone
        .iter()
        .filter_map(|u| u.phone_number.clone())
        .collect();

    for user in by_id.into_iter().chain(by_phone) {
        if !seen.insert(user.id) {
            continue;
        }
        if user.is_onboarding() {
            classified.onboarding.push(user);
        } else {
            classified.registered.push(user);
        }
    }

    classified.unmatched = phones
        .into_iter()
        .filter(|p| !matched.contains(p))
        .collect();

    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::users::UserType;

    fn user(user_type: UserType, local: &str) -> User {
        let mut user = User::new_onboarding_worker(PhoneNumber::us(local));
        user.user_type = user_type;
        user
    }

    #[test]
    fn every_recipient_lands_in_one_bucket() {
        let worker = user(UserType::Worker, "5550000001");
        let stub = user(UserType::OnboardingWorker, "5550000002");
        let phones = vec![PhoneNumber::us("5550000002"), PhoneNumber::us("5550000003")];

        let classified = partition(vec![worker.clone()], vec![stub.clone()], phones);

        assert_eq!(classified.registered.len(), 1);
        assert_eq!(classified.registered[0].id, worker.id);
        assert_eq!(classified.onboarding.len(), 1);
        assert_eq!(classified.onboarding[0].id, stub.id);
        assert_eq!(classified.unmatched, vec![PhoneNumber::us("5550000003")]);
        assert!(classified.needs_sms());
    }

    #[test]
    fn user_found_by_id_and_phone_counts_once() {
        let worker = user(UserType::Worker, "5551234567");
        let classified = partition(
            vec![worker.clone()],
            vec![worker.clone()],
            vec![PhoneNumber::us("5551234567")],
        );

        assert_eq!(classified.registered.len(), 1);
        assert!(classified.onboarding.is_empty());
        assert!(classified.unmatched.is_empty());
        assert!(!classified.needs_sms());
    }

    #[test]
    fn company_users_are_registered() {
        let admin = user(UserType::CompanyAdmin, "5550000009");
        let classified = partition(vec![admin], Vec::new(), Vec::new());
        assert_eq!(classified.registered.len(), 1);
    }
}
