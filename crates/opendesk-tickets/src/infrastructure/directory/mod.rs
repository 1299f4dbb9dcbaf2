//! In-memory user directory and clocks

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::domain::aggregates::UserProfile;
use crate::domain::value_objects::UserId;
use crate::ports::outbound::{Clock, RepositoryError, UserDirectory};

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, UserProfile>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        let directory = Self::new();
        for user in users {
            directory.upsert(user);
        }
        directory
    }

    pub fn upsert(&self, user: UserProfile) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn remove(&self, id: &UserId) {
        self.users.remove(id);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(start) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Role;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_find_user() {
        let id = UserId::new("cs-1").unwrap();
        let directory = InMemoryUserDirectory::with_users([UserProfile::new(id.clone(), "Chidi", Role::CustomerService)]);
        let user = directory.find_user(&id).await.unwrap().unwrap();
        assert!(user.can_take_ticket());
        directory.remove(&id);
        assert!(directory.find_user(&id).await.unwrap().is_none());
    }

    #[test]
    fn test_manual_clock() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::hours(20));
        assert_eq!(clock.now(), start + Duration::hours(20));
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
