//! Product test state machine.
//!
//! A test starts `Active` with a fixed window and moves to `Completed` once;
//! there is no way back.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::ProductTest;
use crate::reactions::Verdict;

pub const TEST_DURATION: Duration = Duration::days(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestState {
    Active,
    Completed,
}

impl ProductTest {
    /// A new active test starting at `now`.
    pub fn begin(user_id: &str, item_id: &str, now: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_owned(),
            item_id: item_id.to_owned(),
            start_date: now,
            finish_date: now + TEST_DURATION,
            completed: false,
            result: None,
        }
    }

    pub fn state(&self) -> TestState {
        if self.completed {
            TestState::Completed
        } else {
            TestState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == TestState::Active
    }

    /// Marks the test completed. A missing result leaves the current one as is.
    pub fn complete(&mut self, result: Option<Verdict>) {
        self.completed = true;
        if result.is_some() {
            self.result = result;
        }
    }
}
