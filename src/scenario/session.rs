/// Immutable per-session state: the placeholder identifiers and sample
/// credentials a simulated user sends. Built once from the configuration and
/// handed to every session read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub event_id: u64,
    pub concert_id: u64,
    pub order_id: u64,
    pub user_id: u64,

    /// Fixed account used by `login` and `forgot_pass`.
    pub email: String,
    pub password: String,

    /// Display name sent with every `sign_up`.
    pub signup_name: String,

    pub reset_token: String,
    pub new_password: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            event_id: 1,
            concert_id: 1,
            order_id: 1,
            user_id: 1,
            email: "user@test.com".into(),
            password: "password123".into(),
            signup_name: "Test User".into(),
            reset_token: "sample-reset-token".into(),
            new_password: "newpassword123".into(),
        }
    }
}

impl Session {
    pub fn id(&self, entity: Entity) -> u64 {
        match entity {
            Entity::Event => self.event_id,
            Entity::Concert => self.concert_id,
            Entity::Order => self.order_id,
            Entity::User => self.user_id,
        }
    }
}

/// Entities whose identifier can appear as a `{..._id}` placeholder in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Event,
    Concert,
    Order,
    User,
}

impl Entity {
    pub fn from_placeholder(name: &str) -> Option<Self> {
        match name {
            "event_id" => Some(Self::Event),
            "concert_id" => Some(Self::Concert),
            "order_id" => Some(Self::Order),
            "user_id" => Some(Self::User),
            _ => None,
        }
    }
}
