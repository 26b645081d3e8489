//! Membership gate: who may do what to a spot. Public descriptive fields are
//! readable by anyone; chat and the roster need membership; edit/delete need
//! ownership. Every mutation in the repository asks here before writing.

use sqlx::SqlitePool;

use crate::{db::Spot, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub owner: bool,
    pub member: bool,
}

impl Verdict {
    pub fn can_view(&self) -> bool {
        true
    }

    pub fn can_chat(&self) -> bool {
        self.member
    }

    pub fn can_edit(&self) -> bool {
        self.owner
    }

    pub fn can_delete(&self) -> bool {
        self.owner
    }

    pub fn can_join(&self) -> bool {
        !self.member
    }

    /// The owner doesn't get a bare leave; deleting the spot is how an owner
    /// walks away, and that cascades memberships and messages.
    pub fn can_leave(&self) -> bool {
        self.member && !self.owner
    }
}

pub fn assess(spot: &Spot, user: Option<&str>, member: bool) -> Verdict {
    Verdict {
        owner: user.is_some_and(|u| u == spot.created_by),
        member,
    }
}

pub async fn is_member(db_pool: &SqlitePool, spot_id: &str, user_id: &str) -> AppResult<bool> {
    Ok(
        sqlx::query_as::<_, (i64,)>("SELECT 1 FROM spot_members WHERE spot_id=? AND user_id=?")
            .bind(spot_id)
            .bind(user_id)
            .fetch_optional(db_pool)
            .await?
            .is_some(),
    )
}

pub async fn verdict(db_pool: &SqlitePool, spot: &Spot, user: Option<&str>) -> AppResult<Verdict> {
    let member = match user {
        Some(user_id) => is_member(db_pool, &spot.id, user_id).await?,
        None => false,
    };

    Ok(assess(spot, user, member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SpotKind;

    fn spot(owner: &str) -> Spot {
        Spot {
            id: "spot-1".into(),
            name: "Library Corner".into(),
            description: String::new(),
            location: "Building A".into(),
            category: "Math".into(),
            kind: SpotKind::Study,
            capacity: 10,
            amenities: vec![],
            created_by: owner.into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn owner_is_gated_as_owner() {
        let v = assess(&spot("alice"), Some("alice"), true);
        assert!(v.owner && v.member);
        assert!(v.can_edit() && v.can_delete() && v.can_chat());
        assert!(!v.can_join());
        assert!(!v.can_leave());
    }

    #[test]
    fn member_can_chat_and_leave_but_not_edit() {
        let v = assess(&spot("alice"), Some("bob"), true);
        assert!(v.can_chat() && v.can_leave());
        assert!(!v.can_edit() && !v.can_delete());
    }

    #[test]
    fn non_member_can_only_view_and_join() {
        let v = assess(&spot("alice"), Some("bob"), false);
        assert!(v.can_view() && v.can_join());
        assert!(!v.can_chat() && !v.can_edit() && !v.can_leave());
    }

    #[test]
    fn anonymous_user_can_view_public_fields() {
        let v = assess(&spot("alice"), None, false);
        assert!(v.can_view());
        assert!(!v.owner && !v.member);
    }
}
