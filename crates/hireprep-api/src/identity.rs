use hireprep_types::api::Claims;
use hireprep_types::models::Role;

/// The authenticated caller, threaded explicitly into every gate and
/// mutation. Built once per request by `require_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Token carried a `role` claim.
    Member {
        user_id: i64,
        username: String,
        role: Role,
    },
    /// Token carried no `role` claim at all.
    Legacy { user_id: i64, username: String },
}

impl Identity {
    /// `None` when the subject is not a numeric user id.
    pub fn from_claims(claims: Claims) -> Option<Self> {
        let user_id = claims.sub.parse().ok()?;
        Some(match claims.role {
            Some(role) => Self::Member {
                user_id,
                username: claims.username,
                role: Role::parse(&role),
            },
            None => Self::Legacy {
                user_id,
                username: claims.username,
            },
        })
    }

    pub fn user_id(&self) -> i64 {
        match self {
            Self::Member { user_id, .. } | Self::Legacy { user_id, .. } => *user_id,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::Member { username, .. } | Self::Legacy { username, .. } => username,
        }
    }

    pub fn role(&self) -> Option<&Role> {
        match self {
            Self::Member { role, .. } => Some(role),
            Self::Legacy { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Option<&str>) -> Claims {
        Claims {
            sub: "7".into(),
            username: "meera".into(),
            role: role.map(str::to_string),
            exp: 0,
        }
    }

    #[test]
    fn role_claim_selects_member() {
        let id = Identity::from_claims(claims(Some("FACULTY"))).unwrap();
        assert_eq!(id.role(), Some(&Role::Faculty));
        assert_eq!(id.user_id(), 7);
        assert_eq!(id.username(), "meera");
    }

    #[test]
    fn missing_role_claim_selects_legacy() {
        let id = Identity::from_claims(claims(None)).unwrap();
        assert!(matches!(id, Identity::Legacy { user_id: 7, .. }));
        assert_eq!(id.role(), None);
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let mut c = claims(Some("student"));
        c.sub = "2b9e-uuid".into();
        assert!(Identity::from_claims(c).is_none());
    }
}
