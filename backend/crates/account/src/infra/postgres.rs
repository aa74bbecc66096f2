//! PostgreSQL Profile Store

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entity::profile::{NewProfile, Profile};
use crate::domain::repository::{CreateOutcome, ProfileRepository};
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, principal_id::PrincipalId,
    referral_code::ReferralCode,
};
use crate::error::{AccountError, AccountResult};

/// Unique index backing referral code lookups
const REFERRAL_CODE_CONSTRAINT: &str = "profiles_referral_code_key";

/// PostgreSQL-backed profile repository
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ProfileRepository for PgProfileRepository {
    async fn find_by_principal(&self, principal_id: &PrincipalId) -> AccountResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT
                principal_id,
                display_name,
                email,
                created_at,
                referral_code,
                referred_by
            FROM profiles
            WHERE principal_id = $1
            "#,
        )
        .bind(principal_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_profile()).transpose()
    }

    async fn create_if_absent(&self, profile: &NewProfile) -> AccountResult<CreateOutcome> {
        let result = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (
                principal_id,
                display_name,
                email,
                referral_code,
                referred_by
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (principal_id) DO NOTHING
            RETURNING
                principal_id,
                display_name,
                email,
                created_at,
                referral_code,
                referred_by
            "#,
        )
        .bind(profile.principal_id.as_str())
        .bind(profile.display_name.as_str())
        .bind(profile.email.as_ref().map(Email::as_str))
        .bind(profile.referral_code.as_str())
        .bind(profile.referred_by.as_ref().map(PrincipalId::as_str))
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(CreateOutcome::Created(row.into_profile()?)),
            // ON CONFLICT on the primary key: nothing inserted, nothing returned
            Ok(None) => Ok(CreateOutcome::PrincipalExists),
            Err(sqlx::Error::Database(db)) if db.constraint() == Some(REFERRAL_CODE_CONSTRAINT) => {
                Ok(CreateOutcome::ReferralCodeTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_referral_code(&self, code: &str) -> AccountResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT
                principal_id,
                display_name,
                email,
                created_at,
                referral_code,
                referred_by
            FROM profiles
            WHERE referral_code = $1
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_profile()).transpose()
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct ProfileRow {
    principal_id: String,
    display_name: String,
    email: Option<String>,
    created_at: DateTime<Utc>,
    referral_code: String,
    referred_by: Option<String>,
}

impl ProfileRow {
    fn into_profile(self) -> AccountResult<Profile> {
        let referral_code = ReferralCode::parse(&self.referral_code)
            .map_err(|e| AccountError::Internal(format!("Invalid referral_code: {}", e)))?;

        Ok(Profile {
            principal_id: PrincipalId::from_db(self.principal_id),
            display_name: DisplayName::from_db(self.display_name),
            email: self.email.map(Email::from_trusted),
            created_at: self.created_at,
            referral_code,
            referred_by: self.referred_by.map(PrincipalId::from_db),
        })
    }
}
