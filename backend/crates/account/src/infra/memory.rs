//! In-Memory Implementations
//!
//! Profile store and identity directory held in process memory. Used by
//! the test suites and by debug builds started without identity
//! service credentials.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use crate::domain::entity::{
    principal::Principal,
    profile::{NewProfile, Profile},
};
use crate::domain::gateway::{
    GatewayError, GatewayFactory, GatewayResult, IdentityGateway, ProviderCredential,
    ProviderSignIn,
};
use crate::domain::repository::{CreateOutcome, ProfileRepository};
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, password::Password, principal_id::PrincipalId,
};
use crate::error::{AccountError, AccountResult};

// ============================================================================
// Profile Store
// ============================================================================

#[derive(Default)]
struct ProfileTable {
    by_principal: HashMap<PrincipalId, Profile>,
    /// referral code -> principal id
    by_code: HashMap<String, PrincipalId>,
}

/// Profile store with the same uniqueness rules as the `profiles` table
#[derive(Clone, Default)]
pub struct MemoryProfileRepository {
    table: Arc<Mutex<ProfileTable>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn count(&self) -> usize {
        self.table.lock().await.by_principal.len()
    }

    fn check_available(&self) -> AccountResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AccountError::Unavailable(
                "Profile store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProfileRepository for MemoryProfileRepository {
    async fn find_by_principal(&self, principal_id: &PrincipalId) -> AccountResult<Option<Profile>> {
        self.check_available()?;
        Ok(self.table.lock().await.by_principal.get(principal_id).cloned())
    }

    async fn create_if_absent(&self, profile: &NewProfile) -> AccountResult<CreateOutcome> {
        self.check_available()?;
        let mut table = self.table.lock().await;

        if table.by_principal.contains_key(&profile.principal_id) {
            return Ok(CreateOutcome::PrincipalExists);
        }
        if table.by_code.contains_key(profile.referral_code.as_str()) {
            return Ok(CreateOutcome::ReferralCodeTaken);
        }

        let stored = profile.clone().into_profile(Utc::now());
        table.by_code.insert(
            stored.referral_code.as_str().to_string(),
            stored.principal_id.clone(),
        );
        table
            .by_principal
            .insert(stored.principal_id.clone(), stored.clone());

        Ok(CreateOutcome::Created(stored))
    }

    async fn find_by_referral_code(&self, code: &str) -> AccountResult<Option<Profile>> {
        self.check_available()?;
        let table = self.table.lock().await;
        Ok(table
            .by_code
            .get(code)
            .and_then(|id| table.by_principal.get(id))
            .cloned())
    }
}

// ============================================================================
// Identity Directory
// ============================================================================

const EMAIL_EXISTS: &str = "EMAIL_EXISTS";
const INVALID_LOGIN_CREDENTIALS: &str = "INVALID_LOGIN_CREDENTIALS";
const WEAK_PASSWORD: &str = "WEAK_PASSWORD : Password should be at least 6 characters";
const INVALID_IDP_RESPONSE: &str = "INVALID_IDP_RESPONSE";
const MIN_PASSWORD_LENGTH: usize = 6;

struct PasswordAccount {
    principal_id: PrincipalId,
    password: String,
    display_name: Option<String>,
}

struct FederatedIdentity {
    principal_id: PrincipalId,
    email: Option<Email>,
    display_name: Option<String>,
    linked: bool,
}

#[derive(Default)]
struct Directory {
    /// keyed by normalized email
    accounts: HashMap<String, PasswordAccount>,
    /// keyed by (provider id, token)
    federated: HashMap<(String, String), FederatedIdentity>,
}

/// Identity service stand-in shared by all gateways it opens
#[derive(Clone, Default)]
pub struct MemoryIdentityDirectory {
    directory: Arc<Mutex<Directory>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider token that `authenticate_with_provider` accepts
    pub async fn add_federated_identity(
        &self,
        provider_id: &str,
        token: &str,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> PrincipalId {
        let principal_id = new_principal_id();
        self.directory.lock().await.federated.insert(
            (provider_id.to_string(), token.to_string()),
            FederatedIdentity {
                principal_id: principal_id.clone(),
                email: email.and_then(|e| Email::new(e).ok()),
                display_name: display_name.map(str::to_string),
                linked: false,
            },
        );
        principal_id
    }

    /// Make every call fail as if the network were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> GatewayResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable(
                "network request failed".to_string(),
            ));
        }
        Ok(())
    }
}

impl GatewayFactory for MemoryIdentityDirectory {
    type Gateway = MemoryIdentityGateway;

    fn open(&self) -> MemoryIdentityGateway {
        let (auth_tx, _) = watch::channel(None);
        MemoryIdentityGateway {
            directory: self.clone(),
            auth_tx,
        }
    }
}

/// One visitor's auth context against a [`MemoryIdentityDirectory`]
pub struct MemoryIdentityGateway {
    directory: MemoryIdentityDirectory,
    auth_tx: watch::Sender<Option<Principal>>,
}

impl MemoryIdentityGateway {
    fn signed_in(&self, principal: Principal) -> Principal {
        self.auth_tx.send_replace(Some(principal.clone()));
        principal
    }
}

impl IdentityGateway for MemoryIdentityGateway {
    async fn register(&self, email: &Email, password: &Password) -> GatewayResult<Principal> {
        self.directory.check_available()?;
        let mut directory = self.directory.directory.lock().await;

        if directory.accounts.contains_key(email.as_str()) {
            return Err(GatewayError::Credential(EMAIL_EXISTS.to_string()));
        }
        if password.expose().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(GatewayError::Credential(WEAK_PASSWORD.to_string()));
        }

        let principal_id = new_principal_id();
        directory.accounts.insert(
            email.as_str().to_string(),
            PasswordAccount {
                principal_id: principal_id.clone(),
                password: password.expose().to_string(),
                display_name: None,
            },
        );
        drop(directory);

        Ok(self.signed_in(Principal::new(principal_id, Some(email.clone()), None)))
    }

    async fn authenticate(&self, email: &Email, password: &Password) -> GatewayResult<Principal> {
        self.directory.check_available()?;
        let directory = self.directory.directory.lock().await;

        let principal = match directory.accounts.get(email.as_str()) {
            Some(account) if account.password == password.expose() => Principal::new(
                account.principal_id.clone(),
                Some(email.clone()),
                account.display_name.clone(),
            ),
            _ => {
                return Err(GatewayError::Credential(
                    INVALID_LOGIN_CREDENTIALS.to_string(),
                ));
            }
        };
        drop(directory);

        Ok(self.signed_in(principal))
    }

    async fn authenticate_with_provider(
        &self,
        credential: &ProviderCredential,
    ) -> GatewayResult<ProviderSignIn> {
        self.directory.check_available()?;
        let mut directory = self.directory.directory.lock().await;

        let key = (
            credential.provider_id.clone(),
            credential.token.value().to_string(),
        );
        let Some(identity) = directory.federated.get_mut(&key) else {
            return Err(GatewayError::Credential(INVALID_IDP_RESPONSE.to_string()));
        };

        let is_new_account = !identity.linked;
        identity.linked = true;
        let principal = Principal::new(
            identity.principal_id.clone(),
            identity.email.clone(),
            identity.display_name.clone(),
        );
        drop(directory);

        Ok(ProviderSignIn {
            principal: self.signed_in(principal),
            is_new_account,
        })
    }

    async fn set_display_name(&self, name: &DisplayName) -> GatewayResult<Principal> {
        self.directory.check_available()?;
        let Some(mut principal) = self.auth_tx.borrow().clone() else {
            return Err(GatewayError::NotSignedIn);
        };

        let mut directory = self.directory.directory.lock().await;
        if let Some(account) = principal
            .email
            .as_ref()
            .and_then(|email| directory.accounts.get_mut(email.as_str()))
        {
            account.display_name = Some(name.as_str().to_string());
        }
        if let Some(identity) = directory
            .federated
            .values_mut()
            .find(|identity| identity.principal_id == principal.id)
        {
            identity.display_name = Some(name.as_str().to_string());
        }
        drop(directory);

        principal.display_name = Some(name.as_str().to_string());
        Ok(self.signed_in(principal))
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        self.directory.check_available()?;
        self.auth_tx.send_replace(None);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.auth_tx.subscribe()
    }
}

fn new_principal_id() -> PrincipalId {
    PrincipalId::from_db(Uuid::new_v4().simple().to_string())
}
